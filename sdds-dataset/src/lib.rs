#![deny(missing_docs)]

//! The in-memory dataset model consumed by the SDDS binary page codec.
//!
//! A [`Dataset`] pairs an immutable [`Schema`] (ordered column, parameter and
//! array definitions) with mutable per-page storage: parameter values, array
//! values, and a tagged-variant [`ColumnStore`] per column. The binary codec
//! in `sdds-file` mutates the page storage in place; the schema is fixed once
//! the dataset is created.

pub use dataset::*;
pub use schema::*;
pub use store::*;
pub use value::*;

mod dataset;
mod schema;
mod store;
mod value;
