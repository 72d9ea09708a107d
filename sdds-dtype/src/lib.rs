#![deny(missing_docs)]

//! The type system for SDDS datasets.
//!
//! This crate defines the closed set of scalar types an SDDS file can carry,
//! their fixed wire widths, and the in-place byte-order-swap primitives used
//! by the non-native binary read and write paths.

pub use long_double::*;
pub use native::*;
pub use sdds_type::*;
pub use swap::*;

mod long_double;
mod native;
mod sdds_type;
mod swap;
