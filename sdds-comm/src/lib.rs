#![deny(missing_docs)]

//! The collective-communication substrate the SDDS page codec runs on.
//!
//! The codec does not care how workers talk to each other; it depends only on
//! the [`Collective`] contract (rank/size, broadcast, all-gather, reductions,
//! barrier) and on a [`SharedFile`] positioned view over one shared file.
//! This crate ships two fabrics: [`SoloComm`] for a single worker, and
//! [`ThreadComm`], an in-process fabric that runs one worker per thread and
//! is used by the test suite to exercise the collective paths. An MPI binding
//! would implement the same traits out of tree.
//!
//! Every collective call is a synchronous barrier: all workers must reach it
//! before any proceeds. A worker erroring before a collective call it has
//! peers waiting in will deadlock them; error paths in callers must still
//! reach any collective operation the group has entered.

pub use comm::*;
pub use shared_file::*;
pub use thread::*;

mod comm;
mod shared_file;
mod thread;
