#![allow(clippy::cast_possible_truncation)]
//! Read and write binary SDDS files, a self-describing page-structured
//! tabular format.
//!
//! A file is a textual header followed by any number of binary pages. The
//! header is a sequence of namelists (`&description`, `&parameter`,
//! `&array`, `&column`, `&data`) that fix the schema and the byte order for
//! the whole file. Each page is:
//!
//! 1. A title block: the declared row count (an `i32`, or a sentinel plus
//!    an `i64` for row counts beyond `i32::MAX`), the values of every
//!    non-fixed parameter, and every array's dimension vector and elements.
//! 2. The row block: the column data, laid out row-major (all columns of a
//!    row, then the next row) or column-major (one contiguous block per
//!    column).
//!
//! In row-major layout every row has the same byte width because string
//! cells are clipped and zero-padded to a fixed field width. That makes the
//! byte position of any row computable from the title length alone, which
//! is what lets a group of workers write disjoint row ranges of the same
//! page concurrently through a [`Collective`](sdds_comm::Collective)
//! substrate.
//!
//! [`SddsWriter`] and [`SddsReader`] are the page-level entry points; every
//! worker in a communicator constructs one and the pair keeps all workers'
//! file views consistent page by page.

mod channel;
mod codec;
mod collective;
mod config;
mod distribution;
mod header;
mod page;
mod row;
#[cfg(test)]
mod tests;
mod title;

pub use channel::{ReadChannel, ReadOutcome, WriteChannel};
pub use config::{
    ByteOrder, PageIoOptions, RowCountMode, RowLayout, RowTransferMode,
};
pub use distribution::{assign_rows, RowRange};
pub use forever_constant::*;
pub use header::{parse_header, write_header, HeaderInfo};
pub use page::{PageStatus, SddsReader, SddsWriter};
pub use title::title_byte_len;

/// Default size of the per-worker row transfer buffers, in bytes.
pub const DEFAULT_IO_BUFFER_SIZE: usize = 1 << 20;
/// Default size of the title staging buffer, in bytes.
pub const DEFAULT_TITLE_BUFFER_SIZE: usize = 2400;

/// Constants that will never change (doing so would make existing files
/// unreadable).
mod forever_constant {
    /// First line of every SDDS file.
    pub const SDDS_MAGIC: &str = "SDDS1";

    /// Row count written in place of the real one when a page holds more
    /// than `i32::MAX` rows; the real count follows as an `i64`.
    pub const ROW_COUNT_64BIT_SENTINEL: i32 = i32::MIN;

    /// Default fixed byte width of a string cell in row-major pages.
    pub const DEFAULT_STRING_FIELD_WIDTH: usize = 10;

    /// Declared row counts above this are treated as garbage rather than
    /// data, ending the read at the previous page.
    pub const DEFAULT_ROW_SANITY_CEILING: u64 = 1_000_000_000;
}
