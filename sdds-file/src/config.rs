use crate::{
    DEFAULT_IO_BUFFER_SIZE, DEFAULT_ROW_SANITY_CEILING, DEFAULT_STRING_FIELD_WIDTH,
    DEFAULT_TITLE_BUFFER_SIZE,
};

/// On-wire multi-byte scalar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least-significant byte first.
    LittleEndian,
    /// Most-significant byte first.
    BigEndian,
}

impl ByteOrder {
    /// This machine's byte order.
    pub const fn native() -> Self {
        #[cfg(target_endian = "little")]
        {
            Self::LittleEndian
        }
        #[cfg(target_endian = "big")]
        {
            Self::BigEndian
        }
    }

    /// Whether values of this order need swapping on this machine.
    pub fn is_native(self) -> bool {
        self == Self::native()
    }

    /// The header keyword (`little` / `big`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::LittleEndian => "little",
            Self::BigEndian => "big",
        }
    }
}

/// How the declared row count in a page title relates to the rows present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCountMode {
    /// The declared count is exact: it bounds the row records that follow.
    Exact,
    /// The declared count is the true count rounded up to `increment`, so a
    /// page can later be extended in place. On read the declared count is a
    /// pre-allocation hint; hitting end-of-file before it is normal page
    /// termination, not an error.
    Rounded {
        /// Rounding granularity in rows; must be at least 1.
        increment: u64,
    },
}

impl RowCountMode {
    /// The count to declare in the title for `rows` actual rows.
    pub fn declared(self, rows: u64) -> u64 {
        match self {
            Self::Exact => rows,
            Self::Rounded { increment } => {
                let inc = increment.max(1);
                rows.div_ceil(inc) * inc
            }
        }
    }
}

/// How a worker group moves row data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTransferMode {
    /// Each worker reads/writes its own row range independently.
    Independent,
    /// Workers issue same-shaped collective calls for the row count common
    /// to all of them, then finish any surplus independently. Required when
    /// the substrate demands symmetric participation per call.
    Collective,
}

/// Row data layout within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// One row is one contiguous record.
    RowMajor,
    /// One column is one contiguous run. String columns are unsupported.
    ColumnMajor,
}

/// Configuration for parallel page I/O, passed in when a dataset is opened.
///
/// This replaces mutable process-wide settings: two datasets open in one
/// process cannot interfere through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIoOptions {
    /// Read-side buffer capacity in bytes; 0 disables buffering.
    pub read_buffer_size: usize,
    /// Write-side buffer capacity in bytes; 0 disables buffering.
    pub write_buffer_size: usize,
    /// Initial size of the title buffer the master reads and broadcasts.
    pub title_buffer_size: usize,
    /// Fixed payload width for string column values; longer strings are
    /// clipped and counted on the dataset's truncation counter.
    pub string_field_width: usize,
    /// Force a wire byte order; `None` writes this machine's native order.
    pub byte_order: Option<ByteOrder>,
    /// Whether the master worker also carries a row share.
    pub master_participates: bool,
    /// Independent or collective row transfer.
    pub row_transfer: RowTransferMode,
    /// Row-major or column-major page layout.
    pub row_layout: RowLayout,
    /// Tolerate a truncated/corrupt page tail by accepting the rows that
    /// decoded cleanly.
    pub auto_recover: bool,
    /// Declared-row-count semantics.
    pub row_count_mode: RowCountMode,
    /// Declared row counts above this are treated as garbage, i.e. as
    /// end-of-file.
    pub row_sanity_ceiling: u64,
}

impl Default for PageIoOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_IO_BUFFER_SIZE,
            write_buffer_size: DEFAULT_IO_BUFFER_SIZE,
            title_buffer_size: DEFAULT_TITLE_BUFFER_SIZE,
            string_field_width: DEFAULT_STRING_FIELD_WIDTH,
            byte_order: None,
            master_participates: true,
            row_transfer: RowTransferMode::Independent,
            row_layout: RowLayout::RowMajor,
            auto_recover: false,
            row_count_mode: RowCountMode::Exact,
            row_sanity_ceiling: DEFAULT_ROW_SANITY_CEILING,
        }
    }
}

impl PageIoOptions {
    /// Set both I/O buffer capacities.
    pub fn with_buffer_sizes(mut self, read: usize, write: usize) -> Self {
        self.read_buffer_size = read;
        self.write_buffer_size = write;
        self
    }

    /// Set the title buffer size.
    pub fn with_title_buffer_size(mut self, size: usize) -> Self {
        self.title_buffer_size = size;
        self
    }

    /// Set the fixed string field width.
    pub fn with_string_field_width(mut self, width: usize) -> Self {
        self.string_field_width = width;
        self
    }

    /// Force the wire byte order.
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = Some(order);
        self
    }

    /// Exclude the master worker from row data.
    pub fn without_master_rows(mut self) -> Self {
        self.master_participates = false;
        self
    }

    /// Use collective row transfer.
    pub fn with_collective_rows(mut self) -> Self {
        self.row_transfer = RowTransferMode::Collective;
        self
    }

    /// Use column-major page layout.
    pub fn with_column_major(mut self) -> Self {
        self.row_layout = RowLayout::ColumnMajor;
        self
    }

    /// Enable auto-recovery of truncated pages.
    pub fn with_auto_recovery(mut self) -> Self {
        self.auto_recover = true;
        self
    }

    /// Set the declared-row-count mode.
    pub fn with_row_count_mode(mut self, mode: RowCountMode) -> Self {
        self.row_count_mode = mode;
        self
    }

    /// The wire byte order after applying the native default.
    pub fn resolved_byte_order(&self) -> ByteOrder {
        self.byte_order.unwrap_or(ByteOrder::native())
    }

    /// Whether the resolved order requires swapping on this machine.
    pub fn swapped(&self) -> bool {
        !self.resolved_byte_order().is_native()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_order_needs_no_swap() {
        assert!(!PageIoOptions::default().swapped());
        let forced = PageIoOptions::default().with_byte_order(match ByteOrder::native() {
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
        });
        assert!(forced.swapped());
    }

    #[test]
    fn rounded_mode_rounds_up() {
        let mode = RowCountMode::Rounded { increment: 100 };
        assert_eq!(mode.declared(0), 0);
        assert_eq!(mode.declared(1), 100);
        assert_eq!(mode.declared(100), 100);
        assert_eq!(mode.declared(101), 200);
        assert_eq!(RowCountMode::Exact.declared(37), 37);
    }
}
