use std::ops::Range;

use sdds_comm::SharedFile;
use sdds_dataset::{match_each_numeric_store, ColumnStore, Dataset};
use sdds_dtype::NativeScalar;
use sdds_error::{sdds_bail, sdds_err, SddsError, SddsResult};

use crate::channel::{ReadChannel, ReadOutcome, WriteChannel};
use crate::codec::{clipped_len, Decoder, Encoder, MAX_SCALAR_WIDTH};
use crate::distribution::RowRange;

/// Swaps the byte order of the numeric column stores over a row range on
/// construction and restores it on drop, so a non-native transfer can fail
/// (or panic) anywhere without leaving the in-memory data foreign-ordered.
pub(crate) struct SwapScope<'a> {
    columns: &'a mut [ColumnStore],
    rows: Range<usize>,
    active: bool,
}

impl<'a> SwapScope<'a> {
    pub(crate) fn new(columns: &'a mut [ColumnStore], rows: Range<usize>, active: bool) -> Self {
        if active {
            for col in columns.iter_mut() {
                col.swap_byte_order(rows.clone());
            }
        }
        Self {
            columns,
            rows,
            active,
        }
    }

    pub(crate) fn columns(&mut self) -> &mut [ColumnStore] {
        self.columns
    }
}

impl Drop for SwapScope<'_> {
    fn drop(&mut self) {
        if self.active {
            for col in self.columns.iter_mut() {
                col.swap_byte_order(self.rows.clone());
            }
        }
    }
}

/// Outcome of a row-range decode: how many rows decoded completely, and the
/// error that stopped the loop early, if any. The orchestrator decides
/// whether that error becomes auto-recovery or a hard failure.
#[derive(Debug)]
pub(crate) struct RowReadResult {
    pub rows: u64,
    pub error: Option<SddsError>,
}

fn put_fixed_string(
    chan: &mut WriteChannel<'_>,
    value: &str,
    width: usize,
    swap: bool,
    pad: &[u8],
) -> SddsResult<bool> {
    let len = clipped_len(value, width);
    let mut enc = Encoder::new(chan, swap);
    enc.put_i32(len as i32)?;
    enc.put_raw(&value.as_bytes()[..len])?;
    enc.put_raw(&pad[..width - len])?;
    Ok(len < value.len())
}

/// Write rows `rows` of the page in row-major order: per row, per column in
/// schema order. String values are clipped to `string_width` and padded to
/// it, keeping every row at the same byte width. Returns the rows written.
///
/// In swapped mode the numeric stores are byte-swapped in place around the
/// whole loop (and restored on every exit path); string payloads are never
/// swapped, only their length prefixes.
pub(crate) fn write_rows_row_major(
    chan: &mut WriteChannel<'_>,
    dataset: &mut Dataset,
    rows: Range<usize>,
    string_width: usize,
    swap: bool,
    honor_flags: bool,
) -> SddsResult<u64> {
    let mut truncated = 0u64;
    let mut written = 0u64;
    let pad = vec![0u8; string_width];
    {
        let (_schema, page) = dataset.split_mut();
        let (columns, flags) = page.columns_and_flags_mut();
        let mut scope = SwapScope::new(columns, rows.clone(), swap);
        for r in rows {
            if honor_flags && !flags[r] {
                continue;
            }
            for col in scope.columns().iter() {
                match col {
                    ColumnStore::String(items) => {
                        if put_fixed_string(chan, &items[r], string_width, swap, &pad)? {
                            truncated += 1;
                        }
                    }
                    numeric => {
                        // The scope already holds these in wire order; emit
                        // the raw native bytes untouched.
                        let mut enc = Encoder::new(chan, false);
                        match_each_numeric_store!(numeric, |v| enc.put_scalar(v[r])?);
                    }
                }
            }
            written += 1;
        }
    }
    dataset.note_truncations(truncated);
    Ok(written)
}

fn read_fixed_string(
    dec: &mut Decoder<'_, ReadChannel<'_>>,
    width: usize,
    keep: bool,
) -> SddsResult<Option<String>> {
    let len = dec.get_i32()?;
    if len < 0 {
        sdds_bail!(DecodeError: "negative string length {}", len);
    }
    let len = len as usize;
    if len > width {
        sdds_bail!(DecodeError: "string length {} exceeds field width {}", len, width);
    }
    if !keep {
        dec.skip_raw(width)?;
        return Ok(None);
    }
    let mut bytes = vec![0u8; len];
    dec.get_raw(&mut bytes)?;
    dec.skip_raw(width - len)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn read_one_row(
    chan: &mut ReadChannel<'_>,
    columns: &mut [ColumnStore],
    string_width: usize,
    swap: bool,
    keep: bool,
) -> SddsResult<()> {
    for col in columns.iter_mut() {
        match col {
            ColumnStore::String(items) => {
                let mut dec = Decoder::new(chan, swap);
                if let Some(s) = read_fixed_string(&mut dec, string_width, keep)? {
                    items.push(s);
                }
            }
            numeric => {
                let mut dec = Decoder::new(chan, swap);
                if keep {
                    match_each_numeric_store!(numeric, |v| v.push(dec.get_scalar()?));
                } else {
                    let width = numeric
                        .dtype()
                        .fixed_size()
                        .ok_or_else(|| sdds_err!("unsized column type"))?;
                    dec.skip_raw(width)?;
                }
            }
        }
    }
    Ok(())
}

/// Read up to `expect_rows` rows in row-major order, appending to the page's
/// column stores. Decodes row by row; on a mid-row failure the page is
/// trimmed back to the last fully decoded row and the error is surfaced in
/// the result for the caller's recovery policy.
///
/// With `keep` false, values are structurally validated and discarded
/// without being stored (string payloads are skipped, never allocated).
pub(crate) fn read_rows_row_major(
    chan: &mut ReadChannel<'_>,
    dataset: &mut Dataset,
    expect_rows: u64,
    string_width: usize,
    swap: bool,
    keep: bool,
) -> RowReadResult {
    let (_schema, page) = dataset.split_mut();
    let base = page.row_count();
    let mut decoded = 0u64;
    let mut error = None;
    while decoded < expect_rows {
        match read_one_row(chan, page.columns_mut(), string_width, swap, keep) {
            Ok(()) => decoded += 1,
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    let total = base + usize::try_from(decoded).unwrap_or(usize::MAX);
    if keep {
        // Drop any columns decoded from a partial trailing row.
        page.truncate_rows(total);
        page.set_row_count(total);
    }
    RowReadResult {
        rows: decoded,
        error,
    }
}

/// Write rows `rows` in column-major order. On the wire each column is one
/// contiguous block of `declared_rows × typeSize` bytes spanning the whole
/// page, so this worker's piece of column `c` lands at
/// `title_end + Σ(preceding column block sizes) + start_row × typeSize`.
/// String columns cannot be laid out at fixed width this way and are
/// rejected. Row flags are ignored in this mode.
pub(crate) fn write_columns(
    file: &mut SharedFile,
    dataset: &mut Dataset,
    rows: Range<usize>,
    start_row: u64,
    declared_rows: u64,
    title_end: u64,
    swap: bool,
) -> SddsResult<u64> {
    if dataset.schema().has_string_column() {
        sdds_bail!("string columns are unsupported in column-major layout");
    }
    let count = rows.len() as u64;
    let (_schema, page) = dataset.split_mut();
    let mut scope = SwapScope::new(page.columns_mut(), rows.clone(), swap);
    let mut col_base = title_end;
    for col in scope.columns().iter() {
        let width = col.dtype().fixed_size().unwrap_or(MAX_SCALAR_WIDTH) as u64;
        file.set_view(col_base + start_row * width);
        let block = column_block(col, rows.clone());
        let n = file.write(&block)?;
        if n != block.len() {
            return Err(SddsError::Truncated {
                expected: block.len(),
                actual: n,
            });
        }
        col_base += declared_rows * width;
    }
    Ok(count)
}

fn column_block(col: &ColumnStore, rows: Range<usize>) -> Vec<u8> {
    match_each_numeric_store!(col, |v| block_of(&v[rows]))
}

fn block_of<T: NativeScalar>(values: &[T]) -> Vec<u8> {
    let mut block = vec![0u8; values.len() * T::WIDTH];
    for (chunk, v) in block.chunks_exact_mut(T::WIDTH).zip(values) {
        v.write_native(chunk);
    }
    block
}

/// Read this worker's share of each column block, in column-major order:
/// column `c`'s block starts at `title_end + Σ(preceding column block
/// sizes)` (block sizes from the declared count) and the share's slice at
/// `share.start × typeSize` within it. A short block in any column trims
/// the page to the rows that are complete across every column.
pub(crate) fn read_columns(
    file: &mut SharedFile,
    dataset: &mut Dataset,
    share: RowRange,
    declared_rows: u64,
    title_end: u64,
    buffer_size: usize,
    swap: bool,
) -> RowReadResult {
    if dataset.schema().has_string_column() {
        return RowReadResult {
            rows: 0,
            error: Some(sdds_err!(
                "string columns are unsupported in column-major layout"
            )),
        };
    }
    let expect = usize::try_from(share.count).unwrap_or(usize::MAX);
    let (_schema, page) = dataset.split_mut();
    let base = page.row_count();
    let mut complete = expect;
    let mut error = None;
    let mut col_base = title_end;
    for col in page.columns_mut().iter_mut() {
        let width = col.dtype().fixed_size().unwrap_or(MAX_SCALAR_WIDTH) as u64;
        file.set_view(col_base + share.start * width);
        let mut chan = ReadChannel::new(file, buffer_size);
        let got = match_each_numeric_store!(col, |v| fill_column(&mut chan, v, expect, swap));
        match got {
            Ok(n) if n == expect => {}
            Ok(n) => {
                complete = complete.min(n);
                error = Some(SddsError::Truncated {
                    expected: expect,
                    actual: n,
                });
                break;
            }
            Err(e) => {
                complete = 0;
                error = Some(e);
                break;
            }
        }
        col_base += declared_rows * width;
    }
    // Columns after the one that stopped the loop were never read, so the
    // page only has the rows present in every column.
    let total = page
        .columns()
        .iter()
        .map(ColumnStore::len)
        .min()
        .unwrap_or(base + complete)
        .min(base + complete);
    page.truncate_rows(total);
    page.set_row_count(total);
    RowReadResult {
        rows: (total - base) as u64,
        error,
    }
}

fn fill_column<T: NativeScalar>(
    chan: &mut ReadChannel<'_>,
    vec: &mut Vec<T>,
    expect: usize,
    swap: bool,
) -> SddsResult<usize> {
    let mut block = vec![0u8; expect * T::WIDTH];
    let served = match chan.read(&mut block)? {
        ReadOutcome::Full => expect * T::WIDTH,
        ReadOutcome::Partial(n) => n,
        ReadOutcome::Eof => 0,
    };
    let whole = served / T::WIDTH;
    for chunk in block[..whole * T::WIDTH].chunks_exact_mut(T::WIDTH) {
        if swap {
            chunk.reverse();
        }
        vec.push(T::from_native(chunk));
    }
    Ok(whole)
}
