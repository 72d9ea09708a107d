use sdds_comm::{Collective, SharedFile};
use sdds_dataset::{match_each_numeric_store, ColumnStore, Dataset};
use sdds_dtype::NativeScalar;
use sdds_error::{sdds_bail, SddsError, SddsResult};

use crate::channel::{ReadChannel, ReadOutcome, WriteChannel};
use crate::codec::MAX_SCALAR_WIDTH;
use crate::row::RowReadResult;

fn require_no_strings(dataset: &Dataset) -> SddsResult<()> {
    if dataset.schema().has_string_column() {
        sdds_bail!("string columns are unsupported in collective row transfers");
    }
    Ok(())
}

fn scalar_bytes(
    col: &ColumnStore,
    row: usize,
    swap: bool,
    out: &mut [u8; MAX_SCALAR_WIDTH],
) -> usize {
    match_each_numeric_store!(col, |v| {
        let value = v[row];
        let width = width_of(&value);
        value.write_native(&mut out[..width]);
        if swap {
            out[..width].reverse();
        }
        width
    })
}

fn width_of<T: NativeScalar>(_: &T) -> usize {
    T::WIDTH
}

fn push_scalar(col: &mut ColumnStore, raw: &mut [u8], swap: bool) {
    if swap {
        raw.reverse();
    }
    match_each_numeric_store!(col, |v| v.push(NativeScalar::from_native(raw)));
}

fn serialize_row(columns: &[ColumnStore], row: usize, swap: bool, out: &mut Vec<u8>) {
    out.clear();
    let mut scratch = [0u8; MAX_SCALAR_WIDTH];
    for col in columns {
        let width = scalar_bytes(col, row, swap, &mut scratch);
        out.extend_from_slice(&scratch[..width]);
    }
}

/// Write this worker's `local_rows` (store indices, already filtered by any
/// row flags) in lockstep with every other worker: for the communicator-wide
/// minimum row count, each scalar goes out through its own substrate call
/// with a barrier in front, so all workers issue the same synchronized call
/// sequence. Surplus rows beyond the minimum go through an ordinary
/// buffered channel.
///
/// A worker that fails mid-sequence keeps participating in the remaining
/// barriers before surfacing its error, so no peer is left waiting.
pub(crate) fn write_rows_collective<C: Collective>(
    comm: &C,
    file: &mut SharedFile,
    dataset: &Dataset,
    local_rows: &[usize],
    buffer_size: usize,
    swap: bool,
) -> SddsResult<u64> {
    require_no_strings(dataset)?;
    let lockstep = comm.min_u64(local_rows.len() as u64)? as usize;
    let columns = dataset.page().columns();

    let mut scratch = [0u8; MAX_SCALAR_WIDTH];
    let mut failure: Option<SddsError> = None;
    for &row in &local_rows[..lockstep] {
        for col in columns {
            comm.barrier();
            if failure.is_some() {
                continue;
            }
            let width = scalar_bytes(col, row, swap, &mut scratch);
            match file.write(&scratch[..width]) {
                Ok(n) if n == width => {}
                Ok(n) => {
                    failure = Some(SddsError::Truncated {
                        expected: width,
                        actual: n,
                    })
                }
                Err(e) => failure = Some(e),
            }
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    let mut row_bytes = Vec::new();
    let mut chan = WriteChannel::new(file, buffer_size);
    for &row in &local_rows[lockstep..] {
        serialize_row(columns, row, swap, &mut row_bytes);
        chan.write(&row_bytes)?;
    }
    chan.flush()?;
    Ok(local_rows.len() as u64)
}

/// Mirror of [`write_rows_collective`]: the communicator-wide minimum row
/// count is read one synchronized substrate call per scalar, the surplus
/// through a buffered channel. Appends to the page's column stores.
pub(crate) fn read_rows_collective<C: Collective>(
    comm: &C,
    file: &mut SharedFile,
    dataset: &mut Dataset,
    expect_rows: u64,
    row_width: usize,
    buffer_size: usize,
    swap: bool,
) -> SddsResult<RowReadResult> {
    require_no_strings(dataset)?;
    let lockstep = comm.min_u64(expect_rows)?;
    let (_schema, page) = dataset.split_mut();
    let base = page.row_count();

    let mut scratch = [0u8; MAX_SCALAR_WIDTH];
    let mut decoded = 0u64;
    let mut failure: Option<SddsError> = None;
    for _ in 0..lockstep {
        let mut row_ok = failure.is_none();
        for col in page.columns_mut().iter_mut() {
            comm.barrier();
            if failure.is_some() {
                continue;
            }
            let width = col.dtype().fixed_size().unwrap_or(MAX_SCALAR_WIDTH);
            match file.read(&mut scratch[..width]) {
                Ok(n) if n == width => push_scalar(col, &mut scratch[..width], swap),
                Ok(0) => failure = Some(SddsError::UnexpectedEof { expected: width }),
                Ok(n) => {
                    failure = Some(SddsError::Truncated {
                        expected: width,
                        actual: n,
                    })
                }
                Err(e) => failure = Some(e),
            }
            if failure.is_some() {
                row_ok = false;
            }
        }
        if row_ok {
            decoded += 1;
        }
    }

    if failure.is_none() {
        let mut row_bytes = vec![0u8; row_width];
        let mut chan = ReadChannel::new(file, buffer_size);
        while decoded < expect_rows {
            match chan.read(&mut row_bytes) {
                Ok(ReadOutcome::Full) => {
                    let mut pos = 0usize;
                    for col in page.columns_mut().iter_mut() {
                        let width = col.dtype().fixed_size().unwrap_or(MAX_SCALAR_WIDTH);
                        push_scalar(col, &mut row_bytes[pos..pos + width], swap);
                        pos += width;
                    }
                    decoded += 1;
                }
                Ok(outcome) => {
                    failure = outcome.require(row_width).err();
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
    }

    let total = base + usize::try_from(decoded).unwrap_or(usize::MAX);
    page.truncate_rows(total);
    page.set_row_count(total);
    Ok(RowReadResult {
        rows: decoded,
        error: failure,
    })
}
