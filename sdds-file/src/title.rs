use sdds_dataset::{
    match_each_store, ArrayValue, ColumnStore, Dataset, Value,
};
use sdds_dtype::SddsType;
use sdds_error::{sdds_bail, SddsResult};

use crate::codec::{ByteSource, Decoder, Encoder};
use crate::WriteChannel;
use crate::ROW_COUNT_64BIT_SENTINEL;

/// Result of decoding a page title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TitleOutcome {
    /// A valid title declaring this many rows.
    Rows(u64),
    /// Clean end-of-file, or a row count failing the sanity check: in either
    /// case there is no further page to read.
    EndOfFile,
}

fn put_value(enc: &mut Encoder<'_, '_>, value: &Value) -> SddsResult<()> {
    match value {
        Value::LongDouble(v) => enc.put_scalar(*v),
        Value::Double(v) => enc.put_scalar(*v),
        Value::Float(v) => enc.put_scalar(*v),
        Value::Long64(v) => enc.put_scalar(*v),
        Value::ULong64(v) => enc.put_scalar(*v),
        Value::Long(v) => enc.put_scalar(*v),
        Value::ULong(v) => enc.put_scalar(*v),
        Value::Short(v) => enc.put_scalar(*v),
        Value::UShort(v) => enc.put_scalar(*v),
        Value::Character(v) => enc.put_scalar(*v),
        Value::String(s) => enc.put_string(s),
    }
}

fn get_value<S: ByteSource>(dec: &mut Decoder<'_, S>, dtype: SddsType) -> SddsResult<Value> {
    Ok(match dtype {
        SddsType::LongDouble => Value::LongDouble(dec.get_scalar()?),
        SddsType::Double => Value::Double(dec.get_scalar()?),
        SddsType::Float => Value::Float(dec.get_scalar()?),
        SddsType::Long64 => Value::Long64(dec.get_scalar()?),
        SddsType::ULong64 => Value::ULong64(dec.get_scalar()?),
        SddsType::Long => Value::Long(dec.get_scalar()?),
        SddsType::ULong => Value::ULong(dec.get_scalar()?),
        SddsType::Short => Value::Short(dec.get_scalar()?),
        SddsType::UShort => Value::UShort(dec.get_scalar()?),
        SddsType::Character => Value::Character(dec.get_scalar()?),
        SddsType::String => Value::String(dec.get_string()?),
    })
}

fn put_store(enc: &mut Encoder<'_, '_>, store: &ColumnStore) -> SddsResult<()> {
    match_each_store!(
        store,
        |v| {
            for x in v.iter() {
                enc.put_scalar(*x)?;
            }
            Ok(())
        },
        |s| {
            for x in s.iter() {
                enc.put_string(x)?;
            }
            Ok(())
        }
    )
}

fn get_store<S: ByteSource>(
    dec: &mut Decoder<'_, S>,
    dtype: SddsType,
    count: usize,
) -> SddsResult<ColumnStore> {
    let mut store = ColumnStore::with_capacity(dtype, count);
    match_each_store!(
        &mut store,
        |v| {
            for _ in 0..count {
                v.push(dec.get_scalar()?);
            }
        },
        |s| {
            for _ in 0..count {
                s.push(dec.get_string()?);
            }
        }
    );
    Ok(store)
}

/// Serialize the page title: declared row count, every non-fixed parameter
/// value in definition order, then every array's dimension vector and
/// elements. Only the master worker calls this.
pub(crate) fn write_title(
    chan: &mut WriteChannel<'_>,
    dataset: &Dataset,
    swap: bool,
    declared_rows: u64,
) -> SddsResult<()> {
    let mut enc = Encoder::new(chan, swap);
    if declared_rows > i32::MAX as u64 {
        enc.put_i32(ROW_COUNT_64BIT_SENTINEL)?;
        enc.put_i64(i64::try_from(declared_rows).map_err(
            |_| sdds_error::sdds_err!("row count {} exceeds i64", declared_rows),
        )?)?;
    } else {
        enc.put_i32(declared_rows as i32)?;
    }

    let schema = dataset.schema();
    let page = dataset.page();
    for (def, value) in schema.parameters().iter().zip(page.parameters()) {
        if def.is_fixed() {
            continue;
        }
        put_value(&mut enc, value)?;
    }
    for (def, value) in schema.arrays().iter().zip(page.arrays()) {
        match value {
            None => {
                // A null array still emits its dimension vector, as zeros,
                // to keep the wire layout stable.
                for _ in 0..def.dimensions {
                    enc.put_i32(0)?;
                }
            }
            Some(array) => {
                for &dim in array.dims() {
                    enc.put_i32(i32::try_from(dim).map_err(
                        |_| sdds_error::sdds_err!("array dimension {} exceeds i32", dim),
                    )?)?;
                }
                put_store(&mut enc, array.store())?;
            }
        }
    }
    Ok(())
}

/// Decode a page title into the dataset's page storage, the inverse of
/// [`write_title`]. A clean end-of-file at the row count, a negative decoded
/// count, or a count above `ceiling` all yield
/// [`TitleOutcome::EndOfFile`] rather than an error.
pub(crate) fn read_title<S: ByteSource>(
    src: &mut S,
    dataset: &mut Dataset,
    swap: bool,
    ceiling: u64,
) -> SddsResult<TitleOutcome> {
    let mut dec = Decoder::new(src, swap);
    let rows = match dec.try_get_scalar::<i32>()? {
        None => return Ok(TitleOutcome::EndOfFile),
        Some(ROW_COUNT_64BIT_SENTINEL) => dec.get_i64()?,
        Some(count) => i64::from(count),
    };
    if rows < 0 || rows as u64 > ceiling {
        // Garbage where a title should be; treat as the end of the data.
        return Ok(TitleOutcome::EndOfFile);
    }

    let (schema, page) = dataset.split_mut();
    for (def, slot) in schema.parameters().iter().zip(page.parameters_mut()) {
        if def.is_fixed() {
            continue;
        }
        *slot = get_value(&mut dec, def.dtype)?;
    }
    for (def, slot) in schema.arrays().iter().zip(page.arrays_mut()) {
        let mut dims = Vec::with_capacity(def.dimensions);
        for _ in 0..def.dimensions {
            let dim = dec.get_i32()?;
            if dim < 0 {
                sdds_bail!(DecodeError: "negative array dimension {} for {:?}", dim, def.name);
            }
            dims.push(dim as u32);
        }
        if dims.iter().all(|&d| d == 0) {
            // Indistinguishable from a null array on the wire; decode as one.
            *slot = None;
            continue;
        }
        let count = dims.iter().map(|&d| d as usize).product();
        let store = get_store(&mut dec, def.dtype, count)?;
        *slot = Some(ArrayValue::new(def, dims, store)?);
    }
    Ok(TitleOutcome::Rows(rows as u64))
}

/// The exact number of bytes [`write_title`] emits for the dataset's current
/// in-memory values and `declared_rows`.
///
/// Used to position the file cursor past a title without re-reading it, so
/// it must stay byte-identical to the write path, including the 32-vs-64-bit
/// row count branch and zero-length vs populated arrays.
pub fn title_byte_len(dataset: &Dataset, declared_rows: u64) -> u64 {
    let mut len: u64 = if declared_rows > i32::MAX as u64 { 12 } else { 4 };
    let schema = dataset.schema();
    let page = dataset.page();
    for (def, value) in schema.parameters().iter().zip(page.parameters()) {
        if def.is_fixed() {
            continue;
        }
        len += match value {
            Value::String(s) => 4 + s.len() as u64,
            other => other
                .dtype()
                .fixed_size()
                .map(|w| w as u64)
                .unwrap_or_default(),
        };
    }
    for (def, value) in schema.arrays().iter().zip(page.arrays()) {
        len += 4 * def.dimensions as u64;
        if let Some(array) = value {
            len += match array.store() {
                ColumnStore::String(items) => {
                    items.iter().map(|s| 4 + s.len() as u64).sum::<u64>()
                }
                numeric => {
                    let width = numeric
                        .dtype()
                        .fixed_size()
                        .map(|w| w as u64)
                        .unwrap_or_default();
                    numeric.len() as u64 * width
                }
            };
        }
    }
    len
}
