use sdds_error::sdds_panic;

use crate::SddsType;

/// Reverse the byte order of one scalar of `dtype`, in place.
///
/// For [`SddsType::String`] the buffer must hold the 4-byte length prefix;
/// string payload bytes are never swapped. [`SddsType::Character`] is a
/// no-op. The type catalog is closed and validated at definition time, so a
/// width mismatch here is a programming error and panics.
pub fn swap_scalar(dtype: SddsType, bytes: &mut [u8]) {
    let width = match dtype {
        SddsType::String => 4,
        _ => dtype.fixed_size().unwrap_or_else(|| sdds_panic!("unsized type {}", dtype)),
    };
    if bytes.len() != width {
        sdds_panic!(
            "swap of {} expects {} bytes, got {}",
            dtype,
            width,
            bytes.len()
        );
    }
    bytes.reverse();
}

/// Reverse the byte order of every scalar in a contiguous block of fixed-width
/// values, in place.
///
/// The block length must be a multiple of the type's wire width. Strings have
/// no contiguous block form and panic here.
pub fn swap_block(dtype: SddsType, bytes: &mut [u8]) {
    let width = dtype
        .fixed_size()
        .unwrap_or_else(|| sdds_panic!("no contiguous block form for {}", dtype));
    if bytes.len() % width != 0 {
        sdds_panic!(
            "block of {} bytes is not a multiple of {} ({} values)",
            bytes.len(),
            width,
            dtype
        );
    }
    if width == 1 {
        return;
    }
    for chunk in bytes.chunks_exact_mut(width) {
        chunk.reverse();
    }
}
