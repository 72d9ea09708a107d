use sdds_dtype::NativeScalar;
use sdds_error::{sdds_bail, SddsResult};

use crate::channel::{ReadChannel, ReadOutcome, WriteChannel};

/// Largest fixed scalar width; scratch buffers are sized to it.
pub(crate) const MAX_SCALAR_WIDTH: usize = 16;

/// Anything the decoder can pull bytes from: a buffered channel over the
/// shared file, or an in-memory slice of broadcast title bytes.
pub(crate) trait ByteSource {
    fn pull(&mut self, dst: &mut [u8]) -> SddsResult<ReadOutcome>;
    fn skip_bytes(&mut self, n: usize) -> SddsResult<ReadOutcome>;
}

impl ByteSource for ReadChannel<'_> {
    fn pull(&mut self, dst: &mut [u8]) -> SddsResult<ReadOutcome> {
        self.read(dst)
    }

    fn skip_bytes(&mut self, n: usize) -> SddsResult<ReadOutcome> {
        self.skip(n)
    }
}

/// A cursor over broadcast title bytes.
#[derive(Debug)]
pub(crate) struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    #[cfg(test)]
    pub(crate) fn consumed(&self) -> usize {
        self.pos
    }
}

impl ByteSource for SliceSource<'_> {
    fn pull(&mut self, dst: &mut [u8]) -> SddsResult<ReadOutcome> {
        let avail = self.data.len() - self.pos;
        let take = avail.min(dst.len());
        dst[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
        self.pos += take;
        Ok(if take == dst.len() {
            ReadOutcome::Full
        } else if take > 0 {
            ReadOutcome::Partial(take)
        } else {
            ReadOutcome::Eof
        })
    }

    fn skip_bytes(&mut self, n: usize) -> SddsResult<ReadOutcome> {
        let avail = self.data.len() - self.pos;
        let take = avail.min(n);
        self.pos += take;
        Ok(if take == n {
            ReadOutcome::Full
        } else if take > 0 {
            ReadOutcome::Partial(take)
        } else {
            ReadOutcome::Eof
        })
    }
}

/// Scalar encoder over a write channel, swapping multi-byte values when the
/// target order is foreign.
pub(crate) struct Encoder<'c, 'f> {
    chan: &'c mut WriteChannel<'f>,
    swap: bool,
}

impl<'c, 'f> Encoder<'c, 'f> {
    pub(crate) fn new(chan: &'c mut WriteChannel<'f>, swap: bool) -> Self {
        Self { chan, swap }
    }

    pub(crate) fn put_scalar<T: NativeScalar>(&mut self, value: T) -> SddsResult<()> {
        let mut raw = [0u8; MAX_SCALAR_WIDTH];
        let raw = &mut raw[..T::WIDTH];
        value.write_native(raw);
        if self.swap {
            raw.reverse();
        }
        self.chan.write(raw)
    }

    pub(crate) fn put_i32(&mut self, value: i32) -> SddsResult<()> {
        self.put_scalar(value)
    }

    pub(crate) fn put_i64(&mut self, value: i64) -> SddsResult<()> {
        self.put_scalar(value)
    }

    /// A length-prefixed string: `i32` byte length (swapped in foreign
    /// order), then the raw bytes, which are never swapped.
    pub(crate) fn put_string(&mut self, value: &str) -> SddsResult<()> {
        let len = i32::try_from(value.len())
            .map_err(|_| sdds_error::sdds_err!("string of {} bytes exceeds i32", value.len()))?;
        self.put_i32(len)?;
        self.chan.write(value.as_bytes())
    }

    /// Raw bytes, no prefix, no swapping.
    pub(crate) fn put_raw(&mut self, bytes: &[u8]) -> SddsResult<()> {
        self.chan.write(bytes)
    }
}

/// Scalar decoder over any [`ByteSource`], un-swapping multi-byte values
/// read in a foreign order.
pub(crate) struct Decoder<'s, S: ByteSource> {
    src: &'s mut S,
    swap: bool,
}

impl<'s, S: ByteSource> Decoder<'s, S> {
    pub(crate) fn new(src: &'s mut S, swap: bool) -> Self {
        Self { src, swap }
    }

    /// Pull one scalar, demanding a full transfer.
    pub(crate) fn get_scalar<T: NativeScalar>(&mut self) -> SddsResult<T> {
        let mut raw = [0u8; MAX_SCALAR_WIDTH];
        let raw = &mut raw[..T::WIDTH];
        self.src.pull(raw)?.require(T::WIDTH)?;
        if self.swap {
            raw.reverse();
        }
        Ok(T::from_native(raw))
    }

    /// Pull one scalar, surfacing the raw outcome so the caller can treat a
    /// clean end-of-file as a signal rather than an error. `None` means EOF
    /// with zero bytes read; a partial read is still an error.
    pub(crate) fn try_get_scalar<T: NativeScalar>(&mut self) -> SddsResult<Option<T>> {
        let mut raw = [0u8; MAX_SCALAR_WIDTH];
        let raw = &mut raw[..T::WIDTH];
        match self.src.pull(raw)? {
            ReadOutcome::Eof => return Ok(None),
            outcome => outcome.require(T::WIDTH)?,
        }
        if self.swap {
            raw.reverse();
        }
        Ok(Some(T::from_native(raw)))
    }

    pub(crate) fn get_i32(&mut self) -> SddsResult<i32> {
        self.get_scalar()
    }

    pub(crate) fn get_i64(&mut self) -> SddsResult<i64> {
        self.get_scalar()
    }

    /// Inverse of [`Encoder::put_string`].
    pub(crate) fn get_string(&mut self) -> SddsResult<String> {
        let len = self.get_i32()?;
        if len < 0 {
            sdds_bail!(DecodeError: "negative string length {}", len);
        }
        let len = len as usize;
        let mut bytes = vec![0u8; len];
        self.src.pull(&mut bytes)?.require(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Raw bytes, no prefix, no swapping.
    pub(crate) fn get_raw(&mut self, dst: &mut [u8]) -> SddsResult<()> {
        let n = dst.len();
        self.src.pull(dst)?.require(n)
    }

    /// Discard raw bytes.
    pub(crate) fn skip_raw(&mut self, n: usize) -> SddsResult<()> {
        self.src.skip_bytes(n)?.require(n)
    }
}

/// Clip a string to at most `width` bytes without splitting a UTF-8
/// sequence. Returns the clipped byte length.
pub(crate) fn clipped_len(s: &str, width: usize) -> usize {
    if s.len() <= width {
        return s.len();
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}
