use sdds_comm::SharedFile;
use sdds_error::{SddsError, SddsResult};

/// Result of a buffered read: all requested bytes, a partial transfer, or
/// end-of-file with nothing read. The three cases are never conflated; the
/// orchestrator maps page-start `Eof` to the "no more pages" signal while a
/// mid-row `Eof` or `Partial` is a truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Every requested byte was delivered.
    Full,
    /// Only this many bytes were delivered before the channel ran dry.
    Partial(usize),
    /// Zero bytes were available.
    Eof,
}

impl ReadOutcome {
    /// Demand a full transfer of `expected` bytes, converting the other
    /// outcomes into their distinct error forms.
    pub fn require(self, expected: usize) -> SddsResult<()> {
        match self {
            Self::Full => Ok(()),
            Self::Partial(actual) => Err(SddsError::Truncated { expected, actual }),
            Self::Eof => Err(SddsError::UnexpectedEof { expected }),
        }
    }
}

/// A write-side user-space buffer over one worker's [`SharedFile`] view.
///
/// Absorbs small writes and guarantees at most two substrate calls per
/// [`WriteChannel::write`], however large the payload: one flush of the full
/// buffer plus either one direct write of the remainder or a copy of the
/// remainder into the emptied buffer.
#[derive(Debug)]
pub struct WriteChannel<'f> {
    file: &'f mut SharedFile,
    buf: Vec<u8>,
    capacity: usize,
}

impl<'f> WriteChannel<'f> {
    /// A channel over `file` with the given buffer capacity; 0 is unbuffered.
    pub fn new(file: &'f mut SharedFile, capacity: usize) -> Self {
        Self {
            file,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes currently resident in the buffer.
    pub fn bytes_buffered(&self) -> usize {
        self.buf.len()
    }

    /// The buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn substrate_write(&mut self, data: &[u8]) -> SddsResult<()> {
        let n = self.file.write(data)?;
        if n != data.len() {
            return Err(SddsError::Truncated {
                expected: data.len(),
                actual: n,
            });
        }
        Ok(())
    }

    /// Buffer `data`, spilling to the substrate when the buffer fills.
    pub fn write(&mut self, data: &[u8]) -> SddsResult<()> {
        if self.capacity == 0 {
            return self.substrate_write(data);
        }
        let room = self.capacity - self.buf.len();
        if data.len() <= room {
            self.buf.extend_from_slice(data);
            return Ok(());
        }
        // Top the buffer up, write it out whole, then place the remainder:
        // directly if it would overflow the empty buffer again, buffered
        // otherwise. Never more than two substrate calls.
        let (head, rest) = data.split_at(room);
        self.buf.extend_from_slice(head);
        let full = std::mem::take(&mut self.buf);
        let write_result = self.substrate_write(&full);
        self.buf = full;
        self.buf.clear();
        write_result?;
        if rest.len() > self.capacity {
            self.substrate_write(rest)?;
        } else {
            self.buf.extend_from_slice(rest);
        }
        Ok(())
    }

    /// Write out the filled portion of the buffer and reset it.
    pub fn flush(&mut self) -> SddsResult<()> {
        debug_assert!(self.buf.len() <= self.capacity);
        if self.buf.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buf);
        let write_result = self.substrate_write(&pending);
        self.buf = pending;
        self.buf.clear();
        write_result
    }
}

/// A read-side user-space buffer over one worker's [`SharedFile`] view.
///
/// Mirror of [`WriteChannel`]: small reads are satisfied from the buffer,
/// larger ones drain the buffer and then either read directly into the
/// caller or refill the buffer once. A `skip` discards bytes without ever
/// materializing them into caller memory.
#[derive(Debug)]
pub struct ReadChannel<'f> {
    file: &'f mut SharedFile,
    buf: Vec<u8>,
    pos: usize,
    capacity: usize,
    eof: bool,
}

impl<'f> ReadChannel<'f> {
    /// A channel over `file` with the given buffer capacity; 0 is unbuffered.
    pub fn new(file: &'f mut SharedFile, capacity: usize) -> Self {
        Self {
            file,
            buf: Vec::with_capacity(capacity),
            pos: 0,
            capacity,
            eof: false,
        }
    }

    /// Bytes currently resident in the buffer.
    pub fn bytes_buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a substrate read has returned zero bytes.
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    /// Read exactly `dst.len()` bytes if available.
    pub fn read(&mut self, dst: &mut [u8]) -> SddsResult<ReadOutcome> {
        self.transfer(dst)
    }

    /// Discard exactly `n` bytes if available, without copying them out.
    pub fn skip(&mut self, n: usize) -> SddsResult<ReadOutcome> {
        self.discard(n)
    }

    fn refill(&mut self) -> SddsResult<usize> {
        debug_assert!(self.pos == self.buf.len());
        self.buf.resize(self.capacity, 0);
        let n = self.file.read(&mut self.buf)?;
        self.buf.truncate(n);
        self.pos = 0;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    fn serve_from_buffer(&mut self, dst: Option<&mut [u8]>, want: usize) -> usize {
        let avail = self.buf.len() - self.pos;
        let take = avail.min(want);
        if let Some(dst) = dst {
            dst[..take].copy_from_slice(&self.buf[self.pos..self.pos + take]);
        }
        self.pos += take;
        take
    }

    fn outcome(served: usize, want: usize) -> ReadOutcome {
        if served == want {
            ReadOutcome::Full
        } else if served > 0 {
            ReadOutcome::Partial(served)
        } else {
            ReadOutcome::Eof
        }
    }

    fn transfer(&mut self, dst: &mut [u8]) -> SddsResult<ReadOutcome> {
        let want = dst.len();
        let mut served = self.serve_from_buffer(Some(dst), want);
        if served == want {
            return Ok(ReadOutcome::Full);
        }
        let remaining = want - served;
        if self.capacity == 0 || remaining >= self.capacity {
            // Too big to be worth staging: one direct substrate read.
            let n = self.file.read(&mut dst[served..])?;
            if n == 0 {
                self.eof = true;
            }
            served += n;
        } else {
            // Refill the buffer once and serve the rest from it.
            self.refill()?;
            served += self.serve_from_buffer(Some(&mut dst[served..]), remaining);
        }
        Ok(Self::outcome(served, want))
    }

    fn discard(&mut self, want: usize) -> SddsResult<ReadOutcome> {
        let mut served = self.serve_from_buffer(None, want);
        if self.capacity == 0 {
            // Unbuffered: drain through a small scratch block.
            let mut scratch = [0u8; 512];
            while served < want && !self.eof {
                let chunk = scratch.len().min(want - served);
                let n = self.file.read(&mut scratch[..chunk])?;
                if n == 0 {
                    self.eof = true;
                    break;
                }
                served += n;
                if n < chunk {
                    break;
                }
            }
            return Ok(Self::outcome(served, want));
        }
        while served < want {
            let n = self.refill()?;
            if n == 0 {
                break;
            }
            served += self.serve_from_buffer(None, want - served);
            if n < self.capacity && served < want {
                break;
            }
        }
        Ok(Self::outcome(served, want))
    }
}

#[cfg(test)]
mod tests {
    use sdds_comm::SharedFile;

    use super::*;

    fn scratch_file(content: &[u8]) -> (tempfile::TempDir, SharedFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.bin");
        std::fs::write(&path, content).unwrap();
        (dir, SharedFile::create(&path).unwrap())
    }

    #[test]
    fn small_writes_coalesce() {
        let (_dir, mut file) = scratch_file(b"");
        {
            let mut chan = WriteChannel::new(&mut file, 16);
            chan.write(b"abc").unwrap();
            chan.write(b"def").unwrap();
            assert_eq!(chan.bytes_buffered(), 6);
            // Nothing has reached the substrate yet.
            assert_eq!(chan.file.view(), 0);
            chan.flush().unwrap();
            assert_eq!(chan.bytes_buffered(), 0);
        }
        assert_eq!(file.view(), 6);
    }

    #[test]
    fn oversized_write_bypasses_buffer() {
        let (_dir, mut file) = scratch_file(b"");
        let payload = vec![7u8; 100];
        {
            let mut chan = WriteChannel::new(&mut file, 16);
            chan.write(b"abcd").unwrap();
            chan.write(&payload).unwrap();
            // Buffer was flushed full (16 bytes) and the 88-byte remainder
            // went straight through; nothing should be left over except
            // nothing at all.
            assert_eq!(chan.bytes_buffered(), 0);
            chan.flush().unwrap();
        }
        assert_eq!(file.view(), 104);
        file.set_view(0);
        let mut back = vec![0u8; 104];
        assert_eq!(file.read(&mut back).unwrap(), 104);
        assert_eq!(&back[..4], b"abcd");
        assert!(back[4..].iter().all(|&b| b == 7));
    }

    #[test]
    fn write_remainder_lands_in_buffer() {
        let (_dir, mut file) = scratch_file(b"");
        {
            let mut chan = WriteChannel::new(&mut file, 8);
            chan.write(&[1u8; 6]).unwrap();
            chan.write(&[2u8; 6]).unwrap();
            // 8 bytes flushed, 4 buffered.
            assert_eq!(chan.bytes_buffered(), 4);
            assert_eq!(chan.file.view(), 8);
            chan.flush().unwrap();
        }
        assert_eq!(file.view(), 12);
    }

    #[test]
    fn reads_and_skips_round_trip() {
        let data: Vec<u8> = (0u8..=99).collect();
        let (_dir, mut file) = scratch_file(&data);
        let mut chan = ReadChannel::new(&mut file, 16);

        let mut head = [0u8; 10];
        assert_eq!(chan.read(&mut head).unwrap(), ReadOutcome::Full);
        assert_eq!(&head, &data[..10]);

        assert_eq!(chan.skip(30).unwrap(), ReadOutcome::Full);

        let mut mid = [0u8; 40];
        assert_eq!(chan.read(&mut mid).unwrap(), ReadOutcome::Full);
        assert_eq!(&mid, &data[40..80]);

        // Ask past the end: partial, then EOF.
        let mut tail = [0u8; 40];
        assert_eq!(chan.read(&mut tail).unwrap(), ReadOutcome::Partial(20));
        assert_eq!(&tail[..20], &data[80..]);
        assert_eq!(chan.read(&mut tail).unwrap(), ReadOutcome::Eof);
        assert!(chan.at_eof());
    }

    #[test]
    fn unbuffered_maps_straight_through() {
        let data = [5u8; 24];
        let (_dir, mut file) = scratch_file(&data);
        let mut chan = ReadChannel::new(&mut file, 0);
        let mut buf = [0u8; 24];
        assert_eq!(chan.read(&mut buf).unwrap(), ReadOutcome::Full);
        assert_eq!(chan.read(&mut buf).unwrap(), ReadOutcome::Eof);

        let (_dir2, mut file2) = scratch_file(&[9u8; 2000]);
        let mut chan2 = ReadChannel::new(&mut file2, 0);
        assert_eq!(chan2.skip(1500).unwrap(), ReadOutcome::Full);
        let mut rest = [0u8; 500];
        assert_eq!(chan2.read(&mut rest).unwrap(), ReadOutcome::Full);
        assert_eq!(chan2.skip(1).unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn conservation_of_bytes() {
        // Total bytes handed to the substrate plus bytes resident in the
        // buffer must equal the total bytes the caller wrote.
        let (_dir, mut file) = scratch_file(b"");
        let mut chan = WriteChannel::new(&mut file, 32);
        let mut requested = 0usize;
        for size in [1usize, 31, 32, 33, 5, 64, 100, 7] {
            chan.write(&vec![3u8; size]).unwrap();
            requested += size;
            let substrate = usize::try_from(chan.file.view()).unwrap();
            assert_eq!(substrate + chan.bytes_buffered(), requested);
            assert!(chan.bytes_buffered() <= chan.capacity());
        }
    }

    #[test]
    fn require_maps_outcomes_to_errors() {
        assert!(ReadOutcome::Full.require(8).is_ok());
        assert!(matches!(
            ReadOutcome::Partial(3).require(8),
            Err(SddsError::Truncated {
                expected: 8,
                actual: 3
            })
        ));
        assert!(matches!(
            ReadOutcome::Eof.require(8),
            Err(SddsError::UnexpectedEof { expected: 8 })
        ));
    }
}
