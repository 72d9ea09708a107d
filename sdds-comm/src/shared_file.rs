use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;
use sdds_error::SddsResult;

/// One worker's positioned view over a shared file.
///
/// Every worker holds its own `SharedFile` over the same underlying file (its
/// own descriptor, its own cursor), mirroring a message-passing file "view":
/// setting the view moves this worker's cursor without affecting its peers.
/// A read returning `Ok(0)` is the end-of-file signal; short reads are
/// reported as the actual count so callers can distinguish partial transfers
/// from end-of-file.
#[derive(Debug)]
pub struct SharedFile {
    file: File,
    offset: u64,
}

impl SharedFile {
    /// Open (creating if needed) a shared file for cooperative writing.
    pub fn create(path: impl AsRef<Path>) -> SddsResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self { file, offset: 0 })
    }

    /// Open an existing shared file for reading.
    pub fn open(path: impl AsRef<Path>) -> SddsResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self { file, offset: 0 })
    }

    /// Cut the file to `len` bytes. Views are not moved.
    pub fn truncate(&mut self, len: u64) -> SddsResult<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    /// Move this worker's view to an absolute byte offset.
    pub fn set_view(&mut self, offset: u64) {
        trace!("set_view offset={offset}");
        self.offset = offset;
    }

    /// This worker's current view offset.
    pub fn view(&self) -> u64 {
        self.offset
    }

    /// Current file size in bytes.
    pub fn size(&self) -> SddsResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Read up to `buf.len()` bytes at the view, advancing it by the bytes
    /// actually read. `Ok(0)` with a non-empty `buf` means end-of-file.
    pub fn read(&mut self, buf: &mut [u8]) -> SddsResult<usize> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        let n = self.file.read(buf)?;
        self.offset += n as u64;
        trace!("read {} of {} bytes", n, buf.len());
        Ok(n)
    }

    /// Write `buf` at the view, advancing it by the bytes actually written.
    pub fn write(&mut self, buf: &[u8]) -> SddsResult<usize> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        let n = self.file.write(buf)?;
        self.offset += n as u64;
        trace!("write {} of {} bytes", n, buf.len());
        Ok(n)
    }

    /// Flush any kernel-buffered writes to the file.
    pub fn sync(&mut self) -> SddsResult<()> {
        self.file.flush()?;
        Ok(())
    }
}
