use std::path::Path;

use log::{debug, warn};
use sdds_comm::{Collective, SharedFile};
use sdds_dataset::Dataset;
use sdds_error::{sdds_bail, SddsError, SddsResult};

use crate::channel::{ReadChannel, WriteChannel};
use crate::codec::SliceSource;
use crate::collective;
use crate::config::{PageIoOptions, RowLayout, RowTransferMode};
use crate::distribution::{assign_rows, RowRange};
use crate::header::{self, HeaderInfo};
use crate::row::{self, RowReadResult};
use crate::title::{self, TitleOutcome};
use crate::title_byte_len;

/// What a page read produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// A page was decoded into the dataset.
    Page,
    /// No more pages. Not an error.
    EndOfFile,
}

fn flagged_rows(dataset: &Dataset) -> Vec<usize> {
    dataset
        .page()
        .row_flags()
        .iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i))
        .collect()
}

fn validate_layout(dataset: &Dataset, options: &PageIoOptions) -> SddsResult<()> {
    if dataset.schema().has_string_column() {
        if options.row_layout == RowLayout::ColumnMajor {
            sdds_bail!("string columns are unsupported in column-major layout");
        }
        if options.row_transfer == RowTransferMode::Collective {
            sdds_bail!("string columns are unsupported in collective row transfers");
        }
    }
    Ok(())
}

/// Writes one SDDS file page by page on behalf of one worker in a
/// communicator. Every worker in the group constructs its own writer over
/// the same path and the same options, and all workers call [`write_page`]
/// together; the master additionally writes the header and each page's
/// title.
///
/// Row-major pages honor the dataset's per-row inclusion flags; column-major
/// pages write every row. Column-major layout always transfers
/// independently, whatever the configured transfer mode.
///
/// [`write_page`]: SddsWriter::write_page
pub struct SddsWriter<C: Collective> {
    comm: C,
    file: SharedFile,
    options: PageIoOptions,
    swap: bool,
    next_page_offset: u64,
}

impl<C: Collective> SddsWriter<C> {
    /// Create the file, write the header (master only) and leave every
    /// worker's next-page offset at the first byte after it. The header is
    /// rendered identically on every worker from the shared schema and
    /// options, so its length needs no broadcast.
    pub fn create(
        path: impl AsRef<Path>,
        comm: C,
        dataset: &Dataset,
        options: PageIoOptions,
        description: Option<&str>,
    ) -> SddsResult<Self> {
        validate_layout(dataset, &options)?;
        let mut file = SharedFile::create(path)?;
        let header = header::write_header(
            dataset.schema(),
            options.resolved_byte_order(),
            options.row_layout,
            description,
        );
        if comm.is_master() {
            // Peers have only opened the file at this point; clearing any
            // previous contents here cannot race their writes.
            file.truncate(0)?;
            let n = file.write(header.as_bytes())?;
            if n != header.len() {
                return Err(SddsError::Truncated {
                    expected: header.len(),
                    actual: n,
                });
            }
            file.sync()?;
        }
        comm.barrier();
        debug!(
            "created sdds file, header {} bytes, {} workers",
            header.len(),
            comm.size()
        );
        Ok(Self {
            swap: options.swapped(),
            next_page_offset: header.len() as u64,
            comm,
            file,
            options,
        })
    }

    /// Offset of the next page. Identical on every worker between calls.
    pub fn next_page_offset(&self) -> u64 {
        self.next_page_offset
    }

    /// Write the dataset's current page: all-gather the per-worker row
    /// counts, master writes the title for the grand total, every worker
    /// writes its row range at its own computed offset, then the shared
    /// next-page offset advances past the declared row block.
    ///
    /// A worker that fails partway still participates in the remaining
    /// collective calls before surfacing its error, so its peers are never
    /// left waiting in a barrier.
    pub fn write_page(&mut self, dataset: &mut Dataset) -> SddsResult<()> {
        let page_start = self.next_page_offset;
        let row_major = self.options.row_layout == RowLayout::RowMajor;
        let local_rows = if row_major {
            flagged_rows(dataset)
        } else {
            (0..dataset.page().row_count()).collect()
        };

        let counts = self.comm.all_gather_u64(local_rows.len() as u64)?;
        let my_offset: u64 = counts[..self.comm.rank()].iter().sum();
        let total: u64 = counts.iter().sum();
        let declared = self.options.row_count_mode.declared(total);
        let row_width = dataset.row_byte_width(self.options.string_field_width) as u64;

        let mut failure: Option<SddsError> = None;
        if self.comm.is_master() {
            self.file.set_view(page_start);
            let mut chan = WriteChannel::new(&mut self.file, self.options.title_buffer_size);
            failure = title::write_title(&mut chan, dataset, self.swap, declared)
                .and_then(|()| chan.flush())
                .err();
        }
        let title_len = title_byte_len(dataset, declared);
        let title_end = page_start + title_len;

        if row_major {
            self.file.set_view(title_end + my_offset * row_width);
        }
        let written = match self.write_rows(dataset, &local_rows, title_end, my_offset, declared) {
            Ok(n) => n,
            Err(e) => {
                failure.get_or_insert(e);
                0
            }
        };

        let true_total = self.comm.sum_u64(written)?;
        self.next_page_offset =
            page_start + title_len + self.options.row_count_mode.declared(true_total) * row_width;
        self.comm.barrier();
        match failure {
            Some(e) => Err(e),
            None => {
                debug!(
                    "wrote page at {}: {} rows ({} declared), {} title bytes",
                    page_start, true_total, declared, title_len
                );
                Ok(())
            }
        }
    }

    fn write_rows(
        &mut self,
        dataset: &mut Dataset,
        local_rows: &[usize],
        title_end: u64,
        start_row: u64,
        declared: u64,
    ) -> SddsResult<u64> {
        match (self.options.row_layout, self.options.row_transfer) {
            (RowLayout::ColumnMajor, _) => {
                let rows = 0..dataset.page().row_count();
                row::write_columns(
                    &mut self.file,
                    dataset,
                    rows,
                    start_row,
                    declared,
                    title_end,
                    self.swap,
                )
            }
            (RowLayout::RowMajor, RowTransferMode::Collective) => collective::write_rows_collective(
                &self.comm,
                &mut self.file,
                dataset,
                local_rows,
                self.options.write_buffer_size,
                self.swap,
            ),
            (RowLayout::RowMajor, RowTransferMode::Independent) => {
                let rows = 0..dataset.page().row_count();
                let width = self.options.string_field_width;
                let mut chan = WriteChannel::new(&mut self.file, self.options.write_buffer_size);
                let n = row::write_rows_row_major(&mut chan, dataset, rows, width, self.swap, true)?;
                chan.flush()?;
                Ok(n)
            }
        }
    }

    /// Flush the file and dissolve the writer; all workers call this
    /// together.
    pub fn close(mut self) -> SddsResult<()> {
        self.file.sync()?;
        self.comm.barrier();
        Ok(())
    }
}

/// Reads one SDDS file page by page on behalf of one worker in a
/// communicator. Construction parses the header (master reads it and
/// broadcasts the bytes); each [`read_page`] decodes the next page title the
/// same way and leaves this worker's row share in the dataset.
///
/// [`read_page`]: SddsReader::read_page
pub struct SddsReader<C: Collective> {
    comm: C,
    file: SharedFile,
    options: PageIoOptions,
    swap: bool,
    header: HeaderInfo,
    next_page_offset: u64,
    file_size: u64,
    done: bool,
}

impl<C: Collective> SddsReader<C> {
    /// Open the file and parse its header. The master reads the header
    /// bytes once and broadcasts them; every worker parses the same bytes.
    pub fn open(path: impl AsRef<Path>, comm: C, options: PageIoOptions) -> SddsResult<Self> {
        let mut file = SharedFile::open(path)?;
        let file_size = file.size()?;

        let mut buf = Vec::new();
        if comm.is_master() {
            let mut chunk = options.title_buffer_size.max(256);
            loop {
                chunk = chunk.min(file_size as usize);
                file.set_view(0);
                buf.resize(chunk, 0);
                let n = match file.read(&mut buf) {
                    Ok(n) => n,
                    Err(e) => {
                        // Peers still expect the broadcast; hand them an
                        // empty header and fail locally.
                        buf.clear();
                        comm.broadcast_bytes(0, &mut buf)?;
                        return Err(e);
                    }
                };
                buf.truncate(n);
                match header::parse_header(&buf) {
                    Ok(info) => {
                        buf.truncate(info.header_len as usize);
                        break;
                    }
                    Err(e) => {
                        if chunk >= file_size as usize {
                            buf.clear();
                            comm.broadcast_bytes(0, &mut buf)?;
                            return Err(e);
                        }
                        chunk *= 2;
                    }
                }
            }
        }
        comm.broadcast_bytes(0, &mut buf)?;
        let header = header::parse_header(&buf)?;
        let swap = !header.byte_order.is_native();
        debug!(
            "opened sdds file: {} bytes, header {} bytes, {}",
            file_size,
            header.header_len,
            header.schema.summary()
        );
        Ok(Self {
            next_page_offset: header.header_len,
            comm,
            file,
            options,
            swap,
            header,
            file_size,
            done: false,
        })
    }

    /// The parsed header: schema, byte order, row layout.
    pub fn header(&self) -> &HeaderInfo {
        &self.header
    }

    /// A fresh dataset matching the file's schema.
    pub fn dataset(&self) -> Dataset {
        Dataset::new(self.header.schema.clone())
    }

    /// Read the next page into the dataset, leaving this worker's row share
    /// in the column stores. Returns [`PageStatus::EndOfFile`] at the end
    /// of the data, after a previous auto-recovery, or when a title fails
    /// the row-count sanity check.
    ///
    /// A hard decode failure marks the dataset; retrying a read on it then
    /// fails immediately unless this reader was opened with auto-recovery.
    pub fn read_page(&mut self, dataset: &mut Dataset) -> SddsResult<PageStatus> {
        if dataset.is_recovery_required() && !self.options.auto_recover {
            sdds_bail!(
                DecodeError: "a previous page decode failed on this dataset; retrying requires auto-recovery"
            );
        }
        if self.done || dataset.is_auto_recovered() {
            return Ok(PageStatus::EndOfFile);
        }
        let page_start = self.next_page_offset;
        if page_start >= self.file_size {
            self.done = true;
            return Ok(PageStatus::EndOfFile);
        }

        dataset.start_page(0);
        let declared = match self.read_page_title(dataset, page_start)? {
            TitleOutcome::EndOfFile => {
                self.done = true;
                self.comm.barrier();
                return Ok(PageStatus::EndOfFile);
            }
            TitleOutcome::Rows(n) => n,
        };
        let title_end = page_start + title_byte_len(dataset, declared);
        let row_width = dataset.row_byte_width(self.options.string_field_width) as u64;

        let share = assign_rows(
            declared,
            self.comm.size(),
            self.comm.rank(),
            self.options.master_participates,
        );
        if self.header.row_layout == RowLayout::RowMajor {
            self.file.set_view(title_end + share.start * row_width);
        }
        let result = self.read_rows(dataset, share, declared, title_end, row_width as usize);

        let mut failure = None;
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                failure = Some(e);
                RowReadResult {
                    rows: 0,
                    error: None,
                }
            }
        };
        if let Some(e) = result.error {
            let eof_like = matches!(
                e,
                SddsError::Truncated { .. } | SddsError::UnexpectedEof { .. }
            );
            let rounded = !matches!(self.options.row_count_mode, crate::RowCountMode::Exact);
            if rounded && eof_like {
                // The declared count was only a pre-allocation hint; running
                // out of file before it is normal page termination.
                debug!("page at {}: {} of {} hinted rows", page_start, result.rows, share.count);
            } else if self.options.auto_recover {
                warn!(
                    "auto-recovered page at {}: kept {} of {} rows ({})",
                    page_start, result.rows, share.count, e
                );
                dataset.mark_auto_recovered();
            } else {
                failure.get_or_insert(e);
            }
        }

        self.next_page_offset = title_end + declared * row_width;
        self.comm.barrier();
        match failure {
            Some(e) => {
                dataset.mark_recovery_required();
                Err(e)
            }
            None => Ok(PageStatus::Page),
        }
    }

    /// Decode the next page title. With more than one worker the master
    /// reads the title bytes once and broadcasts them; the chunk grows and
    /// the read retries whenever parsing starves before the file does.
    fn read_page_title(
        &mut self,
        dataset: &mut Dataset,
        page_start: u64,
    ) -> SddsResult<TitleOutcome> {
        if self.comm.size() == 1 {
            self.file.set_view(page_start);
            let mut chan = ReadChannel::new(&mut self.file, self.options.read_buffer_size);
            return title::read_title(
                &mut chan,
                dataset,
                self.swap,
                self.options.row_sanity_ceiling,
            );
        }

        let remaining = (self.file_size - page_start) as usize;
        let mut chunk = self.options.title_buffer_size.max(64);
        loop {
            chunk = chunk.min(remaining);
            let mut buf = vec![0u8; chunk];
            if self.comm.is_master() {
                self.file.set_view(page_start);
                let n = match self.file.read(&mut buf) {
                    Ok(n) => n,
                    Err(e) => {
                        buf.clear();
                        self.comm.broadcast_bytes(0, &mut buf)?;
                        return Err(e);
                    }
                };
                buf.truncate(n);
            }
            self.comm.broadcast_bytes(0, &mut buf)?;

            dataset.start_page(0);
            let mut src = SliceSource::new(&buf);
            match title::read_title(&mut src, dataset, self.swap, self.options.row_sanity_ceiling) {
                Ok(outcome) => return Ok(outcome),
                Err(
                    e @ (SddsError::Truncated { .. } | SddsError::UnexpectedEof { .. }),
                ) => {
                    // Every worker parses the same bytes against the same
                    // file size, so they all retry or give up together.
                    if chunk >= remaining {
                        return Err(e);
                    }
                    chunk *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn read_rows(
        &mut self,
        dataset: &mut Dataset,
        share: RowRange,
        declared: u64,
        title_end: u64,
        row_width: usize,
    ) -> SddsResult<RowReadResult> {
        // The header, not the caller, decides the layout on the read side.
        match (self.header.row_layout, self.options.row_transfer) {
            (RowLayout::ColumnMajor, _) => Ok(row::read_columns(
                &mut self.file,
                dataset,
                share,
                declared,
                title_end,
                self.options.read_buffer_size,
                self.swap,
            )),
            (RowLayout::RowMajor, RowTransferMode::Collective) => collective::read_rows_collective(
                &self.comm,
                &mut self.file,
                dataset,
                share.count,
                row_width,
                self.options.read_buffer_size,
                self.swap,
            ),
            (RowLayout::RowMajor, RowTransferMode::Independent) => {
                let width = self.options.string_field_width;
                let mut chan = ReadChannel::new(&mut self.file, self.options.read_buffer_size);
                Ok(row::read_rows_row_major(
                    &mut chan, dataset, share.count, width, self.swap, true,
                ))
            }
        }
    }
}
