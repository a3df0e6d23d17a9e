use std::io::{self, Read};

use crate::error::{Result, ZipError};

use super::base::{BaseReader, DEFAULT_BUFFER_CAPACITY, ReadOutcome, ZipStreamParser};
use super::resync;
use super::structures::{ArchiveEntryMetadata, EntryTrailer};

/// Reader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Capacity of the buffer in front of the source, raised to
    /// [`MIN_BUFFER_CAPACITY`](super::base::MIN_BUFFER_CAPACITY) when smaller
    pub buffer_capacity: usize,
    /// Recover entries closed by a ZIP64 descriptor that was read as a
    /// 32-bit one. When off, such entries fail like in a plain reader.
    pub recover_extended_descriptors: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            recover_extended_descriptors: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// No entry was opened, or the archive is exhausted
    Idle,
    Open,
    /// Entry data fully read and verified
    Finished,
    /// Reading or recovery failed; the entry yields no more data
    Failed,
}

/// Sequential reader over archive entries.
///
/// Every read goes to the base reader. When an entry ends on a misread ZIP64
/// data descriptor, the entry is recovered once and the read reports end of
/// entry data instead of failing.
///
/// ## Example
///
/// ```no_run
/// use std::fs::File;
/// use std::io::Read;
/// use zip64pat::EntryStreamReader;
///
/// # fn main() -> zip64pat::Result<()> {
/// let mut reader = EntryStreamReader::new(File::open("Content.zip")?);
/// while let Some(entry) = reader.advance_to_next_entry()? {
///     let mut content = Vec::new();
///     reader.read_to_end(&mut content)?;
///     println!("{}: {} bytes", entry.name, content.len());
/// }
/// reader.close();
/// # Ok(())
/// # }
/// ```
pub struct EntryStreamReader<B: BaseReader> {
    base: B,
    current: Option<ArchiveEntryMetadata>,
    state: EntryState,
    options: StreamOptions,
}

impl<R: Read> EntryStreamReader<ZipStreamParser<R>> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, StreamOptions::default())
    }

    pub fn with_options(reader: R, options: StreamOptions) -> Self {
        let base = ZipStreamParser::with_capacity(options.buffer_capacity, reader);
        Self::from_base(base, options)
    }
}

impl<B: BaseReader> EntryStreamReader<B> {
    /// Wrap an existing base reader.
    pub fn from_base(base: B, options: StreamOptions) -> Self {
        Self {
            base,
            current: None,
            state: EntryState::Idle,
            options,
        }
    }

    /// Close the current entry and parse the next local header.
    ///
    /// # Returns
    ///
    /// `None` once the archive has no more entries, on every later call too.
    pub fn advance_to_next_entry(&mut self) -> Result<Option<ArchiveEntryMetadata>> {
        self.close_current_entry()?;
        self.current = None;
        self.state = EntryState::Idle;

        let Some(entry) = self.base.next_entry()? else {
            return Ok(None);
        };
        self.current = Some(entry.clone());
        self.state = EntryState::Open;
        Ok(Some(entry))
    }

    /// Metadata of the current entry, including values learnt when it ended.
    pub fn current_entry(&self) -> Option<&ArchiveEntryMetadata> {
        self.current.as_ref()
    }

    /// Read decompressed bytes of the current entry.
    ///
    /// # Returns
    ///
    /// The number of bytes written, 0 at the end of the entry data.
    ///
    /// # Errors
    ///
    /// Integrity failures from recovery, and every base reader error that
    /// is not the misread descriptor, are returned as they are.
    pub fn read_entry(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state != EntryState::Open {
            return Ok(0);
        }

        let outcome = match self.base.read_entry(buf) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.state = EntryState::Failed;
                return Err(err);
            }
        };

        match outcome {
            ReadOutcome::Bytes(n) => Ok(n),
            ReadOutcome::EndOfEntry(trailer) => {
                if let Some(entry) = self.current.as_mut() {
                    entry.apply_trailer(&trailer);
                }
                self.state = EntryState::Finished;
                Ok(0)
            }
            ReadOutcome::BoundaryAmbiguity(trailer) => {
                let recovered = self.recover(&trailer);
                self.state = if recovered.is_ok() {
                    EntryState::Finished
                } else {
                    EntryState::Failed
                };
                recovered.map(|()| 0)
            }
        }
    }

    /// Read a single decompressed byte; `None` at the end of the entry.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read_entry(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Read the rest of the current entry, verifying it.
    ///
    /// Does nothing when the entry already ended or failed.
    pub fn close_current_entry(&mut self) -> Result<()> {
        let mut scratch = [0u8; 512];
        while self.read_entry(&mut scratch)? > 0 {}
        Ok(())
    }

    /// Release the base reader and the source behind it.
    pub fn close(self) {
        if self.state == EntryState::Open {
            log::debug!("closing stream with an unfinished entry");
        }
    }

    pub fn into_inner(self) -> B {
        self.base
    }

    fn recover(&mut self, trailer: &EntryTrailer) -> Result<()> {
        let counters = self.base.engine_counters();
        let Some(entry) = self.current.as_mut() else {
            return Err(ZipError::InvalidEntrySize {
                expected: trailer.uncompressed_size,
                got: counters.bytes_produced,
            });
        };
        entry.apply_trailer(trailer);

        if !self.options.recover_extended_descriptors {
            return Err(ZipError::InvalidEntrySize {
                expected: trailer.uncompressed_size,
                got: counters.bytes_produced,
            });
        }

        log::warn!(
            "{}: data descriptor misread as 32-bit (zip64 extra {}), realigning",
            entry.name,
            entry.extended_trailer
        );
        resync::resynchronize(&mut self.base, entry)?;
        log::info!(
            "{}: recovered ZIP64 descriptor, {} bytes",
            entry.name,
            entry.uncompressed_size
        );
        Ok(())
    }
}

impl<B: BaseReader> Read for EntryStreamReader<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_entry(buf)?)
    }
}
