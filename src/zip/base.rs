//! Sequential local-header reader and the collaborator trait the recovery
//! path works through.
//!
//! [`ZipStreamParser`] behaves like a conventional streaming ZIP reader: it
//! picks the data descriptor layout from how many bytes it has seen, not from
//! the local header. A ZIP64 descriptor written after a small entry is
//! therefore read with the 32-bit layout, and the size check at the end of the
//! entry fails with an expected size of zero. Instead of raising that failure
//! the parser reports [`ReadOutcome::BoundaryAmbiguity`] and leaves the entry
//! open so that a caller can finish it through the [`BaseReader`] seam.

use flate2::{Decompress, FlushDecompress, Status};
use std::io::{self, BufRead, BufReader, Read};

use crate::error::{Result, ZipError};

use super::parser;
use super::structures::*;

/// Default capacity of the buffer in front of the source.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;
/// Smallest buffer the parser runs with; smaller requests are raised to it.
pub const MIN_BUFFER_CAPACITY: usize = 64;

/// Result of one read against the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Decompressed bytes were written to the buffer. Zero only when the
    /// buffer was empty or no entry is open.
    Bytes(usize),
    /// Entry data ended and the closing values matched the counters.
    EndOfEntry(EntryTrailer),
    /// Entry data ended, but the trailer was read with an expected
    /// uncompressed size of zero while bytes were produced. The entry stays
    /// open; the trailer holds the values as parsed.
    BoundaryAmbiguity(EntryTrailer),
}

/// Operations a base reader exposes so an entry can be finished from outside.
pub trait BaseReader {
    /// Parse the next local header, closing the current entry first.
    fn next_entry(&mut self) -> Result<Option<ArchiveEntryMetadata>>;

    /// Read decompressed bytes from the current entry.
    fn read_entry(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Mark the current entry closed without any further parsing.
    ///
    /// Counters of the entry remain readable until the next header.
    fn force_close_current_entry(&mut self);

    /// Raw byte source positioned right after whatever the reader consumed.
    fn raw_cursor(&mut self) -> &mut dyn Read;

    /// Counters of the current (or just closed) entry.
    fn engine_counters(&self) -> DecompressionCounters;
}

/// State of the entry being decoded.
#[derive(Debug)]
struct OpenEntry {
    name: String,
    method: CompressionMethod,
    has_data_descriptor: bool,
    declared: EntryTrailer,
    inflate_done: bool,
}

/// Streaming reader over local file headers.
pub struct ZipStreamParser<R: Read> {
    reader: BufReader<R>,
    entry: Option<OpenEntry>,
    inflater: Decompress,
    hasher: crc32fast::Hasher,
    bytes_consumed: u64,
    bytes_produced: u64,
    exhausted: bool,
}

impl<R: Read> ZipStreamParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, reader)
    }

    /// Buffer the source with `capacity` bytes, at least [`MIN_BUFFER_CAPACITY`].
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity.max(MIN_BUFFER_CAPACITY), reader),
            entry: None,
            inflater: Decompress::new(false),
            hasher: crc32fast::Hasher::new(),
            bytes_consumed: 0,
            bytes_produced: 0,
            exhausted: false,
        }
    }

    /// Read the current entry to its end, validating it.
    ///
    /// A boundary ambiguity is reported as the size error a conventional
    /// reader raises.
    pub fn close_entry(&mut self) -> Result<()> {
        let mut scratch = [0u8; 512];
        while self.entry.is_some() {
            match self.read_entry(&mut scratch)? {
                ReadOutcome::Bytes(_) | ReadOutcome::EndOfEntry(_) => {}
                ReadOutcome::BoundaryAmbiguity(trailer) => {
                    return Err(ZipError::InvalidEntrySize {
                        expected: trailer.uncompressed_size,
                        got: self.bytes_produced,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn reset_counters(&mut self) {
        self.inflater.reset(false);
        self.hasher = crc32fast::Hasher::new();
        self.bytes_consumed = 0;
        self.bytes_produced = 0;
    }

    fn read_stored(&mut self, buf: &mut [u8], declared: u64) -> Result<usize> {
        let remaining = declared.saturating_sub(self.bytes_consumed);
        if remaining == 0 {
            return Ok(0);
        }

        let len = (buf.len() as u64).min(remaining) as usize;
        let n = self.reader.read(&mut buf[..len])?;
        if n == 0 {
            return Err(ZipError::UnexpectedEof);
        }
        self.bytes_consumed += n as u64;
        Ok(n)
    }

    fn read_deflated(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            if self.entry.as_ref().is_some_and(|e| e.inflate_done) {
                return Ok(0);
            }

            let input = self.reader.fill_buf()?;
            if input.is_empty() {
                return Err(ZipError::UnexpectedEof);
            }

            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();
            let status = self
                .inflater
                .decompress(input, buf, FlushDecompress::None)
                .map_err(|e| ZipError::Decompression(e.to_string()))?;
            let consumed = (self.inflater.total_in() - in_before) as usize;
            let produced = (self.inflater.total_out() - out_before) as usize;

            // Only what the inflater used leaves the buffer, so the source
            // stays aligned on the first byte after the compressed data
            self.reader.consume(consumed);
            self.bytes_consumed += consumed as u64;

            if matches!(status, Status::StreamEnd) {
                if let Some(entry) = self.entry.as_mut() {
                    entry.inflate_done = true;
                }
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if consumed == 0 {
                return Err(ZipError::Decompression(
                    "inflater made no progress".to_string(),
                ));
            }
        }
    }

    /// Read the closing values and check them against the counters.
    fn finish_entry(&mut self) -> Result<ReadOutcome> {
        let Some((name, has_data_descriptor, declared)) = self
            .entry
            .as_ref()
            .map(|e| (e.name.clone(), e.has_data_descriptor, e.declared))
        else {
            return Ok(ReadOutcome::Bytes(0));
        };

        let counters = self.engine_counters();
        let trailer = if has_data_descriptor {
            parser::read_data_descriptor(&mut self.reader, counters.exceeds_32_bits())?
        } else {
            declared
        };

        if trailer.uncompressed_size == 0 && counters.bytes_produced != 0 {
            log::debug!(
                "{}: trailer declares 0 bytes but {} were produced",
                name,
                counters.bytes_produced
            );
            return Ok(ReadOutcome::BoundaryAmbiguity(trailer));
        }
        if let Err(err) = counters.verify(&trailer) {
            // The trailer is consumed; the entry cannot be finished again
            self.entry = None;
            return Err(err);
        }

        log::debug!(
            "{}: closed ({} -> {} bytes)",
            name,
            counters.bytes_consumed,
            counters.bytes_produced
        );
        self.entry = None;
        Ok(ReadOutcome::EndOfEntry(trailer))
    }
}

impl<R: Read> BaseReader for ZipStreamParser<R> {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntryMetadata>> {
        if self.entry.is_some() {
            self.close_entry()?;
        }
        if self.exhausted {
            return Ok(None);
        }

        let Some(meta) = parser::read_local_header(&mut self.reader)? else {
            self.exhausted = true;
            return Ok(None);
        };

        match meta.compression_method {
            CompressionMethod::Stored if meta.has_data_descriptor => {
                return Err(ZipError::StoredWithDescriptor(meta.name));
            }
            CompressionMethod::Stored | CompressionMethod::Deflate => {}
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        }

        self.reset_counters();
        self.entry = Some(OpenEntry {
            name: meta.name.clone(),
            method: meta.compression_method,
            has_data_descriptor: meta.has_data_descriptor,
            declared: meta.trailer(),
            inflate_done: false,
        });

        log::debug!(
            "{}: method {}, descriptor {}, zip64 extra {}",
            meta.name,
            meta.compression_method.as_u16(),
            meta.has_data_descriptor,
            meta.extended_trailer
        );
        Ok(Some(meta))
    }

    fn read_entry(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let Some((method, declared)) = self.entry.as_ref().map(|e| (e.method, e.declared)) else {
            return Ok(ReadOutcome::Bytes(0));
        };
        if buf.is_empty() {
            return Ok(ReadOutcome::Bytes(0));
        }

        let n = match method {
            CompressionMethod::Stored => self.read_stored(buf, declared.compressed_size)?,
            CompressionMethod::Deflate => self.read_deflated(buf)?,
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        };

        if n == 0 {
            return self.finish_entry();
        }
        self.hasher.update(&buf[..n]);
        self.bytes_produced += n as u64;
        Ok(ReadOutcome::Bytes(n))
    }

    fn force_close_current_entry(&mut self) {
        self.entry = None;
    }

    fn raw_cursor(&mut self) -> &mut dyn Read {
        &mut self.reader
    }

    fn engine_counters(&self) -> DecompressionCounters {
        DecompressionCounters {
            bytes_consumed: self.bytes_consumed,
            bytes_produced: self.bytes_produced,
            crc32: self.hasher.clone().finalize(),
        }
    }
}

/// Unwrapped reading: a boundary ambiguity surfaces as the size error.
impl<R: Read> Read for ZipStreamParser<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_entry(buf)? {
            ReadOutcome::Bytes(n) => Ok(n),
            ReadOutcome::EndOfEntry(_) => Ok(0),
            ReadOutcome::BoundaryAmbiguity(trailer) => Err(ZipError::InvalidEntrySize {
                expected: trailer.uncompressed_size,
                got: self.bytes_produced,
            }
            .into()),
        }
    }
}
