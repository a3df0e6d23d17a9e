use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Result, ZipError};

use super::base::ZipStreamParser;
use super::stream::{EntryStreamReader, StreamOptions};
use super::structures::ArchiveEntryMetadata;

/// ZIP stream extractor
pub struct ZipExtractor<R: Read> {
    stream: EntryStreamReader<ZipStreamParser<R>>,
}

impl<R: Read> ZipExtractor<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, StreamOptions::default())
    }

    pub fn with_options(reader: R, options: StreamOptions) -> Self {
        Self {
            stream: EntryStreamReader::with_options(reader, options),
        }
    }

    /// Move to the next entry, verifying the one before it
    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntryMetadata>> {
        self.stream.advance_to_next_entry()
    }

    /// List all entries, reading each one through so that sizes kept in data
    /// descriptors are known
    pub fn list_files(mut self) -> Result<Vec<ArchiveEntryMetadata>> {
        let mut entries = Vec::new();
        while self.stream.advance_to_next_entry()?.is_some() {
            self.stream.close_current_entry()?;
            if let Some(entry) = self.stream.current_entry() {
                entries.push(entry.clone());
            }
        }
        self.stream.close();
        Ok(entries)
    }

    /// Copy the current entry to a writer
    ///
    /// Returns the number of bytes written.
    pub fn extract_to_writer<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        io::copy(&mut self.stream, writer).map_err(ZipError::from_io)
    }

    /// Extract the current entry to memory
    pub fn extract_to_memory(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.extract_to_writer(&mut data)?;
        Ok(data)
    }

    /// Extract the current entry to disk
    pub fn extract_to_file(&mut self, output_path: &Path) -> Result<u64> {
        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = fs::File::create(output_path)?;
        let written = self.extract_to_writer(&mut file)?;
        file.flush()?;
        Ok(written)
    }

    /// Metadata of the current entry, with sizes corrected once it was read
    pub fn current_entry(&self) -> Option<&ArchiveEntryMetadata> {
        self.stream.current_entry()
    }
}
