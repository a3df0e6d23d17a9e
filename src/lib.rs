//! # zip64pat
//!
//! A streaming ZIP reader that survives ZIP64 data descriptors on small entries.
//!
//! Archives are read front to back from any [`std::io::Read`], entry by entry,
//! without the central directory. Entries that end on a ZIP64 data descriptor
//! although their sizes fit in 32 bits make conventional streaming readers
//! fail with `invalid entry size (expected 0 but got N bytes)`. This crate
//! realigns the stream in that case and re-checks the entry's sizes and CRC,
//! so the following entries stay readable. Genuinely corrupt entries still
//! fail.
//!
//! ## Features
//!
//! - Sequential reading from files, pipes, stdin and HTTP bodies
//! - STORED and DEFLATE entries, data descriptors in both layouts
//! - Recovery of misread ZIP64 data descriptors (can be disabled)
//! - Command-line tool to list and extract archives
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use zip64pat::EntryStreamReader;
//!
//! fn main() -> zip64pat::Result<()> {
//!     let file = std::fs::File::open("ContentTwo.zip")?;
//!     let mut reader = EntryStreamReader::new(file);
//!
//!     while let Some(entry) = reader.advance_to_next_entry()? {
//!         let mut content = String::new();
//!         reader.read_to_string(&mut content)?;
//!         println!("{}: {}", entry.name, content.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Result, ZipError};
pub use io::{ArchiveSource, HttpSource, LocalFileSource, StdinSource};
pub use zip::{
    ArchiveEntryMetadata, BaseReader, EntryStreamReader, StreamOptions, ZipExtractor,
    ZipStreamParser,
};
