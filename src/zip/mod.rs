//! Streaming ZIP reading with recovery for misread ZIP64 data descriptors.
//!
//! This module walks an archive front to back, one local file header at a
//! time, so it works on pipes and network bodies where the central directory
//! is not reachable up front.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures for the records met in the stream
//! - [`parser`]: Low-level parsing of local headers and data descriptors
//! - [`base`]: The base reader ([`ZipStreamParser`]) and its collaborator trait
//! - [`resync`]: Recovery of an entry whose ZIP64 descriptor was read as 32-bit
//! - [`stream`]: [`EntryStreamReader`], the public sequential entry reader
//! - [`extractor`]: High-level listing and extraction API
//!
//! ## The misread descriptor
//!
//! Some writers close every deflated entry with a 24-byte ZIP64 data
//! descriptor, even when its sizes fit in 32 bits. A reader that chooses the
//! descriptor layout from the byte counts reads only 16 of those bytes, sees
//! an uncompressed size of 0, and stops 8 bytes short of the next header.
//! [`EntryStreamReader`] detects that case, reads the missing 8 bytes as the
//! real uncompressed size, and verifies the entry against the inflater's
//! counters before moving on.
//!
//! ## Supported Features
//!
//! - STORED and DEFLATE entries
//! - Data descriptors with or without signature, 32-bit and ZIP64 layouts
//! - ZIP64 extended information in local headers
//!
//! ## Limitations
//!
//! - No encryption support
//! - No central directory parsing
//! - No BZIP2, LZMA, or other compression methods

pub mod base;
mod extractor;
pub mod parser;
pub mod resync;
mod stream;
mod structures;

pub use base::{BaseReader, ReadOutcome, ZipStreamParser};
pub use extractor::ZipExtractor;
pub use stream::{EntryStreamReader, StreamOptions};
pub use structures::*;
