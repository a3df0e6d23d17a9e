//! One-shot recovery for entries closed by a ZIP64 data descriptor that was
//! read with the 32-bit layout.
//!
//! The 24-byte ZIP64 descriptor is `[sig] crc csize:u64 usize:u64`. Read as
//! `[sig] crc csize:u32 usize:u32` the compressed size keeps its low half, the
//! uncompressed size becomes the (zero) high half of the compressed size, and
//! the real 64-bit uncompressed size is left unread in the source. Recovery
//! closes the entry, reads those 8 bytes, and redoes the end-of-entry checks.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Result, ZipError};

use super::base::BaseReader;
use super::structures::{ArchiveEntryMetadata, DecompressionCounters};

/// Bytes left in the source after a ZIP64 descriptor was read as a 32-bit one.
pub const DESCRIPTOR_TAIL_LEN: usize = 8;

/// Finish `entry` on `base` after a boundary ambiguity.
///
/// `entry` must already hold the CRC and compressed size as parsed from the
/// misread descriptor. On success its uncompressed size is the one from the
/// descriptor tail and `base` is positioned at the next record.
pub fn resynchronize<B: BaseReader + ?Sized>(
    base: &mut B,
    entry: &mut ArchiveEntryMetadata,
) -> Result<()> {
    base.force_close_current_entry();

    let uncompressed_size = base
        .raw_cursor()
        .read_u64::<LittleEndian>()
        .map_err(ZipError::DescriptorTail)?;
    entry.uncompressed_size = uncompressed_size;

    verify(entry, &base.engine_counters())
}

/// Check the entry's closing values against the engine counters.
pub fn verify(entry: &ArchiveEntryMetadata, counters: &DecompressionCounters) -> Result<()> {
    counters.verify(&entry.trailer())
}
