//! Low-level parsing of the records met while walking an archive front to back.
//!
//! A streaming reader never sees the central directory before the data, so
//! everything here works from the local file header and the optional data
//! descriptor that follows each entry:
//!
//! 1. Local File Header (30 bytes), file name, extra field
//! 2. Entry data (STORED or DEFLATE)
//! 3. Data descriptor when general purpose bit 3 is set
//!
//! The central directory (or any other record that only follows the entries)
//! ends the walk. Any other signature where a header is expected is an error,
//! so a stream that lost its alignment does not look like a finished archive.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

use crate::error::{Result, ZipError};

use super::structures::*;

/// Read as many bytes as are available up to `buf.len()`.
///
/// Returns the number of bytes read; fewer than requested means the source
/// is exhausted.
fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read the next local file header and the variable fields after it.
///
/// # Returns
///
/// `None` at the end of the source, or when the next record belongs to the
/// central directory section.
///
/// # Errors
///
/// [`ZipError::InvalidLocalHeader`] for a truncated header or a signature
/// that has no place between entries.
pub fn read_local_header<R: Read + ?Sized>(reader: &mut R) -> Result<Option<ArchiveEntryMetadata>> {
    let mut lfh_buf = [0u8; LFH_SIZE];
    let filled = read_up_to(reader, &mut lfh_buf)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < 4 {
        return Err(ZipError::InvalidLocalHeader("truncated header"));
    }

    let signature = u32::from_le_bytes([lfh_buf[0], lfh_buf[1], lfh_buf[2], lfh_buf[3]]);
    if ends_entry_section(signature) {
        return Ok(None);
    }
    if signature != LFH_SIGNATURE {
        log::debug!("unexpected record signature {:#010x}", signature);
        return Err(ZipError::InvalidLocalHeader("unexpected record signature"));
    }

    let Some(header) = LocalFileHeader::from_bytes(&lfh_buf[..filled])? else {
        return Ok(None);
    };

    let mut file_name_bytes = vec![0u8; header.file_name_length as usize];
    reader.read_exact(&mut file_name_bytes)?;
    // Non-UTF8 names are decoded lossily
    let name = String::from_utf8_lossy(&file_name_bytes).to_string();
    if header.is_encrypted() {
        return Err(ZipError::EncryptedEntry(name));
    }

    let mut extra = vec![0u8; header.extra_field_length as usize];
    reader.read_exact(&mut extra)?;
    let zip64 = parse_zip64_extra(&extra, &header)?;

    let has_data_descriptor = header.has_data_descriptor();
    let (crc32, mut compressed_size, mut uncompressed_size) = if has_data_descriptor {
        // Known only once the descriptor has been read
        (0, 0, 0)
    } else {
        (
            header.crc32,
            header.compressed_size as u64,
            header.uncompressed_size as u64,
        )
    };

    if let Some(info) = zip64.filter(|_| !has_data_descriptor) {
        if let Some(size) = info.uncompressed_size {
            uncompressed_size = size;
        }
        if let Some(size) = info.compressed_size {
            compressed_size = size;
        }
    }

    Ok(Some(ArchiveEntryMetadata {
        is_directory: name.ends_with('/'),
        name,
        compression_method: CompressionMethod::from_u16(header.compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        extended_trailer: zip64.is_some(),
        has_data_descriptor,
        last_mod_time: header.last_mod_time,
        last_mod_date: header.last_mod_date,
    }))
}

/// Find the ZIP64 extended information block in a local extra field.
///
/// # Returns
///
/// `None` when the extra field carries no ZIP64 block. The sizes inside are
/// only filled for header fields set to [`ZIP64_MAGIC`].
pub fn parse_zip64_extra(
    extra: &[u8],
    header: &LocalFileHeader,
) -> Result<Option<Zip64ExtendedInfo>> {
    let mut cursor = Cursor::new(extra);
    let extra_end = extra.len() as u64;

    while cursor.position() + 4 <= extra_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = (cursor.position() + field_size).min(extra_end);

        if header_id != ZIP64_EXTRA_ID {
            cursor.set_position(field_end);
            continue;
        }

        // Fields appear in a fixed order, each only if its header slot overflowed
        let mut info = Zip64ExtendedInfo::default();
        if header.uncompressed_size == ZIP64_MAGIC && cursor.position() + 8 <= field_end {
            info.uncompressed_size = Some(cursor.read_u64::<LittleEndian>()?);
        }
        if header.compressed_size == ZIP64_MAGIC && cursor.position() + 8 <= field_end {
            info.compressed_size = Some(cursor.read_u64::<LittleEndian>()?);
        }
        return Ok(Some(info));
    }

    Ok(None)
}

/// Read a data descriptor with the given field width.
///
/// The signature is optional: when the first word is not
/// [`DATA_DESCRIPTOR_SIGNATURE`] it is the CRC itself. Consumes 12 or 16
/// bytes for the 32-bit layout and 20 or 24 bytes for the ZIP64 layout.
pub fn read_data_descriptor<R: Read + ?Sized>(reader: &mut R, zip64: bool) -> Result<EntryTrailer> {
    let first = reader.read_u32::<LittleEndian>()?;
    let crc32 = if first == DATA_DESCRIPTOR_SIGNATURE {
        reader.read_u32::<LittleEndian>()?
    } else {
        first
    };

    let (compressed_size, uncompressed_size) = if zip64 {
        (
            reader.read_u64::<LittleEndian>()?,
            reader.read_u64::<LittleEndian>()?,
        )
    } else {
        (
            reader.read_u32::<LittleEndian>()? as u64,
            reader.read_u32::<LittleEndian>()? as u64,
        )
    };

    Ok(EntryTrailer {
        crc32,
        compressed_size,
        uncompressed_size,
    })
}
