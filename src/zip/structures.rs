use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Result, ZipError};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Local File Header (LFH) signature
pub const LFH_SIGNATURE: u32 = 0x04034b50;
/// Fixed part of the Local File Header, signature included
pub const LFH_SIZE: usize = 30;

/// Optional signature in front of a data descriptor
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;

/// Central Directory file header signature
pub const CDH_SIGNATURE: u32 = 0x02014b50;
/// ZIP64 End of Central Directory record signature
pub const ZIP64_EOCD_SIGNATURE: u32 = 0x06064b50;
/// ZIP64 End of Central Directory locator signature
pub const ZIP64_EOCD_LOCATOR_SIGNATURE: u32 = 0x07064b50;
/// End of Central Directory record signature
pub const EOCD_SIGNATURE: u32 = 0x06054b50;
/// Archive extra data record signature
pub const ARCHIVE_EXTRA_DATA_SIGNATURE: u32 = 0x08064b50;
/// Central directory digital signature
pub const DIGITAL_SIGNATURE: u32 = 0x05054b50;

/// Whether a record with this signature closes the local entry section.
pub fn ends_entry_section(signature: u32) -> bool {
    matches!(
        signature,
        CDH_SIGNATURE
            | ZIP64_EOCD_SIGNATURE
            | ZIP64_EOCD_LOCATOR_SIGNATURE
            | EOCD_SIGNATURE
            | ARCHIVE_EXTRA_DATA_SIGNATURE
            | DIGITAL_SIGNATURE
    )
}

/// Extra field id of the ZIP64 extended information block
pub const ZIP64_EXTRA_ID: u16 = 0x0001;
/// Placeholder stored in 32-bit fields whose real value lives in a ZIP64 block
pub const ZIP64_MAGIC: u32 = 0xFFFFFFFF;

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 1;
/// General purpose flag: CRC and sizes follow the data in a descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Local File Header fixed fields (everything after the signature)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    /// Parse the 30-byte header. Returns `None` when the signature is not a
    /// local file header, which marks the end of the entry section.
    pub fn from_bytes(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < LFH_SIZE {
            return Err(ZipError::InvalidLocalHeader("truncated header"));
        }

        let mut cursor = Cursor::new(data);
        if cursor.read_u32::<LittleEndian>()? != LFH_SIGNATURE {
            return Ok(None);
        }

        Ok(Some(Self {
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
        }))
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

/// Sizes carried by a ZIP64 extended information extra field.
///
/// Each value is present only when the matching 32-bit header field holds
/// [`ZIP64_MAGIC`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64ExtendedInfo {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
}

/// CRC and sizes that close an entry, taken either from the local header or
/// from the data descriptor that follows the entry data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryTrailer {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Metadata of one archive entry as seen by the streaming reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryMetadata {
    pub name: String,
    pub compression_method: CompressionMethod,
    /// Declared compressed size. Zero until the data descriptor is read when
    /// `has_data_descriptor` is set.
    pub compressed_size: u64,
    /// Declared uncompressed size. Same caveat as `compressed_size`.
    pub uncompressed_size: u64,
    pub crc32: u32,
    /// Local header carries a ZIP64 extended information field
    pub extended_trailer: bool,
    pub has_data_descriptor: bool,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ArchiveEntryMetadata {
    /// Overwrite CRC and sizes with the values that closed the entry.
    pub fn apply_trailer(&mut self, trailer: &EntryTrailer) {
        self.crc32 = trailer.crc32;
        self.compressed_size = trailer.compressed_size;
        self.uncompressed_size = trailer.uncompressed_size;
    }

    /// Values the entry is expected to close with.
    pub fn trailer(&self) -> EntryTrailer {
        EntryTrailer {
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
        }
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// Running totals of the decompression engine for the current entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressionCounters {
    /// Compressed bytes taken from the source
    pub bytes_consumed: u64,
    /// Decompressed bytes handed to the caller
    pub bytes_produced: u64,
    /// CRC32 over the produced bytes
    pub crc32: u32,
}

impl DecompressionCounters {
    /// Whether the standard reader would expect a 24-byte ZIP64 descriptor.
    pub fn exceeds_32_bits(&self) -> bool {
        self.bytes_produced > ZIP64_MAGIC as u64 || self.bytes_consumed > ZIP64_MAGIC as u64
    }

    /// Check the closing values of an entry against the counters.
    ///
    /// Order: uncompressed size, compressed size, CRC. The first mismatch wins.
    pub fn verify(&self, trailer: &EntryTrailer) -> Result<()> {
        if trailer.uncompressed_size != self.bytes_produced {
            return Err(ZipError::InvalidEntrySize {
                expected: trailer.uncompressed_size,
                got: self.bytes_produced,
            });
        }
        if trailer.compressed_size != self.bytes_consumed {
            return Err(ZipError::InvalidCompressedSize {
                expected: trailer.compressed_size,
                got: self.bytes_consumed,
            });
        }
        if trailer.crc32 != self.crc32 {
            return Err(ZipError::InvalidCrc {
                expected: trailer.crc32,
                got: self.crc32,
            });
        }
        Ok(())
    }
}
