//! In-memory archive builder for the integration tests.
//!
//! Produces local entries followed by a central directory and EOCD record,
//! with control over the data descriptor layout and the values written into
//! it, so malformed archives can be generated byte-exactly.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

/// How an entry's CRC and sizes are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailer {
    /// In the local header only
    Header,
    /// 16-byte descriptor (signature, 32-bit sizes)
    Descriptor32,
    /// 24-byte ZIP64 descriptor with signature
    Descriptor64,
    /// 20-byte ZIP64 descriptor without signature
    Descriptor64Unsigned,
}

#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub name: String,
    pub data: Vec<u8>,
    pub deflate: bool,
    pub trailer: Trailer,
    /// Put a ZIP64 extended information field in the local header
    pub zip64_extra: bool,
    pub crc_override: Option<u32>,
    pub compressed_size_override: Option<u64>,
    pub uncompressed_size_override: Option<u64>,
}

impl EntrySpec {
    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            deflate: true,
            trailer: Trailer::Header,
            zip64_extra: false,
            crc_override: None,
            compressed_size_override: None,
            uncompressed_size_override: None,
        }
    }

    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            deflate: false,
            ..Self::deflated(name, data)
        }
    }

    /// Deflated entry closed by a ZIP64 descriptor although its sizes are small.
    pub fn zip64_descriptor(name: &str, data: &[u8]) -> Self {
        Self {
            trailer: Trailer::Descriptor64,
            zip64_extra: true,
            ..Self::deflated(name, data)
        }
    }

    pub fn trailer(mut self, trailer: Trailer) -> Self {
        self.trailer = trailer;
        self
    }

    pub fn crc(mut self, crc: u32) -> Self {
        self.crc_override = Some(crc);
        self
    }

    pub fn compressed_size(mut self, size: u64) -> Self {
        self.compressed_size_override = Some(size);
        self
    }

    pub fn uncompressed_size(mut self, size: u64) -> Self {
        self.uncompressed_size_override = Some(size);
        self
    }

    pub fn compressed(&self) -> Vec<u8> {
        if self.deflate {
            deflate(&self.data)
        } else {
            self.data.clone()
        }
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[derive(Default)]
pub struct ArchiveBuilder {
    local: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: EntrySpec) -> Self {
        let compressed = entry.compressed();
        let crc = entry.crc_override.unwrap_or_else(|| crc32fast::hash(&entry.data));
        let csize = entry
            .compressed_size_override
            .unwrap_or(compressed.len() as u64);
        let usize_ = entry
            .uncompressed_size_override
            .unwrap_or(entry.data.len() as u64);

        let descriptor = entry.trailer != Trailer::Header;
        let flags: u16 = if descriptor { 1 << 3 } else { 0 };
        let method: u16 = if entry.deflate { 8 } else { 0 };
        let version: u16 = if entry.zip64_extra { 45 } else { 20 };
        let offset = self.local.len() as u32;

        let (header_crc, header_csize, header_usize) = match (descriptor, entry.zip64_extra) {
            (true, _) => (0, 0, 0),
            (false, true) => (crc, 0xFFFFFFFF, 0xFFFFFFFF),
            (false, false) => (crc, csize as u32, usize_ as u32),
        };

        let mut extra = Vec::new();
        if entry.zip64_extra {
            let (u, c) = if descriptor { (0, 0) } else { (usize_, csize) };
            extra.extend_from_slice(&0x0001u16.to_le_bytes());
            extra.extend_from_slice(&16u16.to_le_bytes());
            extra.extend_from_slice(&u.to_le_bytes());
            extra.extend_from_slice(&c.to_le_bytes());
        }

        let out = &mut self.local;
        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0x6000u16.to_le_bytes());
        out.extend_from_slice(&0x5a21u16.to_le_bytes());
        out.extend_from_slice(&header_crc.to_le_bytes());
        out.extend_from_slice(&header_csize.to_le_bytes());
        out.extend_from_slice(&header_usize.to_le_bytes());
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&extra);
        out.extend_from_slice(&compressed);

        match entry.trailer {
            Trailer::Header => {}
            Trailer::Descriptor32 => {
                out.extend_from_slice(b"PK\x07\x08");
                out.extend_from_slice(&crc.to_le_bytes());
                out.extend_from_slice(&(csize as u32).to_le_bytes());
                out.extend_from_slice(&(usize_ as u32).to_le_bytes());
            }
            Trailer::Descriptor64 => {
                out.extend_from_slice(b"PK\x07\x08");
                out.extend_from_slice(&crc.to_le_bytes());
                out.extend_from_slice(&csize.to_le_bytes());
                out.extend_from_slice(&usize_.to_le_bytes());
            }
            Trailer::Descriptor64Unsigned => {
                out.extend_from_slice(&crc.to_le_bytes());
                out.extend_from_slice(&csize.to_le_bytes());
                out.extend_from_slice(&usize_.to_le_bytes());
            }
        }

        let cd = &mut self.central;
        cd.extend_from_slice(b"PK\x01\x02");
        cd.extend_from_slice(&version.to_le_bytes());
        cd.extend_from_slice(&version.to_le_bytes());
        cd.extend_from_slice(&flags.to_le_bytes());
        cd.extend_from_slice(&method.to_le_bytes());
        cd.extend_from_slice(&0x6000u16.to_le_bytes());
        cd.extend_from_slice(&0x5a21u16.to_le_bytes());
        cd.extend_from_slice(&crc.to_le_bytes());
        cd.extend_from_slice(&(csize as u32).to_le_bytes());
        cd.extend_from_slice(&(usize_ as u32).to_le_bytes());
        cd.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes()); // extra
        cd.extend_from_slice(&0u16.to_le_bytes()); // comment
        cd.extend_from_slice(&0u16.to_le_bytes()); // disk
        cd.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        cd.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        cd.extend_from_slice(&offset.to_le_bytes());
        cd.extend_from_slice(entry.name.as_bytes());

        self.count += 1;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = self.local;
        let cd_offset = out.len() as u32;
        out.extend_from_slice(&self.central);
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&(self.central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    /// Local entries only, without central directory.
    pub fn build_entries_only(self) -> Vec<u8> {
        self.local
    }
}

/// Text of the first entry in the reference archives.
pub fn content_txt() -> Vec<u8> {
    let mut text = String::new();
    for i in 0..12 {
        text.push_str(&format!("Line {i}: this entry was written with a ZIP64 data descriptor.\n"));
    }
    text.into_bytes()
}

/// Text of the second entry in the reference archives.
pub fn abcdefg_txt() -> Vec<u8> {
    b"Abcdefg hijklmnop qrstuv wxyz. ".repeat(7)[..199].to_vec()
}
