//! Error types for the streaming reader.

use std::io;

use thiserror::Error;

/// Errors produced while reading an archive stream.
#[derive(Debug, Error)]
pub enum ZipError {
    /// I/O error from the underlying source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The local file header is truncated or malformed.
    #[error("invalid local file header: {0}")]
    InvalidLocalHeader(&'static str),

    /// Entry uses a compression method this reader cannot decode.
    #[error("invalid compression method: {0}")]
    UnsupportedCompression(u16),

    /// Entry is encrypted.
    #[error("encrypted ZIP entry not supported: {0}")]
    EncryptedEntry(String),

    /// A STORED entry announced a data descriptor, so its end cannot be found.
    #[error("only DEFLATED entries can have a data descriptor: {0}")]
    StoredWithDescriptor(String),

    /// The inflater rejected the compressed data.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// The source ended inside entry data.
    #[error("unexpected end of ZIP stream")]
    UnexpectedEof,

    /// Uncompressed size does not match the number of bytes produced.
    #[error("invalid entry size (expected {expected} but got {got} bytes)")]
    InvalidEntrySize { expected: u64, got: u64 },

    /// Compressed size does not match the number of bytes consumed.
    #[error("invalid entry compressed size (expected {expected} but got {got} bytes)")]
    InvalidCompressedSize { expected: u64, got: u64 },

    /// CRC32 of the produced bytes does not match the declared one.
    #[error("invalid entry CRC (expected {expected:#x} but got {got:#x})")]
    InvalidCrc { expected: u32, got: u32 },

    /// Reading the 64-bit uncompressed size that trails a misread descriptor failed.
    #[error("failed to read ZIP64 data descriptor tail: {0}")]
    DescriptorTail(#[source] io::Error),
}

impl ZipError {
    /// Whether this error reports a size or checksum mismatch.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ZipError::InvalidEntrySize { .. }
                | ZipError::InvalidCompressedSize { .. }
                | ZipError::InvalidCrc { .. }
        )
    }

    /// Recover the typed error from an `io::Error` produced by this crate's
    /// `Read` implementations. Other I/O errors are wrapped as [`ZipError::Io`].
    pub fn from_io(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<ZipError>()) {
            return ZipError::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<ZipError>()) {
            Some(Ok(zip)) => *zip,
            Some(Err(other)) => ZipError::Io(io::Error::new(kind, other)),
            None => ZipError::Io(kind.into()),
        }
    }
}

impl From<ZipError> for io::Error {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result type for archive stream operations.
pub type Result<T> = std::result::Result<T, ZipError>;
