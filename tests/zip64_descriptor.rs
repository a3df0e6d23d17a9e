mod common;

use std::io::{Cursor, Read};

use common::{ArchiveBuilder, EntrySpec, Trailer, abcdefg_txt, content_txt, deflate};
use zip64pat::{BaseReader, EntryStreamReader, StreamOptions, ZipError, ZipStreamParser};

fn content_zip() -> Vec<u8> {
    ArchiveBuilder::new()
        .entry(EntrySpec::zip64_descriptor("Content.txt", &content_txt()))
        .build()
}

fn content_two_zip(second: EntrySpec) -> Vec<u8> {
    ArchiveBuilder::new()
        .entry(EntrySpec::zip64_descriptor("Content.txt", &content_txt()))
        .entry(second)
        .build()
}

fn abcdefg() -> EntrySpec {
    EntrySpec::zip64_descriptor("Abcdefg.txt", &abcdefg_txt())
}

fn read_all<R: Read>(reader: &mut R) -> Vec<u8> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data).unwrap();
    data
}

#[test]
fn single_entry_archive() {
    let mut reader = EntryStreamReader::new(Cursor::new(content_zip()));

    let entry = reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(entry.name, "Content.txt");
    assert!(entry.extended_trailer);
    assert_eq!(read_all(&mut reader), content_txt());

    assert!(reader.advance_to_next_entry().unwrap().is_none());
    reader.close();
}

#[test]
fn entry_after_recovered_one_is_readable() {
    let text = abcdefg_txt();
    let mut reader = EntryStreamReader::new(Cursor::new(content_two_zip(abcdefg())));

    let first = reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(first.name, "Content.txt");
    // Skipped without reading: closing the entry recovers it
    reader.close_current_entry().unwrap();
    assert_eq!(
        reader.current_entry().unwrap().uncompressed_size,
        content_txt().len() as u64
    );

    let second = reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(second.name, "Abcdefg.txt");
    assert_eq!(read_all(&mut reader), text);

    let closed = reader.current_entry().unwrap();
    assert_eq!(closed.uncompressed_size, 199);
    assert_eq!(closed.compressed_size, deflate(&text).len() as u64);
    assert_eq!(closed.crc32, crc32fast::hash(&text));

    assert!(reader.advance_to_next_entry().unwrap().is_none());
    assert!(reader.advance_to_next_entry().unwrap().is_none());
}

#[test]
fn byte_reads_stop_at_entry_end() {
    let mut reader = EntryStreamReader::new(Cursor::new(content_zip()));
    reader.advance_to_next_entry().unwrap().unwrap();

    let mut data = Vec::new();
    while let Some(byte) = reader.read_byte().unwrap() {
        data.push(byte);
    }
    assert_eq!(data, content_txt());
    assert_eq!(reader.read_byte().unwrap(), None);
}

#[test]
fn small_buffers() {
    let options = StreamOptions {
        buffer_capacity: 7,
        ..StreamOptions::default()
    };
    let mut reader =
        EntryStreamReader::with_options(Cursor::new(content_two_zip(abcdefg())), options);

    reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(read_all(&mut reader), content_txt());
    reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(read_all(&mut reader), abcdefg_txt());
    assert!(reader.advance_to_next_entry().unwrap().is_none());
}

#[test]
fn zero_buffer_capacity_still_reads() {
    let options = StreamOptions {
        buffer_capacity: 0,
        ..StreamOptions::default()
    };
    let mut reader =
        EntryStreamReader::with_options(Cursor::new(content_two_zip(abcdefg())), options);

    reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(read_all(&mut reader), content_txt());
    reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(read_all(&mut reader), abcdefg_txt());
    assert!(reader.advance_to_next_entry().unwrap().is_none());
}

#[test]
fn descriptor_without_signature() {
    let archive = ArchiveBuilder::new()
        .entry(
            EntrySpec::zip64_descriptor("Content.txt", &content_txt())
                .trailer(Trailer::Descriptor64Unsigned),
        )
        .entry(abcdefg().trailer(Trailer::Descriptor64Unsigned))
        .build();
    let mut reader = EntryStreamReader::new(Cursor::new(archive));

    reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(read_all(&mut reader), content_txt());
    let second = reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(second.name, "Abcdefg.txt");
    assert_eq!(read_all(&mut reader), abcdefg_txt());
}

#[test]
fn bad_crc() {
    let text = abcdefg_txt();
    let archive = content_two_zip(abcdefg().crc(0xdeadbeef));
    let mut reader = EntryStreamReader::new(Cursor::new(archive));

    reader.advance_to_next_entry().unwrap().unwrap();
    reader.advance_to_next_entry().unwrap().unwrap();

    let mut data = Vec::new();
    let err = ZipError::from_io(reader.read_to_end(&mut data).unwrap_err());
    assert_eq!(
        err.to_string(),
        format!(
            "invalid entry CRC (expected 0xdeadbeef but got {:#x})",
            crc32fast::hash(&text)
        )
    );
    assert!(err.is_integrity_failure());
}

#[test]
fn bad_compressed_size() {
    let text = abcdefg_txt();
    let archive = content_two_zip(abcdefg().compressed_size(0x11111111));
    let mut reader = EntryStreamReader::new(Cursor::new(archive));

    reader.advance_to_next_entry().unwrap().unwrap();
    reader.advance_to_next_entry().unwrap().unwrap();

    let err = reader.close_current_entry().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "invalid entry compressed size (expected 286331153 but got {} bytes)",
            deflate(&text).len()
        )
    );
}

#[test]
fn bad_uncompressed_size() {
    let archive = content_two_zip(abcdefg().uncompressed_size(0x22222222));
    let mut reader = EntryStreamReader::new(Cursor::new(archive));

    reader.advance_to_next_entry().unwrap().unwrap();
    reader.advance_to_next_entry().unwrap().unwrap();

    let err = reader.close_current_entry().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid entry size (expected 572662306 but got 199 bytes)"
    );
    assert_eq!(
        reader.current_entry().unwrap().uncompressed_size,
        0x22222222
    );
}

#[test]
fn stream_continues_after_failed_recovery() {
    let archive = ArchiveBuilder::new()
        .entry(EntrySpec::zip64_descriptor("Content.txt", &content_txt()).crc(0xdeadbeef))
        .entry(abcdefg())
        .build();
    let mut reader = EntryStreamReader::new(Cursor::new(archive));

    reader.advance_to_next_entry().unwrap().unwrap();
    let mut buf = vec![0u8; 4096];
    let err = loop {
        match reader.read_entry(&mut buf) {
            Ok(0) => panic!("recovery should have failed"),
            Ok(_) => continue,
            Err(err) => break err,
        }
    };
    assert!(matches!(
        err,
        ZipError::InvalidCrc {
            expected: 0xdeadbeef,
            ..
        }
    ));

    // The failed entry yields nothing more and closes quietly
    assert_eq!(reader.read_entry(&mut buf).unwrap(), 0);
    reader.close_current_entry().unwrap();

    let next = reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(next.name, "Abcdefg.txt");
    assert_eq!(read_all(&mut reader), abcdefg_txt());
}

#[test]
fn truncated_descriptor_tail() {
    let mut archive = ArchiveBuilder::new()
        .entry(EntrySpec::zip64_descriptor("Content.txt", &content_txt()))
        .build_entries_only();
    archive.truncate(archive.len() - 5);

    let mut reader = EntryStreamReader::new(Cursor::new(archive));
    reader.advance_to_next_entry().unwrap().unwrap();

    let err = reader.close_current_entry().unwrap_err();
    let ZipError::DescriptorTail(source) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
    reader.close();
}

#[test]
fn strict_mode_reports_misread_descriptor() {
    let options = StreamOptions {
        recover_extended_descriptors: false,
        ..StreamOptions::default()
    };
    let mut reader = EntryStreamReader::with_options(Cursor::new(content_zip()), options);
    reader.advance_to_next_entry().unwrap().unwrap();

    let err = reader.close_current_entry().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "invalid entry size (expected 0 but got {} bytes)",
            content_txt().len()
        )
    );
}

#[test]
fn unwrapped_parser_fails_on_misread_descriptor() {
    let mut parser = ZipStreamParser::new(Cursor::new(content_zip()));
    parser.next_entry().unwrap().unwrap();

    let mut data = Vec::new();
    let err = parser.read_to_end(&mut data).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "invalid entry size (expected 0 but got {} bytes)",
            content_txt().len()
        )
    );
    assert_eq!(data, content_txt());
}

#[test]
fn genuine_corruption_is_not_masked() {
    let archive = ArchiveBuilder::new()
        .entry(
            EntrySpec::deflated("Content.txt", &content_txt())
                .trailer(Trailer::Descriptor32)
                .crc(0xdeadbeef),
        )
        .build();
    let mut reader = EntryStreamReader::new(Cursor::new(archive));
    reader.advance_to_next_entry().unwrap().unwrap();

    let err = reader.close_current_entry().unwrap_err();
    assert!(matches!(
        err,
        ZipError::InvalidCrc {
            expected: 0xdeadbeef,
            ..
        }
    ));
    // No recovery was attempted, so nothing was consumed past the descriptor
    assert!(reader.advance_to_next_entry().unwrap().is_none());
}

#[test]
fn wrong_header_size_is_not_masked() {
    let archive = ArchiveBuilder::new()
        .entry(EntrySpec::deflated("Content.txt", &content_txt()).uncompressed_size(7))
        .build();
    let mut reader = EntryStreamReader::new(Cursor::new(archive));
    reader.advance_to_next_entry().unwrap().unwrap();

    let err = reader.close_current_entry().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "invalid entry size (expected 7 but got {} bytes)",
            content_txt().len()
        )
    );
}

#[test]
fn misaligned_stream_is_not_a_clean_end() {
    // An empty entry produces no bytes, so its ZIP64 descriptor never looks
    // misread and the 8-byte tail stays in front of the next header
    let archive = ArchiveBuilder::new()
        .entry(EntrySpec::zip64_descriptor("empty.txt", b""))
        .entry(abcdefg())
        .build();
    let mut reader = EntryStreamReader::new(Cursor::new(archive));

    let first = reader.advance_to_next_entry().unwrap().unwrap();
    assert_eq!(first.name, "empty.txt");
    assert!(read_all(&mut reader).is_empty());

    let err = reader.advance_to_next_entry().unwrap_err();
    assert!(matches!(
        err,
        ZipError::InvalidLocalHeader("unexpected record signature")
    ));
}
