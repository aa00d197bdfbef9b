//! multipart/form-data write-then-read round trip, including a spooled file
//! part and boundary generation.

mod common;

use std::io::{Cursor, Read as _, Seek as _};
use std::sync::Mutex;

use bytes::{Bytes, BytesMut};
use common::VecChannel;
use wire_http::headers::media_type::MediaType;
use wire_http::io::{OpenFile, SecureRandom, TempStore};
use wire_http::multipart::{generate_boundary, read_multipart, write_multipart, MultipartConfig, OutgoingPart, PartBody};

struct MemTempStore;

impl TempStore for MemTempStore {
    fn create_temp_file(&self, _prefix: &str, _suffix: &str) -> std::io::Result<Box<dyn OpenFile>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }
}

struct FixedRandom(Mutex<u8>);

impl SecureRandom for FixedRandom {
    fn fill(&self, buf: &mut [u8]) {
        let mut counter = self.0.lock().unwrap();
        for b in buf {
            *b = *counter;
            *counter = counter.wrapping_add(1);
        }
    }
}

#[test]
fn writes_and_reads_back_a_text_field_and_a_file_field() {
    let random = FixedRandom(Mutex::new(7));
    let boundary = generate_boundary(&random);

    let parts = vec![
        OutgoingPart::field("title", Bytes::from_static(b"My Upload")),
        OutgoingPart::file(
            "attachment",
            "notes.txt",
            MediaType::new("text", "plain"),
            Bytes::from_static(b"line one\nline two"),
        ),
    ];
    let wire = write_multipart(&parts, &boundary);

    let mut channel = VecChannel::new(&wire);
    let mut buf = BytesMut::new();
    let store = MemTempStore;
    let config = MultipartConfig::default();
    let parsed = read_multipart(&mut channel, &mut buf, &boundary, &config, &store).unwrap();

    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].name(), Some("title"));
    match &parsed[0].body {
        PartBody::Text(s) => assert_eq!(s, "My Upload"),
        PartBody::File(_) => panic!("expected the first part to decode as text"),
    }

    assert_eq!(parsed[1].name(), Some("attachment"));
    assert_eq!(parsed[1].filename(), Some("notes.txt"));
    match &parsed[1].body {
        PartBody::Text(_) => panic!("a non-text content type should spool to a file"),
        PartBody::File(_) => {}
    }
}

#[test]
fn file_part_with_non_text_content_type_spools_to_the_temp_store() {
    let boundary = "WIRE-TEST-BOUNDARY";
    let parts = vec![OutgoingPart::file(
        "upload",
        "photo.png",
        MediaType::new("image", "png"),
        Bytes::from_static(&[0x89, b'P', b'N', b'G', 0, 1, 2, 3]),
    )];
    let wire = write_multipart(&parts, boundary);

    let mut channel = VecChannel::new(&wire);
    let mut buf = BytesMut::new();
    let store = MemTempStore;
    let config = MultipartConfig::default();
    let mut parsed = read_multipart(&mut channel, &mut buf, boundary, &config, &store).unwrap();

    let part = parsed.pop().unwrap();
    match part.body {
        PartBody::File(mut file) => {
            file.rewind().unwrap();
            let mut out = Vec::new();
            file.read_to_end(&mut out).unwrap();
            assert_eq!(out, vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]);
        }
        PartBody::Text(_) => panic!("expected a spooled file part"),
    }
}

#[test]
fn empty_parts_list_yields_a_well_formed_empty_body() {
    let boundary = "EMPTY";
    let wire = write_multipart(&[], boundary);
    let mut channel = VecChannel::new(&wire);
    let mut buf = BytesMut::new();
    let store = MemTempStore;
    let config = MultipartConfig::default();
    let parsed = read_multipart(&mut channel, &mut buf, boundary, &config, &store).unwrap();
    assert!(parsed.is_empty());
}

#[test]
fn body_exceeding_the_configured_limit_is_rejected() {
    let boundary = "LIMIT";
    let parts = vec![OutgoingPart::field("big", Bytes::from(vec![b'a'; 4096]))];
    let wire = write_multipart(&parts, boundary);

    let mut channel = VecChannel::new(&wire);
    let mut buf = BytesMut::new();
    let store = MemTempStore;
    let config = MultipartConfig { buf_limit: 128 };
    let err = read_multipart(&mut channel, &mut buf, boundary, &config, &store).unwrap_err();
    assert!(matches!(err, wire_http::MultipartError::BodyTooLarge));
}
