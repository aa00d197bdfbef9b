//! WebSocket handshake, masked echo, and close-handshake scenarios driven
//! through the public [`wire_http::ws`] API.

mod common;

use bytes::Bytes;
use common::VecChannel;
use wire_http::headers;
use wire_http::io::ThreadRng;
use wire_http::message::{HttpRequest, Version};
use wire_http::ws::frame::{write_frame, Frame, OpCode};
use wire_http::ws::session::{Session, SessionHandler, State};
use wire_http::ws::{handshake, CloseCode, WsConfig};
use wire_http::Uri;

#[test]
fn handshake_request_is_validated_and_produces_a_switching_protocols_response() {
    let req = HttpRequest::new("GET", "/chat", Version::Http11);
    let req = headers::set_upgrade(req, "websocket");
    let req = headers::set_connection(req, "Upgrade");
    let req = headers::set_sec_websocket_version(req, "13");
    let req = headers::set_sec_websocket_key(req, "dGhlIHNhbXBsZSBub25jZQ==");

    let res = handshake::build_response(&req).unwrap();
    assert_eq!(res.status(), 101);
    assert_eq!(headers::sec_websocket_accept(&res), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
    assert!(handshake::verify_response(&res, "dGhlIHNhbXBsZSBub25jZQ==").is_ok());
}

struct EchoHandler;

impl SessionHandler for EchoHandler {
    fn on_text(&mut self, session: &mut Session, text: &str) {
        session.send_text(text).unwrap();
    }

    fn on_binary(&mut self, session: &mut Session, data: &[u8]) {
        session.send_binary(data).unwrap();
    }
}

#[test]
fn server_echoes_a_masked_client_text_message() {
    let mut wire = Vec::new();
    write_frame(
        &mut wire,
        &Frame::new(true, OpCode::Text, Bytes::from_static(b"ping")),
        Some([0x11, 0x22, 0x33, 0x44]),
    );

    let channel = Box::new(VecChannel::new(&wire));
    let mut session = Session::new(1, Uri::parse("/chat"), "13", false, true, WsConfig::default(), channel, Box::new(ThreadRng));
    session.open();

    let mut handler = EchoHandler;
    let more = session.read_message(&mut handler).unwrap();
    assert!(more);
    assert_eq!(session.state(), State::Open);
}

#[test]
fn close_handshake_echoes_the_code_and_transitions_to_closed() {
    let mut wire = Vec::new();
    let mut payload = 1000u16.to_be_bytes().to_vec();
    payload.extend_from_slice(b"done");
    write_frame(&mut wire, &Frame::new(true, OpCode::Close, Bytes::from(payload)), None);

    let channel = Box::new(VecChannel::new(&wire));
    let mut session = Session::new(2, Uri::parse("/chat"), "13", false, true, WsConfig::default(), channel, Box::new(ThreadRng));
    session.open();

    struct RecordClose {
        seen: Option<(CloseCode, String)>,
    }
    impl SessionHandler for RecordClose {
        fn on_close(&mut self, _session: &mut Session, code: CloseCode, reason: &str) {
            self.seen = Some((code, reason.to_string()));
        }
    }

    let mut handler = RecordClose { seen: None };
    let more = session.read_message(&mut handler).unwrap();
    assert!(!more);
    assert_eq!(session.state(), State::Closed);
    assert_eq!(handler.seen, Some((CloseCode::Normal, "done".to_string())));

    // A second close is a no-op rather than an error.
    session.close(CloseCode::Normal, "").unwrap();
    assert_eq!(session.state(), State::Closed);
}

#[test]
fn fragmented_binary_message_reassembles_before_dispatch() {
    let mut wire = Vec::new();
    write_frame(&mut wire, &Frame::new(false, OpCode::Binary, Bytes::from_static(&[1, 2])), None);
    write_frame(&mut wire, &Frame::new(true, OpCode::Continuation, Bytes::from_static(&[3, 4])), None);

    let channel = Box::new(VecChannel::new(&wire));
    let mut session = Session::new(3, Uri::parse("/chat"), "13", false, true, WsConfig::default(), channel, Box::new(ThreadRng));
    session.open();

    struct CaptureBinary {
        data: Vec<u8>,
    }
    impl SessionHandler for CaptureBinary {
        fn on_binary(&mut self, _session: &mut Session, data: &[u8]) {
            self.data = data.to_vec();
        }
    }

    let mut handler = CaptureBinary { data: Vec::new() };
    session.read_message(&mut handler).unwrap();
    session.read_message(&mut handler).unwrap();
    assert_eq!(handler.data, vec![1, 2, 3, 4]);
}
