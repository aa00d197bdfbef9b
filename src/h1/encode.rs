//! HTTP/1.1 message writer (spec §4.1 "Writer contract").

use bytes::Bytes;
use tracing::debug;

use crate::error::HttpError;
use crate::message::{BodySize, Entity, HasHeaders, HttpRequest, HttpResponse};

use super::chunked::{encode_chunk, encode_last_chunk};

/// Serializes `req` to `out`, writing the body in full (spec §8's writer
/// round-trip property assumes an in-memory, already-fully-buffered body —
/// see `Entity`'s doc comment on the crate's synchronous I/O model).
pub fn write_request(req: HttpRequest, out: &mut Vec<u8>) -> Result<(), HttpError> {
    out.extend_from_slice(req.method().as_bytes());
    out.push(b' ');
    out.extend_from_slice(req.target().as_bytes());
    out.push(b' ');
    out.extend_from_slice(req.version.as_str().as_bytes());
    out.extend_from_slice(b"\r\n");

    let is_connect = req.is_connect();
    let method = req.method().to_string();
    let target = req.target().to_string();
    let headers = req.headers().to_vec();
    let body = req.into_body();
    // a request body is never forbidden by method for length-header purposes
    // except CONNECT, and HEAD requests may still carry a request body.
    write_headers_and_body(&headers, out, body, is_connect, false)?;
    debug!(%method, %target, "request encoded");
    Ok(())
}

/// Serializes `res` to `out`.
pub fn write_response(res: HttpResponse, out: &mut Vec<u8>) -> Result<(), HttpError> {
    out.extend_from_slice(res.version.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(res.status().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(res.reason().as_bytes());
    out.extend_from_slice(b"\r\n");

    let status = res.status();
    let forbids_body = matches!(status, 100..=199 | 204 | 304);
    let headers = res.headers().to_vec();
    let body = res.into_body();
    write_headers_and_body(&headers, out, body, false, forbids_body)?;
    debug!(status, "response encoded");
    Ok(())
}

fn write_headers_and_body(
    headers: &[crate::message::Header],
    out: &mut Vec<u8>,
    body: Entity,
    forbids_length_headers: bool,
    forbids_body_bytes: bool,
) -> Result<(), HttpError> {
    let has_content_length = headers.iter().any(|h| h.name.as_str().eq_ignore_ascii_case("content-length"));
    let has_transfer_encoding = headers
        .iter()
        .any(|h| h.name.as_str().eq_ignore_ascii_case("transfer-encoding"));

    for h in headers {
        out.extend_from_slice(h.name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(h.value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }

    let size = body.body_size();
    let emit_length_headers = !forbids_length_headers && !has_content_length && !has_transfer_encoding;

    match size {
        BodySize::Empty => {
            out.extend_from_slice(b"\r\n");
            return Ok(());
        }
        BodySize::Known(n) if emit_length_headers => {
            out.extend_from_slice(format!("content-length: {n}\r\n").as_bytes());
        }
        BodySize::Unknown if emit_length_headers => {
            out.extend_from_slice(b"transfer-encoding: chunked\r\n");
        }
        _ => {}
    }
    out.extend_from_slice(b"\r\n");

    if forbids_body_bytes {
        return Ok(());
    }

    let use_chunked = matches!(size, BodySize::Unknown) && (emit_length_headers || has_transfer_encoding);
    let bytes: Bytes = body.into_bytes()?;

    if use_chunked {
        encode_chunk(&bytes, out);
        encode_last_chunk(out);
    } else {
        out.extend_from_slice(&bytes);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HasHeaders, Header, Version};

    #[test]
    fn writes_content_length_body() {
        let req = HttpRequest::new("POST", "/echo", Version::Http11)
            .with_body(Entity::from_bytes(Bytes::from_static(b"hello")));
        let mut req = req;
        req.headers_mut().push(Header::new("Host", "x"));

        let mut out = Vec::new();
        write_request(req, &mut out).unwrap();
        assert_eq!(
            out,
            b"POST /echo HTTP/1.1\r\nHost: x\r\ncontent-length: 5\r\n\r\nhello".to_vec()
        );
    }

    #[test]
    fn writes_chunked_for_unknown_size() {
        let mut res = HttpResponse::new(200, "OK", Version::Http11);
        res.headers_mut().push(Header::new("X-Test", "1"));
        let res = res.with_body(Entity::from_reader(std::io::Cursor::new(b"hello".to_vec()), None));

        let mut out = Vec::new();
        write_response(res, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\nX-Test: 1\r\ntransfer-encoding: chunked\r\n\r\n"));
        assert!(text.ends_with("5\r\nhello\r\n0\r\n\r\n"));
    }

    #[test]
    fn no_body_status_emits_no_length_headers() {
        let res = HttpResponse::new(204, "No Content", Version::Http11);
        let mut out = Vec::new();
        write_response(res, &mut out).unwrap();
        assert_eq!(out, b"HTTP/1.1 204 No Content\r\n\r\n".to_vec());
    }
}
