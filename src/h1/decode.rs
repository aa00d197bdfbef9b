//! HTTP/1.1 message reader (spec §4.1 "Reader contract").
//!
//! Unlike the teacher's `httparse`-based decoder, this reader is hand-rolled
//! over a byte-at-a-time line scanner: the spec requires obs-fold
//! unfolding and bare-LF tolerance at the wire boundary, which `httparse`
//! does not accept without a pre-normalization pass of its own, so the
//! normalization *is* the parser here (same shape as the byte state machine
//! in `chunked.rs`).

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::HttpError;
use crate::io::ByteChannel;
use crate::message::{Entity, Header, HttpRequest, HttpResponse, Version};

use super::H1Config;

/// Reads one request head (start line + headers) plus its body from
/// `channel`, blocking as needed. `buf` carries any bytes already buffered
/// from a previous read (e.g. the start of a pipelined next request) and
/// is left holding whatever bytes were read past the end of this message.
pub fn read_request(channel: &mut dyn ByteChannel, buf: &mut BytesMut, config: &H1Config) -> Result<HttpRequest, HttpError> {
    let block = read_head_block(channel, buf, config.max_header_size)?;
    let lines = split_lines(&block);
    let mut lines = lines.into_iter();

    let start_line = lines.next().ok_or(HttpError::MalformedStartLine)?;
    let (method, target, version) = parse_request_line(start_line)?;

    let headers = unfold_headers(lines, config.max_line)?;

    let is_head = method.eq_ignore_ascii_case("HEAD");
    let is_connect = method.eq_ignore_ascii_case("CONNECT");

    let framing = determine_request_framing(&headers)?;
    let body = read_body(channel, buf, framing, config)?;

    let mut req = HttpRequest::new(method, target, version);
    for h in headers {
        req.headers_mut().push(h);
    }
    let mut req = req.with_body(body.entity);
    for t in body.trailers {
        req.headers_mut().push(t);
    }
    if is_head {
        req.attributes_mut().insert("http.head".into(), "1".into());
    }
    if is_connect {
        req.attributes_mut().insert("http.connect".into(), "1".into());
    }
    debug!(method = req.method(), target = req.target(), "request decoded");
    Ok(req)
}

/// Reads one response head plus its body. `request_method`/`request_was_head`
/// are needed because response framing depends on the request that
/// triggered it (spec §4.1 step 3: "response to HEAD/CONNECT").
pub fn read_response(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    config: &H1Config,
    request_was_head: bool,
    request_was_connect: bool,
) -> Result<HttpResponse, HttpError> {
    let block = read_head_block(channel, buf, config.max_header_size)?;
    let lines = split_lines(&block);
    let mut lines = lines.into_iter();

    let start_line = lines.next().ok_or(HttpError::MalformedStartLine)?;
    let (version, status, reason) = parse_status_line(start_line)?;

    let headers = unfold_headers(lines, config.max_line)?;

    let no_body_status = matches!(status, 100..=199 | 204 | 304);
    let framing = if no_body_status || request_was_head || request_was_connect {
        BodyFraming::Empty
    } else {
        determine_response_framing(&headers)?
    };
    let body = read_body(channel, buf, framing, config)?;

    let mut res = HttpResponse::new(status, reason, version);
    for h in headers {
        res.headers_mut().push(h);
    }
    let mut res = res.with_body(body.entity);
    for t in body.trailers {
        res.headers_mut().push(t);
    }
    debug!(status = res.status(), "response decoded");
    Ok(res)
}

enum BodyFraming {
    Empty,
    Chunked,
    Length(u64),
    Eof,
}

struct DecodedBody {
    entity: Entity,
    trailers: Vec<Header>,
}

fn read_body(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    framing: BodyFraming,
    config: &H1Config,
) -> Result<DecodedBody, HttpError> {
    match framing {
        BodyFraming::Empty => Ok(DecodedBody {
            entity: Entity::empty(),
            trailers: Vec::new(),
        }),
        BodyFraming::Length(0) => Ok(DecodedBody {
            entity: Entity::empty(),
            trailers: Vec::new(),
        }),
        BodyFraming::Length(n) => {
            if n > config.max_body {
                return Err(HttpError::BodyTooLarge);
            }
            let body = read_exact_body(channel, buf, n)?;
            Ok(DecodedBody {
                entity: Entity::from_bytes(body),
                trailers: Vec::new(),
            })
        }
        BodyFraming::Chunked => {
            let (body, trailers) = super::chunked::read_chunked_body(channel, buf, config.max_body, config.max_header_size)?;
            Ok(DecodedBody {
                entity: Entity::from_bytes(body),
                trailers,
            })
        }
        BodyFraming::Eof => {
            let body = read_until_eof(channel, buf, config.max_body)?;
            Ok(DecodedBody {
                entity: Entity::from_bytes(body),
                trailers: Vec::new(),
            })
        }
    }
}

fn read_exact_body(channel: &mut dyn ByteChannel, buf: &mut BytesMut, n: u64) -> Result<Bytes, HttpError> {
    while (buf.len() as u64) < n {
        if !super::fill(channel, buf)? {
            return Err(HttpError::Truncated);
        }
    }
    Ok(buf.split_to(n as usize).freeze())
}

fn read_until_eof(channel: &mut dyn ByteChannel, buf: &mut BytesMut, max_body: u64) -> Result<Bytes, HttpError> {
    loop {
        if (buf.len() as u64) > max_body {
            return Err(HttpError::BodyTooLarge);
        }
        if !super::fill(channel, buf)? {
            break;
        }
    }
    if (buf.len() as u64) > max_body {
        return Err(HttpError::BodyTooLarge);
    }
    Ok(buf.split().freeze())
}

fn determine_request_framing(headers: &[Header]) -> Result<BodyFraming, HttpError> {
    if let Some(te) = find_transfer_encoding(headers)? {
        return if te.ends_with_chunked {
            Ok(BodyFraming::Chunked)
        } else {
            Err(HttpError::MalformedMessage)
        };
    }
    if let Some(len) = find_content_length(headers)? {
        return Ok(BodyFraming::Length(len));
    }
    Ok(BodyFraming::Empty)
}

fn determine_response_framing(headers: &[Header]) -> Result<BodyFraming, HttpError> {
    if let Some(te) = find_transfer_encoding(headers)? {
        return if te.ends_with_chunked {
            Ok(BodyFraming::Chunked)
        } else {
            Err(HttpError::MalformedMessage)
        };
    }
    if let Some(len) = find_content_length(headers)? {
        return Ok(BodyFraming::Length(len));
    }
    Ok(BodyFraming::Eof)
}

struct TransferEncoding {
    ends_with_chunked: bool,
}

/// Joins all `Transfer-Encoding` header lines (in order) and checks whether
/// the final coding token is `chunked` (spec §4.1 step 3).
fn find_transfer_encoding(headers: &[Header]) -> Result<Option<TransferEncoding>, HttpError> {
    let mut last_token: Option<String> = None;
    let mut present = false;
    for h in headers {
        if h.name.as_str().eq_ignore_ascii_case("transfer-encoding") {
            present = true;
            for tok in crate::grammar::split_comma_list(&h.value) {
                last_token = Some(tok.to_string());
            }
        }
    }
    if !present {
        return Ok(None);
    }
    let ends_with_chunked = last_token.is_some_and(|t| t.eq_ignore_ascii_case("chunked"));
    Ok(Some(TransferEncoding { ends_with_chunked }))
}

/// Finds `Content-Length`, rejecting disagreeing duplicate values (spec
/// §4.1 step 3: "Multiple values that disagree -> MalformedMessage").
fn find_content_length(headers: &[Header]) -> Result<Option<u64>, HttpError> {
    let mut found: Option<u64> = None;
    for h in headers {
        if h.name.as_str().eq_ignore_ascii_case("content-length") {
            for tok in h.value.split(',') {
                let n: u64 = tok.trim().parse().map_err(|_| HttpError::MalformedMessage)?;
                match found {
                    Some(existing) if existing != n => return Err(HttpError::MalformedMessage),
                    Some(_) => {}
                    None => found = Some(n),
                }
            }
        }
    }
    Ok(found)
}

/// Reads bytes until the header block's terminating blank line, returning
/// the full block (start line through, and including, the blank line's own
/// terminator) with `buf` advanced past it.
fn read_head_block(channel: &mut dyn ByteChannel, buf: &mut BytesMut, max_header_size: usize) -> Result<Bytes, HttpError> {
    let mut start = 0usize;
    loop {
        if let Some(rel) = memchr::memchr(b'\n', &buf[start..]) {
            let idx = start + rel;
            let mut line_end = idx;
            if line_end > start && buf[line_end - 1] == b'\r' {
                line_end -= 1;
            }
            if line_end == start {
                if idx + 1 > max_header_size {
                    return Err(HttpError::HeaderLimitExceeded);
                }
                return Ok(buf.split_to(idx + 1).freeze());
            }
            start = idx + 1;
            if start > max_header_size {
                return Err(HttpError::HeaderLimitExceeded);
            }
        } else {
            if buf.len() > max_header_size {
                return Err(HttpError::HeaderLimitExceeded);
            }
            if !super::fill(channel, buf)? {
                if buf.is_empty() {
                    return Err(HttpError::Truncated);
                }
                return Err(HttpError::MalformedStartLine);
            }
        }
    }
}

/// Splits a full header block into its individual lines (CRLF or bare LF
/// terminated), excluding the trailing blank line.
fn split_lines(block: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    while let Some(rel) = memchr::memchr(b'\n', &block[start..]) {
        let idx = start + rel;
        let mut end = idx;
        if end > start && block[end - 1] == b'\r' {
            end -= 1;
        }
        if end == start {
            break;
        }
        lines.push(&block[start..end]);
        start = idx + 1;
    }
    lines
}

fn parse_request_line(line: &[u8]) -> Result<(String, String, Version), HttpError> {
    let s = std::str::from_utf8(line).map_err(|_| HttpError::MalformedStartLine)?;
    let mut parts = s.splitn(3, ' ');
    let method = parts.next().filter(|s| !s.is_empty()).ok_or(HttpError::MalformedStartLine)?;
    let target = parts.next().filter(|s| !s.is_empty()).ok_or(HttpError::MalformedStartLine)?;
    let version = parts.next().ok_or(HttpError::MalformedStartLine)?;
    Ok((method.to_string(), target.to_string(), parse_version(version)?))
}

fn parse_status_line(line: &[u8]) -> Result<(Version, u16, String), HttpError> {
    let s = std::str::from_utf8(line).map_err(|_| HttpError::MalformedStartLine)?;
    let mut parts = s.splitn(3, ' ');
    let version = parts.next().filter(|s| !s.is_empty()).ok_or(HttpError::MalformedStartLine)?;
    let status = parts.next().filter(|s| !s.is_empty()).ok_or(HttpError::MalformedStartLine)?;
    let reason = parts.next().unwrap_or("").to_string();
    let status: u16 = status.parse().map_err(|_| HttpError::MalformedStartLine)?;
    Ok((parse_version(version)?, status, reason))
}

fn parse_version(s: &str) -> Result<Version, HttpError> {
    match s {
        "HTTP/1.1" => Ok(Version::Http11),
        "HTTP/1.0" => Ok(Version::Http10),
        _ => Err(HttpError::MalformedStartLine),
    }
}

/// Parses the header lines of a block, unfolding obs-fold continuations
/// (a line starting with SP/HTAB joins the previous header's value with a
/// single space, per spec §4.1 step 2).
fn unfold_headers<'a>(lines: impl Iterator<Item = &'a [u8]>, max_line: usize) -> Result<Vec<Header>, HttpError> {
    let mut headers: Vec<Header> = Vec::new();
    for line in lines {
        if line.len() > max_line {
            return Err(HttpError::HeaderLimitExceeded);
        }
        if matches!(line.first(), Some(b' ') | Some(b'\t')) {
            let cont = std::str::from_utf8(line).map_err(|_| HttpError::MalformedHeader)?;
            let last = headers.last_mut().ok_or(HttpError::MalformedHeader)?;
            last.value.push(' ');
            last.value.push_str(cont.trim_matches([' ', '\t']));
            continue;
        }
        let colon = memchr::memchr(b':', line).ok_or(HttpError::MalformedHeader)?;
        let name = std::str::from_utf8(&line[..colon]).map_err(|_| HttpError::MalformedHeader)?;
        if !crate::grammar::is_token(name) {
            return Err(HttpError::MalformedHeader);
        }
        let value = std::str::from_utf8(&line[colon + 1..]).map_err(|_| HttpError::MalformedHeader)?;
        let value = value.trim_matches([' ', '\t']);
        headers.push(Header::new(name, value));
    }
    Ok(headers)
}

/// Reads trailer headers (following a chunked body's terminating chunk) up
/// to the blank line that ends them (spec §4.1 step 5). Also reused by the
/// multipart parser to read a part's header block, which has the same shape
/// (no start line, just `name: value` lines up to a blank line).
pub(crate) fn read_trailer_headers(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    max_header_size: usize,
) -> Result<Vec<Header>, HttpError> {
    // The terminating `0\r\n` (and its CRLF) has already been consumed by
    // the chunked state machine; what remains, up to the blank line, is
    // exactly a header block with no start line.
    let block = read_trailer_block(channel, buf, max_header_size)?;
    if block.is_empty() {
        return Ok(Vec::new());
    }
    let lines = split_lines(&block);
    unfold_headers(lines.into_iter(), max_header_size)
}

fn read_trailer_block(channel: &mut dyn ByteChannel, buf: &mut BytesMut, max_header_size: usize) -> Result<Bytes, HttpError> {
    // If the very next line is already blank, there are no trailers.
    let mut start = 0usize;
    loop {
        if let Some(rel) = memchr::memchr(b'\n', &buf[start..]) {
            let idx = start + rel;
            let mut line_end = idx;
            if line_end > start && buf[line_end - 1] == b'\r' {
                line_end -= 1;
            }
            if line_end == start {
                return Ok(buf.split_to(idx + 1).freeze());
            }
            start = idx + 1;
            if start > max_header_size {
                return Err(HttpError::HeaderLimitExceeded);
            }
        } else {
            if buf.len() > max_header_size {
                return Err(HttpError::HeaderLimitExceeded);
            }
            if !super::fill(channel, buf)? {
                return Err(HttpError::Truncated);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VecChannel;

    #[test]
    fn http_echo_request() {
        let mut channel = VecChannel::new(b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello");
        let mut buf = BytesMut::new();
        let req = read_request(&mut channel, &mut buf, &H1Config::default()).unwrap();
        assert_eq!(req.method(), "POST");
        assert_eq!(req.target(), "/echo");
        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.body().known_size(), Some(5));
        assert_eq!(&req.into_body().into_bytes().unwrap()[..], b"hello");
    }

    #[test]
    fn chunked_response_with_trailer() {
        let mut channel = VecChannel::new(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\nX-Trailer: t\r\n\r\n",
        );
        let mut buf = BytesMut::new();
        let res = read_response(&mut channel, &mut buf, &H1Config::default(), false, false).unwrap();
        let trailer = res.headers().iter().find(|h| h.name.as_str() == "X-Trailer").unwrap();
        assert_eq!(trailer.value, "t");
        assert_eq!(&res.into_body().into_bytes().unwrap()[..], b"hello world");
    }

    #[test]
    fn obs_fold_is_unfolded() {
        let mut channel = VecChannel::new(b"GET / HTTP/1.1\r\nX-Long: a\r\n b\r\n\r\n");
        let mut buf = BytesMut::new();
        let req = read_request(&mut channel, &mut buf, &H1Config::default()).unwrap();
        assert_eq!(req.headers()[0].value, "a b");
    }

    #[test]
    fn disagreeing_content_length_is_malformed() {
        let mut channel = VecChannel::new(b"GET / HTTP/1.1\r\nContent-Length: 4\r\nContent-Length: 5\r\n\r\nabcd");
        let mut buf = BytesMut::new();
        let err = read_request(&mut channel, &mut buf, &H1Config::default()).unwrap_err();
        assert!(matches!(err, HttpError::MalformedMessage));
    }

    #[test]
    fn non_final_chunked_is_rejected() {
        let mut channel = VecChannel::new(b"GET / HTTP/1.1\r\nTransfer-Encoding: chunked, gzip\r\n\r\n");
        let mut buf = BytesMut::new();
        let err = read_request(&mut channel, &mut buf, &H1Config::default()).unwrap_err();
        assert!(matches!(err, HttpError::MalformedMessage));
    }

    #[test]
    fn response_with_no_content_length_reads_until_eof() {
        let mut channel = VecChannel::new(b"HTTP/1.1 200 OK\r\n\r\nhello world");
        let mut buf = BytesMut::new();
        let res = read_response(&mut channel, &mut buf, &H1Config::default(), false, false).unwrap();
        assert_eq!(&res.into_body().into_bytes().unwrap()[..], b"hello world");
    }

    #[test]
    fn head_response_has_empty_body_even_with_length() {
        let mut channel = VecChannel::new(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
        let mut buf = BytesMut::new();
        let res = read_response(&mut channel, &mut buf, &H1Config::default(), true, false).unwrap();
        assert!(res.body().is_known_empty());
    }
}
