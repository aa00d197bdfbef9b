//! `multipart/form-data` codec (spec §4.4, RFC 7578).

use bytes::{Bytes, BytesMut};
use std::io::{Read, Seek, Write};
use tracing::{trace, warn};

use crate::error::MultipartError;
use crate::h1::decode::read_trailer_headers;
use crate::headers::disposition::ContentDisposition;
use crate::headers::media_type::MediaType;
use crate::io::{ByteChannel, SecureRandom, TempStore};
use crate::message::{Entity, Header};

/// Configuration for the multipart parser (spec §12).
#[derive(Debug, Clone, Copy)]
pub struct MultipartConfig {
    /// Total byte budget for an entire multipart body.
    pub buf_limit: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self { buf_limit: 1024 * 1024 }
    }
}

/// A single parsed multipart part: its headers plus its decoded body.
pub struct Part {
    pub disposition: ContentDisposition,
    pub content_type: MediaType,
    pub body: PartBody,
}

impl Part {
    pub fn name(&self) -> Option<&str> {
        self.disposition.name()
    }

    pub fn filename(&self) -> Option<&str> {
        self.disposition.filename()
    }
}

/// A part's payload: held in memory if it decoded as text, otherwise
/// spooled to a temp file via the [`TempStore`] collaborator.
pub enum PartBody {
    Text(String),
    File(Box<dyn crate::io::OpenFile>),
}

/// A part to be written, either in-memory bytes or a field value.
pub struct OutgoingPart {
    pub disposition: ContentDisposition,
    pub content_type: Option<MediaType>,
    pub data: Bytes,
}

impl OutgoingPart {
    pub fn field(name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            disposition: ContentDisposition::form_data(name),
            content_type: None,
            data: value.into(),
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, content_type: MediaType, data: impl Into<Bytes>) -> Self {
        let mut disposition = ContentDisposition::form_data(name);
        disposition.params.push(("filename".to_string(), filename.into()));
        Self {
            disposition,
            content_type: Some(content_type),
            data: data.into(),
        }
    }
}

/// Generates a boundary: `----MultipartBoundary_` followed by 16 CSPRNG
/// alphanumeric characters (spec §4.4).
pub fn generate_boundary(random: &dyn SecureRandom) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut boundary = String::from("----MultipartBoundary_");
    let mut buf = [0u8; 16];
    random.fill(&mut buf);
    for b in buf {
        boundary.push(ALPHABET[(b as usize) % ALPHABET.len()] as char);
    }
    boundary
}

/// Writes `parts` as a multipart/form-data body delimited by `boundary`.
pub fn write_multipart(parts: &[OutgoingPart], boundary: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        write!(out, "--{boundary}\r\n").unwrap();
        write!(out, "Content-Disposition: {}\r\n", part.disposition.format()).unwrap();
        let omit_content_type = part
            .content_type
            .as_ref()
            .map(|mt| mt.type_ == "text" && mt.subtype == "plain" && mt.params.is_empty())
            .unwrap_or(true);
        if !omit_content_type {
            let mt = part.content_type.as_ref().unwrap();
            write!(out, "Content-Type: {}\r\n", mt.format()).unwrap();
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.data);
        out.extend_from_slice(b"\r\n");
    }
    write!(out, "--{boundary}--\r\n").unwrap();
    out
}

/// Reads a full multipart/form-data body from `channel`, given the boundary
/// extracted from the containing message's `Content-Type` parameters.
pub fn read_multipart(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    boundary: &str,
    config: &MultipartConfig,
    temp_store: &dyn TempStore,
) -> Result<Vec<Part>, MultipartError> {
    let delimiter = format!("--{boundary}");
    let terminator = format!("--{boundary}--");
    let mut total = 0usize;
    let mut parts = Vec::new();

    let first = read_line(channel, buf, &mut total, config.buf_limit)?;
    if first.as_deref() == Some(terminator.as_str()) {
        return Ok(parts);
    }
    if first.as_deref() != Some(delimiter.as_str()) {
        return Err(MultipartError::MalformedPart);
    }

    loop {
        let headers = read_trailer_headers(channel, buf, config.buf_limit)?;
        let disposition = match find_header(&headers, "Content-Disposition") {
            None => {
                warn!("multipart part is missing Content-Disposition");
                return Err(MultipartError::MalformedPart);
            }
            Some(v) => ContentDisposition::parse(v).map_err(|_| {
                warn!(value = v, "multipart part has a malformed Content-Disposition");
                MultipartError::MalformedPart
            })?,
        };
        if !disposition.is_form_data() || disposition.name().is_none() {
            warn!("multipart part is not form-data or is missing a name");
            return Err(MultipartError::MalformedPart);
        }
        let content_type = match find_header(&headers, "Content-Type") {
            Some(v) => MediaType::parse(v).map_err(|_| MultipartError::MalformedPart)?,
            None => MediaType::new("text", "plain"),
        };

        let (raw, terminal) = read_part_body(channel, buf, &delimiter, &terminator, &mut total, config.buf_limit)?;
        let is_text = content_type.type_.eq_ignore_ascii_case("text");
        let body = if is_text {
            PartBody::Text(decode_text(&raw, content_type.charset()))
        } else {
            let mut file = temp_store.create_temp_file("multipart", ".part").map_err(MultipartError::from)?;
            file.write_all(&raw).map_err(MultipartError::from)?;
            file.flush().map_err(MultipartError::from)?;
            PartBody::File(file)
        };

        trace!(name = ?disposition.name(), content_type = %content_type.format(), "multipart part parsed");
        parts.push(Part {
            disposition,
            content_type,
            body,
        });

        if terminal {
            return Ok(parts);
        }
    }
}

fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers.iter().find(|h| h.name == *name).map(|h| h.value.as_str())
}

fn decode_text(raw: &[u8], charset: &str) -> String {
    if charset.eq_ignore_ascii_case("UTF-8") || charset.eq_ignore_ascii_case("US-ASCII") {
        String::from_utf8_lossy(raw).into_owned()
    } else {
        // Only UTF-8 text decoding is supported; other charsets are passed
        // through byte-for-byte as Latin-1 would, to avoid a hard failure.
        raw.iter().map(|&b| b as char).collect()
    }
}

fn read_line(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    total: &mut usize,
    limit: usize,
) -> Result<Option<String>, MultipartError> {
    let mut start = 0usize;
    loop {
        if let Some(rel) = memchr::memchr(b'\n', &buf[start..]) {
            let idx = start + rel;
            let mut end = idx;
            if end > start && buf[end - 1] == b'\r' {
                end -= 1;
            }
            let line = buf.split_to(idx + 1);
            *total += line.len();
            if *total > limit {
                return Err(MultipartError::BodyTooLarge);
            }
            let text = std::str::from_utf8(&line[..end]).map_err(|_| MultipartError::MalformedPart)?;
            return Ok(Some(text.to_string()));
        }
        if buf.len() > limit {
            return Err(MultipartError::BodyTooLarge);
        }
        if !crate::h1::fill(channel, buf).map_err(|_| MultipartError::MalformedPart)? {
            return Ok(None);
        }
    }
}

/// Reads part payload bytes up to a line equal to `delimiter` or
/// `terminator`, stripping the payload's own trailing CRLF. Returns the
/// payload plus whether the terminal boundary (`--B--`) was seen.
fn read_part_body(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    delimiter: &str,
    terminator: &str,
    total: &mut usize,
    limit: usize,
) -> Result<(Bytes, bool), MultipartError> {
    let mut payload = BytesMut::new();
    loop {
        match read_raw_line(channel, buf, total, limit)? {
            None => return Err(MultipartError::MalformedPart),
            Some(line) => {
                let text = std::str::from_utf8(&line).unwrap_or("");
                if text == delimiter {
                    strip_trailing_crlf(&mut payload);
                    return Ok((payload.freeze(), false));
                }
                if text == terminator {
                    strip_trailing_crlf(&mut payload);
                    return Ok((payload.freeze(), true));
                }
                payload.extend_from_slice(&line);
                payload.extend_from_slice(b"\r\n");
            }
        }
    }
}

fn strip_trailing_crlf(payload: &mut BytesMut) {
    if payload.ends_with(b"\r\n") {
        let new_len = payload.len() - 2;
        payload.truncate(new_len);
    }
}

fn read_raw_line(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    total: &mut usize,
    limit: usize,
) -> Result<Option<Bytes>, MultipartError> {
    let mut start = 0usize;
    loop {
        if let Some(rel) = memchr::memchr(b'\n', &buf[start..]) {
            let idx = start + rel;
            let mut end = idx;
            if end > start && buf[end - 1] == b'\r' {
                end -= 1;
            }
            let full = buf.split_to(idx + 1);
            *total += full.len();
            if *total > limit {
                return Err(MultipartError::BodyTooLarge);
            }
            return Ok(Some(full.freeze().slice(0..end)));
        }
        if buf.len() > limit {
            return Err(MultipartError::BodyTooLarge);
        }
        if !crate::h1::fill(channel, buf).map_err(|_| MultipartError::MalformedPart)? {
            return Ok(None);
        }
    }
}

/// Reads a part's body fully into memory, regardless of whether it spooled
/// to a temp file, for callers that just want the bytes (spec §14 fast path
/// note: zero-copy is preferred but not always available for spooled parts).
pub fn read_part_to_entity(body: PartBody) -> std::io::Result<Entity> {
    match body {
        PartBody::Text(s) => Ok(Entity::from_bytes(Bytes::from(s.into_bytes()))),
        PartBody::File(mut file) => {
            file.rewind()?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            Ok(Entity::from_bytes(Bytes::from(buf)))
        }
    }
}
