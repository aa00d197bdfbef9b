//! Chunked transfer-coding state machine (RFC 7230 §4.1).
//!
//! The decode side is a byte-at-a-time state machine, same shape as an
//! async codec's, but driven by a blocking pull loop (`ChunkedDecoder::step`
//! refills its buffer from the channel itself instead of waiting to be fed).

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::error::HttpError;
use crate::io::ByteChannel;
use crate::message::Header;

#[derive(Clone, Debug, Eq, PartialEq)]
enum ChunkedState {
    Size,
    SizeLws,
    Extension,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    End,
}

macro_rules! byte {
    ($rdr:ident) => {{
        if $rdr.is_empty() {
            return Ok(None);
        }
        let b = $rdr[0];
        $rdr.advance(1);
        b
    }};
}

impl ChunkedState {
    fn step(&self, body: &mut BytesMut, size: &mut u64, buf: &mut Option<Bytes>) -> io::Result<Option<Self>> {
        match self {
            Self::Size => Self::read_size(body, size),
            Self::SizeLws => Self::read_size_lws(body),
            Self::Extension => Self::read_extension(body),
            Self::SizeLf => Self::read_size_lf(body, size),
            Self::Body => Self::read_body(body, size, buf),
            Self::BodyCr => Self::read_body_cr(body),
            Self::BodyLf => Self::read_body_lf(body),
            Self::End => Ok(Some(Self::End)),
        }
    }

    fn read_size(rdr: &mut BytesMut, size: &mut u64) -> io::Result<Option<Self>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) => val,
                    None => return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid chunk size: overflow")),
                }
            };
        }
        let radix = 16;
        match byte!(rdr) {
            b @ b'0'..=b'9' => {
                *size = or_overflow!(size.checked_mul(radix));
                *size = or_overflow!(size.checked_add((b - b'0') as u64));
            }
            b @ b'a'..=b'f' => {
                *size = or_overflow!(size.checked_mul(radix));
                *size = or_overflow!(size.checked_add((b + 10 - b'a') as u64));
            }
            b @ b'A'..=b'F' => {
                *size = or_overflow!(size.checked_mul(radix));
                *size = or_overflow!(size.checked_add((b + 10 - b'A') as u64));
            }
            b'\t' | b' ' => return Ok(Some(Self::SizeLws)),
            b';' => return Ok(Some(Self::Extension)),
            b'\r' => return Ok(Some(Self::SizeLf)),
            _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid chunk size line")),
        }
        Ok(Some(Self::Size))
    }

    fn read_size_lws(rdr: &mut BytesMut) -> io::Result<Option<Self>> {
        match byte!(rdr) {
            b'\t' | b' ' => Ok(Some(Self::SizeLws)),
            b';' => Ok(Some(Self::Extension)),
            b'\r' => Ok(Some(Self::SizeLf)),
            _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid chunk size lws")),
        }
    }

    fn read_extension(rdr: &mut BytesMut) -> io::Result<Option<Self>> {
        // chunk extensions are accepted and ignored on read (spec §6).
        match byte!(rdr) {
            b'\r' => Ok(Some(Self::SizeLf)),
            b'\n' => Err(io::Error::new(io::ErrorKind::InvalidData, "chunk extension contains bare newline")),
            b => {
                trace!(byte = b, "ignoring chunk extension byte");
                Ok(Some(Self::Extension))
            }
        }
    }

    fn read_size_lf(rdr: &mut BytesMut, size: &mut u64) -> io::Result<Option<Self>> {
        match byte!(rdr) {
            b'\n' if *size > 0 => Ok(Some(Self::Body)),
            // The last-chunk's own CRLF has just been consumed; everything
            // after it (trailer-part, final CRLF) is left untouched for
            // `read_trailer_headers` to parse as a plain header block.
            b'\n' if *size == 0 => Ok(Some(Self::End)),
            _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid chunk size LF")),
        }
    }

    fn read_body(rdr: &mut BytesMut, rem: &mut u64, buf: &mut Option<Bytes>) -> io::Result<Option<Self>> {
        if rdr.is_empty() {
            return Ok(None);
        }
        *buf = Some(bounded_split(rem, rdr));
        if *rem > 0 {
            Ok(Some(Self::Body))
        } else {
            Ok(Some(Self::BodyCr))
        }
    }

    fn read_body_cr(rdr: &mut BytesMut) -> io::Result<Option<Self>> {
        match byte!(rdr) {
            b'\r' => Ok(Some(Self::BodyLf)),
            _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid chunk body CR")),
        }
    }

    fn read_body_lf(rdr: &mut BytesMut) -> io::Result<Option<Self>> {
        match byte!(rdr) {
            b'\n' => Ok(Some(Self::Size)),
            _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid chunk body LF")),
        }
    }
}

fn bounded_split(rem: &mut u64, buf: &mut BytesMut) -> Bytes {
    let len = buf.len() as u64;
    if *rem >= len {
        *rem -= len;
        buf.split().freeze()
    } else {
        let rem_usize = std::mem::replace(rem, 0) as usize;
        buf.split_to(rem_usize).freeze()
    }
}

/// Drives [`ChunkedState`] to completion over a blocking [`ByteChannel`],
/// returning the fully reassembled body and any trailer headers (spec §4.1
/// step 5: trailers are parsed and promoted onto the message).
pub fn read_chunked_body(
    channel: &mut dyn ByteChannel,
    buf: &mut BytesMut,
    max_body: u64,
    max_header_size: usize,
) -> Result<(Bytes, Vec<Header>), HttpError> {
    let mut state = ChunkedState::Size;
    let mut size = 0u64;
    let mut body = Vec::new();
    let mut total = 0u64;

    loop {
        let mut out = None;
        let next = loop {
            match state.step(buf, &mut size, &mut out)? {
                Some(s) => break s,
                None => {
                    if !super::fill(channel, buf)? {
                        return Err(HttpError::Truncated);
                    }
                }
            }
        };
        state = next;

        if let Some(chunk) = out.take() {
            total += chunk.len() as u64;
            if total > max_body {
                return Err(HttpError::BodyTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        if state == ChunkedState::End {
            break;
        }
    }

    // The state machine stops right after the last-chunk's own `0\r\n`; the
    // trailer-part plus its terminating blank line (RFC 7230 §4.1.2) is
    // exactly a header block with no start line, so the header block parser
    // is reused to read it.
    let trailers = super::decode::read_trailer_headers(channel, buf, max_header_size)?;
    Ok((Bytes::from(body), trailers))
}

/// Encodes `data` as one chunk: `SIZE-HEX CRLF payload CRLF`.
pub fn encode_chunk(data: &[u8], out: &mut Vec<u8>) {
    if data.is_empty() {
        return;
    }
    out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

/// Encodes the terminating `0\r\n\r\n` (no trailers emitted by the writer;
/// spec §4.1's writer contract does not require trailer emission).
pub fn encode_last_chunk(out: &mut Vec<u8>) {
    out.extend_from_slice(b"0\r\n\r\n");
}
