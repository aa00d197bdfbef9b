//! HTTP/1.1 wire codec (spec §4.1): reader, writer, chunked transfer coding,
//! and per-connection context.

pub mod chunked;
pub mod context;
pub mod decode;
pub mod encode;

pub use context::Context;

use bytes::BytesMut;

use crate::error::HttpError;
use crate::io::ByteChannel;

/// Configuration for the reader's size limits (spec §4.1, §12).
#[derive(Debug, Clone, Copy)]
pub struct H1Config {
    /// Maximum size, in bytes, of the start line + header block.
    pub max_header_size: usize,
    /// Maximum size, in bytes, of a single line within the header block
    /// (spec §4.1 edge cases: lines longer than `max_line` abort).
    pub max_line: usize,
    /// Maximum size, in bytes, of a request/response body.
    pub max_body: u64,
}

impl Default for H1Config {
    fn default() -> Self {
        Self {
            max_header_size: 8 * 1024,
            max_line: 8 * 1024,
            max_body: u64::MAX,
        }
    }
}

/// Fills `buf` with more bytes from `channel`, returning `false` on EOF.
/// Shared by the header-block scanner and the chunked decoder, both of
/// which pull-drive a blocking channel one read at a time.
pub(crate) fn fill(channel: &mut dyn ByteChannel, buf: &mut BytesMut) -> Result<bool, HttpError> {
    let mut tmp = [0u8; 8192];
    match channel.read(&mut tmp)? {
        Some(0) | None => Ok(false),
        Some(n) => {
            buf.extend_from_slice(&tmp[..n]);
            Ok(true)
        }
    }
}
