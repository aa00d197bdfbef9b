//! On-demand `Content-Encoding`/non-final `Transfer-Encoding` decoder
//! adapter (spec §4.1 step 4: "decoding other Transfer-Encoding codings
//! (gzip, deflate) is applied on demand by a separate decoder adapter,
//! never eagerly").
//!
//! The wire codec only ever strips the `chunked` framing coding itself; any
//! remaining codings named in a `Transfer-Encoding`/`Content-Encoding`
//! header are left for the caller to apply via [`decode_coding`] when (and
//! if) it actually reads the body.

use std::io::{self, Read};

use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder};

/// A non-chunked content/transfer coding token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    Gzip,
    Deflate,
    /// `identity`, or any coding this crate does not itself decode; the
    /// caller is responsible for recognizing and applying it.
    Other,
}

impl Coding {
    pub fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") {
            Self::Gzip
        } else if token.eq_ignore_ascii_case("deflate") {
            Self::Deflate
        } else {
            Self::Other
        }
    }
}

/// Decodes `data` assuming it was encoded with `coding`, left to right as
/// the codings were applied (the wire encodes innermost-first, so callers
/// should decode in the reverse of the header's list order).
pub fn decode_coding(coding: Coding, data: &[u8]) -> io::Result<Bytes> {
    let mut out = Vec::new();
    match coding {
        Coding::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out)?;
        }
        Coding::Deflate => {
            DeflateDecoder::new(data).read_to_end(&mut out)?;
        }
        Coding::Other => return Ok(Bytes::copy_from_slice(data)),
    }
    Ok(Bytes::from(out))
}
