//! Per-message deflate (RFC 7692) for WebSocket messages.
//!
//! Uses raw DEFLATE (no zlib/gzip framing), the same flavor `flate2` exposes
//! to the wire codec's `Content-Encoding: deflate` support (see
//! [`crate::encoding`]). Unlike that one-shot adapter, a negotiated session
//! keeps a single [`flate2::Compress`]/[`flate2::Decompress`] per direction
//! so the sliding window carries over between messages, unless the peer
//! negotiated `no_context_takeover` for that direction.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::WsError;

/// RFC 7692 §7.2.1: a compressed message's trailing four bytes are always
/// this sequence and must be stripped before sending / appended before
/// inflating.
const TAIL: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Per-direction deflate state for one WebSocket session.
pub struct PerMessageDeflate {
    compress: Compress,
    decompress: Decompress,
    reset_compress_per_message: bool,
    reset_decompress_per_message: bool,
}

impl PerMessageDeflate {
    pub fn new(client_no_context_takeover: bool, server_no_context_takeover: bool, is_server: bool) -> Self {
        Self {
            compress: Compress::new(Compression::fast(), false),
            decompress: Decompress::new(false),
            reset_compress_per_message: if is_server {
                server_no_context_takeover
            } else {
                client_no_context_takeover
            },
            reset_decompress_per_message: if is_server {
                client_no_context_takeover
            } else {
                server_no_context_takeover
            },
        }
    }

    /// Compresses `data`, returning the payload with the RFC 7692 trailer
    /// already stripped (ready to go on the wire with `rsv1` set).
    pub fn deflate(&mut self, data: &[u8]) -> Result<Vec<u8>, WsError> {
        if self.reset_compress_per_message {
            self.compress.reset();
        }

        let mut out = Vec::with_capacity(data.len() + 16);
        let mut consumed = 0usize;
        loop {
            let before_total_in = self.compress.total_in();
            let status = self
                .compress
                .compress_vec(&data[consumed..], &mut out, FlushCompress::Sync)
                .map_err(|_| WsError::InvalidFrame)?;
            consumed += (self.compress.total_in() - before_total_in) as usize;

            match status {
                Status::StreamEnd => break,
                Status::Ok if consumed >= data.len() => break,
                Status::Ok | Status::BufError => out.reserve(out.capacity().max(256)),
            }
        }

        if out.ends_with(&TAIL) {
            out.truncate(out.len() - TAIL.len());
        }
        Ok(out)
    }

    /// Inflates `data` after appending the RFC 7692 trailer back on.
    pub fn inflate(&mut self, data: &[u8]) -> Result<Vec<u8>, WsError> {
        if self.reset_decompress_per_message {
            self.decompress.reset(false);
        }

        let mut input = Vec::with_capacity(data.len() + TAIL.len());
        input.extend_from_slice(data);
        input.extend_from_slice(&TAIL);

        let mut out = Vec::with_capacity(data.len() * 3 + 32);
        let mut consumed = 0usize;
        loop {
            let before_total_in = self.decompress.total_in();
            let status = self
                .decompress
                .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Sync)
                .map_err(|_| WsError::InvalidFrame)?;
            consumed += (self.decompress.total_in() - before_total_in) as usize;

            match status {
                Status::StreamEnd => break,
                Status::Ok if consumed >= input.len() => return Err(WsError::InvalidFrame),
                Status::Ok => {
                    out.reserve(out.capacity().max(256));
                }
                Status::BufError => {
                    out.reserve(out.capacity().max(256));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_context_takeover() {
        let mut client = PerMessageDeflate::new(false, false, false);
        let mut server = PerMessageDeflate::new(false, false, true);

        let msg1 = b"hello websocket world";
        let compressed = client.deflate(msg1).unwrap();
        let decompressed = server.inflate(&compressed).unwrap();
        assert_eq!(&decompressed[..], msg1);

        let msg2 = b"second message reusing the window";
        let compressed = client.deflate(msg2).unwrap();
        let decompressed = server.inflate(&compressed).unwrap();
        assert_eq!(&decompressed[..], msg2);
    }

    #[test]
    fn round_trips_without_context_takeover() {
        let mut client = PerMessageDeflate::new(true, true, false);
        let mut server = PerMessageDeflate::new(true, true, true);

        let msg = b"no context takeover message";
        let compressed = client.deflate(msg).unwrap();
        let decompressed = server.inflate(&compressed).unwrap();
        assert_eq!(&decompressed[..], msg);
    }
}
