//! Frame envelope read/write (spec §4.5, RFC 6455 §5.2): FIN/RSV/opcode,
//! mask bit and key, and the three-tier length encoding.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::WsError;
use crate::io::ByteChannel;

/// WebSocket frame opcodes (RFC 6455 §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    fn from_nibble(b: u8) -> Option<Self> {
        match b {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    fn as_nibble(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// A single decoded frame: envelope bits plus its (already unmasked)
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub rsv1: bool,
    pub opcode: OpCode,
    pub payload: Bytes,
    /// Whether the wire frame this was decoded from carried a mask bit.
    /// Ignored when writing; `write_frame`'s `mask` argument decides that.
    pub masked: bool,
}

impl Frame {
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv1: false,
            opcode,
            payload: payload.into(),
            masked: false,
        }
    }
}

/// Reads one frame from `channel`, honoring `max_payload` (spec: a control
/// frame longer than 125 bytes, or any frame whose declared length would
/// overflow the session's configured limit, is a protocol error).
pub fn read_frame(channel: &mut dyn ByteChannel, buf: &mut BytesMut, max_payload: u64) -> Result<Frame, WsError> {
    let header = read_exact(channel, buf, 2)?;
    let byte0 = header[0];
    let byte1 = header[1];

    let fin = byte0 & 0x80 != 0;
    let rsv1 = byte0 & 0x40 != 0;
    let rsv2_3 = byte0 & 0x30;
    if rsv2_3 != 0 {
        return Err(WsError::ProtocolError);
    }
    let opcode = OpCode::from_nibble(byte0 & 0x0F).ok_or(WsError::InvalidFrame)?;
    if opcode.is_control() && !fin {
        return Err(WsError::ProtocolError);
    }
    if rsv1 && opcode.is_control() {
        return Err(WsError::ProtocolError);
    }

    let masked = byte1 & 0x80 != 0;
    let len7 = byte1 & 0x7F;

    let payload_len: u64 = match len7 {
        126 => {
            let bytes = read_exact(channel, buf, 2)?;
            u16::from_be_bytes([bytes[0], bytes[1]]) as u64
        }
        127 => {
            let bytes = read_exact(channel, buf, 8)?;
            let n = u64::from_be_bytes(bytes[..8].try_into().unwrap());
            if n & 0x8000_0000_0000_0000 != 0 {
                return Err(WsError::InvalidFrame);
            }
            n
        }
        n => n as u64,
    };

    if opcode.is_control() && payload_len > 125 {
        return Err(WsError::ProtocolError);
    }
    if payload_len > max_payload {
        return Err(WsError::MessageTooBig);
    }

    let key = if masked {
        let key_bytes = read_exact(channel, buf, 4)?;
        let key = [key_bytes[0], key_bytes[1], key_bytes[2], key_bytes[3]];
        if key == [0, 0, 0, 0] {
            return Err(WsError::ProtocolError);
        }
        Some(key)
    } else {
        None
    };

    let mut payload = read_exact(channel, buf, payload_len as usize)?;
    if let Some(key) = key {
        apply_mask(&mut payload, key);
    }

    Ok(Frame {
        fin,
        rsv1,
        opcode,
        payload: Bytes::from(payload),
        masked,
    })
}

/// Writes one frame to `out`. `mask` is `Some(key)` for client-originated
/// frames (which MUST be masked with a nonzero key) and `None` for
/// server-originated frames (which MUST NOT be masked).
pub fn write_frame(out: &mut Vec<u8>, frame: &Frame, mask: Option<[u8; 4]>) {
    let mut byte0 = frame.opcode.as_nibble();
    if frame.fin {
        byte0 |= 0x80;
    }
    if frame.rsv1 {
        byte0 |= 0x40;
    }
    out.push(byte0);

    let len = frame.payload.len();
    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    if len <= 125 {
        out.push(mask_bit | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(mask_bit | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            let start = out.len();
            out.extend_from_slice(&frame.payload);
            apply_mask(&mut out[start..], key);
        }
        None => out.extend_from_slice(&frame.payload),
    }
}

/// XORs `data[i]` with `key[i % 4]` in place (RFC 6455 §5.3).
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= key[i % 4];
    }
}

fn read_exact(channel: &mut dyn ByteChannel, buf: &mut BytesMut, n: usize) -> Result<Vec<u8>, WsError> {
    while buf.len() < n {
        if !crate::h1::fill(channel, buf).map_err(|e| WsError::Io(io_of(e)))? {
            return Err(WsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "websocket channel closed mid-frame",
            )));
        }
    }
    Ok(buf.copy_to_bytes(n).to_vec())
}

fn io_of(e: crate::error::HttpError) -> std::io::Error {
    match e {
        crate::error::HttpError::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VecChannel;

    #[test]
    fn masked_text_frame_round_trips() {
        let frame = Frame::new(true, OpCode::Text, Bytes::from_static(b"hi"));
        let mut out = Vec::new();
        write_frame(&mut out, &frame, Some([1, 2, 3, 4]));

        let mut channel = VecChannel::new(&out);
        let mut buf = BytesMut::new();
        let decoded = read_frame(&mut channel, &mut buf, 1 << 20).unwrap();
        assert_eq!(decoded.payload, Bytes::from_static(b"hi"));
        assert_eq!(decoded.opcode, OpCode::Text);
        assert!(decoded.fin);
    }

    #[test]
    fn unmasked_server_frame_round_trips() {
        let frame = Frame::new(true, OpCode::Binary, Bytes::from_static(&[1, 2, 3]));
        let mut out = Vec::new();
        write_frame(&mut out, &frame, None);

        let mut channel = VecChannel::new(&out);
        let mut buf = BytesMut::new();
        let decoded = read_frame(&mut channel, &mut buf, 1 << 20).unwrap();
        assert_eq!(decoded.payload, Bytes::from_static(&[1, 2, 3]));
    }

    #[test]
    fn zero_mask_key_is_rejected() {
        let wire = vec![0x81u8, 0x82, 0, 0, 0, 0, b'h', b'i'];
        let mut channel = VecChannel::new(&wire);
        let mut buf = BytesMut::new();
        assert!(matches!(read_frame(&mut channel, &mut buf, 1 << 20).unwrap_err(), WsError::ProtocolError));
    }

    #[test]
    fn control_frame_without_fin_is_rejected() {
        let wire = vec![0x09u8, 0x00];
        let mut channel = VecChannel::new(&wire);
        let mut buf = BytesMut::new();
        assert!(matches!(read_frame(&mut channel, &mut buf, 1 << 20).unwrap_err(), WsError::ProtocolError));
    }

    #[test]
    fn lengths_126_and_127_encode_correctly() {
        let payload = vec![7u8; 126];
        let frame = Frame::new(true, OpCode::Binary, Bytes::from(payload.clone()));
        let mut out = Vec::new();
        write_frame(&mut out, &frame, None);
        assert_eq!(out[1], 126);

        let mut channel = VecChannel::new(&out);
        let mut buf = BytesMut::new();
        let decoded = read_frame(&mut channel, &mut buf, 1 << 20).unwrap();
        assert_eq!(decoded.payload.len(), 126);
    }
}
