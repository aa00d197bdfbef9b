//! WebSocket framing, handshake and session state machine (spec §4.5-4.7,
//! RFC 6455), plus optional per-message deflate (RFC 7692).

pub mod deflate;
pub mod frame;
pub mod handshake;
pub mod session;

pub use frame::{Frame, OpCode};
pub use handshake::{accept_key, verify_request, verify_response};
pub use session::{Session, SessionHandler, State};

/// Status code used to indicate why an endpoint is closing the connection
/// (spec §4.7's close code registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    Normal,
    Away,
    Protocol,
    Unsupported,
    Reserved,
    NoStatusReceived,
    Abnormal,
    Invalid,
    Policy,
    Size,
    Extension,
    Error,
    Tls,
    Other(u16),
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::Reserved => 1004,
            CloseCode::NoStatusReceived => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::Invalid => 1007,
            CloseCode::Policy => 1008,
            CloseCode::Size => 1009,
            CloseCode::Extension => 1010,
            CloseCode::Error => 1011,
            CloseCode::Tls => 1015,
            CloseCode::Other(code) => code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> CloseCode {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::Away,
            1002 => CloseCode::Protocol,
            1003 => CloseCode::Unsupported,
            1004 => CloseCode::Reserved,
            1005 => CloseCode::NoStatusReceived,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::Invalid,
            1008 => CloseCode::Policy,
            1009 => CloseCode::Size,
            1010 => CloseCode::Extension,
            1011 => CloseCode::Error,
            1015 => CloseCode::Tls,
            other => CloseCode::Other(other),
        }
    }
}

/// How per-message deflate (RFC 7692) is negotiated for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeflateMode {
    #[default]
    Disabled,
    /// Negotiated, reusing a single inflater/deflater per direction unless
    /// context takeover is disabled for that direction.
    Enabled {
        client_no_context_takeover: bool,
        server_no_context_takeover: bool,
    },
}

/// Session tuning (spec §12).
#[derive(Debug, Clone, Copy)]
pub struct WsConfig {
    pub idle_timeout_ms: u64,
    pub payload_limit: usize,
    pub message_capacity: usize,
    pub deflate: DeflateMode,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 0,
            payload_limit: 64 * 1024,
            message_capacity: 16 * 1024 * 1024,
            deflate: DeflateMode::Disabled,
        }
    }
}
