//! Error kinds surfaced by the core (spec §7).

use core::fmt;
use std::io;

/// Errors from reading or writing an HTTP/1.1 message.
#[derive(Debug)]
pub enum HttpError {
    /// The start line was missing, empty, or not parseable ASCII.
    MalformedStartLine,
    /// A header line did not match `name ":" OWS value OWS`.
    MalformedHeader,
    /// The message's framing was self-contradictory (e.g. non-final
    /// `chunked`, or disagreeing `Content-Length` values).
    MalformedMessage,
    /// The header block exceeded the configured size limit.
    HeaderLimitExceeded,
    /// A body (or multipart body) exceeded its configured size limit.
    BodyTooLarge,
    /// The underlying channel failed.
    Io(io::Error),
    /// The stream ended before a complete message was available.
    Truncated,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedStartLine => f.write_str("malformed start line"),
            Self::MalformedHeader => f.write_str("malformed header"),
            Self::MalformedMessage => f.write_str("malformed message framing"),
            Self::HeaderLimitExceeded => f.write_str("header block exceeded configured limit"),
            Self::BodyTooLarge => f.write_str("body exceeded configured limit"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Truncated => f.write_str("stream ended before a complete message was read"),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(e)
        }
    }
}

impl From<httparse::Error> for HttpError {
    fn from(e: httparse::Error) -> Self {
        match e {
            httparse::Error::TooManyHeaders => Self::HeaderLimitExceeded,
            _ => Self::MalformedHeader,
        }
    }
}

/// Errors raised by a typed header accessor.
#[derive(Debug)]
pub enum HeaderError {
    /// `get` was called on a header that is not present.
    HeaderNotFound,
    /// A present header's value did not match its structured grammar.
    MalformedHeaderValue,
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderNotFound => f.write_str("header not found"),
            Self::MalformedHeaderValue => f.write_str("header value did not match its grammar"),
        }
    }
}

impl std::error::Error for HeaderError {}

/// Errors raised while parsing or writing a `multipart/form-data` body.
#[derive(Debug)]
pub enum MultipartError {
    /// A part's header block did not parse, or was missing a required
    /// `Content-Disposition: form-data; name=...`.
    MalformedPart,
    /// The multipart body exceeded `max_length`.
    BodyTooLarge,
    /// The underlying channel or temp-file store failed.
    Io(io::Error),
    /// The containing message had no usable boundary parameter.
    MissingBoundary,
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPart => f.write_str("malformed multipart part"),
            Self::BodyTooLarge => f.write_str("multipart body exceeded configured limit"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::MissingBoundary => f.write_str("no multipart boundary available"),
        }
    }
}

impl std::error::Error for MultipartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MultipartError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<HttpError> for MultipartError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::BodyTooLarge | HttpError::HeaderLimitExceeded => Self::BodyTooLarge,
            HttpError::Io(e) => Self::Io(e),
            _ => Self::MalformedPart,
        }
    }
}

/// WebSocket handshake validation failures (spec §4.6). All are reported to
/// the caller as `400 Bad Request` with no upgrade performed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HandshakeError {
    GetMethodRequired,
    NoWebsocketUpgrade,
    NoConnectionUpgrade,
    NoVersionHeader,
    UnsupportedVersion,
    BadWebsocketKey,
    /// The peer's handshake response (client side) failed validation.
    InvalidResponse,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::GetMethodRequired => "websocket handshake requires GET",
            Self::NoWebsocketUpgrade => "Upgrade header missing or not websocket",
            Self::NoConnectionUpgrade => "Connection header missing Upgrade token",
            Self::NoVersionHeader => "Sec-WebSocket-Version header missing",
            Self::UnsupportedVersion => "unsupported Sec-WebSocket-Version",
            Self::BadWebsocketKey => "Sec-WebSocket-Key missing or malformed",
            Self::InvalidResponse => "handshake response failed validation",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for HandshakeError {}

/// Protocol violations during an open WebSocket session; each closes the
/// session with the named [`crate::ws::CloseCode`].
#[derive(Debug)]
pub enum WsError {
    /// A masked frame arrived from a server, or an unmasked one from a
    /// client, or a zero masking key was used.
    ProtocolError,
    /// An unknown opcode, bad continuation sequencing, or malformed
    /// control frame.
    InvalidFrame,
    /// Reassembled (and/or inflated) message exceeded `message_capacity`.
    MessageTooBig,
    /// A text message's payload was not valid UTF-8.
    InvalidFramePayload,
    /// The underlying channel failed.
    Io(io::Error),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolError => f.write_str("websocket protocol error"),
            Self::InvalidFrame => f.write_str("invalid websocket frame"),
            Self::MessageTooBig => f.write_str("websocket message exceeded capacity"),
            Self::InvalidFramePayload => f.write_str("invalid websocket frame payload"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for WsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WsError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl WsError {
    /// Maps a session-level error to the close code it mandates (spec §4.7).
    pub fn close_code(&self) -> crate::ws::CloseCode {
        use crate::ws::CloseCode;
        match self {
            Self::ProtocolError => CloseCode::Protocol,
            Self::InvalidFrame => CloseCode::Protocol,
            Self::MessageTooBig => CloseCode::Size,
            Self::InvalidFramePayload => CloseCode::Invalid,
            Self::Io(_) => CloseCode::Abnormal,
        }
    }
}
