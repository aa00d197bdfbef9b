//! HTTP/1.1 + WebSocket wire protocol engine.
//!
//! This crate is the wire-protocol core consumed by a full client/server
//! stack: HTTP/1.1 message parsing and serialization (including chunked
//! transfer coding and trailers), typed header accessors, a persistent
//! cookie jar, a multipart/form-data codec, and WebSocket framing plus a
//! per-session state machine with optional per-message deflate.
//!
//! Socket listeners, TLS, executor wiring, temp-file placement and process
//! glue are all external collaborators, reached only through the minimal
//! traits in [`io`].

pub mod cookie;
pub mod date;
pub mod encoding;
pub mod error;
pub mod grammar;
pub mod h1;
pub mod headers;
pub mod io;
pub mod message;
pub mod multipart;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{HandshakeError, HeaderError, HttpError, MultipartError, WsError};
pub use message::{Entity, Header, HeaderName, HttpRequest, HttpResponse, Uri, Version};
