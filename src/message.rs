//! HTTP message model (spec §3): `Header`, `HttpRequest`/`HttpResponse`,
//! `Entity`, `Uri`.
//!
//! Messages are value-like: every mutator consumes `self` and returns a new
//! instance (Design Notes: "Builder immutability"). Internally this is a
//! plain owned `Vec`/`String` copy-on-write rather than a persistent
//! structure — the spec requires only observable immutability.

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;

/// An RFC 7230 `token` header name, compared case-insensitively but stored
/// in the case it was constructed with (so the writer round-trips it).
#[derive(Debug, Clone)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for HeaderName {}

impl PartialEq<str> for HeaderName {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for HeaderName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl From<&str> for HeaderName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HeaderName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A single `(name, value)` header. `value` has no CR/LF; its grammar
/// depends on `name`.
#[derive(Debug, Clone)]
pub struct Header {
    pub name: HeaderName,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<HeaderName>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// HTTP version of a parsed or to-be-written message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

/// Known size or streaming-length classification of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySize {
    /// No body is present (and none should be written).
    Empty,
    /// Body is exactly `n` bytes (`Content-Length` applies).
    Known(u64),
    /// Body length is not known ahead of time (chunked or EOF-framed).
    Unknown,
}

enum EntityInner {
    Empty,
    Bytes(Bytes),
    Reader(Box<dyn Read + Send>),
}

/// A streaming message body.
///
/// An `Entity` exclusively owns its underlying byte source: the source is
/// released when the entity is dropped or fully drained, and reading it out
/// (`into_reader`) consumes the entity — re-reading requires constructing a
/// new `Entity` over a freshly reopened source.
pub struct Entity {
    known_size: Option<u64>,
    inner: EntityInner,
}

impl Entity {
    /// A body known ahead of time to be empty.
    pub fn empty() -> Self {
        Self {
            known_size: Some(0),
            inner: EntityInner::Empty,
        }
    }

    /// An in-memory body with a known length.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            known_size: Some(bytes.len() as u64),
            inner: EntityInner::Bytes(bytes),
        }
    }

    /// A streaming body read from `reader`. `known_size` should be `Some`
    /// only when the caller already knows the exact byte count (e.g. a
    /// file of known length read through a generic `Read` handle).
    pub fn from_reader(reader: impl Read + Send + 'static, known_size: Option<u64>) -> Self {
        Self {
            known_size,
            inner: EntityInner::Reader(Box::new(reader)),
        }
    }

    pub fn known_size(&self) -> Option<u64> {
        self.known_size
    }

    pub fn is_known_empty(&self) -> bool {
        matches!(self.inner, EntityInner::Empty) || self.known_size == Some(0)
    }

    pub fn body_size(&self) -> BodySize {
        match self.known_size {
            _ if self.is_known_empty() => BodySize::Empty,
            Some(n) => BodySize::Known(n),
            None => BodySize::Unknown,
        }
    }

    /// Consumes the entity, returning a single-use `Read` handle over its
    /// bytes.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self.inner {
            EntityInner::Empty => Box::new(std::io::empty()),
            EntityInner::Bytes(b) => Box::new(std::io::Cursor::new(b)),
            EntityInner::Reader(r) => r,
        }
    }

    /// Reads the entire body into memory. Convenience used by callers (and
    /// this crate's own multipart writer) that already hold the body in
    /// full; for a large or unknown-length body prefer [`Entity::into_reader`].
    pub fn into_bytes(self) -> std::io::Result<Bytes> {
        match self.inner {
            EntityInner::Empty => Ok(Bytes::new()),
            EntityInner::Bytes(b) => Ok(b),
            EntityInner::Reader(mut r) => {
                let mut buf = Vec::with_capacity(self.known_size.unwrap_or(0) as usize);
                r.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("known_size", &self.known_size)
            .finish_non_exhaustive()
    }
}

/// String-keyed, non-serialized attribute bag carried alongside a message
/// (e.g. peer address, TLS info) — never written to the wire.
pub type Attributes = HashMap<String, String>;

/// Accessor trait shared by [`HttpRequest`] and [`HttpResponse`] so header
/// accessors can be implemented once as free functions parameterized over
/// "has headers", instead of duplicating them per message kind (Design
/// Notes: "avoiding inheritance hierarchies").
pub trait HasHeaders {
    fn headers(&self) -> &[Header];
    fn headers_mut(&mut self) -> &mut Vec<Header>;
}

/// An HTTP request message.
#[derive(Debug)]
pub struct HttpRequest {
    pub version: Version,
    method: String,
    target: String,
    headers: Vec<Header>,
    body: Entity,
    attributes: Attributes,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, target: impl Into<String>, version: Version) -> Self {
        Self {
            version,
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
            body: Entity::empty(),
            attributes: Attributes::new(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn body(&self) -> &Entity {
        &self.body
    }

    pub fn into_body(self) -> Entity {
        self.body
    }

    pub fn with_body(mut self, body: Entity) -> Self {
        self.body = body;
        self
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// True if the request method forbids a response/request body by
    /// HTTP semantics (used by the wire codec and writer, spec §4.1).
    pub fn is_connect(&self) -> bool {
        self.method.eq_ignore_ascii_case("CONNECT")
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }
}

impl HasHeaders for HttpRequest {
    fn headers(&self) -> &[Header] {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Vec<Header> {
        &mut self.headers
    }
}

/// An HTTP response message.
#[derive(Debug)]
pub struct HttpResponse {
    pub version: Version,
    status: u16,
    reason: String,
    headers: Vec<Header>,
    body: Entity,
    attributes: Attributes,
}

impl HttpResponse {
    pub fn new(status: u16, reason: impl Into<String>, version: Version) -> Self {
        Self {
            version,
            status,
            reason: reason.into(),
            headers: Vec::new(),
            body: Entity::empty(),
            attributes: Attributes::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn body(&self) -> &Entity {
        &self.body
    }

    pub fn into_body(self) -> Entity {
        self.body
    }

    pub fn with_body(mut self, body: Entity) -> Self {
        self.body = body;
        self
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// True when the status code implies no body regardless of framing
    /// headers (spec §4.1 step 3): 1xx, 204, 304.
    pub fn implies_no_body(&self) -> bool {
        matches!(self.status, 100..=199 | 204 | 304)
    }
}

impl HasHeaders for HttpResponse {
    fn headers(&self) -> &[Header] {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Vec<Header> {
        &mut self.headers
    }
}

/// A parsed URI: scheme, authority (`host[:port]`), path, raw query, and
/// fragment. Per spec Non-goals, decomposition goes no further than RFC
/// 3986 authority/path/query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Uri {
    /// Parses a request-target or absolute URI (origin-form, absolute-form,
    /// authority-form for CONNECT, or `*`).
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            return Self {
                path: "*".to_string(),
                ..Default::default()
            };
        }

        let (scheme, rest) = match s.find("://") {
            Some(idx) if s[..idx].bytes().all(crate::grammar::is_tchar) => {
                (Some(s[..idx].to_ascii_lowercase()), &s[idx + 3..])
            }
            _ => (None, s),
        };

        let (authority, rest) = if scheme.is_some() {
            let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            (Some(rest[..end].to_string()), &rest[end..])
        } else if !rest.starts_with('/') && rest.contains(':') && !rest.contains('/') {
            // authority-form, used only by CONNECT.
            (Some(rest.to_string()), "")
        } else {
            (None, rest)
        };

        let (path_and_query, fragment) = match rest.find('#') {
            Some(idx) => (&rest[..idx], Some(rest[idx + 1..].to_string())),
            None => (rest, None),
        };

        let (path, query) = match path_and_query.find('?') {
            Some(idx) => (
                path_and_query[..idx].to_string(),
                Some(path_and_query[idx + 1..].to_string()),
            ),
            None => (path_and_query.to_string(), None),
        };

        let path = if path.is_empty() && authority.is_some() {
            "/".to_string()
        } else {
            path
        };

        Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        }
    }

    /// Host component of `authority`, without the port.
    pub fn host(&self) -> Option<&str> {
        self.authority.as_deref().map(|a| match a.rsplit_once(':') {
            // IPv6 literals keep their brackets and colons; only split on a
            // trailing `:port` that follows the closing `]` or a bare host.
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !host.is_empty() => host,
            _ => a,
        })
    }

    /// Ordered key → values mapping of the query string (insertion order
    /// preserved, per spec §3).
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let Some(query) = &self.query else {
            return out;
        };
        for pair in query.split('&').filter(|s| !s.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            out.push((decode_percent(k), decode_percent(v)));
        }
        out
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

fn decode_percent(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
