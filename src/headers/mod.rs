//! Typed header accessors (spec §4.2): free functions parameterized over
//! [`HasHeaders`] so `HttpRequest` and `HttpResponse` share one
//! implementation instead of duplicating every accessor per message kind.

pub mod auth;
pub mod cache;
pub mod disposition;
pub mod etag;
pub mod media_type;
pub mod range;
pub mod ws_ext;

use crate::date::{format_http_date, parse_http_date};
use crate::error::HeaderError;
use crate::grammar::{format_quality_list, parse_quality_list, QualityItem};
use crate::message::{HasHeaders, Header, HeaderName};
use std::time::SystemTime;

use auth::{Challenge, Credentials};
use cache::CacheDirective;
use disposition::ContentDisposition;
use etag::{EntityTag, MatchList};
use media_type::MediaType;
use range::{ByteRanges, ContentRange};
use ws_ext::WsExtension;

/// True if a header with this name is present.
pub fn has(msg: &impl HasHeaders, name: &str) -> bool {
    msg.headers().iter().any(|h| h.name == *name)
}

/// The first header value with this name, if any.
pub fn get_option<'a>(msg: &'a impl HasHeaders, name: &str) -> Option<&'a str> {
    msg.headers().iter().find(|h| h.name == *name).map(|h| h.value.as_str())
}

/// The first header value with this name, or [`HeaderError::HeaderNotFound`].
pub fn get<'a>(msg: &'a impl HasHeaders, name: &str) -> Result<&'a str, HeaderError> {
    get_option(msg, name).ok_or(HeaderError::HeaderNotFound)
}

/// All header values with this name, in wire order.
pub fn get_all<'a>(msg: &'a impl HasHeaders, name: &str) -> Vec<&'a str> {
    msg.headers()
        .iter()
        .filter(|h| h.name == *name)
        .map(|h| h.value.as_str())
        .collect()
}

/// Removes any existing headers with this name and inserts a single new one.
///
/// Consumes and returns `msg`, matching the message model's "every mutator
/// returns a new instance" contract (see `message.rs`).
pub fn set<H: HasHeaders>(msg: H, name: &str, value: impl Into<String>) -> H {
    let mut msg = remove(msg, name);
    msg.headers_mut().push(Header::new(HeaderName::new(name), value));
    msg
}

/// Appends a header with this name without removing existing ones (used for
/// multi-valued headers such as `Set-Cookie`).
pub fn append<H: HasHeaders>(mut msg: H, name: &str, value: impl Into<String>) -> H {
    msg.headers_mut().push(Header::new(HeaderName::new(name), value));
    msg
}

/// Removes all headers with this name.
pub fn remove<H: HasHeaders>(mut msg: H, name: &str) -> H {
    msg.headers_mut().retain(|h| h.name != *name);
    msg
}

/// Generates a simple string-passthrough accessor pair (`get_x`/`set_x`) for
/// a header whose value has no further grammar beyond a raw string.
macro_rules! plain_header {
    ($get:ident, $set:ident, $wire:literal) => {
        pub fn $get<'a>(msg: &'a impl HasHeaders) -> Option<&'a str> {
            get_option(msg, $wire)
        }

        pub fn $set<H: HasHeaders>(msg: H, value: impl Into<String>) -> H {
            set(msg, $wire, value)
        }
    };
}

plain_header!(host, set_host, "Host");
plain_header!(location, set_location, "Location");
plain_header!(user_agent, set_user_agent, "User-Agent");
plain_header!(referer, set_referer, "Referer");
plain_header!(origin, set_origin, "Origin");
plain_header!(server, set_server, "Server");
plain_header!(via, set_via, "Via");
plain_header!(warning, set_warning, "Warning");
plain_header!(allow, set_allow, "Allow");
plain_header!(vary, set_vary, "Vary");
plain_header!(expect, set_expect, "Expect");
plain_header!(retry_after, set_retry_after, "Retry-After");
plain_header!(content_language, set_content_language, "Content-Language");
plain_header!(upgrade, set_upgrade, "Upgrade");
plain_header!(connection, set_connection, "Connection");
plain_header!(sec_websocket_protocol, set_sec_websocket_protocol, "Sec-WebSocket-Protocol");
plain_header!(sec_websocket_version, set_sec_websocket_version, "Sec-WebSocket-Version");
plain_header!(sec_websocket_key, set_sec_websocket_key, "Sec-WebSocket-Key");
plain_header!(sec_websocket_accept, set_sec_websocket_accept, "Sec-WebSocket-Accept");
plain_header!(x_forwarded_for, set_x_forwarded_for, "X-Forwarded-For");
plain_header!(accept_ranges, set_accept_ranges, "Accept-Ranges");
plain_header!(content_location, set_content_location, "Content-Location");
plain_header!(content_encoding, set_content_encoding, "Content-Encoding");
plain_header!(transfer_encoding, set_transfer_encoding, "Transfer-Encoding");
plain_header!(if_range, set_if_range, "If-Range");
plain_header!(trailer, set_trailer, "Trailer");
plain_header!(pragma, set_pragma, "Pragma");
plain_header!(x_request_id, set_x_request_id, "X-Request-Id");

macro_rules! date_header {
    ($get:ident, $set:ident, $wire:literal) => {
        pub fn $get(msg: &impl HasHeaders) -> Option<SystemTime> {
            get_option(msg, $wire).and_then(|v| parse_http_date(v).ok())
        }

        pub fn $set<H: HasHeaders>(msg: H, time: SystemTime) -> H {
            set(msg, $wire, format_http_date(time))
        }
    };
}

date_header!(date, set_date, "Date");
date_header!(last_modified, set_last_modified, "Last-Modified");
date_header!(expires, set_expires, "Expires");
date_header!(if_modified_since, set_if_modified_since, "If-Modified-Since");
date_header!(if_unmodified_since, set_if_unmodified_since, "If-Unmodified-Since");

/// `Content-Type`, parsed into its structured [`MediaType`].
pub fn content_type(msg: &impl HasHeaders) -> Option<Result<MediaType, HeaderError>> {
    get_option(msg, "Content-Type").map(MediaType::parse)
}

pub fn set_content_type<H: HasHeaders>(msg: H, value: &MediaType) -> H {
    set(msg, "Content-Type", value.format())
}

/// `Content-Disposition`, parsed into its structured form.
pub fn content_disposition(msg: &impl HasHeaders) -> Option<Result<ContentDisposition, HeaderError>> {
    get_option(msg, "Content-Disposition").map(ContentDisposition::parse)
}

pub fn set_content_disposition<H: HasHeaders>(msg: H, value: &ContentDisposition) -> H {
    set(msg, "Content-Disposition", value.format())
}

/// `ETag`.
pub fn etag(msg: &impl HasHeaders) -> Option<Result<EntityTag, HeaderError>> {
    get_option(msg, "ETag").map(EntityTag::parse)
}

pub fn set_etag<H: HasHeaders>(msg: H, value: &EntityTag) -> H {
    set(msg, "ETag", value.format())
}

/// `If-Match`.
pub fn if_match(msg: &impl HasHeaders) -> Option<Result<MatchList, HeaderError>> {
    get_option(msg, "If-Match").map(MatchList::parse)
}

pub fn set_if_match<H: HasHeaders>(msg: H, value: &MatchList) -> H {
    set(msg, "If-Match", value.format())
}

/// `If-None-Match`.
pub fn if_none_match(msg: &impl HasHeaders) -> Option<Result<MatchList, HeaderError>> {
    get_option(msg, "If-None-Match").map(MatchList::parse)
}

pub fn set_if_none_match<H: HasHeaders>(msg: H, value: &MatchList) -> H {
    set(msg, "If-None-Match", value.format())
}

/// `Range`.
pub fn range(msg: &impl HasHeaders) -> Option<Result<ByteRanges, HeaderError>> {
    get_option(msg, "Range").map(ByteRanges::parse)
}

pub fn set_range<H: HasHeaders>(msg: H, value: &ByteRanges) -> H {
    set(msg, "Range", value.format())
}

/// `Content-Range`.
pub fn content_range(msg: &impl HasHeaders) -> Option<Result<ContentRange, HeaderError>> {
    get_option(msg, "Content-Range").map(ContentRange::parse)
}

pub fn set_content_range<H: HasHeaders>(msg: H, value: &ContentRange) -> H {
    set(msg, "Content-Range", value.format())
}

/// `Cache-Control`.
pub fn cache_control(msg: &impl HasHeaders) -> Vec<CacheDirective> {
    get_option(msg, "Cache-Control")
        .map(cache::parse_cache_control)
        .unwrap_or_default()
}

pub fn set_cache_control<H: HasHeaders>(msg: H, directives: &[CacheDirective]) -> H {
    set(msg, "Cache-Control", cache::format_cache_control(directives))
}

macro_rules! credentials_header {
    ($get:ident, $set:ident, $wire:literal) => {
        pub fn $get(msg: &impl HasHeaders) -> Option<Result<Credentials, HeaderError>> {
            get_option(msg, $wire).map(Credentials::parse)
        }

        pub fn $set<H: HasHeaders>(msg: H, value: &Credentials) -> H {
            set(msg, $wire, value.format())
        }
    };
}

credentials_header!(authorization, set_authorization, "Authorization");
credentials_header!(proxy_authorization, set_proxy_authorization, "Proxy-Authorization");

macro_rules! challenge_header {
    ($get:ident, $set:ident, $wire:literal) => {
        pub fn $get(msg: &impl HasHeaders) -> Option<Result<Challenge, HeaderError>> {
            get_option(msg, $wire).map(Challenge::parse)
        }

        pub fn $set<H: HasHeaders>(msg: H, value: &Challenge) -> H {
            set(msg, $wire, value.format())
        }
    };
}

challenge_header!(www_authenticate, set_www_authenticate, "WWW-Authenticate");
challenge_header!(proxy_authenticate, set_proxy_authenticate, "Proxy-Authenticate");

macro_rules! quality_list_header {
    ($get:ident, $set:ident, $wire:literal) => {
        pub fn $get(msg: &impl HasHeaders) -> Vec<QualityItem> {
            get_option(msg, $wire).map(parse_quality_list).unwrap_or_default()
        }

        pub fn $set<H: HasHeaders>(msg: H, items: &[QualityItem]) -> H {
            set(msg, $wire, format_quality_list(items))
        }
    };
}

quality_list_header!(accept, set_accept, "Accept");
quality_list_header!(accept_charset, set_accept_charset, "Accept-Charset");
quality_list_header!(accept_encoding, set_accept_encoding, "Accept-Encoding");
quality_list_header!(accept_language, set_accept_language, "Accept-Language");

/// `Sec-WebSocket-Extensions`.
pub fn sec_websocket_extensions(msg: &impl HasHeaders) -> Vec<WsExtension> {
    get_option(msg, "Sec-WebSocket-Extensions")
        .map(ws_ext::parse_extensions)
        .unwrap_or_default()
}

pub fn set_sec_websocket_extensions<H: HasHeaders>(msg: H, extensions: &[WsExtension]) -> H {
    set(msg, "Sec-WebSocket-Extensions", ws_ext::format_extensions(extensions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HttpRequest, Version};

    #[test]
    fn set_and_get_plain_header() {
        let req = HttpRequest::new("GET", "/", Version::Http11);
        let req = set_host(req, "example.com");
        assert_eq!(host(&req), Some("example.com"));
    }

    #[test]
    fn set_replaces_prior_value() {
        let req = HttpRequest::new("GET", "/", Version::Http11);
        let req = set_host(req, "a.example");
        let req = set_host(req, "b.example");
        assert_eq!(get_all(&req, "Host"), vec!["b.example"]);
    }

    #[test]
    fn append_keeps_multiple_values() {
        let req = HttpRequest::new("GET", "/", Version::Http11);
        let req = append(req, "X-Custom", "a");
        let req = append(req, "X-Custom", "b");
        assert_eq!(get_all(&req, "X-Custom"), vec!["a", "b"]);
    }

    #[test]
    fn typed_content_type_round_trips() {
        let req = HttpRequest::new("GET", "/", Version::Http11);
        let req = set_content_type(req, &MediaType::new("text", "plain"));
        assert_eq!(content_type(&req).unwrap().unwrap().subtype, "plain");
    }

    #[test]
    fn missing_header_is_not_found() {
        let req = HttpRequest::new("GET", "/", Version::Http11);
        assert!(get(&req, "Host").is_err());
        assert!(!has(&req, "Host"));
    }
}
