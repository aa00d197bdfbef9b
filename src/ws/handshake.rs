//! WebSocket handshake validation (spec §4.6) and accept-key derivation.

use base64::Engine;

use crate::error::HandshakeError;
use crate::headers;
use crate::message::{HttpRequest, HttpResponse};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `base64(SHA1(key || GUID))`, the `Sec-WebSocket-Accept` value for a given
/// client `Sec-WebSocket-Key`.
pub fn accept_key(key: &str) -> String {
    use sha1::Digest as _;

    let mut hasher = sha1::Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let digest = hasher.finalize();

    base64::engine::general_purpose::STANDARD.encode(digest)
}

fn contains_token(value: Option<&str>, token: &str) -> bool {
    value
        .map(|v| crate::grammar::split_comma_list(v).into_iter().any(|t| t.eq_ignore_ascii_case(token)))
        .unwrap_or(false)
        || value.map(|v| v.to_ascii_lowercase().contains(token)).unwrap_or(false)
}

/// Validates a handshake request per spec §4.6, returning the computed
/// `Sec-WebSocket-Accept` value on success.
pub fn verify_request(req: &HttpRequest) -> Result<String, HandshakeError> {
    if !req.method().eq_ignore_ascii_case("GET") {
        return Err(HandshakeError::GetMethodRequired);
    }

    if !contains_token(headers::upgrade(req), "websocket") {
        return Err(HandshakeError::NoWebsocketUpgrade);
    }

    if !contains_token(headers::connection(req), "upgrade") {
        return Err(HandshakeError::NoConnectionUpgrade);
    }

    let version = headers::sec_websocket_version(req).ok_or(HandshakeError::NoVersionHeader)?;
    if version != "13" {
        return Err(HandshakeError::UnsupportedVersion);
    }

    let key = headers::sec_websocket_key(req).ok_or(HandshakeError::BadWebsocketKey)?;
    if !is_valid_key(key) {
        return Err(HandshakeError::BadWebsocketKey);
    }

    Ok(accept_key(key))
}

/// A `Sec-WebSocket-Key` must decode to exactly 16 bytes (RFC 6455 §4.1),
/// which base64 always represents as 24 characters including padding.
fn is_valid_key(key: &str) -> bool {
    key.len() == 24
        && base64::engine::general_purpose::STANDARD
            .decode(key)
            .map(|bytes| bytes.len() == 16)
            .unwrap_or(false)
}

/// Validates a handshake response (client side) per spec §4.6.
pub fn verify_response(res: &HttpResponse, expected_key: &str) -> Result<(), HandshakeError> {
    if res.status() != 101 {
        return Err(HandshakeError::InvalidResponse);
    }
    if !contains_token(headers::upgrade(res), "websocket") {
        return Err(HandshakeError::InvalidResponse);
    }
    if !contains_token(headers::connection(res), "upgrade") {
        return Err(HandshakeError::InvalidResponse);
    }
    let accept = headers::sec_websocket_accept(res).ok_or(HandshakeError::InvalidResponse)?;
    if accept != accept_key(expected_key) {
        return Err(HandshakeError::InvalidResponse);
    }
    Ok(())
}

/// Builds the `101 Switching Protocols` response for a verified request.
pub fn build_response(req: &HttpRequest) -> Result<HttpResponse, HandshakeError> {
    let accept = verify_request(req)?;
    let res = HttpResponse::new(101, "Switching Protocols", req.version);
    let res = headers::set_upgrade(res, "websocket");
    let res = headers::set_connection(res, "Upgrade");
    let res = headers::set_sec_websocket_accept(res, accept);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Version;

    fn valid_request() -> HttpRequest {
        let req = HttpRequest::new("GET", "/chat", Version::Http11);
        let req = headers::set_upgrade(req, "websocket");
        let req = headers::set_connection(req, "Upgrade");
        let req = headers::set_sec_websocket_version(req, "13");
        headers::set_sec_websocket_key(req, "dGhlIHNhbXBsZSBub25jZQ==")
    }

    #[test]
    fn accept_key_matches_known_vector() {
        assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn valid_request_succeeds() {
        let req = valid_request();
        let accept = verify_request(&req).unwrap();
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn non_get_method_is_rejected() {
        let req = HttpRequest::new("POST", "/chat", Version::Http11);
        assert_eq!(verify_request(&req).unwrap_err(), HandshakeError::GetMethodRequired);
    }

    #[test]
    fn missing_upgrade_header_is_rejected() {
        let req = HttpRequest::new("GET", "/chat", Version::Http11);
        let req = headers::set_connection(req, "Upgrade");
        let req = headers::set_sec_websocket_version(req, "13");
        let req = headers::set_sec_websocket_key(req, "dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(verify_request(&req).unwrap_err(), HandshakeError::NoWebsocketUpgrade);
    }

    #[test]
    fn short_key_is_rejected() {
        let req = valid_request();
        let req = headers::set_sec_websocket_key(req, "dG9vc2hvcnQ=");
        assert_eq!(verify_request(&req).unwrap_err(), HandshakeError::BadWebsocketKey);
    }

    #[test]
    fn response_round_trips_against_request() {
        let req = valid_request();
        let res = build_response(&req).unwrap();
        assert!(verify_response(&res, "dGhlIHNhbXBsZSBub25jZQ==").is_ok());
    }
}
