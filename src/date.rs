//! HTTP-date parsing and formatting (RFC 7231 §7.1.1.1).
//!
//! Accepts IMF-fixdate (RFC 1123), RFC 850, and asctime on parse; always
//! formats as IMF-fixdate on write, per `httpdate`'s own behavior.

use std::time::SystemTime;

use crate::error::HeaderError;

/// Parses any of the three HTTP-date grammars into a [`SystemTime`].
pub fn parse_http_date(value: &str) -> Result<SystemTime, HeaderError> {
    httpdate::parse_http_date(value.trim()).map_err(|_| HeaderError::MalformedHeaderValue)
}

/// Formats a [`SystemTime`] as an RFC 1123 (IMF-fixdate) HTTP-date.
pub fn format_http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EPOCH_PLUS: u64 = 784_111_777; // 1994-11-06T08:49:37Z

    fn fixture() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(EPOCH_PLUS)
    }

    #[test]
    fn parses_rfc1123() {
        let t = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(t, fixture());
    }

    #[test]
    fn parses_rfc850() {
        let t = parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT").unwrap();
        assert_eq!(t, fixture());
    }

    #[test]
    fn parses_asctime() {
        let t = parse_http_date("Sun Nov  6 08:49:37 1994").unwrap();
        assert_eq!(t, fixture());
    }

    #[test]
    fn formats_as_rfc1123() {
        assert_eq!(format_http_date(fixture()), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_http_date("not a date").is_err());
    }
}
