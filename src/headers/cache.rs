//! `Cache-Control` directives (RFC 7234 §5.2): a comma list of
//! `token [ "=" ( token / quoted-string ) ]`.

use crate::grammar::{format_parameter_value, split_comma_list, unquote_value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirective {
    pub name: String,
    pub value: Option<String>,
}

impl CacheDirective {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Parses a full `Cache-Control` header value into its directive list.
pub fn parse_cache_control(s: &str) -> Vec<CacheDirective> {
    split_comma_list(s)
        .into_iter()
        .map(|item| match item.split_once('=') {
            Some((name, value)) => CacheDirective {
                name: name.trim().to_string(),
                value: Some(unquote_value(value)),
            },
            None => CacheDirective::flag(item.trim()),
        })
        .collect()
}

pub fn format_cache_control(directives: &[CacheDirective]) -> String {
    directives
        .iter()
        .map(|d| match &d.value {
            Some(v) => format!("{}={}", d.name, format_parameter_value(v)),
            None => d.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience lookup: the numeric value of `max-age`, if present and valid.
pub fn max_age(directives: &[CacheDirective]) -> Option<u64> {
    directives
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case("max-age"))
        .and_then(|d| d.value.as_ref())
        .and_then(|v| v.parse().ok())
}

pub fn has_directive(directives: &[CacheDirective], name: &str) -> bool {
    directives.iter().any(|d| d.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_directives() {
        let d = parse_cache_control("no-cache, max-age=3600, private=\"x-foo\"");
        assert_eq!(d[0], CacheDirective::flag("no-cache"));
        assert_eq!(d[1], CacheDirective::with_value("max-age", "3600"));
        assert_eq!(max_age(&d), Some(3600));
        assert!(has_directive(&d, "private"));
    }

    #[test]
    fn round_trips() {
        let d = vec![CacheDirective::flag("no-store"), CacheDirective::with_value("max-age", "0")];
        assert_eq!(format_cache_control(&d), "no-store, max-age=0");
    }
}
