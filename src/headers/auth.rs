//! `Authorization` / `WWW-Authenticate` / `Proxy-Authenticate` /
//! `Proxy-Authorization` grammar (RFC 7235 §2).

use crate::error::HeaderError;
use crate::grammar::{is_token, parse_parameters};

/// Credentials sent by a client: `Authorization: <scheme> <token68-or-params>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub scheme: String,
    pub token68: Option<String>,
    pub params: Vec<(String, String)>,
}

impl Credentials {
    pub fn basic(token68: impl Into<String>) -> Self {
        Self {
            scheme: "Basic".to_string(),
            token68: Some(token68.into()),
            params: Vec::new(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        let (scheme, rest) = split_scheme(s)?;
        if rest.is_empty() {
            return Ok(Self {
                scheme,
                token68: None,
                params: Vec::new(),
            });
        }
        if rest.contains('=') && (rest.contains(',') || !is_token68(rest)) {
            Ok(Self {
                scheme,
                token68: None,
                params: parse_parameters(&format!(";{rest}")),
            })
        } else {
            Ok(Self {
                scheme,
                token68: Some(rest.to_string()),
                params: Vec::new(),
            })
        }
    }

    pub fn format(&self) -> String {
        if let Some(t) = &self.token68 {
            format!("{} {}", self.scheme, t)
        } else if self.params.is_empty() {
            self.scheme.clone()
        } else {
            let params = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} {}", self.scheme, params)
        }
    }
}

/// A single challenge offered by a server, as found in `WWW-Authenticate` /
/// `Proxy-Authenticate` (each header value may carry a comma-list of these).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: String,
    pub params: Vec<(String, String)>,
}

impl Challenge {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        let (scheme, rest) = split_scheme(s)?;
        Ok(Self {
            scheme,
            params: if rest.is_empty() {
                Vec::new()
            } else {
                parse_parameters(&format!(";{rest}"))
            },
        })
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn realm(&self) -> Option<&str> {
        self.param("realm")
    }

    pub fn format(&self) -> String {
        if self.params.is_empty() {
            return self.scheme.clone();
        }
        let params = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {params}", self.scheme)
    }
}

fn split_scheme(s: &str) -> Result<(String, &str), HeaderError> {
    let space = s.find(' ').unwrap_or(s.len());
    let scheme = &s[..space];
    if !is_token(scheme) {
        return Err(HeaderError::MalformedHeaderValue);
    }
    Ok((scheme.to_string(), s[space..].trim_start()))
}

fn is_token68(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'+' | b'/' | b'=')
        })
}
