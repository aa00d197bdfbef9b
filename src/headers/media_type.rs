//! `Content-Type` / media-type grammar (RFC 7231 §3.1.1.1): `type "/" subtype
//! *( OWS ";" OWS parameter )`.

use crate::error::HeaderError;
use crate::grammar::{format_parameter_value, is_token, parse_parameters};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    pub params: Vec<(String, String)>,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
            params: Vec::new(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        let slash = s.find('/').ok_or(HeaderError::MalformedHeaderValue)?;
        let semi = s.find(';').unwrap_or(s.len());
        if slash >= semi {
            return Err(HeaderError::MalformedHeaderValue);
        }
        let type_ = s[..slash].trim();
        let subtype = s[slash + 1..semi].trim();
        if !is_token(type_) || !is_token(subtype) {
            return Err(HeaderError::MalformedHeaderValue);
        }
        Ok(Self {
            type_: type_.to_string(),
            subtype: subtype.to_string(),
            params: parse_parameters(&s[semi..]),
        })
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `charset` parameter, defaulting to `UTF-8` as most text types do.
    pub fn charset(&self) -> &str {
        self.param("charset").unwrap_or("UTF-8")
    }

    pub fn format(&self) -> String {
        let mut out = format!("{}/{}", self.type_, self.subtype);
        for (k, v) in &self.params {
            out.push_str("; ");
            out.push_str(k);
            out.push('=');
            out.push_str(&format_parameter_value(v));
        }
        out
    }
}
