//! `Content-Disposition` grammar (RFC 6266 / RFC 7578 §4.2 for
//! `form-data`): `disposition-type *( ";" OWS disposition-parm )`.

use crate::error::HeaderError;
use crate::grammar::{format_parameter_value, is_token, parse_parameters};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    pub kind: String,
    pub params: Vec<(String, String)>,
}

impl ContentDisposition {
    pub fn form_data(name: impl Into<String>) -> Self {
        Self {
            kind: "form-data".to_string(),
            params: vec![("name".to_string(), name.into())],
        }
    }

    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        let semi = s.find(';').unwrap_or(s.len());
        let kind = s[..semi].trim();
        if !is_token(kind) {
            return Err(HeaderError::MalformedHeaderValue);
        }
        Ok(Self {
            kind: kind.to_string(),
            params: parse_parameters(&s[semi..]),
        })
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.param("name")
    }

    pub fn filename(&self) -> Option<&str> {
        self.param("filename")
    }

    pub fn is_form_data(&self) -> bool {
        self.kind.eq_ignore_ascii_case("form-data")
    }

    pub fn format(&self) -> String {
        let mut out = self.kind.clone();
        for (k, v) in &self.params {
            out.push_str("; ");
            out.push_str(k);
            out.push('=');
            out.push_str(&format_parameter_value(v));
        }
        out
    }
}
