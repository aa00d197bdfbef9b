//! `Sec-WebSocket-Extensions` grammar (RFC 6455 §9.1): a comma-list of
//! extension tokens each with an optional `;`-separated parameter list, used
//! in particular for negotiating permessage-deflate (RFC 7692 §7).

use crate::grammar::{format_parameter_value, parse_parameters, split_comma_list};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsExtension {
    pub name: String,
    pub params: Vec<(String, Option<String>)>,
}

impl WsExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>) -> Self {
        self.params.push((name.into(), None));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), Some(value.into())));
        self
    }

    pub fn param(&self, name: &str) -> Option<Option<&str>> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    pub fn has_flag(&self, name: &str) -> bool {
        matches!(self.param(name), Some(None))
    }

    pub fn format(&self) -> String {
        let mut out = self.name.clone();
        for (k, v) in &self.params {
            out.push_str("; ");
            out.push_str(k);
            if let Some(v) = v {
                out.push('=');
                out.push_str(&format_parameter_value(v));
            }
        }
        out
    }
}

/// Parses the full `Sec-WebSocket-Extensions` header value into its
/// comma-separated extension offers/selections.
pub fn parse_extensions(s: &str) -> Vec<WsExtension> {
    split_comma_list(s)
        .into_iter()
        .map(|item| {
            let semi = item.find(';').unwrap_or(item.len());
            let name = item[..semi].trim().to_string();
            let params = parse_parameters(&item[semi..])
                .into_iter()
                .map(|(k, v)| if v.is_empty() { (k, None) } else { (k, Some(v)) })
                .collect();
            WsExtension { name, params }
        })
        .collect()
}

pub fn format_extensions(extensions: &[WsExtension]) -> String {
    extensions
        .iter()
        .map(WsExtension::format)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Finds the offered/negotiated `permessage-deflate` extension, if any.
pub fn find_permessage_deflate(extensions: &[WsExtension]) -> Option<&WsExtension> {
    extensions.iter().find(|e| e.name.eq_ignore_ascii_case("permessage-deflate"))
}
