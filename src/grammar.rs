//! Grammar/parse primitives shared by header value types (RFC 7230 §3.2.6,
//! RFC 7231 §5.3.1).

/// `tchar` per RFC 7230 §3.2.6.
pub fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

/// Returns true if `s` is a valid RFC 7230 `token`.
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_tchar)
}

fn skip_ows(s: &str) -> &str {
    s.trim_start_matches([' ', '\t'])
}

/// Splits a `;`-separated parameter list (`OWS ";" OWS name [ "=" value ]`)
/// where `value` is a token or a quoted-string. Used by Content-Type,
/// Content-Disposition, and any other header whose grammar is
/// `token *( OWS ";" OWS parameter )`.
pub fn parse_parameters(s: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(idx) = rest.find(';') {
        rest = skip_ows(&rest[idx + 1..]);
        if rest.is_empty() {
            break;
        }
        let name_end = rest
            .find(|c: char| c == '=' || c == ';')
            .unwrap_or(rest.len());
        let name = rest[..name_end].trim_end_matches([' ', '\t']).to_string();
        if rest.as_bytes().get(name_end) == Some(&b'=') {
            let value_part = skip_ows(&rest[name_end + 1..]);
            if let Some((value, consumed)) = parse_quoted_or_token(value_part) {
                out.push((name, value));
                rest = &value_part[consumed..];
                continue;
            }
        }
        if !name.is_empty() {
            out.push((name, String::new()));
        }
        rest = &rest[name_end..];
    }
    out
}

/// Parses a single parameter value: either a `quoted-string` (returning the
/// unescaped contents) or a bare `token`/unquoted run up to the next `;`.
/// Returns the value and the number of input bytes consumed.
fn parse_quoted_or_token(s: &str) -> Option<(String, usize)> {
    if s.starts_with('"') {
        let bytes = s.as_bytes();
        let mut out = String::new();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'"' => return Some((out, i + 1)),
                b'\\' if i + 1 < bytes.len() => {
                    out.push(bytes[i + 1] as char);
                    i += 2;
                }
                b => {
                    out.push(b as char);
                    i += 1;
                }
            }
        }
        // unterminated quoted-string: take the rest verbatim.
        Some((s[1..].to_string(), s.len()))
    } else {
        let end = s.find(';').unwrap_or(s.len());
        let value = s[..end].trim_end_matches([' ', '\t']);
        Some((value.to_string(), end))
    }
}

/// Unquotes a single value that may be a `quoted-string` or a bare token,
/// outside the context of a `;`-separated parameter list (e.g. a single
/// `name=value` pair in `Cache-Control`).
pub fn unquote_value(s: &str) -> String {
    let s = s.trim();
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        parse_quoted_or_token(s).map(|(v, _)| v).unwrap_or_default()
    } else {
        s.to_string()
    }
}

/// Formats a parameter value, quoting it if it is not a valid bare token.
pub fn format_parameter_value(value: &str) -> String {
    if is_token(value) {
        value.to_string()
    } else {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
        out
    }
}

/// Splits a comma-separated list honoring quoted-strings (commas inside a
/// quoted-string do not split the list). Each element is trimmed of OWS.
/// Empty elements (from `a,,b` or leading/trailing commas) are dropped, per
/// RFC 7230 §7's "list extension" rule.
pub fn split_comma_list(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0usize;
    let mut in_quotes = false;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'\\' if in_quotes && i + 1 < bytes.len() => i += 1,
            b',' if !in_quotes => {
                push_trimmed(&mut out, &s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    push_trimmed(&mut out, &s[start..]);
    out
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let trimmed = s.trim_matches([' ', '\t']);
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

/// A single element of a quality-weighted comma list (`Accept`,
/// `Accept-Charset`, `Accept-Encoding`, `Accept-Language`).
#[derive(Debug, Clone, PartialEq)]
pub struct QualityItem {
    pub item: String,
    pub q: f32,
}

/// Parses `#( item [ ";" "q=" qvalue ] )`, defaulting `q` to `1.0`.
pub fn parse_quality_list(s: &str) -> Vec<QualityItem> {
    split_comma_list(s)
        .into_iter()
        .map(|element| {
            let mut parts = element.splitn(2, ';');
            let item = parts.next().unwrap_or("").trim().to_string();
            let q = parts
                .next()
                .and_then(|rest| {
                    let rest = rest.trim();
                    rest.strip_prefix("q=").or_else(|| rest.strip_prefix("Q="))
                })
                .and_then(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            QualityItem { item, q }
        })
        .collect()
}

/// Formats a quality list back into its wire form, omitting `q=1` items'
/// explicit weight (matches the round-trip rule modulo whitespace).
pub fn format_quality_list(items: &[QualityItem]) -> String {
    items
        .iter()
        .map(|it| {
            if (it.q - 1.0).abs() < f32::EPSILON {
                it.item.clone()
            } else {
                format!("{};q={}", it.item, format_q(it.q))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_q(q: f32) -> String {
    let q = (q * 1000.0).round() / 1000.0;
    let mut s = format!("{q:.3}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_validity() {
        assert!(is_token("gzip"));
        assert!(is_token("x-foo"));
        assert!(!is_token(""));
        assert!(!is_token("has space"));
        assert!(!is_token("has/slash"));
    }

    #[test]
    fn parameters_quoted_and_bare() {
        let params = parse_parameters(r#"form-data; name="my field"; filename=report.txt"#);
        assert_eq!(params[0], ("name".into(), "my field".into()));
        assert_eq!(params[1], ("filename".into(), "report.txt".into()));
    }

    #[test]
    fn comma_list_respects_quotes() {
        let items = split_comma_list(r#"a, "b, c", d"#);
        assert_eq!(items, vec!["a", "\"b, c\"", "d"]);
    }

    #[test]
    fn quality_list_defaults() {
        let items = parse_quality_list("gzip;q=0.8, deflate, br;q=1.0");
        assert_eq!(items[0].item, "gzip");
        assert!((items[0].q - 0.8).abs() < 1e-6);
        assert_eq!(items[1].item, "deflate");
        assert!((items[1].q - 1.0).abs() < 1e-6);
    }
}
