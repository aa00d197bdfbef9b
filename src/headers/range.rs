//! `Range` / `Content-Range` grammar (RFC 7233).

use crate::error::HeaderError;

/// A single `byte-range-spec` or `suffix-byte-range-spec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRangeSpec {
    /// `first-byte-pos "-" last-byte-pos?`
    FromTo(u64, Option<u64>),
    /// `"-" suffix-length`
    Suffix(u64),
}

/// `Range: bytes=...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRanges {
    pub unit: String,
    pub ranges: Vec<ByteRangeSpec>,
}

impl ByteRanges {
    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        let eq = s.find('=').ok_or(HeaderError::MalformedHeaderValue)?;
        let unit = s[..eq].trim().to_string();
        let mut ranges = Vec::new();
        for spec in s[eq + 1..].split(',') {
            let spec = spec.trim();
            let dash = spec.find('-').ok_or(HeaderError::MalformedHeaderValue)?;
            let (first, last) = spec.split_at(dash);
            let last = &last[1..];
            if first.is_empty() {
                let suffix = last.parse().map_err(|_| HeaderError::MalformedHeaderValue)?;
                ranges.push(ByteRangeSpec::Suffix(suffix));
            } else {
                let first = first.parse().map_err(|_| HeaderError::MalformedHeaderValue)?;
                let last = if last.is_empty() {
                    None
                } else {
                    Some(last.parse().map_err(|_| HeaderError::MalformedHeaderValue)?)
                };
                ranges.push(ByteRangeSpec::FromTo(first, last));
            }
        }
        if ranges.is_empty() {
            return Err(HeaderError::MalformedHeaderValue);
        }
        Ok(Self { unit, ranges })
    }

    pub fn format(&self) -> String {
        let specs = self
            .ranges
            .iter()
            .map(|r| match r {
                ByteRangeSpec::FromTo(first, Some(last)) => format!("{first}-{last}"),
                ByteRangeSpec::FromTo(first, None) => format!("{first}-"),
                ByteRangeSpec::Suffix(n) => format!("-{n}"),
            })
            .collect::<Vec<_>>()
            .join(",");
        format!("{}={specs}", self.unit)
    }
}

/// `Content-Range: bytes 0-499/1234` or `bytes */1234`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRange {
    pub unit: String,
    /// `None` for the unsatisfied-range form (`bytes */1234`).
    pub range: Option<(u64, u64)>,
    /// `None` for an unknown complete length (`*`).
    pub complete_length: Option<u64>,
}

impl ContentRange {
    pub fn parse(s: &str) -> Result<Self, HeaderError> {
        let s = s.trim();
        let mut parts = s.splitn(2, ' ');
        let unit = parts.next().ok_or(HeaderError::MalformedHeaderValue)?.to_string();
        let rest = parts.next().ok_or(HeaderError::MalformedHeaderValue)?;
        let slash = rest.find('/').ok_or(HeaderError::MalformedHeaderValue)?;
        let (range_part, len_part) = (&rest[..slash], &rest[slash + 1..]);

        let range = if range_part == "*" {
            None
        } else {
            let dash = range_part.find('-').ok_or(HeaderError::MalformedHeaderValue)?;
            let first: u64 = range_part[..dash].parse().map_err(|_| HeaderError::MalformedHeaderValue)?;
            let last: u64 = range_part[dash + 1..]
                .parse()
                .map_err(|_| HeaderError::MalformedHeaderValue)?;
            Some((first, last))
        };

        let complete_length = if len_part == "*" {
            None
        } else {
            Some(len_part.parse().map_err(|_| HeaderError::MalformedHeaderValue)?)
        };

        Ok(Self {
            unit,
            range,
            complete_length,
        })
    }

    pub fn format(&self) -> String {
        let range = match self.range {
            Some((first, last)) => format!("{first}-{last}"),
            None => "*".to_string(),
        };
        let len = match self.complete_length {
            Some(n) => n.to_string(),
            None => "*".to_string(),
        };
        format!("{} {range}/{len}", self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_range() {
        let r = ByteRanges::parse("bytes=0-499,500-999,-500").unwrap();
        assert_eq!(
            r.ranges,
            vec![
                ByteRangeSpec::FromTo(0, Some(499)),
                ByteRangeSpec::FromTo(500, Some(999)),
                ByteRangeSpec::Suffix(500),
            ]
        );
        assert_eq!(r.format(), "bytes=0-499,500-999,-500");
    }

    #[test]
    fn parses_open_ended_range() {
        let r = ByteRanges::parse("bytes=9500-").unwrap();
        assert_eq!(r.ranges, vec![ByteRangeSpec::FromTo(9500, None)]);
    }

    #[test]
    fn content_range_round_trips() {
        let cr = ContentRange::parse("bytes 0-499/1234").unwrap();
        assert_eq!(cr.range, Some((0, 499)));
        assert_eq!(cr.complete_length, Some(1234));
        assert_eq!(cr.format(), "bytes 0-499/1234");
    }

    #[test]
    fn content_range_unsatisfied() {
        let cr = ContentRange::parse("bytes */1234").unwrap();
        assert!(cr.range.is_none());
        assert_eq!(cr.format(), "bytes */1234");
    }
}
