//! Persistent-cookie jar (spec §4.3), implementing RFC 6265 §5's domain,
//! path, secure, and expiry matching rules.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::warn;

use crate::io::{Clock, PublicSuffixList};
use crate::message::Uri;

/// A cookie as carried in a request's `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainCookie {
    pub name: String,
    pub value: String,
}

/// A cookie as parsed out of a single response `Set-Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<SystemTime>,
    pub max_age: Option<Duration>,
    pub secure: bool,
    pub http_only: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Parses a single `Set-Cookie` header value: `name=value *( ";" OWS
    /// attribute )`. Unknown attributes are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let mut cookie = Self::new(name.trim(), value.trim());
        for attr in parts {
            let attr = attr.trim();
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            let key = key.trim();
            let val = val.trim();
            if key.eq_ignore_ascii_case("domain") {
                cookie.domain = Some(val.to_string());
            } else if key.eq_ignore_ascii_case("path") {
                cookie.path = Some(val.to_string());
            } else if key.eq_ignore_ascii_case("expires") {
                cookie.expires = crate::date::parse_http_date(val).ok();
            } else if key.eq_ignore_ascii_case("max-age") {
                cookie.max_age = val.parse::<i64>().ok().map(|secs| Duration::from_secs(secs.max(0) as u64));
            } else if key.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if key.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }
        Some(cookie)
    }
}

/// A cookie as stored in the jar, with matching/expiry state resolved.
#[derive(Debug, Clone)]
pub struct PersistentCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure_only: bool,
    pub http_only: bool,
    pub host_only: bool,
    pub persistent: bool,
    pub creation: SystemTime,
    pub last_access: SystemTime,
    pub expiry: SystemTime,
}

/// Sentinel expiry for non-persistent (session) cookies: far enough in the
/// future that ordinary expiry checks never trigger on them.
fn far_future() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(u32::MAX as u64 * 100)
}

fn is_ip_literal(host: &str) -> bool {
    host.parse::<std::net::IpAddr>().is_ok() || (host.starts_with('[') && host.ends_with(']'))
}

#[derive(Default)]
struct Store {
    cookies: HashMap<(String, String, String), PersistentCookie>,
}

/// Thread-safe persistent-cookie jar. A single internal lock is sufficient
/// since jar operations are short (spec §5 concurrency note).
pub struct CookieJar<C: Clock, P: PublicSuffixList> {
    store: Mutex<Store>,
    clock: C,
    public_suffix: P,
}

impl<C: Clock, P: PublicSuffixList> CookieJar<C, P> {
    pub fn new(clock: C, public_suffix: P) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            clock,
            public_suffix,
        }
    }

    /// Inserts each `Set-Cookie` from a response to `target` into the jar.
    pub fn put(&self, target: &Uri, set_cookie: &SetCookie) -> Result<(), CookieError> {
        let host = target.host().ok_or(CookieError::InvalidTarget)?.to_lowercase();

        let (domain, host_only) = match &set_cookie.domain {
            Some(d) => (d.trim_start_matches('.').to_lowercase(), false),
            None => (host.clone(), true),
        };

        if !host_only && self.public_suffix.is_public_suffix(&domain) && domain != host {
            warn!(%domain, %host, "rejected cookie targeting a public suffix");
            return Err(CookieError::RejectedPublicSuffix);
        }
        if !domain_matches_host(&domain, &host) {
            warn!(%domain, %host, name = %set_cookie.name, "rejected cookie for domain mismatch");
            return Err(CookieError::RejectedDomainMismatch);
        }

        let path = match &set_cookie.path {
            Some(p) if p.starts_with('/') => p.clone(),
            _ => default_path(target.path.as_str()),
        };

        let now = self.clock.now();
        let persistent = set_cookie.max_age.is_some() || set_cookie.expires.is_some();
        let expiry = if let Some(max_age) = set_cookie.max_age {
            now + max_age
        } else if let Some(expires) = set_cookie.expires {
            expires
        } else {
            far_future()
        };

        let key = (set_cookie.name.clone(), domain.clone(), path.clone());
        let mut store = self.store.lock().unwrap();
        let creation = store.cookies.get(&key).map(|c| c.creation).unwrap_or(now);
        store.cookies.insert(
            key,
            PersistentCookie {
                name: set_cookie.name.clone(),
                value: set_cookie.value.clone(),
                domain,
                path,
                secure_only: set_cookie.secure,
                http_only: set_cookie.http_only,
                host_only,
                persistent,
                creation,
                last_access: now,
                expiry,
            },
        );
        Ok(())
    }

    /// Returns the cookies applicable to a request to `target`, ordered by
    /// descending path length then ascending creation time, touching each
    /// returned cookie's `last_access`.
    pub fn get(&self, target: &Uri) -> Vec<PlainCookie> {
        let Some(host) = target.host().map(str::to_lowercase) else {
            return Vec::new();
        };
        let path = target.path.as_str();
        let is_secure = matches!(target.scheme.as_deref(), Some("https") | Some("wss"));
        let now = self.clock.now();

        let mut store = self.store.lock().unwrap();
        let mut matched: Vec<(String, String, String)> = Vec::new();
        for (key, cookie) in store.cookies.iter() {
            if cookie.expiry <= now {
                continue;
            }
            if !host_matches(cookie, &host) {
                continue;
            }
            if !path_matches(&cookie.path, path) {
                continue;
            }
            if cookie.secure_only && !is_secure {
                continue;
            }
            matched.push(key.clone());
        }

        matched.sort_by(|a, b| {
            let ca = &store.cookies[a];
            let cb = &store.cookies[b];
            cb.path.len().cmp(&ca.path.len()).then(ca.creation.cmp(&cb.creation))
        });

        matched
            .into_iter()
            .map(|key| {
                let cookie = store.cookies.get_mut(&key).unwrap();
                cookie.last_access = now;
                PlainCookie {
                    name: cookie.name.clone(),
                    value: cookie.value.clone(),
                }
            })
            .collect()
    }

    /// Drops expired entries (`expired_only = true`), or every entry.
    pub fn clear(&self, expired_only: bool) {
        let now = self.clock.now();
        let mut store = self.store.lock().unwrap();
        if expired_only {
            store.cookies.retain(|_, c| c.expiry > now);
        } else {
            store.cookies.clear();
        }
    }
}

fn domain_matches_host(domain: &str, host: &str) -> bool {
    host == domain || (!is_ip_literal(host) && host.ends_with(&format!(".{domain}")))
}

fn host_matches(cookie: &PersistentCookie, host: &str) -> bool {
    // `host_only` still governs rejection at `put` time (spec §4.3 step 2);
    // selection anchors on the registering host the same way for every
    // cookie, host-only or not, so a cookie registered on a parent domain
    // is still offered to its subdomains (spec §8 scenario 3).
    domain_matches_host(&cookie.domain, host)
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    if request_path.starts_with(cookie_path) {
        if cookie_path.ends_with('/') {
            return true;
        }
        return request_path[cookie_path.len()..].starts_with('/');
    }
    false
}

fn default_path(target_path: &str) -> String {
    match target_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => target_path[..idx].to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieError {
    InvalidTarget,
    RejectedPublicSuffix,
    RejectedDomainMismatch,
}

impl std::fmt::Display for CookieError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTarget => write!(f, "cookie target is not an absolute URI with a host"),
            Self::RejectedPublicSuffix => write!(f, "cookie domain is a public suffix"),
            Self::RejectedDomainMismatch => write!(f, "cookie domain does not match request host"),
        }
    }
}

impl std::error::Error for CookieError {}
