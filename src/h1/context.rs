//! Per-connection state carried across a request/response exchange.

/// Bit flags tracked across the lifetime of a single HTTP/1.1 connection.
/// Mirrors the request currently being processed; reset between requests
/// except for `CLOSE`, which once set stays set for the connection.
struct ContextState(u8);

impl ContextState {
    const EXPECT: u8 = 0b_0001;
    const CONNECT: u8 = 0b_0010;
    const HEAD: u8 = 0b_0100;
    const CLOSE: u8 = 0b_1000;

    const fn new() -> Self {
        Self(0)
    }

    fn insert(&mut self, other: u8) {
        self.0 |= other;
    }

    fn remove(&mut self, other: u8) {
        self.0 &= !other;
    }

    const fn contains(&self, other: u8) -> bool {
        (self.0 & other) == other
    }
}

/// Connection-scoped state: which special request properties (`Expect`,
/// `CONNECT`, `HEAD`) apply to the request currently in flight, and whether
/// the connection should close after the current exchange.
pub struct Context {
    state: ContextState,
    pub is_tls: bool,
}

impl Context {
    pub fn new(is_tls: bool) -> Self {
        Self {
            state: ContextState::new(),
            is_tls,
        }
    }

    /// Resets per-request state for a new request on the same connection.
    /// `CLOSE` is intentionally NOT cleared by the HTTP/1.0 default: a
    /// connection downgraded to close-after-response never revives.
    pub fn reset_request(&mut self) {
        let close = self.state.contains(ContextState::CLOSE);
        self.state = ContextState::new();
        if close {
            self.state.insert(ContextState::CLOSE);
        }
    }

    pub fn set_expect_header(&mut self) {
        self.state.insert(ContextState::EXPECT)
    }

    pub fn set_connect_method(&mut self) {
        self.state.insert(ContextState::CONNECT)
    }

    pub fn set_head_method(&mut self) {
        self.state.insert(ContextState::HEAD)
    }

    pub fn set_close(&mut self) {
        self.state.insert(ContextState::CLOSE)
    }

    pub fn remove_close(&mut self) {
        self.state.remove(ContextState::CLOSE)
    }

    pub fn is_expect_header(&self) -> bool {
        self.state.contains(ContextState::EXPECT)
    }

    pub fn is_connect_method(&self) -> bool {
        self.state.contains(ContextState::CONNECT)
    }

    pub fn is_head_method(&self) -> bool {
        self.state.contains(ContextState::HEAD)
    }

    pub fn is_connection_closed(&self) -> bool {
        self.state.contains(ContextState::CLOSE)
    }

    /// Applies the last-value-wins Connection-token semantics (spec §4.1 /
    /// RFC 7230 §6.1): a comma-separated `Connection` header value is
    /// scanned left to right, each `close`/`keep-alive` token overriding
    /// whatever came before it.
    pub fn apply_connection_header(&mut self, value: &str) {
        for tok in crate::grammar::split_comma_list(value) {
            if tok.eq_ignore_ascii_case("close") {
                self.set_close();
            } else if tok.eq_ignore_ascii_case("keep-alive") {
                self.remove_close();
            }
        }
    }
}
