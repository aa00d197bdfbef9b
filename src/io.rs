//! External collaborator interfaces.
//!
//! Socket listeners, TLS, executor wiring, file-system temp placement and
//! wall-clock access are kept out of this crate and consumed only through
//! these minimal traits.

use std::io;
use std::time::SystemTime;

/// A duplex byte channel with one reader and one writer.
///
/// Implementors must allow a single reader and a single writer to operate
/// concurrently (see the concurrency model: read half and write half are
/// guarded by independent mutual-exclusion primitives by the caller).
pub trait ByteChannel: Send {
    /// Reads into `buf`, returning the number of bytes read, or `None` if
    /// the channel has reached EOF / been closed by the peer.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// Writes the entirety of `buf`.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Shuts down both halves of the channel.
    fn close(&mut self) -> io::Result<()>;

    /// Sets the timeout, in milliseconds, for subsequent `read` calls.
    /// `0` means indefinite (block forever).
    fn set_read_timeout(&mut self, ms: u64) -> io::Result<()>;
}

/// A file-like handle opened by a [`TempStore`], written to during multipart
/// spooling and then handed off (or reopened) by the caller.
pub trait OpenFile: io::Read + io::Write + io::Seek + Send {}

impl<T: io::Read + io::Write + io::Seek + Send> OpenFile for T {}

/// Placement of multipart file parts that exceed the in-memory threshold.
pub trait TempStore: Send + Sync {
    /// Creates a new temporary file named with the given prefix/suffix hint.
    fn create_temp_file(&self, prefix: &str, suffix: &str) -> io::Result<Box<dyn OpenFile>>;
}

/// Public suffix consultation used by the cookie store (spec §4.3 step 2).
pub trait PublicSuffixList: Send + Sync {
    /// Returns true if `domain` (already lowercased, no leading dot) is a
    /// public suffix under which independent parties register names.
    fn is_public_suffix(&self, domain: &str) -> bool;
}

/// A public suffix list that rejects nothing; useful for tests and for
/// embedders that want to opt out of the check.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPublicSuffixList;

impl PublicSuffixList for NoPublicSuffixList {
    fn is_public_suffix(&self, _domain: &str) -> bool {
        false
    }
}

/// Cryptographically secure randomness, used for multipart boundary
/// generation and WebSocket client masking keys.
pub trait SecureRandom: Send + Sync {
    /// Fills `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);

    /// Returns a single random `u32`.
    fn next_u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill(&mut buf);
        u32::from_ne_bytes(buf)
    }

    /// Returns a random integer in `[lo, hi)`.
    fn next_int_range(&self, lo: u32, hi: u32) -> u32 {
        assert!(hi > lo, "next_int_range: empty range");
        lo + (self.next_u32() % (hi - lo))
    }
}

/// [`SecureRandom`] backed by the `rand` crate's thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRng;

impl SecureRandom for ThreadRng {
    fn fill(&self, buf: &mut [u8]) {
        rand::Rng::fill(&mut rand::rng(), buf);
    }

    fn next_u32(&self) -> u32 {
        rand::Rng::random(&mut rand::rng())
    }

    fn next_int_range(&self, lo: u32, hi: u32) -> u32 {
        rand::Rng::random_range(&mut rand::rng(), lo..hi)
    }
}

/// Wall-clock access, injectable for tests (cookie creation/last-access
/// timestamps, WebSocket idle timeouts).
///
/// The source spec describes this collaborator as returning an opaque
/// `Instant`; cookie expiry must be compared against calendar dates parsed
/// from `Expires`/`Max-Age`, which a monotonic clock cannot represent, so
/// this returns [`SystemTime`] instead (see DESIGN.md).
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by [`std::time::SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
