//! In-memory `ByteChannel` shared by this crate's integration tests. The
//! crate's own `test_support::VecChannel` is `pub(crate)` and unreachable
//! from here, so the same small adapter is rebuilt at this boundary.

use std::collections::VecDeque;
use std::io;

use wire_http::io::ByteChannel;

pub struct VecChannel {
    input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl VecChannel {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }
}

impl ByteChannel for VecChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        if self.input.is_empty() {
            return Ok(None);
        }
        let n = buf.len().min(self.input.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.input.pop_front().unwrap();
        }
        Ok(Some(n))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn set_read_timeout(&mut self, _ms: u64) -> io::Result<()> {
        Ok(())
    }
}
