//! In-memory [`ByteChannel`](crate::io::ByteChannel) used by this crate's own
//! unit and integration tests.

use std::collections::VecDeque;
use std::io;

use crate::io::ByteChannel;

/// A [`ByteChannel`] backed by an in-memory input queue and an output
/// buffer. `read` drains the input; `write` appends to the output.
pub(crate) struct VecChannel {
    input: VecDeque<u8>,
    pub(crate) output: Vec<u8>,
    closed: bool,
}

impl VecChannel {
    pub(crate) fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
            closed: false,
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
        self.closed = true;
        Ok(())
    }

    fn set_read_timeout(&mut self, _ms: u64) -> io::Result<()> {
        Ok(())
    }
}
