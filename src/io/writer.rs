//! A drain-to-completion, non-blocking writer.
//!
//! Grounded on `bufio.h`/`bufio.c`'s `BufWriter` + `async_writer_drain`. The
//! original struct owns the pending slice itself; here the writer only
//! tracks how much of a caller-supplied slice remains to be sent (`put_data`
//! records a length, `drain` is handed the actual bytes on every call) so
//! that the struct carries no borrow and the handler task — which already
//! owns the buffer being drained — stays the single owner of the data.

use std::io::{self, ErrorKind, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Done,
    Pending,
    Closed,
}

pub struct BufWriter {
    pending_len: usize,
    sent: usize,
    is_closed: bool,
}

impl BufWriter {
    pub fn new() -> Self {
        BufWriter {
            pending_len: 0,
            sent: 0,
            is_closed: false,
        }
    }

    pub fn reset(&mut self) {
        self.pending_len = 0;
        self.sent = 0;
        self.is_closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    /// Installs `len` bytes as pending. Precondition: no data currently
    /// pending and the writer has not observed a peer close; violating
    /// either is a programmer error, not a recoverable condition.
    pub fn put_data(&mut self, len: usize) {
        assert!(self.sent == self.pending_len, "put_data while data still pending");
        assert!(!self.is_closed, "put_data after writer closed");
        self.pending_len = len;
        self.sent = 0;
    }

    /// Pushes `data[sent..pending_len]` to `sock`, advancing `sent` across
    /// partial writes. `data` must be the same slice (or an equally-sized
    /// prefix-stable one) across every call for one `put_data` cycle.
    pub fn drain<S: Write>(&mut self, sock: &mut S, data: &[u8]) -> io::Result<DrainOutcome> {
        while self.sent < self.pending_len {
            match sock.write(&data[self.sent..self.pending_len]) {
                Ok(0) => {
                    self.is_closed = true;
                    return Ok(DrainOutcome::Closed);
                }
                Ok(n) => self.sent += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(DrainOutcome::Pending),
                Err(e)
                    if e.kind() == ErrorKind::BrokenPipe
                        || e.kind() == ErrorKind::ConnectionReset =>
                {
                    self.is_closed = true;
                    return Ok(DrainOutcome::Closed);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(DrainOutcome::Done)
    }
}

impl Default for BufWriter {
    fn default() -> Self {
        Self::new()
    }
}
