//! A non-blocking, refill-on-demand byte reader.
//!
//! Grounded on `bufio.h`/`bufio.c`'s `BufReader` + `async_reader_getc`: one
//! `recv()`-sized refill per would-block, byte-at-a-time consumption in
//! between. Generic over `Read` rather than a concrete socket type so it can
//! be driven by an in-memory mock in tests.

use std::io::{self, ErrorKind, Read};

pub const BUFFER_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Byte(u8),
    Pending,
    Eof,
}

pub struct BufReader {
    data: [u8; BUFFER_SIZE],
    at: usize,
    count: usize,
    is_eof: bool,
    read_total: u64,
}

impl BufReader {
    pub fn new() -> Self {
        BufReader {
            data: [0u8; BUFFER_SIZE],
            at: 0,
            count: 0,
            is_eof: false,
            read_total: 0,
        }
    }

    pub fn reset(&mut self) {
        self.at = 0;
        self.count = 0;
        self.is_eof = false;
        self.read_total = 0;
    }

    pub fn bytes_read(&self) -> u64 {
        self.read_total
    }

    /// Returns the next byte, refilling from `sock` at most once. Never
    /// retries on its own: a `Pending` result means the caller must wait for
    /// the next readiness event before calling again.
    pub fn get_byte<S: Read>(&mut self, sock: &mut S) -> io::Result<ReadOutcome> {
        if self.at == self.count {
            if self.is_eof {
                return Ok(ReadOutcome::Eof);
            }
            match self.refill(sock)? {
                true => {}
                false => return Ok(ReadOutcome::Eof),
            }
            if self.at == self.count {
                // refill returned WouldBlock and left the buffer empty.
                return Ok(ReadOutcome::Pending);
            }
        }
        let b = self.data[self.at];
        self.at += 1;
        Ok(ReadOutcome::Byte(b))
    }

    /// Attempts one non-blocking receive. Returns `Ok(true)` if bytes (or a
    /// would-block) were handled without error, `Ok(false)` on EOF.
    fn refill<S: Read>(&mut self, sock: &mut S) -> io::Result<bool> {
        match sock.read(&mut self.data) {
            Ok(0) => {
                self.is_eof = true;
                Ok(false)
            }
            Ok(n) => {
                self.at = 0;
                self.count = n;
                self.read_total += n as u64;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(true),
            Err(e) => Err(e),
        }
    }
}

impl Default for BufReader {
    fn default() -> Self {
        Self::new()
    }
}
