//! The duplex byte stream requests are written to and responses read from.
//!
//! Establishing the stream (TCP connect, TLS handshake, timeouts) is up to the
//! caller. Anything that is `io::Read + io::Write` can be used via [`Stream`].

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// A duplex byte stream.
pub trait Transport {
    /// Send all of `data`.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receive at most `max_len` bytes. An empty result is end-of-stream.
    fn receive(&mut self, max_len: usize) -> io::Result<Vec<u8>>;

    /// Receive up to and including the next `\n`. At end-of-stream this returns
    /// whatever is left, which is empty once the stream is exhausted.
    fn receive_line(&mut self) -> io::Result<Vec<u8>>;

    fn close(&mut self) -> io::Result<()>;
}

/// Transport shared between a connection and its current response.
pub(crate) type SharedTransport = Arc<Mutex<dyn Transport + Send>>;

pub(crate) fn lock(transport: &SharedTransport) -> MutexGuard<'_, dyn Transport + Send + 'static> {
    // A poisoned lock means a panic mid-read. The byte stream itself is
    // still what it is, the caller decides whether to trust it.
    transport.lock().unwrap_or_else(|e| e.into_inner())
}

const INCREMENT: usize = 4096;

/// Buffered [`Transport`] over any `io::Read + io::Write`.
pub struct Stream<S> {
    inner: Option<S>,
    buffer: Vec<u8>,
    pos: usize,
}

impl<S: Read + Write> Stream<S> {
    pub fn new(inner: S) -> Self {
        Stream {
            inner: Some(inner),
            buffer: vec![],
            pos: 0,
        }
    }

    /// The wrapped stream, unless closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref()
    }

    /// Unwrap the stream. Buffered, not yet received input is lost.
    pub fn into_inner(self) -> Option<S> {
        self.inner
    }

    fn inner(&mut self) -> io::Result<&mut S> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "stream is closed"))
    }

    fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    fn consume(&mut self, amount: usize) -> Vec<u8> {
        let out = self.buffered()[..amount].to_vec();
        self.pos += amount;
        if self.pos == self.buffer.len() {
            self.buffer.clear();
            self.pos = 0;
        }
        out
    }

    /// Read more input into the buffer. Returns 0 at end-of-stream.
    fn fill_more(&mut self) -> io::Result<usize> {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }

        let len = self.buffer.len();
        self.buffer.resize(len + INCREMENT, 0);

        let result = match self.inner.as_mut() {
            Some(inner) => inner.read(&mut self.buffer[len..]),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "stream is closed")),
        };

        let n = *result.as_ref().unwrap_or(&0);
        self.buffer.truncate(len + n);

        result
    }
}

impl<S: Read + Write> Transport for Stream<S> {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let inner = self.inner()?;
        inner.write_all(data)?;
        inner.flush()
    }

    fn receive(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        if self.buffered().is_empty() && self.fill_more()? == 0 {
            return Ok(vec![]);
        }

        let amount = self.buffered().len().min(max_len);
        Ok(self.consume(amount))
    }

    fn receive_line(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(i) = self.buffered().iter().position(|c| *c == b'\n') {
                return Ok(self.consume(i + 1));
            }

            if self.fill_more()? == 0 {
                let rest = self.buffered().len();
                return Ok(self.consume(rest));
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut inner) = self.inner.take() {
            inner.flush()?;
        }
        self.buffer.clear();
        self.pos = 0;
        Ok(())
    }
}

impl<S> fmt::Debug for Stream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("open", &self.inner.is_some())
            .field("buffered", &(self.buffer.len() - self.pos))
            .finish()
    }
}
