use std::io::Write;

use http::{Method, Version};

use crate::transport::Transport;
use crate::Error;

/// Output buffer for the request prelude and buffered body bytes.
pub(crate) struct Out {
    buf: Vec<u8>,
}

impl Out {
    pub fn new() -> Self {
        Out {
            buf: Vec::with_capacity(1024),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_send_line(&mut self, method: &Method, path: &str) {
        // Writing to a Vec can't fail.
        let _ = write!(self.buf, "{} {} {:?}\r\n", method, path, Version::HTTP_11);
    }

    pub fn write_header(&mut self, name: &str, value: &[u8]) {
        let _ = write!(self.buf, "{}: ", name);
        self.buf.extend_from_slice(value);
        self.buf.extend_from_slice(b"\r\n");
    }

    pub fn end_head(&mut self) {
        self.buf.extend_from_slice(b"\r\n");
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_vec_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Send what is buffered and clear the buffer.
    pub fn flush(&mut self, transport: &mut dyn Transport) -> Result<(), Error> {
        if self.buf.is_empty() {
            return Ok(());
        }
        trace!("Send {} bytes", self.buf.len());
        transport.send(&self.buf)?;
        self.buf.clear();
        Ok(())
    }
}
