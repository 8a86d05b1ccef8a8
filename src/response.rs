use std::fmt;
use std::mem;

use http::{Method, Version};

use crate::body::BodyReader;
use crate::decompress::Decompressor;
use crate::header::Headers;
use crate::parser::Head;
use crate::transport::{lock, SharedTransport};
use crate::util::has_token;
use crate::{ChunkError, Error};

/// A response read from a [`Connection`](crate::Connection).
///
/// The response borrows the connection transport until the body is fully read,
/// the response is closed, or it is dropped.
pub struct Response {
    version: Version,
    status: u16,
    reason: String,
    headers: Headers,
    transport: Option<SharedTransport>,
    reader: BodyReader,
    decoder: Option<Decompressor>,
    must_close: bool,
    /// Body bytes received but not yet consumed.
    buffer: Vec<u8>,
    /// Payload of the chunk being dechunked.
    payload: Vec<u8>,
    block_size: usize,
}

impl Response {
    pub(crate) fn new(
        head: Head,
        method: Option<&Method>,
        transport: Option<SharedTransport>,
        read_ahead: Vec<u8>,
        block_size: usize,
    ) -> Result<Self, Error> {
        let Head {
            version,
            status,
            reason,
            headers,
        } = head;

        let reader = BodyReader::for_response(method, status, &headers)?;
        debug!("Response {} {} body: {:?}", status, reason, reader);

        let connection_close = headers
            .get_all("connection")
            .filter_map(|v| std::str::from_utf8(v).ok())
            .any(|v| has_token(v, "close"));

        let must_close = connection_close
            || version == Version::HTTP_10
            || matches!(reader, BodyReader::CloseDelimited);

        let decoder = if reader.is_ended() {
            None
        } else {
            Decompressor::for_headers(&headers)
        };

        let mut response = Response {
            version,
            status,
            reason,
            headers,
            transport,
            reader,
            decoder,
            must_close,
            buffer: read_ahead,
            payload: vec![],
            block_size: block_size.max(1),
        };

        if response.reader.is_ended() {
            response.release();
        }

        Ok(response)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Tell if the transport can't be reused for another request after this
    /// response.
    pub fn must_close_connection(&self) -> bool {
        self.must_close
    }

    /// Tell if this response no longer holds the transport.
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Read at most `amount` body bytes from the transport.
    ///
    /// Content-encoding is reversed, so the returned data can be bigger or
    /// smaller than `amount`. Compressed input is read until it produces
    /// output. An empty result means the body is fully read, or the response
    /// is closed, or `amount` is 0.
    ///
    /// Chunked bodies are read with [`Response::read_chunked()`].
    pub fn read(&mut self, amount: usize) -> Result<Vec<u8>, Error> {
        if let BodyReader::Chunked(d) = &self.reader {
            if d.is_ended() || self.is_closed() {
                return Ok(vec![]);
            }
            return Err(ChunkError::ReadNotSupported.into());
        }

        if amount == 0 {
            return Ok(vec![]);
        }

        loop {
            if self.is_closed() {
                return Ok(vec![]);
            }

            let out = self.read_framed(amount)?;

            // A decoder can swallow input without output, such as a gzip header.
            if !out.is_empty() || self.decoder.is_none() || self.reader.is_ended() {
                return Ok(out);
            }
        }
    }

    fn read_framed(&mut self, amount: usize) -> Result<Vec<u8>, Error> {
        let limit = match self.reader.left() {
            Some(left) => (left.min(usize::MAX as u64) as usize).min(amount),
            None => amount,
        };

        // Read ahead data first.
        let from_buffer = self.buffer.len().min(limit);
        let mut wire: Vec<u8> = self.buffer.drain(..from_buffer).collect();

        let mut eof = false;

        while wire.len() < limit {
            let Some(transport) = &self.transport else {
                break;
            };

            let want = (limit - wire.len()).min(self.block_size);
            let input = lock(transport).receive(want)?;

            if input.is_empty() {
                eof = true;
                break;
            }

            trace!("Read body: {}", input.len());
            wire.extend_from_slice(&input);
        }

        self.reader.consume(wire.len());

        if eof {
            if let BodyReader::LengthDelimited(left) = self.reader {
                debug!("Connection reset with {} bytes left", left);
                self.release();
                return Err(Error::ConnectionReset);
            }

            // Close delimited body ends here.
            self.reader = BodyReader::NoBody;
        }

        let mut out = self.decode(wire)?;

        if self.reader.is_ended() {
            out.extend(self.end_body()?);
        }

        Ok(out)
    }

    /// Read the entire (remaining) body.
    pub fn read_all(&mut self) -> Result<Vec<u8>, Error> {
        self.read(usize::MAX)
    }

    /// Lazily read a chunked body, one item per chunk.
    ///
    /// Fails with [`ChunkError::NotChunked`] if the response doesn't use
    /// `transfer-encoding: chunked`. A closed response gives no chunks.
    ///
    /// ```no_run
    /// # fn run(response: &mut h1wire::Response) -> Result<(), h1wire::Error> {
    /// for chunk in response.read_chunked()? {
    ///     println!("{}", chunk?.len());
    /// }
    /// # Ok(()) }
    /// ```
    pub fn read_chunked(&mut self) -> Result<Chunks<'_>, Error> {
        if !self.reader.is_chunked() {
            return Err(ChunkError::NotChunked.into());
        }

        Ok(Chunks {
            response: self,
            done: false,
        })
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        loop {
            let BodyReader::Chunked(dechunker) = &mut self.reader else {
                return Ok(None);
            };

            if dechunker.is_ended() {
                if self.is_closed() && self.decoder.is_none() {
                    return Ok(None);
                }
                let tail = self.end_body()?;
                return Ok((!tail.is_empty()).then_some(tail));
            }

            let Some(transport) = &self.transport else {
                return Ok(None);
            };

            let (used, chunk_done) = dechunker.parse_input(&self.buffer, &mut self.payload)?;
            self.buffer.drain(..used);

            if chunk_done {
                let payload = mem::take(&mut self.payload);
                trace!("Read chunk: {}", payload.len());

                let out = self.decode(payload)?;
                if !out.is_empty() {
                    return Ok(Some(out));
                }
                continue;
            }

            if used > 0 || dechunker.is_ended() {
                continue;
            }

            let input = lock(transport).receive(self.block_size)?;

            if input.is_empty() {
                debug!("Chunked body truncated");
                self.release();
                return Err(ChunkError::Truncated.into());
            }

            self.buffer.extend_from_slice(&input);
        }
    }

    fn decode(&mut self, input: Vec<u8>) -> Result<Vec<u8>, Error> {
        match &mut self.decoder {
            Some(d) => d.decompress(&input),
            None => Ok(input),
        }
    }

    /// Body is complete. Gives back the decoder tail, if any.
    fn end_body(&mut self) -> Result<Vec<u8>, Error> {
        self.release();
        match self.decoder.take() {
            Some(mut d) => d.finish(),
            None => Ok(vec![]),
        }
    }

    fn release(&mut self) {
        if self.transport.take().is_some() {
            trace!("Response released transport");
        }
    }

    /// Stop using the transport. Further reads return nothing.
    pub fn close(&mut self) {
        self.release();
        self.decoder = None;
        self.buffer.clear();
        self.payload.clear();
    }

    /// Run `f` with this response, then close it, also when `f` panics.
    pub fn scope<T>(&mut self, f: impl FnOnce(&mut Response) -> T) -> T {
        struct CloseOnDrop<'a>(&'a mut Response);

        impl Drop for CloseOnDrop<'_> {
            fn drop(&mut self) {
                self.0.close();
            }
        }

        let guard = CloseOnDrop(self);
        f(&mut *guard.0)
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        self.release();
    }
}

/// Decoded chunks of a chunked response. See [`Response::read_chunked()`].
pub struct Chunks<'a> {
    response: &'a mut Response,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.response.next_chunk() {
            Ok(Some(v)) => Some(Ok(v)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("version", &self.version)
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("body", &self.reader)
            .field("closed", &self.is_closed())
            .finish()
    }
}
