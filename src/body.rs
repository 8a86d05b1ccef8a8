use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

use http::Method;

use crate::chunk::{write_chunk, Dechunker, CHUNK_END};
use crate::header::Headers;
use crate::out::Out;
use crate::transport::Transport;
use crate::util::has_token;
use crate::Error;

/// A request body.
pub enum Body<'a> {
    /// Bytes of a known length.
    Bytes(&'a [u8]),
    /// Text is never a valid body. Encode it to bytes first.
    Text(&'a str),
    /// A readable source with a known length, such as a file.
    Source(&'a mut dyn Source),
    /// Segments of unknown total length.
    Producer(Box<dyn Iterator<Item = Segment> + 'a>),
}

impl<'a> Body<'a> {
    /// Body from anything iterating segments.
    ///
    /// ```
    /// # use h1wire::Body;
    /// let body = Body::producer(vec![&b"hi"[..], &b"there"[..]]);
    /// ```
    pub fn producer<I>(iter: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: 'a,
        I::Item: Into<Segment> + 'a,
    {
        Body::Producer(Box::new(iter.into_iter().map(Into::into)))
    }
}

impl<'a> From<&'a [u8]> for Body<'a> {
    fn from(value: &'a [u8]) -> Self {
        Body::Bytes(value)
    }
}

impl<'a> From<&'a Vec<u8>> for Body<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Body::Bytes(value)
    }
}

impl<'a> From<&'a str> for Body<'a> {
    fn from(value: &'a str) -> Self {
        Body::Text(value)
    }
}

/// One unit produced by a [`Body::Producer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Bytes(Vec<u8>),
    /// Always rejected when reached.
    Text(String),
}

impl From<Vec<u8>> for Segment {
    fn from(value: Vec<u8>) -> Self {
        Segment::Bytes(value)
    }
}

impl From<&[u8]> for Segment {
    fn from(value: &[u8]) -> Self {
        Segment::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Segment {
    fn from(value: &[u8; N]) -> Self {
        Segment::Bytes(value.to_vec())
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::Text(value)
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::Text(value.to_string())
    }
}

impl Segment {
    fn into_bytes(self) -> Result<Vec<u8>, Error> {
        match self {
            Segment::Bytes(v) => Ok(v),
            Segment::Text(_) => Err(Error::InvalidBodyType),
        }
    }
}

/// A body source that knows its length up front.
///
/// Read line by line when sent with `transfer-encoding: chunked`.
pub trait Source: BufRead {
    /// Number of bytes left to read.
    fn length(&mut self) -> io::Result<u64>;

    /// Whether this source produces text rather than bytes. Text sources are
    /// rejected.
    fn is_text(&self) -> bool {
        false
    }
}

impl<T: AsRef<[u8]>> Source for io::Cursor<T> {
    fn length(&mut self) -> io::Result<u64> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()))
    }
}

impl Source for BufReader<File> {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().metadata()?.len())
    }
}

/// How the request body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyWriter {
    NoBody,
    /// The caller set `content-length`. The body is sent as is.
    Declared,
    /// Chunked transfer. `true` when we add the header ourselves.
    Chunked(bool),
    /// Length known from the body, we add `content-length`.
    Sized(u64),
}

impl BodyWriter {
    pub fn select(headers: &Headers, body: Option<&mut Body<'_>>) -> Result<Self, Error> {
        let Some(body) = body else {
            return Ok(BodyWriter::NoBody);
        };

        // Text is rejected before anything is written.
        match body {
            Body::Text(_) => return Err(Error::InvalidBodyType),
            Body::Source(s) if s.is_text() => return Err(Error::InvalidBodyType),
            _ => {}
        }

        if headers.contains("content-length") {
            return Ok(BodyWriter::Declared);
        }

        let has_chunked = headers
            .get_all("transfer-encoding")
            .filter_map(|v| std::str::from_utf8(v).ok())
            .any(|v| has_token(v, "chunked"));

        if has_chunked {
            return Ok(BodyWriter::Chunked(false));
        }

        let mode = match body {
            Body::Bytes(v) => BodyWriter::Sized(v.len() as u64),
            Body::Source(s) => BodyWriter::Sized(s.length()?),
            Body::Producer(_) => BodyWriter::Chunked(true),
            Body::Text(_) => return Err(Error::InvalidBodyType),
        };

        Ok(mode)
    }

    /// The framing header to add, if any.
    pub fn body_header(&self) -> Option<(&'static str, String)> {
        match self {
            BodyWriter::Sized(n) => Some(("content-length", n.to_string())),
            BodyWriter::Chunked(true) => Some(("transfer-encoding", "chunked".to_string())),
            _ => None,
        }
    }

    /// Write `body` after the prelude already in `out`.
    pub fn write(
        &self,
        body: Option<Body<'_>>,
        out: &mut Out,
        transport: &mut dyn Transport,
        block_size: usize,
    ) -> Result<(), Error> {
        let Some(body) = body else {
            return out.flush(transport);
        };

        match self {
            BodyWriter::NoBody => unreachable!("NoBody with a body"),
            BodyWriter::Declared => {
                // The whole body is collected first so a bad segment fails
                // before anything is sent.
                write_all(body, out.as_vec_mut())?;
                out.flush(transport)
            }
            BodyWriter::Sized(_) => match body {
                Body::Bytes(v) => {
                    out.write_bytes(v);
                    out.flush(transport)
                }
                Body::Source(s) => {
                    out.flush(transport)?;
                    send_source(s, transport, block_size)
                }
                _ => unreachable!("Sized from a body without length"),
            },
            BodyWriter::Chunked(_) => {
                out.flush(transport)?;
                send_chunked(body, transport)
            }
        }
    }
}

/// Append every byte of `body` to `buf`.
fn write_all(body: Body<'_>, buf: &mut Vec<u8>) -> Result<(), Error> {
    match body {
        Body::Bytes(v) => buf.extend_from_slice(v),
        Body::Text(_) => return Err(Error::InvalidBodyType),
        Body::Source(s) => {
            s.read_to_end(buf)?;
        }
        Body::Producer(p) => {
            for segment in p {
                buf.extend_from_slice(&segment.into_bytes()?);
            }
        }
    }
    Ok(())
}

fn send_source(
    source: &mut dyn Source,
    transport: &mut dyn Transport,
    block_size: usize,
) -> Result<(), Error> {
    let mut block = vec![0; block_size.max(1)];
    loop {
        let n = match source.read(&mut block) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            break;
        }
        trace!("Send source block: {}", n);
        transport.send(&block[..n])?;
    }
    Ok(())
}

/// Send each natural unit of the body as one chunk, then the end chunk.
fn send_chunked(body: Body<'_>, transport: &mut dyn Transport) -> Result<(), Error> {
    let mut buf = Vec::new();

    match body {
        Body::Bytes(v) => send_chunk(&mut buf, v, transport)?,
        Body::Text(_) => return Err(Error::InvalidBodyType),
        Body::Source(s) => {
            let mut line = Vec::new();
            loop {
                line.clear();
                if s.read_until(b'\n', &mut line)? == 0 {
                    break;
                }
                send_chunk(&mut buf, &line, transport)?;
            }
        }
        Body::Producer(p) => {
            for segment in p {
                // Earlier segments might already be sent when this fails.
                send_chunk(&mut buf, &segment.into_bytes()?, transport)?;
            }
        }
    }

    transport.send(CHUNK_END)?;
    Ok(())
}

fn send_chunk(buf: &mut Vec<u8>, data: &[u8], transport: &mut dyn Transport) -> Result<(), Error> {
    if data.is_empty() {
        return Ok(());
    }
    trace!("Send chunk: {}", data.len());
    buf.clear();
    write_chunk(buf, data);
    transport.send(buf)?;
    Ok(())
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(v) => f.debug_tuple("Bytes").field(&v.len()).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(&v.len()).finish(),
            Self::Source(_) => write!(f, "Source"),
            Self::Producer(_) => write!(f, "Producer"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyReader {
    /// No body is expected either due to the status or method.
    NoBody,
    /// Delimited by content-length.
    /// The value is what's left to receive.
    LengthDelimited(u64),
    /// Chunked transfer encoding
    Chunked(Dechunker),
    /// Expect remote to close at end of body.
    CloseDelimited,
}

impl BodyReader {
    pub fn for_response(
        method: Option<&Method>,
        status_code: u16,
        headers: &Headers,
    ) -> Result<Self, Error> {
        let is_informational = (100..=199).contains(&status_code);

        let has_no_body =
            // https://datatracker.ietf.org/doc/html/rfc2616#section-4.3
            // All responses to the HEAD request method
            // MUST NOT include a message-body, even though the presence of entity-
            // header fields might lead one to believe they do.
            method == Some(&Method::HEAD) ||
            // All 1xx (informational), 204 (no content), and 304 (not modified) responses
            // MUST NOT include a message-body.
            is_informational ||
            matches!(status_code, 204 | 304);

        if has_no_body {
            return Ok(Self::NoBody);
        }

        // https://datatracker.ietf.org/doc/html/rfc2616#section-4.3
        // All other responses do include a message-body, although it MAY be of zero length.
        Self::header_defined(headers)
    }

    pub fn header_defined(headers: &Headers) -> Result<Self, Error> {
        let mut content_length: Option<u64> = None;

        for value in headers.get_all("content-length") {
            let v = std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .ok_or(Error::BadContentLengthHeader)?;

            // Repeated headers are only ok if they agree.
            if content_length.map(|c| c != v).unwrap_or(false) {
                return Err(Error::BadContentLengthHeader);
            }
            content_length = Some(v);
        }

        // Header can repeat, stop looking if we found "chunked"
        let chunked = headers
            .get_all("transfer-encoding")
            .filter_map(|v| std::str::from_utf8(v).ok())
            .any(|v| has_token(v, "chunked"));

        if chunked {
            // https://datatracker.ietf.org/doc/html/rfc2616#section-4.4
            // Messages MUST NOT include both a Content-Length header field and a
            // non-identity transfer-coding. If the message does include a non-
            // identity transfer-coding, the Content-Length MUST be ignored.
            return Ok(Self::Chunked(Dechunker::new()));
        }

        if let Some(len) = content_length {
            return Ok(Self::LengthDelimited(len));
        }

        Ok(Self::CloseDelimited)
    }

    /// How much more input this body may take. `None` is unlimited.
    pub fn left(&self) -> Option<u64> {
        match self {
            BodyReader::NoBody => Some(0),
            BodyReader::LengthDelimited(v) => Some(*v),
            BodyReader::Chunked(_) => None,
            BodyReader::CloseDelimited => None,
        }
    }

    /// Account for `amount` bytes of body read from the transport.
    pub fn consume(&mut self, amount: usize) {
        if let BodyReader::LengthDelimited(left) = self {
            *left = left.saturating_sub(amount as u64);
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, BodyReader::Chunked(_))
    }

    pub fn is_ended(&self) -> bool {
        match self {
            BodyReader::NoBody => true,
            BodyReader::LengthDelimited(v) => *v == 0,
            BodyReader::Chunked(v) => v.is_ended(),
            BodyReader::CloseDelimited => false,
        }
    }
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBody => write!(f, "NoBody"),
            Self::LengthDelimited(arg0) => f.debug_tuple("LengthDelimited").field(arg0).finish(),
            Self::Chunked(_) => write!(f, "Chunked"),
            Self::CloseDelimited => write!(f, "CloseDelimited"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn select_without_body() -> Result<(), Error> {
        let h = Headers::from([("content-length", "10")]);
        assert_eq!(BodyWriter::select(&h, None)?, BodyWriter::NoBody);
        Ok(())
    }

    #[test]
    fn select_sized_bytes() -> Result<(), Error> {
        let mut body = Body::Bytes(b"hello");
        let mode = BodyWriter::select(&Headers::new(), Some(&mut body))?;
        assert_eq!(mode, BodyWriter::Sized(5));
        assert_eq!(
            mode.body_header(),
            Some(("content-length", "5".to_string()))
        );
        Ok(())
    }

    #[test]
    fn select_declared_wins() -> Result<(), Error> {
        let h = Headers::from([
            ("Transfer-Encoding", "chunked"),
            ("Content-Length", "3"),
        ]);
        let mut body = Body::producer(vec![b"abc"]);
        let mode = BodyWriter::select(&h, Some(&mut body))?;
        assert_eq!(mode, BodyWriter::Declared);
        assert_eq!(mode.body_header(), None);
        Ok(())
    }

    #[test]
    fn select_caller_chunked() -> Result<(), Error> {
        let h = Headers::from([("Transfer-Encoding", "gzip, chunked")]);
        let mut body = Body::Bytes(b"hello");
        let mode = BodyWriter::select(&h, Some(&mut body))?;
        assert_eq!(mode, BodyWriter::Chunked(false));
        assert_eq!(mode.body_header(), None);
        Ok(())
    }

    #[test]
    fn producer_of_borrowed_segments() -> Result<(), Error> {
        let lines = vec![b"one".to_vec(), b"two".to_vec()];
        let mut body = Body::producer(lines.iter().map(|l| l.as_slice()));
        let mode = BodyWriter::select(&Headers::new(), Some(&mut body))?;
        assert_eq!(mode, BodyWriter::Chunked(true));

        let Body::Producer(p) = body else {
            unreachable!("producer body");
        };
        let segments: Vec<_> = p.collect();
        assert_eq!(segments, vec![Segment::from(&b"one"[..]), Segment::from(&b"two"[..])]);
        Ok(())
    }

    #[test]
    fn select_producer() -> Result<(), Error> {
        let mut body = Body::producer(vec![b"abc"]);
        let mode = BodyWriter::select(&Headers::new(), Some(&mut body))?;
        assert_eq!(mode, BodyWriter::Chunked(true));
        assert_eq!(
            mode.body_header(),
            Some(("transfer-encoding", "chunked".to_string()))
        );
        Ok(())
    }

    #[test]
    fn select_source_length() -> Result<(), Error> {
        let mut cursor = io::Cursor::new(b"some binary data".to_vec());
        let mut body = Body::Source(&mut cursor);
        let mode = BodyWriter::select(&Headers::new(), Some(&mut body))?;
        assert_eq!(mode, BodyWriter::Sized(16));
        Ok(())
    }

    #[test]
    fn select_text() {
        let mut body = Body::Text("hi");
        let err = BodyWriter::select(&Headers::new(), Some(&mut body)).unwrap_err();
        assert!(matches!(err, Error::InvalidBodyType));
    }

    #[test]
    fn reader_chunked_beats_length() -> Result<(), Error> {
        let h = Headers::from([("Content-Length", "10"), ("Transfer-Encoding", "chunked")]);
        let r = BodyReader::header_defined(&h)?;
        assert!(r.is_chunked());
        Ok(())
    }

    #[test]
    fn reader_modes() -> Result<(), Error> {
        let h = Headers::from([("Content-Length", "10")]);
        assert_eq!(
            BodyReader::header_defined(&h)?,
            BodyReader::LengthDelimited(10)
        );

        let h = Headers::from([("Connection", "close")]);
        assert_eq!(BodyReader::header_defined(&h)?, BodyReader::CloseDelimited);

        let h = Headers::from([("Content-Length", "10")]);
        let r = BodyReader::for_response(Some(&Method::HEAD), 200, &h)?;
        assert_eq!(r, BodyReader::NoBody);

        let r = BodyReader::for_response(Some(&Method::GET), 304, &h)?;
        assert_eq!(r, BodyReader::NoBody);
        Ok(())
    }

    #[test]
    fn reader_bad_content_length() {
        let h = Headers::from([("Content-Length", "ten")]);
        let err = BodyReader::header_defined(&h).unwrap_err();
        assert!(matches!(err, Error::BadContentLengthHeader));

        let h = Headers::from([("Content-Length", "10"), ("Content-Length", "11")]);
        let err = BodyReader::header_defined(&h).unwrap_err();
        assert!(matches!(err, Error::BadContentLengthHeader));
    }
}
