use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("body must be bytes, not text")]
    InvalidBodyType,

    #[error("connection reset before end of body")]
    ConnectionReset,

    #[error("chunked decode: {0}")]
    ChunkedDecode(#[from] ChunkError),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("no transport attached")]
    NotConnected,

    #[error("bad host or port: {0}")]
    BadHostPort(String),

    #[error("content-length header not a number")]
    BadContentLengthHeader,

    #[error("unsupported http version")]
    UnsupportedVersion,

    #[error("stream ended before complete response head")]
    IncompleteResponse,

    #[error("response has too many headers")]
    TooManyHeaders,

    #[error("http parse fail: {0}")]
    HttpParseFail(String),

    #[error("decompress: {0}")]
    Decompress(io::Error),
}

/// Problems with chunked transfer coding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    #[error("response is not chunked")]
    NotChunked,

    #[error("chunked body must be read with read_chunked()")]
    ReadNotSupported,

    #[error("chunk length is not ascii")]
    ChunkLenNotAscii,

    #[error("chunk length cannot be read as a number")]
    ChunkLenNotANumber,

    #[error("chunk expected crlf as next character")]
    ChunkExpectedCrLf,

    #[error("stream ended in the middle of a chunk")]
    Truncated,
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        match value {
            httparse::Error::TooManyHeaders => Error::TooManyHeaders,
            httparse::Error::Version => Error::UnsupportedVersion,
            _ => Error::HttpParseFail(value.to_string()),
        }
    }
}

impl Error {
    /// Tell if this error is a chunked transfer coding problem.
    pub fn is_chunked_decode(&self) -> bool {
        matches!(self, Error::ChunkedDecode(_))
    }
}
