//! Blocking http 1.1 client wire protocol.
//!
//! Writes requests to, and reads responses from, a caller supplied
//! [`Transport`]. Connecting sockets, TLS, pooling and redirects are up to the
//! caller.
//!
//! Request bodies are framed with `content-length` when the length is known
//! up front, otherwise with `transfer-encoding: chunked`. Response bodies are
//! delimited by `content-length`, chunked transfer coding or connection
//! close, and `gzip`/`deflate` content encoding is reversed transparently.

#[macro_use]
extern crate log;

// Re-export the basis for this library.
pub use http;

mod error;
pub use error::{ChunkError, Error};

mod chunk;
mod out;
mod util;

mod header;
pub use header::Headers;

mod transport;
pub use transport::{Stream, Transport};

mod body;
pub use body::{Body, Segment, Source};

mod parser;
pub use parser::HeadParser;

mod config;
pub use config::{Config, DEFAULT_RECEIVE_BLOCK_SIZE, DEFAULT_SEND_BLOCK_SIZE};
pub use config::MAX_RESPONSE_HEADERS;

mod decompress;

mod response;
pub use response::{Chunks, Response};

mod connection;
pub use connection::Connection;

#[cfg(test)]
mod test;
