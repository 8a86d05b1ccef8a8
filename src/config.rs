use std::time::Duration;

use crate::parser::HeadParser;

/// Max number of headers to parse from an HTTP response
pub const MAX_RESPONSE_HEADERS: usize = 128;

/// Default max bytes asked of the transport per receive.
pub const DEFAULT_RECEIVE_BLOCK_SIZE: usize = 4096;

/// Default max bytes per send when streaming a body source.
pub const DEFAULT_SEND_BLOCK_SIZE: usize = 8192;

/// Settings for a [`Connection`](crate::Connection).
///
/// ```
/// # use h1wire::{Config, HeadParser};
/// let config = Config::new()
///     .port(8080)
///     .parser(HeadParser::Lines);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) port: Option<u16>,
    pub(crate) secure: Option<bool>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) parser: HeadParser,
    pub(crate) max_headers: usize,
    pub(crate) receive_block_size: usize,
    pub(crate) send_block_size: usize,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Port, overriding any `:port` in the host string.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Whether the transport is TLS. Defaults to `port == 443`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Timeout for the caller to apply when setting up the transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn parser(mut self, parser: HeadParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn max_headers(mut self, max: usize) -> Self {
        self.max_headers = max;
        self
    }

    pub fn receive_block_size(mut self, size: usize) -> Self {
        self.receive_block_size = size.max(1);
        self
    }

    pub fn send_block_size(mut self, size: usize) -> Self {
        self.send_block_size = size.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            secure: None,
            timeout: None,
            parser: HeadParser::default(),
            max_headers: MAX_RESPONSE_HEADERS,
            receive_block_size: DEFAULT_RECEIVE_BLOCK_SIZE,
            send_block_size: DEFAULT_SEND_BLOCK_SIZE,
        }
    }
}
