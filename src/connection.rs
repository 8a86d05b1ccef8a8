use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::Method;

use crate::body::{Body, BodyWriter};
use crate::config::Config;
use crate::header::Headers;
use crate::out::Out;
use crate::response::Response;
use crate::transport::{lock, SharedTransport, Transport};
use crate::Error;

/// A client connection to one host.
///
/// The connection does not open sockets. The caller attaches a [`Transport`]
/// that is already connected (and TLS wrapped when [`Connection::secure()`]).
///
/// ```
/// # use h1wire::{Connection, Headers, Body};
/// # use h1wire::http::Method;
/// # fn run<T: h1wire::Transport + Send + 'static>(t: T) -> Result<(), h1wire::Error> {
/// let mut conn = Connection::new("example.com")?;
/// conn.attach(t);
///
/// let headers = Headers::from([("User-Agent", "h1wire")]);
/// conn.request(Method::GET, "/", &headers, None)?;
///
/// let mut response = conn.get_response()?;
/// let body = response.read_all()?;
/// # Ok(()) }
/// ```
pub struct Connection {
    host: String,
    port: u16,
    secure: bool,
    config: Config,
    transport: Option<SharedTransport>,
    last_method: Option<Method>,
}

impl Connection {
    /// Connection for `host`, optionally with a `:port` suffix.
    pub fn new(host: &str) -> Result<Self, Error> {
        Connection::with_config(host, Config::default())
    }

    pub fn with_config(host: &str, config: Config) -> Result<Self, Error> {
        let (name, inline_port) = split_host_port(host)?;

        let port = config.port.or(inline_port).unwrap_or(80);
        if port == 0 {
            return Err(Error::BadHostPort(host.to_string()));
        }

        let secure = config.secure.unwrap_or(port == 443);

        debug!("Connection {}:{} secure: {}", name, port, secure);

        Ok(Connection {
            host: name.to_string(),
            port,
            secure,
            config,
            transport: None,
            last_method: None,
        })
    }

    /// Host name without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Timeout for the caller to use when setting up the transport.
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Use `transport` for the following requests. Replaces any previous one.
    pub fn attach<T: Transport + Send + 'static>(&mut self, transport: T) {
        self.transport = Some(Arc::new(Mutex::new(transport)));
    }

    /// Forget the transport without closing it. A live [`Response`] keeps
    /// its reference.
    pub fn detach(&mut self) {
        self.transport = None;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Close and forget the transport.
    pub fn close(&mut self) -> Result<(), Error> {
        if let Some(transport) = self.transport.take() {
            debug!("Close connection {}", self.host);
            lock(&transport).close()?;
        }
        Ok(())
    }

    /// Send a request.
    ///
    /// The caller's headers are sent first, in order and with their casing.
    /// Then follows the body framing header, unless the caller set
    /// `content-length` or `transfer-encoding: chunked`, and last `host`,
    /// unless the caller set it.
    ///
    /// Bodies of known length get `content-length`. A [`Body::Producer`]
    /// is sent chunked. When the caller sets `content-length`, the body is
    /// sent as is without checking it matches.
    pub fn request(
        &mut self,
        method: Method,
        path: &str,
        headers: &Headers,
        body: Option<Body<'_>>,
    ) -> Result<(), Error> {
        let transport = self.transport.as_ref().ok_or(Error::NotConnected)?;

        let mut body = body;
        let writer = BodyWriter::select(headers, body.as_mut())?;

        debug!("{} {} body: {:?}", method, path, writer);

        let mut out = Out::new();
        out.write_send_line(&method, path);

        for (name, value) in headers.iter() {
            out.write_header(name, value);
        }

        if let Some((name, value)) = writer.body_header() {
            out.write_header(name, value.as_bytes());
        }

        if !headers.contains("host") {
            out.write_header("host", self.host_header().as_bytes());
        }

        out.end_head();

        self.last_method = Some(method);

        let mut t = lock(transport);
        writer.write(body, &mut out, &mut *t, self.config.send_block_size)
    }

    /// Read the response to the last request.
    pub fn get_response(&mut self) -> Result<Response, Error> {
        let transport = self.transport.as_ref().ok_or(Error::NotConnected)?;

        let (head, read_ahead) = {
            let mut t = lock(transport);
            self.config.parser.read_head(
                &mut *t,
                self.config.max_headers,
                self.config.receive_block_size,
            )?
        };

        Response::new(
            head,
            self.last_method.as_ref(),
            Some(transport.clone()),
            read_ahead,
            self.config.receive_block_size,
        )
    }

    fn host_header(&self) -> String {
        let default_port = if self.secure { 443 } else { 80 };

        if self.port == default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Split `host:port`. IPv6 addresses need brackets to carry a port.
fn split_host_port(host: &str) -> Result<(&str, Option<u16>), Error> {
    let bad = || Error::BadHostPort(host.to_string());

    let port_at = if host.starts_with('[') {
        let end = host.find(']').ok_or_else(bad)?;
        match &host[end + 1..] {
            "" => None,
            rest if rest.starts_with(':') => Some(end + 1),
            _ => return Err(bad()),
        }
    } else {
        match host.matches(':').count() {
            0 => None,
            1 => host.find(':'),
            // Bare IPv6 address.
            _ => None,
        }
    };

    let Some(i) = port_at else {
        if host.is_empty() {
            return Err(bad());
        }
        return Ok((host, None));
    };

    let name = &host[..i];
    let port = host[i + 1..].parse::<u16>().map_err(|_| bad())?;

    if name.is_empty() || port == 0 {
        return Err(bad());
    }

    Ok((name, Some(port)))
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_host_port() -> Result<(), Error> {
        assert_eq!(split_host_port("example.com")?, ("example.com", None));
        assert_eq!(split_host_port("example.com:8080")?, ("example.com", Some(8080)));
        assert_eq!(split_host_port("[::1]:443")?, ("[::1]", Some(443)));
        assert_eq!(split_host_port("[::1]")?, ("[::1]", None));
        assert_eq!(split_host_port("::1")?, ("::1", None));

        assert!(split_host_port("example.com:http").is_err());
        assert!(split_host_port("example.com:0").is_err());
        assert!(split_host_port("example.com:70000").is_err());
        assert!(split_host_port(":80").is_err());
        assert!(split_host_port("").is_err());
        Ok(())
    }
}
