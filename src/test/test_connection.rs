use std::time::Duration;

use http::Method;

use super::scenario::Scenario;
use super::TestSliceExt;
use crate::{Body, Config, Connection, Error, Headers};

#[test]
fn identity() -> Result<(), Error> {
    let c = Connection::new("http2bin.org")?;
    assert_eq!(c.host(), "http2bin.org");
    assert_eq!(c.port(), 80);
    assert!(!c.secure());

    let c = Connection::new("http2bin.org:443")?;
    assert_eq!(c.host(), "http2bin.org");
    assert_eq!(c.port(), 443);
    assert!(c.secure());

    let c = Connection::with_config("localhost", Config::new().port(8080))?;
    assert_eq!(c.port(), 8080);
    assert!(!c.secure());

    let c = Connection::with_config("localhost", Config::new().port(443).secure(false))?;
    assert_eq!(c.port(), 443);
    assert!(!c.secure());
    Ok(())
}

#[test]
fn explicit_port_wins() -> Result<(), Error> {
    let c = Connection::with_config("localhost:443", Config::new().port(8443))?;
    assert_eq!(c.port(), 8443);
    assert!(!c.secure());
    Ok(())
}

#[test]
fn bad_port() {
    let err = Connection::new("localhost:notaport").unwrap_err();
    assert!(matches!(err, Error::BadHostPort(_)));

    let err = Connection::with_config("localhost", Config::new().port(0)).unwrap_err();
    assert!(matches!(err, Error::BadHostPort(_)));
}

#[test]
fn timeout_is_kept() -> Result<(), Error> {
    let c = Connection::with_config(
        "localhost",
        Config::new().timeout(Duration::from_secs(5)),
    )?;
    assert_eq!(c.timeout(), Some(Duration::from_secs(5)));

    let c = Connection::new("localhost")?;
    assert_eq!(c.timeout(), None);
    Ok(())
}

#[test]
fn close_closes_transport() -> Result<(), Error> {
    let s = Scenario::new("");
    let mut conn = s.connect("http2bin.org");
    assert!(conn.is_connected());

    conn.close()?;
    assert!(s.is_closed());
    assert!(!conn.is_connected());

    let err = conn
        .request(Method::GET, "/", &Headers::new(), None)
        .unwrap_err();
    assert!(matches!(err, Error::NotConnected));

    let err = conn.get_response().unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    Ok(())
}

#[test]
fn detach_keeps_response_reading() -> Result<(), Error> {
    let s = Scenario::new("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").block_size(2);
    let mut conn = s.connect_with("http2bin.org", Config::new().parser(crate::HeadParser::Lines));

    conn.request(Method::GET, "/", &Headers::new(), None)?;
    let mut r = conn.get_response()?;

    conn.detach();
    assert!(!conn.is_connected());

    assert_eq!(r.read_all()?, b"hello");
    assert!(!s.is_closed());
    Ok(())
}

#[test]
fn keep_alive() -> Result<(), Error> {
    let s = Scenario::new(
        "HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\none\
        HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\ntwo",
    );
    let mut conn = s.connect_with("http2bin.org", Config::new().parser(crate::HeadParser::Lines));

    conn.request(Method::GET, "/1", &Headers::new(), None)?;
    let mut r = conn.get_response()?;
    assert_eq!(r.read_all()?, b"one");

    conn.request(Method::POST, "/2", &Headers::new(), Some(Body::Bytes(b"x")))?;
    let mut r = conn.get_response()?;
    assert_eq!(r.read_all()?, b"two");

    assert_eq!(
        s.sent().as_str(),
        "GET /1 HTTP/1.1\r\nhost: http2bin.org\r\n\r\n\
        POST /2 HTTP/1.1\r\ncontent-length: 1\r\nhost: http2bin.org\r\n\r\nx"
    );
    Ok(())
}

#[test]
fn stream_transport() -> Result<(), Error> {
    use std::io::{self, Read, Write};

    struct Duplex {
        input: io::Cursor<Vec<u8>>,
        output: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let output = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
    let duplex = Duplex {
        input: io::Cursor::new(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n".to_vec(),
        ),
        output: output.clone(),
    };

    let mut conn = Connection::new("localhost:8080")?;
    conn.attach(crate::Stream::new(duplex));

    conn.request(Method::GET, "/", &Headers::new(), None)?;
    let mut r = conn.get_response()?;

    let chunks: Vec<_> = r.read_chunked()?.collect::<Result<_, _>>()?;
    assert_eq!(chunks, vec![b"abc".to_vec()]);

    assert_eq!(
        output.lock().unwrap().as_str(),
        "GET / HTTP/1.1\r\nhost: localhost:8080\r\n\r\n"
    );
    Ok(())
}
