use std::str;

use http::Version;

use crate::header::Headers;
use crate::transport::Transport;
use crate::Error;

/// Which parser reads the status line and header block.
///
/// Both produce the same [`Head`] for the same input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadParser {
    /// Block reads parsed with `httparse`. Input read past the header block is
    /// kept as the start of the body.
    #[default]
    Httparse,
    /// Line by line via [`Transport::receive_line`]. Never reads past the
    /// header block.
    Lines,
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Head {
    pub version: Version,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl HeadParser {
    /// Read a response head. Returns the head and any body bytes read ahead.
    pub(crate) fn read_head(
        &self,
        transport: &mut dyn Transport,
        max_headers: usize,
        block_size: usize,
    ) -> Result<(Head, Vec<u8>), Error> {
        match self {
            HeadParser::Httparse => read_httparse(transport, max_headers, block_size),
            HeadParser::Lines => read_lines(transport, max_headers).map(|h| (h, vec![])),
        }
    }
}

fn read_httparse(
    transport: &mut dyn Transport,
    max_headers: usize,
    block_size: usize,
) -> Result<(Head, Vec<u8>), Error> {
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let input = transport.receive(block_size)?;
        if input.is_empty() {
            return Err(Error::IncompleteResponse);
        }
        buf.extend_from_slice(&input);

        // The header slots borrow from buf, which grows between attempts.
        let mut headers = vec![httparse::EMPTY_HEADER; max_headers];
        let mut res = httparse::Response::new(&mut headers);

        let used = match res.parse(&buf)? {
            httparse::Status::Complete(v) => v,
            httparse::Status::Partial => continue,
        };

        let version = match res.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            _ => return Err(Error::UnsupportedVersion),
        };

        // Both are set on a complete parse.
        let status = res.code.ok_or(Error::IncompleteResponse)?;
        let reason = res.reason.unwrap_or("").to_string();

        let headers = res
            .headers
            .iter()
            .map(|h| (h.name, h.value))
            .collect::<Headers>();

        let head = Head {
            version,
            status,
            reason,
            headers,
        };

        let rest = buf[used..].to_vec();
        trace!("Head parsed, read ahead: {}", rest.len());

        return Ok((head, rest));
    }
}

fn read_lines(transport: &mut dyn Transport, max_headers: usize) -> Result<Head, Error> {
    let line = read_line(transport)?;
    let (version, status, reason) = parse_status_line(&line)?;

    let mut headers = Headers::new();

    loop {
        let line = read_line(transport)?;
        if line.is_empty() {
            break;
        }

        if headers.len() == max_headers {
            return Err(Error::TooManyHeaders);
        }

        let (name, value) = parse_header_line(&line)?;
        headers.append(name, value);
    }

    Ok(Head {
        version,
        status,
        reason,
        headers,
    })
}

/// One line without the line end. A line must end with `\n`.
fn read_line(transport: &mut dyn Transport) -> Result<Vec<u8>, Error> {
    let mut line = transport.receive_line()?;

    if line.last() != Some(&b'\n') {
        return Err(Error::IncompleteResponse);
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    Ok(line)
}

fn parse_status_line(line: &[u8]) -> Result<(Version, u16, String), Error> {
    let fail = || Error::HttpParseFail(String::from_utf8_lossy(line).into_owned());

    let s = str::from_utf8(line).map_err(|_| fail())?;
    let mut parts = s.splitn(3, ' ');

    let version = match parts.next() {
        Some("HTTP/1.0") => Version::HTTP_10,
        Some("HTTP/1.1") => Version::HTTP_11,
        Some(v) if v.starts_with("HTTP/") => return Err(Error::UnsupportedVersion),
        _ => return Err(fail()),
    };

    let status = parts
        .next()
        .filter(|c| c.len() == 3 && c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(fail)?;

    let reason = parts.next().unwrap_or("").to_string();

    Ok((version, status, reason))
}

fn parse_header_line(line: &[u8]) -> Result<(String, &[u8]), Error> {
    let fail = || Error::HttpParseFail(String::from_utf8_lossy(line).into_owned());

    let colon = line.iter().position(|c| *c == b':').ok_or_else(fail)?;

    let name = str::from_utf8(&line[..colon]).map_err(|_| fail())?;
    if name.is_empty() || name.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(fail());
    }

    Ok((name.to_string(), trim_ows(&line[colon + 1..])))
}

fn trim_ows(mut v: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = v {
        v = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = v {
        v = rest;
    }
    v
}
