#![no_main]

use std::io;

use h1wire::http::Method;
use h1wire::{Connection, Headers, Transport};
use libfuzzer_sys::fuzz_target;

const HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";

/// Serves the input in small irregular pieces.
struct Input {
    data: Vec<u8>,
    pos: usize,
}

impl Transport for Input {
    fn send(&mut self, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn receive(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let step = 1 + self.pos % 5;
        let n = (self.data.len() - self.pos).min(max_len).min(step);
        let out = self.data[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    fn receive_line(&mut self) -> io::Result<Vec<u8>> {
        let rest = &self.data[self.pos..];
        let n = rest
            .iter()
            .position(|c| *c == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let out = rest[..n].to_vec();
        self.pos += n;
        Ok(out)
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut input = HEAD.to_vec();
    input.extend_from_slice(data);

    let mut conn = Connection::new("fuzz.test").unwrap();
    conn.attach(Input {
        data: input,
        pos: 0,
    });

    conn.request(Method::GET, "/", &Headers::new(), None).unwrap();

    let Ok(mut response) = conn.get_response() else {
        return;
    };

    if let Ok(chunks) = response.read_chunked() {
        for chunk in chunks {
            if chunk.is_err() {
                break;
            }
        }
    }
});
