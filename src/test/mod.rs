use std::io::Write;

use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;

pub(crate) mod scenario;

mod test_connection;



trait TestSliceExt {
    fn as_str(&self) -> &str;
}

impl TestSliceExt for [u8] {
    fn as_str(&self) -> &str {
        std::str::from_utf8(self).unwrap()
    }
}

fn gzip(v: &[u8]) -> Vec<u8> {
    let mut e = GzEncoder::new(vec![], Compression::default());
    e.write_all(v).unwrap();
    e.finish().unwrap()
}

fn zlib(v: &[u8]) -> Vec<u8> {
    let mut e = ZlibEncoder::new(vec![], Compression::default());
    e.write_all(v).unwrap();
    e.finish().unwrap()
}

fn raw_deflate(v: &[u8]) -> Vec<u8> {
    let mut e = DeflateEncoder::new(vec![], Compression::default());
    e.write_all(v).unwrap();
    e.finish().unwrap()
}

/// Chunk encode `data` in pieces of `size`.
fn chunked(data: &[u8], size: usize) -> Vec<u8> {
    let mut out = vec![];
    for piece in data.chunks(size) {
        write!(out, "{:x}\r\n", piece.len()).unwrap();
        out.extend_from_slice(piece);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

/// Response head followed by `body`.
fn response(head: &str, body: &[u8]) -> Vec<u8> {
    let mut out = head.as_bytes().to_vec();
    out.extend_from_slice(body);
    out
}
