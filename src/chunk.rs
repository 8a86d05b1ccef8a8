use std::io::Write;
use std::str;

use crate::util::find_crlf;
use crate::ChunkError;

/// Terminating zero-length chunk with an empty trailer.
pub(crate) const CHUNK_END: &[u8] = b"0\r\n\r\n";

/// Append `data` as one chunk. An empty `data` writes nothing since a
/// zero-length chunk ends the body.
pub(crate) fn write_chunk(out: &mut Vec<u8>, data: &[u8]) {
    if data.is_empty() {
        return;
    }

    // Writing to a Vec can't fail.
    let _ = write!(out, "{:x}\r\n", data.len());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dechunker {
    Size,
    Chunk(usize),
    CrLf,
    Ending,
    Trailer,
    Ended,
}

#[derive(Debug)]
struct Pos {
    index_in: usize,
    chunk_done: bool,
}

// Max length of the hex digits in a size line.
const SANITY_CHECK: usize = 20;

impl Dechunker {
    pub fn new() -> Self {
        Dechunker::Size
    }

    /// Decode as much of `src` as possible, appending payload to `dst`.
    ///
    /// Stops at every chunk boundary. Returns how much of `src` was used and
    /// whether a chunk was completed.
    pub fn parse_input(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(usize, bool), ChunkError> {
        let mut pos = Pos {
            index_in: 0,
            chunk_done: false,
        };

        loop {
            let more = match self {
                Dechunker::Size => self.read_size(src, &mut pos)?,
                Dechunker::Chunk(_) => self.read_data(src, dst, &mut pos),
                Dechunker::CrLf => self.expect_crlf(src, &mut pos)?,
                Dechunker::Ending => self.trailer_or_ended(src, &mut pos),
                Dechunker::Trailer => self.trailer(src, &mut pos),
                Dechunker::Ended => false,
            };

            if !more {
                break;
            }
        }

        Ok((pos.index_in, pos.chunk_done))
    }

    #[cfg(test)]
    fn left(&self) -> usize {
        if let Self::Chunk(l) = self {
            *l
        } else {
            0
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    fn read_size(&mut self, src: &[u8], pos: &mut Pos) -> Result<bool, ChunkError> {
        let src = &src[pos.index_in..];

        let maybe_meta = src.iter().position(|c| *c == b';');

        let i = match find_crlf(src) {
            Some(v) => v,
            None => {
                // Without a line end we can still tell a hopeless size line.
                if maybe_meta.unwrap_or(src.len()) > SANITY_CHECK {
                    return Err(ChunkError::ChunkExpectedCrLf);
                }
                return Ok(false);
            }
        };

        // Anything after ; is a chunk extension, which we ignore.
        let len_end = maybe_meta.unwrap_or(i).min(i);

        if len_end > SANITY_CHECK {
            return Err(ChunkError::ChunkExpectedCrLf);
        }

        let len_str = str::from_utf8(&src[..len_end])
            .map_err(|_| ChunkError::ChunkLenNotAscii)?
            .trim();

        let len = usize::from_str_radix(len_str, 16).map_err(|_| ChunkError::ChunkLenNotANumber)?;

        trace!("Chunk size: {}", len);

        pos.index_in += i + 2;
        *self = if len == 0 {
            Self::Ending
        } else {
            Self::Chunk(len)
        };

        Ok(true)
    }

    fn read_data(&mut self, src: &[u8], dst: &mut Vec<u8>, pos: &mut Pos) -> bool {
        let src = &src[pos.index_in..];

        let left = match self {
            Self::Chunk(v) => v,
            _ => unreachable!(),
        };

        // Read the smallest amount of input or length left of chunk.
        let to_read = src.len().min(*left);

        dst.extend_from_slice(&src[..to_read]);
        pos.index_in += to_read;
        *left -= to_read;

        if *left == 0 {
            *self = Self::CrLf;
        }

        to_read > 0
    }

    fn expect_crlf(&mut self, src: &[u8], pos: &mut Pos) -> Result<bool, ChunkError> {
        let src = &src[pos.index_in..];

        match src {
            [b'\r', b'\n', ..] => {}
            [] | [b'\r'] => return Ok(false),
            _ => return Err(ChunkError::ChunkExpectedCrLf),
        }

        pos.index_in += 2;
        pos.chunk_done = true;
        *self = Self::Size;

        // Stop on every chunk boundary.
        Ok(false)
    }

    fn trailer_or_ended(&mut self, src: &[u8], pos: &mut Pos) -> bool {
        let src = &src[pos.index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        if i == 0 {
            pos.index_in += 2;
            *self = Self::Ended;
        } else {
            // Non-crlf before
            *self = Self::Trailer;
        }

        true
    }

    fn trailer(&mut self, src: &[u8], pos: &mut Pos) -> bool {
        let src = &src[pos.index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        // advance the trailer, and 2 for the crlf.
        pos.index_in += i + 2;
        *self = Self::Ending;

        true
    }
}
