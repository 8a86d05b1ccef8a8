use std::io::{self, Write};
use std::mem;

use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::header::Headers;
use crate::Error;

/// Incremental content decoder for `content-encoding: gzip` and `deflate`.
///
/// "deflate" is supposed to be zlib wrapped, but some servers send raw
/// deflate. We start out assuming zlib and keep the input until the wrapper
/// has produced output. If it fails before that, the kept input is replayed
/// into a raw decoder.
pub(crate) struct Decompressor {
    codec: Codec,
    /// Whether any input was given. An empty body has nothing to finish.
    fed: bool,
}

enum Codec {
    Gzip(GzDecoder<Vec<u8>>),
    Zlib {
        decoder: ZlibDecoder<Vec<u8>>,
        seen: Option<Vec<u8>>,
    },
    Raw(DeflateDecoder<Vec<u8>>),
}

impl Decompressor {
    /// Decoder for the response `content-encoding`, if it is one we handle.
    pub fn for_headers(headers: &Headers) -> Option<Self> {
        let encoding = headers.get("content-encoding")?.trim().to_ascii_lowercase();

        let codec = match encoding.as_str() {
            "gzip" | "x-gzip" => Codec::Gzip(GzDecoder::new(vec![])),
            "deflate" => Codec::Zlib {
                decoder: ZlibDecoder::new(vec![]),
                seen: Some(vec![]),
            },
            _ => return None,
        };

        debug!("Decompress content-encoding: {}", encoding);

        Some(Decompressor { codec, fed: false })
    }

    /// Decode `input`, returning whatever output is ready.
    pub fn decompress(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
        if input.is_empty() {
            return Ok(vec![]);
        }
        self.fed = true;
        self.codec.decompress(input)
    }

    /// End of input. Returns the remaining output.
    pub fn finish(&mut self) -> Result<Vec<u8>, Error> {
        if !self.fed {
            return Ok(vec![]);
        }
        self.codec.finish()
    }
}

impl Codec {
    fn decompress(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let fallback = match self {
            Codec::Gzip(d) => {
                feed(d, input).map_err(Error::Decompress)?;
                return Ok(mem::take(d.get_mut()));
            }
            Codec::Raw(d) => {
                feed(d, input).map_err(Error::Decompress)?;
                return Ok(mem::take(d.get_mut()));
            }
            Codec::Zlib { decoder, seen } => {
                if let Some(s) = seen {
                    s.extend_from_slice(input);
                }

                match feed(decoder, input) {
                    Ok(()) => {
                        let out = mem::take(decoder.get_mut());
                        if !out.is_empty() {
                            // The wrapper is good, no going back.
                            *seen = None;
                        }
                        return Ok(out);
                    }
                    Err(e) => match seen.take() {
                        Some(s) => s,
                        None => return Err(Error::Decompress(e)),
                    },
                }
            }
        };

        debug!("Deflate is not zlib wrapped, fall back to raw");

        let mut raw = DeflateDecoder::new(vec![]);
        feed(&mut raw, &fallback).map_err(Error::Decompress)?;
        let out = mem::take(raw.get_mut());
        *self = Codec::Raw(raw);

        Ok(out)
    }

    fn finish(&mut self) -> Result<Vec<u8>, Error> {
        let fallback = match self {
            Codec::Gzip(d) => {
                d.try_finish().map_err(Error::Decompress)?;
                return Ok(mem::take(d.get_mut()));
            }
            Codec::Raw(d) => {
                d.try_finish().map_err(Error::Decompress)?;
                return Ok(mem::take(d.get_mut()));
            }
            Codec::Zlib { decoder, seen } => match decoder.try_finish() {
                Ok(()) => return Ok(mem::take(decoder.get_mut())),
                Err(e) => match seen.take() {
                    Some(s) => s,
                    None => return Err(Error::Decompress(e)),
                },
            },
        };

        let mut raw = DeflateDecoder::new(vec![]);
        feed(&mut raw, &fallback).map_err(Error::Decompress)?;
        raw.try_finish().map_err(Error::Decompress)?;
        let out = mem::take(raw.get_mut());
        *self = Codec::Raw(raw);

        Ok(out)
    }
}

// Like write_all, but input after the end of the compressed stream is ignored.
fn feed<W: Write>(w: &mut W, mut input: &[u8]) -> io::Result<()> {
    while !input.is_empty() {
        let n = w.write(input)?;
        if n == 0 {
            break;
        }
        input = &input[n..];
    }
    w.flush()
}
