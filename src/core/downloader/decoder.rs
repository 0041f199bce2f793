use std::io::{self, Write};

use flate2::write::GzDecoder;
use reqwest::header::{HeaderMap, CONTENT_ENCODING};

/// Incremental response body decoder.
///
/// Compressed chunks go in, plain bytes come out. Works the same for
/// buffered and streamed consumption since it never holds more than the
/// output of a single chunk.
pub enum BodyDecoder {
    Identity,
    Gzip(GzDecoder<Vec<u8>>),
}

impl BodyDecoder {
    /// Pick a decoder from the response's `Content-Encoding`.
    pub fn for_headers(headers: &HeaderMap) -> Self {
        let is_gzip = headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                let v = v.trim();
                v.eq_ignore_ascii_case("gzip") || v.eq_ignore_ascii_case("x-gzip")
            })
            .unwrap_or(false);

        if is_gzip {
            Self::Gzip(GzDecoder::new(Vec::new()))
        } else {
            Self::Identity
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Gzip(_))
    }

    /// Feed one network chunk and return whatever plain bytes it produced.
    pub fn feed(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Identity => Ok(chunk.to_vec()),
            Self::Gzip(decoder) => {
                decoder.write_all(chunk)?;
                Ok(std::mem::take(decoder.get_mut()))
            }
        }
    }

    /// Flush the decoder at end of body. Fails on a truncated gzip stream
    /// (missing trailer or bad CRC).
    pub fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Identity => Ok(Vec::new()),
            Self::Gzip(decoder) => decoder.finish(),
        }
    }
}
