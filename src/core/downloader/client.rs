use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

use crate::core::error::{ResxError, ResxResult};
use crate::core::http::{build_http_client, parse_request_url};

use super::decoder::BodyDecoder;

/// GET-only HTTP transport with transparent gzip inflation.
///
/// Bodies are either buffered ([`HttpTransport::get`]) or streamed into a
/// caller-owned sink ([`HttpTransport::get_into`]). No retries happen here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> ResxResult<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` and return the full decoded body.
    pub async fn get(&self, url: &str) -> ResxResult<Vec<u8>> {
        let mut body = Vec::new();
        self.get_into(url, &mut body).await?;
        Ok(body)
    }

    /// Download `url` and stream the decoded body into `sink`.
    ///
    /// Each chunk is written (and awaited) before the next one is pulled
    /// from the socket, so a slow sink slows the download down. The sink is
    /// flushed once the body ends. On failure whatever was already written
    /// stays in the sink; cleaning it up is the caller's job.
    ///
    /// Returns the number of decoded bytes written.
    #[instrument(skip(self, sink))]
    pub async fn get_into<W>(&self, url: &str, sink: &mut W) -> ResxResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let parsed = parse_request_url(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| ResxError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResxError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut decoder = BodyDecoder::for_headers(response.headers());
        if decoder.is_compressed() {
            debug!("Inflating gzip body from {}", url);
        }

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| ResxError::Http {
                url: url.to_string(),
                source,
            })?;
            let plain = decoder.feed(&chunk).map_err(|source| ResxError::Decompress {
                url: url.to_string(),
                source,
            })?;
            write_chunk(sink, &plain, url).await?;
            written += plain.len() as u64;
        }

        let tail = decoder.finish().map_err(|source| ResxError::Decompress {
            url: url.to_string(),
            source,
        })?;
        write_chunk(sink, &tail, url).await?;
        written += tail.len() as u64;

        sink.flush().await.map_err(|source| ResxError::Sink {
            url: url.to_string(),
            source,
        })?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}

async fn write_chunk<W>(sink: &mut W, bytes: &[u8], url: &str) -> ResxResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if bytes.is_empty() {
        return Ok(());
    }
    sink.write_all(bytes)
        .await
        .map_err(|source| ResxError::Sink {
            url: url.to_string(),
            source,
        })
}
