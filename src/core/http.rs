use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, CONNECTION,
};
use reqwest::{Client, Url};

use crate::core::error::{ResxError, ResxResult};

/// The game's CDN rejects obvious bot user agents, so every request looks
/// like a desktop Chrome.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/68.0.3440.106 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Build the shared client with the fixed header set.
///
/// reqwest's own decompression is not enabled: `Accept-Encoding` is sent
/// verbatim and gzip bodies are inflated by the transport.
pub fn build_http_client() -> ResxResult<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    default_headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
    default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(default_headers)
        .build()
        .map_err(ResxError::ClientBuild)
}

/// Parse a request URL, rejecting anything that is not plain http(s).
///
/// Runs before any socket is opened so malformed input never reaches the
/// network.
pub fn parse_request_url(raw: &str) -> ResxResult<Url> {
    let url = Url::parse(raw).map_err(|e| ResxError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ResxError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {other:?}"),
            })
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ResxError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".into(),
        });
    }

    Ok(url)
}
