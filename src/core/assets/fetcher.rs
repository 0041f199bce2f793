use tokio::io::AsyncWrite;
use tracing::info;

use crate::core::downloader::HttpTransport;
use crate::core::endpoints::Endpoints;
use crate::core::error::ResxResult;

/// JSON resource tables published next to each client build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    GroundTypes,
    Objects,
}

impl AssetKind {
    pub const ALL: [AssetKind; 2] = [AssetKind::GroundTypes, AssetKind::Objects];

    pub fn file_name(self) -> &'static str {
        match self {
            AssetKind::GroundTypes => "GroundTypes.json",
            AssetKind::Objects => "Objects.json",
        }
    }
}

/// Downloads versioned artifacts: the game client and its resource tables.
///
/// Every operation comes in a buffered flavour and an `_into` flavour that
/// streams into a caller-owned sink.
pub struct AssetFetcher {
    transport: HttpTransport,
    endpoints: Endpoints,
}

impl AssetFetcher {
    pub fn new(transport: HttpTransport, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub async fn client(&self, version: &str) -> ResxResult<Vec<u8>> {
        let url = self.endpoints.client_url(version)?;
        info!("Downloading game client {}", version);
        self.transport.get(&url).await
    }

    pub async fn client_into<W>(&self, version: &str, sink: &mut W) -> ResxResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.endpoints.client_url(version)?;
        info!("Streaming game client {}", version);
        self.transport.get_into(&url, sink).await
    }

    pub async fn ground_types(&self, version: &str) -> ResxResult<Vec<u8>> {
        self.asset(AssetKind::GroundTypes, version).await
    }

    pub async fn ground_types_into<W>(&self, version: &str, sink: &mut W) -> ResxResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.asset_into(AssetKind::GroundTypes, version, sink).await
    }

    pub async fn objects(&self, version: &str) -> ResxResult<Vec<u8>> {
        self.asset(AssetKind::Objects, version).await
    }

    pub async fn objects_into<W>(&self, version: &str, sink: &mut W) -> ResxResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.asset_into(AssetKind::Objects, version, sink).await
    }

    pub async fn asset(&self, kind: AssetKind, version: &str) -> ResxResult<Vec<u8>> {
        let url = self.endpoints.asset_json_url(version, kind.file_name())?;
        self.transport.get(&url).await
    }

    pub async fn asset_into<W>(
        &self,
        kind: AssetKind,
        version: &str,
        sink: &mut W,
    ) -> ResxResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.endpoints.asset_json_url(version, kind.file_name())?;
        self.transport.get_into(&url, sink).await
    }
}
