// ─── Version Resolver ───
// Looks up the live client build and the asset mirror's version.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::downloader::HttpTransport;
use crate::core::endpoints::Endpoints;
use crate::core::error::{ResxError, ResxResult};

/// Snapshot of the versions currently served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub client_version: String,
    pub asset_version: String,
}

pub struct VersionResolver {
    transport: HttpTransport,
    endpoints: Endpoints,
}

impl VersionResolver {
    pub fn new(transport: HttpTransport, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Current client build, e.g. `X31.2.0.0.0`.
    pub async fn resolve_client_version(&self) -> ResxResult<String> {
        let version = self.fetch_version_text(&self.endpoints.version).await?;
        info!("Live client version: {}", version);
        Ok(version)
    }

    /// Version of the `current` asset set on the mirror.
    pub async fn resolve_asset_version(&self) -> ResxResult<String> {
        let url = self.endpoints.asset_version_url();
        let version = self.fetch_version_text(&url).await?;
        info!("Live asset version: {}", version);
        Ok(version)
    }

    /// Fetch both versions concurrently.
    ///
    /// Fails with the first error observed; never returns half a snapshot.
    pub async fn resolve_versions(&self) -> ResxResult<VersionInfo> {
        let (client_version, asset_version) = tokio::try_join!(
            self.resolve_client_version(),
            self.resolve_asset_version()
        )?;

        Ok(VersionInfo {
            client_version,
            asset_version,
        })
    }

    async fn fetch_version_text(&self, url: &str) -> ResxResult<String> {
        let body = self.transport.get(url).await?;
        let version = String::from_utf8_lossy(&body).trim().to_string();
        if version.is_empty() {
            return Err(ResxError::EmptyVersion {
                url: url.to_string(),
            });
        }
        Ok(version)
    }
}
