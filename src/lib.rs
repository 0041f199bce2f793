pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::assets::{AssetFetcher, AssetKind};
pub use crate::core::catalog::NameCatalog;
pub use crate::core::downloader::HttpTransport;
pub use crate::core::endpoints::Endpoints;
pub use crate::core::error::{ErrorKind, ResxError, ResxResult};
pub use crate::core::extractor::{
    BackendKind, CompiledExtractor, ExtractionBackend, ExtractionResult, KeyMaterial, RawMapping,
};
pub use crate::core::packets::{PacketMap, PacketMapBuilder};
pub use crate::core::servers::{Server, ServerDirectory};
pub use crate::core::state::{default_data_dir, ResxSettings};
pub use crate::core::updater::{ProtocolSnapshot, Updater};
pub use crate::core::version::{VersionInfo, VersionResolver};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    // try_init: a second call (tests, embedding apps) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,realm_resx=debug")),
        )
        .try_init();
}

/// One full sync with the settings stored in the default data directory.
///
/// Writes the packet snapshot and the JSON assets to the work directory and
/// returns the snapshot path.
pub async fn run() -> ResxResult<std::path::PathBuf> {
    let data_dir = default_data_dir();
    let settings = ResxSettings::load_or_default(&data_dir);
    tracing::info!("RealmResx sync starting, data dir {:?}", data_dir);

    let updater = Updater::from_settings(&settings, None).await?;
    let snapshot = updater.run().await?;
    tracing::info!(
        "Client {} (assets {}): {} packet types",
        snapshot.versions.client_version,
        snapshot.versions.asset_version,
        snapshot.packets.len()
    );

    updater
        .download_assets(&snapshot.versions.asset_version)
        .await?;
    updater.save_snapshot(&snapshot).await
}
