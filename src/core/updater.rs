// ─── Updater ───
// Runs the whole pipeline: versions -> client download -> extraction ->
// packet map, and persists the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, instrument, warn};

use crate::core::assets::{AssetFetcher, AssetKind};
use crate::core::catalog::NameCatalog;
use crate::core::downloader::HttpTransport;
use crate::core::endpoints::validate_version;
use crate::core::error::{ResxError, ResxResult};
use crate::core::extractor::{
    BackendKind, CompiledExtractor, ExtractionBackend, GameParameters, KeyMaterial,
};
use crate::core::packets::{PacketMap, PacketMapBuilder};
use crate::core::state::ResxSettings;
use crate::core::version::{VersionInfo, VersionResolver};

/// Everything learned about one client build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSnapshot {
    pub versions: VersionInfo,
    pub packets: PacketMap,
    pub key_material: Option<KeyMaterial>,
    pub parameters: Option<GameParameters>,
    pub client_sha256: String,
    pub extracted_at: DateTime<Utc>,
}

pub struct Updater {
    versions: VersionResolver,
    assets: AssetFetcher,
    backend: ExtractionBackend,
    catalog: NameCatalog,
    work_dir: PathBuf,
    decompiled_dir: Option<PathBuf>,
}

impl Updater {
    pub fn new(
        transport: HttpTransport,
        settings: &ResxSettings,
        backend: ExtractionBackend,
        catalog: NameCatalog,
    ) -> Self {
        Self {
            versions: VersionResolver::new(transport.clone(), settings.endpoints.clone()),
            assets: AssetFetcher::new(transport, settings.endpoints.clone()),
            backend,
            catalog,
            work_dir: settings.work_dir.clone(),
            decompiled_dir: settings.decompiled_dir.clone(),
        }
    }

    /// Wire everything up from settings. `compiled` is only needed for the
    /// in-process backend.
    pub async fn from_settings(
        settings: &ResxSettings,
        compiled: Option<Arc<dyn CompiledExtractor>>,
    ) -> ResxResult<Self> {
        let transport = HttpTransport::new()?;
        let backend =
            ExtractionBackend::new(settings.backend, settings.extractor_dir.clone(), compiled)?;
        let catalog = match &settings.catalog_path {
            Some(path) => NameCatalog::load(path).await?,
            None => NameCatalog::bundled()?.clone(),
        };
        info!(
            "Updater ready: backend={}, catalog={} names",
            backend.kind(),
            catalog.len()
        );
        Ok(Self::new(transport, settings, backend, catalog))
    }

    pub fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    pub fn assets(&self) -> &AssetFetcher {
        &self.assets
    }

    /// Full run against the live service. Any stage failure aborts the
    /// run and is returned as is.
    #[instrument(skip(self))]
    pub async fn run(&self) -> ResxResult<ProtocolSnapshot> {
        let versions = self.versions.resolve_versions().await?;
        let client_path = self.download_client(&versions.client_version).await?;
        let client_sha256 = file_sha256(&client_path).await?;

        let artifact = match self.backend.kind() {
            BackendKind::DecompiledSource => self.decompiled_dir.clone().ok_or_else(|| {
                ResxError::InvalidInput(
                    "the decompiled_source backend needs decompiled_dir to be set".into(),
                )
            })?,
            _ => client_path,
        };

        let (packets, key_material, parameters) = self.extract_packets(&artifact).await?;

        Ok(ProtocolSnapshot {
            versions,
            packets,
            key_material,
            parameters,
            client_sha256,
            extracted_at: Utc::now(),
        })
    }

    /// Extraction and mapping only, for an artifact already on disk.
    pub async fn extract_packets(
        &self,
        artifact: &Path,
    ) -> ResxResult<(PacketMap, Option<KeyMaterial>, Option<GameParameters>)> {
        let extracted = self.backend.extract(artifact).await?;
        info!(
            "{} backend found {} packet ids",
            self.backend.kind(),
            extracted.mappings.len()
        );
        let packets = PacketMapBuilder::new(&self.catalog).build(&extracted.mappings)?;
        Ok((packets, extracted.key_material, extracted.parameters))
    }

    /// Stream the client into `<work_dir>/client-<version>.swf`.
    ///
    /// A partially written file is removed when the download fails.
    pub async fn download_client(&self, version: &str) -> ResxResult<PathBuf> {
        validate_version(version)?;
        let path = self.work_dir.join(format!("client-{version}.swf"));
        let mut file = create_sink(&path).await?;
        let result = self.assets.client_into(version, &mut file).await;
        close_sink(&path, file, result).await?;
        Ok(path)
    }

    /// Stream GroundTypes.json and Objects.json into `<work_dir>/assets/<version>/`.
    pub async fn download_assets(&self, version: &str) -> ResxResult<Vec<PathBuf>> {
        validate_version(version)?;
        let dir = self.work_dir.join("assets").join(version);
        let mut written = Vec::with_capacity(AssetKind::ALL.len());
        for kind in AssetKind::ALL {
            let path = dir.join(kind.file_name());
            let mut file = create_sink(&path).await?;
            let result = self.assets.asset_into(kind, version, &mut file).await;
            close_sink(&path, file, result).await?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write `<work_dir>/packets-<client version>.json`.
    pub async fn save_snapshot(&self, snapshot: &ProtocolSnapshot) -> ResxResult<PathBuf> {
        let path = self
            .work_dir
            .join(format!("packets-{}.json", snapshot.versions.client_version));
        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| ResxError::io(&self.work_dir, e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| ResxError::io(&path, e))?;
        info!("Saved packet snapshot to {:?}", path);
        Ok(path)
    }
}

async fn create_sink(path: &Path) -> ResxResult<File> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ResxError::io(parent, e))?;
    }
    File::create(path).await.map_err(|e| ResxError::io(path, e))
}

/// Close a download target, deleting it if the download failed.
async fn close_sink(path: &Path, mut file: File, result: ResxResult<u64>) -> ResxResult<()> {
    match result {
        Ok(bytes) => {
            file.shutdown().await.map_err(|e| ResxError::io(path, e))?;
            info!("Wrote {} bytes to {:?}", bytes, path);
            Ok(())
        }
        Err(e) => {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                warn!("Could not remove partial download {:?}: {}", path, remove_err);
            }
            Err(e)
        }
    }
}

async fn file_sha256(path: &Path) -> ResxResult<String> {
    let mut file = File::open(path).await.map_err(|e| ResxError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await.map_err(|e| ResxError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoints::Endpoints;
    use crate::core::error::ErrorKind;
    use crate::core::extractor::{
        game_server_connection_path, ExtractionResult, InProcessBackend, RawMapping,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GSC_SOURCE: &str = "public class GameServerConnection {\n\
                              \x20 public static const FAILURE:int = 0;\n\
                              \x20 public static const CREATE_SUCCESS:int = 13;\n\
                              \x20 public static const LOAD:int = 4;\n\
                              }";

    struct FixedExtractor;

    impl CompiledExtractor for FixedExtractor {
        fn mappings(&self, _client: &[u8]) -> ResxResult<ExtractionResult> {
            Ok(ExtractionResult::new(
                vec![RawMapping::new(0, "FAILURE"), RawMapping::new(30, "HELLO")],
                Some(KeyMaterial::try_from(vec![1u8; 26])?),
            ))
        }
    }

    fn catalog() -> NameCatalog {
        [
            ("FAILURE", "FAILURE"),
            ("CREATE_SUCCESS", "CREATE_SUCCESS"),
            ("LOAD", "LOAD"),
            ("HELLO", "HELLO"),
        ]
        .into_iter()
        .collect()
    }

    async fn mount_versions(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/version.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("X31.2.0.0.0\n"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rotmg/production/current/version.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1576842385"))
            .mount(server)
            .await;
    }

    fn settings_for(server: &MockServer, work_dir: &Path) -> ResxSettings {
        ResxSettings {
            work_dir: work_dir.to_path_buf(),
            endpoints: Endpoints::rooted_at(&server.uri()),
            ..ResxSettings::default()
        }
    }

    #[tokio::test]
    async fn full_run_with_decompiled_source() {
        let server = MockServer::start().await;
        mount_versions(&server).await;
        Mock::given(method("GET"))
            .and(path("/AssembleeGameClientX31.2.0.0.0.swf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"CWS\x0d\x00".to_vec()))
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let decompiled = tempfile::tempdir().unwrap();
        let gsc = game_server_connection_path(decompiled.path()).unwrap();
        std::fs::create_dir_all(gsc.parent().unwrap()).unwrap();
        std::fs::write(&gsc, GSC_SOURCE).unwrap();

        let settings = ResxSettings {
            backend: BackendKind::DecompiledSource,
            decompiled_dir: Some(decompiled.path().to_path_buf()),
            ..settings_for(&server, work.path())
        };
        let backend =
            ExtractionBackend::new(settings.backend, settings.extractor_dir.clone(), None).unwrap();
        let updater = Updater::new(HttpTransport::new().unwrap(), &settings, backend, catalog());

        let snapshot = updater.run().await.unwrap();
        assert_eq!(snapshot.versions.client_version, "X31.2.0.0.0");
        assert_eq!(snapshot.packets.id_of("CREATE_SUCCESS"), Some(13));
        assert_eq!(snapshot.packets.name_of(4), Some("LOAD"));
        assert!(snapshot.key_material.is_none());
        assert_eq!(snapshot.client_sha256.len(), 64);
        assert!(work.path().join("client-X31.2.0.0.0.swf").exists());

        let saved = updater.save_snapshot(&snapshot).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(saved).unwrap()).unwrap();
        assert_eq!(json["packets"]["13"], "CREATE_SUCCESS");
        assert_eq!(json["packets"]["LOAD"], 4);
        assert_eq!(json["versions"]["assetVersion"], "1576842385");
    }

    #[tokio::test]
    async fn in_process_run_carries_key_material() {
        let server = MockServer::start().await;
        mount_versions(&server).await;
        Mock::given(method("GET"))
            .and(path("/AssembleeGameClientX31.2.0.0.0.swf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"FWS\x0a\x00".to_vec()))
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, work.path());
        let backend = ExtractionBackend::InProcess(InProcessBackend::new(Arc::new(FixedExtractor)));
        let updater = Updater::new(HttpTransport::new().unwrap(), &settings, backend, catalog());

        let snapshot = updater.run().await.unwrap();
        assert_eq!(snapshot.packets.id_of("HELLO"), Some(30));
        assert_eq!(snapshot.key_material.unwrap().incoming(), &[1u8; 13]);
    }

    #[tokio::test]
    async fn failed_client_download_aborts_and_cleans_up() {
        let server = MockServer::start().await;
        mount_versions(&server).await;
        Mock::given(method("GET"))
            .and(path("/AssembleeGameClientX31.2.0.0.0.swf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, work.path());
        let backend = ExtractionBackend::InProcess(InProcessBackend::new(Arc::new(FixedExtractor)));
        let updater = Updater::new(HttpTransport::new().unwrap(), &settings, backend, catalog());

        let err = updater.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!work.path().join("client-X31.2.0.0.0.swf").exists());
    }

    #[tokio::test]
    async fn unmapped_packets_fail_the_run() {
        let server = MockServer::start().await;
        mount_versions(&server).await;
        Mock::given(method("GET"))
            .and(path("/AssembleeGameClientX31.2.0.0.0.swf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"FWS".to_vec()))
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, work.path());
        let backend = ExtractionBackend::InProcess(InProcessBackend::new(Arc::new(FixedExtractor)));
        let narrow: NameCatalog = [("FAILURE", "FAILURE")].into_iter().collect();
        let updater = Updater::new(HttpTransport::new().unwrap(), &settings, backend, narrow);

        let err = updater.run().await.unwrap_err();
        assert!(matches!(err, ResxError::UnmappedPacket { id: 30, .. }));
    }

    #[tokio::test]
    async fn decompiled_backend_without_a_tree_is_an_input_error() {
        let server = MockServer::start().await;
        mount_versions(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"CWS".to_vec()))
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let settings = ResxSettings {
            backend: BackendKind::DecompiledSource,
            ..settings_for(&server, work.path())
        };
        let backend =
            ExtractionBackend::new(settings.backend, settings.extractor_dir.clone(), None).unwrap();
        let updater = Updater::new(HttpTransport::new().unwrap(), &settings, backend, catalog());

        let err = updater.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn assets_are_streamed_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rotmg/production/current/json/GroundTypes.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Ground":[]}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rotmg/production/current/json/Objects.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Object":[]}"#))
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, work.path());
        let backend =
            ExtractionBackend::new(BackendKind::DecompiledSource, PathBuf::new(), None).unwrap();
        let updater = Updater::new(HttpTransport::new().unwrap(), &settings, backend, catalog());

        let paths = updater.download_assets("current").await.unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), r#"{"Object":[]}"#);
    }
}
