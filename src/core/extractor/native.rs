use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::error::{ResxError, ResxResult};

use super::backend::PacketExtractor;
use super::result::{ExtractionResult, GameParameters};

/// A compiled extraction routine linked into the process.
///
/// Byte-level parsing of the client lives behind this trait; the pipeline
/// only relies on its output contract.
pub trait CompiledExtractor: Send + Sync {
    /// Packet ids and, if found, the RC4 keys.
    fn mappings(&self, client: &[u8]) -> ResxResult<ExtractionResult>;

    /// Game constants, for routines that can recover them. `None` keeps
    /// whatever [`CompiledExtractor::mappings`] returned.
    fn parameters(&self, _client: &[u8]) -> ResxResult<Option<GameParameters>> {
        Ok(None)
    }
}

/// Container formats a game client ships in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFormat {
    /// `FWS`
    UncompressedSwf,
    /// `CWS`
    ZlibSwf,
    /// `ZWS`
    LzmaSwf,
}

impl ClientFormat {
    /// Identify the container from its signature bytes.
    pub fn sniff(client: &[u8]) -> ResxResult<Self> {
        match client.get(..3) {
            Some(b"FWS") => Ok(Self::UncompressedSwf),
            Some(b"CWS") => Ok(Self::ZlibSwf),
            Some(b"ZWS") => Ok(Self::LzmaSwf),
            Some(sig) => Err(ResxError::UnrecognizedArtifact(format!(
                "unknown signature {}",
                hex::encode(sig)
            ))),
            None => Err(ResxError::UnrecognizedArtifact(format!(
                "only {} bytes long",
                client.len()
            ))),
        }
    }
}

#[derive(Clone)]
pub struct InProcessBackend {
    compiled: Arc<dyn CompiledExtractor>,
}

impl InProcessBackend {
    pub fn new(compiled: Arc<dyn CompiledExtractor>) -> Self {
        Self { compiled }
    }

    /// Run the compiled routine over an in-memory client.
    pub fn extract_bytes(&self, client: &[u8]) -> ResxResult<ExtractionResult> {
        let format = ClientFormat::sniff(client)?;
        debug!("Client container: {:?}, {} bytes", format, client.len());

        let result = self.compiled.mappings(client)?;
        let parameters = self.compiled.parameters(client)?.or(result.parameters);
        Ok(ExtractionResult::new(result.mappings, result.key_material).with_parameters(parameters))
    }
}

#[async_trait]
impl PacketExtractor for InProcessBackend {
    async fn extract(&self, artifact: &Path) -> ResxResult<ExtractionResult> {
        let client = tokio::fs::read(artifact)
            .await
            .map_err(|e| ResxError::io(artifact, e))?;
        info!("Extracting in-process from {:?}", artifact);

        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.extract_bytes(&client))
            .await
            .map_err(|e| ResxError::BackendOutput(format!("compiled extractor panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::result::{KeyMaterial, RawMapping};

    /// Stand-in routine returning a fixed table.
    struct FixedExtractor;

    impl CompiledExtractor for FixedExtractor {
        fn mappings(&self, _client: &[u8]) -> ResxResult<ExtractionResult> {
            Ok(ExtractionResult::new(
                vec![RawMapping::new(30, "HELLO"), RawMapping::new(0, "FAILURE")],
                Some(KeyMaterial::try_from(vec![7u8; 26])?),
            ))
        }

        fn parameters(&self, _client: &[u8]) -> ResxResult<Option<GameParameters>> {
            Ok(Some(GameParameters {
                version: "X31.2.0".into(),
                port: 2050,
                tutorial_gameid: -1,
                nexus_gameid: -2,
                random_gameid: -3,
            }))
        }
    }

    /// Reports its parameters from `mappings` only.
    struct InlineParameters;

    impl CompiledExtractor for InlineParameters {
        fn mappings(&self, _client: &[u8]) -> ResxResult<ExtractionResult> {
            Ok(
                ExtractionResult::new(vec![RawMapping::new(8, "PING")], None).with_parameters(
                    Some(GameParameters {
                        version: "X30.0.0".into(),
                        port: 2050,
                        tutorial_gameid: -1,
                        nexus_gameid: -2,
                        random_gameid: -3,
                    }),
                ),
            )
        }
    }

    fn backend() -> InProcessBackend {
        InProcessBackend::new(Arc::new(FixedExtractor))
    }

    #[test]
    fn sniffs_swf_signatures() {
        assert_eq!(ClientFormat::sniff(b"CWS\x0d").unwrap(), ClientFormat::ZlibSwf);
        assert_eq!(ClientFormat::sniff(b"ZWS").unwrap(), ClientFormat::LzmaSwf);
        assert!(matches!(
            ClientFormat::sniff(b"PK\x03\x04"),
            Err(ResxError::UnrecognizedArtifact(_))
        ));
        assert!(ClientFormat::sniff(b"FW").is_err());
    }

    #[test]
    fn carries_mappings_keys_and_parameters() {
        let result = backend().extract_bytes(b"FWS\x0a\x00\x00").unwrap();
        assert_eq!(result.mappings[0], RawMapping::new(0, "FAILURE"));
        assert!(result.key_material.is_some());
        assert_eq!(result.parameters.unwrap().port, 2050);
    }

    #[test]
    fn parameters_from_mappings_survive_the_default_hook() {
        let result = InProcessBackend::new(Arc::new(InlineParameters))
            .extract_bytes(b"CWS\x0a")
            .unwrap();
        assert_eq!(result.parameters.unwrap().version, "X30.0.0");
    }

    #[test]
    fn refuses_unrecognized_artifacts_before_parsing() {
        let err = backend().extract_bytes(b"<html>").unwrap_err();
        assert!(matches!(err, ResxError::UnrecognizedArtifact(_)));
    }

    #[tokio::test]
    async fn reads_the_client_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.swf");
        std::fs::write(&path, b"CWS\x0d\x00\x00\x00\x00").unwrap();

        let result = backend().extract(&path).await.unwrap();
        assert_eq!(result.mappings.len(), 2);
    }
}
