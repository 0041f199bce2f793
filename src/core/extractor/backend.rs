use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{ResxError, ResxResult};

use super::{
    decompiled::DecompiledSourceBackend, executable::ExecutableBackend,
    native::{CompiledExtractor, InProcessBackend},
    result::ExtractionResult,
};

/// Which extraction strategy the current client generation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Compiled extractor linked into this process.
    InProcess,
    /// Platform-specific extractor binary run as a subprocess.
    Executable,
    /// Regex scan over an already decompiled client.
    DecompiledSource,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendKind::InProcess => "in_process",
            BackendKind::Executable => "executable",
            BackendKind::DecompiledSource => "decompiled_source",
        })
    }
}

#[async_trait]
pub trait PacketExtractor: Send + Sync {
    /// Extract raw packet mappings (and key material where the backend
    /// recovers it) from the artifact at `artifact`.
    async fn extract(&self, artifact: &Path) -> ResxResult<ExtractionResult>;
}

/// Dispatcher over the three strategies, chosen once at construction.
pub enum ExtractionBackend {
    InProcess(InProcessBackend),
    Executable(ExecutableBackend),
    DecompiledSource(DecompiledSourceBackend),
}

impl ExtractionBackend {
    /// Build the backend named by `kind`.
    ///
    /// `extractor_dir` holds the platform binaries for
    /// [`BackendKind::Executable`]; `compiled` is the linked routine for
    /// [`BackendKind::InProcess`].
    pub fn new(
        kind: BackendKind,
        extractor_dir: PathBuf,
        compiled: Option<Arc<dyn CompiledExtractor>>,
    ) -> ResxResult<Self> {
        match kind {
            BackendKind::InProcess => {
                let compiled = compiled.ok_or(ResxError::CompiledExtractorUnavailable)?;
                Ok(Self::InProcess(InProcessBackend::new(compiled)))
            }
            BackendKind::Executable => {
                Ok(Self::Executable(ExecutableBackend::for_current_platform(&extractor_dir)?))
            }
            BackendKind::DecompiledSource => Ok(Self::DecompiledSource(DecompiledSourceBackend)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::InProcess(_) => BackendKind::InProcess,
            Self::Executable(_) => BackendKind::Executable,
            Self::DecompiledSource(_) => BackendKind::DecompiledSource,
        }
    }

    pub async fn extract(&self, artifact: &Path) -> ResxResult<ExtractionResult> {
        match self {
            Self::InProcess(b) => b.extract(artifact).await,
            Self::Executable(b) => b.extract(artifact).await,
            Self::DecompiledSource(b) => b.extract(artifact).await,
        }
    }
}
