use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of every failure the pipeline can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied a malformed argument; nothing was executed.
    Input,
    /// Network level failure, including mid-stream and sink failures.
    Transport,
    /// The extraction backend reported or produced something unusable.
    Backend,
    /// Raw names could not be turned into a consistent packet map.
    Mapping,
    /// Local filesystem failure.
    Io,
}

/// Central error type for the whole crate.
/// Every module returns `Result<T, ResxError>`.
#[derive(Debug, Error)]
pub enum ResxError {
    // ── Input ───────────────────────────────────────────
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("writing response body of {url} failed: {source}")]
    Sink {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gzip body of {url} could not be inflated: {source}")]
    Decompress {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} returned an empty version string")]
    EmptyVersion { url: String },

    #[error("server list XML is malformed: {0}")]
    ServerList(#[from] quick_xml::DeError),

    // ── Extraction backend ──────────────────────────────
    #[error("extractor {executable:?} reported an error: {stderr}")]
    BackendDiagnostic { executable: PathBuf, stderr: String },

    #[error("extractor {executable:?} exited unsuccessfully ({status})")]
    BackendExit { executable: PathBuf, status: String },

    #[error("extractor output is malformed: {0}")]
    BackendOutput(String),

    #[error("failed to start extractor {executable:?}: {source}")]
    BackendSpawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no extractor executable found at {0:?}")]
    ExtractorMissing(PathBuf),

    #[error("no extractor build exists for platform {0}")]
    UnsupportedPlatform(String),

    #[error("artifact is not a recognized game client: {0}")]
    UnrecognizedArtifact(String),

    #[error("key material must be 26 bytes, got {0}")]
    KeyMaterialLength(usize),

    #[error("the in-process backend was selected but no compiled extractor is linked")]
    CompiledExtractorUnavailable,

    // ── Mapping ─────────────────────────────────────────
    #[error("Cannot map {raw_name} (id {id}) to a packet type")]
    UnmappedPacket { raw_name: String, id: u32 },

    #[error("packet id {id} is claimed by both {first} and {second}")]
    IdCollision {
        id: u32,
        first: String,
        second: String,
    },

    #[error("packet type {name} resolves to both id {first_id} and id {second_id}")]
    NameCollision {
        name: String,
        first_id: u32,
        second_id: u32,
    },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type ResxResult<T> = Result<T, ResxError>;

impl ResxError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResxError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResxError::InvalidInput(_) | ResxError::InvalidUrl { .. } => ErrorKind::Input,
            ResxError::ClientBuild(_)
            | ResxError::Http { .. }
            | ResxError::DownloadFailed { .. }
            | ResxError::Sink { .. }
            | ResxError::Decompress { .. }
            | ResxError::EmptyVersion { .. }
            | ResxError::ServerList(_) => ErrorKind::Transport,
            ResxError::BackendDiagnostic { .. }
            | ResxError::BackendExit { .. }
            | ResxError::BackendOutput(_)
            | ResxError::BackendSpawn { .. }
            | ResxError::ExtractorMissing(_)
            | ResxError::UnsupportedPlatform(_)
            | ResxError::UnrecognizedArtifact(_)
            | ResxError::KeyMaterialLength(_)
            | ResxError::CompiledExtractorUnavailable => ErrorKind::Backend,
            ResxError::UnmappedPacket { .. }
            | ResxError::IdCollision { .. }
            | ResxError::NameCollision { .. } => ErrorKind::Mapping,
            ResxError::Io { .. } | ResxError::Json(_) => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for ResxError {
    fn from(source: std::io::Error) -> Self {
        ResxError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_packet_names_the_offender() {
        let err = ResxError::UnmappedPacket {
            raw_name: "MYSTERY".into(),
            id: 77,
        };
        let text = err.to_string();
        assert!(text.contains("MYSTERY"));
        assert!(text.contains("77"));
        assert_eq!(err.kind(), ErrorKind::Mapping);
    }

    #[test]
    fn kinds_follow_the_pipeline_stages() {
        assert_eq!(
            ResxError::InvalidInput("x".into()).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            ResxError::DownloadFailed {
                url: "https://a".into(),
                status: 404
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ResxError::BackendOutput("bad".into()).kind(),
            ErrorKind::Backend
        );
        assert_eq!(ResxError::KeyMaterialLength(3).kind(), ErrorKind::Backend);
    }
}
