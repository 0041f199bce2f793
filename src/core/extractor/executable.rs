// ─── Executable Backend ───
// Runs the standalone extractor build for the host platform and reads its
// JSON report from stdout.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, instrument, warn};

use crate::core::error::{ResxError, ResxResult};

use super::backend::PacketExtractor;
use super::result::{ExtractionResult, KeyMaterial, RawMapping};

/// Platforms an extractor binary is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorPlatform {
    Windows,
    Linux,
    MacOs,
}

impl ExtractorPlatform {
    pub fn current() -> ResxResult<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> ResxResult<Self> {
        match os {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            other => Err(ResxError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn binary_name(self) -> &'static str {
        match self {
            Self::Windows => "extractor-win.exe",
            Self::Linux => "extractor-linux",
            Self::MacOs => "extractor-macos",
        }
    }
}

/// Everything the extractor process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Shape of the extractor's stdout report.
#[derive(Debug, Deserialize)]
struct ExtractorReport {
    /// Entries in report order. Repeated ids are kept so the builder sees them.
    #[serde(deserialize_with = "report_entries")]
    mappings: Vec<(String, String)>,
    #[serde(default)]
    binary_rc4: Option<Vec<u8>>,
}

fn report_entries<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object of packet id to packet name")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_entry::<String, String>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

impl ProcessOutput {
    /// Turn a finished run into an extraction result.
    ///
    /// Policy, in order:
    /// 1. anything on stderr, whitespace included, is a failure even with
    ///    exit code 0;
    /// 2. a non-zero exit (or death by signal) is a failure;
    /// 3. stdout must be the JSON report, with numeric ids and, when
    ///    present, exactly 26 key bytes.
    pub fn into_result(self, executable: &Path) -> ResxResult<ExtractionResult> {
        if !self.stderr.is_empty() {
            return Err(ResxError::BackendDiagnostic {
                executable: executable.to_path_buf(),
                stderr: self.stderr.trim().to_string(),
            });
        }

        if self.exit_code != Some(0) {
            let status = match self.exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(ResxError::BackendExit {
                executable: executable.to_path_buf(),
                status,
            });
        }

        parse_report(&self.stdout)
    }
}

fn parse_report(stdout: &str) -> ResxResult<ExtractionResult> {
    let report: ExtractorReport =
        serde_json::from_str(stdout).map_err(|e| ResxError::BackendOutput(e.to_string()))?;

    let mappings = report
        .mappings
        .into_iter()
        .map(|(id, raw_name)| {
            let id = id.trim().parse::<u32>().map_err(|_| {
                ResxError::BackendOutput(format!("packet id {id:?} of {raw_name} is not a number"))
            })?;
            Ok(RawMapping::new(id, raw_name))
        })
        .collect::<ResxResult<Vec<_>>>()?;

    let key_material = report
        .binary_rc4
        .map(KeyMaterial::try_from)
        .transpose()?;

    Ok(ExtractionResult::new(mappings, key_material))
}

#[derive(Debug, Clone)]
pub struct ExecutableBackend {
    executable: PathBuf,
}

impl ExecutableBackend {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// `<extractor_dir>/<binary for this OS>`
    pub fn for_current_platform(extractor_dir: &Path) -> ResxResult<Self> {
        let platform = ExtractorPlatform::current()?;
        Ok(Self::new(extractor_dir.join(platform.binary_name())))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl PacketExtractor for ExecutableBackend {
    /// Runs `<executable> <artifact>` to completion. There is no timeout;
    /// wrap the call if one is needed.
    #[instrument(skip(self), fields(executable = ?self.executable))]
    async fn extract(&self, artifact: &Path) -> ResxResult<ExtractionResult> {
        if artifact.as_os_str().is_empty() {
            return Err(ResxError::InvalidInput("artifact path must not be empty".into()));
        }

        let exists = tokio::fs::try_exists(&self.executable)
            .await
            .map_err(|e| ResxError::io(&self.executable, e))?;
        if !exists {
            return Err(ResxError::ExtractorMissing(self.executable.clone()));
        }

        info!("Running extractor on {:?}", artifact);
        let output = tokio::process::Command::new(&self.executable)
            .arg(artifact)
            .output()
            .await
            .map_err(|source| ResxError::BackendSpawn {
                executable: self.executable.clone(),
                source,
            })?;

        let output = ProcessOutput::from(output);
        debug!(
            "Extractor finished: code={:?}, {} bytes of stdout",
            output.exit_code,
            output.stdout.len()
        );
        if !output.stderr.is_empty() {
            warn!("Extractor wrote to stderr: {}", output.stderr.trim());
        }

        output.into_result(&self.executable)
    }
}
