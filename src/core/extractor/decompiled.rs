// ─── Decompiled Source Backend ───
// Older clients were handled by decompiling the SWF first and scanning the
// ActionScript of GameServerConnection for its packet id constants.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::{debug, info};

use crate::core::error::{ResxError, ResxResult};

use super::backend::PacketExtractor;
use super::result::{ExtractionResult, RawMapping};

/// Location of the connection class inside a decompiled client tree.
const GSC_RELATIVE_PATH: [&str; 6] = [
    "scripts",
    "kabam",
    "rotmg",
    "messaging",
    "impl",
    "GameServerConnection.as",
];

static PACKET_CONST: OnceLock<Regex> = OnceLock::new();

fn packet_const() -> &'static Regex {
    PACKET_CONST.get_or_init(|| {
        Regex::new(r"static const (\w+):int = (\d+);").expect("packet constant pattern is valid")
    })
}

/// Path of `GameServerConnection.as` under a decompiled client root.
/// `None` for an empty root.
pub fn game_server_connection_path(base: &Path) -> Option<PathBuf> {
    if base.as_os_str().is_empty() {
        return None;
    }
    Some(GSC_RELATIVE_PATH.iter().fold(base.to_path_buf(), |p, c| p.join(c)))
}

/// Every `static const NAME:int = ID;` declaration, in source order.
pub fn scan_source(source: &str) -> ResxResult<Vec<RawMapping>> {
    let re = packet_const();
    let mut mappings = Vec::new();

    for line in source.lines() {
        for caps in re.captures_iter(line) {
            let name = &caps[1];
            let id = caps[2].parse::<u32>().map_err(|_| {
                ResxError::BackendOutput(format!("packet id of {name} is out of range: {}", &caps[2]))
            })?;
            mappings.push(RawMapping::new(id, name));
        }
    }

    Ok(mappings)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecompiledSourceBackend;

impl DecompiledSourceBackend {
    /// Scan raw source bytes. No matches is an empty result, not an error;
    /// bytes that are not UTF-8 text are rejected as invalid input.
    pub fn extract_bytes(&self, source: &[u8]) -> ResxResult<ExtractionResult> {
        let text = std::str::from_utf8(source).map_err(|e| {
            ResxError::InvalidInput(format!("decompiled source is not UTF-8 text: {e}"))
        })?;
        let mappings = scan_source(text)?;
        debug!("Found {} packet constants in decompiled source", mappings.len());
        Ok(ExtractionResult::new(mappings, None))
    }
}

#[async_trait]
impl PacketExtractor for DecompiledSourceBackend {
    /// `artifact` is either the connection class itself or the root of a
    /// decompiled client.
    async fn extract(&self, artifact: &Path) -> ResxResult<ExtractionResult> {
        let metadata = tokio::fs::metadata(artifact)
            .await
            .map_err(|e| ResxError::io(artifact, e))?;
        let source_path = if metadata.is_dir() {
            game_server_connection_path(artifact).ok_or_else(|| {
                ResxError::InvalidInput("decompiled client root must not be empty".into())
            })?
        } else {
            artifact.to_path_buf()
        };

        info!("Scanning decompiled source {:?}", source_path);
        let bytes = tokio::fs::read(&source_path)
            .await
            .map_err(|e| ResxError::io(&source_path, e))?;
        self.extract_bytes(&bytes)
    }
}
