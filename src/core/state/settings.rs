use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::endpoints::Endpoints;
use crate::core::error::{ResxError, ResxResult};
use crate::core::extractor::BackendKind;

const APP_DIR_NAME: &str = "RealmResx";
const SETTINGS_FILE: &str = "resx_settings.json";

/// Persistent configuration of the updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResxSettings {
    pub backend: BackendKind,
    /// Directory holding the `extractor-*` binaries.
    pub extractor_dir: PathBuf,
    /// Output of an external decompile step, scanned by the
    /// `decompiled_source` backend.
    pub decompiled_dir: Option<PathBuf>,
    /// Replacement for the bundled name catalog.
    pub catalog_path: Option<PathBuf>,
    /// Downloads and snapshots are written here.
    pub work_dir: PathBuf,
    pub endpoints: Endpoints,
}

impl Default for ResxSettings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            backend: BackendKind::Executable,
            extractor_dir: data_dir.join("bin"),
            decompiled_dir: None,
            catalog_path: None,
            work_dir: data_dir.join("work"),
            endpoints: Endpoints::default(),
        }
    }
}

impl ResxSettings {
    /// Settings from `<data_dir>/resx_settings.json`, or defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        match load_settings_from_disk(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!("No settings at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> ResxResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| ResxError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| ResxError::io(&path, e))
    }
}

fn load_settings_from_disk(path: &Path) -> ResxResult<Option<ResxSettings>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ResxError::io(path, e)),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ResxSettings::load_or_default(dir.path());
        assert_eq!(settings, ResxSettings::default());
        assert_eq!(settings.backend, BackendKind::Executable);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ResxSettings {
            backend: BackendKind::DecompiledSource,
            catalog_path: Some(PathBuf::from("/opt/resx/name_map.json")),
            ..ResxSettings::default()
        };
        settings.save(dir.path()).unwrap();
        assert_eq!(ResxSettings::load_or_default(dir.path()), settings);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"backend": "in_process", "endpoints": {"version": "http://mirror/version.txt"}}"#,
        )
        .unwrap();

        let settings = ResxSettings::load_or_default(dir.path());
        assert_eq!(settings.backend, BackendKind::InProcess);
        assert_eq!(settings.endpoints.version, "http://mirror/version.txt");
        assert_eq!(settings.endpoints.asset_base, Endpoints::default().asset_base);
    }

    #[test]
    fn corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(
            ResxSettings::load_or_default(dir.path()),
            ResxSettings::default()
        );
    }
}
