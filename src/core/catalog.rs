// ─── Name Catalog ───
// Maps the constant names found in a client build to the packet type names
// used by protocol code. Loaded once, never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::core::error::{ResxError, ResxResult};

/// Table shipped with the crate. Bump it whenever the client renames a
/// packet constant.
const BUNDLED_NAME_MAP: &str = include_str!("../../resources/name_map.json");

static BUNDLED: OnceLock<NameCatalog> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCatalog {
    entries: HashMap<String, String>,
}

impl NameCatalog {
    /// The table compiled into the crate, parsed on first use.
    pub fn bundled() -> ResxResult<&'static NameCatalog> {
        if let Some(catalog) = BUNDLED.get() {
            return Ok(catalog);
        }

        let catalog = NameCatalog::from_json(BUNDLED_NAME_MAP)?;
        Ok(BUNDLED.get_or_init(|| catalog))
    }

    /// Parse a JSON object of `"RAW_NAME": "CANONICAL_NAME"` pairs.
    pub fn from_json(raw: &str) -> ResxResult<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| ResxError::InvalidInput(format!("name catalog is not valid JSON: {e}")))?;

        if let Some((raw_name, _)) = entries
            .iter()
            .find(|(k, v)| k.trim().is_empty() || v.trim().is_empty())
        {
            return Err(ResxError::InvalidInput(format!(
                "name catalog contains an empty name (key {raw_name:?})"
            )));
        }

        debug!("Parsed name catalog with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Load a catalog from disk, e.g. a newer table than the bundled one.
    pub async fn load(path: &Path) -> ResxResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ResxError::io(path, e))?;
        let catalog = Self::from_json(&raw)?;
        info!("Loaded {} packet names from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Canonical name for a backend-reported name. Case-sensitive.
    pub fn canonical(&self, raw_name: &str) -> Option<&str> {
        self.entries.get(raw_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for NameCatalog
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
