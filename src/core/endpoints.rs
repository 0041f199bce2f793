// ─── Endpoints ───
// Well-known URLs of the live game service and its asset mirror.

use serde::{Deserialize, Serialize};

use crate::core::error::{ResxError, ResxResult};

/// Account/character list, also carries the public server list.
pub const CHAR_LIST: &str = "https://realmofthemadgodhrd.appspot.com/char/list";
/// Mirror of the extracted game resources.
pub const STATIC_DRIPS: &str = "https://static.drips.pw/rotmg/production";
/// Plain-text current client build.
pub const VERSION: &str = "https://www.realmofthemadgod.com/version.txt";
/// Client download; `{{version}}` is replaced with a client build.
pub const GAME_CLIENT_TEMPLATE: &str =
    "https://www.realmofthemadgod.com/AssembleeGameClient{{version}}.swf";

const VERSION_PLACEHOLDER: &str = "{{version}}";

/// Asset version alias that always points at the latest resources.
pub const CURRENT_ASSETS: &str = "current";

/// Endpoint set used by every fetcher. Overridable from settings so a
/// mirror (or a test server) can stand in for the live service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub char_list: String,
    pub asset_base: String,
    pub version: String,
    pub game_client_template: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            char_list: CHAR_LIST.to_string(),
            asset_base: STATIC_DRIPS.to_string(),
            version: VERSION.to_string(),
            game_client_template: GAME_CLIENT_TEMPLATE.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at `base`, keeping the live paths.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            char_list: format!("{base}/char/list"),
            asset_base: format!("{base}/rotmg/production"),
            version: format!("{base}/version.txt"),
            game_client_template: format!("{base}/AssembleeGameClient{VERSION_PLACEHOLDER}.swf"),
        }
    }

    pub fn client_url(&self, version: &str) -> ResxResult<String> {
        validate_version(version)?;
        Ok(self.game_client_template.replace(VERSION_PLACEHOLDER, version))
    }

    pub fn asset_version_url(&self) -> String {
        format!(
            "{}/{}/version.txt",
            self.asset_base.trim_end_matches('/'),
            CURRENT_ASSETS
        )
    }

    /// `<asset-base>/<version>/json/<file>`
    pub fn asset_json_url(&self, version: &str, file: &str) -> ResxResult<String> {
        validate_version(version)?;
        Ok(format!(
            "{}/{}/json/{}",
            self.asset_base.trim_end_matches('/'),
            version,
            file
        ))
    }

    pub fn char_list_url(&self, guid: &str) -> String {
        format!("{}?guid={}", self.char_list, guid)
    }
}

/// A version is spliced into URL paths, so it must be a single non-empty
/// path segment.
pub fn validate_version(version: &str) -> ResxResult<()> {
    if version.is_empty() {
        return Err(ResxError::InvalidInput("version must not be empty".into()));
    }
    if let Some(bad) = version
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '?' | '#') || c.is_whitespace())
    {
        return Err(ResxError::InvalidInput(format!(
            "version {version:?} contains forbidden character {bad:?}"
        )));
    }
    Ok(())
}
