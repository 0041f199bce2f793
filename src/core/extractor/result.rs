use serde::{Deserialize, Serialize};

use crate::core::error::{ResxError, ResxResult};

/// Length of one RC4 key inside [`KeyMaterial`].
pub const RC4_KEY_LEN: usize = 13;

/// A packet constant exactly as a backend reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMapping {
    pub id: u32,
    pub raw_name: String,
}

impl RawMapping {
    pub fn new(id: u32, raw_name: impl Into<String>) -> Self {
        Self {
            id,
            raw_name: raw_name.into(),
        }
    }
}

/// Both RC4 keys of the game connection, outgoing first.
///
/// Opaque: the pipeline only carries it around.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct KeyMaterial([u8; RC4_KEY_LEN * 2]);

impl KeyMaterial {
    pub fn outgoing(&self) -> &[u8] {
        &self.0[..RC4_KEY_LEN]
    }

    pub fn incoming(&self) -> &[u8] {
        &self.0[RC4_KEY_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for KeyMaterial {
    type Error = ResxError;

    fn try_from(bytes: &[u8]) -> ResxResult<Self> {
        let arr: [u8; RC4_KEY_LEN * 2] = bytes
            .try_into()
            .map_err(|_| ResxError::KeyMaterialLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl TryFrom<Vec<u8>> for KeyMaterial {
    type Error = ResxError;

    fn try_from(bytes: Vec<u8>) -> ResxResult<Self> {
        Self::try_from(bytes.as_slice())
    }
}

impl From<KeyMaterial> for Vec<u8> {
    fn from(key: KeyMaterial) -> Self {
        key.0.to_vec()
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

/// Game constants a compiled extractor can recover next to the packet ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameParameters {
    /// Build version baked into the client.
    pub version: String,
    pub port: u16,
    pub tutorial_gameid: i32,
    pub nexus_gameid: i32,
    pub random_gameid: i32,
}

/// What every backend hands to the packet map builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Sorted by id.
    pub mappings: Vec<RawMapping>,
    pub key_material: Option<KeyMaterial>,
    pub parameters: Option<GameParameters>,
}

impl ExtractionResult {
    pub fn new(mut mappings: Vec<RawMapping>, key_material: Option<KeyMaterial>) -> Self {
        // Stable: duplicate ids keep their discovery order.
        mappings.sort_by_key(|m| m.id);
        Self {
            mappings,
            key_material,
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Option<GameParameters>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
