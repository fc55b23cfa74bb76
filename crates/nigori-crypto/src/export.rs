//! Raw key export and the persisted keys file
//!
//! Exported keys are plain byte strings. An absent legacy key exports as an
//! empty string, and an empty string imports as an absent key; that is the
//! only place the two meet.
//!
//! On disk the keys are JSON with base64 (standard alphabet) fields:
//! ```text
//! {"version":1,"legacy_key":"…","encryption_key":"…","mac_key":"…"}
//! ```

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nigori_core::{NigoriError, NigoriResult};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::keys::KeyMaterial;
use crate::Nigori;

/// Current keys file format version
pub const KEYS_FILE_VERSION: u32 = 1;

/// Raw key bytes as returned by [`Nigori::export_keys`]. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ExportedKeys {
    legacy_key: Vec<u8>,
    encryption_key: Vec<u8>,
    mac_key: Vec<u8>,
}

/// Serialized form of [`ExportedKeys`]
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct KeysFile {
    version: u32,
    legacy_key: String,
    encryption_key: String,
    mac_key: String,
}

impl ExportedKeys {
    pub fn new(legacy_key: Vec<u8>, encryption_key: Vec<u8>, mac_key: Vec<u8>) -> Self {
        Self {
            legacy_key,
            encryption_key,
            mac_key,
        }
    }

    pub(crate) fn from_key_material(keys: &KeyMaterial) -> Self {
        Self {
            legacy_key: keys
                .legacy_key()
                .map(|k| k.as_bytes().to_vec())
                .unwrap_or_default(),
            encryption_key: keys.encryption_key().as_bytes().to_vec(),
            mac_key: keys.mac_key().as_bytes().to_vec(),
        }
    }

    /// Legacy key bytes; empty if the key is absent.
    pub fn legacy_key(&self) -> &[u8] {
        &self.legacy_key
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &[u8] {
        &self.mac_key
    }

    /// Rebuild a [`Nigori`] from these keys.
    pub fn import(&self) -> NigoriResult<Nigori> {
        Nigori::init_by_import(&self.legacy_key, &self.encryption_key, &self.mac_key)
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> NigoriResult<Zeroizing<Vec<u8>>> {
        let file = KeysFile {
            version: KEYS_FILE_VERSION,
            legacy_key: STANDARD.encode(&self.legacy_key),
            encryption_key: STANDARD.encode(&self.encryption_key),
            mac_key: STANDARD.encode(&self.mac_key),
        };
        serde_json::to_vec_pretty(&file)
            .map(Zeroizing::new)
            .map_err(|e| NigoriError::Other(anyhow::anyhow!("keys file serialization: {e}")))
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> NigoriResult<Self> {
        let file: KeysFile = serde_json::from_slice(data)
            .map_err(|e| NigoriError::Import(format!("keys file deserialization: {e}")))?;

        if file.version != KEYS_FILE_VERSION {
            return Err(NigoriError::Import(format!(
                "unsupported keys file version {} (expected {KEYS_FILE_VERSION})",
                file.version
            )));
        }

        Ok(Self {
            legacy_key: base64_decode("legacy_key", &file.legacy_key)?,
            encryption_key: base64_decode("encryption_key", &file.encryption_key)?,
            mac_key: base64_decode("mac_key", &file.mac_key)?,
        })
    }

    /// Load a keys file written by [`save`](Self::save).
    pub fn load(path: &Path) -> NigoriResult<Self> {
        let data = Zeroizing::new(std::fs::read(path)?);
        Self::from_bytes(&data)
    }

    /// Write the keys file, creating parent directories. Owner-only on unix.
    pub fn save(&self, path: &Path) -> NigoriResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes.as_slice())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        tracing::debug!(path = %path.display(), "wrote keys file");
        Ok(())
    }
}

fn base64_decode(field: &str, s: &str) -> NigoriResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| NigoriError::Import(format!("{field}: base64 decode: {e}")))
}

impl std::fmt::Debug for ExportedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedKeys")
            .field("legacy_key", &"[REDACTED]")
            .field("encryption_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}
