use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{NigoriError, NigoriResult};
use crate::types::KeyDerivationMethod;

/// Top-level configuration (loaded from nigori.toml)
///
/// KDF iteration counts and scrypt costs are deliberately absent: they are
/// part of the output format and cannot vary per installation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NigoriConfig {
    pub logging: LoggingConfig,
    pub derivation: DerivationConfig,
    pub keys: KeysConfig,
}

impl NigoriConfig {
    /// Parse a TOML document; missing sections and fields take defaults.
    pub fn from_toml(content: &str) -> NigoriResult<Self> {
        toml::from_str(content).map_err(|e| NigoriError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// Method used by `nigori derive` unless `--scrypt` is given
    pub method: KeyDerivationMethod,
    /// Default hostname mixed into the PBKDF2 salt
    pub hostname: Option<String>,
    /// Default username mixed into the PBKDF2 salt
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Exported keys file (JSON, base64 fields)
    pub keys_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            method: KeyDerivationMethod::Pbkdf2HmacSha1_1003,
            hostname: Some("localhost".into()),
            username: None,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            keys_file: PathBuf::from("~/.config/nigori/keys.json"),
        }
    }
}
