//! nigori-crypto: client-side Nigori key derivation and value protection
//!
//! A (partial) implementation of Nigori, a protocol for storing secrets in the
//! cloud. Server authentication and assisted key derivation are not supported.
//!
//! To store a secret, derive a lookup name with [`Nigori::permute`] (basically
//! a map key) and protect the value with [`Nigori::encrypt`] /
//! [`Nigori::decrypt`].
//!
//! Key triple:
//! ```text
//! passphrase ──PBKDF2-HMAC-SHA1 (hostname, username) or scrypt──┐
//!   ├── legacy key      (128-bit, exported for old clients only)
//!   ├── encryption key  (AES-128-CBC)
//!   └── MAC key         (HMAC-SHA256)
//! ```

pub mod export;
pub mod kdf;
pub mod keys;
pub mod names;
pub mod stream;
pub mod value;

pub use export::ExportedKeys;
pub use keys::{KeyMaterial, SymmetricKey};
pub use nigori_core::{KeyDerivationMethod, NigoriError, NigoriResult, NigoriType};
pub use stream::NigoriStream;

use secrecy::SecretString;

/// Size of a derived key in bytes (128-bit)
pub const DERIVED_KEY_SIZE: usize = 16;

/// AES key sizes accepted on import
pub const AES_128_KEY_SIZE: usize = 16;
pub const AES_256_KEY_SIZE: usize = 32;

/// Size of an AES-CBC initialization vector (one block)
pub const IV_SIZE: usize = 16;

/// Size of an HMAC-SHA256 tag
pub const HASH_SIZE: usize = 32;

/// A fully initialized Nigori instance.
///
/// Construction either yields complete key material or an error; there is no
/// half-initialized state. Instances are immutable and safe to share across
/// threads. A new key epoch means a new instance.
#[derive(Debug, Clone)]
pub struct Nigori {
    keys: KeyMaterial,
}

impl Nigori {
    /// Derive keys from `hostname`, `username` and `password` using `method`.
    ///
    /// Only [`KeyDerivationMethod::Pbkdf2HmacSha1_1003`] is accepted here.
    pub fn init_by_derivation(
        method: KeyDerivationMethod,
        hostname: &str,
        username: &str,
        password: &SecretString,
    ) -> NigoriResult<Self> {
        match method {
            KeyDerivationMethod::Pbkdf2HmacSha1_1003 => {
                tracing::debug!(%method, "deriving nigori keys");
                let keys = kdf::derive_pbkdf2(hostname, username, password)?;
                Ok(Self { keys })
            }
            KeyDerivationMethod::Unknown => Err(NigoriError::UnsupportedMethod(method)),
        }
    }

    /// Derive keys from a passphrase alone using scrypt.
    pub fn init_by_derivation_scrypt(password: &SecretString) -> NigoriResult<Self> {
        tracing::debug!("deriving nigori keys with scrypt");
        let keys = kdf::derive_scrypt(password)?;
        Ok(Self { keys })
    }

    /// Restore previously exported keys. `legacy_key` may be empty.
    pub fn init_by_import(
        legacy_key: &[u8],
        encryption_key: &[u8],
        mac_key: &[u8],
    ) -> NigoriResult<Self> {
        let keys = KeyMaterial::import(legacy_key, encryption_key, mac_key)?;
        Ok(Self { keys })
    }

    /// Derive a base64 lookup name for `name`. Same keys, type and name
    /// always give the same result.
    pub fn permute(&self, ty: NigoriType, name: &str) -> NigoriResult<String> {
        names::permute(&self.keys, ty, name)
    }

    /// Encrypt `value`; the result is base64.
    pub fn encrypt(&self, value: &[u8]) -> NigoriResult<String> {
        value::encrypt_value(&self.keys, value)
    }

    /// Decrypt a base64 value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, encrypted: &str) -> NigoriResult<Vec<u8>> {
        value::decrypt_value(&self.keys, encrypted)
    }

    /// Raw key bytes for persistence. An absent legacy key exports as empty.
    pub fn export_keys(&self) -> ExportedKeys {
        ExportedKeys::from_key_material(&self.keys)
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }
}
