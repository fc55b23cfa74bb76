use thiserror::Error;

use crate::types::KeyDerivationMethod;

pub type NigoriResult<T> = Result<T, NigoriError>;

#[derive(Debug, Error)]
pub enum NigoriError {
    /// PBKDF2 or scrypt produced no key. The instance was never built.
    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("unsupported key derivation method: {0}")]
    UnsupportedMethod(KeyDerivationMethod),

    /// Raw key bytes (or a keys file) could not be turned into key material.
    #[error("key import failed: {0}")]
    Import(String),

    #[error("base64 decode failed: {0}")]
    Encoding(String),

    #[error("encrypted value too short: {actual} bytes (minimum {minimum})")]
    InvalidLength { actual: usize, minimum: usize },

    /// MAC mismatch on decrypt. No plaintext is released.
    #[error("integrity check failed: MAC mismatch")]
    Integrity,

    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
