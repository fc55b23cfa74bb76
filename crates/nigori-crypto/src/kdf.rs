//! Key derivation: passphrase → Nigori key triple
//!
//! Two schemes, never mixed within one instance:
//! ```text
//! PBKDF2 (hostname, username, password):
//!   Suser = PBKDF2-HMAC-SHA1(len||username || len||hostname, "saltsalt", 1001, 16)
//!   Kuser = PBKDF2-HMAC-SHA1(password, Suser, 1002, 16)
//!   Kenc  = PBKDF2-HMAC-SHA1(password, Suser, 1003, 16)
//!   Kmac  = PBKDF2-HMAC-SHA1(password, Suser, 1004, 16)
//!
//! scrypt (password):
//!   M     = scrypt(password, "ScryptConstantSalt", N=8192, r=8, p=1, 32)
//!   Kenc  = M[0..16], Kmac = M[16..32], Kuser = 16 zero bytes
//! ```
//! Every constant here changes the output for identical inputs, so none of
//! them are configurable.

use hmac::Hmac;
use nigori_core::{NigoriError, NigoriResult};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::keys::{KeyMaterial, SymmetricKey};
use crate::stream::NigoriStream;
use crate::DERIVED_KEY_SIZE;

/// Salt for deriving the per-user salt.
pub const PBKDF2_SALT_SALT: &[u8] = b"saltsalt";
pub const PBKDF2_SALT_ITERATIONS: u32 = 1001;
pub const PBKDF2_USER_ITERATIONS: u32 = 1002;
pub const PBKDF2_ENCRYPTION_ITERATIONS: u32 = 1003;
pub const PBKDF2_MAC_ITERATIONS: u32 = 1004;

pub const SCRYPT_SALT: &[u8] = b"ScryptConstantSalt";
/// log2 of the scrypt cost parameter N = 8192
pub const SCRYPT_LOG_N: u8 = 13;
pub const SCRYPT_BLOCK_SIZE: u32 = 8;
pub const SCRYPT_PARALLELISM: u32 = 1;
pub const SCRYPT_MAX_MEMORY_BYTES: u64 = 32 * 1024 * 1024;

/// Derive the key triple with the PBKDF2-HMAC-SHA1 scheme.
///
/// Empty strings are accepted; the derivation is deterministic either way.
pub fn derive_pbkdf2(
    hostname: &str,
    username: &str,
    password: &SecretString,
) -> NigoriResult<KeyMaterial> {
    let mut salt_input = NigoriStream::new();
    salt_input.push_str(username)?.push_str(hostname)?;

    let user_salt = pbkdf2_sha1(
        salt_input.as_bytes(),
        PBKDF2_SALT_SALT,
        PBKDF2_SALT_ITERATIONS,
    )?;

    let password = password.expose_secret().as_bytes();
    let legacy = pbkdf2_sha1(password, &user_salt[..], PBKDF2_USER_ITERATIONS)?;
    let encryption = pbkdf2_sha1(password, &user_salt[..], PBKDF2_ENCRYPTION_ITERATIONS)?;
    let mac = pbkdf2_sha1(password, &user_salt[..], PBKDF2_MAC_ITERATIONS)?;

    Ok(KeyMaterial {
        legacy_key: Some(SymmetricKey::from_derived(&legacy)),
        encryption_key: SymmetricKey::from_derived(&encryption),
        mac_key: SymmetricKey::from_derived(&mac),
    })
}

/// Derive the key triple with the scrypt scheme.
///
/// The legacy key is an all-zero placeholder so that exports stay importable
/// by clients that insist on one. It is not secret.
pub fn derive_scrypt(password: &SecretString) -> NigoriResult<KeyMaterial> {
    let required = scrypt_memory_bytes(SCRYPT_LOG_N, SCRYPT_BLOCK_SIZE, SCRYPT_PARALLELISM);
    if required > SCRYPT_MAX_MEMORY_BYTES {
        return Err(NigoriError::Derivation(format!(
            "scrypt needs {required} bytes, limit is {SCRYPT_MAX_MEMORY_BYTES}"
        )));
    }

    let params = scrypt::Params::new(
        SCRYPT_LOG_N,
        SCRYPT_BLOCK_SIZE,
        SCRYPT_PARALLELISM,
        2 * DERIVED_KEY_SIZE,
    )
    .map_err(|e| NigoriError::Derivation(format!("invalid scrypt params: {e}")))?;

    let mut master = Zeroizing::new([0u8; 2 * DERIVED_KEY_SIZE]);
    scrypt::scrypt(
        password.expose_secret().as_bytes(),
        SCRYPT_SALT,
        &params,
        &mut master[..],
    )
    .map_err(|e| NigoriError::Derivation(format!("scrypt failed: {e}")))?;

    let (encryption, mac) = master.split_at(DERIVED_KEY_SIZE);
    Ok(KeyMaterial {
        legacy_key: Some(SymmetricKey::from_derived(&[0u8; DERIVED_KEY_SIZE])),
        encryption_key: SymmetricKey::import_aes(encryption)
            .map_err(|e| NigoriError::Derivation(e.to_string()))?,
        mac_key: SymmetricKey::import_hmac(mac)
            .map_err(|e| NigoriError::Derivation(e.to_string()))?,
    })
}

/// Approximate scrypt working set: `128 * r * (N + p)` bytes.
fn scrypt_memory_bytes(log_n: u8, r: u32, p: u32) -> u64 {
    128 * u64::from(r) * ((1u64 << log_n) + u64::from(p))
}

fn pbkdf2_sha1(
    password: &[u8],
    salt: &[u8],
    rounds: u32,
) -> NigoriResult<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
    let mut out = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
    pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, rounds, &mut out[..])
        .map_err(|e| NigoriError::Derivation(format!("PBKDF2-HMAC-SHA1 failed: {e}")))?;
    Ok(out)
}
