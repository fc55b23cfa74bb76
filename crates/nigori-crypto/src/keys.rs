//! Key material: the legacy/encryption/MAC triple and the primitives bound to it

use aes::{Aes128, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use nigori_core::{NigoriError, NigoriResult};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{AES_128_KEY_SIZE, AES_256_KEY_SIZE, DERIVED_KEY_SIZE, HASH_SIZE, IV_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Raw symmetric key bytes. Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: Vec<u8>,
}

impl SymmetricKey {
    pub(crate) fn from_derived(bytes: &[u8; DERIVED_KEY_SIZE]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Import an AES key. Only 128- and 256-bit keys are accepted.
    pub fn import_aes(bytes: &[u8]) -> NigoriResult<Self> {
        match bytes.len() {
            AES_128_KEY_SIZE | AES_256_KEY_SIZE => Ok(Self {
                bytes: bytes.to_vec(),
            }),
            n => Err(NigoriError::Import(format!(
                "AES key must be {AES_128_KEY_SIZE} or {AES_256_KEY_SIZE} bytes, got {n}"
            ))),
        }
    }

    /// Import HMAC key material. Any non-empty length is accepted.
    pub fn import_hmac(bytes: &[u8]) -> NigoriResult<Self> {
        if bytes.is_empty() {
            return Err(NigoriError::Import("HMAC key must not be empty".into()));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The three Nigori keys.
///
/// The legacy ("user") key is unused by the protocol. Older clients refuse to
/// import keys without one, so it is carried for export only.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub(crate) legacy_key: Option<SymmetricKey>,
    pub(crate) encryption_key: SymmetricKey,
    pub(crate) mac_key: SymmetricKey,
}

impl KeyMaterial {
    /// Build key material from raw bytes, as produced by an earlier export.
    ///
    /// An empty legacy key means "absent". A malformed legacy key is also
    /// treated as absent rather than failing the import, since nothing reads it.
    pub fn import(legacy_key: &[u8], encryption_key: &[u8], mac_key: &[u8]) -> NigoriResult<Self> {
        let encryption_key = SymmetricKey::import_aes(encryption_key)?;
        let mac_key = SymmetricKey::import_hmac(mac_key)?;

        let legacy_key = if legacy_key.is_empty() {
            None
        } else {
            match SymmetricKey::import_aes(legacy_key) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!("ignoring malformed legacy key: {e}");
                    None
                }
            }
        };

        Ok(Self {
            legacy_key,
            encryption_key,
            mac_key,
        })
    }

    pub fn legacy_key(&self) -> Option<&SymmetricKey> {
        self.legacy_key.as_ref()
    }

    pub fn encryption_key(&self) -> &SymmetricKey {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &SymmetricKey {
        &self.mac_key
    }

    /// AES-CBC with PKCS#7 padding under the encryption key.
    pub(crate) fn cbc_encrypt(&self, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> NigoriResult<Vec<u8>> {
        let key = self.encryption_key.as_bytes();
        let ciphertext = match key.len() {
            AES_128_KEY_SIZE => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|e| NigoriError::Cipher(format!("AES-128-CBC init: {e}")))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            AES_256_KEY_SIZE => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|e| NigoriError::Cipher(format!("AES-256-CBC init: {e}")))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            n => {
                return Err(NigoriError::Cipher(format!(
                    "unsupported AES key size: {n} bytes"
                )))
            }
        };
        Ok(ciphertext)
    }

    /// Inverse of [`cbc_encrypt`](Self::cbc_encrypt). Fails on misaligned input
    /// or bad padding.
    pub(crate) fn cbc_decrypt(&self, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> NigoriResult<Vec<u8>> {
        let key = self.encryption_key.as_bytes();
        let plaintext = match key.len() {
            AES_128_KEY_SIZE => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|e| NigoriError::Cipher(format!("AES-128-CBC init: {e}")))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            AES_256_KEY_SIZE => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|e| NigoriError::Cipher(format!("AES-256-CBC init: {e}")))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            n => {
                return Err(NigoriError::Cipher(format!(
                    "unsupported AES key size: {n} bytes"
                )))
            }
        };
        plaintext.map_err(|_| NigoriError::Cipher("CBC decryption failed: bad padding".into()))
    }

    /// HMAC-SHA256 over `data` under the MAC key.
    pub(crate) fn sign(&self, data: &[u8]) -> NigoriResult<[u8; HASH_SIZE]> {
        let mut mac = self.hmac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }

    /// Constant-time check of `tag` against HMAC-SHA256 over `data`.
    pub(crate) fn verify(&self, data: &[u8], tag: &[u8]) -> NigoriResult<()> {
        let mut mac = self.hmac()?;
        mac.update(data);
        mac.verify_slice(tag).map_err(|_| NigoriError::Integrity)
    }

    fn hmac(&self) -> NigoriResult<HmacSha256> {
        HmacSha256::new_from_slice(self.mac_key.as_bytes())
            .map_err(|e| NigoriError::Cipher(format!("HMAC-SHA256 init: {e}")))
    }
}
