//! Permute: deterministic authenticated lookup names
//!
//! Output (base64, standard alphabet):
//! ```text
//! [N bytes: AES-CBC(type || name), zero IV][32 bytes: HMAC-SHA256(ciphertext)]
//! ```
//!
//! The zero IV is intentional: the same `(type, name)` under the same keys
//! must map to the same server-side key. This hides the name but is not
//! general-purpose encryption; use [`crate::value`] for secrets.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nigori_core::{NigoriError, NigoriResult, NigoriType};

use crate::keys::KeyMaterial;
use crate::stream::NigoriStream;
use crate::{HASH_SIZE, IV_SIZE};

/// Derive the lookup name for `name` of kind `ty`. `name` must be non-empty.
pub fn permute(keys: &KeyMaterial, ty: NigoriType, name: &str) -> NigoriResult<String> {
    if name.is_empty() {
        return Err(NigoriError::Precondition("permute: name must not be empty"));
    }

    let mut plaintext = NigoriStream::new();
    plaintext.push_type(ty).push_str(name)?;

    let ciphertext = keys.cbc_encrypt(&[0u8; IV_SIZE], plaintext.as_bytes())?;
    let mac = keys.sign(&ciphertext)?;

    let mut output = Vec::with_capacity(ciphertext.len() + HASH_SIZE);
    output.extend_from_slice(&ciphertext);
    output.extend_from_slice(&mac);
    Ok(STANDARD.encode(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_keys() -> KeyMaterial {
        KeyMaterial::import(&[], &[0x55u8; 16], &[0x66u8; 16]).unwrap()
    }

    #[test]
    fn test_deterministic() {
        let keys = test_keys();

        let p1 = permute(&keys, NigoriType::Password, "report.pdf").unwrap();
        let p2 = permute(&keys, NigoriType::Password, "report.pdf").unwrap();

        assert_eq!(p1, p2, "permute must be deterministic");
    }

    #[test]
    fn test_different_names_different_output() {
        let keys = test_keys();

        let p1 = permute(&keys, NigoriType::Password, "name_a").unwrap();
        let p2 = permute(&keys, NigoriType::Password, "name_b").unwrap();

        assert_ne!(p1, p2);
    }

    #[test]
    fn test_different_keys_different_output() {
        let k1 = KeyMaterial::import(&[], &[0x11u8; 16], &[0x66u8; 16]).unwrap();
        let k2 = KeyMaterial::import(&[], &[0x22u8; 16], &[0x66u8; 16]).unwrap();

        let p1 = permute(&k1, NigoriType::Password, "same-name").unwrap();
        let p2 = permute(&k2, NigoriType::Password, "same-name").unwrap();

        assert_ne!(p1, p2);
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = permute(&test_keys(), NigoriType::Password, "");
        assert!(matches!(result, Err(NigoriError::Precondition(_))));
    }

    #[test]
    fn test_output_layout() {
        let keys = test_keys();
        let encoded = permute(&keys, NigoriType::Password, "name").unwrap();
        let raw = STANDARD.decode(encoded).unwrap();

        // type (8) + name (4 + 4) = 16 bytes, padded to two blocks
        assert_eq!(raw.len(), 32 + HASH_SIZE);

        let (ciphertext, mac) = raw.split_at(raw.len() - HASH_SIZE);
        assert!(keys.verify(ciphertext, mac).is_ok());
    }

    #[test]
    fn test_unicode_name() {
        let keys = test_keys();
        let p1 = permute(&keys, NigoriType::Password, "pässwörd-名前").unwrap();
        let p2 = permute(&keys, NigoriType::Password, "pässwörd-名前").unwrap();
        assert_eq!(p1, p2);
    }

    proptest! {
        #[test]
        fn permute_is_deterministic_and_block_aligned(name in "\\PC{1,64}") {
            let keys = test_keys();
            let p1 = permute(&keys, NigoriType::Password, &name).unwrap();
            let p2 = permute(&keys, NigoriType::Password, &name).unwrap();
            prop_assert_eq!(&p1, &p2);

            let raw = STANDARD.decode(p1).unwrap();
            prop_assert_eq!((raw.len() - HASH_SIZE) % IV_SIZE, 0);
        }
    }
}
