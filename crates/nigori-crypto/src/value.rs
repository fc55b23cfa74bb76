//! Randomized AES-CBC + HMAC-SHA256 value encryption
//!
//! Encrypted value format (base64, standard alphabet):
//! ```text
//! [16 bytes: random IV][N bytes: AES-CBC ciphertext, N % 16 == 0][32 bytes: HMAC-SHA256]
//! ```
//! The MAC covers the ciphertext only, not the IV. A fresh IV per call keeps
//! repeated encryptions of one value unlinkable.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nigori_core::{NigoriError, NigoriResult};
use rand::RngCore;

use crate::keys::KeyMaterial;
use crate::{HASH_SIZE, IV_SIZE};

/// Smallest decodable input: IV + one ciphertext block + MAC.
pub const MIN_ENCRYPTED_SIZE: usize = IV_SIZE * 2 + HASH_SIZE;

/// Encrypt `value` under a fresh random IV. `value` must be non-empty.
pub fn encrypt_value(keys: &KeyMaterial, value: &[u8]) -> NigoriResult<String> {
    if value.is_empty() {
        return Err(NigoriError::Precondition("encrypt: value must not be empty"));
    }

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = keys.cbc_encrypt(&iv, value)?;
    let mac = keys.sign(&ciphertext)?;

    let mut output = Vec::with_capacity(IV_SIZE + ciphertext.len() + HASH_SIZE);
    output.extend_from_slice(&iv);
    output.extend_from_slice(&ciphertext);
    output.extend_from_slice(&mac);
    Ok(STANDARD.encode(output))
}

/// Decrypt the output of [`encrypt_value`].
///
/// The MAC is checked (in constant time) before any decryption is attempted.
pub fn decrypt_value(keys: &KeyMaterial, encrypted: &str) -> NigoriResult<Vec<u8>> {
    let input = STANDARD
        .decode(encrypted)
        .map_err(|e| NigoriError::Encoding(e.to_string()))?;

    if input.len() < MIN_ENCRYPTED_SIZE {
        return Err(NigoriError::InvalidLength {
            actual: input.len(),
            minimum: MIN_ENCRYPTED_SIZE,
        });
    }

    let (iv, rest) = input.split_at(IV_SIZE);
    let (ciphertext, mac) = rest.split_at(rest.len() - HASH_SIZE);

    keys.verify(ciphertext, mac)?;

    let iv: &[u8; IV_SIZE] = iv
        .try_into()
        .map_err(|_| NigoriError::Cipher("IV has wrong size".into()))?;
    keys.cbc_decrypt(iv, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_keys() -> KeyMaterial {
        KeyMaterial::import(&[], &[0xABu8; 16], &[0xCDu8; 16]).unwrap()
    }

    fn decode(s: &str) -> Vec<u8> {
        STANDARD.decode(s).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let keys = test_keys();
        let plaintext = b"hello, encrypted world!";

        let encrypted = encrypt_value(&keys, plaintext).unwrap();
        let decrypted = decrypt_value(&keys, &encrypted).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_empty_rejected() {
        let result = encrypt_value(&test_keys(), b"");
        assert!(matches!(result, Err(NigoriError::Precondition(_))));
    }

    #[test]
    fn test_different_iv_each_call() {
        let keys = test_keys();

        let e1 = encrypt_value(&keys, b"value").unwrap();
        let e2 = encrypt_value(&keys, b"value").unwrap();

        assert_ne!(e1, e2);
        assert_ne!(decode(&e1)[..IV_SIZE], decode(&e2)[..IV_SIZE]);
    }

    #[test]
    fn test_encrypted_size() {
        let keys = test_keys();

        // 5 bytes pad to one block, 16 bytes pad to two
        assert_eq!(decode(&encrypt_value(&keys, b"value").unwrap()).len(), 16 + 16 + 32);
        assert_eq!(decode(&encrypt_value(&keys, &[0u8; 16]).unwrap()).len(), 16 + 32 + 32);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let keys = test_keys();
        let other = KeyMaterial::import(&[], &[0xABu8; 16], &[0xEEu8; 16]).unwrap();

        let encrypted = encrypt_value(&keys, b"secret data").unwrap();
        let result = decrypt_value(&other, &encrypted);

        assert!(matches!(result, Err(NigoriError::Integrity)));
    }

    #[test]
    fn test_decrypt_invalid_base64() {
        let result = decrypt_value(&test_keys(), "not base64 at all!");
        assert!(matches!(result, Err(NigoriError::Encoding(_))));
    }

    #[test]
    fn test_decrypt_too_short() {
        let short = STANDARD.encode([0u8; MIN_ENCRYPTED_SIZE - 1]);
        let result = decrypt_value(&test_keys(), &short);
        assert!(matches!(
            result,
            Err(NigoriError::InvalidLength { actual: 63, minimum: 64 })
        ));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let keys = test_keys();
        let mut raw = decode(&encrypt_value(&keys, b"secret data").unwrap());
        raw[IV_SIZE + 3] ^= 0x01;

        let result = decrypt_value(&keys, &STANDARD.encode(raw));
        assert!(matches!(result, Err(NigoriError::Integrity)));
    }

    #[test]
    fn test_tampered_mac() {
        let keys = test_keys();
        let mut raw = decode(&encrypt_value(&keys, b"secret data").unwrap());
        let last = raw.len() - 1;
        raw[last] ^= 0x80;

        let result = decrypt_value(&keys, &STANDARD.encode(raw));
        assert!(matches!(result, Err(NigoriError::Integrity)));
    }

    #[test]
    fn test_tampered_iv_is_not_detected_by_mac() {
        let keys = test_keys();
        let mut raw = decode(&encrypt_value(&keys, b"test").unwrap());
        raw[0] ^= 0x01;

        // The MAC does not cover the IV; CBC flips the matching plaintext bit
        let decrypted = decrypt_value(&keys, &STANDARD.encode(raw)).unwrap();
        assert_eq!(decrypted, b"uest");
    }

    #[test]
    fn test_misaligned_ciphertext_with_valid_mac() {
        let keys = test_keys();
        let ciphertext = [0u8; 17];
        let mac = keys.sign(&ciphertext).unwrap();

        let mut raw = vec![0u8; IV_SIZE];
        raw.extend_from_slice(&ciphertext);
        raw.extend_from_slice(&mac);

        let result = decrypt_value(&keys, &STANDARD.encode(raw));
        assert!(matches!(result, Err(NigoriError::Cipher(_))));
    }

    proptest! {
        #[test]
        fn encrypt_decrypt_roundtrip(data in proptest::collection::vec(any::<u8>(), 1..=4096)) {
            let keys = test_keys();
            let encrypted = encrypt_value(&keys, &data).unwrap();
            prop_assert_eq!(decrypt_value(&keys, &encrypted).unwrap(), data);
        }

        #[test]
        fn any_flipped_ciphertext_or_mac_bit_is_rejected(
            data in proptest::collection::vec(any::<u8>(), 1..=256),
            pos in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let keys = test_keys();
            let mut raw = decode(&encrypt_value(&keys, &data).unwrap());
            let i = IV_SIZE + pos.index(raw.len() - IV_SIZE);
            raw[i] ^= 1 << bit;

            let result = decrypt_value(&keys, &STANDARD.encode(raw));
            prop_assert!(matches!(result, Err(NigoriError::Integrity)));
        }

        #[test]
        fn truncated_input_is_rejected(
            data in proptest::collection::vec(any::<u8>(), 1..=256),
            cut in 1usize..=48,
        ) {
            let keys = test_keys();
            let raw = decode(&encrypt_value(&keys, &data).unwrap());
            let truncated = &raw[..raw.len() - cut];

            prop_assert!(decrypt_value(&keys, &STANDARD.encode(truncated)).is_err());
        }
    }
}
