//! Deterministic IV derivation for searchable fields.
//!
//! The IV is `SHA-256(key || plaintext)` truncated to 96 bits. Mixing in the key
//! means a different key produces unrelated ciphertexts for the same value, so
//! encrypted columns cannot be correlated across deployments.
//!
//! Equal plaintexts under one key still share an IV and therefore a ciphertext.
//! That is the point (equality search) and also the weakness: frequency analysis
//! of repeated values remains possible.

use sha2::{Digest, Sha256};

use super::cipher::DETERMINISTIC_IV_LEN;

/// Derive the IV used for deterministic encryption of `plaintext` under `key`.
pub fn deterministic_iv(plaintext: &[u8], key: &[u8]) -> [u8; DETERMINISTIC_IV_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(plaintext);
    let digest = hasher.finalize();

    let mut iv = [0u8; DETERMINISTIC_IV_LEN];
    iv.copy_from_slice(&digest[..DETERMINISTIC_IV_LEN]);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_iv() {
        let key = [1u8; 32];
        assert_eq!(
            deterministic_iv(b"test@example.com", &key),
            deterministic_iv(b"test@example.com", &key)
        );
    }

    #[test]
    fn depends_on_key() {
        assert_ne!(
            deterministic_iv(b"test@example.com", &[1u8; 32]),
            deterministic_iv(b"test@example.com", &[2u8; 32])
        );
    }

    #[test]
    fn depends_on_plaintext() {
        let key = [1u8; 32];
        assert_ne!(deterministic_iv(b"a", &key), deterministic_iv(b"b", &key));
    }

    #[test]
    fn is_truncated_sha256_of_key_then_plaintext() {
        let key = [3u8; 32];
        let mut concat = key.to_vec();
        concat.extend_from_slice(b"5551234");
        let full = Sha256::digest(&concat);
        assert_eq!(&deterministic_iv(b"5551234", &key)[..], &full[..DETERMINISTIC_IV_LEN]);
    }
}
