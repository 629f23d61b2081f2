//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! Two IV regimes share the same key:
//!
//! - [`IvMode::Random`]: a fresh 128-bit IV from the OS CSPRNG per call. Two
//!   encryptions of the same value are unlinkable.
//! - [`IvMode::Deterministic`]: a 96-bit IV derived from `SHA-256(key || plaintext)`
//!   (see [`super::iv`]). Identical plaintext yields identical output, which is
//!   what makes equality lookups on encrypted columns possible.
//!
//! **Deterministic mode leaks which rows share a value.** Reserve it for fields
//! that must be searchable (email, phone), never for free text.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm};
use thiserror::Error;

use super::envelope::{EncryptedEnvelope, ENVELOPE_VERSION};
use super::iv::deterministic_iv;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of a randomized IV (16 bytes = 128 bits).
pub const RANDOM_IV_LEN: usize = 16;

/// Byte length of a deterministic IV (12 bytes = 96 bits).
pub const DETERMINISTIC_IV_LEN: usize = 12;

/// Byte length of the GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM with a 128-bit nonce, used for randomized IVs.
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// How the IV for a single encryption is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvMode {
    /// Fresh random IV per call.
    Random,
    /// IV derived from key and plaintext; searchable but leaks repetition.
    Deterministic,
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The encrypted field string does not match the expected envelope shape.
    #[error("invalid encrypted field format")]
    InvalidFormat,
}

/// Encrypt `plaintext` with AES-256-GCM, binding `aad` into the tag.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be unreachable
/// with a valid key and IV).
pub fn encrypt_field(
    plaintext: &[u8],
    key: &[u8],
    mode: IvMode,
    aad: &[u8],
) -> Result<EncryptedEnvelope, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }

    let mut buffer = plaintext.to_vec();
    let (iv, auth_tag) = match mode {
        IvMode::Random => {
            let mut iv = [0u8; RANDOM_IV_LEN];
            OsRng.fill_bytes(&mut iv);
            let tag = seal::<Aes256Gcm128>(key, &iv, aad, &mut buffer)?;
            (iv.to_vec(), tag)
        }
        IvMode::Deterministic => {
            let iv = deterministic_iv(plaintext, key);
            let tag = seal::<Aes256Gcm>(key, &iv, aad, &mut buffer)?;
            (iv.to_vec(), tag)
        }
    };

    Ok(EncryptedEnvelope {
        iv,
        auth_tag,
        ciphertext: buffer,
        version: ENVELOPE_VERSION,
    })
}

/// Decrypt an [`EncryptedEnvelope`] back to plaintext bytes.
///
/// The GCM nonce size is selected from the IV length carried by the envelope.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::InvalidFormat`] if the envelope has an unsupported IV length
/// or version.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key, wrong AAD or
/// tampered data).
pub fn decrypt_field(
    envelope: &EncryptedEnvelope,
    key: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    if envelope.version != ENVELOPE_VERSION {
        return Err(CipherError::InvalidFormat);
    }

    let mut buffer = envelope.ciphertext.clone();
    match envelope.iv.len() {
        RANDOM_IV_LEN => open::<Aes256Gcm128>(key, envelope, aad, &mut buffer)?,
        DETERMINISTIC_IV_LEN => open::<Aes256Gcm>(key, envelope, aad, &mut buffer)?,
        _ => return Err(CipherError::InvalidFormat),
    }
    Ok(buffer)
}

/// Encrypt `buffer` in place and return the detached tag.
///
/// `iv` must already have the nonce length of `C`.
fn seal<C>(key: &[u8], iv: &[u8], aad: &[u8], buffer: &mut [u8]) -> Result<[u8; TAG_LEN], CipherError>
where
    C: AeadInPlace + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), aad, buffer)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(tag.as_slice());
    Ok(out)
}

/// Verify the tag and decrypt `buffer` in place.
///
/// `envelope.iv` must already have the nonce length of `C`.
fn open<C>(
    key: &[u8],
    envelope: &EncryptedEnvelope,
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<(), CipherError>
where
    C: AeadInPlace + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&envelope.iv),
            aad,
            buffer,
            GenericArray::from_slice(&envelope.auth_tag),
        )
        .map_err(|_| CipherError::AeadFailure)
}
