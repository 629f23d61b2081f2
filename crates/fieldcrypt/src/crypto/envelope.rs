//! Parsing and serialisation of [`EncryptedEnvelope`] values.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::EnvelopeWire;

use super::cipher::{CipherError, DETERMINISTIC_IV_LEN, RANDOM_IV_LEN, TAG_LEN};

/// Current envelope format generation.
pub const ENVELOPE_VERSION: u32 = 1;

/// A parsed, encrypted field value.
///
/// The string representation is the JSON object described in [`EnvelopeWire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Raw IV bytes (12 or 16).
    pub iv: Vec<u8>,
    /// Raw GCM authentication tag.
    pub auth_tag: [u8; TAG_LEN],
    /// Raw ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Envelope format generation.
    pub version: u32,
}

impl EncryptedEnvelope {
    fn to_wire(&self) -> EnvelopeWire {
        EnvelopeWire {
            iv: STANDARD.encode(&self.iv),
            auth_tag: STANDARD.encode(self.auth_tag),
            encrypted: STANDARD.encode(&self.ciphertext),
            version: self.version,
        }
    }
}

impl fmt::Display for EncryptedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.to_wire()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl FromStr for EncryptedEnvelope {
    type Err = CipherError;

    /// Parse a stored field value back into an [`EncryptedEnvelope`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] if the string is not an envelope of
    /// the current version with well-formed base64 components of the right sizes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Cheap rejection for the common plaintext case.
        if !s.trim_start().starts_with('{') {
            return Err(CipherError::InvalidFormat);
        }
        let wire: EnvelopeWire =
            serde_json::from_str(s).map_err(|_| CipherError::InvalidFormat)?;
        if wire.version != ENVELOPE_VERSION {
            return Err(CipherError::InvalidFormat);
        }

        let iv = decode(&wire.iv)?;
        if iv.len() != RANDOM_IV_LEN && iv.len() != DETERMINISTIC_IV_LEN {
            return Err(CipherError::InvalidFormat);
        }

        let tag_bytes = decode(&wire.auth_tag)?;
        if tag_bytes.len() != TAG_LEN {
            return Err(CipherError::InvalidFormat);
        }
        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(&tag_bytes);

        let ciphertext = decode(&wire.encrypted)?;

        Ok(Self {
            iv,
            auth_tag,
            ciphertext,
            version: wire.version,
        })
    }
}

fn decode(b64: &str) -> Result<Vec<u8>, CipherError> {
    STANDARD.decode(b64).map_err(|_| CipherError::InvalidFormat)
}

/// Returns `true` if `value` parses as a current-version envelope.
///
/// Used to tell already-encrypted values apart from legacy plaintext.
pub fn is_envelope(value: &str) -> bool {
    value.parse::<EncryptedEnvelope>().is_ok()
}
