//! [`FieldCipher`]: authenticated encryption of single string values into envelopes.
//!
//! Every failure on the decrypt path (unparsable envelope, wrong context or
//! AAD, tag mismatch, non-UTF-8 plaintext) collapses into the opaque
//! [`FieldCryptoError::Decryption`]. The precise cause is logged at `debug`
//! without any value content.
//!
//! **Deterministic mode** (`EncryptOptions::deterministic = true`) makes equal
//! plaintexts produce equal envelopes so encrypted columns can be queried by
//! equality. It reveals which rows share a value. Use it for lookup keys such as
//! email and phone only.

use common::FieldCryptoError;
use tracing::debug;

use crate::crypto::cipher::{decrypt_field, encrypt_field};
use crate::crypto::{CipherError, EncryptedEnvelope, IvMode};
use crate::keys::{KeyCache, KeyMaterial};
use crate::registry::FieldKind;

/// Options for [`FieldCipher::encrypt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptOptions<'a> {
    /// Derive the IV from key and plaintext instead of drawing it at random.
    pub deterministic: bool,
    /// Field context the key is scoped to.
    pub context: &'a str,
    /// Associated data authenticated alongside the value; must match on decrypt.
    ///
    /// Randomized mode only. A deterministic IV repeated under different AAD
    /// reuses a GCM nonce, so [`FieldCipher::encrypt`] rejects the combination.
    pub aad: Option<&'a str>,
}

/// Options for [`FieldCipher::decrypt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptOptions<'a> {
    /// Field context the value was encrypted under.
    pub context: &'a str,
    /// Associated data supplied at encryption time.
    pub aad: Option<&'a str>,
}

/// Encrypts and decrypts field values with per-context derived keys.
///
/// Stateless apart from the derived-key cache; cheap to share behind an `Arc`
/// and safe to call from many threads at once.
#[derive(Debug, Clone)]
pub struct FieldCipher {
    keys: KeyCache,
}

impl FieldCipher {
    /// Create a cipher over validated key material.
    pub fn new(material: KeyMaterial) -> Self {
        Self {
            keys: KeyCache::new(material),
        }
    }

    /// Derive the key of every [`FieldKind`] up front.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Configuration`] if a key cannot be derived.
    pub fn warm_up(&self) -> Result<(), FieldCryptoError> {
        self.keys
            .warm(FieldKind::ALL.iter().map(|k| k.context()))
            .map_err(|e| FieldCryptoError::Configuration(e.to_string()))
    }

    /// Encrypt `plaintext` into a parsed envelope.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Encryption`] if `aad` is combined with
    /// deterministic mode, or if key derivation or the AEAD fails.
    pub fn encrypt_envelope(
        &self,
        plaintext: &str,
        opts: &EncryptOptions<'_>,
    ) -> Result<EncryptedEnvelope, FieldCryptoError> {
        if opts.deterministic && opts.aad.is_some() {
            return Err(FieldCryptoError::Encryption(
                "associated data is not supported in deterministic mode".into(),
            ));
        }
        let key = self.keys.get(opts.context).map_err(encryption_error)?;
        let mode = if opts.deterministic {
            IvMode::Deterministic
        } else {
            IvMode::Random
        };
        encrypt_field(
            plaintext.as_bytes(),
            key.as_bytes(),
            mode,
            opts.aad.unwrap_or_default().as_bytes(),
        )
        .map_err(encryption_error)
    }

    /// Encrypt `plaintext` into its storable envelope string.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Encryption`] if key derivation or the AEAD fails.
    pub fn encrypt(
        &self,
        plaintext: &str,
        opts: &EncryptOptions<'_>,
    ) -> Result<String, FieldCryptoError> {
        Ok(self.encrypt_envelope(plaintext, opts)?.to_string())
    }

    /// Decrypt a stored envelope string back to plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Decryption`] on any failure.
    pub fn decrypt(
        &self,
        envelope: &str,
        opts: &DecryptOptions<'_>,
    ) -> Result<String, FieldCryptoError> {
        self.try_decrypt(envelope, opts).map_err(|e| {
            debug!(context = opts.context, cause = %e, "field decryption failed");
            FieldCryptoError::Decryption
        })
    }

    fn try_decrypt(&self, envelope: &str, opts: &DecryptOptions<'_>) -> Result<String, CipherError> {
        let parsed: EncryptedEnvelope = envelope.parse()?;
        let key = self.keys.get(opts.context)?;
        let bytes = decrypt_field(&parsed, key.as_bytes(), opts.aad.unwrap_or_default().as_bytes())?;
        String::from_utf8(bytes).map_err(|_| CipherError::InvalidFormat)
    }

    /// Normalise `value` for `kind` and encrypt it with the kind's policy.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Encryption`] if the cipher fails.
    pub fn encrypt_value(&self, value: &str, kind: FieldKind) -> Result<String, FieldCryptoError> {
        self.encrypt(&kind.normalize(value), &kind.encrypt_options())
    }

    /// Decrypt a value stored for a field of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Decryption`] on any failure.
    pub fn decrypt_value(&self, envelope: &str, kind: FieldKind) -> Result<String, FieldCryptoError> {
        self.decrypt(envelope, &kind.decrypt_options())
    }
}

fn encryption_error(e: CipherError) -> FieldCryptoError {
    FieldCryptoError::Encryption(e.to_string())
}
