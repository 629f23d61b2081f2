//! AES-256-GCM field encryption primitives.
//!
//! No storage or registry dependencies live here.
//! It provides key derivation, IV selection, the envelope codec and the raw
//! seal/open operations used by [`crate::field_cipher::FieldCipher`].
//!
//! # Envelope format
//!
//! ```text
//! {"iv":"<base64>","authTag":"<base64>","encrypted":"<base64>","version":1}
//! ```
//!
//! The `version` tag enables future algorithm or key-version migration without
//! breaking existing ciphertext.

pub mod cipher;
pub mod envelope;
pub mod iv;
pub mod kdf;

pub use cipher::{CipherError, IvMode, KEY_LEN};
pub use envelope::{is_envelope, EncryptedEnvelope, ENVELOPE_VERSION};
pub use kdf::{derive_key, DerivedKey, PBKDF2_ITERATIONS};
