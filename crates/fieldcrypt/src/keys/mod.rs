//! Key material and the process-wide derived-key cache.
//!
//! # Lifecycle
//!
//! 1. At startup [`crate::config::Config::key_material`] validates the master
//!    secret and salt and produces a [`KeyMaterial`].
//! 2. [`KeyCache`] derives one key per field context on first use and keeps it
//!    for the process lifetime.
//! 3. Cipher calls borrow keys as `Arc<DerivedKey>`; nothing is re-derived.
//!
//! # Security invariants
//!
//! - Derived keys are **never** written to disk, logged, or included in traces.
//! - The master secret and salt never appear in `Debug` output.

pub mod store;

pub use store::KeyCache;

/// Master secret and salt that every field key is derived from.
#[derive(Clone)]
pub struct KeyMaterial {
    master_secret: String,
    salt: String,
}

impl KeyMaterial {
    /// Wrap an already-validated secret and salt.
    pub fn new(master_secret: impl Into<String>, salt: impl Into<String>) -> Self {
        Self {
            master_secret: master_secret.into(),
            salt: salt.into(),
        }
    }

    /// The master secret.
    pub fn master_secret(&self) -> &str {
        &self.master_secret
    }

    /// The salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_material_redacted_in_debug() {
        let km = KeyMaterial::new("super-secret-master-value-0123456789", "salt");
        let shown = format!("{km:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("super-secret"));
    }
}
