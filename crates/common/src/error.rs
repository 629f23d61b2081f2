//! Error taxonomy shared across crates.

use thiserror::Error;

/// Top-level error type of the field-encryption engine.
///
/// Propagation policy by variant:
/// - [`FieldCryptoError::Configuration`] → fatal, the process must not serve encrypted traffic
/// - [`FieldCryptoError::Encryption`] → aborts the write that triggered it
/// - [`FieldCryptoError::Decryption`] → caught per field on the read path
/// - [`FieldCryptoError::MigrationRecord`] → logged, migration moves on
/// - [`FieldCryptoError::Storage`] → surfaced to the caller of the data layer
#[derive(Debug, Error)]
pub enum FieldCryptoError {
    /// Missing or weak master secret / salt, or an invalid field registry.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Producing an envelope failed. Never results in plaintext being stored.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Malformed envelope, wrong key or context, or authentication failure.
    ///
    /// Deliberately carries no detail so callers cannot tell which check failed.
    #[error("decryption failed")]
    Decryption,

    /// A single record could not be migrated.
    #[error("migration failed for record {record_id}: {reason}")]
    MigrationRecord {
        /// Identifier of the offending record.
        record_id: String,
        /// Non-sensitive description of the failure.
        reason: String,
    },

    /// The underlying data layer rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),
}

impl FieldCryptoError {
    /// Returns `true` for errors that must halt the whole system.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FieldCryptoError::Configuration(_))
    }

    /// Short machine-readable code, safe for logs and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            FieldCryptoError::Configuration(_) => "configuration_error",
            FieldCryptoError::Encryption(_) => "encryption_error",
            FieldCryptoError::Decryption => "decryption_error",
            FieldCryptoError::MigrationRecord { .. } => "migration_record_error",
            FieldCryptoError::Storage(_) => "storage_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_is_fatal() {
        assert!(FieldCryptoError::Configuration("x".into()).is_fatal());
        assert!(!FieldCryptoError::Encryption("x".into()).is_fatal());
        assert!(!FieldCryptoError::Decryption.is_fatal());
        assert!(!FieldCryptoError::Storage("x".into()).is_fatal());
        assert!(!FieldCryptoError::MigrationRecord {
            record_id: "1".into(),
            reason: "x".into()
        }
        .is_fatal());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(FieldCryptoError::Decryption.code(), "decryption_error");
        assert_eq!(
            FieldCryptoError::Configuration("x".into()).code(),
            "configuration_error"
        );
    }

    #[test]
    fn decryption_message_is_opaque() {
        assert_eq!(FieldCryptoError::Decryption.to_string(), "decryption failed");
    }

    #[test]
    fn migration_record_display_includes_id() {
        let e = FieldCryptoError::MigrationRecord {
            record_id: "rec-42".into(),
            reason: "update rejected".into(),
        };
        assert!(e.to_string().contains("rec-42"));
    }
}
