//! Field registry: which entity fields hold PII and how each is protected.
//!
//! # Responsibilities
//!
//! - Define [`FieldKind`], the tagged policy (context, determinism, normalisation)
//!   of each semantic field type.
//! - Hold the [`EncryptedFieldRegistry`] mapping entity type → field → kind.
//! - Load the registry once at startup, either the built-in table or a YAML /
//!   JSON file named by configuration.
//!
//! # Module invariants
//!
//! - **No key material.** This module decides *what* is encrypted, never holds keys.
//! - **Read-only after startup.** The registry is shared as `Arc` and never mutated.

pub mod kind;
pub mod table;

pub use kind::FieldKind;
pub use table::{EncryptedFieldRegistry, EntityFields, RegistryError};

use std::sync::Arc;

use common::FieldCryptoError;
use tracing::info;

/// Load the registry from `path`, or use [`EncryptedFieldRegistry::builtin`] when absent.
///
/// # Errors
///
/// Returns [`FieldCryptoError::Configuration`] if the file cannot be read or parsed.
pub fn load(path: Option<&str>) -> Result<Arc<EncryptedFieldRegistry>, FieldCryptoError> {
    let registry = match path {
        None => {
            let r = EncryptedFieldRegistry::builtin();
            info!(entities = r.len(), "using built-in field registry");
            r
        }
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                FieldCryptoError::Configuration(format!(
                    "failed to read field registry {path}: {e}"
                ))
            })?;
            let r = EncryptedFieldRegistry::parse(&text)
                .map_err(|e| FieldCryptoError::Configuration(format!("{path}: {e}")))?;
            info!(path, entities = r.len(), "loaded field registry");
            r
        }
    };
    Ok(Arc::new(registry))
}
