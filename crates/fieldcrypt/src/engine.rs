//! Wiring of the cipher, registry, interceptor and migrator from one [`Config`].

use std::sync::Arc;

use common::FieldCryptoError;
use tracing::info;

use crate::config::Config;
use crate::field_cipher::FieldCipher;
use crate::interceptor::{EncryptedRepository, FieldInterceptor};
use crate::migration::Migrator;
use crate::registry::{self, EncryptedFieldRegistry};
use crate::repository::Repository;

/// Shared, read-only state of the engine after startup.
#[derive(Debug, Clone)]
pub struct Engine {
    cipher: Arc<FieldCipher>,
    registry: Arc<EncryptedFieldRegistry>,
}

impl Engine {
    /// Validate key material, load the registry and derive every field key.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Configuration`] if any step fails; the caller
    /// must not proceed.
    pub fn from_config(cfg: &Config) -> Result<Self, FieldCryptoError> {
        let cipher = FieldCipher::new(cfg.key_material()?);
        cipher.warm_up()?;
        let registry = registry::load(cfg.field_registry_path.as_deref())?;
        info!(
            production = cfg.is_production(),
            entities = registry.len(),
            "field encryption engine ready"
        );
        Ok(Self::new(Arc::new(cipher), registry))
    }

    /// Assemble an engine from existing parts.
    pub fn new(cipher: Arc<FieldCipher>, registry: Arc<EncryptedFieldRegistry>) -> Self {
        Self { cipher, registry }
    }

    /// The shared field cipher.
    pub fn cipher(&self) -> &Arc<FieldCipher> {
        &self.cipher
    }

    /// The loaded field registry.
    pub fn registry(&self) -> &Arc<EncryptedFieldRegistry> {
        &self.registry
    }

    /// A fresh interceptor with its own counters.
    pub fn interceptor(&self) -> FieldInterceptor {
        FieldInterceptor::new(Arc::clone(&self.cipher), Arc::clone(&self.registry))
    }

    /// Decorate `repo` with transparent field encryption.
    pub fn wrap<R: Repository>(&self, repo: R) -> EncryptedRepository<R> {
        EncryptedRepository::new(repo, self.interceptor())
    }

    /// A migrator writing envelopes straight into `repo`.
    pub fn migrator<R: Repository>(&self, repo: R) -> Migrator<R> {
        Migrator::new(repo, Arc::clone(&self.cipher), Arc::clone(&self.registry))
    }
}
