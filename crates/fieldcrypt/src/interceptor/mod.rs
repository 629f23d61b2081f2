//! Transparent encryption at the data-access boundary.
//!
//! [`FieldInterceptor`] implements the pre/post hook contract over an abstract
//! [`Operation`]; [`EncryptedRepository`] applies it around every method of a
//! [`crate::repository::Repository`].
//!
//! Per operation the interceptor moves `Idle → Intercepting(write|read) → Done`.
//!
//! - **Write**: registered string fields are replaced by envelopes. Any
//!   encryption failure aborts the operation; plaintext is never passed on.
//! - **Filter**: equality literals on deterministic fields are encrypted the
//!   same way, otherwise stored envelopes would never match.
//! - **Read**: envelopes in registered fields are decrypted in place. Values
//!   that are not envelopes (legacy plaintext) and envelopes that fail to
//!   decrypt are left as stored, logged and counted; the read still succeeds.

pub mod repository;
pub mod stats;

pub use repository::EncryptedRepository;
pub use stats::{InterceptorStats, StatsSnapshot};

use std::sync::Arc;

use common::{FieldCryptoError, Filter, Operation, Record};
use serde_json::Value;
use tracing::{debug, debug_span, warn};

use crate::crypto::is_envelope;
use crate::field_cipher::FieldCipher;
use crate::registry::{EncryptedFieldRegistry, EntityFields, FieldKind};
use crate::repository::record_id;

/// Interception phase of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Rewriting write data and filter literals before execution.
    Write,
    /// Rewriting result records after execution.
    Read,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Write => "write",
            Phase::Read => "read",
        }
    }
}

/// Encrypts registered fields on the way in and decrypts them on the way out.
///
/// Cheap to clone; clones share the cipher, registry and counters.
#[derive(Debug, Clone)]
pub struct FieldInterceptor {
    cipher: Arc<FieldCipher>,
    registry: Arc<EncryptedFieldRegistry>,
    stats: Arc<InterceptorStats>,
}

impl FieldInterceptor {
    /// Create an interceptor over a shared cipher and registry.
    pub fn new(cipher: Arc<FieldCipher>, registry: Arc<EncryptedFieldRegistry>) -> Self {
        Self {
            cipher,
            registry,
            stats: Arc::new(InterceptorStats::new()),
        }
    }

    /// Counters of encrypt, decrypt and skip events.
    pub fn stats(&self) -> &InterceptorStats {
        &self.stats
    }

    /// Pre-execution hook: rewrite write data and equality filters of `op`.
    ///
    /// Operations on unregistered models are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Encryption`] if any value cannot be encrypted;
    /// the operation must then not be executed.
    pub fn before(&self, op: &mut Operation) -> Result<(), FieldCryptoError> {
        let Some(fields) = self.registry.fields_for(&op.model) else {
            return Ok(());
        };
        let _span = debug_span!("intercept", model = %op.model, phase = Phase::Write.as_str())
            .entered();

        if op.action.is_write() {
            if let Some(data) = op.data.as_mut() {
                self.encrypt_fields(&op.model, fields, data)?;
            }
        }
        if let Some(filter) = op.filter.as_mut() {
            self.encrypt_filter_fields(&op.model, fields, filter)?;
        }
        Ok(())
    }

    /// Post-execution hook: decrypt registered fields of every result record.
    ///
    /// Never fails; problems are logged and counted per field.
    pub fn after(&self, model: &str, records: &mut [Record]) {
        let Some(fields) = self.registry.fields_for(model) else {
            return;
        };
        let _span = debug_span!("intercept", model, phase = Phase::Read.as_str()).entered();
        for record in records.iter_mut() {
            self.decrypt_fields(model, fields, record);
        }
    }

    /// Encrypt every registered field of `data` in place.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Encryption`] on the first failure.
    pub fn encrypt_record(&self, model: &str, data: &mut Record) -> Result<(), FieldCryptoError> {
        match self.registry.fields_for(model) {
            Some(fields) => self.encrypt_fields(model, fields, data),
            None => Ok(()),
        }
    }

    /// Encrypt equality literals of registered deterministic fields in `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Encryption`] on the first failure.
    pub fn encrypt_filter(&self, model: &str, filter: &mut Filter) -> Result<(), FieldCryptoError> {
        match self.registry.fields_for(model) {
            Some(fields) => self.encrypt_filter_fields(model, fields, filter),
            None => Ok(()),
        }
    }

    /// Decrypt every registered field of `record` in place.
    pub fn decrypt_record(&self, model: &str, record: &mut Record) {
        if let Some(fields) = self.registry.fields_for(model) {
            self.decrypt_fields(model, fields, record);
        }
    }

    fn encrypt_fields(
        &self,
        model: &str,
        fields: &EntityFields,
        data: &mut Record,
    ) -> Result<(), FieldCryptoError> {
        for (field, kind) in fields {
            if let Some(value) = data.get_mut(field) {
                if self.encrypt_value_in_place(*kind, value)? {
                    self.stats.record_encrypted();
                    debug!(model, field = %field, "field encrypted");
                }
            }
        }
        Ok(())
    }

    fn encrypt_filter_fields(
        &self,
        model: &str,
        fields: &EntityFields,
        filter: &mut Filter,
    ) -> Result<(), FieldCryptoError> {
        for (field, kind) in fields {
            let Some(cond) = filter.get_mut(field) else {
                continue;
            };
            if !kind.is_deterministic() {
                warn!(
                    model,
                    field = %field,
                    "equality filter on a randomized encrypted field cannot match; passing through"
                );
                continue;
            }
            match cond {
                Value::Object(op) if op.contains_key("equals") || op.contains_key("in") => {
                    if let Some(lit) = op.get_mut("equals") {
                        self.encrypt_value_in_place(*kind, lit)?;
                    }
                    if let Some(Value::Array(set)) = op.get_mut("in") {
                        for lit in set.iter_mut() {
                            self.encrypt_value_in_place(*kind, lit)?;
                        }
                    }
                }
                lit => {
                    self.encrypt_value_in_place(*kind, lit)?;
                }
            }
        }
        Ok(())
    }

    /// Replace a protectable string `value` by its envelope.
    ///
    /// Caller input is always encrypted, even when it is shaped like an
    /// envelope. Returns `false` for non-strings and empty values.
    fn encrypt_value_in_place(&self, kind: FieldKind, value: &mut Value) -> Result<bool, FieldCryptoError> {
        let Value::String(s) = value else {
            return Ok(false);
        };
        let normalized = kind.normalize(s);
        if normalized.is_empty() {
            return Ok(false);
        }
        *s = self.cipher.encrypt(&normalized, &kind.encrypt_options())?;
        Ok(true)
    }

    fn decrypt_fields(&self, model: &str, fields: &EntityFields, record: &mut Record) {
        let id = record_id(record);
        for (field, kind) in fields {
            let Some(Value::String(stored)) = record.get_mut(field) else {
                continue;
            };
            if stored.is_empty() {
                continue;
            }
            if !is_envelope(stored) {
                self.stats.record_passthrough(model, field);
                debug!(model, field = %field, record_id = ?id, "plaintext value left as stored");
                continue;
            }
            match self.cipher.decrypt_value(stored, *kind) {
                Ok(plain) => {
                    *stored = plain;
                    self.stats.record_decrypted();
                }
                Err(e) => {
                    self.stats.record_decrypt_failure(model, field);
                    warn!(model, field = %field, record_id = ?id, error = %e, "field left encrypted");
                }
            }
        }
    }
}
