//! Counters for interceptor activity, mirrored to OpenTelemetry.
//!
//! The read path silently passes through plaintext and undecryptable values.
//! These counters make that drift visible during a migration.

use std::sync::atomic::{AtomicU64, Ordering};

use opentelemetry::metrics::Counter;
use opentelemetry::KeyValue;

/// Point-in-time copy of [`InterceptorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Values replaced by envelopes on the write path.
    pub fields_encrypted: u64,
    /// Envelopes decrypted on the read path.
    pub fields_decrypted: u64,
    /// Registered fields read back as non-envelope values and left as is.
    pub plaintext_passthrough: u64,
    /// Envelopes that failed to decrypt and were left as stored.
    pub decrypt_failures: u64,
}

/// Live counters shared by clones of one interceptor.
pub struct InterceptorStats {
    fields_encrypted: AtomicU64,
    fields_decrypted: AtomicU64,
    plaintext_passthrough: AtomicU64,
    decrypt_failures: AtomicU64,
    skipped_metric: Counter<u64>,
    failed_metric: Counter<u64>,
}

impl InterceptorStats {
    /// Create zeroed counters bound to the global meter provider.
    pub fn new() -> Self {
        let meter = opentelemetry::global::meter("fieldcrypt");
        Self {
            fields_encrypted: AtomicU64::new(0),
            fields_decrypted: AtomicU64::new(0),
            plaintext_passthrough: AtomicU64::new(0),
            decrypt_failures: AtomicU64::new(0),
            skipped_metric: meter
                .u64_counter("fieldcrypt.read.skipped")
                .with_description("registered fields read back without an envelope")
                .init(),
            failed_metric: meter
                .u64_counter("fieldcrypt.read.decrypt_failed")
                .with_description("envelopes that failed to decrypt on read")
                .init(),
        }
    }

    pub(crate) fn record_encrypted(&self) {
        self.fields_encrypted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decrypted(&self) {
        self.fields_decrypted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_passthrough(&self, entity: &str, field: &str) {
        self.plaintext_passthrough.fetch_add(1, Ordering::Relaxed);
        self.skipped_metric.add(1, &labels(entity, field));
    }

    pub(crate) fn record_decrypt_failure(&self, entity: &str, field: &str) {
        self.decrypt_failures.fetch_add(1, Ordering::Relaxed);
        self.failed_metric.add(1, &labels(entity, field));
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fields_encrypted: self.fields_encrypted.load(Ordering::Relaxed),
            fields_decrypted: self.fields_decrypted.load(Ordering::Relaxed),
            plaintext_passthrough: self.plaintext_passthrough.load(Ordering::Relaxed),
            decrypt_failures: self.decrypt_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for InterceptorStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterceptorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InterceptorStats").field(&self.snapshot()).finish()
    }
}

fn labels(entity: &str, field: &str) -> [KeyValue; 2] {
    [
        KeyValue::new("entity", entity.to_owned()),
        KeyValue::new("field", field.to_owned()),
    ]
}
