//! Bulk migration of legacy plaintext records to envelopes.
//!
//! The migrator pages through an entity with offset pagination, one batch at a
//! time, and rewrites every target field that does not already hold an
//! envelope. Progress lives in the data itself: a re-run skips migrated values,
//! so a second run updates nothing and a killed run resumes cleanly.
//!
//! Cancellation is cooperative and only checked between batches, so a batch is
//! never left half-written.

use std::sync::Arc;

use common::{FieldCryptoError, Filter, Record};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::crypto::is_envelope;
use crate::field_cipher::FieldCipher;
use crate::registry::{EncryptedFieldRegistry, FieldKind};
use crate::repository::{record_id, Page, Repository};

/// Outcome of one [`Migrator::migrate`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Entity type that was migrated.
    pub entity: String,
    /// Batches read from storage.
    pub batches: usize,
    /// Records examined.
    pub processed: usize,
    /// Records rewritten with at least one new envelope.
    pub updated: usize,
    /// Records with nothing left to migrate.
    pub skipped: usize,
    /// Records that failed and were left as they were.
    pub failed: usize,
    /// Whether the run stopped early on request.
    pub cancelled: bool,
}

/// Walks stored records and encrypts legacy plaintext through the [`FieldCipher`].
///
/// Bypasses the interceptor: it reads raw stored values and writes envelopes
/// directly.
pub struct Migrator<R> {
    repo: R,
    cipher: Arc<FieldCipher>,
    registry: Arc<EncryptedFieldRegistry>,
    cancel: CancellationToken,
}

impl<R: Repository> Migrator<R> {
    /// Create a migrator over the raw (undecorated) repository.
    pub fn new(repo: R, cipher: Arc<FieldCipher>, registry: Arc<EncryptedFieldRegistry>) -> Self {
        Self {
            repo,
            cipher,
            registry,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between batches once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Encrypt the plaintext values of `fields` across every `entity` record.
    ///
    /// Per-record failures are logged and counted; the run continues.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Configuration`] if `batch_size` is zero or a
    /// field is not registered for `entity`, and propagates storage errors
    /// raised while reading a batch.
    pub async fn migrate<S: AsRef<str>>(
        &self,
        entity: &str,
        fields: &[S],
        batch_size: usize,
    ) -> Result<MigrationReport, FieldCryptoError> {
        if batch_size == 0 {
            return Err(FieldCryptoError::Configuration(
                "migration batch size must be > 0".into(),
            ));
        }
        let targets = self.resolve_targets(entity, fields)?;

        let mut report = MigrationReport {
            entity: entity.to_owned(),
            ..MigrationReport::default()
        };
        info!(entity, fields = targets.len(), batch_size, "migration started");

        let mut offset = 0;
        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                warn!(entity, processed = report.processed, "migration cancelled between batches");
                break;
            }

            let batch = self
                .repo
                .find_many(entity, &Filter::new(), Page { offset, limit: batch_size })
                .await?;
            if batch.is_empty() {
                break;
            }
            offset += batch.len();
            report.batches += 1;

            for record in &batch {
                report.processed += 1;
                match self.migrate_record(entity, &targets, record).await {
                    Ok(true) => report.updated += 1,
                    Ok(false) => report.skipped += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(entity, error = %e, "record migration failed; continuing");
                    }
                }
            }

            info!(
                entity,
                batch = report.batches,
                processed = report.processed,
                updated = report.updated,
                failed = report.failed,
                "migration progress"
            );
        }

        info!(
            entity,
            processed = report.processed,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            "migration finished"
        );
        Ok(report)
    }

    fn resolve_targets<S: AsRef<str>>(
        &self,
        entity: &str,
        fields: &[S],
    ) -> Result<Vec<(String, FieldKind)>, FieldCryptoError> {
        fields
            .iter()
            .map(|f| {
                let field = f.as_ref();
                self.registry
                    .kind_of(entity, field)
                    .map(|kind| (field.to_owned(), kind))
                    .ok_or_else(|| {
                        FieldCryptoError::Configuration(format!(
                            "{entity}.{field} is not a registered encrypted field"
                        ))
                    })
            })
            .collect()
    }

    /// Returns `Ok(true)` if the record was rewritten, `Ok(false)` if nothing needed doing.
    async fn migrate_record(
        &self,
        entity: &str,
        targets: &[(String, FieldKind)],
        record: &Record,
    ) -> Result<bool, FieldCryptoError> {
        let id = record_id(record).ok_or_else(|| FieldCryptoError::MigrationRecord {
            record_id: "<missing>".into(),
            reason: "record has no id".into(),
        })?;
        let record_error = |reason: String| FieldCryptoError::MigrationRecord {
            record_id: id.clone(),
            reason,
        };

        let mut changes = Record::new();
        for (field, kind) in targets {
            let Some(Value::String(current)) = record.get(field) else {
                continue;
            };
            if is_envelope(current) {
                continue;
            }
            let normalized = kind.normalize(current);
            if normalized.is_empty() {
                continue;
            }
            let envelope = self
                .cipher
                .encrypt(&normalized, &kind.encrypt_options())
                .map_err(|e| record_error(e.to_string()))?;
            changes.insert(field.clone(), Value::String(envelope));
        }

        if changes.is_empty() {
            return Ok(false);
        }
        self.repo
            .update(entity, &id, changes)
            .await
            .map_err(|e| record_error(e.to_string()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_cipher::tests::test_cipher;
    use crate::repository::{MemoryRepository, MockRepository};
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn registry() -> Arc<EncryptedFieldRegistry> {
        Arc::new(EncryptedFieldRegistry::builtin())
    }

    async fn seeded(n: usize) -> Arc<MemoryRepository> {
        let repo = Arc::new(MemoryRepository::new());
        for i in 0..n {
            repo.create(
                "User",
                rec(json!({
                    "id": format!("u{i}"),
                    "email": format!("User{i}@Example.com"),
                    "name": format!("User {i}"),
                    "role": "member"
                })),
            )
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn migrates_all_batches() {
        let repo = seeded(7).await;
        let m = Migrator::new(Arc::clone(&repo), test_cipher(), registry());
        let report = m.migrate("User", &["email", "name"], 3).await.unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(report.processed, 7);
        assert_eq!(report.updated, 7);
        assert_eq!(report.failed, 0);

        let snap = repo.snapshot().await;
        for row in &snap["User"] {
            assert!(is_envelope(row["email"].as_str().unwrap()));
            assert!(is_envelope(row["name"].as_str().unwrap()));
            assert_eq!(row["role"], "member");
        }
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let repo = seeded(5).await;
        let m = Migrator::new(Arc::clone(&repo), test_cipher(), registry());
        let first = m.migrate("User", &["email", "name"], 2).await.unwrap();
        let after_first = repo.snapshot().await;

        let second = m.migrate("User", &["email", "name"], 2).await.unwrap();
        assert_eq!(first.updated, 5);
        assert_eq!(second.updated, 0);
        assert_eq!(second.skipped, 5);
        assert_eq!(repo.snapshot().await, after_first);
    }

    #[tokio::test]
    async fn normalises_before_encrypting() {
        let repo = Arc::new(MemoryRepository::new());
        repo.create("User", rec(json!({"id": "p1", "phone": "555-1234"})))
            .await
            .unwrap();
        let cipher = test_cipher();
        let m = Migrator::new(Arc::clone(&repo), Arc::clone(&cipher), registry());
        m.migrate("User", &["phone"], 10).await.unwrap();

        let snap = repo.snapshot().await;
        let stored = snap["User"][0]["phone"].as_str().unwrap();
        assert!(is_envelope(stored));
        assert_eq!(cipher.decrypt_value(stored, FieldKind::Phone).unwrap(), "5551234");
    }

    #[tokio::test]
    async fn unregistered_field_is_rejected() {
        let repo = seeded(1).await;
        let m = Migrator::new(repo, test_cipher(), registry());
        let err = m.migrate("User", &["role"], 10).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let m = Migrator::new(seeded(0).await, test_cipher(), registry());
        assert!(m.migrate("User", &["email"], 0).await.is_err());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_next_batch() {
        let repo = seeded(4).await;
        let token = CancellationToken::new();
        token.cancel();
        let m = Migrator::new(Arc::clone(&repo), test_cipher(), registry())
            .with_cancellation(token);
        let report = m.migrate("User", &["email"], 2).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        let snap = repo.snapshot().await;
        assert_eq!(snap["User"][0]["email"], "User0@Example.com");
    }

    #[tokio::test]
    async fn record_failures_do_not_halt_migration() {
        let mut mock = MockRepository::new();
        mock.expect_find_many()
            .withf(|_, _, page| page.offset == 0)
            .returning(|_, _, _| {
                Ok(vec![
                    rec(json!({"id": "bad", "email": "bad@example.com"})),
                    rec(json!({"email": "no-id@example.com"})),
                    rec(json!({"id": "good", "email": "good@example.com"})),
                ])
            });
        mock.expect_find_many()
            .withf(|_, _, page| page.offset == 3)
            .returning(|_, _, _| Ok(vec![]));
        mock.expect_update()
            .withf(|_, id, _| id == "bad")
            .returning(|_, _, _| Err(FieldCryptoError::Storage("deadlock".into())));
        mock.expect_update()
            .withf(|_, id, data| id == "good" && data["email"].as_str().is_some_and(is_envelope))
            .times(1)
            .returning(|_, _, data| Ok(data));

        let m = Migrator::new(mock, test_cipher(), registry());
        let report = m.migrate("User", &["email"], 3).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn batch_read_error_aborts() {
        let mut mock = MockRepository::new();
        mock.expect_find_many()
            .returning(|_, _, _| Err(FieldCryptoError::Storage("unreachable".into())));
        let m = Migrator::new(mock, test_cipher(), registry());
        let err = m.migrate("User", &["email"], 10).await.unwrap_err();
        assert!(matches!(err, FieldCryptoError::Storage(_)));
    }
}
