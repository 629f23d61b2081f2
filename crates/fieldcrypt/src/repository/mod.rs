//! Data-access boundary the interceptor and migration are written against.
//!
//! The surrounding application owns the real storage; it plugs in by
//! implementing [`Repository`]. [`MemoryRepository`] is the in-process
//! implementation used by tests and by the offline migration tool.

pub mod memory;

pub use memory::MemoryRepository;

use std::sync::Arc;

use async_trait::async_trait;
use common::{FieldCryptoError, Filter, Record};

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of matching records to skip.
    pub offset: usize,
    /// Maximum number of records to return.
    pub limit: usize,
}

/// Generic per-entity CRUD surface of the data layer.
///
/// Failures are reported as [`FieldCryptoError::Storage`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert `data` as a new record of `entity` and return it as stored.
    async fn create(&self, entity: &str, data: Record) -> Result<Record, FieldCryptoError>;

    /// Merge `data` into the record of `entity` identified by `id`.
    async fn update(&self, entity: &str, id: &str, data: Record)
        -> Result<Record, FieldCryptoError>;

    /// First record of `entity` matching `filter`.
    async fn find_one(&self, entity: &str, filter: &Filter)
        -> Result<Option<Record>, FieldCryptoError>;

    /// Records of `entity` matching `filter`, windowed by `page`.
    async fn find_many(
        &self,
        entity: &str,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Record>, FieldCryptoError>;
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for Arc<R> {
    async fn create(&self, entity: &str, data: Record) -> Result<Record, FieldCryptoError> {
        (**self).create(entity, data).await
    }

    async fn update(
        &self,
        entity: &str,
        id: &str,
        data: Record,
    ) -> Result<Record, FieldCryptoError> {
        (**self).update(entity, id, data).await
    }

    async fn find_one(
        &self,
        entity: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, FieldCryptoError> {
        (**self).find_one(entity, filter).await
    }

    async fn find_many(
        &self,
        entity: &str,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Record>, FieldCryptoError> {
        (**self).find_many(entity, filter, page).await
    }
}

/// String form of a record's `id`, accepting string or numeric ids.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: serde_json::Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn record_id_accepts_strings_and_numbers() {
        assert_eq!(record_id(&rec(json!({"id": "u1"}))), Some("u1".into()));
        assert_eq!(record_id(&rec(json!({"id": 42}))), Some("42".into()));
        assert_eq!(record_id(&rec(json!({"id": ""}))), None);
        assert_eq!(record_id(&rec(json!({"name": "x"}))), None);
    }

    #[tokio::test]
    async fn arc_forwards_to_inner() {
        let repo = Arc::new(MemoryRepository::new());
        let created = repo
            .create("User", rec(json!({"id": "a", "email": "x"})))
            .await
            .unwrap();
        assert_eq!(created["id"], "a");
        let found = repo.find_one("User", &rec(json!({"id": "a"}))).await.unwrap();
        assert!(found.is_some());
    }
}
