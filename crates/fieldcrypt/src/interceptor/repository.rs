//! [`EncryptedRepository`]: decorator applying [`FieldInterceptor`] to a repository.

use async_trait::async_trait;
use common::{Action, FieldCryptoError, Filter, Operation, Record};

use super::FieldInterceptor;
use crate::repository::{Page, Repository};

/// Wraps any [`Repository`] so callers only ever see plaintext while storage
/// only ever sees envelopes in registered fields.
#[derive(Debug)]
pub struct EncryptedRepository<R> {
    inner: R,
    interceptor: FieldInterceptor,
}

impl<R> EncryptedRepository<R> {
    /// Decorate `inner` with `interceptor`.
    pub fn new(inner: R, interceptor: FieldInterceptor) -> Self {
        Self { inner, interceptor }
    }

    /// The undecorated repository, for raw access to stored values.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// The interceptor applied to every call.
    pub fn interceptor(&self) -> &FieldInterceptor {
        &self.interceptor
    }
}

#[async_trait]
impl<R: Repository> Repository for EncryptedRepository<R> {
    async fn create(&self, entity: &str, data: Record) -> Result<Record, FieldCryptoError> {
        let mut op = Operation::new(Action::Create, entity).with_data(data);
        self.interceptor.before(&mut op)?;
        let mut created = self
            .inner
            .create(entity, op.data.unwrap_or_default())
            .await?;
        self.interceptor.decrypt_record(entity, &mut created);
        Ok(created)
    }

    async fn update(
        &self,
        entity: &str,
        id: &str,
        data: Record,
    ) -> Result<Record, FieldCryptoError> {
        let mut op = Operation::new(Action::Update, entity).with_data(data);
        self.interceptor.before(&mut op)?;
        let mut updated = self
            .inner
            .update(entity, id, op.data.unwrap_or_default())
            .await?;
        self.interceptor.decrypt_record(entity, &mut updated);
        Ok(updated)
    }

    async fn find_one(
        &self,
        entity: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, FieldCryptoError> {
        let mut op = Operation::new(Action::FindOne, entity).with_filter(filter.clone());
        self.interceptor.before(&mut op)?;
        let mut found = self
            .inner
            .find_one(entity, &op.filter.unwrap_or_default())
            .await?;
        if let Some(record) = found.as_mut() {
            self.interceptor.decrypt_record(entity, record);
        }
        Ok(found)
    }

    async fn find_many(
        &self,
        entity: &str,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Record>, FieldCryptoError> {
        let mut op = Operation::new(Action::FindMany, entity).with_filter(filter.clone());
        self.interceptor.before(&mut op)?;
        let mut rows = self
            .inner
            .find_many(entity, &op.filter.unwrap_or_default(), page)
            .await?;
        self.interceptor.after(entity, &mut rows);
        Ok(rows)
    }
}
