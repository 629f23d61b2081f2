//! [`KeyCache`]: thread-safe cache of derived keys, one per field context.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use tracing::debug;

use super::KeyMaterial;
use crate::crypto::{derive_key, CipherError, DerivedKey};

/// Lock-free cache of derived keys keyed by field context.
///
/// Backed by [`ArcSwap`] so readers on the hot path never block. A miss derives
/// the key outside any lock and publishes it with `rcu`. Two threads racing on
/// the same context may both derive; the first published key wins.
#[derive(Clone)]
pub struct KeyCache {
    material: Arc<KeyMaterial>,
    inner: Arc<ArcSwap<HashMap<String, Arc<DerivedKey>>>>,
}

impl KeyCache {
    /// Create an empty cache over `material`.
    pub fn new(material: KeyMaterial) -> Self {
        Self {
            material: Arc::new(material),
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Number of contexts with a cached key.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no key has been derived yet.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Return the key for `context`, deriving and caching it on first use.
    ///
    /// # Errors
    ///
    /// Propagates [`CipherError`] from derivation.
    pub fn get(&self, context: &str) -> Result<Arc<DerivedKey>, CipherError> {
        if let Some(key) = self.inner.load().get(context) {
            return Ok(Arc::clone(key));
        }

        debug!(context, "deriving field key");
        let derived = Arc::new(derive_key(
            self.material.master_secret(),
            self.material.salt(),
            Some(context),
        )?);

        self.inner.rcu(|current| {
            let mut next = (**current).clone();
            next.entry(context.to_owned())
                .or_insert_with(|| Arc::clone(&derived));
            next
        });

        Ok(self
            .inner
            .load()
            .get(context)
            .cloned()
            .unwrap_or(derived))
    }

    /// Derive keys for every context up front so the first request does not pay for it.
    ///
    /// # Errors
    ///
    /// Propagates the first derivation error.
    pub fn warm<'a>(&self, contexts: impl IntoIterator<Item = &'a str>) -> Result<(), CipherError> {
        for context in contexts {
            self.get(context)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("contexts", &self.len())
            .finish_non_exhaustive()
    }
}
