//! Shared gchat state: the store plus the access-control flags loaded from it.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::gchat::access::AccessControl;
use crate::gchat::store::{Store, StoreError};

/// Passed to every gchat handler. Flag changes go through here so the
/// in-memory copy and the store never disagree.
pub struct GchatContext {
    store: Arc<dyn Store>,
    access: RwLock<AccessControl>,
}

impl GchatContext {
    /// Load access flags from `store`.
    pub fn load(store: Arc<dyn Store>) -> Result<Self, StoreError> {
        let access = AccessControl::load(store.as_ref())?;
        Ok(Self {
            store,
            access: RwLock::new(access),
        })
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub async fn allows(&self, user_id: i64) -> bool {
        self.access.read().await.allows(user_id)
    }

    pub async fn enable(&self, user_id: i64) -> Result<(), StoreError> {
        self.access.write().await.enable(self.store(), user_id)
    }

    pub async fn disable(&self, user_id: i64) -> Result<(), StoreError> {
        self.access.write().await.disable(self.store(), user_id)
    }

    /// Flip the global default, returning the new value.
    pub async fn toggle_all(&self) -> Result<bool, StoreError> {
        self.access.write().await.toggle_all(self.store())
    }

    /// Snapshot of the current flags.
    #[cfg(test)]
    pub async fn access(&self) -> AccessControl {
        self.access.read().await.clone()
    }
}
