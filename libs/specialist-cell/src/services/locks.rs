use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::models::DocumentType;

/// Serialization points for one specialist account.
///
/// Status transitions hold `state` exclusively. Document operations hold it
/// shared plus the mutex of their document type, so different slots of the
/// same account proceed in parallel while the same slot is serialized.
#[derive(Debug, Default)]
pub struct AccountLock {
    state: RwLock<()>,
    documents: [Mutex<()>; 4],
}

impl AccountLock {
    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.state.write().await
    }

    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.state.read().await
    }

    pub async fn document(&self, document_type: DocumentType) -> MutexGuard<'_, ()> {
        self.documents[document_type.index()].lock().await
    }
}

#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<Uuid, Arc<AccountLock>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn for_account(&self, specialist_id: Uuid) -> Arc<AccountLock> {
        let mut locks = self.locks.lock().await;
        locks.entry(specialist_id).or_default().clone()
    }

    /// Forgets the account's lock unless someone still holds or awaits it.
    pub async fn prune(&self, specialist_id: Uuid) {
        let mut locks = self.locks.lock().await;
        if locks
            .get(&specialist_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&specialist_id);
        }
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
