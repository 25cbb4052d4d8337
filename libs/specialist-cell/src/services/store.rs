use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    ApprovalStatus, Document, DocumentType, SpecialistAccount, SpecialistProfile, StatusChange,
    VerificationStatus,
};

/// Authoritative persistence for specialist accounts.
///
/// Status is only ever written through [`SpecialistStore::compare_and_set_status`],
/// which must refuse the write when the stored status is no longer `change.from`.
#[async_trait]
pub trait SpecialistStore: Send + Sync {
    /// Returns `false` when an account with this id already exists.
    async fn create(&self, account: &SpecialistAccount) -> Result<bool>;

    async fn get(&self, specialist_id: Uuid) -> Result<Option<SpecialistAccount>>;

    /// Accounts in `status`, oldest submission first.
    async fn list_by_status(&self, status: ApprovalStatus) -> Result<Vec<SpecialistAccount>>;

    async fn save_profile(&self, specialist_id: Uuid, profile: &SpecialistProfile) -> Result<()>;

    /// Returns `false` when the stored status no longer matches `change.from`.
    async fn compare_and_set_status(&self, specialist_id: Uuid, change: StatusChange) -> Result<bool>;

    /// Fills or clears one document slot.
    async fn put_document(
        &self,
        specialist_id: Uuid,
        document_type: DocumentType,
        document: Option<Document>,
    ) -> Result<()>;

    async fn reset_verifications(&self, specialist_id: Uuid) -> Result<()>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, specialist_id: Uuid) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct InMemorySpecialistStore {
    accounts: RwLock<HashMap<Uuid, SpecialistAccount>>,
}

impl InMemorySpecialistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl SpecialistStore for InMemorySpecialistStore {
    async fn create(&self, account: &SpecialistAccount) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Ok(false);
        }
        accounts.insert(account.id, account.clone());
        Ok(true)
    }

    async fn get(&self, specialist_id: Uuid) -> Result<Option<SpecialistAccount>> {
        Ok(self.accounts.read().await.get(&specialist_id).cloned())
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> Result<Vec<SpecialistAccount>> {
        let status = status.normalized();
        let mut matching: Vec<SpecialistAccount> = self
            .accounts
            .read()
            .await
            .values()
            .filter(|account| account.status() == status)
            .cloned()
            .collect();
        matching.sort_by_key(|account| (account.submission_date.is_none(), account.submission_date, account.created_at));
        Ok(matching)
    }

    async fn save_profile(&self, specialist_id: Uuid, profile: &SpecialistProfile) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&specialist_id)
            .ok_or_else(|| anyhow!("specialist {} missing from store", specialist_id))?;
        account.profile = profile.clone();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn compare_and_set_status(&self, specialist_id: Uuid, change: StatusChange) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&specialist_id) else {
            return Ok(false);
        };
        if account.status() != change.from.normalized() {
            return Ok(false);
        }
        account.approval_status = change.to;
        if let Some(submitted) = change.submission_date {
            account.submission_date = Some(submitted);
        }
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn put_document(
        &self,
        specialist_id: Uuid,
        document_type: DocumentType,
        document: Option<Document>,
    ) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&specialist_id)
            .ok_or_else(|| anyhow!("specialist {} missing from store", specialist_id))?;
        account.documents.set(document_type, document);
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn reset_verifications(&self, specialist_id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&specialist_id)
            .ok_or_else(|| anyhow!("specialist {} missing from store", specialist_id))?;
        for document_type in DocumentType::ALL {
            if let Some(mut document) = account.documents.get(document_type).cloned() {
                document.verification_status = VerificationStatus::Pending;
                document.verification_notes = None;
                account.documents.set(document_type, Some(document));
            }
        }
        Ok(())
    }

    async fn delete(&self, specialist_id: Uuid) -> Result<bool> {
        Ok(self.accounts.write().await.remove(&specialist_id).is_some())
    }
}
