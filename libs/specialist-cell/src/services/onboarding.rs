use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::{FileError, OnboardingError};
use crate::models::{
    Actor, ApprovalStatus, ApprovalStatusSummary, Document, DocumentType, DocumentUploadRequest,
    LifecycleAction, SpecialistAccount, SpecialistProfile, StatusChange, VerificationVerdict,
};
use crate::services::completeness::ProfileCompletenessEvaluator;
use crate::services::documents::validate_upload;
use crate::services::locks::AccountLocks;
use crate::services::notification::{
    dispatch, LifecycleEvent, LifecycleEventKind, NotificationEmitter, TracingNotifier,
};
use crate::services::storage::{DocumentStorage, InMemoryDocumentStorage, SupabaseDocumentStorage};
use crate::services::store::{InMemorySpecialistStore, SpecialistStore};
use crate::services::supabase_store::SupabaseSpecialistStore;
use crate::services::transition::{Transition, TransitionGuard};

/// Specialist onboarding and approval lifecycle.
///
/// Every status change goes through [`TransitionGuard`] while the account's
/// exclusive lock is held, and is committed with a compare-and-set so a
/// writer that lost a race gets `StaleState` instead of overwriting.
///
/// A transition is judged against the status the caller saw: the
/// `expected_status` it sent, or else the status read when the request
/// arrived. If another transition lands in between, the request fails with
/// `StaleState` rather than being re-evaluated against the new status.
pub struct OnboardingService {
    store: Arc<dyn SpecialistStore>,
    storage: Arc<dyn DocumentStorage>,
    notifier: Arc<dyn NotificationEmitter>,
    guard: TransitionGuard,
    evaluator: ProfileCompletenessEvaluator,
    locks: AccountLocks,
    upload_timeout: Duration,
}

impl OnboardingService {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn SpecialistStore>,
        storage: Arc<dyn DocumentStorage>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            store,
            storage,
            notifier,
            guard: TransitionGuard::new(config.require_verified_documents),
            evaluator: ProfileCompletenessEvaluator::new(),
            locks: AccountLocks::new(),
            upload_timeout: Duration::from_secs(config.document_upload_timeout_secs),
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemorySpecialistStore::new()),
            Arc::new(InMemoryDocumentStorage::new()),
            Arc::new(TracingNotifier),
        )
    }

    pub fn supabase(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(SupabaseSpecialistStore::new(config)),
            Arc::new(SupabaseDocumentStorage::new(config)),
            Arc::new(TracingNotifier),
        )
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    async fn load(&self, specialist_id: Uuid) -> Result<SpecialistAccount, OnboardingError> {
        self.store
            .get(specialist_id)
            .await
            .map_err(OnboardingError::internal)?
            .ok_or_else(|| OnboardingError::NotFound(format!("Specialist {} not found", specialist_id)))
    }

    pub fn summarize(&self, account: &SpecialistAccount) -> ApprovalStatusSummary {
        let report = self.evaluator.evaluate(&account.profile);
        ApprovalStatusSummary {
            specialist_id: account.id,
            approval_status: account.status(),
            profile_completion_percentage: report.completion_percentage(),
            documents_uploaded: account.documents.uploaded_count(),
            documents_required: DocumentType::ALL.len(),
            missing_documents: account.documents.missing(),
            submission_date: account.submission_date,
        }
    }

    pub async fn get_specialist(&self, specialist_id: Uuid) -> Result<SpecialistAccount, OnboardingError> {
        debug!("Fetching specialist {}", specialist_id);
        self.load(specialist_id).await
    }

    /// Side-effect free; safe to poll.
    pub async fn get_approval_status(
        &self,
        specialist_id: Uuid,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        let account = self.load(specialist_id).await?;
        Ok(self.summarize(&account))
    }

    pub async fn list_by_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<ApprovalStatusSummary>, OnboardingError> {
        debug!("Listing specialists in {}", status);
        let accounts = self
            .store
            .list_by_status(status)
            .await
            .map_err(OnboardingError::internal)?;
        Ok(accounts.iter().map(|account| self.summarize(account)).collect())
    }

    // ==========================================================================
    // SPECIALIST OPERATIONS
    // ==========================================================================

    pub async fn register(&self, specialist_id: Uuid) -> Result<SpecialistAccount, OnboardingError> {
        debug!("Registering specialist {}", specialist_id);

        let account = SpecialistAccount::new(specialist_id);
        let created = self
            .store
            .create(&account)
            .await
            .map_err(OnboardingError::internal)?;
        if !created {
            return Err(OnboardingError::AlreadyRegistered(specialist_id));
        }

        info!("Specialist {} registered in {}", specialist_id, account.approval_status);
        Ok(account)
    }

    /// Validates and stores the profile. An invalid profile is not stored.
    /// The first complete profile moves the account to `documents_incomplete`.
    pub async fn submit_profile(
        &self,
        specialist_id: Uuid,
        profile: SpecialistProfile,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        debug!("Submitting profile for specialist {}", specialist_id);

        let lock = self.locks.for_account(specialist_id).await;
        let _exclusive = lock.exclusive().await;

        let mut account = self.load(specialist_id).await?;
        if !account.approval_status.is_editable() {
            return Err(OnboardingError::ProfileLocked(account.status()));
        }

        let report = self.evaluator.evaluate(&profile);
        if !report.complete {
            debug!(
                "Profile for {} rejected with {} field error(s)",
                specialist_id,
                report.missing.len()
            );
            return Err(OnboardingError::Validation(report.missing));
        }

        self.store
            .save_profile(specialist_id, &profile)
            .await
            .map_err(OnboardingError::internal)?;
        account.profile = profile;

        if account.status() == ApprovalStatus::ProfileIncomplete {
            self.commit(Actor::Specialist, LifecycleAction::CompleteProfile, &account)
                .await?;
        }

        let account = self.load(specialist_id).await?;
        Ok(self.summarize(&account))
    }

    /// Fills (or replaces) one document slot. On any failure, including
    /// timeout, the slot keeps its previous document.
    pub async fn upload_document(
        &self,
        specialist_id: Uuid,
        request: DocumentUploadRequest,
    ) -> Result<Document, OnboardingError> {
        let upload = validate_upload(request)?;
        let document_type = upload.document_type;
        debug!(
            "Uploading {} ({} bytes) for specialist {}",
            document_type,
            upload.bytes.len(),
            specialist_id
        );

        let lock = self.locks.for_account(specialist_id).await;
        let _shared = lock.shared().await;
        let _slot = lock.document(document_type).await;

        let account = self.load(specialist_id).await?;
        if !account.approval_status.is_editable() {
            return Err(OnboardingError::ProfileLocked(account.status()));
        }
        let previous = account.documents.get(document_type).cloned();

        let content_type = upload.mime_type.clone();
        let (document, bytes) = upload.into_document(specialist_id);

        match tokio::time::timeout(
            self.upload_timeout,
            self.storage.put(&document.storage_path, bytes, &content_type),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.release_blob(&document.storage_path).await;
                return Err(OnboardingError::internal(e));
            }
            Err(_) => {
                warn!(
                    "Upload of {} for {} timed out after {:?}",
                    document_type, specialist_id, self.upload_timeout
                );
                self.release_blob(&document.storage_path).await;
                return Err(FileError::Timeout(self.upload_timeout.as_secs()).into());
            }
        }

        if let Err(e) = self
            .store
            .put_document(specialist_id, document_type, Some(document.clone()))
            .await
        {
            self.release_blob(&document.storage_path).await;
            return Err(OnboardingError::internal(e));
        }

        if let Some(previous) = previous {
            self.release_blob(&previous.storage_path).await;
        }

        info!("Stored {} document {} for specialist {}", document_type, document.id, specialist_id);
        Ok(document)
    }

    pub async fn remove_document(
        &self,
        specialist_id: Uuid,
        document_id: Uuid,
    ) -> Result<(), OnboardingError> {
        debug!("Removing document {} for specialist {}", document_id, specialist_id);

        let lock = self.locks.for_account(specialist_id).await;
        let _shared = lock.shared().await;

        let document_type = self
            .load(specialist_id)
            .await?
            .documents
            .find(document_id)
            .map(|document| document.document_type)
            .ok_or_else(|| OnboardingError::NotFound(format!("Document {} not found", document_id)))?;

        let _slot = lock.document(document_type).await;

        // Re-read under the slot lock: a concurrent upload may have replaced it.
        let account = self.load(specialist_id).await?;
        if !account.approval_status.is_editable() {
            return Err(OnboardingError::ProfileLocked(account.status()));
        }
        let document = account
            .documents
            .get(document_type)
            .filter(|document| document.id == document_id)
            .cloned()
            .ok_or_else(|| OnboardingError::NotFound(format!("Document {} not found", document_id)))?;

        self.store
            .put_document(specialist_id, document_type, None)
            .await
            .map_err(OnboardingError::internal)?;
        self.release_blob(&document.storage_path).await;

        info!("Removed {} document {} for specialist {}", document_type, document_id, specialist_id);
        Ok(())
    }

    pub async fn submit_for_approval(
        &self,
        specialist_id: Uuid,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        self.transition(Actor::Specialist, LifecycleAction::SubmitForApproval, specialist_id, None)
            .await
    }

    /// Returns a rejected account to editing; document verdicts are cleared.
    pub async fn reopen(&self, specialist_id: Uuid) -> Result<ApprovalStatusSummary, OnboardingError> {
        self.transition(Actor::Specialist, LifecycleAction::Reopen, specialist_id, None)
            .await
    }

    // ==========================================================================
    // ADMIN OPERATIONS
    // ==========================================================================

    pub async fn approve(
        &self,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        self.transition(Actor::Admin, LifecycleAction::Approve, specialist_id, expected)
            .await
    }

    pub async fn reject(
        &self,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        self.transition(Actor::Admin, LifecycleAction::Reject, specialist_id, expected)
            .await
    }

    pub async fn suspend(
        &self,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        self.transition(Actor::Admin, LifecycleAction::Suspend, specialist_id, expected)
            .await
    }

    pub async fn unsuspend(
        &self,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        self.transition(Actor::Admin, LifecycleAction::Unsuspend, specialist_id, expected)
            .await
    }

    /// Permanently removes a rejected account and its stored documents.
    pub async fn delete(
        &self,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<(), OnboardingError> {
        let expected = self.snapshot(specialist_id, expected).await?;
        let lock = self.locks.for_account(specialist_id).await;
        let exclusive = lock.exclusive().await;

        let account = self.load(specialist_id).await?;
        Self::check_expected(&account, expected)?;
        self.commit(Actor::Admin, LifecycleAction::Delete, &account).await?;

        drop(exclusive);
        drop(lock);
        self.locks.prune(specialist_id).await;
        Ok(())
    }

    pub async fn verify_document(
        &self,
        specialist_id: Uuid,
        document_id: Uuid,
        verdict: VerificationVerdict,
        notes: Option<String>,
    ) -> Result<Document, OnboardingError> {
        debug!("Reviewing document {} for specialist {}: {:?}", document_id, specialist_id, verdict);

        let lock = self.locks.for_account(specialist_id).await;
        let _shared = lock.shared().await;

        let account = self.load(specialist_id).await?;
        let status = account.status();
        if !status.allows_document_review() {
            warn!("Document review refused for {} in {}", specialist_id, status);
            return Err(OnboardingError::InvalidTransition {
                from: status,
                action: LifecycleAction::ReviewDocument,
            });
        }

        let document_type = account
            .documents
            .find(document_id)
            .map(|document| document.document_type)
            .ok_or_else(|| OnboardingError::NotFound(format!("Document {} not found", document_id)))?;
        let _slot = lock.document(document_type).await;

        let mut document = account
            .documents
            .get(document_type)
            .cloned()
            .ok_or_else(|| OnboardingError::NotFound(format!("Document {} not found", document_id)))?;
        document.verification_status = verdict.into();
        document.verification_notes = notes.filter(|text| !text.trim().is_empty());

        self.store
            .put_document(specialist_id, document_type, Some(document.clone()))
            .await
            .map_err(OnboardingError::internal)?;

        info!(
            "Document {} ({}) of specialist {} marked {:?}",
            document_id, document_type, specialist_id, document.verification_status
        );
        dispatch(
            self.notifier.clone(),
            LifecycleEvent::new(specialist_id, LifecycleEventKind::DocumentReviewed, Some(status))
                .with_document(document_type, document.verification_status),
        );

        Ok(document)
    }

    // ==========================================================================
    // TRANSITIONS
    // ==========================================================================

    async fn transition(
        &self,
        actor: Actor,
        action: LifecycleAction,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<ApprovalStatusSummary, OnboardingError> {
        let expected = self.snapshot(specialist_id, expected).await?;
        let lock = self.locks.for_account(specialist_id).await;
        let _exclusive = lock.exclusive().await;

        let account = self.load(specialist_id).await?;
        Self::check_expected(&account, expected)?;
        self.commit(actor, action, &account).await?;

        let account = self.load(specialist_id).await?;
        Ok(self.summarize(&account))
    }

    /// Status the request is judged against. Read before queueing on the
    /// account lock, so a request that waited behind another transition
    /// still carries the status it arrived with.
    async fn snapshot(
        &self,
        specialist_id: Uuid,
        expected: Option<ApprovalStatus>,
    ) -> Result<ApprovalStatus, OnboardingError> {
        if let Some(expected) = expected {
            return Ok(expected);
        }
        let status = self.load(specialist_id).await?.status();
        // Requests arriving together all snapshot before the first one commits.
        tokio::task::yield_now().await;
        Ok(status)
    }

    fn check_expected(
        account: &SpecialistAccount,
        expected: ApprovalStatus,
    ) -> Result<(), OnboardingError> {
        if expected.normalized() == account.status() {
            return Ok(());
        }
        warn!(
            "Stale request for {}: expected {}, found {}",
            account.id,
            expected,
            account.status()
        );
        Err(OnboardingError::StaleState {
            expected,
            actual: account.status(),
        })
    }

    /// Applies one guarded transition. Caller holds the exclusive lock.
    async fn commit(
        &self,
        actor: Actor,
        action: LifecycleAction,
        account: &SpecialistAccount,
    ) -> Result<(), OnboardingError> {
        let from = account.status();
        let transition = self.guard.authorize(actor, action, account)?;

        match transition {
            Transition::To(to) => {
                // Verdicts go first: a failed reset must leave the account rejected.
                if action == LifecycleAction::Reopen {
                    self.store
                        .reset_verifications(account.id)
                        .await
                        .map_err(OnboardingError::internal)?;
                }

                let change = StatusChange {
                    from,
                    to,
                    submission_date: (action == LifecycleAction::SubmitForApproval).then(Utc::now),
                };
                let applied = self
                    .store
                    .compare_and_set_status(account.id, change)
                    .await
                    .map_err(OnboardingError::internal)?;

                if !applied {
                    let actual = self.load(account.id).await?.status();
                    warn!("Lost update on {}: expected {}, found {}", account.id, from, actual);
                    return Err(OnboardingError::StaleState {
                        expected: from,
                        actual,
                    });
                }

                info!("Specialist {} moved {} -> {} ({})", account.id, from, to, action);
                if let Some(kind) = Self::event_kind(action) {
                    dispatch(self.notifier.clone(), LifecycleEvent::new(account.id, kind, Some(to)));
                }
            }
            Transition::Remove => {
                let deleted = self
                    .store
                    .delete(account.id)
                    .await
                    .map_err(OnboardingError::internal)?;
                if !deleted {
                    return Err(OnboardingError::NotFound(format!(
                        "Specialist {} not found",
                        account.id
                    )));
                }
                // Blobs outlive a failed delete; release only once the record is gone.
                for document in account.documents.documents() {
                    self.release_blob(&document.storage_path).await;
                }

                info!("Specialist {} deleted from {}", account.id, from);
                dispatch(
                    self.notifier.clone(),
                    LifecycleEvent::new(account.id, LifecycleEventKind::Deleted, None),
                );
            }
        }

        Ok(())
    }

    fn event_kind(action: LifecycleAction) -> Option<LifecycleEventKind> {
        match action {
            LifecycleAction::SubmitForApproval => Some(LifecycleEventKind::Submitted),
            LifecycleAction::Approve => Some(LifecycleEventKind::Approved),
            LifecycleAction::Reject => Some(LifecycleEventKind::Rejected),
            LifecycleAction::Suspend => Some(LifecycleEventKind::Suspended),
            LifecycleAction::Unsuspend => Some(LifecycleEventKind::Unsuspended),
            LifecycleAction::Reopen => Some(LifecycleEventKind::Reopened),
            LifecycleAction::Delete => Some(LifecycleEventKind::Deleted),
            LifecycleAction::CompleteProfile | LifecycleAction::ReviewDocument => None,
        }
    }

    async fn release_blob(&self, path: &str) {
        if let Err(e) = self.storage.remove(path).await {
            warn!("Could not release stored document {}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use tokio::sync::Notify;

    mock! {
        pub Emitter {}

        #[async_trait]
        impl NotificationEmitter for Emitter {
            async fn notify(&self, event: LifecycleEvent) -> anyhow::Result<()>;
        }
    }

    fn rejected_account() -> SpecialistAccount {
        let mut account = SpecialistAccount::new(Uuid::new_v4());
        account.approval_status = ApprovalStatus::Rejected;
        account
    }

    #[tokio::test]
    async fn successful_transition_notifies_once() {
        let store = Arc::new(InMemorySpecialistStore::new());
        let account = rejected_account();
        store.create(&account).await.unwrap();

        let notified = Arc::new(Notify::new());
        let signal = notified.clone();
        let mut emitter = MockEmitter::new();
        emitter
            .expect_notify()
            .withf(|event| event.kind == LifecycleEventKind::Reopened)
            .times(1)
            .returning(move |_| {
                signal.notify_one();
                Ok(())
            });

        let service = OnboardingService::new(
            &AppConfig::default(),
            store,
            Arc::new(InMemoryDocumentStorage::new()),
            Arc::new(emitter),
        );

        let summary = service.reopen(account.id).await.unwrap();
        assert_eq!(summary.approval_status, ApprovalStatus::ProfileIncomplete);
        tokio::time::timeout(Duration::from_secs(1), notified.notified())
            .await
            .expect("notification was not dispatched");
    }

    #[tokio::test]
    async fn failing_emitter_does_not_undo_the_transition() {
        let store = Arc::new(InMemorySpecialistStore::new());
        let account = rejected_account();
        store.create(&account).await.unwrap();

        let mut emitter = MockEmitter::new();
        emitter
            .expect_notify()
            .returning(|_| Err(anyhow::anyhow!("smtp unavailable")));

        let service = OnboardingService::new(
            &AppConfig::default(),
            store.clone(),
            Arc::new(InMemoryDocumentStorage::new()),
            Arc::new(emitter),
        );

        service.reopen(account.id).await.unwrap();
        let stored = store.get(account.id).await.unwrap().unwrap();
        assert_eq!(stored.approval_status, ApprovalStatus::ProfileIncomplete);
    }

    #[tokio::test]
    async fn delete_forgets_the_account_lock() {
        let store = Arc::new(InMemorySpecialistStore::new());
        let account = rejected_account();
        store.create(&account).await.unwrap();

        let service = OnboardingService::new(
            &AppConfig::default(),
            store,
            Arc::new(InMemoryDocumentStorage::new()),
            Arc::new(TracingNotifier),
        );

        service.delete(account.id, None).await.unwrap();
        assert_eq!(service.locks.tracked().await, 0);
    }

    #[tokio::test]
    async fn rejected_transition_sends_nothing() {
        let store = Arc::new(InMemorySpecialistStore::new());
        let account = SpecialistAccount::new(Uuid::new_v4());
        store.create(&account).await.unwrap();

        let mut emitter = MockEmitter::new();
        emitter.expect_notify().never();

        let service = OnboardingService::new(
            &AppConfig::default(),
            store,
            Arc::new(InMemoryDocumentStorage::new()),
            Arc::new(emitter),
        );

        let result = service.approve(account.id, None).await;
        assert!(matches!(result, Err(OnboardingError::InvalidTransition { .. })));
    }
}
