use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ApprovalStatus, DocumentType, VerificationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Submitted,
    Approved,
    Rejected,
    Suspended,
    Unsuspended,
    Reopened,
    Deleted,
    DocumentReviewed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleEvent {
    pub specialist_id: Uuid,
    pub kind: LifecycleEventKind,
    /// Status after the change; `None` once the account is gone.
    pub status: Option<ApprovalStatus>,
    pub document: Option<(DocumentType, VerificationStatus)>,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(specialist_id: Uuid, kind: LifecycleEventKind, status: Option<ApprovalStatus>) -> Self {
        Self {
            specialist_id,
            kind,
            status,
            document: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_document(mut self, document_type: DocumentType, status: VerificationStatus) -> Self {
        self.document = Some((document_type, status));
        self
    }
}

/// Outbound channel (email, push, ...) told about committed changes.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn notify(&self, event: LifecycleEvent) -> anyhow::Result<()>;
}

/// Default emitter: records events in the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationEmitter for TracingNotifier {
    async fn notify(&self, event: LifecycleEvent) -> anyhow::Result<()> {
        info!(
            specialist_id = %event.specialist_id,
            kind = ?event.kind,
            status = ?event.status,
            "Specialist lifecycle notification"
        );
        Ok(())
    }
}

/// Fire-and-forget: a failing emitter never affects the committed change.
pub fn dispatch(emitter: Arc<dyn NotificationEmitter>, event: LifecycleEvent) {
    tokio::spawn(async move {
        let specialist_id = event.specialist_id;
        let kind = event.kind;
        if let Err(e) = emitter.notify(event).await {
            warn!("Notification {:?} for {} failed: {}", kind, specialist_id, e);
        }
    });
}
