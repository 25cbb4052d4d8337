use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ApprovalStatus, Document, DocumentSet, DocumentType, SpecialistAccount, SpecialistProfile,
    StatusChange, VerificationStatus,
};
use crate::services::store::SpecialistStore;

const SPECIALISTS: &str = "/rest/v1/specialists";
const DOCUMENTS: &str = "/rest/v1/specialist_documents";

#[derive(Debug, Serialize, Deserialize)]
struct SpecialistRow {
    id: Uuid,
    approval_status: ApprovalStatus,
    #[serde(default)]
    profile: SpecialistProfile,
    submission_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentRow {
    specialist_id: Uuid,
    #[serde(flatten)]
    document: Document,
}

/// PostgREST-backed store over `specialists` and `specialist_documents`.
pub struct SupabaseSpecialistStore {
    supabase: SupabaseClient,
}

impl SupabaseSpecialistStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn prefer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(value));
        headers
    }

    /// Filter matching a stored status; `pending` rows count as `profile_incomplete`.
    fn status_filter(status: ApprovalStatus) -> String {
        match status.normalized() {
            ApprovalStatus::ProfileIncomplete => "approval_status=in.(pending,profile_incomplete)".to_string(),
            other => format!("approval_status=eq.{}", other),
        }
    }

    async fn documents_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Document>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let id_list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("{}?specialist_id=in.({})", DOCUMENTS, id_list);
        let rows: Vec<DocumentRow> = self.supabase.request(Method::GET, &path, None, None).await?;

        let mut grouped: HashMap<Uuid, Vec<Document>> = HashMap::new();
        for row in rows {
            grouped.entry(row.specialist_id).or_default().push(row.document);
        }
        Ok(grouped)
    }

    fn assemble(row: SpecialistRow, documents: Vec<Document>) -> SpecialistAccount {
        SpecialistAccount {
            id: row.id,
            approval_status: row.approval_status,
            profile: row.profile,
            documents: DocumentSet::from_documents(documents),
            submission_date: row.submission_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SpecialistStore for SupabaseSpecialistStore {
    async fn create(&self, account: &SpecialistAccount) -> Result<bool> {
        debug!("Creating specialist record {}", account.id);

        let row = SpecialistRow {
            id: account.id,
            approval_status: account.approval_status,
            profile: account.profile.clone(),
            submission_date: account.submission_date,
            created_at: account.created_at,
            updated_at: account.updated_at,
        };

        let created: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                SPECIALISTS,
                None,
                Some(serde_json::to_value(&row)?),
                Some(Self::prefer("return=representation,resolution=ignore-duplicates")),
            )
            .await?;

        Ok(!created.is_empty())
    }

    async fn get(&self, specialist_id: Uuid) -> Result<Option<SpecialistAccount>> {
        let path = format!("{}?id=eq.{}", SPECIALISTS, specialist_id);
        let mut rows: Vec<SpecialistRow> = self.supabase.request(Method::GET, &path, None, None).await?;

        let Some(row) = rows.pop() else {
            return Ok(None);
        };
        let documents = self
            .documents_for(&[specialist_id])
            .await?
            .remove(&specialist_id)
            .unwrap_or_default();

        Ok(Some(Self::assemble(row, documents)))
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> Result<Vec<SpecialistAccount>> {
        let path = format!(
            "{}?{}&order=submission_date.asc.nullslast,created_at.asc",
            SPECIALISTS,
            Self::status_filter(status)
        );
        let rows: Vec<SpecialistRow> = self.supabase.request(Method::GET, &path, None, None).await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut documents = self.documents_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let docs = documents.remove(&row.id).unwrap_or_default();
                Self::assemble(row, docs)
            })
            .collect())
    }

    async fn save_profile(&self, specialist_id: Uuid, profile: &SpecialistProfile) -> Result<()> {
        let path = format!("{}?id=eq.{}", SPECIALISTS, specialist_id);
        let _: Value = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({
                    "profile": profile,
                    "updated_at": Utc::now().to_rfc3339(),
                })),
                Some(Self::prefer("return=minimal")),
            )
            .await?;
        Ok(())
    }

    async fn compare_and_set_status(&self, specialist_id: Uuid, change: StatusChange) -> Result<bool> {
        // The status filter makes the PATCH conditional: no row comes back if
        // another writer moved the account first.
        let path = format!(
            "{}?id=eq.{}&{}",
            SPECIALISTS,
            specialist_id,
            Self::status_filter(change.from)
        );

        let mut update = json!({
            "approval_status": change.to,
            "updated_at": Utc::now().to_rfc3339(),
        });
        if let Some(submitted) = change.submission_date {
            update["submission_date"] = json!(submitted.to_rfc3339());
        }

        let updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(update),
                Some(Self::prefer("return=representation")),
            )
            .await?;

        Ok(!updated.is_empty())
    }

    async fn put_document(
        &self,
        specialist_id: Uuid,
        document_type: DocumentType,
        document: Option<Document>,
    ) -> Result<()> {
        match document {
            Some(document) => {
                let path = format!("{}?on_conflict=specialist_id,document_type", DOCUMENTS);
                let row = DocumentRow {
                    specialist_id,
                    document,
                };
                let _: Value = self
                    .supabase
                    .request_with_headers(
                        Method::POST,
                        &path,
                        None,
                        Some(serde_json::to_value(&row)?),
                        Some(Self::prefer("resolution=merge-duplicates,return=minimal")),
                    )
                    .await?;
            }
            None => {
                let path = format!(
                    "{}?specialist_id=eq.{}&document_type=eq.{}",
                    DOCUMENTS, specialist_id, document_type
                );
                let _: Value = self.supabase.request(Method::DELETE, &path, None, None).await?;
            }
        }
        Ok(())
    }

    async fn reset_verifications(&self, specialist_id: Uuid) -> Result<()> {
        let path = format!("{}?specialist_id=eq.{}", DOCUMENTS, specialist_id);
        let _: Value = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({
                    "verification_status": VerificationStatus::Pending,
                    "verification_notes": Value::Null,
                })),
                Some(Self::prefer("return=minimal")),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, specialist_id: Uuid) -> Result<bool> {
        // Document rows go with the account through the foreign-key cascade.
        let path = format!("{}?id=eq.{}", SPECIALISTS, specialist_id);
        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(Self::prefer("return=representation")),
            )
            .await?;
        Ok(!deleted.is_empty())
    }
}
