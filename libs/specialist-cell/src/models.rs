use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest accepted verification document, in bytes.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_DOCUMENT_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Hour-long consultation windows a specialist can offer.
pub const AVAILABILITY_SLOT_CATALOG: [&str; 8] = [
    "09:00-10:00",
    "10:00-11:00",
    "11:00-12:00",
    "12:00-13:00",
    "13:00-14:00",
    "14:00-15:00",
    "15:00-16:00",
    "16:00-17:00",
];

pub const LANGUAGE_VOCABULARY: [&str; 8] = [
    "arabic",
    "amazigh",
    "english",
    "french",
    "german",
    "italian",
    "portuguese",
    "spanish",
];

// ==============================================================================
// APPROVAL LIFECYCLE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Legacy registration value, read as `ProfileIncomplete`.
    Pending,
    ProfileIncomplete,
    DocumentsIncomplete,
    UnderReview,
    Approved,
    Rejected,
    Suspended,
}

impl ApprovalStatus {
    pub fn normalized(self) -> Self {
        match self {
            ApprovalStatus::Pending => ApprovalStatus::ProfileIncomplete,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::ProfileIncomplete => "profile_incomplete",
            ApprovalStatus::DocumentsIncomplete => "documents_incomplete",
            ApprovalStatus::UnderReview => "under_review",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Suspended => "suspended",
        }
    }

    /// Profile and documents can only change before submission.
    pub fn is_editable(self) -> bool {
        matches!(
            self.normalized(),
            ApprovalStatus::ProfileIncomplete | ApprovalStatus::DocumentsIncomplete
        )
    }

    /// States in which an admin may verify or reject individual documents.
    pub fn allows_document_review(self) -> bool {
        matches!(
            self,
            ApprovalStatus::UnderReview | ApprovalStatus::Approved | ApprovalStatus::Suspended
        )
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Specialist,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    CompleteProfile,
    SubmitForApproval,
    Approve,
    Reject,
    Suspend,
    Unsuspend,
    Reopen,
    Delete,
    ReviewDocument,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 9] = [
        LifecycleAction::CompleteProfile,
        LifecycleAction::SubmitForApproval,
        LifecycleAction::Approve,
        LifecycleAction::Reject,
        LifecycleAction::Suspend,
        LifecycleAction::Unsuspend,
        LifecycleAction::Reopen,
        LifecycleAction::Delete,
        LifecycleAction::ReviewDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::CompleteProfile => "complete_profile",
            LifecycleAction::SubmitForApproval => "submit_for_approval",
            LifecycleAction::Approve => "approve",
            LifecycleAction::Reject => "reject",
            LifecycleAction::Suspend => "suspend",
            LifecycleAction::Unsuspend => "unsuspend",
            LifecycleAction::Reopen => "reopen",
            LifecycleAction::Delete => "delete",
            LifecycleAction::ReviewDocument => "review_document",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// PROFILE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    ClinicalPsychology,
    Psychiatry,
    CounselingPsychology,
    ChildAndAdolescentPsychology,
    FamilyAndCouplesTherapy,
    AddictionCounseling,
    CognitiveBehavioralTherapy,
    TraumaTherapy,
    Neuropsychology,
    GeriatricPsychology,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationEntry {
    pub specialization: Specialization,
    pub years_of_experience: u32,
    #[serde(default)]
    pub is_primary: bool,
    pub certification_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistProfile {
    pub phone: String,
    pub address: String,
    pub clinic_name: Option<String>,
    pub bio: String,
    pub consultation_fee: f64,
    pub languages_spoken: Vec<String>,
    pub website_url: Option<String>,
    pub social_media_links: BTreeMap<String, String>,
    pub specializations: Vec<SpecializationEntry>,
    pub availability_slots: Vec<String>,
}

impl SpecialistProfile {
    pub fn bio_word_count(&self) -> usize {
        self.bio.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorCode {
    Required,
    Blank,
    TooShort,
    MustBePositive,
    OutOfRange,
    UnknownValue,
    Duplicate,
    PrimaryCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ==============================================================================
// DOCUMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdentityCard,
    Degree,
    License,
    ExperienceLetter,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::IdentityCard,
        DocumentType::Degree,
        DocumentType::License,
        DocumentType::ExperienceLetter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdentityCard => "identity_card",
            DocumentType::Degree => "degree",
            DocumentType::License => "license",
            DocumentType::ExperienceLetter => "experience_letter",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            DocumentType::IdentityCard => 0,
            DocumentType::Degree => 1,
            DocumentType::License => 2,
            DocumentType::ExperienceLetter => 3,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

/// Outcome an admin can record for a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationVerdict {
    Verified,
    Rejected,
}

impl From<VerificationVerdict> for VerificationStatus {
    fn from(verdict: VerificationVerdict) -> Self {
        match verdict {
            VerificationVerdict::Verified => VerificationStatus::Verified,
            VerificationVerdict::Rejected => VerificationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
    pub verification_status: VerificationStatus,
    pub verification_notes: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// The four mandatory document slots; every key is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<DocumentType, Option<Document>>", into = "BTreeMap<DocumentType, Option<Document>>")]
pub struct DocumentSet {
    slots: BTreeMap<DocumentType, Option<Document>>,
}

impl Default for DocumentSet {
    fn default() -> Self {
        Self {
            slots: DocumentType::ALL.iter().map(|t| (*t, None)).collect(),
        }
    }
}

impl From<BTreeMap<DocumentType, Option<Document>>> for DocumentSet {
    fn from(mut slots: BTreeMap<DocumentType, Option<Document>>) -> Self {
        for document_type in DocumentType::ALL {
            slots.entry(document_type).or_insert(None);
        }
        Self { slots }
    }
}

impl From<DocumentSet> for BTreeMap<DocumentType, Option<Document>> {
    fn from(set: DocumentSet) -> Self {
        set.slots
    }
}

impl DocumentSet {
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut set = Self::default();
        for document in documents {
            set.set(document.document_type, Some(document));
        }
        set
    }

    pub fn get(&self, document_type: DocumentType) -> Option<&Document> {
        self.slots.get(&document_type).and_then(|slot| slot.as_ref())
    }

    pub fn set(&mut self, document_type: DocumentType, document: Option<Document>) -> Option<Document> {
        self.slots.insert(document_type, document).flatten()
    }

    pub fn find(&self, document_id: Uuid) -> Option<&Document> {
        self.documents().find(|doc| doc.id == document_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.slots.values().filter_map(|slot| slot.as_ref())
    }

    pub fn uploaded_count(&self) -> usize {
        self.documents().count()
    }

    pub fn missing(&self) -> Vec<DocumentType> {
        DocumentType::ALL
            .into_iter()
            .filter(|t| self.get(*t).is_none())
            .collect()
    }

    pub fn unverified(&self) -> Vec<DocumentType> {
        DocumentType::ALL
            .into_iter()
            .filter(|t| {
                self.get(*t)
                    .map(|doc| doc.verification_status != VerificationStatus::Verified)
                    .unwrap_or(true)
            })
            .collect()
    }
}

// ==============================================================================
// ACCOUNT
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistAccount {
    pub id: Uuid,
    pub approval_status: ApprovalStatus,
    pub profile: SpecialistProfile,
    pub documents: DocumentSet,
    pub submission_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpecialistAccount {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            approval_status: ApprovalStatus::ProfileIncomplete,
            profile: SpecialistProfile::default(),
            documents: DocumentSet::default(),
            submission_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> ApprovalStatus {
        self.approval_status.normalized()
    }
}

/// Read model returned by status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatusSummary {
    pub specialist_id: Uuid,
    pub approval_status: ApprovalStatus,
    pub profile_completion_percentage: u8,
    pub documents_uploaded: usize,
    pub documents_required: usize,
    pub missing_documents: Vec<DocumentType>,
    pub submission_date: Option<DateTime<Utc>>,
}

/// A committed status change handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ApprovalStatus,
    pub to: ApprovalStatus,
    /// Stamped when the account enters review; `None` keeps the stored value.
    pub submission_date: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadRequest {
    pub document_type: DocumentType,
    pub name: String,
    pub mime_type: String,
    /// Base64 payload, optionally as a `data:` URL.
    pub file_data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminTransitionQuery {
    pub expected_status: Option<ApprovalStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyDocumentRequest {
    pub status: VerificationVerdict,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewQueueQuery {
    pub status: Option<ApprovalStatus>,
}
