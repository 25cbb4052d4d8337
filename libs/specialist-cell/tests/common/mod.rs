#![allow(dead_code)]

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::test_utils::TestConfig;
use specialist_cell::{
    DocumentType, DocumentUploadRequest, InMemoryDocumentStorage, InMemorySpecialistStore,
    OnboardingService, Specialization, SpecializationEntry, SpecialistProfile, TracingNotifier,
    VerificationVerdict,
};

pub struct Harness {
    pub service: OnboardingService,
    pub store: Arc<InMemorySpecialistStore>,
    pub storage: Arc<InMemoryDocumentStorage>,
}

pub fn test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: AppConfig) -> Harness {
    let store = Arc::new(InMemorySpecialistStore::new());
    let storage = Arc::new(InMemoryDocumentStorage::new());
    let service = OnboardingService::new(
        &config,
        store.clone(),
        storage.clone(),
        Arc::new(TracingNotifier),
    );
    Harness {
        service,
        store,
        storage,
    }
}

pub fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
}

pub fn valid_profile() -> SpecialistProfile {
    SpecialistProfile {
        phone: "+212 600 123 456".to_string(),
        address: "14 Avenue Hassan II, Rabat".to_string(),
        clinic_name: Some("Atlas Wellbeing".to_string()),
        bio: words(30),
        consultation_fee: 350.0,
        languages_spoken: vec!["arabic".to_string(), "french".to_string()],
        specializations: vec![
            SpecializationEntry {
                specialization: Specialization::ClinicalPsychology,
                years_of_experience: 9,
                is_primary: true,
                certification_date: None,
            },
            SpecializationEntry {
                specialization: Specialization::TraumaTherapy,
                years_of_experience: 4,
                is_primary: false,
                certification_date: None,
            },
        ],
        availability_slots: vec!["09:00-10:00".to_string(), "15:00-16:00".to_string()],
        ..SpecialistProfile::default()
    }
}

pub fn upload_request(document_type: DocumentType) -> DocumentUploadRequest {
    DocumentUploadRequest {
        document_type,
        name: format!("{}.pdf", document_type),
        mime_type: "application/pdf".to_string(),
        file_data: BASE64.encode(format!("%PDF-1.7 {}", document_type)),
    }
}

/// Registered account with a complete profile, in `documents_incomplete`.
pub async fn profiled(service: &OnboardingService) -> Uuid {
    let id = Uuid::new_v4();
    service.register(id).await.unwrap();
    service.submit_profile(id, valid_profile()).await.unwrap();
    id
}

pub async fn upload_all(service: &OnboardingService, id: Uuid) {
    for document_type in DocumentType::ALL {
        service.upload_document(id, upload_request(document_type)).await.unwrap();
    }
}

/// Account in `under_review` with all four documents uploaded.
pub async fn under_review(service: &OnboardingService) -> Uuid {
    let id = profiled(service).await;
    upload_all(service, id).await;
    service.submit_for_approval(id).await.unwrap();
    id
}

pub async fn verify_all(service: &OnboardingService, id: Uuid) {
    let account = service.get_specialist(id).await.unwrap();
    let ids: Vec<Uuid> = account.documents.documents().map(|d| d.id).collect();
    for document_id in ids {
        service
            .verify_document(id, document_id, VerificationVerdict::Verified, None)
            .await
            .unwrap();
    }
}

/// Account in `under_review` whose documents are all verified.
pub async fn ready_for_approval(service: &OnboardingService) -> Uuid {
    let id = under_review(service).await;
    verify_all(service, id).await;
    id
}
