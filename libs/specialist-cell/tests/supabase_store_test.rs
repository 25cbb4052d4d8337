use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use specialist_cell::{
    ApprovalStatus, DocumentStorage, DocumentType, SpecialistAccount, SpecialistStore,
    StatusChange, SupabaseDocumentStorage, SupabaseSpecialistStore,
};

async fn setup() -> (MockServer, SupabaseSpecialistStore) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    (mock_server, SupabaseSpecialistStore::new(&config))
}

#[tokio::test]
async fn test_get_assembles_documents() {
    let (mock_server, store) = setup().await;
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialists"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::specialist_row(&id, "documents_incomplete")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialist_documents"))
        .and(query_param("specialist_id", format!("in.({})", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::document_row(&id, "license"),
            MockSupabaseResponses::document_row(&id, "degree"),
        ])))
        .mount(&mock_server)
        .await;

    let account = store.get(id.parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(account.approval_status, ApprovalStatus::DocumentsIncomplete);
    assert_eq!(account.documents.uploaded_count(), 2);
    assert_eq!(
        account.documents.missing(),
        vec![DocumentType::IdentityCard, DocumentType::ExperienceLetter]
    );
}

#[tokio::test]
async fn test_get_missing_account() {
    let (mock_server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_legacy_pending_rows_are_listed_as_profile_incomplete() {
    let (mock_server, store) = setup().await;
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialists"))
        .and(query_param("approval_status", "in.(pending,profile_incomplete)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::specialist_row(&id, "pending")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialist_documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let accounts = store.list_by_status(ApprovalStatus::ProfileIncomplete).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].status(), ApprovalStatus::ProfileIncomplete);
}

#[tokio::test]
async fn test_compare_and_set_filters_on_current_status() {
    let (mock_server, store) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/specialists"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("approval_status", "eq.under_review"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "approval_status": "approved" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::specialist_row(&id.to_string(), "approved")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let applied = store
        .compare_and_set_status(
            id,
            StatusChange {
                from: ApprovalStatus::UnderReview,
                to: ApprovalStatus::Approved,
                submission_date: None,
            },
        )
        .await
        .unwrap();
    assert!(applied);
}

#[tokio::test]
async fn test_compare_and_set_lost_race() {
    let (mock_server, store) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/specialists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let applied = store
        .compare_and_set_status(
            Uuid::new_v4(),
            StatusChange {
                from: ApprovalStatus::DocumentsIncomplete,
                to: ApprovalStatus::UnderReview,
                submission_date: Some(Utc::now()),
            },
        )
        .await
        .unwrap();
    assert!(!applied);
}

#[tokio::test]
async fn test_create_duplicate_returns_false() {
    let (mock_server, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/specialists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let created = store.create(&SpecialistAccount::new(Uuid::new_v4())).await.unwrap();
    assert!(!created);
}

#[tokio::test]
async fn test_server_error_surfaces_as_err() {
    let (mock_server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialists"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::error_response("boom", "XX000")),
        )
        .mount(&mock_server)
        .await;

    assert!(store.get(Uuid::new_v4()).await.is_err());
}

#[tokio::test]
async fn test_document_storage_put_and_remove() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let storage = SupabaseDocumentStorage::new(&config);

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/specialist-documents/abc/license/doc.pdf"))
        .and(header("content-type", "application/pdf"))
        .and(header("x-upsert", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "abc/license/doc.pdf" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/specialist-documents/abc/license/doc.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    storage
        .put("abc/license/doc.pdf", b"%PDF".to_vec(), "application/pdf")
        .await
        .unwrap();
    // Already gone counts as removed.
    storage.remove("abc/license/doc.pdf").await.unwrap();
}
