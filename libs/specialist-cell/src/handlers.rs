use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_utils::extractor::{require_owner, require_owner_or_admin, require_role};

use crate::error::OnboardingError;
use crate::models::{
    AdminTransitionQuery, ApprovalStatus, DocumentUploadRequest, ReviewQueueQuery,
    SpecialistProfile, VerifyDocumentRequest,
};
use crate::services::OnboardingService;

pub struct SpecialistState {
    pub service: Arc<OnboardingService>,
}

fn require_admin(user: &User) -> Result<(), OnboardingError> {
    require_role(user, "admin")?;
    Ok(())
}

// ==============================================================================
// SPECIALIST HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn register_specialist(
    State(state): State<Arc<SpecialistState>>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<Value>), OnboardingError> {
    require_role(&user, "specialist")?;

    let specialist_id = Uuid::parse_str(&user.id)
        .map_err(|_| OnboardingError::Forbidden("Token subject is not a valid user id".to_string()))?;

    let account = state.service.register(specialist_id).await?;
    Ok((StatusCode::CREATED, Json(json!(account))))
}

#[axum::debug_handler]
pub async fn get_specialist(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_owner_or_admin(&user, &specialist_id.to_string())?;

    let account = state.service.get_specialist(specialist_id).await?;
    Ok(Json(json!(account)))
}

#[axum::debug_handler]
pub async fn get_approval_status(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_owner_or_admin(&user, &specialist_id.to_string())?;

    let summary = state.service.get_approval_status(specialist_id).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn submit_profile(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(profile): Json<SpecialistProfile>,
) -> Result<Json<Value>, OnboardingError> {
    require_owner(&user, &specialist_id.to_string())?;

    let summary = state.service.submit_profile(specialist_id, profile).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn upload_document(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<DocumentUploadRequest>,
) -> Result<(StatusCode, Json<Value>), OnboardingError> {
    require_owner(&user, &specialist_id.to_string())?;

    let document = state.service.upload_document(specialist_id, request).await?;
    Ok((StatusCode::CREATED, Json(json!(document))))
}

#[axum::debug_handler]
pub async fn remove_document(
    State(state): State<Arc<SpecialistState>>,
    Path((specialist_id, document_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_owner(&user, &specialist_id.to_string())?;

    state.service.remove_document(specialist_id, document_id).await?;
    Ok(Json(json!({
        "removed": true,
        "document_id": document_id,
    })))
}

#[axum::debug_handler]
pub async fn submit_for_approval(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_owner(&user, &specialist_id.to_string())?;

    let summary = state.service.submit_for_approval(specialist_id).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn reopen(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_owner(&user, &specialist_id.to_string())?;

    let summary = state.service.reopen(specialist_id).await?;
    Ok(Json(json!(summary)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn review_queue(
    State(state): State<Arc<SpecialistState>>,
    Query(query): Query<ReviewQueueQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    let status = query.status.unwrap_or(ApprovalStatus::UnderReview);
    let specialists = state.service.list_by_status(status).await?;

    Ok(Json(json!({
        "status": status,
        "specialists": specialists,
        "total": specialists.len(),
    })))
}

#[axum::debug_handler]
pub async fn approve(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Query(query): Query<AdminTransitionQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    let summary = state.service.approve(specialist_id, query.expected_status).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn reject(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Query(query): Query<AdminTransitionQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    let summary = state.service.reject(specialist_id, query.expected_status).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn suspend(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Query(query): Query<AdminTransitionQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    let summary = state.service.suspend(specialist_id, query.expected_status).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn unsuspend(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Query(query): Query<AdminTransitionQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    let summary = state.service.unsuspend(specialist_id, query.expected_status).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn delete_specialist(
    State(state): State<Arc<SpecialistState>>,
    Path(specialist_id): Path<Uuid>,
    Query(query): Query<AdminTransitionQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    state.service.delete(specialist_id, query.expected_status).await?;
    Ok(Json(json!({
        "deleted": true,
        "specialist_id": specialist_id,
    })))
}

#[axum::debug_handler]
pub async fn verify_document(
    State(state): State<Arc<SpecialistState>>,
    Path((specialist_id, document_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifyDocumentRequest>,
) -> Result<Json<Value>, OnboardingError> {
    require_admin(&user)?;

    let document = state
        .service
        .verify_document(specialist_id, document_id, request.status, request.notes)
        .await?;
    Ok(Json(json!(document)))
}
