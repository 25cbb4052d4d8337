use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SpecialistState};
use crate::models::MAX_DOCUMENT_BYTES;
use crate::services::OnboardingService;

/// Base64 inflates by 4/3; leave room for the JSON envelope.
const UPLOAD_BODY_LIMIT: usize = MAX_DOCUMENT_BYTES / 3 * 4 + 64 * 1024;

pub fn specialist_routes(config: Arc<AppConfig>, service: Arc<OnboardingService>) -> Router {
    let state = Arc::new(SpecialistState { service });

    let upload_routes = Router::new()
        .route("/{specialist_id}/documents", post(handlers::upload_document))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        // Specialist self-service
        .route("/register", post(handlers::register_specialist))
        .route("/{specialist_id}", get(handlers::get_specialist))
        .route("/{specialist_id}/status", get(handlers::get_approval_status))
        .route("/{specialist_id}/profile", put(handlers::submit_profile))
        .route(
            "/{specialist_id}/documents/{document_id}",
            delete(handlers::remove_document),
        )
        .route("/{specialist_id}/submit", post(handlers::submit_for_approval))
        .route("/{specialist_id}/reopen", post(handlers::reopen))
        .merge(upload_routes)

        // Admin review
        .route("/review-queue", get(handlers::review_queue))
        .route("/{specialist_id}/approve", post(handlers::approve))
        .route("/{specialist_id}/reject", post(handlers::reject))
        .route("/{specialist_id}/suspend", post(handlers::suspend))
        .route("/{specialist_id}/unsuspend", post(handlers::unsuspend))
        .route("/{specialist_id}", delete(handlers::delete_specialist))
        .route(
            "/{specialist_id}/documents/{document_id}/verification",
            patch(handlers::verify_document),
        )

        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
