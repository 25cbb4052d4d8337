use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;
use specialist_cell::router::specialist_routes;
use specialist_cell::OnboardingService;

pub fn create_router(config: Arc<AppConfig>, service: Arc<OnboardingService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Specialist onboarding API is running!" }))
        .nest("/specialists", specialist_routes(config, service))
}
