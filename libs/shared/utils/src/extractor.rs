use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Resolves the bearer token into a [`User`] and stores it in the request
/// extensions for downstream handlers.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_value = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn require_role(user: &User, role: &str) -> Result<(), AppError> {
    if user.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("This action requires the {} role", role)))
    }
}

/// Owners may act on their own record; admins on any record.
pub fn require_owner_or_admin(user: &User, owner_id: &str) -> Result<(), AppError> {
    if user.id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this specialist".to_string()))
    }
}

pub fn require_owner(user: &User, owner_id: &str) -> Result<(), AppError> {
    if user.id == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the specialist may modify this record".to_string()))
    }
}
