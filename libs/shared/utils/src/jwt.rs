use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid signature encoding")]
    SignatureEncoding,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Invalid claims encoding")]
    ClaimsEncoding,
    #[error("Invalid claims format")]
    ClaimsFormat,
    #[error("Token expired")]
    Expired,
}

/// Validates an HS256 token and resolves the caller.
///
/// Supabase issues `role = "authenticated"` for every signed-in user, so the
/// application role (`specialist`, `admin`) is read from `app_metadata.role`
/// first and falls back to the top-level claim.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(TokenError::Malformed),
    };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        TokenError::SignatureEncoding
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(TokenError::BadSignature);
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(TokenError::ClaimsEncoding)?;

    let claims: JwtClaims = serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        TokenError::ClaimsFormat
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(TokenError::Expired);
        }
    }

    let app_role = claims
        .app_metadata
        .as_ref()
        .and_then(|meta| meta.get("role"))
        .and_then(|role| role.as_str())
        .map(str::to_string);

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: app_role.or(claims.role),
        metadata: claims.user_metadata,
        created_at: claims
            .iat
            .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single()),
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};
    use assert_matches::assert_matches;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_token_signed_with_secret() {
        let user = TestUser::specialist("spec@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let resolved = validate_token(&token, SECRET).unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.role.as_deref(), Some("specialist"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let user = TestUser::admin("admin@example.com");
        let forged = JwtTestUtils::create_invalid_signature_token(&user);
        assert_matches!(validate_token(&forged, SECRET), Err(TokenError::BadSignature));

        let expired = JwtTestUtils::create_expired_token(&user, SECRET);
        assert_matches!(validate_token(&expired, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn rejects_malformed_token_and_missing_secret() {
        assert_matches!(validate_token("a.b", SECRET), Err(TokenError::Malformed));
        assert_matches!(validate_token("a.b.c.d", SECRET), Err(TokenError::Malformed));
        assert_matches!(validate_token("a.b.c", ""), Err(TokenError::MissingSecret));
    }

    #[test]
    fn app_metadata_role_wins_over_top_level_role() {
        let user = TestUser::specialist("spec@example.com");
        let token = JwtTestUtils::create_supabase_token(&user, SECRET);

        let resolved = validate_token(&token, SECRET).unwrap();
        assert_eq!(resolved.role.as_deref(), Some("specialist"));
    }
}
