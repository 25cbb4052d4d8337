use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            documents_bucket: "specialist-documents".to_string(),
            document_upload_timeout_secs: 5,
            require_verified_documents: true,
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn specialist(email: &str) -> Self {
        Self::new(email, "specialist")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": user.role,
                "iat": now.timestamp(),
                "exp": exp.timestamp()
            }),
            secret,
        )
    }

    /// Token shaped like the ones Supabase issues: generic top-level role,
    /// application role under `app_metadata`.
    pub fn create_supabase_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now();
        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": "authenticated",
                "app_metadata": { "role": user.role },
                "iat": now.timestamp(),
                "exp": (now + Duration::hours(1)).timestamp()
            }),
            secret,
        )
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn specialist_row(id: &str, approval_status: &str) -> Value {
        json!({
            "id": id,
            "approval_status": approval_status,
            "profile": {
                "phone": "",
                "address": "",
                "clinic_name": null,
                "bio": "",
                "consultation_fee": 0.0,
                "languages_spoken": [],
                "website_url": null,
                "social_media_links": {},
                "specializations": [],
                "availability_slots": []
            },
            "submission_date": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn document_row(specialist_id: &str, document_type: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "specialist_id": specialist_id,
            "document_type": document_type,
            "name": format!("{}.pdf", document_type),
            "mime_type": "application/pdf",
            "size_bytes": 1024,
            "storage_path": format!("{}/{}/{}.pdf", specialist_id, document_type, Uuid::new_v4()),
            "verification_status": "pending",
            "verification_notes": null,
            "uploaded_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
