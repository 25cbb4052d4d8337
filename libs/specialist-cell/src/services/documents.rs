use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use uuid::Uuid;

use crate::error::FileError;
use crate::models::{
    Document, DocumentType, DocumentUploadRequest, VerificationStatus,
    ALLOWED_DOCUMENT_MIME_TYPES, MAX_DOCUMENT_BYTES,
};

/// An upload that passed every check and can be written to storage.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub document_type: DocumentType,
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ValidatedUpload {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "application/pdf" => "pdf",
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "application/msword" => "doc",
            _ => "docx",
        }
    }

    /// Builds the pending record and the storage path it will live at.
    pub fn into_document(self, specialist_id: Uuid) -> (Document, Vec<u8>) {
        let id = Uuid::new_v4();
        let storage_path = format!(
            "{}/{}/{}.{}",
            specialist_id,
            self.document_type,
            id,
            self.extension()
        );
        let document = Document {
            id,
            document_type: self.document_type,
            name: self.name,
            mime_type: self.mime_type,
            size_bytes: self.bytes.len() as u64,
            storage_path,
            verification_status: VerificationStatus::Pending,
            verification_notes: None,
            uploaded_at: Utc::now(),
        };
        (document, self.bytes)
    }
}

/// Checks run before anything touches storage.
pub fn validate_upload(request: DocumentUploadRequest) -> Result<ValidatedUpload, FileError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(FileError::EmptyName);
    }

    let (declared_type, payload) = split_data_url(&request.file_data);
    let mime_type = declared_type
        .unwrap_or(&request.mime_type)
        .trim()
        .to_ascii_lowercase();
    let mime_type = if mime_type == "image/jpg" { "image/jpeg".to_string() } else { mime_type };
    if !ALLOWED_DOCUMENT_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(FileError::UnsupportedType(mime_type));
    }

    // Cheap bound before decoding: base64 inflates by 4/3.
    let encoded_limit = MAX_DOCUMENT_BYTES.div_ceil(3) * 4;
    let trimmed = payload.trim();
    if trimmed.len() > encoded_limit + 4 {
        return Err(FileError::TooLarge {
            size: trimmed.len() / 4 * 3,
            limit: MAX_DOCUMENT_BYTES,
        });
    }

    let bytes = BASE64.decode(trimmed).map_err(|_| FileError::InvalidEncoding)?;
    if bytes.is_empty() {
        return Err(FileError::Empty);
    }
    if bytes.len() > MAX_DOCUMENT_BYTES {
        return Err(FileError::TooLarge {
            size: bytes.len(),
            limit: MAX_DOCUMENT_BYTES,
        });
    }

    Ok(ValidatedUpload {
        document_type: request.document_type,
        name,
        mime_type,
        bytes,
    })
}

/// `data:application/pdf;base64,AAAA` → (Some("application/pdf"), "AAAA")
fn split_data_url(data: &str) -> (Option<&str>, &str) {
    match data.strip_prefix("data:").and_then(|rest| rest.split_once(";base64,")) {
        Some((mime, payload)) => (Some(mime), payload),
        None => (None, data),
    }
}
