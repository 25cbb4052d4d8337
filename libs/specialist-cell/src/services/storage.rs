use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

/// Blob storage behind uploaded verification documents.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Removing a path that does not exist succeeds.
    async fn remove(&self, path: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStorage {
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryDocumentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl DocumentStorage for InMemoryDocumentStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.objects.write().await.remove(path);
        Ok(())
    }
}

pub struct SupabaseDocumentStorage {
    supabase: SupabaseClient,
    bucket: String,
}

impl SupabaseDocumentStorage {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.documents_bucket.clone(),
        }
    }
}

#[async_trait]
impl DocumentStorage for SupabaseDocumentStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        debug!("Storing document object {} in bucket {}", path, self.bucket);
        self.supabase
            .upload_object(&self.bucket, path, bytes, content_type)
            .await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        debug!("Releasing document object {} in bucket {}", path, self.bucket);
        self.supabase.delete_object(&self.bucket, path).await
    }
}
