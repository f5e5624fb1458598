use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{fs, sync::Mutex};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// URL prefix under which stored photos are served.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Blob storage for product photos.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Persists the bytes and returns an opaque reference.
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String>;
    /// Public URL for a reference returned by `store`.
    fn resolve(&self, reference: &str) -> String;
    /// Deletes a stored photo. Unknown references are not an error.
    async fn remove(&self, reference: &str) -> AppResult<()>;
}

/// Inverse of `resolve`: the reference behind a `/uploads/...` URL.
pub fn reference_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(UPLOADS_PREFIX)?
        .strip_prefix('/')
        .filter(|reference| {
            !reference.is_empty() && !reference.starts_with('.') && !reference.contains(['/', '\\'])
        })
}

/// Writes photos to a directory that `main` serves at [`UPLOADS_PREFIX`].
#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let reference = object_key(file_name);
        fs::write(self.root.join(&reference), bytes)
            .await
            .map_err(|err| AppError::Internal(anyhow::anyhow!("unable to save photo: {err}")))?;
        tracing::debug!(reference = %reference, "photo stored");
        Ok(reference)
    }

    fn resolve(&self, reference: &str) -> String {
        format!("{UPLOADS_PREFIX}/{reference}")
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        match fs::remove_file(self.root.join(reference)).await {
            Ok(()) => {
                tracing::debug!(reference = %reference, "photo removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Internal(anyhow::anyhow!(
                "unable to remove photo: {err}"
            ))),
        }
    }
}

/// Keeps photos in memory; for tests and tooling that must not touch disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryPhotoStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(reference).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl PhotoStorage for MemoryPhotoStorage {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let reference = object_key(file_name);
        self.objects.lock().await.insert(reference.clone(), bytes);
        Ok(reference)
    }

    fn resolve(&self, reference: &str) -> String {
        format!("{UPLOADS_PREFIX}/{reference}")
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        self.objects.lock().await.remove(reference);
        Ok(())
    }
}

/// `<unix-seconds>_<8 hex>_<sanitized base name>`.
fn object_key(file_name: &str) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        Utc::now().timestamp(),
        &nonce[..8],
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}
