//! Resume persistence.

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::model::{ResumeData, StoredResume};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored resume is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait ResumeStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<StoredResume>, StoreError>;
    async fn upsert(&self, user_id: &str, content: ResumeData) -> Result<StoredResume, StoreError>;
}

/// One JSON document per user under a data directory. Writes go through
/// a temp file and a rename, so a crash never leaves a half-written
/// resume behind.
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// User ids are filesystem-safe; the auth layer enforces the charset.
    fn path_for(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("{user_id}.json"))
    }
}

#[async_trait::async_trait]
impl ResumeStore for JsonFileStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredResume>, StoreError> {
        let path = self.path_for(user_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let resume = serde_json::from_slice(&bytes)?;
        Ok(Some(resume))
    }

    async fn upsert(&self, user_id: &str, content: ResumeData) -> Result<StoredResume, StoreError> {
        let now = Utc::now();
        let resume = match self.get(user_id).await? {
            Some(existing) => StoredResume {
                content,
                updated_at: now,
                ..existing
            },
            None => StoredResume {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                content,
                created_at: now,
                updated_at: now,
            },
        };

        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&resume)?;
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("stored resume for {user_id} at {}", path.display());
        Ok(resume)
    }
}
