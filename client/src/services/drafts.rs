//! Local draft storage for in-progress forms
//!
//! One JSON file per key under the configured drafts directory.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;

const DRAFT_EXTENSION: &str = "json";

/// Directory-backed key/value store for form drafts
#[derive(Debug, Clone)]
pub struct DraftStore {
    directory: PathBuf,
}

impl DraftStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Store a draft, replacing any previous one under the same key
    pub async fn save<T: Serialize>(&self, key: &str, draft: &T) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(draft)?;

        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &path).await?;

        tracing::debug!(key, path = %path.display(), "Draft saved");
        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a draft; returns whether one existed
    pub async fn discard(&self, key: &str) -> AppResult<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                tracing::debug!(key, "Draft discarded");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys of all stored drafts, sorted
    pub async fn list(&self) -> AppResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DRAFT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", sanitize_key(key), DRAFT_EXTENSION))
    }
}

/// Keys become file names; anything outside `[A-Za-z0-9_-]` is replaced
fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Draft key of a farm form
pub fn farm_draft_key(farm_id: Option<Uuid>, farmer_id: Option<Uuid>) -> String {
    match (farm_id, farmer_id) {
        (Some(farm_id), _) => format!("farm-{}", farm_id),
        (None, Some(farmer_id)) => format!("farm-new-{}", farmer_id),
        (None, None) => "farm-new".to_string(),
    }
}

/// Draft key of a farmer registration form
pub fn farmer_draft_key(farmer_id: Option<Uuid>) -> String {
    match farmer_id {
        Some(id) => format!("farmer-{}", id),
        None => "farmer-new".to_string(),
    }
}
