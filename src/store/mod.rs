//! Store - File-backed Result Storage
//!
//! TigerStyle: Abstract storage with an in-memory backend for tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FileStore Trait                         │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │   MemoryStore   │           │     FsStore     │
//! │   (testing)     │           │  (production)   │
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! Addressing is `category × filename → path` (see [`PathMapping`]). Every
//! write replaces the whole file; concurrent writers race, last one wins.

mod fs;
mod memory;
mod paths;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use paths::{Category, PathMapping};

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

// =============================================================================
// Backend Trait
// =============================================================================

/// Raw UTF-8 storage keyed by path
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug {
    /// Replace the file contents, creating parent directories first.
    async fn put(&self, path: &Path, content: String) -> ApiResult<()>;

    /// Read the file contents. Fails with `NotFound` when absent.
    async fn get(&self, path: &Path) -> ApiResult<String>;

    /// Check for presence. Never fails.
    async fn exists(&self, path: &Path) -> bool;
}

// =============================================================================
// Content
// =============================================================================

/// On-disk encoding of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Written verbatim
    Text,
    /// Pretty-printed JSON, key order as serialized
    Json,
}

/// A decoded stored record
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Json(serde_json::Value),
}

impl Content {
    /// Format this content is written in
    pub fn format(&self) -> Format {
        match self {
            Self::Text(_) => Format::Text,
            Self::Json(_) => Format::Json,
        }
    }

    fn render(&self) -> ApiResult<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Json(value) => serde_json::to_string_pretty(value).map_err(ApiError::internal),
        }
    }
}

/// Write `content` to `path` in its own format
pub async fn write(store: &dyn FileStore, path: &Path, content: &Content) -> ApiResult<()> {
    store.put(path, content.render()?).await
}

/// Read `path` and decode it as `format`
pub async fn read(store: &dyn FileStore, path: &Path, format: Format) -> ApiResult<Content> {
    let raw = store.get(path).await?;
    match format {
        Format::Text => Ok(Content::Text(raw)),
        Format::Json => serde_json::from_str(&raw)
            .map(Content::Json)
            .map_err(|e| ApiError::parse(path, e.to_string())),
    }
}

/// Write plain text
pub async fn write_text(store: &dyn FileStore, path: &Path, text: impl Into<String>) -> ApiResult<()> {
    store.put(path, text.into()).await
}

/// Serialize a record as pretty JSON and write it
pub async fn write_json<T: Serialize + Sync + ?Sized>(
    store: &dyn FileStore,
    path: &Path,
    record: &T,
) -> ApiResult<()> {
    let body = serde_json::to_string_pretty(record).map_err(ApiError::internal)?;
    store.put(path, body).await
}

/// Read a JSON file into a typed record
pub async fn read_json<T: DeserializeOwned>(store: &dyn FileStore, path: &Path) -> ApiResult<T> {
    let raw = store.get(path).await?;
    serde_json::from_str(&raw).map_err(|e| ApiError::parse(path, e.to_string()))
}

/// Read a file written by an earlier step.
///
/// A missing file becomes `DependencyMissing` carrying `what`, so the caller
/// is told which step to run first.
pub async fn read_dependency(store: &dyn FileStore, path: &Path, what: &str) -> ApiResult<String> {
    if !store.exists(path).await {
        return Err(ApiError::DependencyMissing(what.to_string()));
    }
    store.get(path).await
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        is_valid: bool,
        security_level: String,
        recommendations: Vec<String>,
    }

    #[tokio::test]
    async fn test_json_record_reads_back_equal() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/data/keyGen/key_validation.json");
        let record = Sample {
            is_valid: true,
            security_level: "中".to_string(),
            recommendations: vec!["定期更新密钥以维护安全性".to_string()],
        };

        write_json(&store, &path, &record).await.unwrap();
        let back: Sample = read_json(&store, &path).await.unwrap();

        assert_eq!(back, record);
    }

    #[tokio::test]
    async fn test_unserializable_record_is_internal() {
        let store = MemoryStore::new();
        let mut by_pair = std::collections::HashMap::new();
        by_pair.insert((1, 2), 3);

        let err = write_json(&store, Path::new("/data/bad.json"), &by_pair)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Internal(_)));
        assert!(store.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_distinguishes_missing_from_corrupt() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/data/signature/batch_signatures.json");

        let missing = read(&store, &path, Format::Json).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));

        write_text(&store, &path, "{not json").await.unwrap();
        let corrupt = read(&store, &path, Format::Json).await;
        assert!(matches!(corrupt, Err(ApiError::Parse { .. })));

        let text = read(&store, &path, Format::Text).await.unwrap();
        assert_eq!(text, Content::Text("{not json".to_string()));
    }

    #[tokio::test]
    async fn test_content_write_uses_its_format() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/data/analysis/pblpke_report.json");
        let content = Content::Json(serde_json::json!({"algorithm": "PBLPKE", "timestamp": 1}));
        assert_eq!(content.format(), Format::Json);

        write(&store, &path, &content).await.unwrap();
        let back = read(&store, &path, Format::Json).await.unwrap();

        assert_eq!(back, content);
    }

    #[tokio::test]
    async fn test_read_dependency_reports_missing_step() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/data/quantum/output_1.txt");

        let err = read_dependency(&store, &path, "未找到SDES加密结果文件")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::DependencyMissing(_)));
        assert!(err.to_string().contains("SDES"));
    }
}
