//! FsStore - tokio::fs backed storage

use super::{Category, FileStore, PathMapping};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::Path;
use tokio::fs;

/// Production store writing real files
#[derive(Debug, Default, Clone)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }

    /// Create every category directory under the data root.
    pub async fn ensure_dirs(&self, paths: &PathMapping) -> ApiResult<()> {
        try_join_all(Category::all().iter().map(|category| {
            let dir = paths.dir(*category);
            async move { fs::create_dir_all(&dir).await }
        }))
        .await?;
        tracing::info!(root = %paths.root().display(), "data directories ready");
        Ok(())
    }
}

#[async_trait]
impl FileStore for FsStore {
    async fn put(&self, path: &Path, content: String) -> ApiResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content.as_bytes()).await?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    async fn get(&self, path: &Path) -> ApiResult<String> {
        if !self.exists(path).await {
            return Err(ApiError::NotFound(path.to_path_buf()));
        }
        Ok(fs::read_to_string(path).await?)
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quantum").join("input.txt");
        let store = FsStore::new();

        assert!(!store.exists(&path).await);
        store.put(&path, "10101010\n01010101\n1100110011".to_string()).await.unwrap();
        // Idempotent on an existing directory
        store.put(&path, "00000000".to_string()).await.unwrap();

        assert!(store.exists(&path).await);
        assert_eq!(store.get(&path).await.unwrap(), "00000000");
    }

    #[tokio::test]
    async fn test_ensure_dirs_creates_every_category() {
        let dir = tempdir().unwrap();
        let paths = PathMapping::new(dir.path());

        FsStore::new().ensure_dirs(&paths).await.unwrap();

        for category in Category::all() {
            assert!(paths.dir(*category).is_dir(), "{category}");
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FsStore::new();

        let err = store.get(&dir.path().join("nope.txt")).await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
