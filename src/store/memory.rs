//! MemoryStore - in-memory storage for tests
//!
//! Keeps an ordered write log so tests can check which canonical files a
//! request touched (or that it touched none).

use super::FileStore;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<PathBuf, String>,
    writes: Vec<PathBuf>,
}

/// Store backed by a map
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every path written so far, in order (repeats included)
    pub async fn writes(&self) -> Vec<PathBuf> {
        self.inner.read().await.writes.clone()
    }

    /// Current contents of a path, if any
    pub async fn contents(&self, path: &Path) -> Option<String> {
        self.inner.read().await.files.get(path).cloned()
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn put(&self, path: &Path, content: String) -> ApiResult<()> {
        let mut inner = self.inner.write().await;
        inner.files.insert(path.to_path_buf(), content);
        inner.writes.push(path.to_path_buf());
        Ok(())
    }

    async fn get(&self, path: &Path) -> ApiResult<String> {
        self.inner
            .read()
            .await
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.to_path_buf()))
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.read().await.files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/data/quantum/output.txt");

        store.put(&path, "first".to_string()).await.unwrap();
        store.put(&path, "second".to_string()).await.unwrap();

        assert_eq!(store.get(&path).await.unwrap(), "second");
        assert_eq!(store.writes().await, vec![path.clone(), path]);
    }
}
