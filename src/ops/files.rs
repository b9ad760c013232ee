//! Stored result file reads

use super::shown;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::{Context, Outcome};
use serde_json::json;

/// Return one stored file by category and name.
///
/// Category aliases (`sdes`, `lpn`, `sm4`) resolve to the shared quantum
/// directory. Names that would leave the data root are rejected.
pub async fn read(ctx: &Context, category: &str, filename: &str) -> ApiResult<Outcome> {
    let path = ctx.paths().resolve(category, filename)?;
    if !ctx.store().exists(&path).await {
        return Err(ApiError::NotFound(path));
    }
    let content = ctx.store().get(&path).await?;

    Outcome::new(
        "文件读取成功",
        &json!({
            "filename": filename,
            "content": content,
            "path": shown(&path),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{self, Category, MemoryStore};
    use std::sync::Arc;

    fn setup() -> (Context, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Context::new(Config::for_tests("/data"), store.clone()), store)
    }

    #[tokio::test]
    async fn test_read_through_alias() {
        let (ctx, files) = setup();
        let path = ctx.path(Category::Quantum, "output_1.txt");
        store::write_text(files.as_ref(), &path, "10101010\n").await.unwrap();

        let out = read(&ctx, "sdes", "output_1.txt").await.unwrap();

        assert_eq!(out.data["content"], "10101010\n");
        assert_eq!(out.data["filename"], "output_1.txt");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (ctx, _) = setup();

        let err = read(&ctx, "keygen", "lwe_public_key.txt").await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (ctx, _) = setup();

        let err = read(&ctx, "quantum", "..").await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidFormat { .. }));
    }
}
