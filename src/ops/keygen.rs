//! LWE key generation and key-pair validation

use super::{as_count, shown};
use crate::error::ApiResult;
use crate::fabricate::keygen::{self, ErrorDistribution, LweParams, SECURITY_LEVEL_DEFAULT};
use crate::pipeline::{Context, Outcome};
use crate::store::{self, Category};
use crate::validate::Params;
use serde_json::json;

pub const PARAMS_FILE: &str = "lwe_params.txt";
pub const PUBLIC_KEY_FILE: &str = "lwe_public_key.txt";
pub const PRIVATE_KEY_FILE: &str = "lwe_private_key.txt";
pub const VALIDATION_FILE: &str = "key_validation.json";

const KEYGEN_DELAY_MS: u64 = 3000;
const VALIDATE_DELAY_MS: u64 = 1000;

pub async fn generate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["dimension", "modulus", "errorDistribution", "keyLength"])?;
    let lwe = LweParams {
        dimension: as_count(params.int_in("dimension", 256..=8192)?),
        modulus: params.int_in("modulus", 2..=i64::MAX)? as u64,
        error_distribution: ErrorDistribution::parse(&params.text("errorDistribution")?),
        key_length: params.int_in("keyLength", 128..=4096)?,
        security_level: params.int_opt("securityLevel")?.unwrap_or(SECURITY_LEVEL_DEFAULT),
    };

    ctx.delay(KEYGEN_DELAY_MS).await;

    let now = Context::now_ms();
    let job = lwe.clone();
    let (public_key_text, private_key_text, key_preview) = ctx
        .fabricate_blocking(move |rng| {
            let pair = keygen::generate_key_pair(rng, &job);
            (pair.public_key_text(now), pair.private_key_text(now), pair.preview())
        })
        .await?;
    let metrics = keygen::key_security_metrics(&lwe);

    let input_file = ctx.path(Category::KeyGen, PARAMS_FILE);
    let public_key_file = ctx.path(Category::KeyGen, PUBLIC_KEY_FILE);
    let private_key_file = ctx.path(Category::KeyGen, PRIVATE_KEY_FILE);
    store::write_text(ctx.store(), &public_key_file, public_key_text).await?;
    store::write_text(ctx.store(), &private_key_file, private_key_text).await?;
    store::write_text(ctx.store(), &input_file, lwe.to_file_text(now)).await?;

    Outcome::new(
        "LWE密钥生成完成",
        &json!({
            "inputFile": shown(&input_file),
            "publicKeyFile": shown(&public_key_file),
            "privateKeyFile": shown(&private_key_file),
            "keyPair": key_preview,
            "securityMetrics": metrics,
        }),
    )
}

/// Check the stored key pair. Request fields are ignored; the canonical key
/// files are always the ones checked.
pub async fn validate(ctx: &Context, _params: Params) -> ApiResult<Outcome> {
    let public_key_file = ctx.path(Category::KeyGen, PUBLIC_KEY_FILE);
    let private_key_file = ctx.path(Category::KeyGen, PRIVATE_KEY_FILE);
    let public_key = store::read_dependency(ctx.store(), &public_key_file, "密钥文件不存在").await?;
    let private_key = store::read_dependency(ctx.store(), &private_key_file, "密钥文件不存在").await?;

    ctx.delay(VALIDATE_DELAY_MS).await;

    let validation = keygen::validate_key_pair(&public_key, &private_key, Context::now_ms());

    let validation_file = ctx.path(Category::KeyGen, VALIDATION_FILE);
    store::write_json(ctx.store(), &validation_file, &validation).await?;

    Outcome::new(
        "密钥验证完成",
        &json!({
            "validationFile": shown(&validation_file),
            "results": validation,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ApiError;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn setup() -> (Context, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Context::new(Config::for_tests("/data"), store.clone()), store)
    }

    #[tokio::test]
    async fn test_generate_then_validate() {
        let (ctx, files) = setup();
        let body = json!({
            "dimension": 256,
            "modulus": 3329,
            "errorDistribution": "gaussian",
            "keyLength": 256
        });

        let generated = generate(&ctx, Params::from_value(body).unwrap()).await.unwrap();
        let preview = generated.data["keyPair"]["publicKey"]["matrixA"].as_str().unwrap();
        assert!(preview.ends_with("..."));
        assert_eq!(
            files.writes().await,
            vec![
                ctx.path(Category::KeyGen, PUBLIC_KEY_FILE),
                ctx.path(Category::KeyGen, PRIVATE_KEY_FILE),
                ctx.path(Category::KeyGen, PARAMS_FILE),
            ]
        );

        let checked = validate(&ctx, Params::default()).await.unwrap();
        assert_eq!(checked.data["results"]["isValid"], true);
        assert_eq!(checked.data["results"]["securityLevel"], "低");
    }

    #[tokio::test]
    async fn test_dimension_out_of_range() {
        let (ctx, files) = setup();
        let body = json!({
            "dimension": 128,
            "modulus": 3329,
            "errorDistribution": "binary",
            "keyLength": 256
        });

        let err = generate(&ctx, Params::from_value(body).unwrap()).await.unwrap_err();

        assert!(matches!(err, ApiError::Range { .. }));
        assert!(files.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_validate_without_keys() {
        let (ctx, _) = setup();

        let err = validate(&ctx, Params::default()).await.unwrap_err();

        assert!(matches!(err, ApiError::DependencyMissing(_)));
    }
}
