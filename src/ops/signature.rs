//! Lattice signature operations
//!
//! Sign, verify and the batch variants all read the canonical signing key
//! files written by `keygen`.

use super::{as_count, shown};
use crate::error::{ApiError, ApiResult};
use crate::fabricate::keygen::SECURITY_LEVEL_DEFAULT;
use crate::fabricate::signature::{
    self, BatchSignatures, SigningParams, HASH_ALGORITHM_DEFAULT, SIGNATURE_DIMENSION_FALLBACK,
};
use crate::pipeline::{Context, Outcome};
use crate::store::{self, Category};
use crate::validate::Params;
use serde_json::json;

// =============================================================================
// TigerStyle Constants
// =============================================================================

pub const PARAMS_FILE: &str = "signing_params.txt";
pub const PUBLIC_KEY_FILE: &str = "signing_public_key.txt";
pub const PRIVATE_KEY_FILE: &str = "signing_private_key.txt";
pub const SIGNATURE_FILE: &str = "message_signature.txt";
pub const VERIFICATION_FILE: &str = "verification_result.json";
pub const BATCH_SIGNATURES_FILE: &str = "batch_signatures.json";
pub const BATCH_VERIFICATION_FILE: &str = "batch_verification.json";

const KEYGEN_DELAY_MS: u64 = 3000;
const SIGN_DELAY_MS: u64 = 1500;
const VERIFY_DELAY_MS: u64 = 1000;
const BATCH_SIGN_DELAY_PER_MESSAGE_MS: u64 = 500;
const BATCH_VERIFY_DELAY_PER_SIGNATURE_MS: u64 = 200;

const MISSING_PRIVATE_KEY: &str = "未找到签名私钥文件，请先生成签名密钥";
const MISSING_PUBLIC_KEY: &str = "未找到签名公钥文件，请先生成签名密钥";

// =============================================================================
// Keys
// =============================================================================

pub async fn keygen(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["dimension", "modulus", "gaussianParameter"])?;
    let gaussian_parameter = params.float("gaussianParameter")?;
    if gaussian_parameter <= 0.0 {
        return Err(ApiError::invalid("gaussianParameter", "必须大于0"));
    }
    let signing = SigningParams {
        dimension: as_count(params.int_in("dimension", 256..=4096)?),
        modulus: params.int_in("modulus", 2..=i64::MAX)? as u64,
        gaussian_parameter,
        security_level: params.int_opt("securityLevel")?.unwrap_or(SECURITY_LEVEL_DEFAULT),
    };

    ctx.delay(KEYGEN_DELAY_MS).await;

    let now = Context::now_ms();
    let job = signing.clone();
    let (public_key_text, private_key_text, key_preview, metrics) = ctx
        .fabricate_blocking(move |rng| {
            let pair = signature::generate_signing_keys(rng, &job);
            let metrics = signature::signature_metrics(rng, &job);
            (pair.public_key_text(now), pair.private_key_text(now), pair.preview(), metrics)
        })
        .await?;

    let input_file = ctx.path(Category::Signature, PARAMS_FILE);
    let public_key_file = ctx.path(Category::Signature, PUBLIC_KEY_FILE);
    let private_key_file = ctx.path(Category::Signature, PRIVATE_KEY_FILE);
    store::write_text(ctx.store(), &public_key_file, public_key_text).await?;
    store::write_text(ctx.store(), &private_key_file, private_key_text).await?;
    store::write_text(ctx.store(), &input_file, signing.to_file_text(now)).await?;

    Outcome::new(
        "签名密钥生成完成",
        &json!({
            "inputFile": shown(&input_file),
            "publicKeyFile": shown(&public_key_file),
            "privateKeyFile": shown(&private_key_file),
            "keyPair": key_preview,
            "signatureMetrics": metrics,
        }),
    )
}

/// Signature length follows the stored key; a key without a readable
/// dimension signs at the fallback size.
async fn signing_dimension(ctx: &Context) -> ApiResult<usize> {
    let private_key_file = ctx.path(Category::Signature, PRIVATE_KEY_FILE);
    let private_key = store::read_dependency(ctx.store(), &private_key_file, MISSING_PRIVATE_KEY).await?;
    Ok(signature::key_dimension(&private_key).unwrap_or(SIGNATURE_DIMENSION_FALLBACK))
}

// =============================================================================
// Single messages
// =============================================================================

pub async fn sign(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["message"])?;
    let message = params.text("message")?;
    let hash_algorithm = params.text_or("hashAlgorithm", HASH_ALGORITHM_DEFAULT)?;
    let dimension = signing_dimension(ctx).await?;

    ctx.delay(SIGN_DELAY_MS).await;

    let signed = ctx.with_rng(|rng| signature::sign(rng, &message, dimension));

    let signature_file = ctx.path(Category::Signature, SIGNATURE_FILE);
    store::write_text(
        ctx.store(),
        &signature_file,
        signed.to_file_text(&message, &hash_algorithm, Context::now_ms()),
    )
    .await?;

    Outcome::new(
        "消息签名完成",
        &json!({
            "signatureFile": shown(&signature_file),
            "signature": signed.summary(),
        }),
    )
}

pub async fn verify(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    let expected = params.text_opt("expectedMessage")?;

    let signature_file = ctx.path(Category::Signature, SIGNATURE_FILE);
    let public_key_file = ctx.path(Category::Signature, PUBLIC_KEY_FILE);
    let signature_text =
        store::read_dependency(ctx.store(), &signature_file, "未找到签名文件，请先进行签名").await?;
    let public_key = store::read_dependency(ctx.store(), &public_key_file, MISSING_PUBLIC_KEY).await?;

    ctx.delay(VERIFY_DELAY_MS).await;

    let verification = ctx.with_rng(|rng| {
        signature::verify(
            rng,
            &signature_text,
            &public_key,
            expected.as_deref(),
            Context::now_ms(),
        )
    });

    let verification_file = ctx.path(Category::Signature, VERIFICATION_FILE);
    store::write_json(ctx.store(), &verification_file, &verification).await?;

    tracing::info!(valid = verification.is_valid, "signature checked");

    Outcome::new(
        "签名验证完成",
        &json!({
            "verificationFile": shown(&verification_file),
            "results": verification,
        }),
    )
}

// =============================================================================
// Batches
// =============================================================================

pub async fn batch_sign(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["messages"])?;
    let messages = params.string_list("messages")?;
    let hash_algorithm = params.text_or("hashAlgorithm", HASH_ALGORITHM_DEFAULT)?;
    let dimension = signing_dimension(ctx).await?;

    ctx.delay(BATCH_SIGN_DELAY_PER_MESSAGE_MS * messages.len() as u64).await;

    let batch = ctx.with_rng(|rng| {
        signature::sign_batch(rng, &messages, dimension, &hash_algorithm, Context::now_ms())
    });

    let batch_file = ctx.path(Category::Signature, BATCH_SIGNATURES_FILE);
    store::write_json(ctx.store(), &batch_file, &batch).await?;

    Outcome::new(
        format!("批量签名完成，共{}条消息", batch.total_messages),
        &json!({
            "batchFile": shown(&batch_file),
            "results": batch.summary(),
        }),
    )
}

pub async fn batch_verify(ctx: &Context, _params: Params) -> ApiResult<Outcome> {
    let batch_file = ctx.path(Category::Signature, BATCH_SIGNATURES_FILE);
    if !ctx.store().exists(&batch_file).await {
        return Err(ApiError::DependencyMissing(
            "未找到批量签名文件，请先进行批量签名".to_string(),
        ));
    }
    let batch: BatchSignatures = store::read_json(ctx.store(), &batch_file).await?;
    let public_key_file = ctx.path(Category::Signature, PUBLIC_KEY_FILE);
    store::read_dependency(ctx.store(), &public_key_file, MISSING_PUBLIC_KEY).await?;

    ctx.delay(BATCH_VERIFY_DELAY_PER_SIGNATURE_MS * batch.signatures.len() as u64).await;

    let verification = ctx.with_rng(|rng| signature::verify_batch(rng, &batch, Context::now_ms()));

    let verification_file = ctx.path(Category::Signature, BATCH_VERIFICATION_FILE);
    store::write_json(ctx.store(), &verification_file, &verification).await?;

    Outcome::new(
        format!(
            "批量验证完成，{}/{}个签名有效",
            verification.valid_signatures, verification.total_signatures
        ),
        &json!({
            "verificationFile": shown(&verification_file),
            "results": verification,
        }),
    )
}
