//! LPN, SDES and SM4 operations
//!
//! All three share the `quantum` directory. LPN generation and the SDES
//! attack both write `output.txt`; the later write wins.

use super::shown;
use crate::error::{ApiError, ApiResult};
use crate::fabricate::cipher::{
    self, check_block_size, SdesBitsKind, SdesPairs, Sm4Pair, SDES_KEY_BITS, SDES_PLAINTEXT_BITS,
};
use crate::fabricate::lpn::{self, LpnInstance, LpnSolution};
use crate::fabricate::preview;
use crate::pipeline::{Context, Outcome};
use crate::store::{self, Category};
use crate::validate::{check_bits, Params};
use serde_json::json;

// =============================================================================
// TigerStyle Constants
// =============================================================================

pub const LPN_INPUT_FILE: &str = "input_gen.txt";
pub const LPN_OUTPUT_FILE: &str = "output.txt";

pub const SDES_INPUT_FILE: &str = "input.txt";
pub const SDES_ENCRYPT_OUTPUT_FILE: &str = "output_1.txt";
pub const SDES_ATTACK_OUTPUT_FILE: &str = "output.txt";
pub const SDES_COMPARISON_INPUT_FILE: &str = "input_2.txt";
pub const SDES_COMPARISON_OUTPUT_FILE: &str = "output_2.txt";

/// Upper bound on comparison experiments
pub const EXPERIMENT_COUNT_MAX: i64 = 100_000;

const LPN_GENERATE_DELAY_MS: u64 = 2000;
const LPN_SOLVE_DELAY_MS: u64 = 3000;
const SDES_ENCRYPT_DELAY_MS: u64 = 1500;
const SDES_ATTACK_DELAY_MS: u64 = 3500;
const SDES_COMPARISON_DELAY_MS: u64 = 2000;
const SM4_ENCRYPT_DELAY_MS: u64 = 1000;
const SM4_ATTACK_DELAY_MS: u64 = 4000;

pub fn sm4_input_file(block_size: usize) -> String {
    format!("input_encrypt_{block_size}.txt")
}

pub fn sm4_output_file(block_size: usize) -> String {
    format!("output_{block_size}.txt")
}

pub fn sm4_attack_file(block_size: usize) -> String {
    format!("attack_result_{block_size}.txt")
}

/// Which name the SDES endpoints answer under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherLabel {
    Sdes,
    /// Legacy DES routes, same behavior
    Des,
}

impl CipherLabel {
    fn name(&self) -> &'static str {
        match self {
            Self::Sdes => "SDES",
            Self::Des => "DES",
        }
    }
}

// =============================================================================
// LPN
// =============================================================================

pub async fn lpn_generate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["paramCount", "equationCount", "errorRate", "initialParams"])?;
    let instance = LpnInstance {
        param_count: params.int_in("paramCount", 1..=i64::MAX)? as u64,
        equation_count: params.int_in("equationCount", 1..=i64::MAX)? as u64,
        error_rate: params.float_in("errorRate", 0.0..=1.0)?,
        initial_params: params.text("initialParams")?,
    };

    ctx.delay(LPN_GENERATE_DELAY_MS).await;

    let solution = ctx.with_rng(|rng| lpn::solve(rng, instance.param_count));

    let input_file = ctx.path(Category::Quantum, LPN_INPUT_FILE);
    let output_file = ctx.path(Category::Quantum, LPN_OUTPUT_FILE);
    store::write_text(ctx.store(), &output_file, solution.to_file_text()).await?;
    store::write_text(ctx.store(), &input_file, instance.to_file_text()).await?;

    Outcome::new(
        "LPN问题生成完成",
        &json!({
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
            "solution": solution.solution,
            "probability": format!("{:.4}", solution.probability),
            "executionTime": format!("{:.2}s", solution.execution_time),
            "solutionPreview": preview(&solution.solution, 100),
        }),
    )
}

pub async fn lpn_solve(ctx: &Context, _params: Params) -> ApiResult<Outcome> {
    let output_file = ctx.path(Category::Quantum, LPN_OUTPUT_FILE);
    let text = store::read_dependency(ctx.store(), &output_file, "未找到LPN问题生成结果文件").await?;
    let solution = LpnSolution::parse(&output_file, &text)?;

    ctx.delay(LPN_SOLVE_DELAY_MS).await;

    Outcome::new(
        "LPN问题求解完成",
        &json!({
            "outputFile": shown(&output_file),
            "solution": solution.solution,
            "probability": solution.probability,
            "executionTime": format!("{}s", solution.execution_time),
            "solutionPreview": solution.solution,
        }),
    )
}

// =============================================================================
// SDES
// =============================================================================

pub async fn sdes_encrypt(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    encrypt_pairs(ctx, params, CipherLabel::Sdes).await
}

pub async fn des_encrypt(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    encrypt_pairs(ctx, params, CipherLabel::Des).await
}

pub async fn sdes_attack(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    attack_pairs(ctx, params, CipherLabel::Sdes).await
}

pub async fn des_attack(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    attack_pairs(ctx, params, CipherLabel::Des).await
}

async fn encrypt_pairs(ctx: &Context, params: Params, label: CipherLabel) -> ApiResult<Outcome> {
    params.require(&["plaintext1", "plaintext2", "key"])?;
    let plaintext1 = params.bits("plaintext1", SDES_PLAINTEXT_BITS)?;
    let plaintext2 = params.bits("plaintext2", SDES_PLAINTEXT_BITS)?;
    let key = params.bits("key", SDES_KEY_BITS)?;

    ctx.delay(SDES_ENCRYPT_DELAY_MS).await;

    let pairs = cipher::sdes_encrypt(&plaintext1, &plaintext2, &key);

    let input_file = ctx.path(Category::Quantum, SDES_INPUT_FILE);
    let output_file = ctx.path(Category::Quantum, SDES_ENCRYPT_OUTPUT_FILE);
    store::write_text(ctx.store(), &output_file, pairs.to_file_text()).await?;
    store::write_text(
        ctx.store(),
        &input_file,
        format!("{plaintext1}\n{plaintext2}\n{key}"),
    )
    .await?;

    Outcome::new(
        format!("{}加密完成", label.name()),
        &json!({
            "plaintext1": pairs.plaintext1,
            "plaintext2": pairs.plaintext2,
            "ciphertext1": pairs.ciphertext1,
            "ciphertext2": pairs.ciphertext2,
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
        }),
    )
}

async fn attack_pairs(ctx: &Context, _params: Params, label: CipherLabel) -> ApiResult<Outcome> {
    let encrypted_file = ctx.path(Category::Quantum, SDES_ENCRYPT_OUTPUT_FILE);
    let text = store::read_dependency(
        ctx.store(),
        &encrypted_file,
        &format!("未找到{}加密结果文件", label.name()),
    )
    .await?;
    let pairs = SdesPairs::parse(&encrypted_file, &text)?;

    ctx.delay(SDES_ATTACK_DELAY_MS).await;

    let rate = ctx.config().attack_success_rate;
    let result = ctx.with_rng(|rng| cipher::sdes_attack(rng, &pairs, rate));

    let output_file = ctx.path(Category::Quantum, SDES_ATTACK_OUTPUT_FILE);
    store::write_text(ctx.store(), &output_file, result.to_file_text()).await?;

    let success = result.outcome.is_success();
    tracing::info!(success, "attack finished");
    let message = if success {
        format!("{}攻击成功", label.name())
    } else {
        format!("{}攻击失败", label.name())
    };

    Outcome::new(
        message,
        &json!({
            "plaintext1": pairs.plaintext1,
            "plaintext2": pairs.plaintext2,
            "ciphertext1": pairs.ciphertext1,
            "ciphertext2": pairs.ciphertext2,
            "recoveredKey": result.recovered_key,
            "probability": format!("{:.4}", result.probability),
            "averageCalls": result.average_calls,
            "attackSuccess": success,
            "outputFile": shown(&output_file),
        }),
    )
}

pub async fn sdes_comparison(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["experimentCount"])?;
    let count = params.int_in("experimentCount", 1..=EXPERIMENT_COUNT_MAX)?;

    ctx.delay(SDES_COMPARISON_DELAY_MS + count as u64 * 10).await;

    let comparison = ctx.with_rng(|rng| cipher::sdes_compare(rng));

    let input_file = ctx.path(Category::Quantum, SDES_COMPARISON_INPUT_FILE);
    let output_file = ctx.path(Category::Quantum, SDES_COMPARISON_OUTPUT_FILE);
    store::write_text(ctx.store(), &output_file, comparison.to_file_text()).await?;
    store::write_text(ctx.store(), &input_file, count.to_string()).await?;

    Outcome::new(
        "SDES方案对比完成",
        &json!({
            "experimentCount": count,
            "scheme1Probability": format!("{:.4}", comparison.scheme1_probability),
            "scheme2Probability": format!("{:.4}", comparison.scheme2_probability),
            "scheme3Probability": format!("{:.4}", comparison.scheme3_probability),
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
        }),
    )
}

pub async fn sdes_generate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["type"])?;
    let kind = SdesBitsKind::from_param(&params.text("type")?);

    let bits = ctx.with_rng(|rng| cipher::sdes_random(rng, kind));

    Outcome::new(
        format!("随机生成{}位{}", bits.length, kind.display_name()),
        &bits,
    )
}

// =============================================================================
// SM4
// =============================================================================

pub async fn sm4_encrypt(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["plaintext", "key", "blockSize"])?;
    let block_size = check_block_size(params.int("blockSize")?)?;
    let plaintext = params.text("plaintext")?;
    let key = params.text("key")?;
    for (field, value) in [("plaintext", &plaintext), ("key", &key)] {
        check_bits(field, value, None)?;
        if value.len() != block_size {
            return Err(ApiError::invalid(
                field,
                format!("明文和密钥长度必须都为{block_size}位"),
            ));
        }
    }

    ctx.delay(SM4_ENCRYPT_DELAY_MS).await;

    let pair = cipher::sm4_encrypt(&plaintext, &key, block_size);

    let input_file = ctx.path(Category::Quantum, &sm4_input_file(block_size));
    let output_file = ctx.path(Category::Quantum, &sm4_output_file(block_size));
    store::write_text(ctx.store(), &output_file, pair.to_file_text()).await?;
    store::write_text(ctx.store(), &input_file, format!("{plaintext}\n{key}")).await?;

    Outcome::new(
        format!("SM4加密完成，分组长度: {block_size}"),
        &json!({
            "plaintext": pair.plaintext,
            "ciphertext": pair.ciphertext,
            "blockSize": block_size,
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
        }),
    )
}

pub async fn sm4_attack(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["blockSize"])?;
    let block_size = check_block_size(params.int("blockSize")?)?;

    let encrypted_file = ctx.path(Category::Quantum, &sm4_output_file(block_size));
    let text = store::read_dependency(ctx.store(), &encrypted_file, "未找到SM4加密结果文件").await?;
    let pair = Sm4Pair::parse(&encrypted_file, &text, block_size)?;

    ctx.delay(SM4_ATTACK_DELAY_MS).await;

    let rate = ctx.config().attack_success_rate;
    let result = ctx.with_rng(|rng| cipher::sm4_attack(rng, &pair, rate));

    let output_file = ctx.path(Category::Quantum, &sm4_attack_file(block_size));
    store::write_text(ctx.store(), &output_file, result.to_file_text()).await?;

    let success = result.outcome.is_success();
    tracing::info!(success, block_size, "attack finished");
    let message = if success {
        format!("SM4攻击成功，分组长度: {block_size}")
    } else {
        "SM4攻击失败".to_string()
    };

    Outcome::new(
        message,
        &json!({
            "success": success,
            "plaintext": pair.plaintext,
            "ciphertext": pair.ciphertext,
            "secretKey": result.recovered_key,
            "probability": result.probability,
            "averageCalls": result.average_calls,
            "blockSize": block_size,
            "outputFile": shown(&output_file),
        }),
    )
}

pub async fn sm4_generate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["blockSize"])?;
    let block_size = check_block_size(params.int("blockSize")?)?;

    let bits = ctx.with_rng(|rng| cipher::sm4_random(rng, block_size));

    Outcome::new(
        format!("随机生成{block_size}位01比特串"),
        &json!({
            "randomBits": bits.random_bits,
            "blockSize": block_size,
        }),
    )
}
