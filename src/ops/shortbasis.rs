//! LLL / BKZ reduction, basis quality and lattice generation

use super::{as_count, shown};
use crate::error::{ApiError, ApiResult};
use crate::fabricate::lattice::{
    self, BkzParams, LllParams, MatrixDistribution, MatrixRequest, QualityAlgorithm,
    BKZ_BLOCK_SIZE_DEFAULT, BKZ_TOURS_DEFAULT, LLL_DELTA_DEFAULT, PRECISION_DEFAULT,
};
use crate::pipeline::{Context, Outcome};
use crate::store::{self, Category};
use crate::validate::Params;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::ops::RangeInclusive;

pub const LLL_INPUT_FILE: &str = "lll_input.txt";
pub const LLL_OUTPUT_FILE: &str = "lll_output.txt";
pub const BKZ_INPUT_FILE: &str = "bkz_input.txt";
pub const BKZ_OUTPUT_FILE: &str = "bkz_output.txt";
pub const QUALITY_FILE: &str = "quality_evaluation.json";
pub const MATRIX_FILE: &str = "generated_matrix.txt";

/// Dimensions accepted by reduction and quality evaluation
pub const REDUCTION_DIMENSION: RangeInclusive<i64> = 2..=1000;

/// Dimensions accepted by lattice generation
pub const GENERATION_DIMENSION: RangeInclusive<i64> = 2..=500;

const LLL_DELAY_MS: u64 = 2000;
const BKZ_DELAY_MS: u64 = 3000;
const QUALITY_DELAY_MS: u64 = 1000;
const MATRIX_DELAY_MS: u64 = 500;

pub async fn lll_reduce(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["dimension", "latticeMatrix"])?;
    let lll = LllParams {
        dimension: as_count(params.int_in("dimension", REDUCTION_DIMENSION)?),
        lattice_matrix: params.rendered("latticeMatrix")?,
        delta: params.float_in_or("delta", 0.25..=1.0, LLL_DELTA_DEFAULT)?,
        precision: params.float_in_or("precision", 0.0..=1.0, PRECISION_DEFAULT)?,
    };

    ctx.delay(LLL_DELAY_MS + lll.dimension as u64 * 10).await;

    let reduction = ctx.with_rng(|rng| lattice::lll_reduce(rng, &lll));

    let now = Context::now_ms();
    let input_file = ctx.path(Category::ShortBasis, LLL_INPUT_FILE);
    let output_file = ctx.path(Category::ShortBasis, LLL_OUTPUT_FILE);
    store::write_text(ctx.store(), &output_file, reduction.to_file_text(lll.dimension, now)).await?;
    store::write_text(ctx.store(), &input_file, lll.to_file_text(now)).await?;

    Outcome::new(
        "LLL格基约化完成",
        &json!({
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
            "results": reduction,
        }),
    )
}

pub async fn bkz_reduce(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["dimension", "latticeMatrix"])?;
    let dimension = params.int_in("dimension", REDUCTION_DIMENSION)?;
    let bkz = BkzParams {
        dimension: as_count(dimension),
        lattice_matrix: params.rendered("latticeMatrix")?,
        block_size: as_count(bkz_block_size(&params, dimension)?),
        tours: params.int_in_or("tours", 1..=50, BKZ_TOURS_DEFAULT)? as u64,
        precision: params.float_in_or("precision", 0.0..=1.0, PRECISION_DEFAULT)?,
    };

    ctx.delay(BKZ_DELAY_MS + (bkz.dimension * bkz.block_size) as u64).await;

    let reduction = ctx.with_rng(|rng| lattice::bkz_reduce(rng, &bkz));

    let now = Context::now_ms();
    let input_file = ctx.path(Category::ShortBasis, BKZ_INPUT_FILE);
    let output_file = ctx.path(Category::ShortBasis, BKZ_OUTPUT_FILE);
    store::write_text(ctx.store(), &output_file, reduction.to_file_text(&bkz, now)).await?;
    store::write_text(ctx.store(), &input_file, bkz.to_file_text(now)).await?;

    Outcome::new(
        "BKZ格基约化完成",
        &json!({
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
            "results": reduction,
        }),
    )
}

/// Block size in `[2, dimension]`. The default of 20 is checked too, so a
/// small lattice without an explicit block size is rejected.
fn bkz_block_size(params: &Params, dimension: i64) -> ApiResult<i64> {
    let block_size = params.int_opt("blockSize")?.unwrap_or(BKZ_BLOCK_SIZE_DEFAULT);
    if (2..=dimension).contains(&block_size) {
        Ok(block_size)
    } else {
        Err(ApiError::range("blockSize", 2, dimension, block_size))
    }
}

pub async fn quality_evaluate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["dimension", "latticeMatrix"])?;
    let dimension = as_count(params.int_in("dimension", REDUCTION_DIMENSION)?);
    params.rendered("latticeMatrix")?;
    let algorithm_name = params.text_or("algorithm", "auto")?;
    let algorithm = QualityAlgorithm::parse(&algorithm_name)
        .ok_or_else(|| ApiError::invalid("algorithm", "必须为 auto、lll 或 bkz"))?;

    ctx.delay(QUALITY_DELAY_MS).await;

    let evaluation =
        ctx.with_rng(|rng| lattice::evaluate_quality(rng, dimension, algorithm, Context::now_ms()));

    let evaluation_file = ctx.path(Category::ShortBasis, QUALITY_FILE);
    store::write_json(ctx.store(), &evaluation_file, &evaluation).await?;

    Outcome::new(
        "格基质量评估完成",
        &json!({
            "evaluationFile": shown(&evaluation_file),
            "results": evaluation,
        }),
    )
}

/// Generate a random basis. A `seed` makes the matrix reproducible and
/// leaves the shared RNG untouched.
pub async fn matrix_generate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["dimension"])?;
    let seed = params
        .int_opt("seed")?
        .map(|s| u64::from_ne_bytes(s.to_ne_bytes()));
    let request = MatrixRequest {
        dimension: as_count(params.int_in("dimension", GENERATION_DIMENSION)?),
        determinant: params.text_opt("determinant")?,
        distribution: MatrixDistribution::parse(&params.text_or("distributionType", "uniform")?),
        seed,
    };

    ctx.delay(MATRIX_DELAY_MS + request.dimension as u64 * 2).await;

    let generated = match request.seed {
        Some(seed) => lattice::generate_matrix(&mut ChaCha8Rng::seed_from_u64(seed), &request),
        None => ctx.with_rng(|rng| lattice::generate_matrix(rng, &request)),
    };

    let matrix_file = ctx.path(Category::ShortBasis, MATRIX_FILE);
    store::write_text(
        ctx.store(),
        &matrix_file,
        generated.to_file_text(&request, Context::now_ms()),
    )
    .await?;

    Outcome::new(
        "格矩阵生成完成",
        &json!({
            "matrixFile": shown(&matrix_file),
            "matrix": generated.matrix,
            "properties": generated.properties,
        }),
    )
}
