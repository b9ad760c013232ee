//! PBLPKE / PBLSign security analysis operations

use super::shown;
use crate::error::ApiResult;
use crate::fabricate::analysis::{self, Scheme, SchemeParams, SecurityMetrics};
use crate::pipeline::{Context, Outcome};
use crate::store::{self, Category};
use crate::validate::Params;
use serde_json::json;

const PBLPKE_DELAY_MS: u64 = 2000;
const PBLSIGN_DELAY_MS: u64 = 2500;

/// Largest accepted ring dimension
pub const DIMENSION_MAX: i64 = 10_000;

pub async fn pblpke_evaluate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    evaluate(ctx, params, Scheme::Pblpke, PBLPKE_DELAY_MS).await
}

pub async fn pblsign_evaluate(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    evaluate(ctx, params, Scheme::Pblsign, PBLSIGN_DELAY_MS).await
}

async fn evaluate(ctx: &Context, params: Params, scheme: Scheme, delay_ms: u64) -> ApiResult<Outcome> {
    params.require(&["n", "q", "norm"])?;
    let inputs = SchemeParams {
        n: params.int_in("n", 1..=DIMENSION_MAX)? as u64,
        q: params.int_in("q", 2..=i64::MAX)? as u64,
        norm: params.float_in("norm", 1.0..=f64::MAX)?,
    };

    ctx.delay(delay_ms).await;

    let metrics = ctx.with_rng(|rng| analysis::estimate(rng, scheme, &inputs));

    let now = Context::now_ms();
    let input_file = ctx.path(Category::Analysis, scheme.input_file());
    let output_file = ctx.path(Category::Analysis, scheme.output_file());
    store::write_text(ctx.store(), &output_file, metrics.to_file_text(now)).await?;
    store::write_text(ctx.store(), &input_file, inputs.to_file_text(scheme, now)).await?;

    Outcome::new(
        format!("{scheme}安全性评估完成"),
        &json!({
            "inputFile": shown(&input_file),
            "outputFile": shown(&output_file),
            "results": metrics,
        }),
    )
}

/// Summarise the stored estimate of one scheme.
pub async fn report(ctx: &Context, params: Params) -> ApiResult<Outcome> {
    params.require(&["algorithm"])?;
    let scheme = Scheme::parse(&params.text("algorithm")?)?;

    let output_file = ctx.path(Category::Analysis, scheme.output_file());
    let text = store::read_dependency(
        ctx.store(),
        &output_file,
        &format!("未找到{scheme}评估结果文件"),
    )
    .await?;
    let metrics = SecurityMetrics::parse(&output_file, &text)?;

    let report = analysis::report(scheme, metrics, Context::now_ms());

    let report_file = ctx.path(Category::Analysis, &scheme.report_file());
    store::write_json(ctx.store(), &report_file, &report).await?;

    Outcome::new(
        format!("{scheme}分析报告生成完成"),
        &json!({
            "reportFile": shown(&report_file),
            "report": report,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ApiError;
    use crate::fabricate::analysis::SecurityReport;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn setup() -> (Context, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Context::new(Config::for_tests("/data"), store.clone()), store)
    }

    #[tokio::test]
    async fn test_evaluate_then_report() {
        let (ctx, files) = setup();
        let body = json!({"n": 512, "q": 12289, "norm": 3.5});

        let eval = pblsign_evaluate(&ctx, Params::from_value(body).unwrap()).await.unwrap();
        assert!(eval.data["results"]["hl"].is_u64());

        let report = report(&ctx, Params::from_value(json!({"algorithm": "PBLSign"})).unwrap())
            .await
            .unwrap();
        assert_eq!(report.data["report"]["algorithm"], "PBLSign");

        let path = ctx.path(Category::Analysis, "pblsign_report.json");
        let stored: SecurityReport = store::read_json(files.as_ref(), &path).await.unwrap();
        assert_eq!(stored.detailed_results.beta, eval.data["results"]["beta"].as_u64().unwrap());
    }

    #[tokio::test]
    async fn test_report_needs_prior_evaluation() {
        let (ctx, _) = setup();

        let err = report(&ctx, Params::from_value(json!({"algorithm": "PBLPKE"})).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::DependencyMissing(_)));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_small_modulus() {
        let (ctx, store) = setup();

        let err = pblpke_evaluate(&ctx, Params::from_value(json!({"n": 512, "q": 1, "norm": 1})).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Range { .. }));
        assert!(store.writes().await.is_empty());
    }
}
