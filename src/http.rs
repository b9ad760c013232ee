//! HTTP Transport
//!
//! TigerStyle: Thin axum layer over the operation pipeline.
//!
//! Every POST handler decodes the body into [`Params`], runs one operation
//! inside [`pipeline::run`], and wraps the outcome in the uniform
//! [`Envelope`]. Errors convert through `ApiError: IntoResponse`.

use crate::error::{ApiError, ApiResult};
use crate::ops::{analysis, files, keygen, quantum, shortbasis, signature};
use crate::pipeline::{self, AppState, Outcome};
use crate::validate::Params;
use crate::APP_VERSION;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Health check message
pub const HEALTH_MESSAGE: &str = "LatticeCrypto后端服务运行正常";

/// Fallback error for unknown routes
pub const NOT_FOUND_MESSAGE: &str = "接口不存在";

// =============================================================================
// Envelope
// =============================================================================

/// Uniform response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(outcome: Outcome) -> Self {
        Self {
            success: true,
            message: Some(outcome.message),
            data: Some(outcome.data),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/quantum/health", get(health))
        // LPN / SDES / SM4
        .route("/api/quantum/lpn/generate", post(lpn_generate))
        .route("/api/quantum/lpn/solve", post(lpn_solve))
        .route("/api/quantum/sdes/encrypt", post(sdes_encrypt))
        .route("/api/quantum/des/encrypt", post(des_encrypt))
        .route("/api/quantum/sdes/attack", post(sdes_attack))
        .route("/api/quantum/des/attack", post(des_attack))
        .route("/api/quantum/sdes/comparison", post(sdes_comparison))
        .route("/api/quantum/sdes/generate", post(sdes_generate))
        .route("/api/quantum/sm4/encrypt", post(sm4_encrypt))
        .route("/api/quantum/sm4/attack", post(sm4_attack))
        .route("/api/quantum/sm4/generate", post(sm4_generate))
        // Security analysis
        .route("/api/analysis/pblpke/evaluate", post(pblpke_evaluate))
        .route("/api/analysis/pblsign/evaluate", post(pblsign_evaluate))
        .route("/api/analysis/report", post(analysis_report))
        // Key generation
        .route("/api/keygen/lwe/generate", post(lwe_generate))
        .route("/api/keygen/validate", post(key_validate))
        // Short basis
        .route("/api/shortbasis/lll/reduce", post(lll_reduce))
        .route("/api/shortbasis/bkz/reduce", post(bkz_reduce))
        .route("/api/shortbasis/quality/evaluate", post(quality_evaluate))
        .route("/api/shortbasis/matrix/generate", post(matrix_generate))
        // Signatures
        .route("/api/signature/keygen", post(signature_keygen))
        .route("/api/signature/sign", post(signature_sign))
        .route("/api/signature/verify", post(signature_verify))
        .route("/api/signature/batch-sign", post(signature_batch_sign))
        .route("/api/signature/batch-verify", post(signature_batch_verify))
        // Stored files
        .route("/api/files/:category/:filename", get(read_file))
        .route("/api/quantum/files/:category/:filename", get(read_file))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Decode a request body. An empty body is an empty object.
fn parse_body(body: &Bytes) -> ApiResult<Params> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Params::default());
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid("body", format!("JSON解析失败: {e}")))?;
    Params::from_value(value)
}

async fn respond<F>(operation: &'static str, fut: F) -> Result<Json<Envelope>, ApiError>
where
    F: std::future::Future<Output = ApiResult<Outcome>>,
{
    let outcome = pipeline::run(operation, fut).await?;
    Ok(Json(Envelope::success(outcome)))
}

macro_rules! op_handler {
    ($handler:ident, $op:path) => {
        async fn $handler(
            State(ctx): State<AppState>,
            body: Bytes,
        ) -> Result<Json<Envelope>, ApiError> {
            let params = parse_body(&body)?;
            respond(stringify!($handler), $op(&ctx, params)).await
        }
    };
}

op_handler!(lpn_generate, quantum::lpn_generate);
op_handler!(lpn_solve, quantum::lpn_solve);
op_handler!(sdes_encrypt, quantum::sdes_encrypt);
op_handler!(des_encrypt, quantum::des_encrypt);
op_handler!(sdes_attack, quantum::sdes_attack);
op_handler!(des_attack, quantum::des_attack);
op_handler!(sdes_comparison, quantum::sdes_comparison);
op_handler!(sdes_generate, quantum::sdes_generate);
op_handler!(sm4_encrypt, quantum::sm4_encrypt);
op_handler!(sm4_attack, quantum::sm4_attack);
op_handler!(sm4_generate, quantum::sm4_generate);

op_handler!(pblpke_evaluate, analysis::pblpke_evaluate);
op_handler!(pblsign_evaluate, analysis::pblsign_evaluate);
op_handler!(analysis_report, analysis::report);

op_handler!(lwe_generate, keygen::generate);
op_handler!(key_validate, keygen::validate);

op_handler!(lll_reduce, shortbasis::lll_reduce);
op_handler!(bkz_reduce, shortbasis::bkz_reduce);
op_handler!(quality_evaluate, shortbasis::quality_evaluate);
op_handler!(matrix_generate, shortbasis::matrix_generate);

op_handler!(signature_keygen, signature::keygen);
op_handler!(signature_sign, signature::sign);
op_handler!(signature_verify, signature::verify);
op_handler!(signature_batch_sign, signature::batch_sign);
op_handler!(signature_batch_verify, signature::batch_verify);

async fn read_file(
    State(ctx): State<AppState>,
    Path((category, filename)): Path<(String, String)>,
) -> Result<Json<Envelope>, ApiError> {
    respond("read_file", files::read(&ctx, &category, &filename)).await
}

async fn health() -> Json<Envelope> {
    Json(Envelope {
        success: true,
        message: Some(HEALTH_MESSAGE.to_string()),
        data: Some(json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": APP_VERSION,
        })),
        error: None,
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure(NOT_FOUND_MESSAGE.to_string())),
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::Context;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let ctx = Context::new(Config::for_tests("/data"), Arc::new(MemoryStore::new()));
        router(Arc::new(ctx))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Envelope) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/api/quantum/health").body(Body::empty()).unwrap();

        let (status, envelope) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(envelope.success);
        assert_eq!(envelope.message.as_deref(), Some(HEALTH_MESSAGE));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::get("/api/nowhere").body(Body::empty()).unwrap();

        let (status, envelope) = send(app(), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some(NOT_FOUND_MESSAGE));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, envelope) = send(app(), post_json("/api/quantum/sdes/encrypt", "{oops")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_missing_params_named() {
        let body = r#"{"plaintext1": "10101010"}"#;

        let (status, envelope) = send(app(), post_json("/api/quantum/sdes/encrypt", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = envelope.error.unwrap();
        assert!(error.contains("plaintext2"));
        assert!(error.contains("key"));
    }

    #[tokio::test]
    async fn test_empty_body_reaches_operation() {
        let request = Request::post("/api/keygen/validate").body(Body::empty()).unwrap();

        let (status, envelope) = send(app(), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(envelope.error.unwrap().contains("密钥文件不存在"));
    }

    #[test]
    fn test_envelope_omits_absent_fields() {
        let value = serde_json::to_value(Envelope::failure("x".into())).unwrap();
        assert_eq!(value, json!({"success": false, "error": "x"}));
    }
}
