//! End-to-end tests through the router against a real data directory

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use latticelab::config::Config;
use latticelab::http::{router, Envelope};
use latticelab::pipeline::Context;
use latticelab::store::{Category, FsStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    dir: TempDir,
    app: Router,
}

impl Harness {
    async fn new(config: impl FnOnce(Config) -> Config) -> Self {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

        let dir = tempfile::tempdir().unwrap();
        let config = config(Config::for_tests(dir.path()));
        let store = FsStore::new();
        store.ensure_dirs(&config.paths()).await.unwrap();
        let app = router(Arc::new(Context::new(config, Arc::new(store))));
        Self { dir, app }
    }

    async fn plain() -> Self {
        Self::new(|c| c).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Envelope) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Envelope) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Envelope) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn file(&self, category: Category, name: &str) -> std::path::PathBuf {
        self.dir.path().join(category.dir_name()).join(name)
    }

    fn files_in(&self, category: Category) -> usize {
        std::fs::read_dir(self.dir.path().join(category.dir_name()))
            .unwrap()
            .count()
    }
}

fn data(envelope: &Envelope) -> &Value {
    envelope.data.as_ref().unwrap()
}

fn sdes_body() -> Value {
    json!({"plaintext1": "10101010", "plaintext2": "01010101", "key": "1100110011"})
}

#[tokio::test]
async fn test_sdes_encrypt_then_attack() {
    let h = Harness::new(|c| Config {
        attack_success_rate: 1.0,
        ..c
    })
    .await;

    let (status, enc) = h.post("/api/quantum/sdes/encrypt", sdes_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(enc.success);
    assert_eq!(data(&enc)["ciphertext1"], "01100110");
    assert_eq!(data(&enc)["ciphertext2"], "10011001");

    let on_disk = std::fs::read_to_string(h.file(Category::Quantum, "output_1.txt")).unwrap();
    assert!(on_disk.starts_with("10101010\n01010101\n01100110\n10011001"));

    let (status, attack) = h.post("/api/quantum/sdes/attack", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&attack)["recoveredKey"], "1100110000");
    assert_eq!(data(&attack)["attackSuccess"], true);
}

#[tokio::test]
async fn test_attack_gate_closed() {
    let h = Harness::new(|c| Config {
        attack_success_rate: 0.0,
        ..c
    })
    .await;

    h.post("/api/quantum/sdes/encrypt", sdes_body()).await;
    let (status, attack) = h.post("/api/quantum/sdes/attack", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&attack)["attackSuccess"], false);
    assert_eq!(data(&attack)["recoveredKey"], "0000000000");
}

#[tokio::test]
async fn test_attack_without_encrypt() {
    let h = Harness::plain().await;

    let (status, envelope) = h.post("/api/quantum/sdes/attack", json!({})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!envelope.success);
    assert!(envelope.error.unwrap().contains("SDES"));
}

#[tokio::test]
async fn test_rejected_request_writes_nothing() {
    let h = Harness::plain().await;

    let (status, envelope) = h
        .post("/api/quantum/sdes/encrypt", json!({"plaintext1": "10101010"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(envelope.error.unwrap().contains("plaintext2"));
    assert_eq!(h.files_in(Category::Quantum), 0);
}

#[tokio::test]
async fn test_lll_returns_square_matrix() {
    let h = Harness::plain().await;
    let body = json!({"dimension": 4, "latticeMatrix": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]});

    let (status, envelope) = h.post("/api/shortbasis/lll/reduce", body).await;

    assert_eq!(status, StatusCode::OK);
    let reduced = data(&envelope)["results"]["reducedMatrix"].as_str().unwrap();
    let rows: Vec<&str> = reduced.split(';').filter(|r| !r.is_empty()).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.split(',').count() == 4));
    assert!(h.file(Category::ShortBasis, "lll_output.txt").exists());
}

#[tokio::test]
async fn test_json_results_read_back() {
    let h = Harness::plain().await;

    let (_, evaluation) = h
        .post(
            "/api/shortbasis/quality/evaluate",
            json!({"dimension": 16, "latticeMatrix": "1,0;0,1;", "algorithm": "bkz"}),
        )
        .await;

    let stored = std::fs::read_to_string(h.file(Category::ShortBasis, "quality_evaluation.json")).unwrap();
    let stored: Value = serde_json::from_str(&stored).unwrap();
    let results = &data(&evaluation)["results"];
    for field in ["algorithm", "dimension", "recommendations", "timestamp"] {
        assert_eq!(stored[field], results[field], "{field}");
    }
    assert_eq!(stored["metrics"]["basisLength"], results["metrics"]["basisLength"]);
}

#[tokio::test]
async fn test_file_endpoint() {
    let h = Harness::plain().await;
    h.post("/api/quantum/sdes/encrypt", sdes_body()).await;

    let (status, envelope) = h.get("/api/quantum/files/sdes/output_1.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert!(data(&envelope)["content"].as_str().unwrap().contains("01100110"));

    let (status, _) = h.get("/api/files/keygen/lwe_public_key.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h.get("/api/files/quantum/..").await;
    assert_ne!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_same_seed_same_results() {
    let body = json!({"n": 512, "q": 12289, "norm": 3.5});

    let a = Harness::plain().await;
    let b = Harness::plain().await;
    let (_, first) = a.post("/api/analysis/pblpke/evaluate", body.clone()).await;
    let (_, second) = b.post("/api/analysis/pblpke/evaluate", body).await;

    assert_eq!(data(&first)["results"], data(&second)["results"]);
}

#[tokio::test]
async fn test_signature_flow() {
    let h = Harness::plain().await;

    let (status, _) = h
        .post(
            "/api/signature/keygen",
            json!({"dimension": 256, "modulus": 12289, "gaussianParameter": 3.2}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    h.post("/api/signature/sign", json!({"message": "hello lattice"})).await;
    let (status, verified) = h
        .post("/api/signature/verify", json!({"expectedMessage": "hello lattice"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&verified)["results"]["hashMatch"], true);
    assert_eq!(data(&verified)["results"]["signatureFormat"], true);
    assert!(h.file(Category::Signature, "verification_result.json").exists());
}

#[tokio::test]
async fn test_health_routes() {
    let h = Harness::plain().await;

    for uri in ["/api/health", "/api/quantum/health"] {
        let (status, envelope) = h.get(uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(envelope.success);
        assert!(data(&envelope)["version"].is_string());
    }
}
