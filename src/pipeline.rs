//! Operation Pipeline
//!
//! TigerStyle: Validate, load prior results, delay, fabricate, persist, respond.
//!
//! Every endpoint is one pass through these stages. Operations live in
//! [`crate::ops`]; this module holds the shared [`Context`] they run against
//! and the [`run`] wrapper that gives each pass a span and a run id.
//!
//! ```text
//! Received → Validated → (PriorResultLoaded) → Delayed → Fabricated → Persisted → Responded
//!     │           │               │
//!     └─ 400 ─────┘               └─ 404 DependencyMissing
//! ```
//!
//! Validation always completes before any file is touched or any delay
//! starts. Nothing is written until fabrication has succeeded.

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::store::{Category, FileStore, PathMapping};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

// =============================================================================
// Context
// =============================================================================

/// Shared state for every pipeline run
#[derive(Debug)]
pub struct Context {
    config: Arc<Config>,
    store: Arc<dyn FileStore>,
    paths: PathMapping,
    /// Held only for synchronous draws, never across an await
    rng: Mutex<ChaCha8Rng>,
}

/// Axum state handle
pub type AppState = Arc<Context>;

impl Context {
    pub fn new(config: Config, store: Arc<dyn FileStore>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            paths: config.paths(),
            config: Arc::new(config),
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn FileStore {
        self.store.as_ref()
    }

    pub fn paths(&self) -> &PathMapping {
        &self.paths
    }

    /// Canonical path of a result file
    pub fn path(&self, category: Category, filename: &str) -> PathBuf {
        self.paths.path(category, filename)
    }

    /// Sleep for a simulated computation, scaled by the configured factor.
    pub async fn delay(&self, millis: u64) {
        let scaled = millis as f64 * self.config.delay_scale;
        if scaled <= 0.0 {
            return;
        }
        tracing::debug!(millis = scaled as u64, "simulating work");
        tokio::time::sleep(Duration::from_secs_f64(scaled / 1000.0)).await;
    }

    /// Run a synchronous fabrication step with the shared RNG.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut guard = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Run a CPU-heavy fabrication on the blocking pool.
    ///
    /// The job gets its own RNG seeded from the shared one, so the shared lock
    /// is held for a single draw and seeded runs stay reproducible.
    pub async fn fabricate_blocking<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ChaCha8Rng) -> T + Send + 'static,
    {
        let seed: u64 = self.with_rng(|rng| rng.gen());
        tokio::task::spawn_blocking(move || f(&mut ChaCha8Rng::seed_from_u64(seed)))
            .await
            .map_err(|e| ApiError::internal(format!("fabrication task failed: {e}")))
    }

    /// Wall-clock milliseconds since the epoch
    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// A successful run: the envelope message and its `data` payload
#[derive(Debug, Clone)]
pub struct Outcome {
    pub message: String,
    pub data: Value,
}

impl Outcome {
    pub fn new<T: Serialize + ?Sized>(message: impl Into<String>, data: &T) -> ApiResult<Self> {
        let data = serde_json::to_value(data)
            .map_err(ApiError::internal)?;
        Ok(Self {
            message: message.into(),
            data,
        })
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Drive one operation inside a span carrying its name and a fresh run id.
pub async fn run<F>(operation: &'static str, fut: F) -> ApiResult<Outcome>
where
    F: Future<Output = ApiResult<Outcome>>,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("operation", op = operation, %run_id);

    async move {
        let started = Instant::now();
        tracing::debug!("received");
        let result = fut.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => tracing::info!(elapsed_ms, outcome = %outcome.message, "completed"),
            Err(e) => tracing::debug!(elapsed_ms, kind = e.kind(), "aborted"),
        }
        result
    }
    .instrument(span)
    .await
}
