//! PBLPKE / PBLSign - simulated security estimates and reports

use super::{key_value_lines, lookup, round_to, uniform};
use crate::error::{ApiError, ApiResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Scheme being estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    #[serde(rename = "PBLPKE")]
    Pblpke,
    #[serde(rename = "PBLSign")]
    Pblsign,
}

impl Scheme {
    /// Parse the `algorithm` request field
    pub fn parse(name: &str) -> ApiResult<Self> {
        match name {
            "PBLPKE" => Ok(Self::Pblpke),
            "PBLSign" => Ok(Self::Pblsign),
            other => Err(ApiError::invalid(
                "algorithm",
                format!("不支持的算法: {other}, 仅支持 PBLPKE 或 PBLSign"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pblpke => "PBLPKE",
            Self::Pblsign => "PBLSign",
        }
    }

    pub fn input_file(&self) -> &'static str {
        match self {
            Self::Pblpke => "pblpke_input.txt",
            Self::Pblsign => "pblsign_input.txt",
        }
    }

    pub fn output_file(&self) -> &'static str {
        match self {
            Self::Pblpke => "pblpke_output.txt",
            Self::Pblsign => "pblsign_output.txt",
        }
    }

    pub fn report_file(&self) -> String {
        format!("{}_report.json", self.name().to_lowercase())
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Estimator inputs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchemeParams {
    pub n: u64,
    pub q: u64,
    pub norm: f64,
}

impl SchemeParams {
    pub fn to_file_text(&self, scheme: Scheme, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", scheme.name().to_string()),
            ("n", self.n.to_string()),
            ("q", self.q.to_string()),
            ("norm", self.norm.to_string()),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

/// Attack cost estimate. `hl` and `k` only exist for PBLSign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct SecurityMetrics {
    /// Total attack cost
    pub rop: u64,
    /// Reduction cost
    pub red: u64,
    /// Search cost
    pub svP: u64,
    /// Memory
    pub mem: u64,
    /// BKZ block size
    pub beta: u64,
    /// Lattice dimension
    pub d: u64,
    /// Final BDD call dimension
    pub eta: u64,
    /// Root Hermite factor
    pub delta: f64,
    /// Guessed components
    pub zeta: u64,
    /// Guess search space
    pub S: u64,
    pub prob: f64,
    /// Repetitions
    pub U: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<u64>,
}

/// Per-scheme weights of the estimate formulas
struct Weights {
    rop: (f64, f64, f64),
    red: (f64, f64),
    svp: (f64, f64),
    mem: (f64, f64),
    beta: (f64, f64),
    d: (f64, f64),
    eta: (f64, f64),
    delta: (f64, f64),
    zeta: (f64, f64),
    s: (f64, f64),
    prob: (f64, f64),
    u: (f64, f64),
}

const PBLPKE_WEIGHTS: Weights = Weights {
    rop: (0.8, 0.2, 10.0),
    red: (0.7, 8.0),
    svp: (0.9, 12.0),
    mem: (0.5, 6.0),
    beta: (0.3, 50.0),
    d: (1.2, 100.0),
    eta: (0.8, 80.0),
    delta: (1.01, 0.02),
    zeta: (0.1, 20.0),
    s: (0.6, 8.0),
    prob: (0.5, 0.4),
    u: (10.0, 90.0),
};

const PBLSIGN_WEIGHTS: Weights = Weights {
    rop: (0.85, 0.25, 12.0),
    red: (0.75, 10.0),
    svp: (0.95, 15.0),
    mem: (0.55, 8.0),
    beta: (0.35, 60.0),
    d: (1.3, 120.0),
    eta: (0.9, 100.0),
    delta: (1.008, 0.015),
    zeta: (0.12, 25.0),
    s: (0.65, 10.0),
    prob: (0.4, 0.5),
    u: (5.0, 45.0),
};

/// Fabricate an estimate from `log2(n)` / `log2(q)` plus noise.
pub fn estimate<R: Rng + ?Sized>(rng: &mut R, scheme: Scheme, params: &SchemeParams) -> SecurityMetrics {
    let w = match scheme {
        Scheme::Pblpke => &PBLPKE_WEIGHTS,
        Scheme::Pblsign => &PBLSIGN_WEIGHTS,
    };
    let n = params.n as f64;
    let log_n = n.log2();
    let log_q = (params.q as f64).log2();

    let mut pow2 = |exp: f64, spread: f64| 2f64.powf(exp + rng.gen::<f64>() * spread).floor() as u64;
    let rop = pow2(log_n * w.rop.0 + log_q * w.rop.1, w.rop.2);
    let red = pow2(log_n * w.red.0, w.red.1);
    let svp = pow2(log_n * w.svp.0, w.svp.1);
    let mem = pow2(log_n * w.mem.0, w.mem.1);

    let mut linear = |scale: f64, spread: f64| (n * scale + rng.gen::<f64>() * spread).floor() as u64;
    let beta = linear(w.beta.0, w.beta.1);
    let d = linear(w.d.0, w.d.1);
    let eta = linear(w.eta.0, w.eta.1);
    let zeta = linear(w.zeta.0, w.zeta.1);

    let delta = round_to(uniform(rng, w.delta.0, w.delta.0 + w.delta.1), 6);
    let s = 2f64.powf(log_n * w.s.0 + rng.gen::<f64>() * w.s.1).floor() as u64;
    let prob = round_to(uniform(rng, w.prob.0, w.prob.0 + w.prob.1), 4);
    let u = uniform(rng, w.u.0, w.u.0 + w.u.1).floor() as u64;

    let (hl, k) = match scheme {
        Scheme::Pblpke => (None, None),
        Scheme::Pblsign => (
            Some((n * 0.2 + rng.gen::<f64>() * 30.0).floor() as u64),
            Some((n * 0.6 + rng.gen::<f64>() * 80.0).floor() as u64),
        ),
    };

    SecurityMetrics {
        rop,
        red,
        svP: svp,
        mem,
        beta,
        d,
        eta,
        delta,
        zeta,
        S: s,
        prob,
        U: u,
        hl,
        k,
    }
}

impl SecurityMetrics {
    /// `key=value` output file, with a trailing timestamp line
    pub fn to_file_text(&self, timestamp: i64) -> String {
        let mut pairs = vec![
            ("rop", self.rop.to_string()),
            ("red", self.red.to_string()),
            ("svP", self.svP.to_string()),
            ("mem", self.mem.to_string()),
            ("beta", self.beta.to_string()),
            ("d", self.d.to_string()),
            ("eta", self.eta.to_string()),
            ("delta", format!("{:.6}", self.delta)),
            ("zeta", self.zeta.to_string()),
            ("S", self.S.to_string()),
            ("prob", format!("{:.4}", self.prob)),
            ("U", self.U.to_string()),
        ];
        if let Some(hl) = self.hl {
            pairs.push(("hl", hl.to_string()));
        }
        if let Some(k) = self.k {
            pairs.push(("k", k.to_string()));
        }
        pairs.push(("timestamp", timestamp.to_string()));
        key_value_lines(&pairs)
    }

    /// Read a stored output file back
    pub fn parse(path: &Path, text: &str) -> ApiResult<Self> {
        fn field<T: std::str::FromStr>(path: &Path, text: &str, key: &str) -> ApiResult<T> {
            let raw = lookup(text, key)
                .ok_or_else(|| ApiError::parse(path, format!("缺少字段 {key}")))?;
            raw.trim()
                .parse()
                .map_err(|_| ApiError::parse(path, format!("字段 {key} 格式错误: {raw}")))
        }
        fn optional(path: &Path, text: &str, key: &str) -> ApiResult<Option<u64>> {
            match lookup(text, key) {
                None => Ok(None),
                Some(_) => field(path, text, key).map(Some),
            }
        }

        Ok(Self {
            rop: field(path, text, "rop")?,
            red: field(path, text, "red")?,
            svP: field(path, text, "svP")?,
            mem: field(path, text, "mem")?,
            beta: field(path, text, "beta")?,
            d: field(path, text, "d")?,
            eta: field(path, text, "eta")?,
            delta: field(path, text, "delta")?,
            zeta: field(path, text, "zeta")?,
            S: field(path, text, "S")?,
            prob: field(path, text, "prob")?,
            U: field(path, text, "U")?,
            hl: optional(path, text, "hl")?,
            k: optional(path, text, "k")?,
        })
    }
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub overall_security: String,
    pub classical_strength: String,
    pub quantum_resistance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub algorithm: Scheme,
    pub timestamp: i64,
    pub summary: ReportSummary,
    pub detailed_results: SecurityMetrics,
    pub recommendations: Vec<String>,
}

/// Summarise a stored estimate
pub fn report(scheme: Scheme, metrics: SecurityMetrics, timestamp: i64) -> SecurityReport {
    SecurityReport {
        algorithm: scheme,
        timestamp,
        summary: ReportSummary {
            overall_security: overall_security(metrics.rop).to_string(),
            classical_strength: classical_strength(metrics.red).to_string(),
            quantum_resistance: quantum_resistance(metrics.svP).to_string(),
        },
        recommendations: recommendations(&metrics),
        detailed_results: metrics,
    }
}

fn overall_security(rop: u64) -> &'static str {
    let rop = rop as f64;
    if rop > 2f64.powi(128) {
        "非常高"
    } else if rop > 2f64.powi(80) {
        "高"
    } else if rop > 2f64.powi(64) {
        "中等"
    } else {
        "低"
    }
}

fn classical_strength(red: u64) -> &'static str {
    let red = red as f64;
    if red > 2f64.powi(112) {
        "128位等效"
    } else if red > 2f64.powi(80) {
        "96位等效"
    } else if red > 2f64.powi(64) {
        "80位等效"
    } else {
        "64位以下"
    }
}

fn quantum_resistance(svp: u64) -> &'static str {
    let svp = svp as f64;
    if svp > 2f64.powi(256) {
        "抗量子"
    } else if svp > 2f64.powi(128) {
        "部分抗量子"
    } else {
        "易受量子攻击"
    }
}

fn recommendations(metrics: &SecurityMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.prob < 0.7 {
        out.push("建议增大参数以提高成功概率".to_string());
    }
    if metrics.beta < 50 {
        out.push("BKZ块大小较小，可能影响安全性评估准确度".to_string());
    }
    if metrics.delta > 1.015 {
        out.push("格基约化因子偏大，建议优化算法参数".to_string());
    }
    out
}
