//! LWE - simulated key pairs and key-pair validation

use super::{encode_matrix, encode_vector, gaussian, key_value_lines, lookup, preview};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters of each key component echoed back in responses
pub const PREVIEW_CHARS: usize = 100;

/// Default claimed security level in bits
pub const SECURITY_LEVEL_DEFAULT: i64 = 128;

/// How the error vector is sampled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDistribution {
    /// `floor(N(0,1) * 10) mod 16`, sign kept
    Gaussian,
    /// `[0, 8)`
    Uniform,
    /// `{0, 1}`
    Binary,
    /// Anything else: `[0, 4)`
    Other(String),
}

impl ErrorDistribution {
    pub fn parse(name: &str) -> Self {
        match name {
            "gaussian" => Self::Gaussian,
            "uniform" => Self::Uniform,
            "binary" => Self::Binary,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Uniform => "uniform",
            Self::Binary => "binary",
            Self::Other(name) => name,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match self {
            Self::Gaussian => ((gaussian(rng) * 10.0).floor() as i64) % 16,
            Self::Uniform => rng.gen_range(0..8),
            Self::Binary => i64::from(rng.gen_bool(0.5)),
            Self::Other(_) => rng.gen_range(0..4),
        }
    }

    /// Nominal decryption error rate
    pub fn error_rate(&self) -> &'static str {
        match self {
            Self::Gaussian => "0.001-0.01",
            Self::Uniform => "0.01-0.1",
            Self::Binary => "0.1-0.2",
            Self::Other(_) => "0.01-0.05",
        }
    }
}

/// Validated keygen inputs
#[derive(Debug, Clone)]
pub struct LweParams {
    pub dimension: usize,
    pub modulus: u64,
    pub error_distribution: ErrorDistribution,
    pub key_length: i64,
    pub security_level: i64,
}

impl LweParams {
    pub fn to_file_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LWE_KeyGen".to_string()),
            ("dimension", self.dimension.to_string()),
            ("modulus", self.modulus.to_string()),
            ("errorDistribution", self.error_distribution.name().to_string()),
            ("keyLength", self.key_length.to_string()),
            ("securityLevel", self.security_level.to_string()),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

/// Encoded key material. Matrices are `a,b;c,d;`, vectors `a,b`.
#[derive(Debug, Clone)]
pub struct LweKeyPair {
    pub dimension: usize,
    pub modulus: u64,
    pub matrix_a: String,
    pub vector_b: String,
    pub secret_vector: String,
    pub error_vector: String,
}

impl LweKeyPair {
    pub fn public_key_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LWE".to_string()),
            ("keyType", "public".to_string()),
            ("dimension", self.dimension.to_string()),
            ("modulus", self.modulus.to_string()),
            ("matrixA", self.matrix_a.clone()),
            ("vectorB", self.vector_b.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }

    pub fn private_key_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LWE".to_string()),
            ("keyType", "private".to_string()),
            ("dimension", self.dimension.to_string()),
            ("secretVector", self.secret_vector.clone()),
            ("errorVector", self.error_vector.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }

    /// Truncated view for the response body
    pub fn preview(&self) -> KeyPairPreview {
        KeyPairPreview {
            public_key: PublicKeyPreview {
                matrix_a: preview(&self.matrix_a, PREVIEW_CHARS),
                vector_b: preview(&self.vector_b, PREVIEW_CHARS),
            },
            private_key: PrivateKeyPreview {
                secret_vector: preview(&self.secret_vector, PREVIEW_CHARS),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairPreview {
    pub public_key: PublicKeyPreview,
    pub private_key: PrivateKeyPreview,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyPreview {
    pub matrix_a: String,
    pub vector_b: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyPreview {
    pub secret_vector: String,
}

/// Fabricate a key pair.
///
/// `b[i] = (sum_j (r_ij * s_j mod q) + e_i) mod q` with fresh `r_ij`, so `b`
/// is shaped like an LWE sample without being consistent with `A`.
pub fn generate_key_pair<R: Rng + ?Sized>(rng: &mut R, params: &LweParams) -> LweKeyPair {
    let n = params.dimension;
    let q = params.modulus;

    let matrix: Vec<Vec<i64>> = (0..n).map(|_| random_row(rng, n, q)).collect();
    let secret = random_row(rng, n, q);
    let errors: Vec<i64> = (0..n)
        .map(|_| params.error_distribution.sample(rng))
        .collect();

    let q128 = u128::from(q);
    let vector_b: Vec<i64> = errors
        .iter()
        .map(|&e| {
            let sum: i128 = secret
                .iter()
                .map(|&s| {
                    let r = u128::from(rng.gen_range(0..q));
                    ((r * s as u128) % q128) as i128
                })
                .sum();
            (sum + i128::from(e)).rem_euclid(q128 as i128) as i64
        })
        .collect();

    LweKeyPair {
        dimension: n,
        modulus: q,
        matrix_a: encode_matrix(&matrix),
        vector_b: encode_vector(&vector_b),
        secret_vector: encode_vector(&secret),
        error_vector: encode_vector(&errors),
    }
}

fn random_row<R: Rng + ?Sized>(rng: &mut R, len: usize, modulus: u64) -> Vec<i64> {
    (0..len).map(|_| rng.gen_range(0..modulus) as i64).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySecurityMetrics {
    pub classical_security: u64,
    pub quantum_security: u64,
    /// Bytes
    pub key_size: u64,
    pub encryption_efficiency: String,
    pub decryption_efficiency: String,
    pub error_rate: String,
    pub recommended_use: String,
}

pub fn key_security_metrics(params: &LweParams) -> KeySecurityMetrics {
    let n = params.dimension as f64;
    let log_q = (params.modulus as f64).log2();
    let log_n = n.log2();

    KeySecurityMetrics {
        classical_security: (n * log_q * 0.3).floor() as u64,
        quantum_security: (n * log_q * 0.15).floor() as u64,
        key_size: (n * log_q / 8.0).floor() as u64,
        encryption_efficiency: format!("{:.1}%", 100.0 - (log_n * 2.0).floor()),
        decryption_efficiency: format!("{:.1}%", 100.0 - (log_n * 1.5).floor()),
        error_rate: params.error_distribution.error_rate().to_string(),
        recommended_use: recommended_use(params.dimension, params.modulus).to_string(),
    }
}

fn recommended_use(dimension: usize, modulus: u64) -> &'static str {
    if dimension >= 1024 && modulus >= 65536 {
        "适用于高安全性应用"
    } else if dimension >= 512 && modulus >= 4096 {
        "适用于一般安全应用"
    } else {
        "仅适用于测试和学习"
    }
}

// =============================================================================
// Validation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidation {
    pub is_valid: bool,
    pub public_key_valid: bool,
    pub private_key_valid: bool,
    pub consistency_check: bool,
    /// 高 / 中 / 低
    pub security_level: String,
    pub recommendations: Vec<String>,
    pub timestamp: i64,
}

/// Structural checks over the two stored key files
pub fn validate_key_pair(public_key: &str, private_key: &str, timestamp: i64) -> KeyValidation {
    let public_key_valid = public_key.lines().count() >= 5
        && lookup(public_key, "matrixA").is_some()
        && lookup(public_key, "vectorB").is_some();
    let private_key_valid = private_key.lines().count() >= 4
        && lookup(private_key, "secretVector").is_some()
        && lookup(private_key, "errorVector").is_some();

    let public_dimension = dimension_of(public_key);
    let consistency_check =
        public_key_valid && private_key_valid && public_dimension == dimension_of(private_key);

    let security_level = security_level(public_dimension);

    let mut recommendations = Vec::new();
    if security_level == "低" {
        recommendations.push("建议使用更大的维度参数以提高安全性".to_string());
    }
    if !consistency_check {
        recommendations.push("检测到密钥一致性问题，建议重新生成密钥对".to_string());
    }
    recommendations.push("定期更新密钥以维护安全性".to_string());

    KeyValidation {
        is_valid: public_key_valid && private_key_valid && consistency_check,
        public_key_valid,
        private_key_valid,
        consistency_check,
        security_level: security_level.to_string(),
        recommendations,
        timestamp,
    }
}

/// `dimension=` value, 0 when absent or unparseable
fn dimension_of(text: &str) -> u64 {
    lookup(text, "dimension")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn security_level(dimension: u64) -> &'static str {
    if dimension >= 1024 {
        "高"
    } else if dimension >= 512 {
        "中"
    } else {
        "低"
    }
}
