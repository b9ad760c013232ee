//! Lattice signatures - simulated keys, signing and verification
//!
//! The message hash is a toy digest, not SHA-256, and the per-signature
//! acceptance is a random draw. The only real checks are the hash recompute
//! against an expected message and the signature length against the public
//! key dimension.

use super::{encode_matrix, encode_vector, gaussian, key_value_lines, lookup, preview, uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Hex characters in a message digest
pub const HASH_HEX_CHARS: usize = 64;

/// Entries in a verification key
pub const VERIFICATION_KEY_LEN: usize = 32;

/// Signature length when the private key has no readable dimension
pub const SIGNATURE_DIMENSION_FALLBACK: usize = 512;

/// Default digest name recorded with a signature
pub const HASH_ALGORITHM_DEFAULT: &str = "SHA-256";

/// Probability a single signature verifies
pub const SIGNATURE_ACCEPT_RATE: f64 = 0.9;

/// Probability a batch entry verifies
pub const BATCH_ACCEPT_RATE: f64 = 0.95;

/// Characters of a batch message echoed back in responses
pub const BATCH_MESSAGE_PREVIEW_CHARS: usize = 50;

// =============================================================================
// Keys
// =============================================================================

#[derive(Debug, Clone)]
pub struct SigningParams {
    pub dimension: usize,
    pub modulus: u64,
    pub gaussian_parameter: f64,
    pub security_level: i64,
}

impl SigningParams {
    pub fn to_file_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LatticeSignature".to_string()),
            ("dimension", self.dimension.to_string()),
            ("modulus", self.modulus.to_string()),
            ("gaussianParameter", self.gaussian_parameter.to_string()),
            ("securityLevel", self.security_level.to_string()),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct SigningKeyPair {
    pub dimension: usize,
    pub modulus: u64,
    pub public_matrix: String,
    pub verification_key: String,
    pub short_basis: String,
    pub trapdoor: String,
}

impl SigningKeyPair {
    pub fn public_key_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LatticeSignature".to_string()),
            ("keyType", "public".to_string()),
            ("dimension", self.dimension.to_string()),
            ("modulus", self.modulus.to_string()),
            ("publicMatrix", self.public_matrix.clone()),
            ("verificationKey", self.verification_key.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }

    pub fn private_key_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LatticeSignature".to_string()),
            ("keyType", "private".to_string()),
            ("dimension", self.dimension.to_string()),
            ("shortBasis", self.short_basis.clone()),
            ("trapdoor", self.trapdoor.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }

    pub fn preview(&self) -> SigningKeyPreview {
        SigningKeyPreview {
            public_key: SigningPublicPreview {
                public_matrix: preview(&self.public_matrix, 100),
                verification_key: preview(&self.verification_key, 50),
            },
            private_key: SigningPrivatePreview {
                short_basis: preview(&self.short_basis, 100),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKeyPreview {
    pub public_key: SigningPublicPreview,
    pub private_key: SigningPrivatePreview,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPublicPreview {
    pub public_matrix: String,
    pub verification_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPrivatePreview {
    pub short_basis: String,
}

/// Fabricate a signing key pair.
///
/// Public matrix diagonal entries sit in `[q/4, 3q/4)`, off-diagonal in
/// `[0, q)`. The short basis is `floor(N(0,1) * sigma)` per entry.
pub fn generate_signing_keys<R: Rng + ?Sized>(rng: &mut R, params: &SigningParams) -> SigningKeyPair {
    let n = params.dimension;
    let q = params.modulus;
    let half = (q / 2).max(1);

    let public_matrix: Vec<Vec<i64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        (rng.gen_range(0..half) + q / 4) as i64
                    } else {
                        rng.gen_range(0..q) as i64
                    }
                })
                .collect()
        })
        .collect();

    let short_basis: Vec<Vec<i64>> = (0..n)
        .map(|_| {
            (0..n)
                .map(|_| (gaussian(rng) * params.gaussian_parameter).floor() as i64)
                .collect()
        })
        .collect();

    let trapdoor: Vec<i64> = (0..n).map(|_| rng.gen_range(0..1000)).collect();
    let verification_key: Vec<i64> = (0..VERIFICATION_KEY_LEN)
        .map(|_| rng.gen_range(0..q) as i64)
        .collect();

    SigningKeyPair {
        dimension: n,
        modulus: q,
        public_matrix: encode_matrix(&public_matrix),
        verification_key: encode_vector(&verification_key),
        short_basis: encode_matrix(&short_basis),
        trapdoor: encode_vector(&trapdoor),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureMetrics {
    /// Bytes
    pub signature_size: u64,
    pub verification_time: String,
    pub signing_time: String,
    pub security_level: String,
    pub forgery_security: u64,
    pub collision_resistance: u64,
}

pub fn signature_metrics<R: Rng + ?Sized>(rng: &mut R, params: &SigningParams) -> SignatureMetrics {
    let n = params.dimension as f64;
    let log_q = (params.modulus as f64).log2();
    let security_bits = (n.log2() * log_q * 0.2).floor();

    let security_level = if security_bits >= 256.0 {
        "非常高 (256位+)"
    } else if security_bits >= 128.0 {
        "高 (128-256位)"
    } else if security_bits >= 80.0 {
        "中等 (80-128位)"
    } else {
        "低 (<80位)"
    };

    SignatureMetrics {
        signature_size: (n * log_q / 8.0).floor() as u64,
        verification_time: format!("{:.3}ms", n * 0.001 + rng.gen::<f64>() * 0.01),
        signing_time: format!("{:.3}ms", n * 0.005 + rng.gen::<f64>() * 0.02),
        security_level: security_level.to_string(),
        forgery_security: (n * log_q * 0.5).floor() as u64,
        collision_resistance: (n * log_q * 0.3).floor() as u64,
    }
}

// =============================================================================
// Signing
// =============================================================================

/// Toy digest: 64 hex chars, `(code(m[i mod len]) * (i + 1)) mod 16`.
///
/// Character codes are UTF-16 code units.
pub fn toy_hash(message: &str) -> String {
    let units: Vec<u16> = message.encode_utf16().collect();
    (0..HASH_HEX_CHARS)
        .map(|i| {
            let code = if units.is_empty() {
                0
            } else {
                u64::from(units[i % units.len()])
            };
            let nibble = (code * (i as u64 + 1)) % 16;
            char::from_digit(nibble as u32, 16).unwrap_or('0')
        })
        .collect()
}

/// Signature dimension recorded in a key file
pub fn key_dimension(key_text: &str) -> Option<usize> {
    lookup(key_text, "dimension").and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSignature {
    pub message_hash: String,
    pub signature_value: String,
    pub signature_length: usize,
    pub signing_time: String,
}

/// Sign one message with a key of `dimension` entries.
///
/// Entry `i` is `(h[i mod 64] * i + r) mod 1000` with `r` in [0, 100).
pub fn sign<R: Rng + ?Sized>(rng: &mut R, message: &str, dimension: usize) -> MessageSignature {
    let message_hash = toy_hash(message);
    let digits: Vec<u64> = message_hash
        .chars()
        .map(|c| u64::from(c.to_digit(16).unwrap_or(0)))
        .collect();

    let values: Vec<i64> = (0..dimension)
        .map(|i| {
            let h = digits[i % digits.len()];
            ((h * i as u64 + rng.gen_range(0..100)) % 1000) as i64
        })
        .collect();
    let signature_value = encode_vector(&values);

    MessageSignature {
        signature_length: signature_value.len(),
        signing_time: format!("{:.2}ms", uniform(rng, 5.0, 15.0)),
        message_hash,
        signature_value,
    }
}

impl MessageSignature {
    /// Signature file layout. Caller-supplied text is stored as a JSON
    /// string literal so it always stays on its own line.
    pub fn to_file_text(&self, message: &str, hash_algorithm: &str, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LatticeSignature".to_string()),
            ("message", quoted(message)),
            ("hashAlgorithm", quoted(hash_algorithm)),
            ("messageHash", self.message_hash.clone()),
            ("signature", self.signature_value.clone()),
            ("signatureLength", self.signature_length.to_string()),
            ("signingTime", self.signing_time.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }

    /// Response view with the signature value truncated
    pub fn summary(&self) -> Self {
        Self {
            signature_value: preview(&self.signature_value, 100),
            ..self.clone()
        }
    }
}

fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Decode a value written by [`quoted`]. Bare values are taken as-is.
fn unquoted(raw: &str) -> String {
    serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_string())
}

// =============================================================================
// Verification
// =============================================================================

/// Trust in a verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    High,
    Medium,
    Low,
}

impl TrustLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "高",
            Self::Medium => "中",
            Self::Low => "低",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub is_valid: bool,
    pub message: Option<String>,
    pub verification_time: String,
    pub signature_format: bool,
    pub hash_match: bool,
    pub signature_match: bool,
    pub trust_level: String,
    pub timestamp: i64,
}

/// Verify the stored signature file against the stored public key.
pub fn verify<R: Rng + ?Sized>(
    rng: &mut R,
    signature_text: &str,
    public_key_text: &str,
    expected_message: Option<&str>,
    timestamp: i64,
) -> Verification {
    let message = lookup(signature_text, "message");
    let message_hash = lookup(signature_text, "messageHash");
    let signature = lookup(signature_text, "signature");
    let public_matrix = lookup(public_key_text, "publicMatrix");

    let hash_match = match expected_message {
        Some(expected) => message_hash == Some(toy_hash(expected).as_str()),
        None => true,
    };

    let signature_format = match (signature, key_dimension(public_key_text)) {
        (Some(sig), Some(dimension)) if !sig.is_empty() => sig.split(',').count() == dimension,
        _ => false,
    };

    let has_material = [message_hash, signature, public_matrix]
        .iter()
        .all(|v| v.map_or(false, |s| !s.is_empty()));
    let signature_match = has_material && rng.gen_bool(SIGNATURE_ACCEPT_RATE);

    let is_valid = hash_match && signature_format && signature_match;
    let trust = if is_valid {
        TrustLevel::High
    } else if signature_format && (hash_match || signature_match) {
        TrustLevel::Medium
    } else {
        TrustLevel::Low
    };

    Verification {
        is_valid,
        message: message.map(unquoted),
        verification_time: format!("{:.2}ms", uniform(rng, 2.0, 7.0)),
        signature_format,
        hash_match,
        signature_match,
        trust_level: trust.label().to_string(),
        timestamp,
    }
}

// =============================================================================
// Batches
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub message_index: usize,
    pub message: String,
    pub signature: MessageSignature,
}

/// Persisted `batch_signatures.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSignatures {
    pub total_messages: usize,
    pub hash_algorithm: String,
    pub signatures: Vec<BatchEntry>,
    pub batch_processing_time: String,
    pub timestamp: i64,
}

/// Response view of one batch entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntrySummary {
    pub message_index: usize,
    pub message: String,
    pub signature_length: usize,
    pub signing_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_messages: usize,
    pub batch_processing_time: String,
    pub signatures: Vec<BatchEntrySummary>,
}

pub fn sign_batch<R: Rng + ?Sized>(
    rng: &mut R,
    messages: &[String],
    dimension: usize,
    hash_algorithm: &str,
    timestamp: i64,
) -> BatchSignatures {
    let signatures = messages
        .iter()
        .enumerate()
        .map(|(i, message)| BatchEntry {
            message_index: i,
            message: message.clone(),
            signature: sign(rng, message, dimension),
        })
        .collect();

    BatchSignatures {
        total_messages: messages.len(),
        hash_algorithm: hash_algorithm.to_string(),
        signatures,
        batch_processing_time: format!(
            "{:.2}ms",
            messages.len() as f64 * rng.gen::<f64>() * 20.0 + 10.0
        ),
        timestamp,
    }
}

impl BatchSignatures {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_messages: self.total_messages,
            batch_processing_time: self.batch_processing_time.clone(),
            signatures: self
                .signatures
                .iter()
                .map(|entry| BatchEntrySummary {
                    message_index: entry.message_index,
                    message: truncate_message(&entry.message),
                    signature_length: entry.signature.signature_length,
                    signing_time: entry.signature.signing_time.clone(),
                })
                .collect(),
        }
    }
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() > BATCH_MESSAGE_PREVIEW_CHARS {
        preview(message, BATCH_MESSAGE_PREVIEW_CHARS)
    } else {
        message.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntryVerification {
    pub message_index: usize,
    pub message: String,
    pub is_valid: bool,
    pub verification_time: String,
}

/// Persisted `batch_verification.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchVerification {
    pub total_signatures: usize,
    pub valid_signatures: usize,
    pub invalid_signatures: usize,
    pub success_rate: String,
    pub batch_verification_time: String,
    pub results: Vec<BatchEntryVerification>,
    pub timestamp: i64,
}

pub fn verify_batch<R: Rng + ?Sized>(rng: &mut R, batch: &BatchSignatures, timestamp: i64) -> BatchVerification {
    let results: Vec<BatchEntryVerification> = batch
        .signatures
        .iter()
        .map(|entry| BatchEntryVerification {
            message_index: entry.message_index,
            message: entry.message.clone(),
            is_valid: rng.gen_bool(BATCH_ACCEPT_RATE),
            verification_time: format!("{:.2}ms", uniform(rng, 1.0, 4.0)),
        })
        .collect();

    let total = results.len();
    let valid = results.iter().filter(|r| r.is_valid).count();
    let success_rate = if total == 0 {
        0.0
    } else {
        valid as f64 / total as f64 * 100.0
    };

    BatchVerification {
        total_signatures: total,
        valid_signatures: valid,
        invalid_signatures: total - valid,
        success_rate: format!("{success_rate:.2}%"),
        batch_verification_time: format!("{:.2}ms", total as f64 * rng.gen::<f64>() * 10.0 + 5.0),
        results,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn keys(rng: &mut ChaCha8Rng, dimension: usize) -> SigningKeyPair {
        generate_signing_keys(
            rng,
            &SigningParams {
                dimension,
                modulus: 12289,
                gaussian_parameter: 3.2,
                security_level: 128,
            },
        )
    }

    #[test]
    fn test_toy_hash_is_deterministic_hex() {
        let h = toy_hash("hello");
        assert_eq!(h.len(), HASH_HEX_CHARS);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, toy_hash("hello"));
        assert_ne!(h, toy_hash("hellp"));

        // 'h' = 104; 104 * 1 mod 16 = 8, 'e' = 101; 101 * 2 mod 16 = 10
        assert!(h.starts_with("8a"));
    }

    #[test]
    fn test_toy_hash_uses_utf16_units() {
        // '签' is one UTF-16 unit (0x7B7E); 0x7B7E mod 16 = 14
        assert!(toy_hash("签").starts_with('e'));
    }

    #[test]
    fn test_key_pair_layout() {
        let mut rng = ChaCha8Rng::seed_from_u64(51);
        let pair = keys(&mut rng, 8);

        assert_eq!(pair.verification_key.split(',').count(), VERIFICATION_KEY_LEN);
        assert_eq!(key_dimension(&pair.private_key_text(0)), Some(8));

        let rows = crate::fabricate::decode_matrix(&pair.public_matrix).unwrap();
        for (i, row) in rows.iter().enumerate() {
            assert!((12289 / 4..12289 / 4 + 12289 / 2).contains(&row[i]));
        }
    }

    #[test]
    fn test_signature_matches_key_dimension() {
        let mut rng = ChaCha8Rng::seed_from_u64(52);
        let sig = sign(&mut rng, "hello", 16);

        let values: Vec<i64> = sig
            .signature_value
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();

        assert_eq!(values.len(), 16);
        assert!(values.iter().all(|v| (0..1000).contains(v)));
        assert_eq!(sig.signature_length, sig.signature_value.len());
    }

    #[test]
    fn test_verify_real_checks() {
        let mut rng = ChaCha8Rng::seed_from_u64(53);
        let pair = keys(&mut rng, 16);
        let sig = sign(&mut rng, "hello", 16);
        let sig_text = sig.to_file_text("hello", HASH_ALGORITHM_DEFAULT, 0);
        let public = pair.public_key_text(0);

        let ok = verify(&mut rng, &sig_text, &public, Some("hello"), 0);
        assert!(ok.hash_match);
        assert!(ok.signature_format);
        assert_eq!(ok.message.as_deref(), Some("hello"));

        let wrong = verify(&mut rng, &sig_text, &public, Some("goodbye"), 0);
        assert!(!wrong.hash_match);
        assert!(!wrong.is_valid);
        assert_ne!(wrong.trust_level, "高");
    }

    #[test]
    fn test_multiline_message_survives_file() {
        let mut rng = ChaCha8Rng::seed_from_u64(56);
        let pair = keys(&mut rng, 16);
        let sig = sign(&mut rng, "hello\nworld", 16);
        let sig_text = sig.to_file_text("hello\nworld", HASH_ALGORITHM_DEFAULT, 0);

        assert_eq!(sig_text.lines().count(), 8);
        let v = verify(&mut rng, &sig_text, &pair.public_key_text(0), Some("hello\nworld"), 0);
        assert_eq!(v.message.as_deref(), Some("hello\nworld"));
        assert!(v.hash_match);
    }

    #[test]
    fn test_message_cannot_forge_hash_line() {
        let mut rng = ChaCha8Rng::seed_from_u64(57);
        let pair = keys(&mut rng, 16);
        let forged = format!("x\nmessageHash={}", toy_hash("evil"));
        let sig = sign(&mut rng, &forged, 16);
        let sig_text = sig.to_file_text(&forged, &forged, 0);

        let v = verify(&mut rng, &sig_text, &pair.public_key_text(0), Some("evil"), 0);
        assert!(!v.hash_match);
        assert!(!v.is_valid);
        assert_eq!(lookup(&sig_text, "messageHash"), Some(toy_hash(&forged).as_str()));
    }

    #[test]
    fn test_verify_dimension_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(54);
        let pair = keys(&mut rng, 16);
        let sig = sign(&mut rng, "hello", 8);

        let v = verify(
            &mut rng,
            &sig.to_file_text("hello", HASH_ALGORITHM_DEFAULT, 0),
            &pair.public_key_text(0),
            None,
            0,
        );

        assert!(!v.signature_format);
        assert!(!v.is_valid);
        assert_eq!(v.trust_level, "低");
    }

    #[test]
    fn test_batch_roundtrip_through_json() {
        let mut rng = ChaCha8Rng::seed_from_u64(55);
        let messages = vec!["a".repeat(60), "short".to_string()];
        let batch = sign_batch(&mut rng, &messages, 8, HASH_ALGORITHM_DEFAULT, 0);

        let json = serde_json::to_string(&batch).unwrap();
        let back: BatchSignatures = serde_json::from_str(&json).unwrap();
        let summary = back.summary();

        assert_eq!(summary.total_messages, 2);
        assert!(summary.signatures[0].message.ends_with("..."));
        assert_eq!(summary.signatures[1].message, "short");

        let v = verify_batch(&mut rng, &back, 0);
        assert_eq!(v.total_signatures, 2);
        assert_eq!(v.valid_signatures + v.invalid_signatures, 2);
        assert!(v.success_rate.ends_with('%'));
    }
}
