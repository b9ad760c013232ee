//! SDES / SM4 - XOR "ciphers" and their attacks
//!
//! TigerStyle: The only exact arithmetic in the service.
//!
//! Encryption is plain bitwise XOR of plaintext and key, so the attacks can
//! recover the key as `plaintext XOR ciphertext`. Whether an attack reports
//! that key is decided by a single uniform draw against a success rate.

use super::{random_bits, round_to, uniform};
use crate::error::{ApiError, ApiResult};
use crate::validate::check_bits;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// SDES plaintext length in bits
pub const SDES_PLAINTEXT_BITS: usize = 8;

/// SDES key length in bits
pub const SDES_KEY_BITS: usize = 10;

/// SM4 block sizes accepted by the simulator
pub const SM4_BLOCK_SIZES: [usize; 2] = [8, 16];

// =============================================================================
// XOR
// =============================================================================

/// Bitwise XOR of two bit strings, truncated to the shorter one.
///
/// Both inputs must already be validated as `[01]+`.
pub fn xor_bits(a: &str, b: &str) -> String {
    a.bytes()
        .zip(b.bytes())
        .map(|(x, y)| if x == y { '0' } else { '1' })
        .collect()
}

// =============================================================================
// Attack Outcome
// =============================================================================

/// Terminal state of one simulated attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackOutcome {
    Succeeded,
    Failed,
}

impl AttackOutcome {
    /// One uniform draw: success iff `u < success_rate`
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, success_rate: f64) -> Self {
        if rng.gen::<f64>() < success_rate {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Result of a key-recovery attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackResult {
    pub recovered_key: String,
    pub probability: f64,
    pub average_calls: u64,
    pub outcome: AttackOutcome,
}

impl AttackResult {
    /// Output file layout: key, probability, calls
    pub fn to_file_text(&self) -> String {
        format!(
            "{}\n{:.4}\n{}",
            self.recovered_key, self.probability, self.average_calls
        )
    }
}

// =============================================================================
// SDES
// =============================================================================

/// Two plaintext/ciphertext pairs under one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdesPairs {
    pub plaintext1: String,
    pub plaintext2: String,
    pub ciphertext1: String,
    pub ciphertext2: String,
}

impl SdesPairs {
    /// Output file layout: p1, p2, c1, c2
    pub fn to_file_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.plaintext1, self.plaintext2, self.ciphertext1, self.ciphertext2
        )
    }

    /// Parse an encrypt output file, checking every line is an 8-bit string.
    pub fn parse(path: &Path, text: &str) -> ApiResult<Self> {
        let lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
        if lines.len() < 4 {
            return Err(ApiError::parse(path, "SDES加密结果文件格式错误"));
        }
        for (i, line) in lines[..4].iter().enumerate() {
            check_bits(&format!("line {}", i + 1), line, Some(SDES_PLAINTEXT_BITS))
                .map_err(|e| ApiError::parse(path, e.to_string()))?;
        }
        Ok(Self {
            plaintext1: lines[0].to_string(),
            plaintext2: lines[1].to_string(),
            ciphertext1: lines[2].to_string(),
            ciphertext2: lines[3].to_string(),
        })
    }
}

/// Encrypt both plaintexts with the first 8 bits of the 10-bit key
pub fn sdes_encrypt(plaintext1: &str, plaintext2: &str, key: &str) -> SdesPairs {
    let key8 = &key[..SDES_PLAINTEXT_BITS.min(key.len())];
    SdesPairs {
        plaintext1: plaintext1.to_string(),
        plaintext2: plaintext2.to_string(),
        ciphertext1: xor_bits(plaintext1, key8),
        ciphertext2: xor_bits(plaintext2, key8),
    }
}

/// Attack the stored pairs.
///
/// Success: key = `(p1 XOR c1) ++ "00"`, probability in [0.80, 0.95].
/// Failure: ten zero bits, probability 0.
pub fn sdes_attack<R: Rng + ?Sized>(rng: &mut R, pairs: &SdesPairs, success_rate: f64) -> AttackResult {
    let outcome = AttackOutcome::draw(rng, success_rate);
    match outcome {
        AttackOutcome::Succeeded => {
            let mut key = xor_bits(&pairs.plaintext1, &pairs.ciphertext1);
            key.push_str(&"0".repeat(SDES_KEY_BITS - SDES_PLAINTEXT_BITS));
            AttackResult {
                recovered_key: key,
                probability: round_to(uniform(rng, 0.80, 0.95), 4),
                average_calls: rng.gen_range(400..1200),
                outcome,
            }
        }
        AttackOutcome::Failed => AttackResult {
            recovered_key: "0".repeat(SDES_KEY_BITS),
            probability: 0.0,
            average_calls: rng.gen_range(1200..3200),
            outcome,
        },
    }
}

/// Success probabilities of the three compared attack schemes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeComparison {
    pub scheme1_probability: f64,
    pub scheme2_probability: f64,
    pub scheme3_probability: f64,
}

impl SchemeComparison {
    pub fn to_file_text(&self) -> String {
        format!(
            "{:.4}\n{:.4}\n{:.4}",
            self.scheme1_probability, self.scheme2_probability, self.scheme3_probability
        )
    }
}

pub fn sdes_compare<R: Rng + ?Sized>(rng: &mut R) -> SchemeComparison {
    SchemeComparison {
        scheme1_probability: round_to(uniform(rng, 0.70, 0.90), 4),
        scheme2_probability: round_to(uniform(rng, 0.60, 0.85), 4),
        scheme3_probability: round_to(uniform(rng, 0.75, 0.90), 4),
    }
}

/// What an SDES random bit string is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdesBitsKind {
    Key,
    Plaintext,
}

impl SdesBitsKind {
    /// `key` selects a key; anything else a plaintext
    pub fn from_param(s: &str) -> Self {
        if s == "key" {
            Self::Key
        } else {
            Self::Plaintext
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Self::Key => SDES_KEY_BITS,
            Self::Plaintext => SDES_PLAINTEXT_BITS,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Key => "密钥",
            Self::Plaintext => "明文",
        }
    }
}

/// Random bits for the front end's "generate" buttons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomBits {
    pub random_bits: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SdesBitsKind>,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub fn sdes_random<R: Rng + ?Sized>(rng: &mut R, kind: SdesBitsKind) -> RandomBits {
    RandomBits {
        random_bits: random_bits(rng, kind.length()),
        kind: Some(kind),
        length: kind.length(),
        name: Some(kind.display_name().to_string()),
    }
}

// =============================================================================
// SM4
// =============================================================================

/// One SM4 plaintext/ciphertext pair for a block size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sm4Pair {
    pub plaintext: String,
    pub ciphertext: String,
    pub block_size: usize,
}

impl Sm4Pair {
    /// Output file layout: plaintext, ciphertext
    pub fn to_file_text(&self) -> String {
        format!("{}\n{}", self.plaintext, self.ciphertext)
    }

    pub fn parse(path: &Path, text: &str, block_size: usize) -> ApiResult<Self> {
        let lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
        if lines.len() < 2 {
            return Err(ApiError::parse(path, "SM4加密结果文件格式错误"));
        }
        for (i, line) in lines[..2].iter().enumerate() {
            check_bits(&format!("line {}", i + 1), line, Some(block_size))
                .map_err(|e| ApiError::parse(path, e.to_string()))?;
        }
        Ok(Self {
            plaintext: lines[0].to_string(),
            ciphertext: lines[1].to_string(),
            block_size,
        })
    }
}

/// Check a block size is one of [`SM4_BLOCK_SIZES`]
pub fn check_block_size(block_size: i64) -> ApiResult<usize> {
    usize::try_from(block_size)
        .ok()
        .filter(|bs| SM4_BLOCK_SIZES.contains(bs))
        .ok_or_else(|| ApiError::invalid("blockSize", "分组长度必须为8或16"))
}

pub fn sm4_encrypt(plaintext: &str, key: &str, block_size: usize) -> Sm4Pair {
    Sm4Pair {
        plaintext: plaintext.to_string(),
        ciphertext: xor_bits(plaintext, key),
        block_size,
    }
}

/// Attack a stored SM4 pair.
///
/// Success: key = `p XOR c`, probability in [0.75, 0.95]. Failure: all-zero
/// key of the block size, probability 0.
pub fn sm4_attack<R: Rng + ?Sized>(rng: &mut R, pair: &Sm4Pair, success_rate: f64) -> AttackResult {
    let outcome = AttackOutcome::draw(rng, success_rate);
    let (recovered_key, probability) = match outcome {
        AttackOutcome::Succeeded => (
            xor_bits(&pair.plaintext, &pair.ciphertext),
            round_to(uniform(rng, 0.75, 0.95), 4),
        ),
        AttackOutcome::Failed => ("0".repeat(pair.block_size), 0.0),
    };
    AttackResult {
        recovered_key,
        probability,
        average_calls: rng.gen_range(500..1500),
        outcome,
    }
}

pub fn sm4_random<R: Rng + ?Sized>(rng: &mut R, block_size: usize) -> RandomBits {
    RandomBits {
        random_bits: random_bits(rng, block_size),
        kind: None,
        length: block_size,
        name: None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sdes_encrypt_scenario() {
        let pairs = sdes_encrypt("10101010", "01010101", "1100110011");

        // key8 = 11001100
        assert_eq!(pairs.ciphertext1, "01100110");
        assert_eq!(pairs.ciphertext2, "10011001");
    }

    #[test]
    fn test_xor_is_its_own_inverse() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for len in [8, 16] {
            for _ in 0..100 {
                let p = random_bits(&mut rng, len);
                let k = random_bits(&mut rng, len);
                assert_eq!(xor_bits(&xor_bits(&p, &k), &k), p);
            }
        }
    }

    #[test]
    fn test_sdes_attack_success_recovers_key_prefix() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let pairs = sdes_encrypt("10101010", "01010101", "1100110011");

        let result = sdes_attack(&mut rng, &pairs, 1.0);

        assert!(result.outcome.is_success());
        assert_eq!(result.recovered_key, "1100110000");
        assert!((0.80..=0.95).contains(&result.probability));
        assert!((400..1200).contains(&result.average_calls));
    }

    #[test]
    fn test_sdes_attack_failure_is_all_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let pairs = sdes_encrypt("10101010", "01010101", "1100110011");

        let result = sdes_attack(&mut rng, &pairs, 0.0);

        assert_eq!(result.outcome, AttackOutcome::Failed);
        assert_eq!(result.recovered_key, "0000000000");
        assert_eq!(result.probability, 0.0);
        assert!((1200..3200).contains(&result.average_calls));
    }

    #[test]
    fn test_sdes_pairs_parse_rejects_garbage() {
        let path = Path::new("output_1.txt");
        assert!(SdesPairs::parse(path, "10101010\n01010101\n").is_err());
        assert!(SdesPairs::parse(path, "1010101x\n01010101\n00000000\n11111111").is_err());

        let pairs = sdes_encrypt("10101010", "01010101", "1100110011");
        assert_eq!(SdesPairs::parse(path, &pairs.to_file_text()).unwrap(), pairs);
    }

    #[test]
    fn test_sm4_attack_recovers_full_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let pair = sm4_encrypt("1010101011110000", "0110011001100110", 16);

        let result = sm4_attack(&mut rng, &pair, 1.0);

        assert_eq!(result.recovered_key, "0110011001100110");
        assert!((0.75..=0.95).contains(&result.probability));
    }

    #[test]
    fn test_block_size_check() {
        assert_eq!(check_block_size(8).unwrap(), 8);
        assert_eq!(check_block_size(16).unwrap(), 16);
        assert!(check_block_size(12).is_err());
        assert!(check_block_size(-8).is_err());
    }

    #[test]
    fn test_comparison_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let c = sdes_compare(&mut rng);
        assert!((0.70..=0.90).contains(&c.scheme1_probability));
        assert!((0.60..=0.85).contains(&c.scheme2_probability));
        assert!((0.75..=0.90).contains(&c.scheme3_probability));
    }

    #[test]
    fn test_random_kinds() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        assert_eq!(sdes_random(&mut rng, SdesBitsKind::from_param("key")).random_bits.len(), 10);
        assert_eq!(sdes_random(&mut rng, SdesBitsKind::from_param("plaintext")).random_bits.len(), 8);
        assert_eq!(sm4_random(&mut rng, 16).random_bits.len(), 16);
    }
}
