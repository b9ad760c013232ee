//! Result Fabricator
//!
//! TigerStyle: Pure functions from parameters (plus an RNG) to result records.
//!
//! None of these run a real cryptographic or lattice algorithm. They produce
//! plausible-looking numbers in documented ranges so the desktop front end
//! has something to display. The only exact transformation is the XOR used
//! by the SDES/SM4 "ciphers", which the matching attacks invert.
//!
//! Every function takes its randomness as `&mut R: Rng`, so callers decide
//! the source: the shared seeded [`ChaCha8Rng`](rand_chacha::ChaCha8Rng) in
//! production, a fixed seed in tests.

pub mod analysis;
pub mod cipher;
pub mod keygen;
pub mod lattice;
pub mod lpn;
pub mod signature;

use rand::Rng;
use rand_distr::StandardNormal;

/// Random bit string of `len` bits
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| if rng.gen_bool(0.5) { '1' } else { '0' })
        .collect()
}

/// Uniform float in `[low, high)`
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    low + rng.gen::<f64>() * (high - low)
}

/// Standard normal sample
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.sample(StandardNormal)
}

/// Symmetric noise factor `1 + (u - 0.5) * width`
pub fn noise<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    1.0 + (rng.gen::<f64>() - 0.5) * width
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Encode a matrix as `a,b,c;d,e,f;` (every row terminated by `;`)
pub fn encode_matrix(rows: &[Vec<i64>]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&encode_vector(row));
        out.push(';');
    }
    out
}

/// Encode a vector as `a,b,c`
pub fn encode_vector(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a `;`-terminated matrix. Returns `None` on any non-integer entry.
pub fn decode_matrix(encoded: &str) -> Option<Vec<Vec<i64>>> {
    encoded
        .split(';')
        .filter(|row| !row.is_empty())
        .map(|row| row.split(',').map(|v| v.trim().parse().ok()).collect())
        .collect()
}

/// First `chars` characters followed by `...`
pub fn preview(text: &str, chars: usize) -> String {
    let mut out: String = text.chars().take(chars).collect();
    out.push_str("...");
    out
}

/// Render `key=value` lines, the layout of every text result file
pub fn key_value_lines(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Look up `key` in `key=value` text. Splits on the first `=` only.
pub fn lookup<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_bits_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let bits = random_bits(&mut rng, 16);
        assert_eq!(bits.len(), 16);
        assert!(bits.chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn test_matrix_encoding_roundtrip() {
        let rows = vec![vec![1, -2], vec![3, 40]];
        let encoded = encode_matrix(&rows);
        assert_eq!(encoded, "1,-2;3,40;");
        assert_eq!(decode_matrix(&encoded), Some(rows));
        assert_eq!(decode_matrix("1,x;"), None);
    }

    #[test]
    fn test_lookup_splits_on_first_equals() {
        let text = "algorithm=LatticeSignature\nmessage=a=b\nmessageHash=00ff";
        assert_eq!(lookup(text, "message"), Some("a=b"));
        assert_eq!(lookup(text, "messageHash"), Some("00ff"));
        assert_eq!(lookup(text, "signature"), None);
    }

    #[test]
    fn test_preview_counts_chars() {
        assert_eq!(preview("求解结果：x1", 4), "求解结果...");
    }
}
