//! LPN - simulated Learning Parity with Noise solving

use super::{round_to, uniform};
use crate::error::{ApiError, ApiResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Variables listed in full before the listing is elided
pub const SOLUTION_LINES_MAX: u64 = 100;

/// Header line of every solution listing
pub const SOLUTION_HEADER: &str = "求解结果：";

/// Separator between listing lines. A literal backslash-n keeps the whole
/// listing on the first line of the output file.
pub const SOLUTION_LINE_SEPARATOR: &str = "\\n";

/// Generation parameters, persisted one per line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LpnInstance {
    pub param_count: u64,
    pub equation_count: u64,
    pub error_rate: f64,
    pub initial_params: String,
}

impl LpnInstance {
    pub fn to_file_text(&self) -> String {
        [
            self.param_count.to_string(),
            self.equation_count.to_string(),
            self.error_rate.to_string(),
            self.initial_params.clone(),
        ]
        .join("\n")
    }
}

/// Fabricated solution: listing, probability, seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LpnSolution {
    pub solution: String,
    pub probability: f64,
    pub execution_time: f64,
}

impl LpnSolution {
    pub fn to_file_text(&self) -> String {
        format!(
            "{}\n{:.4}\n{:.2}",
            self.solution, self.probability, self.execution_time
        )
    }

    /// Parse an output file: solution, probability and time on three lines.
    pub fn parse(path: &Path, text: &str) -> ApiResult<Self> {
        let lines: Vec<&str> = text.trim().lines().collect();
        if lines.len() < 3 {
            return Err(ApiError::parse(path, "LPN结果文件格式错误"));
        }
        let number = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|e| ApiError::parse(path, format!("LPN结果文件格式错误: {e}")))
        };
        Ok(Self {
            solution: lines[0].to_string(),
            probability: number(lines[1])?,
            execution_time: number(lines[2])?,
        })
    }
}

/// Fabricate a solution for `param_count` variables.
///
/// Probability lands in [0.70, 0.95], execution time in [1.5, 4.5] seconds.
pub fn solve<R: Rng + ?Sized>(rng: &mut R, param_count: u64) -> LpnSolution {
    LpnSolution {
        solution: solution_listing(rng, param_count),
        probability: round_to(uniform(rng, 0.70, 0.95), 4),
        execution_time: round_to(uniform(rng, 1.5, 4.5), 2),
    }
}

/// `x{i} = <digits>` per variable, capped at [`SOLUTION_LINES_MAX`] with the
/// last three variables after an elision marker.
pub fn solution_listing<R: Rng + ?Sized>(rng: &mut R, param_count: u64) -> String {
    let mut lines = vec![SOLUTION_HEADER.to_string()];

    for i in 1..=param_count.min(SOLUTION_LINES_MAX) {
        lines.push(format!("x{} = {}", i, big_digits(rng)));
    }

    if param_count > SOLUTION_LINES_MAX {
        lines.push("...".to_string());
        for i in param_count - 2..=param_count {
            lines.push(format!("x{} = {}", i, big_digits(rng)));
        }
    }

    lines.join(SOLUTION_LINE_SEPARATOR)
}

fn big_digits<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(15..40);
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_solution_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let s = solve(&mut rng, 10);
            assert!((0.70..=0.95).contains(&s.probability));
            assert!((1.5..=4.5).contains(&s.execution_time));
        }
    }

    #[test]
    fn test_listing_small() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let listing = solution_listing(&mut rng, 3);
        let lines: Vec<&str> = listing.split(SOLUTION_LINE_SEPARATOR).collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SOLUTION_HEADER);
        assert!(lines[3].starts_with("x3 = "));
        assert!(!listing.contains('\n'));
    }

    #[test]
    fn test_listing_elides_large_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let listing = solution_listing(&mut rng, 500);
        let lines: Vec<&str> = listing.split(SOLUTION_LINE_SEPARATOR).collect();

        // header + 100 + "..." + 3 tail lines
        assert_eq!(lines.len(), 105);
        assert_eq!(lines[101], "...");
        assert!(lines[102].starts_with("x498 = "));
        assert!(lines[104].starts_with("x500 = "));
    }

    #[test]
    fn test_output_file_parses_back() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let s = solve(&mut rng, 5);

        let back = LpnSolution::parse(Path::new("output.txt"), &s.to_file_text()).unwrap();

        assert_eq!(back, s);
    }

    #[test]
    fn test_short_output_file_is_parse_error() {
        let err = LpnSolution::parse(Path::new("output.txt"), "only\ntwo").unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
    }
}
