//! Short basis - simulated LLL/BKZ reduction, basis quality and lattice generation

use super::{encode_matrix, encode_vector, gaussian, key_value_lines, noise, round_to, uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{E, LN_2, PI};

/// Default LLL Lovász parameter
pub const LLL_DELTA_DEFAULT: f64 = 0.75;

/// Default floating-point precision recorded with a reduction
pub const PRECISION_DEFAULT: f64 = 1e-10;

/// Default BKZ block size
pub const BKZ_BLOCK_SIZE_DEFAULT: i64 = 20;

/// Default BKZ tour count
pub const BKZ_TOURS_DEFAULT: i64 = 8;

// =============================================================================
// LLL
// =============================================================================

#[derive(Debug, Clone)]
pub struct LllParams {
    pub dimension: usize,
    pub lattice_matrix: String,
    pub delta: f64,
    pub precision: f64,
}

impl LllParams {
    pub fn to_file_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LLL".to_string()),
            ("dimension", self.dimension.to_string()),
            ("delta", self.delta.to_string()),
            ("precision", self.precision.to_string()),
            ("originalMatrix", self.lattice_matrix.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LllReduction {
    pub reduced_matrix: String,
    pub shortest_vector: String,
    pub reduction_ratio: f64,
    pub iterations: u64,
    pub execution_time: String,
    pub quality_metric: f64,
    pub hermite_factor: f64,
}

impl LllReduction {
    pub fn to_file_text(&self, dimension: usize, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "LLL".to_string()),
            ("dimension", dimension.to_string()),
            ("reducedMatrix", self.reduced_matrix.clone()),
            ("shortestVector", self.shortest_vector.clone()),
            ("reductionRatio", format!("{:.4}", self.reduction_ratio)),
            ("iterations", self.iterations.to_string()),
            ("executionTime", self.execution_time.clone()),
            ("qualityMetric", format!("{:.6}", self.quality_metric)),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

/// Fabricate an LLL reduction. Entries land in [-50, 50), the shortest
/// vector in [-10, 10).
pub fn lll_reduce<R: Rng + ?Sized>(rng: &mut R, params: &LllParams) -> LllReduction {
    let n = params.dimension;
    let dim = n as f64;

    let reduced: Vec<Vec<i64>> = (0..n)
        .map(|_| (0..n).map(|_| uniform(rng, -50.0, 50.0).floor() as i64).collect())
        .collect();
    let shortest: Vec<i64> = (0..n)
        .map(|_| uniform(rng, -10.0, 10.0).floor() as i64)
        .collect();

    LllReduction {
        reduced_matrix: encode_matrix(&reduced),
        shortest_vector: encode_vector(&shortest),
        reduction_ratio: round_to(uniform(rng, 0.6, 0.9), 4),
        iterations: (dim * dim.ln() + rng.gen::<f64>() * 50.0).floor() as u64,
        execution_time: format!("{:.3}s", dim * 0.1 + rng.gen::<f64>() * 2.0),
        quality_metric: round_to(params.delta.powf(dim / 4.0) * noise(rng, 0.1), 6),
        hermite_factor: round_to(2f64.powf(dim / (4.0 * LN_2)) * noise(rng, 0.2), 6),
    }
}

// =============================================================================
// BKZ
// =============================================================================

#[derive(Debug, Clone)]
pub struct BkzParams {
    pub dimension: usize,
    pub lattice_matrix: String,
    pub block_size: usize,
    pub tours: u64,
    pub precision: f64,
}

impl BkzParams {
    pub fn to_file_text(&self, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "BKZ".to_string()),
            ("dimension", self.dimension.to_string()),
            ("blockSize", self.block_size.to_string()),
            ("tours", self.tours.to_string()),
            ("precision", self.precision.to_string()),
            ("originalMatrix", self.lattice_matrix.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BkzReduction {
    pub reduced_matrix: String,
    pub shortest_vector: String,
    pub reduction_ratio: f64,
    pub total_tours: u64,
    pub execution_time: String,
    pub quality_metric: f64,
    pub hermite_factor: f64,
    pub approximation_factor: f64,
}

impl BkzReduction {
    pub fn to_file_text(&self, params: &BkzParams, timestamp: i64) -> String {
        key_value_lines(&[
            ("algorithm", "BKZ".to_string()),
            ("dimension", params.dimension.to_string()),
            ("blockSize", params.block_size.to_string()),
            ("reducedMatrix", self.reduced_matrix.clone()),
            ("shortestVector", self.shortest_vector.clone()),
            ("reductionRatio", format!("{:.4}", self.reduction_ratio)),
            ("totalTours", self.total_tours.to_string()),
            ("executionTime", self.execution_time.clone()),
            ("qualityMetric", format!("{:.8}", self.quality_metric)),
            ("hermiteFactor", format!("{:.6}", self.hermite_factor)),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

/// Fabricate a BKZ reduction. Entries shrink as the block size approaches
/// the dimension.
pub fn bkz_reduce<R: Rng + ?Sized>(rng: &mut R, params: &BkzParams) -> BkzReduction {
    let n = params.dimension;
    let dim = n as f64;
    let bs = params.block_size as f64;
    let shrink = (1.0 - bs / dim).max(0.1);

    let reduced: Vec<Vec<i64>> = (0..n)
        .map(|_| {
            (0..n)
                .map(|_| (uniform(rng, -40.0, 40.0) * shrink).floor() as i64)
                .collect()
        })
        .collect();
    let shortest: Vec<i64> = (0..n)
        .map(|_| uniform(rng, -8.0, 8.0).floor() as i64)
        .collect();

    let hermite_base = (bs / (2.0 * PI * E)).powf((bs - 1.0) / (2.0 * bs));

    BkzReduction {
        reduced_matrix: encode_matrix(&reduced),
        shortest_vector: encode_vector(&shortest),
        reduction_ratio: round_to(uniform(rng, 0.4, 0.8), 4),
        total_tours: params.tours,
        execution_time: format!("{:.3}s", dim * bs * 0.05 + rng.gen::<f64>() * 5.0),
        quality_metric: round_to(2f64.powf(-dim / (2.0 * bs)) * (1.0 + bs / dim), 8),
        hermite_factor: round_to(hermite_base * noise(rng, 0.1), 6),
        approximation_factor: round_to(2f64.powf(bs / 4.0 + rng.gen::<f64>() * 2.0), 2),
    }
}

// =============================================================================
// Basis Quality
// =============================================================================

/// Which reduction the caller intends to run next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityAlgorithm {
    Auto,
    Lll,
    Bkz,
}

impl QualityAlgorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "lll" => Some(Self::Lll),
            "bkz" => Some(Self::Bkz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub orthogonality_defect: f64,
    pub hadamard_ratio: f64,
    pub root_hermite_factor: f64,
    pub potential_reduction: f64,
    pub basis_length: u64,
    pub conditioning: f64,
    pub sparsity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityEvaluation {
    pub algorithm: QualityAlgorithm,
    pub dimension: usize,
    pub metrics: QualityMetrics,
    pub recommendations: Vec<String>,
    pub timestamp: i64,
}

pub fn evaluate_quality<R: Rng + ?Sized>(
    rng: &mut R,
    dimension: usize,
    algorithm: QualityAlgorithm,
    timestamp: i64,
) -> QualityEvaluation {
    let dim = dimension as f64;
    let reduction_base = if algorithm == QualityAlgorithm::Bkz { 0.7 } else { 0.5 };

    let metrics = QualityMetrics {
        orthogonality_defect: round_to(2f64.powf(dim * rng.gen::<f64>() * 0.5), 2),
        hadamard_ratio: round_to(uniform(rng, 0.1, 0.9), 6),
        root_hermite_factor: round_to(uniform(rng, 1.01, 1.06), 4),
        potential_reduction: round_to(uniform(rng, reduction_base, reduction_base + 0.2), 3),
        basis_length: (dim.sqrt() * uniform(rng, 50.0, 150.0)).floor() as u64,
        conditioning: round_to(10f64.powf(uniform(rng, 2.0, 6.0)), 2),
        sparsity: round_to(uniform(rng, 0.1, 0.4), 3),
    };

    QualityEvaluation {
        algorithm,
        dimension,
        recommendations: quality_recommendations(&metrics),
        metrics,
        timestamp,
    }
}

fn quality_recommendations(metrics: &QualityMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.hadamard_ratio < 0.3 {
        out.push("格基质量较差，建议使用BKZ算法进行约化".to_string());
    }
    if metrics.root_hermite_factor > 1.03 {
        out.push("Hermite因子偏高，可以进一步优化".to_string());
    }
    if metrics.conditioning > 10000.0 {
        out.push("条件数过高，可能存在数值稳定性问题".to_string());
    }
    if metrics.potential_reduction > 0.8 {
        out.push("存在较大约化潜力，建议运行更多轮约化".to_string());
    }
    out
}

// =============================================================================
// Lattice Generation
// =============================================================================

/// Entry distribution of a generated basis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixDistribution {
    /// [-100, 100)
    Uniform,
    /// `floor(N(0,1) * 50)`
    Gaussian,
    /// Dominant diagonal in [100, 1100), off-diagonal in [0, 10)
    Knapsack,
}

impl MatrixDistribution {
    /// Unknown names fall back to uniform
    pub fn parse(name: &str) -> Self {
        match name {
            "gaussian" => Self::Gaussian,
            "knapsack" => Self::Knapsack,
            _ => Self::Uniform,
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, row: usize, col: usize) -> i64 {
        match self {
            Self::Uniform => uniform(rng, -100.0, 100.0).floor() as i64,
            Self::Gaussian => (gaussian(rng) * 50.0).floor() as i64,
            Self::Knapsack if row == col => rng.gen_range(100..1100),
            Self::Knapsack => rng.gen_range(0..10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub dimension: usize,
    pub determinant: Option<String>,
    pub distribution: MatrixDistribution,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixProperties {
    pub dimension: usize,
    /// Fraction of non-zero entries
    pub density: f64,
    pub estimated_determinant: f64,
    pub max_entry: i64,
    pub min_entry: i64,
    pub rank: usize,
    /// Fraction of zero entries
    pub sparsity: f64,
}

#[derive(Debug, Clone)]
pub struct GeneratedLattice {
    pub rows: Vec<Vec<i64>>,
    pub matrix: String,
    pub properties: MatrixProperties,
}

impl GeneratedLattice {
    pub fn to_file_text(&self, request: &MatrixRequest, timestamp: i64) -> String {
        key_value_lines(&[
            ("generationType", "randomLattice".to_string()),
            ("dimension", request.dimension.to_string()),
            ("distributionType", distribution_name(request.distribution).to_string()),
            (
                "determinant",
                request.determinant.clone().unwrap_or_else(|| "auto".to_string()),
            ),
            (
                "seed",
                request.seed.map_or_else(|| "none".to_string(), |s| s.to_string()),
            ),
            ("matrix", self.matrix.clone()),
            ("timestamp", timestamp.to_string()),
        ])
    }
}

fn distribution_name(distribution: MatrixDistribution) -> &'static str {
    match distribution {
        MatrixDistribution::Uniform => "uniform",
        MatrixDistribution::Gaussian => "gaussian",
        MatrixDistribution::Knapsack => "knapsack",
    }
}

/// Generate a square basis. The caller picks the RNG, so a seeded one gives
/// a reproducible matrix.
pub fn generate_matrix<R: Rng + ?Sized>(rng: &mut R, request: &MatrixRequest) -> GeneratedLattice {
    let n = request.dimension;
    let rows: Vec<Vec<i64>> = (0..n)
        .map(|i| (0..n).map(|j| request.distribution.sample(rng, i, j)).collect())
        .collect();

    let entries = rows.iter().flatten();
    let total = (n * n).max(1) as f64;
    let zeros = entries.clone().filter(|v| **v == 0).count() as f64;
    let max_entry = entries.clone().copied().max().unwrap_or(0);
    let min_entry = entries.copied().min().unwrap_or(0);

    let estimated_determinant = request
        .determinant
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .unwrap_or_else(|| 10f64.powf(n as f64 * 0.5 + rng.gen::<f64>() * 5.0).floor());

    GeneratedLattice {
        matrix: encode_matrix(&rows),
        properties: MatrixProperties {
            dimension: n,
            density: round_to(1.0 - zeros / total, 3),
            estimated_determinant,
            max_entry,
            min_entry,
            rank: n,
            sparsity: round_to(zeros / total, 3),
        },
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabricate::decode_matrix;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_lll_shape_and_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        let params = LllParams {
            dimension: 4,
            lattice_matrix: "1,0,0,0;0,1,0,0;0,0,1,0;0,0,0,1;".to_string(),
            delta: LLL_DELTA_DEFAULT,
            precision: PRECISION_DEFAULT,
        };

        let r = lll_reduce(&mut rng, &params);

        let rows = decode_matrix(&r.reduced_matrix).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.len() == 4));
        assert!(rows.iter().flatten().all(|v| (-50..50).contains(v)));
        assert!(r
            .shortest_vector
            .split(',')
            .all(|v| (-10..10).contains(&v.parse::<i64>().unwrap())));
        assert!((0.6..=0.9).contains(&r.reduction_ratio));
        assert!(r.execution_time.ends_with('s'));

        // 0.75^(4/4) within 5%
        assert!((0.7125..=0.7875).contains(&r.quality_metric));
    }

    #[test]
    fn test_bkz_quality_formula() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let params = BkzParams {
            dimension: 40,
            lattice_matrix: "x".to_string(),
            block_size: 20,
            tours: 8,
            precision: PRECISION_DEFAULT,
        };

        let r = bkz_reduce(&mut rng, &params);

        // 2^(-1) * 1.5
        assert_eq!(r.quality_metric, 0.75);
        assert_eq!(r.total_tours, 8);
        assert!((0.4..=0.8).contains(&r.reduction_ratio));
        let rows = decode_matrix(&r.reduced_matrix).unwrap();
        assert!(rows.iter().flatten().all(|v| (-20..=20).contains(v)));
    }

    #[test]
    fn test_quality_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(43);
        for _ in 0..50 {
            let q = evaluate_quality(&mut rng, 16, QualityAlgorithm::Bkz, 0);
            assert!((0.1..=0.9).contains(&q.metrics.hadamard_ratio));
            assert!((1.01..=1.06).contains(&q.metrics.root_hermite_factor));
            assert!((0.7..=0.9).contains(&q.metrics.potential_reduction));
        }
        assert_eq!(QualityAlgorithm::parse("lll"), Some(QualityAlgorithm::Lll));
        assert_eq!(QualityAlgorithm::parse("svp"), None);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let request = MatrixRequest {
            dimension: 6,
            determinant: None,
            distribution: MatrixDistribution::Gaussian,
            seed: Some(1234),
        };

        let a = generate_matrix(&mut ChaCha8Rng::seed_from_u64(1234), &request);
        let b = generate_matrix(&mut ChaCha8Rng::seed_from_u64(1234), &request);

        assert_eq!(a.matrix, b.matrix);
    }

    #[test]
    fn test_knapsack_diagonal_dominates() {
        let mut rng = ChaCha8Rng::seed_from_u64(44);
        let request = MatrixRequest {
            dimension: 5,
            determinant: Some("1000".to_string()),
            distribution: MatrixDistribution::parse("knapsack"),
            seed: None,
        };

        let g = generate_matrix(&mut rng, &request);

        for (i, row) in g.rows.iter().enumerate() {
            assert!(row[i] >= 100);
            assert!(row.iter().enumerate().all(|(j, v)| j == i || (0..10).contains(v)));
        }
        assert_eq!(g.properties.estimated_determinant, 1000.0);
        assert_eq!(g.properties.rank, 5);
        assert!(g.to_file_text(&request, 0).contains("seed=none"));
    }
}
