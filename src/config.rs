//! Configuration
//!
//! TigerStyle: One explicit config, built once at startup and shared by `Arc`.
//!
//! Everything that varies between a real run and a test run lives here:
//! where files go, how long simulated work takes, and how randomness is
//! seeded. Directory names, filenames and message strings are static.

use crate::store::PathMapping;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default HTTP port (matches the desktop front end)
pub const HTTP_PORT_DEFAULT: u16 = 3001;

/// Default data directory
pub const DATA_DIR_DEFAULT: &str = "./data";

/// Probability that a simulated key-recovery attack succeeds
pub const ATTACK_SUCCESS_RATE_DEFAULT: f64 = 0.8;

/// Upper bound for the delay multiplier
pub const DELAY_SCALE_MAX: f64 = 100.0;

// =============================================================================
// Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub bind: SocketAddr,
    /// Root of the per-category data directories
    pub data_dir: PathBuf,
    /// Multiplier applied to every simulated delay (0 disables them)
    pub delay_scale: f64,
    /// Gate threshold for SDES/SM4 attacks, in [0, 1]
    pub attack_success_rate: f64,
    /// Fixed RNG seed; `None` seeds from OS entropy
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), HTTP_PORT_DEFAULT),
            data_dir: PathBuf::from(DATA_DIR_DEFAULT),
            delay_scale: 1.0,
            attack_success_rate: ATTACK_SUCCESS_RATE_DEFAULT,
            rng_seed: None,
        }
    }
}

impl Config {
    /// Config for tests: no delays, fixed seed.
    pub fn for_tests(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            delay_scale: 0.0,
            rng_seed: Some(42),
            ..Self::default()
        }
    }

    /// Canonical path resolver for this data root
    pub fn paths(&self) -> PathMapping {
        PathMapping::new(self.data_dir.clone())
    }

    /// Check ranges. Called once before the server starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=DELAY_SCALE_MAX).contains(&self.delay_scale) {
            return Err(ConfigError::DelayScale(self.delay_scale));
        }
        if !(0.0..=1.0).contains(&self.attack_success_rate) {
            return Err(ConfigError::SuccessRate(self.attack_success_rate));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("delay scale must be in [0, {DELAY_SCALE_MAX}], got {0}")]
    DelayScale(f64),

    #[error("attack success rate must be in [0, 1], got {0}")]
    SuccessRate(f64),

    #[error("data directory cannot be empty")]
    EmptyDataDir,
}
