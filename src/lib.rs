//! LatticeLab - simulated lattice cryptography backend
//!
//! HTTP service behind the lattice-crypto teaching desktop app. Each endpoint
//! validates its request, optionally loads the result of an earlier step,
//! waits a simulated compute delay, fabricates a plausible result, writes it
//! to the data directory and answers with a uniform JSON envelope.
//!
//! Modules:
//! - `http`: axum router and response envelope
//! - `ops`: one async operation per endpoint
//! - `fabricate`: result fabrication (SDES/SM4/LPN, LWE, LLL/BKZ, signatures)
//! - `store`: file-backed persistence with an in-memory test backend
//! - `validate`: request parameter checks
//! - `pipeline`: shared context, delays, RNG and run spans

pub mod config;
pub mod error;
pub mod fabricate;
pub mod http;
pub mod ops;
pub mod pipeline;
pub mod store;
pub mod validate;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "latticelab";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
