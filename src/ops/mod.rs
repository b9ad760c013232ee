//! Operations
//!
//! TigerStyle: One async function per endpoint, grouped by family.
//!
//! Every operation has the shape `async fn(&Context, Params) -> ApiResult<Outcome>`
//! and walks the same stages: validate the body, read any prior result,
//! delay, fabricate under the RNG lock, write result then input files, and
//! return the response payload. Filenames are fixed per family.

pub mod analysis;
pub mod files;
pub mod keygen;
pub mod quantum;
pub mod shortbasis;
pub mod signature;

use std::path::Path;

/// Path as it appears in response payloads
pub(crate) fn shown(path: &Path) -> String {
    path.display().to_string()
}

/// Count as `usize`. Only for values already range-checked to be non-negative.
pub(crate) fn as_count(value: i64) -> usize {
    debug_assert!(value >= 0, "count must be validated first: {value}");
    usize::try_from(value).unwrap_or(0)
}
