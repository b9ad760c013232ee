//! PathMapping - canonical file addressing
//!
//! TigerStyle: `(category, filename) → path`, total and deterministic.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operation families, one data subdirectory each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// LPN, SDES and SM4 share one directory
    Quantum,
    Analysis,
    KeyGen,
    ShortBasis,
    Signature,
}

impl Category {
    /// Directory name under the data root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Quantum => "quantum",
            Self::Analysis => "analysis",
            Self::KeyGen => "keyGen",
            Self::ShortBasis => "shortBasis",
            Self::Signature => "signature",
        }
    }

    /// Parse a category as used in URLs, including per-algorithm aliases.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.to_lowercase().as_str() {
            "quantum" | "lpn" | "sdes" | "des" | "sm4" => Some(Self::Quantum),
            "analysis" => Some(Self::Analysis),
            "keygen" => Some(Self::KeyGen),
            "shortbasis" => Some(Self::ShortBasis),
            "signature" => Some(Self::Signature),
            _ => None,
        }
    }

    /// All categories in bootstrap order
    pub fn all() -> &'static [Category] {
        &[
            Self::Quantum,
            Self::Analysis,
            Self::KeyGen,
            Self::ShortBasis,
            Self::Signature,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Resolves canonical paths under one data root
#[derive(Debug, Clone)]
pub struct PathMapping {
    root: PathBuf,
}

impl PathMapping {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a category
    pub fn dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Path of a fixed, known-good filename
    pub fn path(&self, category: Category, filename: &str) -> PathBuf {
        debug_assert!(is_plain_segment(filename), "bad canonical filename {filename}");
        self.dir(category).join(filename)
    }

    /// Resolve a caller-supplied category and filename.
    ///
    /// Unknown categories map to a directory of the same name. Both segments
    /// must be plain names: no separators, no `..`.
    pub fn resolve(&self, category: &str, filename: &str) -> ApiResult<PathBuf> {
        if !is_plain_segment(category) {
            return Err(ApiError::invalid("category", "非法的目录名"));
        }
        if !is_plain_segment(filename) {
            return Err(ApiError::invalid("filename", "非法的文件名"));
        }

        let dir = match Category::from_alias(category) {
            Some(known) => self.dir(known),
            None => self.root.join(category),
        };
        Ok(dir.join(filename))
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}
