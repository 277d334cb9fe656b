//! Boundary declarations loaded from TOML.
//!
//! A boundary names a source path and the module prefixes code under that
//! path must not import:
//!
//! ```toml
//! [[boundary]]
//! path = "openedx/core/djangolib"
//! forbidden = ["lms", "cms", "common"]
//! ```
//!
//! Raw structs stay private; a [`Boundary`] only exists once validated.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::BoundaryError;
use crate::forbidden::ForbiddenDependencies;

#[derive(Deserialize)]
struct RawBoundary {
    path: String,
    forbidden: Vec<String>,
}

/// Validated boundary.
///
/// Invariant: `path` is non-empty with no surrounding slashes, and
/// `forbidden` has at least one prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBoundary")]
pub struct Boundary {
    path: String,
    forbidden: ForbiddenDependencies,
}

impl TryFrom<RawBoundary> for Boundary {
    type Error = BoundaryError;

    fn try_from(raw: RawBoundary) -> Result<Self, Self::Error> {
        let path = raw.path.trim().trim_matches('/');
        if path.is_empty() {
            return Err(BoundaryError::EmptyPath);
        }
        let forbidden = ForbiddenDependencies::new(raw.forbidden)?;
        if forbidden.is_empty() {
            return Err(BoundaryError::NoForbidden {
                path: path.to_string(),
            });
        }
        Ok(Self {
            path: path.to_string(),
            forbidden,
        })
    }
}

impl Boundary {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn forbidden(&self) -> &ForbiddenDependencies {
        &self.forbidden
    }

    fn applies_to(&self, source_path: &str) -> bool {
        source_path
            .strip_prefix(self.path.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoundaryConfig {
    #[serde(default, rename = "boundary")]
    boundaries: Vec<Boundary>,
}

impl BoundaryConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, BoundaryError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, BoundaryError> {
        let source = fs::read_to_string(path).map_err(|source| BoundaryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            boundaries = config.boundaries.len(),
            "loaded boundary config"
        );
        Ok(config)
    }

    #[must_use]
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Forbidden prefixes for code at `source_path`.
    ///
    /// The most specific boundary containing the path wins, so a nested
    /// package can declare a stricter (or looser) set than its parent.
    #[must_use]
    pub fn forbidden_for(&self, source_path: &str) -> Option<&ForbiddenDependencies> {
        let source_path = source_path.trim().trim_matches('/');
        self.boundaries
            .iter()
            .filter(|boundary| boundary.applies_to(source_path))
            .max_by_key(|boundary| boundary.path.len())
            .map(Boundary::forbidden)
    }
}
