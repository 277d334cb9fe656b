use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to resolve a module or one of its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("no module named '{module}'")]
    NotFound { module: String },
    /// The module is a forbidden dependency of the code under test.
    #[error("You aren't allowed to import anything from {module}!!")]
    Forbidden { module: String },
    #[error("module '{module}' has no attribute '{attr}'")]
    MissingAttribute { module: String, attr: String },
    #[error("attribute '{attr}' of module '{module}' is not a {expected}")]
    TypeMismatch {
        module: String,
        attr: String,
        expected: &'static str,
    },
}

impl ImportError {
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

/// Invalid forbidden-dependency declarations or boundary files.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("forbidden dependency names must not be empty")]
    EmptyPrefix,
    #[error("'{prefix}' is not a dotted module name")]
    InvalidPrefix { prefix: String },
    #[error("boundary path must not be empty")]
    EmptyPath,
    #[error("boundary '{path}' forbids nothing")]
    NoForbidden { path: String },
    #[error("failed to read boundary file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid boundary file: {0}")]
    Parse(#[from] toml::de::Error),
}
