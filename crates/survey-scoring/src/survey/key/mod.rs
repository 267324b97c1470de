mod artifact;
mod builder;
mod domain;
mod item;
mod ordered;
mod store;

pub use artifact::{ScaleKey, SubscaleRow};
pub use builder::{build_key, create_key};
pub use domain::{Polarity, ResponseBounds};
pub use item::{ItemSpec, SubscaleMap, REVERSAL_MARKER};
pub use store::KeyStore;

use super::ErrorKind;
use std::path::PathBuf;

/// Failures while authoring, persisting, or loading scale keys.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("scale name '{scale}' must be non-empty and free of path separators")]
    InvalidScaleName { scale: String },
    #[error("subscale map must contain at least one subscale")]
    EmptySubscaleMap,
    #[error("subscale names must not be blank")]
    EmptySubscaleName,
    #[error("subscale '{subscale}' is listed more than once")]
    DuplicateSubscale { subscale: String },
    #[error("subscale '{subscale}' has no items")]
    EmptyItemList { subscale: String },
    #[error("subscale '{subscale}' has invalid item spec {spec}; expected a positive id with an optional 'R' suffix")]
    InvalidItemSpec { subscale: String, spec: String },
    #[error("invalid subscale map: {0}")]
    InvalidSubscaleMap(#[source] serde_json::Error),
    #[error("response bounds {min}..{max} are invalid; min must be below max")]
    InvalidBounds { min: i32, max: i32 },
    #[error("no key found for scale '{scale}' in {}", dir.display())]
    NotFound { scale: String, dir: PathBuf },
    #[error("malformed key '{origin}': {detail}")]
    Malformed { origin: String, detail: String },
    #[error("key file {} could not be accessed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("key table {} is invalid: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("key record {} is invalid: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl KeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::InvalidScaleName { .. }
            | KeyError::EmptySubscaleMap
            | KeyError::EmptySubscaleName
            | KeyError::DuplicateSubscale { .. }
            | KeyError::EmptyItemList { .. }
            | KeyError::InvalidItemSpec { .. }
            | KeyError::InvalidSubscaleMap(_)
            | KeyError::InvalidBounds { .. } => ErrorKind::Configuration,
            KeyError::NotFound { .. } => ErrorKind::NotFound,
            KeyError::Malformed { .. } => ErrorKind::Data,
            KeyError::Io { .. } => ErrorKind::Io,
            KeyError::Csv { source, .. } if source.is_io_error() => ErrorKind::Io,
            KeyError::Json { source, .. } if source.is_io() => ErrorKind::Io,
            KeyError::Csv { .. } | KeyError::Json { .. } => ErrorKind::Data,
        }
    }
}

/// Scale names become file name prefixes, so they may not be blank or
/// contain path components.
pub(crate) fn validate_scale_name(scale: &str) -> Result<(), KeyError> {
    let trimmed = scale.trim();
    if trimmed.is_empty()
        || trimmed != scale
        || scale.contains(['/', '\\'])
        || scale == "."
        || scale == ".."
    {
        return Err(KeyError::InvalidScaleName {
            scale: scale.to_string(),
        });
    }
    Ok(())
}
