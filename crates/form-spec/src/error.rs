use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading a form document.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("failed to parse form: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to read form from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
