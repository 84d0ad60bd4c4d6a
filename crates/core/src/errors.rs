use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while loading the Alert/BOL sources. A missing file is
/// deliberately distinct from a malformed one so the CLI can tell the user
/// to fix their data path rather than their data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data source not found: `{path}` - ensure the Alert and BOL files exist at the configured locations")]
    SourceNotFound { path: PathBuf },
    #[error("could not parse data source `{path}`: {source}")]
    Load { path: PathBuf, source: csv::Error },
    #[error("data source `{path}` is missing required columns: {details}")]
    Schema { path: PathBuf, details: String },
}

/// Failures from the external text-generation collaborator. These are never
/// surfaced as hard errors: callers degrade to a deterministic template and
/// log a warning.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollabError {
    #[error("collaborator is not configured")]
    NotConfigured,
    #[error("collaborator transport failure: {0}")]
    Transport(String),
    #[error("collaborator returned an unusable response: {0}")]
    BadResponse(String),
}
