use policyscan_domain::{FixError, IdentityError};
use policyscan_repo::ScanError;

/// Errors surfaced by the application layer to hosts.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request is understood but deliberately unsupported.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Fix(#[from] FixError),

    #[error("diagnostic is not ours: {0}")]
    Identity(#[from] IdentityError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("pipeline has shut down")]
    Stopped,
}

impl AppError {
    pub(crate) fn config(err: anyhow::Error) -> Self {
        AppError::Config(format!("{err:#}"))
    }
}
