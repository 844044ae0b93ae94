use std::path::PathBuf;
use std::sync::Arc;

/// Errors surfaced by the change-tracking and notification core.
///
/// Variants in the upper half mirror the file-open taxonomy consumed from
/// the underlying storage engine; variants in the lower half originate in
/// this crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("permission denied opening database at {path}")]
    PermissionDenied { path: PathBuf },

    #[error("database already exists at {path}")]
    Exists { path: PathBuf },

    #[error("database not found at {path}")]
    NotFound { path: PathBuf },

    #[error("database at {path} requires a format upgrade")]
    FormatUpgradeRequired { path: PathBuf },

    #[error("lock file at {path} is incompatible with this process")]
    IncompatibleLockFile { path: PathBuf },

    #[error("access error opening {path}: {reason}")]
    AccessError { path: PathBuf, reason: String },

    #[error("history type mismatch reopening {path}")]
    BadHistoryError { path: PathBuf },

    #[error("configuration field `{field}` is incompatible with the already-open database")]
    ConfigMismatch { field: &'static str },

    #[error("storage engine error: {0}")]
    Storage(String),

    #[error("async notifier run failed: {0}")]
    AsyncNotifier(Arc<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;
