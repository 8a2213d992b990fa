//! Closed error taxonomy for the dupfiles core, with a stable exit-code mapping.
//!
//! Every fallible core API returns `Result<T, DupfilesError>`. The CLI boundary
//! (`main.rs`) is the only place that converts a `DupfilesError` into process
//! exit behavior — it never re-derives an exit code from the error's `Display`
//! text, it always asks [`DupfilesError::exit_code`].

use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DupfilesError {
    #[error("not found: {path}")]
    NotFound { path: Utf8PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: Utf8PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid report {path} at line {line} (byte offset {byte_offset}): {message}")]
    InvalidReport {
        path: Utf8PathBuf,
        line: u64,
        byte_offset: u64,
        message: String,
    },

    #[error("unknown hash algorithm: {name}")]
    UnknownAlgorithm { name: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: Utf8PathBuf },

    #[error("internal invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("overflow computing {what}")]
    Overflow { what: String },

    #[error("bad argument: {message}")]
    BadArgument { message: String },
}

impl DupfilesError {
    /// The exit code this error maps to, per the stable §6 contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            DupfilesError::NotFound { .. } => 1,
            DupfilesError::PermissionDenied { .. } => 1,
            DupfilesError::Io { .. } => 6,
            DupfilesError::InvalidReport { .. } => 9,
            DupfilesError::UnknownAlgorithm { .. } => 8,
            DupfilesError::AlreadyExists { .. } => 3,
            DupfilesError::InvariantViolation { .. } => 11,
            DupfilesError::Cancelled => 6,
            DupfilesError::Overflow { .. } => 6,
            DupfilesError::BadArgument { .. } => 10,
        }
    }

    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => DupfilesError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => DupfilesError::PermissionDenied { path },
            _ => DupfilesError::Io { path, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, DupfilesError>;
