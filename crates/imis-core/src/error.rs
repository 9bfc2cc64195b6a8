use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("no roster file path has been configured")]
    MissingSource,
    #[error("invalid roster file {origin}: {reason}")]
    InvalidFormat { origin: String, reason: String },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("requested {requested} members but only {available} are eligible")]
    InsufficientCandidates { requested: usize, available: usize },
}

impl RosterError {
    pub fn invalid_format(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RosterError::MissingSource => ErrorKind::MissingSource,
            RosterError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            RosterError::Io { .. } => ErrorKind::Io,
            RosterError::InsufficientCandidates { .. } => ErrorKind::InsufficientCandidates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingSource,
    InvalidFormat,
    Io,
    InsufficientCandidates,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingSource => "missing-source",
            ErrorKind::InvalidFormat => "invalid-format",
            ErrorKind::Io => "io",
            ErrorKind::InsufficientCandidates => "insufficient-candidates",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
