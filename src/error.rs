//! Error types shared by the engine, backends and config layer

use std::fmt;

/// Result type alias for dashmin operations
pub type DashResult<T> = Result<T, DashError>;

/// Errors that can occur while refreshing the dashboard
#[derive(Debug)]
pub enum DashError {
    /// Establishing or authenticating a database connection failed
    Connection(String),

    /// The fan-out itself failed (a worker panicked or was cancelled)
    Engine(String),

    /// Configuration is invalid or could not be parsed
    Config(String),

    /// The requested backend was compiled out
    Unsupported(String),

    /// I/O error (config file access, terminal, etc.)
    Io(std::io::Error),
}

impl fmt::Display for DashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // driver messages already read "failed to connect to ..."
            DashError::Connection(msg) => f.write_str(msg),
            DashError::Engine(msg) => write!(f, "refresh failed: {}", msg),
            DashError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            DashError::Unsupported(msg) => write!(f, "unsupported backend: {}", msg),
            DashError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DashError {
    fn from(err: std::io::Error) -> Self {
        DashError::Io(err)
    }
}

impl From<tokio::task::JoinError> for DashError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            DashError::Engine(format!("query worker panicked: {}", err))
        } else {
            DashError::Engine(format!("query worker cancelled: {}", err))
        }
    }
}

