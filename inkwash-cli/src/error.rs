//! CLI error type.

use std::fmt;

use inkwash::InkwashError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is inconsistent.
    Config(String),
    /// Invalid command-line input.
    Usage(String),
    /// Failure reported by the library.
    Inkwash(InkwashError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {}", msg),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Inkwash(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Inkwash(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InkwashError> for CliError {
    fn from(e: InkwashError) -> Self {
        match e {
            InkwashError::Config(msg) => CliError::Config(msg),
            other => CliError::Inkwash(other),
        }
    }
}
