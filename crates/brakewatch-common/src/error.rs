//! Common error type used throughout brakewatch.
//!
//! Library code returns [`Error`]; the binary wraps it with `anyhow` context at
//! its edges.

/// Common error type for brakewatch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested file or directory was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external transcoder could not be run to completion.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Program name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The directory watcher could not be set up.
    #[error("Watch error: {0}")]
    Watch(String),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Watch error.
    pub fn watch<S: Into<String>>(msg: S) -> Self {
        Self::Watch(msg.into())
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::InvalidInput(_) => 400,
            Error::Tool { .. } => 502,
            Error::Io(_) | Error::Watch(_) | Error::Config(_) | Error::Internal(_) => 500,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
