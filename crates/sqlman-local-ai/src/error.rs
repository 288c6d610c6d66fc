//! Error types for local AI operations.

use thiserror::Error;

/// Errors that can occur during local AI operations.
#[derive(Debug, Error)]
pub enum LocalAIError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error response.
    #[error("API error: {0}")]
    Api(String),

    /// Server answered with a body that does not match the expected shape.
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },

    /// Server is not running or not reachable.
    #[error("Server not running at {0}. Start it with: sqlman start")]
    ServerNotRunning(String),

    /// Server failed to start.
    #[error("Failed to start server: {0}")]
    ServerStartFailed(String),

    /// A server process is already owned by this manager.
    #[error("Server is already running (PID: {0})")]
    ServerAlreadyRunning(u32),

    /// Stop was requested but no server process is owned by this manager.
    #[error("No inference server process is running")]
    ServerNotStarted,

    /// The Python entry point of the server is missing.
    #[error("Server script not found at {0}")]
    ServerScriptNotFound(String),

    /// No Python interpreter on PATH.
    #[error("Python interpreter not found: {0}")]
    RuntimeNotFound(String),

    /// The interpreter exists but its version could not be determined.
    #[error("Failed to check Python version: {0}")]
    RuntimeCheckFailed(String),

    /// An external command exited unsuccessfully.
    #[error("`{program}` failed: {stderr}")]
    CommandFailed { program: String, stderr: String },

    /// The virtual environment directory is missing or incomplete.
    #[error("Virtual environment not found or not properly set up at {0}")]
    EnvironmentNotFound(String),

    /// The server was started before the environment was activated.
    #[error("Virtual environment has not been activated")]
    EnvironmentNotActivated,

    /// Operation is not available on this platform.
    #[error("{0}")]
    Unsupported(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
