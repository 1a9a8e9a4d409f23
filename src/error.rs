use thiserror::Error;

/// Main error type for the video-thumbs library
#[derive(Error, Debug)]
pub enum ThumbError {
    #[error("External tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Preview generation error: {0}")]
    Preview(#[from] PreviewError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Failures of the transcoder or image tool processes
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("{program} did not finish within {seconds}s and was killed")]
    TimedOut { program: String, seconds: u64 },
}

/// Pipeline-level errors
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("No preview image was produced at {path}")]
    NoOutputProduced { path: String },

    #[error("Placeholder rendering failed: {reason}")]
    PlaceholderFailed { reason: String },

    #[error("Invalid processing request: {details}")]
    InvalidRequest { details: String },
}

/// Event routing and persistence errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Persisting {name} failed: {reason}")]
    PersistFailed { name: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ThumbError
pub type Result<T> = std::result::Result<T, ThumbError>;

impl ThumbError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // IO errors might be temporary
            Self::Io(_) => true,
            // A slow transcoder may finish on a quieter machine
            Self::Tool(ToolError::TimedOut { .. }) => true,
            Self::Preview(PreviewError::NoOutputProduced { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Tool(ToolError::SpawnFailed { program, .. }) => {
                format!("Could not run '{}'. Please check it is installed and the configured path is correct.", program)
            }
            Self::Preview(PreviewError::NoOutputProduced { path }) => {
                format!("No preview could be written to '{}'. Please check disk space and permissions.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
