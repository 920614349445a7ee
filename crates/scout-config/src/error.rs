//! Configuration error types.

/// Errors from loading or validating the server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for the config schema.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A field value is out of range.
    #[error("invalid config value for {field}: {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },
}
