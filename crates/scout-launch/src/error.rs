//! Launch-configuration error types.

/// Errors from loading, validating, or resolving launch configurations.
#[derive(Debug, thiserror::Error)]
pub enum LaunchConfigError {
    /// Reading the file failed.
    #[error("failed to read launch configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON.
    #[error("failed to parse launch configuration: {0}")]
    Parse(String),

    /// No `.vscode/launch.json` was found walking up from the start path.
    #[error("no .vscode/launch.json found in {0} or parent directories")]
    NotDiscovered(String),

    /// A named configuration does not exist.
    #[error("configuration {0:?} not found")]
    ConfigurationNotFound(String),

    /// A named compound does not exist.
    #[error("compound configuration {0:?} not found")]
    CompoundNotFound(String),

    /// A named input does not exist.
    #[error("input {0:?} not found")]
    InputNotFound(String),

    /// Required `${input:...}` values were not supplied. Surfaced exactly so
    /// the caller can resupply them.
    #[error("missing input values: {}", .0.join(", "))]
    MissingInputs(Vec<String>),

    /// A `${...}` expression could not be resolved.
    #[error("variable resolution failed: {0}")]
    Variable(String),

    /// A structural validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl LaunchConfigError {
    /// The missing input ids if this is a [`MissingInputs`] error.
    pub fn missing_inputs(&self) -> Option<&[String]> {
        match self {
            Self::MissingInputs(ids) => Some(ids),
            _ => None,
        }
    }
}
