use thiserror::Error;

/// A result type for design of experiments generation
pub type Result<T> = std::result::Result<T, DoeError>;

/// An error when generating a design of experiments
#[derive(Error, Debug)]
pub enum DoeError {
    /// When the requested number of samples cannot be handled by the method
    #[error("Invalid sample size: {0}")]
    InvalidSize(String),
    /// When the sampling space definition is malformed
    #[error("Invalid sampling space: {0}")]
    InvalidSpace(String),
    /// When a sampling method setting is out of its domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
