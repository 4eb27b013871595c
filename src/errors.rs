use thiserror::Error;

/// A result type for emulator facade errors
pub type Result<T> = std::result::Result<T, BlemuError>;

/// An error raised by the emulator facade
#[derive(Error, Debug)]
pub enum BlemuError {
    /// When design generation fails
    #[error("DoE error: {0}")]
    DoeError(#[from] blemu_doe::DoeError),
    /// When covariance assembly or adjustment fails
    #[error("Emulator error: {0}")]
    EmulatorError(#[from] blemu_linear::EmulatorError),
    /// When arrays given to the facade have inconsistent shapes
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When a physical input space is invalid
    #[error("Invalid space: {0}")]
    InvalidSpace(String),
    /// When a problem description is inconsistent
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),
    /// When IO fails
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    /// When a problem file cannot be parsed
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
}
