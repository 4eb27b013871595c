use thiserror::Error;

/// A result type for Bayes linear emulation
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// An error when assembling covariances or adjusting a [`BayesLinearEmulator`](crate::BayesLinearEmulator)
#[derive(Error, Debug)]
pub enum EmulatorError {
    /// When points, design, hyperparameters or observations have inconsistent sizes
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When theta or sigma is not strictly positive and finite
    #[error("Invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),
    /// When the derivative directives refer to unknown dimensions or design points
    #[error("Invalid derivatives: {0}")]
    InvalidDerivatives(String),
    /// When the prior covariance of the observations cannot be inverted
    #[error("Singular covariance matrix: {0}")]
    SingularMatrix(String),
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When the adjusted variance is negative beyond rounding errors
    #[error("Negative adjusted variance: {variance}")]
    NegativeVariance {
        /// the offending adjusted variance
        variance: f64,
    },
    /// When the adjustment fails at one point of a query grid
    #[error("Adjustment failed at query point #{index}: {source}")]
    AtQueryPoint {
        /// index of the query point in the grid
        index: usize,
        /// underlying failure
        source: Box<EmulatorError>,
    },
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValue(String),
}
