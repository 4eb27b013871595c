use crate::derivatives::Derivatives;
use crate::errors::{EmulatorError, Result};
use linfa::{Float, ParamGuard};

use ndarray::{array, Array1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default correlation length
pub const EMULATOR_DEFAULT_THETA: f64 = 1.0;
/// Default prior standard deviation
pub const EMULATOR_DEFAULT_SIGMA: f64 = 1.0;

/// A set of validated emulator hyperparameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize",
        deserialize = "F: Deserialize<'de>"
    ))
)]
pub struct EmulatorValidParams<F: Float> {
    /// Correlation lengths, a single value is broadcast to every input component
    pub(crate) theta: Array1<F>,
    /// Prior standard deviation of the emulated function
    pub(crate) sigma: F,
    /// Prior expectation `E[f(x)]` of the emulated function
    pub(crate) prior_mean: F,
    /// Partial derivatives entering the augmented observation vector
    pub(crate) derivatives: Derivatives,
}

impl<F: Float> Default for EmulatorValidParams<F> {
    fn default() -> EmulatorValidParams<F> {
        EmulatorValidParams {
            theta: array![F::cast(EMULATOR_DEFAULT_THETA)],
            sigma: F::cast(EMULATOR_DEFAULT_SIGMA),
            prior_mean: F::zero(),
            derivatives: Derivatives::none(),
        }
    }
}

impl<F: Float> EmulatorValidParams<F> {
    /// Get correlation lengths
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Get prior standard deviation
    pub fn sigma(&self) -> F {
        self.sigma
    }

    /// Get prior expectation
    pub fn prior_mean(&self) -> F {
        self.prior_mean
    }

    /// Get derivative directives
    pub fn derivatives(&self) -> &Derivatives {
        &self.derivatives
    }
}

#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters that can be specified for the
/// [Bayes linear emulator](crate::BayesLinearEmulator).
pub struct EmulatorParams<F: Float>(pub(crate) EmulatorValidParams<F>);

impl<F: Float> Default for EmulatorParams<F> {
    fn default() -> Self {
        Self(EmulatorValidParams::default())
    }
}

impl<F: Float> EmulatorParams<F> {
    /// A constructor for emulator parameters given correlation lengths and prior standard deviation
    pub fn new(theta: Array1<F>, sigma: F) -> EmulatorParams<F> {
        Self(EmulatorValidParams {
            theta,
            sigma,
            ..Default::default()
        })
    }

    /// A constructor for emulator parameters from validated parameters
    pub fn new_from_valid(params: &EmulatorValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set correlation lengths, one per input component or a single broadcast value.
    pub fn theta(mut self, theta: Array1<F>) -> Self {
        self.0.theta = theta;
        self
    }

    /// Set prior standard deviation.
    pub fn sigma(mut self, sigma: F) -> Self {
        self.0.sigma = sigma;
        self
    }

    /// Set prior expectation of the function values (derivatives have zero prior mean).
    pub fn prior_mean(mut self, prior_mean: F) -> Self {
        self.0.prior_mean = prior_mean;
        self
    }

    /// Set partial derivatives observed in addition to the function values.
    pub fn derivatives(mut self, derivatives: Derivatives) -> Self {
        self.0.derivatives = derivatives;
        self
    }
}

impl<F: Float> From<EmulatorValidParams<F>> for EmulatorParams<F> {
    fn from(valid: EmulatorValidParams<F>) -> Self {
        EmulatorParams(valid)
    }
}

impl<F: Float> ParamGuard for EmulatorParams<F> {
    type Checked = EmulatorValidParams<F>;
    type Error = EmulatorError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let theta = &self.0.theta;
        if theta.is_empty() {
            return Err(EmulatorError::InvalidHyperparameter(
                "`theta` cannot be empty".to_string(),
            ));
        }
        if let Some(t) = theta.iter().find(|t| !(t.is_finite() && **t > F::zero())) {
            return Err(EmulatorError::InvalidHyperparameter(format!(
                "`theta` components should be positive, got {t}"
            )));
        }
        let sigma = self.0.sigma;
        if !(sigma.is_finite() && sigma > F::zero()) {
            return Err(EmulatorError::InvalidHyperparameter(format!(
                "`sigma` should be positive, got {sigma}"
            )));
        }
        if !self.0.prior_mean.is_finite() {
            return Err(EmulatorError::InvalidHyperparameter(format!(
                "`prior_mean` should be finite, got {}",
                self.0.prior_mean
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
