//! Covariance kernels between function values and partial derivatives of the emulated function.
//!
//! The squared exponential kernel
//! `cov(x, x') = sigma^2 * exp(- sum_k (x_k - x'_k)^2 / theta_k^2)`
//! is implemented together with its analytic first and second partial derivatives.

use crate::derivatives::Observation;
use crate::errors::{EmulatorError, Result};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for covariance kernels of a differentiable process f
/// where `x` is the first and `xdash` the second argument of `cov(f(x), f(xdash))`.
pub trait CovarianceKernel<F: Float>: Clone + fmt::Display + Sync {
    /// Dimension of the input space
    fn dim(&self) -> usize;

    /// Prior variance `var(f(x))`
    fn variance(&self) -> F;

    /// `cov(f(x), f(xdash))`
    fn value(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<F>;

    /// `d cov / d x_k`, the covariance between the kth partial derivative at `x` and `f(xdash)`
    fn d_first(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        k: usize,
    ) -> Result<F>;

    /// `d cov / d xdash_k`, the covariance between `f(x)` and the kth partial derivative at `xdash`
    fn d_second(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        k: usize,
    ) -> Result<F>;

    /// `d2 cov / d x_k d xdash_l`, the covariance between the kth partial derivative at `x`
    /// and the lth partial derivative at `xdash`
    fn d2(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        k: usize,
        l: usize,
    ) -> Result<F>;

    /// Covariance between the observation `ox` made at `x` and the observation `odash` made at `xdash`
    fn covariance(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        ox: Observation,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        odash: Observation,
    ) -> Result<F> {
        match (ox, odash) {
            (Observation::Value, Observation::Value) => self.value(x, xdash),
            (Observation::Partial(k), Observation::Value) => self.d_first(x, xdash, k),
            (Observation::Value, Observation::Partial(l)) => self.d_second(x, xdash, l),
            (Observation::Partial(k), Observation::Partial(l)) => self.d2(x, xdash, k, l),
        }
    }
}

/// Anisotropic squared exponential kernel
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponentialKernel<F: Float> {
    /// correlation lengths, one per input dimension
    theta: Array1<F>,
    /// prior standard deviation
    sigma: F,
}

impl<F: Float> SquaredExponentialKernel<F> {
    /// Constructor for a `dim`-dimensional input space.
    ///
    /// A `theta` of length 1 is broadcast to all dimensions.
    pub fn new(theta: &ArrayBase<impl Data<Elem = F>, Ix1>, sigma: F, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(EmulatorError::DimensionMismatch(
                "input space dimension must be positive".to_string(),
            ));
        }
        let theta = match theta.len() {
            1 => Array1::from_elem(dim, theta[0]),
            n if n == dim => theta.to_owned(),
            n => {
                return Err(EmulatorError::DimensionMismatch(format!(
                    "theta has {n} components, expected 1 or {dim}"
                )))
            }
        };
        if let Some(t) = theta.iter().find(|t| !(t.is_finite() && **t > F::zero())) {
            return Err(EmulatorError::InvalidHyperparameter(format!(
                "theta components must be positive, got {t}"
            )));
        }
        if !(sigma.is_finite() && sigma > F::zero()) {
            return Err(EmulatorError::InvalidHyperparameter(format!(
                "sigma must be positive, got {sigma}"
            )));
        }
        Ok(SquaredExponentialKernel { theta, sigma })
    }

    /// Correlation lengths (one per dimension)
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Prior standard deviation
    pub fn sigma(&self) -> F {
        self.sigma
    }

    fn check_points(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        let dim = self.theta.len();
        if x.len() != dim || xdash.len() != dim {
            return Err(EmulatorError::DimensionMismatch(format!(
                "kernel of dimension {dim} evaluated at points of dimension {} and {}",
                x.len(),
                xdash.len()
            )));
        }
        Ok(())
    }

    fn check_component(&self, k: usize) -> Result<()> {
        if k >= self.theta.len() {
            return Err(EmulatorError::DimensionMismatch(format!(
                "derivative along component {k} of a {}-dimensional input",
                self.theta.len()
            )));
        }
        Ok(())
    }

    /// sigma^2 * exp(- sum_k (x_k - xdash_k)^2 / theta_k^2)
    fn exp_term(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        let r = x
            .iter()
            .zip(xdash.iter())
            .zip(self.theta.iter())
            .fold(F::zero(), |acc, ((&a, &b), &t)| {
                let d = a - b;
                acc + d * d / (t * t)
            });
        self.sigma * self.sigma * F::exp(-r)
    }
}

impl<F: Float> CovarianceKernel<F> for SquaredExponentialKernel<F> {
    fn dim(&self) -> usize {
        self.theta.len()
    }

    fn variance(&self) -> F {
        self.sigma * self.sigma
    }

    fn value(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<F> {
        self.check_points(x, xdash)?;
        Ok(self.exp_term(x, xdash))
    }

    /// -2 (x_k - xdash_k) / theta_k^2 * cov(x, xdash)
    fn d_first(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        k: usize,
    ) -> Result<F> {
        self.check_points(x, xdash)?;
        self.check_component(k)?;
        let two = F::cast(2.);
        let tk2 = self.theta[k] * self.theta[k];
        Ok(-two * (x[k] - xdash[k]) / tk2 * self.exp_term(x, xdash))
    }

    /// 2 (x_k - xdash_k) / theta_k^2 * cov(x, xdash)
    fn d_second(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        k: usize,
    ) -> Result<F> {
        Ok(-self.d_first(x, xdash, k)?)
    }

    /// k == l: (2 / theta_k^2 - 4 (x_k - xdash_k)^2 / theta_k^4) * cov(x, xdash)
    /// k != l: -4 (x_k - xdash_k) (x_l - xdash_l) / (theta_k^2 theta_l^2) * cov(x, xdash)
    fn d2(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xdash: &ArrayBase<impl Data<Elem = F>, Ix1>,
        k: usize,
        l: usize,
    ) -> Result<F> {
        self.check_points(x, xdash)?;
        self.check_component(k)?;
        self.check_component(l)?;
        let two = F::cast(2.);
        let four = F::cast(4.);
        let tk2 = self.theta[k] * self.theta[k];
        let dk = x[k] - xdash[k];
        let cov = self.exp_term(x, xdash);
        if k == l {
            Ok((two / tk2 - four * dk * dk / (tk2 * tk2)) * cov)
        } else {
            let tl2 = self.theta[l] * self.theta[l];
            let dl = x[l] - xdash[l];
            Ok(-four * dk * dl / (tk2 * tl2) * cov)
        }
    }
}

impl<F: Float> fmt::Display for SquaredExponentialKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SquaredExponential(theta={}, sigma={})",
            self.theta, self.sigma
        )
    }
}
