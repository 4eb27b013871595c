//! `blemu` is a toolbox to emulate an expensive deterministic simulator with a
//! derivative-informed [Bayes linear](https://en.wikipedia.org/wiki/Bayes_linear_statistics) emulator.
//!
//! The toolbox is split in several crates re-exported here:
//! * `blemu-doe` generates maximin Latin hypercube designs choosing the simulator runs,
//! * `blemu-linear` assembles the prior covariance of values and partial derivatives
//!   and adjusts the emulator by the observed runs.
//!
//! The entry points of this crate work on 2-dimensional `f64` problems normalized
//! to the unit square and recompute everything they need at each call.
//! To adjust many query sets against the same observations, fit a
//! [BayesLinearEmulator] once and reuse it.
//!
//! # Example
//!
//! ```no_run
//! use blemu::{adjust_grid, generate_design, grid, Derivatives, EmulatorParams};
//! use ndarray::{array, Array1, Axis};
//!
//! # fn main() -> blemu::Result<()> {
//! // choose 16 simulator runs
//! let xd = generate_design(16, 15)?;
//! // simulator outputs and their derivatives along x1 at the design points
//! let values = xd.map_axis(Axis(1), |x| 1000. * x[0] * x[1]);
//! let dx1 = xd.map_axis(Axis(1), |x| 1000. * x[1]);
//! let d = Array1::from_iter(values.iter().chain(dx1.iter()).copied());
//!
//! let params = EmulatorParams::new(array![0.25], 250.)
//!     .prior_mean(350.)
//!     .derivatives(Derivatives::all_points(&[0]));
//! let (expectations, variances) = adjust_grid(&grid(50, 50)?, &xd, &d, params)?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod problem;
mod scaling;

pub use errors::*;
pub use problem::*;
pub use scaling::*;

pub use blemu_doe::{min_distance, Grid, Lhs, LhsKind, SamplingMethod};
pub use blemu_linear::{
    BayesLinearEmulator, BlockMap, CovarianceKernel, DerivativePoints, Derivatives,
    EmulatorError, EmulatorParams, EmulatorValidParams, Observation, SquaredExponentialKernel,
};

use ndarray::{array, Array1, Array2, ArrayBase, Data, Ix1, Ix2};

/// Dimension of the input space handled by the facade
pub const INPUT_DIM: usize = 2;

/// Generates `nl` points of a maximin Latin hypercube design of the unit square
/// reproducibly from `seed`.
pub fn generate_design(nl: usize, seed: u64) -> Result<Array2<f64>> {
    Ok(Lhs::unit(INPUT_DIM, seed)?.sample(nl)?)
}

/// Prior covariance `Var_D` of the augmented observation vector and its layout for
/// design points `xd`, derivative directives and hyperparameters `theta`, `sigma`.
pub fn assemble(
    xd: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    derivatives: &Derivatives,
    theta: &Array1<f64>,
    sigma: f64,
) -> Result<(Array2<f64>, BlockMap)> {
    let kernel = SquaredExponentialKernel::new(theta, sigma, xd.ncols())?;
    let map = BlockMap::new(xd.nrows(), xd.ncols(), derivatives)?;
    let var = blemu_linear::assemble(&kernel, xd, &map)?;
    Ok((var, map))
}

/// Adjusted expectation and variance at `x` of the emulator built from design `xd`,
/// augmented observations `d` and hyperparameters `params`.
pub fn adjust(
    x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    xd: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    d: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    params: EmulatorParams<f64>,
) -> Result<(f64, f64)> {
    Ok(params.fit(xd, d)?.adjust(x)?)
}

/// Adjusted expectations and variances at the rows of `grid`.
///
/// `Var_D` is factorized once and shared by every query point.
pub fn adjust_grid(
    grid: &ArrayBase<impl Data<Elem = f64> + Sync, Ix2>,
    xd: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    d: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    params: EmulatorParams<f64>,
) -> Result<(Array1<f64>, Array1<f64>)> {
    Ok(params.fit(xd, d)?.adjust_grid(grid)?)
}

/// Rectangular `n1 x n2` grid of query points over the unit square, as a
/// `(n1 * n2, 2)` matrix where the second component varies fastest.
pub fn grid(n1: usize, n2: usize) -> Result<Array2<f64>> {
    Ok(Grid::new(&array![[0., 1.], [0., 1.]])?.levels(&[n1, n2])?)
}
