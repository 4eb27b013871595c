use crate::assembly::{assemble, cross_covariance};
use crate::derivatives::BlockMap;
use crate::errors::{EmulatorError, Result};
use crate::kernel::{CovarianceKernel, SquaredExponentialKernel};
use crate::parameters::{EmulatorParams, EmulatorValidParams};

use linfa::{Float, ParamGuard};
use linfa_linalg::{cholesky::*, triangular::*};
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// Bayes linear emulator adjusted by an augmented observation vector `D`
/// made of function values and, optionally, partial derivatives.
///
/// At a query point `x`, the adjusted expectation and variance are
///
/// ```text
/// E_D[f(x)]   = E[f(x)] + Cov[f(x), D] Var[D]^-1 (D - E[D])
/// Var_D[f(x)] = Var[f(x)] - Cov[f(x), D] Var[D]^-1 Cov[D, f(x)]
/// ```
///
/// `Var[D]` is factorized once when the emulator is built and the factor is reused
/// for every query point.
///
/// # Example
///
/// ```no_run
/// use blemu_linear::{BayesLinearEmulator, Derivatives};
/// use ndarray::array;
///
/// let xd = array![[0.1, 0.2], [0.5, 0.9], [0.8, 0.4]];
/// // 3 values followed by 3 partial derivatives along x1
/// let d = array![1.0, 2.5, 0.3, 0.1, -0.4, 2.0];
///
/// let emulator = BayesLinearEmulator::params(array![0.25], 1.0)
///     .prior_mean(1.0)
///     .derivatives(Derivatives::all_points(&[0]))
///     .fit(&xd, &d)
///     .expect("emulator adjusted");
/// let (expectation, variance) = emulator.adjust(&array![0.3, 0.5]).expect("adjustment");
/// ```
#[derive(Debug, Clone)]
pub struct BayesLinearEmulator<F: Float, K: CovarianceKernel<F> = SquaredExponentialKernel<F>> {
    /// Covariance kernel
    kernel: K,
    /// Prior expectation of the function values
    prior_mean: F,
    /// Design points (n, nx)
    xd: Array2<F>,
    /// Layout of the augmented observation vector
    block_map: BlockMap,
    /// Prior covariance of the augmented observation vector
    var_d: Array2<F>,
    /// Lower Cholesky factor of `var_d`
    var_chol: Array2<F>,
    /// `Var[D]^-1 (D - E[D])`
    weights: Array1<F>,
}

impl<F: Float> BayesLinearEmulator<F, SquaredExponentialKernel<F>> {
    /// Emulator parameters constructor given correlation lengths and prior standard deviation
    pub fn params(theta: Array1<F>, sigma: F) -> EmulatorParams<F> {
        EmulatorParams::new(theta, sigma)
    }
}

impl<F: Float> EmulatorValidParams<F> {
    /// Adjusts the emulator by the augmented observations `d` laid out as the values
    /// observed at the `xd` design points followed by the derivative blocks
    /// in ascending component order.
    pub fn fit(
        &self,
        xd: &ArrayBase<impl Data<Elem = F>, Ix2>,
        d: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<BayesLinearEmulator<F>> {
        let kernel = SquaredExponentialKernel::new(&self.theta, self.sigma, xd.ncols())?;
        let block_map = BlockMap::new(xd.nrows(), xd.ncols(), &self.derivatives)?;
        BayesLinearEmulator::with_kernel(kernel, self.prior_mean, xd, block_map, d)
    }
}

impl<F: Float> EmulatorParams<F> {
    /// Checks the hyperparameters and adjusts the emulator (see [EmulatorValidParams::fit])
    pub fn fit(
        &self,
        xd: &ArrayBase<impl Data<Elem = F>, Ix2>,
        d: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<BayesLinearEmulator<F>> {
        self.check_ref()?.fit(xd, d)
    }
}

impl<F: Float, K: CovarianceKernel<F>> BayesLinearEmulator<F, K> {
    /// Builds the emulator for a given kernel, design `xd`, layout `block_map`
    /// and augmented observations `d`.
    pub fn with_kernel(
        kernel: K,
        prior_mean: F,
        xd: &ArrayBase<impl Data<Elem = F>, Ix2>,
        block_map: BlockMap,
        d: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Self> {
        if d.len() != block_map.len() {
            return Err(EmulatorError::DimensionMismatch(format!(
                "observation vector has {} entries, block map expects {}",
                d.len(),
                block_map.len()
            )));
        }
        let now = Instant::now();
        let var_d = assemble(&kernel, xd, &block_map)?;
        let var_chol = factorize(&var_d)?;

        let residuals = d - &block_map.prior_expectation(prior_mean);
        let weights = solve_spd(&var_chol, &residuals.insert_axis(Axis(1)))?.remove_axis(Axis(1));
        debug!(
            "Var_D of size {} factorized in {:?} ms",
            var_d.nrows(),
            now.elapsed().as_millis()
        );

        Ok(BayesLinearEmulator {
            kernel,
            prior_mean,
            xd: xd.to_owned(),
            block_map,
            var_d,
            var_chol,
            weights,
        })
    }

    /// Adjusted expectation and variance of the function value at `x`
    pub fn adjust(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<(F, F)> {
        if x.iter().any(|v| !v.is_finite()) {
            return Err(EmulatorError::InvalidValue(format!(
                "non finite query point {x}"
            )));
        }
        let cov = cross_covariance(&self.kernel, x, &self.xd, &self.block_map)?;
        let expectation = self.prior_mean + cov.dot(&self.weights);

        let rt = solve_lower(&self.var_chol, &cov.insert_axis(Axis(1)))?;
        let variance = self.kernel.variance() - rt.mapv(|v| v * v).sum();

        if !(expectation.is_finite() && variance.is_finite()) {
            return Err(EmulatorError::SingularMatrix(format!(
                "non finite adjustment ({expectation}, {variance})"
            )));
        }
        if variance < -self.variance_tolerance() {
            return Err(EmulatorError::NegativeVariance {
                variance: variance.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok((expectation, variance))
    }

    /// Adjusted expectations and variances at the rows of `x` given as a (n, nx) matrix.
    ///
    /// Query points are processed in parallel, the first failing point is reported
    /// with its row index.
    pub fn adjust_grid(
        &self,
        x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        if x.ncols() != self.kernel.dim() {
            return Err(EmulatorError::DimensionMismatch(format!(
                "query points of dimension {} for an emulator of dimension {}",
                x.ncols(),
                self.kernel.dim()
            )));
        }
        let now = Instant::now();
        let res = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                self.adjust(&x.row(i))
                    .map_err(|e| EmulatorError::AtQueryPoint {
                        index: i,
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "{} query points adjusted in {:?} ms",
            x.nrows(),
            now.elapsed().as_millis()
        );
        let (expectations, variances): (Vec<F>, Vec<F>) = res.into_iter().unzip();
        Ok((Array1::from(expectations), Array1::from(variances)))
    }

    /// Standardized residual `(y - E_D[f(x)]) / sqrt(Var_D[f(x)])` of a simulator output
    /// `y` observed at `x` but not used to adjust the emulator
    pub fn standardized_residual(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>, y: F) -> Result<F> {
        let (expectation, variance) = self.adjust(x)?;
        if variance <= F::zero() {
            return Err(EmulatorError::InvalidValue(format!(
                "standardized residual undefined for adjusted variance {variance}"
            )));
        }
        Ok((y - expectation) / variance.sqrt())
    }

    /// Negative adjusted variances above `-tolerance` are attributed to rounding errors
    pub fn variance_tolerance(&self) -> F {
        F::epsilon().sqrt() * self.kernel.variance()
    }

    /// Covariance kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Prior expectation of the function values
    pub fn prior_mean(&self) -> F {
        self.prior_mean
    }

    /// Design points
    pub fn design(&self) -> &Array2<F> {
        &self.xd
    }

    /// Layout of the augmented observation vector
    pub fn block_map(&self) -> &BlockMap {
        &self.block_map
    }

    /// Prior covariance `Var[D]` of the augmented observation vector
    pub fn prior_covariance(&self) -> &Array2<F> {
        &self.var_d
    }
}

impl<F: Float, K: CovarianceKernel<F>> fmt::Display for BayesLinearEmulator<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BayesLinear(kernel={}, prior_mean={}, points={}, observations={})",
            self.kernel,
            self.prior_mean,
            self.block_map.n_points(),
            self.block_map.len()
        )
    }
}

/// Lower Cholesky factor of `var`, failing when `var` is not numerically positive definite
fn factorize<F: Float>(var: &Array2<F>) -> Result<Array2<F>> {
    let chol = var
        .cholesky()
        .map_err(|e| EmulatorError::SingularMatrix(format!("Cholesky factorization: {e}")))?;
    if let (Ok(lo), Ok(hi)) = (chol.diag().min(), chol.diag().max()) {
        debug!("Cholesky pivots of Var_D range from {lo} to {hi}");
    }
    Ok(chol)
}

/// Solves `L y = b` for the lower triangular factor `L`
fn solve_lower<F: Float>(chol: &Array2<F>, b: &Array2<F>) -> Result<Array2<F>> {
    Ok(chol.solve_triangular(b, UPLO::Lower)?)
}

/// Solves `L L^t y = b` given the lower Cholesky factor `L`
fn solve_spd<F: Float>(chol: &Array2<F>, b: &Array2<F>) -> Result<Array2<F>> {
    let rho = solve_lower(chol, b)?;
    let y = chol.t().solve_triangular_into(rho, UPLO::Upper)?;
    if y.iter().any(|v| !v.is_finite()) {
        return Err(EmulatorError::SingularMatrix(
            "non finite solution of Var_D y = D - E_D".to_string(),
        ));
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivatives::Derivatives;
    use approx::assert_abs_diff_eq;
    use blemu_doe::{Lhs, SamplingMethod};
    use ndarray::{array, Array, ArrayView1};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn sir_like(x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> f64 {
        1000. * (1. - (-2. * x[0]).exp()) * (0.4 + 0.6 * x[1] * x[1]) / (1. - (-2f64).exp())
    }

    fn grad_sir_like(x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> (f64, f64) {
        let c = 1000. / (1. - (-2f64).exp());
        (
            c * 2. * (-2. * x[0]).exp() * (0.4 + 0.6 * x[1] * x[1]),
            c * (1. - (-2. * x[0]).exp()) * 1.2 * x[1],
        )
    }

    fn training(nt: usize, dims: &[usize]) -> (Array2<f64>, Array1<f64>) {
        let xd = Lhs::<f64, _>::unit(2, 15).unwrap().sample(nt).unwrap();
        let mut d: Vec<f64> = xd.rows().into_iter().map(|x| sir_like(&x)).collect();
        for &k in dims {
            d.extend(xd.rows().into_iter().map(|x| {
                let g = grad_sir_like(&x);
                if k == 0 {
                    g.0
                } else {
                    g.1
                }
            }));
        }
        (xd, Array1::from(d))
    }

    #[test]
    fn test_interpolation_at_design_points() {
        let (xd, d) = training(10, &[]);
        let emulator = BayesLinearEmulator::params(array![0.25], 250.)
            .prior_mean(350.)
            .fit(&xd, &d)
            .expect("emulator adjusted");
        for (i, x) in xd.rows().into_iter().enumerate() {
            let (e, v) = emulator.adjust(&x).unwrap();
            assert_abs_diff_eq!(e, d[i], epsilon = 1e-6);
            assert_abs_diff_eq!(v, 0., epsilon = 1e-3);
        }
    }

    #[test]
    fn test_plain_formulas_without_derivatives() {
        let xd = array![[0.1, 0.2], [0.6, 0.8], [0.9, 0.3]];
        let d = array![10., -5., 3.];
        let (theta, sigma, e_f) = (0.4, 2., 1.);
        let emulator = BayesLinearEmulator::params(array![theta], sigma)
            .prior_mean(e_f)
            .fit(&xd, &d)
            .unwrap();
        assert_eq!(emulator.block_map().len(), 3);

        // explicit inverse through Cramer's rule on the 3x3 value covariance
        let k = |a: ArrayView1<f64>, b: ArrayView1<f64>| {
            let r: f64 = (&a - &b).mapv(|v| v * v).sum();
            sigma * sigma * (-r / (theta * theta)).exp()
        };
        let mut var = Array2::<f64>::zeros((3, 3));
        for i in 0..3 {
            for j in 0..3 {
                var[[i, j]] = k(xd.row(i), xd.row(j));
            }
        }
        let det = var[[0, 0]] * (var[[1, 1]] * var[[2, 2]] - var[[1, 2]] * var[[2, 1]])
            - var[[0, 1]] * (var[[1, 0]] * var[[2, 2]] - var[[1, 2]] * var[[2, 0]])
            + var[[0, 2]] * (var[[1, 0]] * var[[2, 1]] - var[[1, 1]] * var[[2, 0]]);
        let mut inv = Array2::<f64>::zeros((3, 3));
        for i in 0..3 {
            for j in 0..3 {
                let (r0, r1) = ((j + 1) % 3, (j + 2) % 3);
                let (c0, c1) = ((i + 1) % 3, (i + 2) % 3);
                inv[[i, j]] =
                    (var[[r0, c0]] * var[[r1, c1]] - var[[r0, c1]] * var[[r1, c0]]) / det;
            }
        }
        assert_abs_diff_eq!(emulator.prior_covariance(), &var, epsilon = 1e-12);

        let x = array![0.4, 0.5];
        let c = Array1::from_iter(xd.rows().into_iter().map(|r| k(x.view(), r)));
        let expected_e = e_f + c.dot(&inv.dot(&(&d - e_f)));
        let expected_v = sigma * sigma - c.dot(&inv.dot(&c));
        let (e, v) = emulator.adjust(&x).unwrap();
        assert_abs_diff_eq!(e, expected_e, epsilon = 1e-8);
        assert_abs_diff_eq!(v, expected_v, epsilon = 1e-8);
    }

    #[test]
    fn test_derivatives_reduce_variance() {
        let (xd, d0) = training(8, &[]);
        let plain = BayesLinearEmulator::params(array![0.25], 250.)
            .prior_mean(350.)
            .fit(&xd, &d0)
            .unwrap();
        let grid = Array::random_using(
            (50, 2),
            Uniform::new(0., 1.),
            &mut Xoshiro256Plus::seed_from_u64(42),
        );
        let (_, v0) = plain.adjust_grid(&grid).unwrap();
        for dims in [vec![0], vec![1], vec![0, 1]] {
            let (_, d) = training(8, &dims);
            let augmented = BayesLinearEmulator::params(array![0.25], 250.)
                .prior_mean(350.)
                .derivatives(Derivatives::all_points(&dims))
                .fit(&xd, &d)
                .unwrap();
            let (_, v) = augmented.adjust_grid(&grid).unwrap();
            for (va, vp) in v.iter().zip(v0.iter()) {
                assert!(*va <= vp + 1e-3, "variance increased from {vp} to {va}");
            }
        }
    }

    #[test]
    fn test_subset_derivatives() {
        let (xd, d0) = training(8, &[]);
        let (dx1_points, dx2_points) = (vec![1, 4, 6], vec![5, 0]);
        let mut d = d0.to_vec();
        d.extend(dx1_points.iter().map(|&i| grad_sir_like(&xd.row(i)).0));
        d.extend(dx2_points.iter().map(|&i| grad_sir_like(&xd.row(i)).1));
        let d = Array1::from(d);

        let params = BayesLinearEmulator::params(array![0.25], 250.).prior_mean(350.);
        let plain = params.clone().fit(&xd, &d0).unwrap();
        let augmented = params
            .derivatives(
                Derivatives::none()
                    .with_points(0, dx1_points)
                    .with_points(1, dx2_points),
            )
            .fit(&xd, &d)
            .unwrap();
        assert_eq!(augmented.block_map().len(), 13);

        for (i, x) in xd.rows().into_iter().enumerate() {
            let (e, v) = augmented.adjust(&x).unwrap();
            assert_abs_diff_eq!(e, d0[i], epsilon = 1e-6);
            assert_abs_diff_eq!(v, 0., epsilon = 1e-3);
        }

        let grid = Array::random_using(
            (50, 2),
            Uniform::new(0., 1.),
            &mut Xoshiro256Plus::seed_from_u64(7),
        );
        let (_, v0) = plain.adjust_grid(&grid).unwrap();
        let (_, v) = augmented.adjust_grid(&grid).unwrap();
        for (va, vp) in v.iter().zip(v0.iter()) {
            assert!(*va <= vp + 1e-3, "variance increased from {vp} to {va}");
        }
    }

    #[test]
    fn test_derivatives_improve_prediction() {
        let (xd, d0) = training(6, &[]);
        let (_, d) = training(6, &[0, 1]);
        let params = BayesLinearEmulator::params(array![0.4], 500.).prior_mean(350.);
        let plain = params.clone().fit(&xd, &d0).unwrap();
        let augmented = params
            .derivatives(Derivatives::all_points(&[0, 1]))
            .fit(&xd, &d)
            .unwrap();
        let grid = blemu_doe::Grid::new(&array![[0.05, 0.95], [0.05, 0.95]])
            .unwrap()
            .levels(&[7, 7])
            .unwrap();
        let truth = Array1::from_iter(grid.rows().into_iter().map(|x| sir_like(&x)));
        let (e0, _) = plain.adjust_grid(&grid).unwrap();
        let (e, _) = augmented.adjust_grid(&grid).unwrap();
        let rmse = |e: &Array1<f64>| ((e - &truth).mapv(|v| v * v).mean().unwrap()).sqrt();
        assert!(rmse(&e) < rmse(&e0));
    }

    #[test]
    fn test_grid_matches_pointwise() {
        let (xd, d) = training(8, &[0]);
        let emulator = BayesLinearEmulator::params(array![0.3, 0.35], 250.)
            .prior_mean(350.)
            .derivatives(Derivatives::all_points(&[0]))
            .fit(&xd, &d)
            .unwrap();
        let grid = array![[0.2, 0.2], [0.5, 0.5], [0.9, 0.1]];
        let (e, v) = emulator.adjust_grid(&grid).unwrap();
        for (i, x) in grid.rows().into_iter().enumerate() {
            let (ei, vi) = emulator.adjust(&x).unwrap();
            assert_abs_diff_eq!(e[i], ei, epsilon = 1e-12);
            assert_abs_diff_eq!(v[i], vi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_far_from_design_reverts_to_prior() {
        let (xd, d) = training(8, &[0, 1]);
        let emulator = BayesLinearEmulator::params(array![0.1], 250.)
            .prior_mean(350.)
            .derivatives(Derivatives::all_points(&[0, 1]))
            .fit(&xd, &d)
            .unwrap();
        let (e, v) = emulator.adjust(&array![5., 5.]).unwrap();
        assert_abs_diff_eq!(e, 350., epsilon = 1e-6);
        assert_abs_diff_eq!(v, 250. * 250., epsilon = 1e-6);
    }

    #[test]
    fn test_observation_length_mismatch() {
        let (xd, d) = training(5, &[]);
        let res = BayesLinearEmulator::params(array![0.25], 1.)
            .derivatives(Derivatives::all_points(&[1]))
            .fit(&xd, &d);
        assert!(matches!(res, Err(EmulatorError::DimensionMismatch(_))));
    }

    #[test]
    fn test_duplicate_points_are_singular() {
        let xd = array![[0.1, 0.2], [0.5, 0.5], [0.1, 0.2]];
        let d = array![1., 2., 1.];
        let res = BayesLinearEmulator::params(array![0.25], 1.).fit(&xd, &d);
        assert!(matches!(res, Err(EmulatorError::SingularMatrix(_))));
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let (xd, d) = training(5, &[]);
        let res = BayesLinearEmulator::params(array![0.25, 0.1, 0.3], 1.).fit(&xd, &d);
        assert!(matches!(res, Err(EmulatorError::DimensionMismatch(_))));
        let res = BayesLinearEmulator::params(array![-0.25], 1.).fit(&xd, &d);
        assert!(matches!(res, Err(EmulatorError::InvalidHyperparameter(_))));
    }

    #[test]
    fn test_grid_reports_failing_point() {
        let (xd, d) = training(5, &[]);
        let emulator = BayesLinearEmulator::params(array![0.25], 1.)
            .fit(&xd, &d)
            .unwrap();
        assert!(matches!(
            emulator.adjust_grid(&array![[0.1, 0.2, 0.3]]),
            Err(EmulatorError::DimensionMismatch(_))
        ));
        let grid = array![[0.1, 0.2], [0.3, f64::NAN], [0.5, 0.5]];
        match emulator.adjust_grid(&grid) {
            Err(EmulatorError::AtQueryPoint { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(*source, EmulatorError::InvalidValue(_)));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_standardized_residual() {
        let (xd, d) = training(8, &[]);
        let emulator = BayesLinearEmulator::params(array![0.3], 250.)
            .prior_mean(350.)
            .fit(&xd, &d)
            .unwrap();
        let x = array![0.45, 0.55];
        let (e, v) = emulator.adjust(&x).unwrap();
        let y = sir_like(&x);
        assert_abs_diff_eq!(
            emulator.standardized_residual(&x, y).unwrap(),
            (y - e) / v.sqrt(),
            epsilon = 1e-12
        );
        let far = BayesLinearEmulator::params(array![0.3], 250.)
            .prior_mean(350.)
            .fit(&xd, &d)
            .unwrap();
        assert_abs_diff_eq!(
            far.standardized_residual(&array![10., 10.], 600.).unwrap(),
            1.,
            epsilon = 1e-12
        );
    }
}
