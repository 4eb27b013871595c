//! Assembly of the prior covariance of the augmented observation vector and of the
//! cross covariance between a query value and the augmented observation vector.

use crate::derivatives::{BlockMap, Observation};
use crate::errors::{EmulatorError, Result};
use crate::kernel::CovarianceKernel;
use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayBase, Data, Ix1, Ix2};

fn check_design<F: Float>(
    kernel: &impl CovarianceKernel<F>,
    xd: &ArrayBase<impl Data<Elem = F>, Ix2>,
    map: &BlockMap,
) -> Result<()> {
    if xd.ncols() != kernel.dim() {
        return Err(EmulatorError::DimensionMismatch(format!(
            "design points of dimension {} for a kernel of dimension {}",
            xd.ncols(),
            kernel.dim()
        )));
    }
    if xd.nrows() != map.n_points() {
        return Err(EmulatorError::DimensionMismatch(format!(
            "design holds {} points, block map expects {}",
            xd.nrows(),
            map.n_points()
        )));
    }
    Ok(())
}

/// Prior covariance matrix `Var_D` of the augmented observation vector laid out by `map`
/// for design points `xd` given as a (n, nx) matrix.
///
/// Each block pair of the upper triangle is filled once, the lower triangle is mirrored
/// so that the result is exactly symmetric.
pub fn assemble<F: Float>(
    kernel: &impl CovarianceKernel<F>,
    xd: &ArrayBase<impl Data<Elem = F>, Ix2>,
    map: &BlockMap,
) -> Result<Array2<F>> {
    check_design(kernel, xd, map)?;
    let m = map.len();
    let mut var = Array2::zeros((m, m));

    let blocks = map.blocks();
    for (bi, row_block) in blocks.iter().enumerate() {
        for (bj, col_block) in blocks.iter().enumerate().skip(bi) {
            let mut sub = var.slice_mut(s![row_block.range(), col_block.range()]);
            for (a, &pa) in row_block.points.iter().enumerate() {
                let first = if bi == bj { a } else { 0 };
                for (b, &pb) in col_block.points.iter().enumerate().skip(first) {
                    sub[[a, b]] = kernel.covariance(
                        &xd.row(pa),
                        row_block.obs,
                        &xd.row(pb),
                        col_block.obs,
                    )?;
                }
            }
        }
    }
    for i in 0..m {
        for j in (i + 1)..m {
            var[[j, i]] = var[[i, j]];
        }
    }
    Ok(var)
}

/// Cross covariance `Cov[f(x), D]` between the function value at `x` and every entry
/// of the augmented observation vector laid out by `map`.
pub fn cross_covariance<F: Float>(
    kernel: &impl CovarianceKernel<F>,
    x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    xd: &ArrayBase<impl Data<Elem = F>, Ix2>,
    map: &BlockMap,
) -> Result<Array1<F>> {
    check_design(kernel, xd, map)?;
    if x.len() != kernel.dim() {
        return Err(EmulatorError::DimensionMismatch(format!(
            "query point of dimension {} for a kernel of dimension {}",
            x.len(),
            kernel.dim()
        )));
    }
    let mut cov = Array1::zeros(map.len());
    for (c, (p, obs)) in cov.iter_mut().zip(map.entries()) {
        *c = kernel.covariance(x, Observation::Value, &xd.row(p), obs)?;
    }
    Ok(cov)
}
