use crate::errors::{DoeError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use ndarray_stats::DeviationExt;

/// Euclidean distance between rows `i` and `j` of `x`
fn row_dist<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>, i: usize, j: usize) -> F {
    // rows of one matrix share their shape, only rows without component fail
    F::cast(x.row(i).l2_dist(&x.row(j)).unwrap_or(0.))
}

/// Condensed pairwise distances of the rows of `x`, (n * (n-1) / 2,) ordered as
/// (0, 1), (0, 2), ..., (1, 2), ...
pub fn pdist<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
    let nrows = x.nrows();
    let size = nrows.saturating_sub(1) * nrows / 2;
    let mut res = Array1::zeros(size);
    let mut k = 0;
    for i in 0..nrows {
        for j in (i + 1)..nrows {
            res[k] = row_dist(x, i, j);
            k += 1;
        }
    }
    res
}

/// Full (n, n) distance matrix of the rows of `x` where the diagonal is set
/// to `F::max_value()` so that self-pairs never realize the minimum.
pub fn distance_matrix<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
    let n = x.nrows();
    let mut res = Array2::from_elem((n, n), F::max_value());
    for i in 0..n {
        for j in (i + 1)..n {
            let d = row_dist(x, i, j);
            res[[i, j]] = d;
            res[[j, i]] = d;
        }
    }
    res
}

/// Smallest distance between two distinct rows of `x`
///
/// # Errors
///
/// When `x` holds less than two points.
pub fn min_distance<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<F> {
    if x.nrows() < 2 {
        return Err(DoeError::InvalidSize(format!(
            "minimum distance requires at least 2 points, got {}",
            x.nrows()
        )));
    }
    Ok(pdist(x).fold(F::infinity(), |m, &v| m.min(v)))
}

/// Checks a (nx, 2) sampling space definition
pub(crate) fn check_xlimits<F: Float>(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
    if xlimits.ncols() != 2 {
        return Err(DoeError::InvalidSpace(format!(
            "xlimits must have 2 columns (lower, upper), got {}",
            xlimits.ncols()
        )));
    }
    if xlimits.nrows() == 0 {
        return Err(DoeError::InvalidSpace(
            "xlimits must define at least one dimension".to_string(),
        ));
    }
    if let Some(i) = xlimits.rows().into_iter().position(|r| r[0] > r[1]) {
        return Err(DoeError::InvalidSpace(format!(
            "lower bound greater than upper bound for component {i}"
        )));
    }
    Ok(())
}
