//! Conversions between the physical input space of the simulator and the unit
//! cube the emulator works in.
//!
//! With `x = lower + u (upper - lower)`, the derivative of the simulator output
//! along a normalized component is `df/du_k = (upper_k - lower_k) df/dx_k`.

use crate::errors::{BlemuError, Result};
use blemu_linear::{BlockMap, Derivatives, Observation};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};

fn check_space(
    xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<Array1<f64>> {
    if xlimits.ncols() != 2 {
        return Err(BlemuError::InvalidSpace(format!(
            "xlimits must have 2 columns (lower, upper), got {}",
            xlimits.ncols()
        )));
    }
    if x.ncols() != xlimits.nrows() {
        return Err(BlemuError::DimensionMismatch(format!(
            "points of dimension {} in a {}-dimensional space",
            x.ncols(),
            xlimits.nrows()
        )));
    }
    let widths = &xlimits.column(1) - &xlimits.column(0);
    if let Some(k) = widths.iter().position(|w| !(*w > 0. && w.is_finite())) {
        return Err(BlemuError::InvalidSpace(format!(
            "component {k} has an empty or unbounded range"
        )));
    }
    Ok(widths)
}

/// Maps physical points `x` (n, nx) within `xlimits` (nx, 2) to the unit cube
///
/// ```
/// use blemu::normalize;
/// use ndarray::array;
///
/// let u = normalize(&array![[0.5, 10.]], &array![[0., 1.], [0., 40.]]).unwrap();
/// assert_eq!(u, array![[0.5, 0.25]]);
/// ```
pub fn normalize(
    x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<Array2<f64>> {
    let widths = check_space(xlimits, x)?;
    Ok((x - &xlimits.column(0)) / &widths)
}

/// Maps points `u` (n, nx) of the unit cube back to the physical space `xlimits` (nx, 2)
pub fn denormalize(
    u: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<Array2<f64>> {
    let widths = check_space(xlimits, u)?;
    Ok(u * &widths + xlimits.column(0))
}

/// Converts gradients `dfdx` (n, nx) computed in physical units into gradients
/// along the normalized components.
pub fn rescale_derivatives(
    dfdx: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<Array2<f64>> {
    let widths = check_space(xlimits, dfdx)?;
    Ok(dfdx * &widths)
}

/// Builds the augmented observation vector from the `values` (n,) observed at the
/// design points and the normalized `gradients` (n, nx) at the same points, keeping
/// the entries selected by `derivatives` in block order.
pub fn observation_vector(
    values: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    gradients: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    derivatives: &Derivatives,
) -> Result<Array1<f64>> {
    if gradients.nrows() != values.len() {
        return Err(BlemuError::DimensionMismatch(format!(
            "{} values for {} gradients",
            values.len(),
            gradients.nrows()
        )));
    }
    let map = BlockMap::new(values.len(), gradients.ncols(), derivatives)?;
    Ok(map
        .entries()
        .map(|(p, obs)| match obs {
            Observation::Value => values[p],
            Observation::Partial(k) => gradients[[p, k]],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_normalize_roundtrip() {
        let xlimits = array![[0.1, 0.9], [100., 1100.]];
        let x = array![[0.1, 100.], [0.5, 600.], [0.9, 1100.]];
        let u = normalize(&x, &xlimits).unwrap();
        assert_abs_diff_eq!(u, array![[0., 0.], [0.5, 0.5], [1., 1.]], epsilon = 1e-12);
        assert_abs_diff_eq!(denormalize(&u, &xlimits).unwrap(), x, epsilon = 1e-9);
    }

    #[test]
    fn test_chain_rule() {
        // f(x) = 3 x1 + x2^2 over [0, 2] x [10, 20]
        let xlimits = array![[0., 2.], [10., 20.]];
        let x = array![[1., 15.]];
        let dfdx = array![[3., 30.]];
        let dfdu = rescale_derivatives(&dfdx, &xlimits).unwrap();
        assert_abs_diff_eq!(dfdu, array![[6., 300.]], epsilon = 1e-12);

        // finite difference in normalized space
        let f = |x: &Array2<f64>| 3. * x[[0, 0]] + x[[0, 1]] * x[[0, 1]];
        let u = normalize(&x, &xlimits).unwrap();
        let h = 1e-6;
        let mut uh = u.clone();
        uh[[0, 1]] += h;
        let fd = (f(&denormalize(&uh, &xlimits).unwrap()) - f(&x)) / h;
        assert_abs_diff_eq!(fd, dfdu[[0, 1]], epsilon = 1e-2);
    }

    #[test]
    fn test_invalid_space() {
        let x = array![[0.5, 0.5]];
        assert!(matches!(
            normalize(&x, &array![[0., 1.], [1., 1.]]),
            Err(BlemuError::InvalidSpace(_))
        ));
        assert!(matches!(
            normalize(&x, &array![[0., 1.]]),
            Err(BlemuError::DimensionMismatch(_))
        ));
        assert!(matches!(
            normalize(&x, &array![[0.], [1.]]),
            Err(BlemuError::InvalidSpace(_))
        ));
    }

    #[test]
    fn test_observation_vector() {
        let values = array![1., 2., 3.];
        let gradients = array![[10., 20.], [11., 21.], [12., 22.]];
        let d = observation_vector(
            &values,
            &gradients,
            &Derivatives::none().with_all_points(1).with_points(0, vec![2]),
        )
        .unwrap();
        assert_eq!(d, array![1., 2., 3., 12., 20., 21., 22.]);
        assert!(matches!(
            observation_vector(&values, &gradients, &Derivatives::all_points(&[2])),
            Err(BlemuError::EmulatorError(_))
        ));
    }
}
