use crate::errors::{DoeError, Result};
use crate::utils::check_xlimits;
use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use ndarray_stats::QuantileExt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// The Grid design consists of all combinations of evenly spaced levels
/// (bounds included) for all components within the design space.
///
/// It is typically used to lay out query points at which an emulator is evaluated.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Grid<F: Float> {
    /// Design space definition as
    /// The ith row is the [lower_bound, upper_bound] of xi, the ith component of a sample x
    xlimits: Array2<F>,
}

impl<F: Float> Grid<F> {
    /// Constructor given a design space given a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    ///
    /// ```
    /// use blemu_doe::Grid;
    /// use ndarray::arr2;
    ///
    /// let doe = Grid::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]])).unwrap();
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Self> {
        check_xlimits(xlimits)?;
        Ok(Grid {
            xlimits: xlimits.to_owned(),
        })
    }

    /// Rectangular grid in `[0, 1]^nx` with `levels[j]` values along the jth component.
    /// The last component varies fastest.
    pub fn normalized_levels(&self, levels: &[usize]) -> Result<Array2<F>> {
        let nx = self.xlimits.nrows();
        if levels.len() != nx {
            return Err(DoeError::InvalidSize(format!(
                "expected {nx} levels, got {}",
                levels.len()
            )));
        }
        if levels.iter().any(|&n| n == 0) {
            return Err(DoeError::InvalidSize(
                "grid levels must be positive".to_string(),
            ));
        }
        let nrows: usize = levels.iter().product();
        let mut doe = Array2::<F>::zeros((nrows, nx));

        let mut level_repeat = nrows;
        for (j, &n) in levels.iter().enumerate() {
            level_repeat /= n;
            for (r, v) in doe.column_mut(j).iter_mut().enumerate() {
                let i = (r / level_repeat) % n;
                *v = if n > 1 {
                    F::cast(i) / F::cast(n - 1)
                } else {
                    F::cast(0.5)
                };
            }
        }
        Ok(doe)
    }

    /// Rectangular grid with `levels[j]` values along the jth component of the design space
    pub fn levels(&self, levels: &[usize]) -> Result<Array2<F>> {
        let lower = self.xlimits.column(0);
        let scaler = &self.xlimits.column(1) - &lower;
        Ok(self.normalized_levels(levels)? * scaler + lower)
    }
}

impl<F: Float> SamplingMethod<F> for Grid<F> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    /// The number of levels by component is chosen as evenly as possible,
    /// the first `ns` points of the resulting grid are returned.
    fn normalized_sample(&self, ns: usize) -> Result<Array2<F>> {
        let nx = self.xlimits.nrows();
        let weights: Array1<F> = Array1::ones(nx) / F::cast(nx);
        let mut num_list: Array1<usize> = Array1::ones(nx);

        while num_list.fold(1, |acc, n| acc * n) < ns {
            let w: Array1<F> = &num_list.mapv(|v| F::cast(v)) / F::cast(num_list.sum());
            let ind = (&weights - &w)
                .argmax()
                .map_err(|e| DoeError::InvalidSize(e.to_string()))?;
            num_list[ind] += 1;
        }
        let doe = self.normalized_levels(num_list.as_slice().unwrap_or(&[]))?;
        Ok(doe.slice(ndarray::s![0..ns, ..]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, array};

    #[test]
    fn test_grid_levels() {
        let xlimits = arr2(&[[5., 10.], [0., 1.]]);
        let expected = array![
            [5., 0.],
            [5., 0.5],
            [5., 1.],
            [7.5, 0.],
            [7.5, 0.5],
            [7.5, 1.],
            [10., 0.],
            [10., 0.5],
            [10., 1.],
        ];
        let actual = Grid::new(&xlimits).unwrap().levels(&[3, 3]).unwrap();
        assert_abs_diff_eq!(expected, actual, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_rectangular() {
        let xlimits = arr2(&[[0., 1.], [0., 1.]]);
        let actual = Grid::new(&xlimits).unwrap().levels(&[2, 3]).unwrap();
        let expected = array![
            [0., 0.],
            [0., 0.5],
            [0., 1.],
            [1., 0.],
            [1., 0.5],
            [1., 1.]
        ];
        assert_abs_diff_eq!(expected, actual, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_sample() {
        let xlimits = arr2(&[[-10., 10.], [0., 1.], [1., 8.]]);
        let actual = Grid::new(&xlimits).unwrap().sample(5).unwrap();
        let expected = array![
            [-10.0, 0.0, 1.0],
            [-10.0, 0.0, 8.0],
            [-10.0, 1.0, 1.0],
            [-10.0, 1.0, 8.0],
            [10.0, 0.0, 1.0]
        ];
        assert_abs_diff_eq!(expected, actual, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_bad_levels() {
        let grid = Grid::new(&arr2(&[[0., 1.], [0., 1.]])).unwrap();
        assert!(grid.levels(&[3]).is_err());
        assert!(grid.levels(&[3, 0]).is_err());
    }
}
