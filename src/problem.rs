use crate::errors::{BlemuError, Result};
use crate::scaling::{normalize, rescale_derivatives};
use blemu_linear::{Derivatives, EmulatorParams};
use linfa::ParamGuard;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// An emulation problem as read from a JSON file.
///
/// Design points and derivatives are given in physical units when `xlimits`
/// is present, in unit cube units otherwise.
///
/// ```json
/// {
///   "xlimits": [[0.1, 0.5], [0.05, 0.2]],
///   "design": [[0.2, 0.1], [0.4, 0.15]],
///   "values": [512.0, 340.2],
///   "gradients": [[1.5, -3.0], [2.5, -1.0]],
///   "derivatives": [0],
///   "theta": [0.25],
///   "sigma": 250.0,
///   "prior_mean": 350.0
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Problem {
    /// Physical input space (nx, 2), unit cube when missing
    #[serde(default)]
    pub xlimits: Option<Vec<[f64; 2]>>,
    /// Design points, one row per simulator run
    pub design: Vec<Vec<f64>>,
    /// Simulator outputs at the design points
    pub values: Vec<f64>,
    /// Simulator output gradients at the design points, required when derivatives are used
    #[serde(default)]
    pub gradients: Option<Vec<Vec<f64>>>,
    /// Components whose partial derivatives are observed at every design point
    #[serde(default)]
    pub derivatives: Vec<usize>,
    /// Components whose partial derivatives are observed at a subset of design points
    #[serde(default)]
    pub derivative_points: BTreeMap<usize, Vec<usize>>,
    /// Correlation lengths in unit cube units
    pub theta: Vec<f64>,
    /// Prior standard deviation
    pub sigma: f64,
    /// Prior expectation of the simulator output
    #[serde(default)]
    pub prior_mean: f64,
}

fn to_matrix(rows: &[Vec<f64>], what: &str) -> Result<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(BlemuError::InvalidProblem(format!(
            "{what} rows have different lengths"
        )));
    }
    let data: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), data)
        .map_err(|e| BlemuError::InvalidProblem(format!("{what}: {e}")))
}

impl Problem {
    /// Reads a problem from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Derivative directives, subsets taking precedence over every design point
    pub fn derivative_directives(&self) -> Derivatives {
        let all = self
            .derivatives
            .iter()
            .fold(Derivatives::none(), |acc, &k| acc.with_all_points(k));
        self.derivative_points
            .iter()
            .fold(all, |acc, (&k, points)| acc.with_points(k, points.clone()))
    }

    /// Validated emulator hyperparameters
    pub fn params(&self) -> Result<EmulatorParams<f64>> {
        let params = EmulatorParams::new(Array1::from(self.theta.clone()), self.sigma)
            .prior_mean(self.prior_mean)
            .derivatives(self.derivative_directives());
        params.check_ref()?;
        Ok(params)
    }

    fn xlimits(&self) -> Option<Array2<f64>> {
        self.xlimits.as_ref().map(|limits| {
            Array2::from_shape_fn((limits.len(), 2), |(i, j)| limits[i][j])
        })
    }

    /// Design points in the unit cube
    pub fn normalized_design(&self) -> Result<Array2<f64>> {
        let xd = to_matrix(&self.design, "design")?;
        match self.xlimits() {
            Some(xlimits) => normalize(&xd, &xlimits),
            None => Ok(xd),
        }
    }

    /// Augmented observation vector with derivatives along the normalized components
    pub fn observations(&self) -> Result<Array1<f64>> {
        let values = Array1::from(self.values.clone());
        let directives = self.derivative_directives();
        if directives.is_empty() {
            return Ok(values);
        }
        let gradients = match &self.gradients {
            Some(g) => to_matrix(g, "gradients")?,
            None => {
                return Err(BlemuError::InvalidProblem(
                    "derivatives requested without gradients".to_string(),
                ))
            }
        };
        let gradients = match self.xlimits() {
            Some(xlimits) => rescale_derivatives(&gradients, &xlimits)?,
            None => gradients,
        };
        crate::scaling::observation_vector(&values, &gradients, &directives)
    }
}
