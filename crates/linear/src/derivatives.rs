//! Bookkeeping of the augmented observation vector `D`.
//!
//! `D` starts with the `n` function values observed at the design points, followed by one
//! contiguous block of partial derivatives per active input dimension, in ascending
//! dimension order. The [BlockMap] records, for every entry of `D`, the design point it was
//! observed at and whether it is a value or a partial derivative.

use crate::errors::{EmulatorError, Result};
use linfa::Float;
use ndarray::Array1;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Kind of an observation of the emulated function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Observation {
    /// function value f(x)
    Value,
    /// partial derivative df/dx_k along the given component k
    Partial(usize),
}

/// Design points at which a partial derivative is observed
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum DerivativePoints {
    /// every design point, in design order
    All,
    /// the given design point indices, in the given order
    Subset(Vec<usize>),
}

/// Derivative directives: which input components carry partial derivative
/// observations and at which design points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Derivatives(BTreeMap<usize, DerivativePoints>);

impl Derivatives {
    /// No derivative observations: plain Bayes linear adjustment on values
    pub fn none() -> Self {
        Self::default()
    }

    /// Partial derivatives along each of `dims` at every design point
    ///
    /// ```
    /// use blemu_linear::Derivatives;
    ///
    /// let both = Derivatives::all_points(&[0, 1]);
    /// assert_eq!(both.dims().collect::<Vec<_>>(), vec![0, 1]);
    /// ```
    pub fn all_points(dims: &[usize]) -> Self {
        dims.iter()
            .fold(Self::none(), |acc, &k| acc.with_all_points(k))
    }

    /// Adds partial derivatives along `dim` at every design point
    pub fn with_all_points(mut self, dim: usize) -> Self {
        self.0.insert(dim, DerivativePoints::All);
        self
    }

    /// Adds partial derivatives along `dim` at the given design point indices
    pub fn with_points(mut self, dim: usize, points: Vec<usize>) -> Self {
        self.0.insert(dim, DerivativePoints::Subset(points));
        self
    }

    /// Active components in block order
    pub fn dims(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }

    /// Whether no derivative is observed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over (component, points) in block order
    pub fn iter(&self) -> impl Iterator<Item = (&usize, &DerivativePoints)> {
        self.0.iter()
    }
}

/// A contiguous block of entries of the augmented observation vector
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Block {
    /// kind shared by every entry of the block
    pub obs: Observation,
    /// design point index of each entry
    pub points: Vec<usize>,
    /// offset of the first entry in the augmented vector
    pub start: usize,
}

impl Block {
    /// Range of the block entries in the augmented vector
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.points.len()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the block has no entry
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Layout of the augmented observation vector: one value block followed by
/// one block per active derivative component.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct BlockMap {
    n_points: usize,
    blocks: Vec<Block>,
}

impl BlockMap {
    /// Builds the layout for `n_points` design points in a `nx`-dimensional input space
    ///
    /// # Errors
    ///
    /// When a directive refers to a component `>= nx`, a design point `>= n_points`,
    /// lists no point or lists a point twice.
    pub fn new(n_points: usize, nx: usize, derivatives: &Derivatives) -> Result<Self> {
        if n_points == 0 {
            return Err(EmulatorError::DimensionMismatch(
                "design must hold at least one point".to_string(),
            ));
        }
        let mut blocks = vec![Block {
            obs: Observation::Value,
            points: (0..n_points).collect(),
            start: 0,
        }];
        let mut start = n_points;
        for (&k, pts) in derivatives.iter() {
            if k >= nx {
                return Err(EmulatorError::InvalidDerivatives(format!(
                    "derivative along component {k} of a {nx}-dimensional input"
                )));
            }
            let points = match pts {
                DerivativePoints::All => (0..n_points).collect::<Vec<_>>(),
                DerivativePoints::Subset(p) => {
                    if p.is_empty() {
                        return Err(EmulatorError::InvalidDerivatives(format!(
                            "no design point given for derivatives along component {k}"
                        )));
                    }
                    if let Some(i) = p.iter().find(|&&i| i >= n_points) {
                        return Err(EmulatorError::InvalidDerivatives(format!(
                            "design point #{i} out of range (design size {n_points})"
                        )));
                    }
                    if p.iter().collect::<BTreeSet<_>>().len() != p.len() {
                        return Err(EmulatorError::InvalidDerivatives(format!(
                            "design point repeated for derivatives along component {k}"
                        )));
                    }
                    p.to_owned()
                }
            };
            let block = Block {
                obs: Observation::Partial(k),
                points,
                start,
            };
            start += block.len();
            blocks.push(block);
        }
        Ok(BlockMap { n_points, blocks })
    }

    /// Number of design points
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Size of the augmented observation vector
    pub fn len(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    /// Always false as the value block holds at least one point
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks in augmented vector order, the value block first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// (design point index, observation kind) of every entry in augmented vector order
    pub fn entries(&self) -> impl Iterator<Item = (usize, Observation)> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| b.points.iter().map(move |&p| (p, b.obs)))
    }

    /// Prior expectation of the augmented vector: `prior_mean` on values, zero on derivatives
    pub fn prior_expectation<F: Float>(&self, prior_mean: F) -> Array1<F> {
        self.entries()
            .map(|(_, obs)| match obs {
                Observation::Value => prior_mean,
                Observation::Partial(_) => F::zero(),
            })
            .collect()
    }
}
