use crate::errors::{DoeError, Result};
use crate::utils::{check_xlimits, distance_matrix};
use crate::SamplingMethod;
use linfa::Float;
use log::{debug, info};
use ndarray::{Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{rand::seq::SliceRandom, rand::Rng, rand::SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::sync::{Arc, RwLock};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of local search iterations of the maximin optimization
pub const LHS_MAXIMIN_ITERS: usize = 1000;
/// Default tolerance on the minimum distance decrease accepted by a swap
pub const LHS_MAXIMIN_TOLERANCE: f64 = 1e-5;

/// Kinds of Latin Hypercube Design
#[derive(Clone, Debug, Default, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum LhsKind {
    /// sample is the middle of its latin hypercube intervals
    Centered,
    /// sample is the middle of its latin hypercube intervals and the minimum distance
    /// between points is maximized by a randomized local search swapping first components
    #[default]
    Maximin,
}

type RngRef<R> = Arc<RwLock<R>>;

/// The LHS design is built as follows: each dimension space is divided into ns sections
/// where ns is the number of sampling points, and one point in selected in each section.
/// The selection method gives different kind of LHS (see [LhsKind])
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Lhs<F: Float, R: Rng> {
    /// Sampling space definition as a (nx, 2) matrix
    /// The ith row is the [lower_bound, upper_bound] of xi, the ith component of x
    xlimits: Array2<F>,
    /// The requested kind of LHS
    kind: LhsKind,
    /// Number of local search iterations for [LhsKind::Maximin]
    max_iters: usize,
    /// Decrease of the minimum distance tolerated when accepting a swap
    tolerance: F,
    /// Random generator used for reproducibility
    rng: RngRef<R>,
}

/// LHS with default random generator
impl<F: Float> Lhs<F, Xoshiro256Plus> {
    /// Constructor given a design space given a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    ///
    /// ```
    /// use blemu_doe::Lhs;
    /// use ndarray::arr2;
    ///
    /// let doe = Lhs::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]])).unwrap();
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Self> {
        Self::new_with_rng(xlimits, Xoshiro256Plus::from_entropy())
    }

    /// Constructor of a LHS in the unit hypercube `[0, 1]^nx` with a seeded random generator
    pub fn unit(nx: usize, seed: u64) -> Result<Self> {
        let mut xlimits = Array2::zeros((nx, 2));
        xlimits.column_mut(1).fill(F::one());
        Self::new_with_rng(&xlimits, Xoshiro256Plus::seed_from_u64(seed))
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for Lhs<F, R> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Result<Array2<F>> {
        match self.kind {
            LhsKind::Centered => {
                if ns == 0 {
                    return Err(DoeError::InvalidSize(
                        "LHS requires at least one sample".to_string(),
                    ));
                }
                Ok(self._centered_lhs(ns))
            }
            LhsKind::Maximin => self.optimized_with_trace(ns).map(|(lhs, _)| lhs),
        }
    }
}

impl<F: Float, R: Rng> Lhs<F, R> {
    /// Constructor with given design space and random generator.
    /// * `xlimits`: (nx, 2) matrix where nx is the dimension of the samples and the ith row
    ///   is the definition interval of the ith component of x.
    /// * `rng`: random generator used to permute cells and to drive the local search
    pub fn new_with_rng(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, rng: R) -> Result<Self> {
        check_xlimits(xlimits)?;
        Ok(Lhs {
            xlimits: xlimits.to_owned(),
            kind: LhsKind::default(),
            max_iters: LHS_MAXIMIN_ITERS,
            tolerance: F::cast(LHS_MAXIMIN_TOLERANCE),
            rng: Arc::new(RwLock::new(rng)),
        })
    }

    /// Sets the kind of LHS
    pub fn kind(mut self, kind: LhsKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the number of local search iterations used by [LhsKind::Maximin]
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the tolerance: a swap is kept when the new minimum distance is not
    /// smaller than the current one minus `tolerance`.
    /// It must be finite and non negative, otherwise maximin sampling fails.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Lhs<F, R2> {
        Lhs {
            xlimits: self.xlimits,
            kind: self.kind,
            max_iters: self.max_iters,
            tolerance: self.tolerance,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Generates a (ns, nx) maximin LHS in `[0, 1]^nx` and returns it together with the
    /// minimum pairwise distance of the initial centered LHS followed by the minimum
    /// pairwise distance after each local search iteration.
    ///
    /// # Errors
    ///
    /// When `ns < 2`, as the pairwise distances are then undefined,
    /// or when the tolerance is negative or not finite.
    pub fn optimized_with_trace(&self, ns: usize) -> Result<(Array2<F>, Vec<F>)> {
        if ns < 2 {
            return Err(DoeError::InvalidSize(format!(
                "maximin LHS requires at least 2 samples, got {ns}"
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= F::zero()) {
            return Err(DoeError::InvalidParameter(format!(
                "maximin tolerance should be finite and non negative, got {}",
                self.tolerance
            )));
        }
        let lhs = self._centered_lhs(ns);
        Ok(self._maximin_search(lhs))
    }

    fn _centered_lhs(&self, ns: usize) -> Array2<F> {
        let nx = self.xlimits.nrows();
        let mut lhs = Array2::zeros((ns, nx));
        let mut cells: Vec<usize> = (0..ns).collect();

        let mut rng = self.rng.write().unwrap();
        for mut col in lhs.columns_mut() {
            cells.shuffle(&mut *rng);
            for (v, &c) in col.iter_mut().zip(cells.iter()) {
                *v = (F::cast(c) + F::cast(0.5)) / F::cast(ns);
            }
        }
        lhs
    }

    fn _maximin_search(&self, mut lhs: Array2<F>) -> (Array2<F>, Vec<F>) {
        let ns = lhs.nrows();
        let mut dist = distance_matrix(&lhs);
        let mut d_min = dist.fold(F::max_value(), |m, &v| m.min(v));
        let mut trace = Vec::with_capacity(self.max_iters + 1);
        trace.push(d_min);
        let d_init = d_min;

        let mut n_accepted = 0;
        let mut rng = self.rng.write().unwrap();
        for _ in 0..self.max_iters {
            let ties: Vec<usize> = dist
                .indexed_iter()
                .filter(|(_, v)| **v == d_min)
                .map(|((i, _), _)| i)
                .collect();
            let i1 = ties[rng.gen_range(0..ties.len())];
            let mut i2 = rng.gen_range(0..ns - 1);
            if i2 >= i1 {
                i2 += 1;
            }

            // only first components are exchanged, second ones stay in place
            let mut candidate = lhs.to_owned();
            candidate.swap([i1, 0], [i2, 0]);
            let cand_dist = distance_matrix(&candidate);
            let cand_min = cand_dist.fold(F::max_value(), |m, &v| m.min(v));

            if cand_min >= d_min - self.tolerance {
                lhs = candidate;
                dist = cand_dist;
                d_min = cand_min;
                n_accepted += 1;
            }
            trace.push(d_min);
        }
        debug!("Maximin LHS: {n_accepted}/{} swaps accepted", self.max_iters);
        info!(
            "Maximin LHS of {ns} points: min distance {:.6} -> {:.6}",
            d_init.to_f64().unwrap_or(f64::NAN),
            d_min.to_f64().unwrap_or(f64::NAN)
        );
        (lhs, trace)
    }
}
