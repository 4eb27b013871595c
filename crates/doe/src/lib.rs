/*!
This library implements the Design of Experiments (DoE) methods used to choose the
training runs of an emulator, mainly a maximin [Latin Hypercube sampling](https://en.wikipedia.org/wiki/Latin_hypercube_sampling)
where one point is placed at the center of each stratification cell and the minimum
pairwise distance is improved by a randomized local search.

A DoE method is a way to generate a set of points (i.e. a DoE) within a design (or sample) space `xlimits`.
The design space is defined as a 2D ndarray `(nx, 2)`, specifying lower bound and upper bound
of each `nx` components of the samples `x`.

Example:
```
use blemu_doe::{Grid, Lhs, LhsKind, SamplingMethod};
use ndarray::arr2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

// Design space is defined as [5., 10.] x [0., 1.], samples are 2-dimensional.
let xlimits = arr2(&[[5., 10.], [0., 1.]]);
// We generate five samples using a seeded maximin Latin Hypercube sampling.
let samples = Lhs::new_with_rng(&xlimits, Xoshiro256Plus::seed_from_u64(15))
    .unwrap()
    .sample(5)
    .unwrap();
// or else a 4x3 rectangular grid of query points
let grid = Grid::new(&xlimits).unwrap().levels(&[4, 3]).unwrap();
```

This library contains two kinds of sampling methods:
* [Latin Hypercube Sampling](crate::lhs::Lhs),
* [Grid Sampling](crate::grid::Grid)

*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod grid;
mod lhs;
mod traits;
mod utils;

pub use errors::*;
pub use grid::*;
pub use lhs::*;
pub use traits::*;
pub use utils::{distance_matrix, min_distance, pdist};
