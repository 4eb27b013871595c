//! This library implements a [Bayes linear](https://en.wikipedia.org/wiki/Bayes_linear_statistics)
//! emulator of an expensive deterministic function whose training observations may include
//! partial derivatives alongside function values.
//!
//! The prior covariance between function values is a squared exponential kernel
//! ([SquaredExponentialKernel]); covariances involving partial derivatives are obtained
//! by differentiating the kernel. The augmented observation vector `D` is laid out by a
//! [BlockMap]: the function values first, then one block of partial derivatives per
//! active input component in ascending component order.
//!
//! The adjustment is implemented by [BayesLinearEmulator] parameterized by [EmulatorParams].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod assembly;
mod derivatives;
mod errors;
pub mod kernel;
mod parameters;

pub use algorithm::*;
pub use assembly::*;
pub use derivatives::*;
pub use errors::*;
pub use kernel::{CovarianceKernel, SquaredExponentialKernel};
pub use parameters::*;
