//! Bayesian updating on discrete grids of hypotheses.
//!
//! Build a [`HypothesisSpace`] from one grid per parameter, start a
//! [`Posterior`] on it, fold observations in through a [`Likelihood`], then
//! read marginals, conditionals and credible intervals off the result.
//!
//! ```
//! use gridsuite::likelihood::normal::NormalModel;
//! use gridsuite::{Hypothesis, HypothesisSpace, Posterior};
//!
//! let space = HypothesisSpace::new([vec![20.0, 22.0], vec![5.0, 6.0]]).unwrap();
//! let mut post = Posterior::uniform(space);
//! post.update(&NormalModel::new(), &21.0).unwrap();
//!
//! assert_eq!(post.max_likelihood(), &Hypothesis::from([20.0, 5.0]));
//! let sigma = post.marginal(1).unwrap();
//! assert!(sigma.prob(5.0) > sigma.prob(6.0));
//! ```

pub mod cdf;
pub mod config;
pub mod error;
pub mod likelihood;
pub mod pmf;
pub mod posterior;
pub mod space;

pub mod utils;

pub use cdf::Cdf;
pub use config::EngineConfig;
pub use error::{Result, SuiteError};
pub use likelihood::Likelihood;
pub use pmf::Pmf;
pub use posterior::{Posterior, UpdateMode};
pub use space::{GridSpec, Hypothesis, HypothesisSpace};
