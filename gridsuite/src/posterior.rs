use rv::misc::LogSumExp;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::{Result, SuiteError};
use crate::likelihood::Likelihood;
use crate::pmf::Pmf;
use crate::space::{Hypothesis, HypothesisSpace};
use crate::utils::NoPrettyPrint;

/// How [`Posterior::update_set`] folds a batch of observations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Renormalize after every observation.
    #[default]
    PerObservation,
    /// Multiply all likelihoods, then renormalize once.
    Batch,
    /// Sum log likelihoods, then renormalize once. Does not underflow on
    /// large samples.
    LogSpace,
}

/// Normalized weights over a closed [`HypothesisSpace`].
///
/// Deserialized weights go through [`Posterior::with_prior`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosterior")]
pub struct Posterior {
    space: HypothesisSpace,
    weights: Vec<f64>,
    mode: UpdateMode,
}

#[derive(Deserialize)]
struct RawPosterior {
    space: HypothesisSpace,
    weights: Vec<f64>,
    #[serde(default)]
    mode: UpdateMode,
}

impl TryFrom<RawPosterior> for Posterior {
    type Error = SuiteError;

    fn try_from(raw: RawPosterior) -> Result<Self> {
        Ok(Self::with_prior(raw.space, raw.weights)?.with_mode(raw.mode))
    }
}

impl std::fmt::Debug for Posterior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Posterior")
            .field("dims", &self.space.dims())
            .field("len", &self.space.len())
            .field("mode", &self.mode)
            .field("weights", &NoPrettyPrint::new(&self.weights))
            .finish()
    }
}

impl Posterior {
    /// Equal prior weight on every hypothesis.
    #[must_use]
    pub fn uniform(space: HypothesisSpace) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let w = 1.0 / space.len() as f64;
        debug!(
            hypotheses = space.len(),
            dims = space.dims(),
            "uniform posterior created"
        );
        Self {
            weights: vec![w; space.len()],
            space,
            mode: UpdateMode::default(),
        }
    }

    /// Start from supplied prior weights, one per hypothesis in space order.
    /// The weights are normalized.
    ///
    /// # Errors
    /// - [`SuiteError::InvalidParameter`] if the length does not match the
    ///   space, or a weight is negative or not finite.
    /// - [`SuiteError::ZeroMass`] if every weight is zero.
    pub fn with_prior(space: HypothesisSpace, prior: Vec<f64>) -> Result<Self> {
        if prior.len() != space.len() {
            return Err(SuiteError::InvalidParameter {
                name: "prior",
                value: format!("{} weights for {} hypotheses", prior.len(), space.len()),
            });
        }
        if let Some(w) = prior.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(SuiteError::InvalidParameter {
                name: "prior",
                value: w.to_string(),
            });
        }
        let total: f64 = prior.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(SuiteError::ZeroMass);
        }

        debug!(
            hypotheses = space.len(),
            dims = space.dims(),
            "posterior created from prior"
        );
        Ok(Self {
            weights: prior.into_iter().map(|w| w / total).collect(),
            space,
            mode: UpdateMode::default(),
        })
    }

    /// Uniform posterior over the grids of `config`, using its update mode.
    ///
    /// # Errors
    /// As [`HypothesisSpace::new`].
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::uniform(config.space()?).with_mode(config.update_mode))
    }

    #[must_use]
    pub fn with_mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_mode(&mut self, mode: UpdateMode) {
        self.mode = mode;
    }

    #[must_use]
    pub const fn mode(&self) -> UpdateMode {
        self.mode
    }

    #[must_use]
    pub const fn space(&self) -> &HypothesisSpace {
        &self.space
    }

    /// Weights in the order of [`HypothesisSpace::hypotheses`].
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Always `false`; a hypothesis space is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Weight of `hypo`, zero if it is outside the space.
    #[must_use]
    pub fn prob(&self, hypo: &Hypothesis) -> f64 {
        self.space.index_of(hypo).map_or(0.0, |i| self.weights[i])
    }

    /// `(hypothesis, weight)` pairs in space order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hypothesis, f64)> + '_ {
        self.space.iter().zip(self.weights.iter().copied())
    }

    /// `(hypothesis, weight)` pairs, heaviest first.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&Hypothesis, f64)> {
        let mut items: Vec<_> = self.iter().collect();
        items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items
    }

    /// The most probable hypothesis; ties go to the first in space order.
    #[must_use]
    pub fn max_likelihood(&self) -> &Hypothesis {
        self.iter()
            .fold(None, |best: Option<(&Hypothesis, f64)>, (h, w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((h, w)),
            })
            .map_or(&self.space.hypotheses()[0], |(h, _)| h)
    }

    /// Multiply each weight by the likelihood of `datum` and renormalize.
    ///
    /// Returns the log of the normalizing constant (the evidence for `datum`).
    ///
    /// # Errors
    /// - [`SuiteError::ZeroLikelihood`] if every hypothesis scores zero.
    /// - [`SuiteError::InvalidLikelihood`] if the model returns a negative or
    ///   non-finite value.
    ///
    /// On error the posterior is unchanged.
    pub fn update<O, L>(&mut self, model: &L, datum: &O) -> Result<f64>
    where
        O: ?Sized,
        L: Likelihood<O> + ?Sized,
    {
        let likelihoods = self.likelihoods(model, datum)?;
        let (weights, evidence) = reweigh(&self.weights, &likelihoods)?;
        self.weights = weights;
        Ok(evidence.ln())
    }

    /// Fold a batch of observations in according to [`Posterior::mode`].
    ///
    /// Returns the log of the joint evidence for the batch. An empty batch
    /// leaves the posterior as is and returns zero.
    ///
    /// # Errors
    /// As [`Posterior::update`]. Under [`UpdateMode::Batch`],
    /// [`SuiteError::ZeroLikelihood`] is also returned when the product of
    /// likelihoods underflows for every hypothesis, and
    /// [`SuiteError::LikelihoodOverflow`] when it overflows for some
    /// hypothesis. A failing batch leaves
    /// the posterior unchanged, including the observations before the
    /// failing one.
    pub fn update_set<'a, O, L, I>(&mut self, model: &L, data: I) -> Result<f64>
    where
        O: ?Sized + 'a,
        L: Likelihood<O> + ?Sized,
        I: IntoIterator<Item = &'a O>,
    {
        let mut n_obs: usize = 0;
        let (weights, ln_evidence) = match self.mode {
            UpdateMode::PerObservation => {
                let mut weights = self.weights.clone();
                let mut ln_evidence = 0.0;
                for datum in data {
                    let likelihoods = self.likelihoods(model, datum)?;
                    let (next, evidence) = reweigh(&weights, &likelihoods)?;
                    trace!(observation = n_obs, evidence, "observation absorbed");
                    weights = next;
                    ln_evidence += evidence.ln();
                    n_obs += 1;
                }
                (weights, ln_evidence)
            }
            UpdateMode::Batch => {
                let mut product = vec![1.0; self.len()];
                for datum in data {
                    let likelihoods = self.likelihoods(model, datum)?;
                    product
                        .iter_mut()
                        .zip(likelihoods)
                        .for_each(|(acc, l)| *acc *= l);
                    n_obs += 1;
                }
                if n_obs == 0 {
                    return Ok(0.0);
                }
                let (weights, evidence) = reweigh(&self.weights, &product)?;
                (weights, evidence.ln())
            }
            UpdateMode::LogSpace => {
                let mut ln_post: Vec<f64> = self.weights.iter().map(|w| w.ln()).collect();
                for datum in data {
                    for (index, (acc, hypo)) in ln_post.iter_mut().zip(self.space.iter()).enumerate()
                    {
                        let ln_l = model.ln_likelihood(datum, hypo);
                        if ln_l.is_nan() || ln_l == f64::INFINITY {
                            warn!(index, ln_likelihood = ln_l, "rejected log likelihood");
                            return Err(SuiteError::InvalidLikelihood {
                                index,
                                value: ln_l.exp(),
                            });
                        }
                        *acc += ln_l;
                    }
                    n_obs += 1;
                }
                if n_obs == 0 {
                    return Ok(0.0);
                }
                renormalize_ln(&ln_post)?
            }
        };

        debug!(
            observations = n_obs,
            mode = ?self.mode,
            ln_evidence,
            "posterior updated"
        );
        self.weights = weights;
        Ok(ln_evidence)
    }

    /// Distribution of the values on dimension `dim`, summing over the others.
    ///
    /// # Errors
    /// [`SuiteError::DimensionOutOfRange`] if `dim` is not a dimension of the space.
    pub fn marginal(&self, dim: usize) -> Result<Pmf> {
        self.check_dim(dim)?;
        Pmf::new(self.iter().map(|(h, w)| (h[dim], w)))
    }

    /// Distribution of `free_dim` among hypotheses whose `fixed_dim` equals
    /// `fixed_value`, renormalized.
    ///
    /// # Errors
    /// - [`SuiteError::DimensionOutOfRange`] for an unknown dimension.
    /// - [`SuiteError::ValueNotInGrid`] if `fixed_value` is not on the grid
    ///   of `fixed_dim`.
    /// - [`SuiteError::ZeroMass`] if the slice carries no weight.
    pub fn conditional(&self, free_dim: usize, fixed_dim: usize, fixed_value: f64) -> Result<Pmf> {
        self.check_dim(free_dim)?;
        self.check_dim(fixed_dim)?;
        if self.space.position(fixed_dim, fixed_value).is_none() {
            return Err(SuiteError::ValueNotInGrid {
                dim: fixed_dim,
                value: fixed_value,
            });
        }

        let mut pmf = Pmf::new(
            self.iter()
                .filter(|(h, _)| h[fixed_dim] == fixed_value)
                .map(|(h, w)| (h[free_dim], w)),
        )?;
        pmf.normalize();
        Ok(pmf)
    }

    /// Central credible interval of the marginal on `dim`.
    ///
    /// # Errors
    /// As [`Posterior::marginal`] and [`Pmf::credible_interval`].
    pub fn credible_interval(&self, dim: usize, percentage: f64) -> Result<(f64, f64)> {
        self.marginal(dim)?.credible_interval(percentage)
    }

    /// The fewest most-probable hypotheses whose combined weight reaches
    /// `percentage` percent: a joint credible region.
    ///
    /// # Errors
    /// [`SuiteError::InvalidPercentage`] outside `[0, 100]`.
    pub fn max_like_interval(&self, percentage: f64) -> Result<Vec<Hypothesis>> {
        if !(0.0..=100.0).contains(&percentage) {
            return Err(SuiteError::InvalidPercentage(percentage));
        }
        let target = percentage / 100.0;
        let mut total = 0.0;
        let mut region = Vec::new();
        for (h, w) in self.sorted() {
            if total >= target {
                break;
            }
            region.push(h.clone());
            total += w;
        }
        Ok(region)
    }

    /// Distribution of a quantity derived from each hypothesis, such as the
    /// coefficient of variation `sigma / mu`.
    ///
    /// # Errors
    /// [`SuiteError::InvalidParameter`] if `f` returns a non-finite value for
    /// some hypothesis.
    pub fn derived<F: Fn(&Hypothesis) -> f64>(&self, f: F) -> Result<Pmf> {
        Pmf::new(self.iter().map(|(h, w)| (f(h), w)))
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        if dim < self.space.dims() {
            Ok(())
        } else {
            Err(SuiteError::DimensionOutOfRange {
                dim,
                dims: self.space.dims(),
            })
        }
    }

    fn likelihoods<O, L>(&self, model: &L, datum: &O) -> Result<Vec<f64>>
    where
        O: ?Sized,
        L: Likelihood<O> + ?Sized,
    {
        self.space
            .iter()
            .enumerate()
            .map(|(index, hypo)| {
                let l = model.likelihood(datum, hypo);
                if l.is_finite() && l >= 0.0 {
                    Ok(l)
                } else {
                    warn!(index, likelihood = l, "rejected likelihood");
                    Err(SuiteError::InvalidLikelihood { index, value: l })
                }
            })
            .collect()
    }
}

/// Multiply `prior` by `likelihoods` and normalize. Returns the new weights
/// and the normalizing constant.
fn reweigh(prior: &[f64], likelihoods: &[f64]) -> Result<(Vec<f64>, f64)> {
    let unnormalized: Vec<f64> = prior
        .iter()
        .zip(likelihoods)
        .map(|(w, l)| w * l)
        .collect();

    if let Some(index) = unnormalized.iter().position(|w| !w.is_finite()) {
        warn!(index, "product of likelihoods overflowed");
        return Err(SuiteError::LikelihoodOverflow { index });
    }

    // Scale by the largest term first so the sum cannot overflow.
    let max = unnormalized.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        warn!("every hypothesis has zero likelihood");
        return Err(SuiteError::ZeroLikelihood);
    }
    let scaled_total: f64 = unnormalized.iter().map(|w| w / max).sum();

    let weights = unnormalized
        .iter()
        .map(|w| w / max / scaled_total)
        .collect();
    Ok((weights, max * scaled_total))
}

/// Exponentiate and normalize log weights. Returns the weights and the log
/// normalizing constant.
fn renormalize_ln(ln_weights: &[f64]) -> Result<(Vec<f64>, f64)> {
    if ln_weights.iter().all(|lw| *lw == f64::NEG_INFINITY) {
        warn!("every hypothesis has zero likelihood");
        return Err(SuiteError::ZeroLikelihood);
    }
    let ln_total = ln_weights
        .iter()
        .copied()
        .filter(|lw| *lw > f64::NEG_INFINITY)
        .logsumexp();
    let weights = ln_weights.iter().map(|lw| (lw - ln_total).exp()).collect();
    Ok((weights, ln_total))
}
