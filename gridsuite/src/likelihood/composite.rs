use super::Likelihood;
use super::normal::NormalModel;
use crate::error::{Result, SuiteError};
use crate::posterior::{Posterior, UpdateMode};
use crate::space::{Hypothesis, HypothesisSpace};

/// Posterior predictive density of one feature: a normal model averaged
/// over a fitted posterior on its `(mu, sigma)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictiveDensity {
    posterior: Posterior,
    model: NormalModel,
}

impl PredictiveDensity {
    #[must_use]
    pub const fn new(posterior: Posterior, model: NormalModel) -> Self {
        Self { posterior, model }
    }

    /// Fit a uniform prior over `space` to `sample` in log space.
    ///
    /// # Errors
    /// As [`Posterior::update_set`].
    pub fn fit(space: HypothesisSpace, sample: &[f64], model: NormalModel) -> Result<Self> {
        let mut posterior = Posterior::uniform(space).with_mode(UpdateMode::LogSpace);
        posterior.update_set(&model, sample)?;
        Ok(Self::new(posterior, model))
    }

    #[must_use]
    pub const fn posterior(&self) -> &Posterior {
        &self.posterior
    }

    /// `sum_h w_h * N(x | h)`.
    #[must_use]
    pub fn density(&self, x: f64) -> f64 {
        self.posterior
            .iter()
            .map(|(h, w)| w * self.model.likelihood(&x, h))
            .sum()
    }
}

/// Classifier likelihood over hypotheses `(class,)`: the product of
/// independently fitted per-feature predictive densities of the class.
///
/// A feature vector of the wrong length, or a hypothesis that does not name
/// one of the classes, scores zero.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeModel {
    classes: Vec<Vec<PredictiveDensity>>,
}

impl CompositeModel {
    /// `classes[c][f]` is the predictive density of feature `f` under class `c`.
    ///
    /// # Errors
    /// [`SuiteError::InvalidParameter`] if there are no classes, no features,
    /// or the classes disagree on the number of features.
    pub fn new(classes: Vec<Vec<PredictiveDensity>>) -> Result<Self> {
        let n_features = classes.first().map_or(0, Vec::len);
        if n_features == 0 || classes.iter().any(|c| c.len() != n_features) {
            return Err(SuiteError::InvalidParameter {
                name: "classes",
                value: format!(
                    "feature counts {:?}",
                    classes.iter().map(Vec::len).collect::<Vec<_>>()
                ),
            });
        }
        Ok(Self { classes })
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.classes[0].len()
    }

    /// A space of one hypothesis per class, `0, 1, ...`.
    ///
    /// # Errors
    /// Never in practice; construction guarantees at least one class.
    #[allow(clippy::cast_precision_loss)]
    pub fn class_space(&self) -> Result<HypothesisSpace> {
        HypothesisSpace::new([(0..self.n_classes()).map(|c| c as f64).collect::<Vec<_>>()])
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn class_of(&self, hypo: &Hypothesis) -> Option<&[PredictiveDensity]> {
        let c = hypo.get(0)?;
        if c < 0.0 || c.fract() != 0.0 {
            return None;
        }
        self.classes.get(c as usize).map(Vec::as_slice)
    }
}

impl Likelihood<Vec<f64>> for CompositeModel {
    fn likelihood(&self, datum: &Vec<f64>, hypo: &Hypothesis) -> f64 {
        match self.class_of(hypo) {
            Some(features) if features.len() == datum.len() => features
                .iter()
                .zip(datum)
                .map(|(pd, x)| pd.density(*x))
                .product(),
            _ => 0.0,
        }
    }

    fn ln_likelihood(&self, datum: &Vec<f64>, hypo: &Hypothesis) -> f64 {
        match self.class_of(hypo) {
            Some(features) if features.len() == datum.len() => features
                .iter()
                .zip(datum)
                .map(|(pd, x)| pd.density(*x).ln())
                .sum(),
            _ => f64::NEG_INFINITY,
        }
    }
}
