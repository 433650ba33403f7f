//! Where does a paintball land?
//!
//! A shooter stands at `alpha` along a wall and `beta` away from it, and fires
//! at a uniformly random angle. Hypotheses are `(alpha, beta)`; a datum is the
//! position along the wall where a ball hit.

use rv::dist::Cauchy;
use rv::traits::{Cdf, HasDensity};
use serde::{Deserialize, Serialize};

use super::Likelihood;
use crate::error::{Result, SuiteError};
use crate::pmf::Pmf;
use crate::space::Hypothesis;

/// Rate at which the impact point moves along the wall per unit of firing
/// angle, for a shooter at `(alpha, beta)` hitting `x`.
#[must_use]
pub fn strafing_speed(alpha: f64, beta: f64, x: f64) -> f64 {
    let theta = (x - alpha).atan2(beta);
    beta / theta.cos().powi(2)
}

/// Distribution of impacts over candidate `locations`, proportional to the
/// inverse strafing speed.
///
/// # Errors
/// - [`SuiteError::InvalidParameter`] if `beta` is not positive and finite or
///   `alpha` is not finite.
/// - As [`Pmf::new`] for the locations.
pub fn location_pmf(alpha: f64, beta: f64, locations: &[f64]) -> Result<Pmf> {
    if !alpha.is_finite() {
        return Err(SuiteError::InvalidParameter {
            name: "alpha",
            value: alpha.to_string(),
        });
    }
    if !(beta.is_finite() && beta > 0.0) {
        return Err(SuiteError::InvalidParameter {
            name: "beta",
            value: beta.to_string(),
        });
    }
    let mut pmf = Pmf::new(
        locations
            .iter()
            .map(|&x| (x, 1.0 / strafing_speed(alpha, beta, x))),
    )?;
    pmf.normalize();
    Ok(pmf)
}

/// How a shooter hypothesis spreads its impacts along the wall.
///
/// Deserialized models go through [`ImpactModel::discrete`] and
/// [`ImpactModel::continuous`], so candidate locations end up sorted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", try_from = "RawImpactModel")]
pub enum ImpactModel {
    /// Impacts restricted to a finite set of candidate locations. A datum is
    /// credited to the nearest candidate when it lies within half a grid step
    /// of it.
    Discrete { locations: Vec<f64> },
    /// Exact density of a uniform firing angle (a Cauchy distribution),
    /// truncated to the wall `[low, high]`.
    Continuous { low: f64, high: f64 },
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawImpactModel {
    Discrete { locations: Vec<f64> },
    Continuous { low: f64, high: f64 },
}

impl TryFrom<RawImpactModel> for ImpactModel {
    type Error = SuiteError;

    fn try_from(raw: RawImpactModel) -> Result<Self> {
        match raw {
            RawImpactModel::Discrete { locations } => Self::discrete(locations),
            RawImpactModel::Continuous { low, high } => Self::continuous(low, high),
        }
    }
}

impl ImpactModel {
    /// # Errors
    /// [`SuiteError::InvalidParameter`] if `locations` is empty, holds a
    /// non-finite value, or repeats a value.
    pub fn discrete(locations: impl Into<Vec<f64>>) -> Result<Self> {
        let mut locations: Vec<f64> = locations.into();
        locations.sort_by(f64::total_cmp);
        let malformed = locations.is_empty()
            || locations.iter().any(|x| !x.is_finite())
            || locations.windows(2).any(|w| w[0] == w[1]);
        if malformed {
            return Err(SuiteError::InvalidParameter {
                name: "locations",
                value: format!("{locations:?}"),
            });
        }
        Ok(Self::Discrete { locations })
    }

    /// # Errors
    /// [`SuiteError::InvalidParameter`] unless `low < high`, both finite.
    pub fn continuous(low: f64, high: f64) -> Result<Self> {
        if low.is_finite() && high.is_finite() && low < high {
            Ok(Self::Continuous { low, high })
        } else {
            Err(SuiteError::InvalidParameter {
                name: "wall",
                value: format!("[{low}, {high}]"),
            })
        }
    }
}

/// Index of the candidate credited with an impact at `x`.
fn nearest(locations: &[f64], x: f64) -> Option<usize> {
    let i = locations.partition_point(|v| *v < x);
    let candidates = [i.checked_sub(1), (i < locations.len()).then_some(i)];
    let best = candidates
        .into_iter()
        .flatten()
        .min_by(|a, b| (locations[*a] - x).abs().total_cmp(&(locations[*b] - x).abs()))?;

    // Half the spacing to the neighbouring candidate on the side of `x`, or
    // on the other side past either end of the wall.
    let below = best.checked_sub(1);
    let above = (best + 1 < locations.len()).then_some(best + 1);
    let neighbour = if x < locations[best] {
        below.or(above)
    } else {
        above.or(below)
    };
    let half_step = neighbour.map_or(0.0, |j| (locations[j] - locations[best]).abs() / 2.0);

    ((x - locations[best]).abs() <= half_step).then_some(best)
}

impl Likelihood<f64> for ImpactModel {
    fn likelihood(&self, datum: &f64, hypo: &Hypothesis) -> f64 {
        let (Some(alpha), Some(beta)) = (hypo.get(0), hypo.get(1)) else {
            return 0.0;
        };

        match self {
            Self::Discrete { locations } => {
                let Some(i) = nearest(locations, *datum) else {
                    return 0.0;
                };
                location_pmf(alpha, beta, locations).map_or(0.0, |pmf| pmf.probs()[i])
            }
            Self::Continuous { low, high } => {
                if !(*low..=*high).contains(datum) {
                    return 0.0;
                }
                Cauchy::new(alpha, beta).map_or(0.0, |c| {
                    let mass = c.cdf(high) - c.cdf(low);
                    if mass > 0.0 { c.f(datum) / mass } else { 0.0 }
                })
            }
        }
    }
}
