use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use itertools::Itertools;
use rv::misc::linspace;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SuiteError};

/// One candidate parameter combination, e.g. `(mu, sigma)` or `(alpha, beta)`.
///
/// Hypotheses compare by value. Negative zero is folded into positive zero on
/// construction so that equality, ordering and hashing agree for every value
/// a [`HypothesisSpace`] can contain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>")]
pub struct Hypothesis(Vec<f64>);

impl Hypothesis {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let mut values = values.into();
        values.iter_mut().for_each(|v| *v += 0.0);
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, dim: usize) -> Option<f64> {
        self.0.get(dim).copied()
    }
}

impl Eq for Hypothesis {}

impl Ord for Hypothesis {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl PartialOrd for Hypothesis {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Hypothesis {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        self.0.iter().for_each(|v| v.to_bits().hash(state));
    }
}

impl Index<usize> for Hypothesis {
    type Output = f64;

    fn index(&self, dim: usize) -> &f64 {
        &self.0[dim]
    }
}

impl From<Vec<f64>> for Hypothesis {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[f64; N]> for Hypothesis {
    fn from(values: [f64; N]) -> Self {
        Self::new(values.to_vec())
    }
}

/// Declarative description of one grid of candidate values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridSpec {
    /// `n` evenly spaced values from `low` to `high`, both inclusive.
    Linear { low: f64, high: f64, n: usize },
    /// `start, start + step, ...` strictly below `stop`.
    Range { start: f64, stop: f64, step: f64 },
    /// An explicit list of values.
    Values { values: Vec<f64> },
}

impl GridSpec {
    /// Expand the description into concrete values.
    ///
    /// Descriptions that cannot produce any value (zero or too many points,
    /// a non-positive step) expand to an empty grid, which
    /// [`HypothesisSpace::new`] rejects.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::Linear { n: 0, .. } => Vec::new(),
            Self::Linear { low, n: 1, .. } => vec![*low],
            Self::Linear { low, high, n } => {
                i32::try_from(*n).map_or_else(|_| Vec::new(), |n| linspace(*low, *high, n))
            }
            Self::Range { start, stop, step } => {
                if !(step.is_finite() && *step > 0.0 && start.is_finite() && stop.is_finite()) {
                    return Vec::new();
                }
                let n = ((stop - start) / step).ceil().max(0.0) as usize;
                (0..n).map(|i| step.mul_add(i as f64, *start)).collect()
            }
            Self::Values { values } => values.clone(),
        }
    }
}

/// The closed set of hypotheses: the Cartesian product of one grid per dimension.
///
/// Hypotheses are stored in row-major order, the last dimension varying fastest.
/// Only the grids are serialized; deserializing rebuilds the product through
/// [`HypothesisSpace::new`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpace")]
pub struct HypothesisSpace {
    grids: Vec<Vec<f64>>,
    #[serde(skip_serializing)]
    hypotheses: Vec<Hypothesis>,
}

#[derive(Deserialize)]
struct RawSpace {
    grids: Vec<Vec<f64>>,
}

impl TryFrom<RawSpace> for HypothesisSpace {
    type Error = SuiteError;

    fn try_from(raw: RawSpace) -> Result<Self> {
        Self::new(raw.grids)
    }
}

impl HypothesisSpace {
    /// Build the space from one grid per dimension.
    ///
    /// # Errors
    /// [`SuiteError::InvalidGrid`] if no grid is given, or a grid is empty,
    /// contains a non-finite value, or repeats a value.
    pub fn new<I, G>(grids: I) -> Result<Self>
    where
        I: IntoIterator<Item = G>,
        G: Into<Vec<f64>>,
    {
        let grids: Vec<Vec<f64>> = grids
            .into_iter()
            .map(|g| g.into().into_iter().map(|v| v + 0.0).collect())
            .collect();

        if grids.is_empty() {
            return Err(SuiteError::InvalidGrid {
                dim: 0,
                reason: String::from("no grids supplied"),
            });
        }

        for (dim, grid) in grids.iter().enumerate() {
            validate_grid(dim, grid)?;
        }

        let hypotheses = grids
            .iter()
            .map(|grid| grid.iter().copied())
            .multi_cartesian_product()
            .map(Hypothesis)
            .collect();

        Ok(Self { grids, hypotheses })
    }

    /// Build the space from grid descriptions.
    ///
    /// # Errors
    /// As [`HypothesisSpace::new`].
    pub fn from_specs(specs: &[GridSpec]) -> Result<Self> {
        Self::new(specs.iter().map(GridSpec::values))
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.grids.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// Always `false`; construction rejects empty grids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// The grid of candidate values for `dim`.
    ///
    /// # Errors
    /// [`SuiteError::DimensionOutOfRange`] if `dim` is not a dimension of the space.
    pub fn grid(&self, dim: usize) -> Result<&[f64]> {
        self.grids
            .get(dim)
            .map(Vec::as_slice)
            .ok_or(SuiteError::DimensionOutOfRange {
                dim,
                dims: self.dims(),
            })
    }

    #[must_use]
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hypothesis> {
        self.hypotheses.iter()
    }

    /// Position of `value` on the grid of `dim`.
    #[must_use]
    pub fn position(&self, dim: usize, value: f64) -> Option<usize> {
        self.grids.get(dim)?.iter().position(|v| *v == value)
    }

    /// Index of `hypo` in [`HypothesisSpace::hypotheses`], or `None` if it is
    /// not a member of the space.
    #[must_use]
    pub fn index_of(&self, hypo: &Hypothesis) -> Option<usize> {
        if hypo.dims() != self.dims() {
            return None;
        }
        hypo.values()
            .iter()
            .enumerate()
            .try_fold(0, |acc, (dim, value)| {
                self.position(dim, *value)
                    .map(|pos| acc * self.grids[dim].len() + pos)
            })
    }
}

impl<'a> IntoIterator for &'a HypothesisSpace {
    type Item = &'a Hypothesis;
    type IntoIter = std::slice::Iter<'a, Hypothesis>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate_grid(dim: usize, grid: &[f64]) -> Result<()> {
    let invalid = |reason: String| Err(SuiteError::InvalidGrid { dim, reason });

    if grid.is_empty() {
        return invalid(String::from("grid is empty"));
    }

    if let Some(v) = grid.iter().find(|v| !v.is_finite()) {
        return invalid(format!("grid contains non-finite value {v}"));
    }

    let mut sorted = grid.to_vec();
    sorted.sort_by(f64::total_cmp);
    if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return invalid(format!("grid repeats value {}", w[0]));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn product_is_row_major() {
        let space = HypothesisSpace::new([vec![20.0, 22.0], vec![5.0, 6.0]]).unwrap();
        let hypos: Vec<Vec<f64>> = space.iter().map(|h| h.values().to_vec()).collect();
        assert_eq!(
            hypos,
            vec![
                vec![20.0, 5.0],
                vec![20.0, 6.0],
                vec![22.0, 5.0],
                vec![22.0, 6.0]
            ]
        );
        assert_eq!(space.dims(), 2);
        assert_eq!(space.len(), 4);
    }

    #[test]
    fn single_grid_gives_one_dimensional_hypotheses() {
        let space = HypothesisSpace::new([vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(space.len(), 3);
        assert!(space.iter().all(|h| h.dims() == 1));
    }

    #[test]
    fn rejects_malformed_grids() {
        let no_grids: Vec<Vec<f64>> = Vec::new();
        assert!(matches!(
            HypothesisSpace::new(no_grids),
            Err(SuiteError::InvalidGrid { dim: 0, .. })
        ));
        assert!(matches!(
            HypothesisSpace::new([vec![1.0], vec![]]),
            Err(SuiteError::InvalidGrid { dim: 1, .. })
        ));
        assert!(matches!(
            HypothesisSpace::new([vec![1.0, f64::NAN]]),
            Err(SuiteError::InvalidGrid { dim: 0, .. })
        ));
        assert!(matches!(
            HypothesisSpace::new([vec![1.0, f64::INFINITY]]),
            Err(SuiteError::InvalidGrid { dim: 0, .. })
        ));
        assert!(matches!(
            HypothesisSpace::new([vec![0.0, 2.0, -0.0]]),
            Err(SuiteError::InvalidGrid { dim: 0, .. })
        ));
    }

    #[test]
    fn index_of_finds_every_member() {
        let space = HypothesisSpace::new([vec![1.0, 2.0, 3.0], vec![0.5, 1.5], vec![7.0]]).unwrap();
        for (i, h) in space.iter().enumerate() {
            assert_eq!(space.index_of(h), Some(i));
        }
        assert_eq!(space.index_of(&Hypothesis::from([4.0, 0.5, 7.0])), None);
        assert_eq!(space.index_of(&Hypothesis::from([1.0, 0.5])), None);
    }

    #[test]
    fn negative_zero_is_the_same_hypothesis() {
        let a = Hypothesis::from([-0.0, 1.0]);
        let b = Hypothesis::from([0.0, 1.0]);
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        let set: HashSet<Hypothesis> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn range_spec_matches_integer_range() {
        let grid = GridSpec::Range {
            start: 0.0,
            stop: 31.0,
            step: 1.0,
        }
        .values();
        assert_eq!(grid.len(), 31);
        assert_eq!(grid.first(), Some(&0.0));
        assert_eq!(grid.last(), Some(&30.0));
    }

    #[test]
    fn linear_spec_is_inclusive() {
        let grid = GridSpec::Linear {
            low: 20.0,
            high: 22.0,
            n: 3,
        }
        .values();
        assert::close(grid, vec![20.0, 21.0, 22.0], 1e-12);

        let single = GridSpec::Linear {
            low: 4.0,
            high: 9.0,
            n: 1,
        };
        assert_eq!(single.values(), vec![4.0]);
    }

    #[test]
    fn degenerate_specs_are_rejected_by_the_space() {
        let specs = [GridSpec::Range {
            start: 0.0,
            stop: 10.0,
            step: 0.0,
        }];
        assert!(matches!(
            HypothesisSpace::from_specs(&specs),
            Err(SuiteError::InvalidGrid { dim: 0, .. })
        ));
    }

    #[test]
    fn oversized_linear_spec_is_empty() {
        let spec = GridSpec::Linear {
            low: 0.0,
            high: 1.0,
            n: usize::MAX,
        };
        assert!(spec.values().is_empty());
        assert!(matches!(
            HypothesisSpace::from_specs(&[spec]),
            Err(SuiteError::InvalidGrid { dim: 0, .. })
        ));
    }

    #[test]
    fn deserializing_rebuilds_and_validates_the_space() {
        let space = HypothesisSpace::new([vec![1.0, 2.0], vec![0.5]]).unwrap();
        let json = serde_json::to_string(&space).unwrap();
        assert_eq!(json, r#"{"grids":[[1.0,2.0],[0.5]]}"#);
        let back: HypothesisSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, space);

        // A stale hypothesis list is ignored in favour of the grids.
        let back: HypothesisSpace =
            serde_json::from_str(r#"{"grids": [[1.0, 2.0]], "hypotheses": [[7.0]]}"#).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.index_of(&Hypothesis::from([2.0])), Some(1));

        assert!(serde_json::from_str::<HypothesisSpace>(r#"{"grids": [[1.0, 1.0]]}"#).is_err());
        assert!(serde_json::from_str::<HypothesisSpace>(r#"{"grids": []}"#).is_err());
    }

    #[test]
    fn deserialized_hypothesis_folds_negative_zero() {
        let h: Hypothesis = serde_json::from_str("[-0.0, 1.0]").unwrap();
        assert_eq!(h.values()[0].to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn grid_spec_from_json() {
        let spec: GridSpec =
            serde_json::from_str(r#"{"kind": "linear", "low": 0.0, "high": 1.0, "n": 11}"#)
                .unwrap();
        assert_eq!(
            spec,
            GridSpec::Linear {
                low: 0.0,
                high: 1.0,
                n: 11
            }
        );
        assert_eq!(spec.values().len(), 11);
    }
}
