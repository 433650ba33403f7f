use serde::{Deserialize, Serialize};

use super::Likelihood;
use crate::error::{Result, SuiteError};
use crate::space::Hypothesis;

/// Outcome of two independent searches over the same population, e.g. two
/// testers hunting for bugs in the same program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCapture")]
pub struct Capture {
    /// Found by the first search.
    k1: u64,
    /// Found by the second search.
    k2: u64,
    /// Found by both.
    c: u64,
}

#[derive(Deserialize)]
struct RawCapture {
    k1: u64,
    k2: u64,
    c: u64,
}

impl TryFrom<RawCapture> for Capture {
    type Error = SuiteError;

    fn try_from(raw: RawCapture) -> Result<Self> {
        Self::new(raw.k1, raw.k2, raw.c)
    }
}

impl Capture {
    /// # Errors
    /// [`SuiteError::InvalidParameter`] if the overlap exceeds either search.
    pub fn new(k1: u64, k2: u64, c: u64) -> Result<Self> {
        if c > k1 || c > k2 {
            return Err(SuiteError::InvalidParameter {
                name: "overlap",
                value: format!("{c} > min({k1}, {k2})"),
            });
        }
        Ok(Self { k1, k2, c })
    }

    /// Number of distinct items seen by either search.
    #[must_use]
    pub const fn distinct(&self) -> u64 {
        self.k1 + self.k2 - self.c
    }

    /// The Lincoln index `k1 * k2 / c`, or `None` without overlap.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn lincoln_index(&self) -> Option<f64> {
        (self.c > 0).then(|| (self.k1 * self.k2) as f64 / self.c as f64)
    }
}

/// Multinomial capture model over hypotheses `(n, p1, p2)`: population size
/// and the chance each search finds a given item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureModel;

fn ln_factorial(k: f64) -> f64 {
    special::Gamma::ln_gamma(k + 1.0).0
}

/// `k * ln(q)`, with `0 * ln(0) = 0`.
fn xlny(k: f64, q: f64) -> f64 {
    if k == 0.0 { 0.0 } else { k * q.ln() }
}

impl Likelihood<Capture> for CaptureModel {
    fn likelihood(&self, datum: &Capture, hypo: &Hypothesis) -> f64 {
        self.ln_likelihood(datum, hypo).exp()
    }

    #[allow(clippy::cast_precision_loss)]
    fn ln_likelihood(&self, datum: &Capture, hypo: &Hypothesis) -> f64 {
        let (Some(n), Some(p1), Some(p2)) = (hypo.get(0), hypo.get(1), hypo.get(2)) else {
            return f64::NEG_INFINITY;
        };
        let is_prob = |p: f64| (0.0..=1.0).contains(&p);
        if !(n.is_finite() && n.fract() == 0.0 && is_prob(p1) && is_prob(p2)) {
            return f64::NEG_INFINITY;
        }

        let distinct = datum.distinct() as f64;
        if n < distinct {
            return f64::NEG_INFINITY;
        }

        let counts = [
            n - distinct,
            (datum.k1 - datum.c) as f64,
            (datum.k2 - datum.c) as f64,
            datum.c as f64,
        ];
        let qs = [
            (1.0 - p1) * (1.0 - p2),
            p1 * (1.0 - p2),
            (1.0 - p1) * p2,
            p1 * p2,
        ];

        ln_factorial(n)
            + counts
                .iter()
                .zip(qs.iter())
                .map(|(&k, &q)| xlny(k, q) - ln_factorial(k))
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_cannot_exceed_either_search() {
        assert!(Capture::new(5, 3, 4).is_err());
        let capture = Capture::new(20, 15, 3).unwrap();
        assert_eq!(capture.distinct(), 32);
        assert::close(capture.lincoln_index().unwrap(), 100.0, 1e-12);
        assert_eq!(Capture::new(2, 2, 0).unwrap().lincoln_index(), None);
    }

    #[test]
    fn deserialized_overlap_is_checked() {
        let capture: Capture = serde_json::from_str(r#"{"k1": 20, "k2": 15, "c": 3}"#).unwrap();
        assert_eq!(capture, Capture::new(20, 15, 3).unwrap());
        assert!(serde_json::from_str::<Capture>(r#"{"k1": 1, "k2": 1, "c": 3}"#).is_err());
    }

    #[test]
    fn too_small_population_is_impossible() {
        let capture = Capture::new(20, 15, 3).unwrap();
        let h = Hypothesis::from([31.0, 0.5, 0.5]);
        assert_eq!(CaptureModel.likelihood(&capture, &h), 0.0);
        let h = Hypothesis::from([32.0, 0.5, 0.5]);
        assert!(CaptureModel.likelihood(&capture, &h) > 0.0);
    }

    #[test]
    fn out_of_domain_parameters() {
        let capture = Capture::new(2, 2, 1).unwrap();
        for h in [[10.5, 0.5, 0.5], [10.0, 1.5, 0.5], [10.0, 0.5, -0.1]] {
            assert_eq!(CaptureModel.likelihood(&capture, &Hypothesis::from(h)), 0.0);
        }
    }

    #[test]
    fn matches_a_direct_multinomial() {
        // n = 4, cells (missed, first only, second only, both) = (1, 1, 1, 1)
        let capture = Capture::new(2, 2, 1).unwrap();
        let (p1, p2) = (0.3, 0.6);
        let direct = 24.0 * (0.7 * 0.4) * (0.3 * 0.4) * (0.7 * 0.6) * (0.3 * 0.6);
        let h = Hypothesis::from([4.0, p1, p2]);
        assert::close(CaptureModel.likelihood(&capture, &h), direct, 1e-12);
    }

    #[test]
    fn likelihood_peaks_near_the_lincoln_index() {
        let capture = Capture::new(20, 15, 3).unwrap();
        let best = (32..=400)
            .map(f64::from)
            .max_by(|a, b| {
                let la = CaptureModel.ln_likelihood(&capture, &Hypothesis::from([*a, 0.2, 0.15]));
                let lb = CaptureModel.ln_likelihood(&capture, &Hypothesis::from([*b, 0.2, 0.15]));
                la.total_cmp(&lb)
            })
            .unwrap();
        assert!((90.0..=110.0).contains(&best), "best = {best}");
    }
}
