/// Prevent the inner value from being verbosely / pretty printed during a debug.
pub(crate) struct NoPrettyPrint<T: std::fmt::Debug>(pub T);

impl<T: std::fmt::Debug> NoPrettyPrint<T> {
    pub const fn new(t: T) -> Self {
        Self(t)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for NoPrettyPrint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Prevent "{:#?}" from being used.
        write!(f, "{:?}", self.0)
    }
}

/// Trapezoidal integral of `y` sampled at `x`.
#[cfg(test)]
#[must_use]
pub(crate) fn trapz(y: &[f64], x: &[f64]) -> f64 {
    x.iter()
        .zip(x.iter().skip(1))
        .zip(y.iter().zip(y.iter().skip(1)))
        .map(|((x0, x1), (y0, y1))| (y1 + y0) * (x1 - x0) / 2.0)
        .sum()
}

/// Online Mean and Variance
#[derive(Default, Clone, Copy, Debug)]
pub struct MeanAndVariance {
    count: usize,
    mean: f64,
    m2: f64,
}

impl MeanAndVariance {
    #[must_use]
    pub fn update(self, new_value: f64) -> Self {
        let count = self.count + 1;
        let delta = new_value - self.mean;
        #[allow(clippy::cast_precision_loss)]
        let mean = self.mean + delta / (count as f64);
        let delta2 = new_value - mean;
        let m2 = delta.mul_add(delta2, self.m2);

        Self { count, mean, m2 }
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance; NaN with fewer than two values.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / ((self.count - 1) as f64)
        }
    }
}

impl FromIterator<f64> for MeanAndVariance {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::default(), |acc, x| acc.update(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapz_of_line() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 2.0];
        assert::close(trapz(&y, &x), 2.0, 1e-12);
    }

    #[test]
    fn mean_and_sample_variance() {
        let mv: MeanAndVariance = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .collect();
        assert_eq!(mv.count(), 8);
        assert::close(mv.mean(), 5.0, 1e-12);
        assert::close(mv.sample_variance(), 32.0 / 7.0, 1e-12);
    }

    #[test]
    fn variance_needs_two_values() {
        let mv: MeanAndVariance = std::iter::once(3.0).collect();
        assert!(mv.sample_variance().is_nan());
    }

    #[test]
    fn no_pretty_print_stays_on_one_line() {
        let s = format!("{:#?}", NoPrettyPrint::new(vec![1, 2]));
        assert_eq!(s, "[1, 2]");
    }
}
