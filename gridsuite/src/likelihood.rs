use crate::space::Hypothesis;

pub mod capture;
pub mod composite;
pub mod impact;
pub mod normal;

/// Probability (or density) of a datum under a hypothesis.
///
/// Implementations return a finite, non-negative number. Hypotheses whose
/// parameters are outside the model's domain score zero rather than failing.
pub trait Likelihood<O: ?Sized> {
    fn likelihood(&self, datum: &O, hypo: &Hypothesis) -> f64;

    /// Natural log of [`Likelihood::likelihood`]. Models override this when
    /// they can accumulate in log space without underflowing.
    fn ln_likelihood(&self, datum: &O, hypo: &Hypothesis) -> f64 {
        self.likelihood(datum, hypo).ln()
    }
}

impl<O: ?Sized, L: Likelihood<O> + ?Sized> Likelihood<O> for &L {
    fn likelihood(&self, datum: &O, hypo: &Hypothesis) -> f64 {
        (**self).likelihood(datum, hypo)
    }

    fn ln_likelihood(&self, datum: &O, hypo: &Hypothesis) -> f64 {
        (**self).ln_likelihood(datum, hypo)
    }
}

/// A likelihood defined by a closure.
#[derive(Clone, Copy, Debug)]
pub struct FnLikelihood<F>(F);

/// Wrap `f` as a [`Likelihood`].
pub const fn from_fn<O, F>(f: F) -> FnLikelihood<F>
where
    O: ?Sized,
    F: Fn(&O, &Hypothesis) -> f64,
{
    FnLikelihood(f)
}

impl<O, F> Likelihood<O> for FnLikelihood<F>
where
    O: ?Sized,
    F: Fn(&O, &Hypothesis) -> f64,
{
    fn likelihood(&self, datum: &O, hypo: &Hypothesis) -> f64 {
        (self.0)(datum, hypo)
    }
}
