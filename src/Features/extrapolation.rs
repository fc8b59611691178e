//! Rate extrapolation policies for generated reactions.
//!
//! A generator is configured with one rate, but the reactions it produces involve
//! complexes of many sizes and site shapes. The policy turns the configured value
//! into the rate of one concrete reaction.
use enum_dispatch::enum_dispatch;
use std::collections::HashMap;

/// What a policy may look at: the shapes of the two sites involved and the
/// weights of the two reacting species (right side is the partner or auxiliary species).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateContext {
    pub left_shape: usize,
    pub right_shape: usize,
    pub left_weight: f64,
    pub right_weight: f64,
}

impl RateContext {
    pub fn unshaped(left_weight: f64, right_weight: f64) -> Self {
        Self {
            left_shape: 0,
            right_shape: 0,
            left_weight,
            right_weight,
        }
    }
}

#[enum_dispatch]
pub trait RateExtrapolator {
    /// Rate of the concrete reaction, `None` if the shape pair has no rate.
    /// Shape pairs are looked up as given, then swapped.
    fn rate(&self, ctx: &RateContext) -> Option<f64>;
}

/// literal rate, optionally chosen by the shape pair
#[derive(Debug, Clone, PartialEq)]
pub struct NoExtrap {
    default_rate: Option<f64>,
    shape_rates: HashMap<(usize, usize), f64>,
}

impl NoExtrap {
    pub fn new(rate: f64) -> Self {
        Self {
            default_rate: Some(rate),
            shape_rates: HashMap::new(),
        }
    }

    /// only the listed shape pairs react
    pub fn by_shape(shape_rates: HashMap<(usize, usize), f64>) -> Self {
        Self {
            default_rate: None,
            shape_rates,
        }
    }

    pub fn with_shape_rate(mut self, left: usize, right: usize, rate: f64) -> Self {
        self.shape_rates.insert((left, right), rate);
        self
    }
}

impl RateExtrapolator for NoExtrap {
    fn rate(&self, ctx: &RateContext) -> Option<f64> {
        self.shape_rates
            .get(&(ctx.left_shape, ctx.right_shape))
            .or_else(|| self.shape_rates.get(&(ctx.right_shape, ctx.left_shape)))
            .copied()
            .or(self.default_rate)
    }
}

/// Mass-action scaling of a binding rate.
///
/// The configured rate `k` was measured for reactants of weights `m1`, `m2`. The
/// invariant `k / sqrt(1/m1 + 1/m2)` is kept and the rate of a reaction between
/// species of weights `w1`, `w2` is `invariant * sqrt(1/w1 + 1/w2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MassExtrap {
    default_invariant: Option<f64>,
    shape_invariants: HashMap<(usize, usize), f64>,
}

fn reduced_mass_factor(w1: f64, w2: f64) -> f64 {
    (1.0 / w1 + 1.0 / w2).sqrt()
}

impl MassExtrap {
    pub fn new(rate: f64, ref_left_weight: f64, ref_right_weight: f64) -> Self {
        Self {
            default_invariant: Some(rate / reduced_mass_factor(ref_left_weight, ref_right_weight)),
            shape_invariants: HashMap::new(),
        }
    }

    pub fn with_shape_rate(
        mut self,
        left: usize,
        right: usize,
        rate: f64,
        ref_left_weight: f64,
        ref_right_weight: f64,
    ) -> Self {
        self.shape_invariants.insert(
            (left, right),
            rate / reduced_mass_factor(ref_left_weight, ref_right_weight),
        );
        self
    }
}

impl RateExtrapolator for MassExtrap {
    fn rate(&self, ctx: &RateContext) -> Option<f64> {
        let invariant = self
            .shape_invariants
            .get(&(ctx.left_shape, ctx.right_shape))
            .or_else(|| self.shape_invariants.get(&(ctx.right_shape, ctx.left_shape)))
            .copied()
            .or(self.default_invariant)?;
        Some(invariant * reduced_mass_factor(ctx.left_weight, ctx.right_weight))
    }
}

#[enum_dispatch(RateExtrapolator)]
#[derive(Debug, Clone, PartialEq)]
pub enum Extrapolation {
    NoExtrap(NoExtrap),
    MassExtrap(MassExtrap),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_extrap_shape_override() {
        let policy: Extrapolation = NoExtrap::new(1.0).with_shape_rate(1, 0, 5.0).into();
        let ctx = RateContext::unshaped(10.0, 20.0);
        assert_eq!(policy.rate(&ctx), Some(1.0));
        let shaped = RateContext {
            left_shape: 1,
            ..ctx
        };
        assert_eq!(policy.rate(&shaped), Some(5.0));
    }

    #[test]
    fn test_by_shape_missing_pair() {
        let mut rates = HashMap::new();
        rates.insert((0, 0), 2.0);
        let policy = NoExtrap::by_shape(rates);
        let ctx = RateContext {
            left_shape: 0,
            right_shape: 1,
            left_weight: 1.0,
            right_weight: 1.0,
        };
        assert_eq!(policy.rate(&ctx), None);
    }

    #[test]
    fn test_mass_extrap_reproduces_reference() {
        let policy: Extrapolation = MassExtrap::new(3.0, 100.0, 400.0).into();
        let at_ref = policy.rate(&RateContext::unshaped(100.0, 400.0)).unwrap();
        assert_relative_eq!(at_ref, 3.0, epsilon = 1e-12);
        // heavier partner binds slower
        let heavier = policy.rate(&RateContext::unshaped(100.0, 800.0)).unwrap();
        assert!(heavier < 3.0);
        let expected = 3.0 / (0.01f64 + 0.0025).sqrt() * (0.01f64 + 0.00125).sqrt();
        assert_relative_eq!(heavier, expected, epsilon = 1e-12);
    }
}
