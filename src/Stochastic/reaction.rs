//! Reactions: substrates and products with multiplicities, net deltas,
//! arity, rate and the propensity bookkeeping used by the scheduler.
use crate::Stochastic::event_queue::EventId;
use crate::Stochastic::species::{Species, SpeciesId};
use crate::settings::ToleranceBand;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionId(pub usize);

#[derive(Debug, Clone)]
pub struct Reaction {
    pub id: ReactionId,
    pub substrates: Vec<(SpeciesId, u32)>,
    pub products: Vec<(SpeciesId, u32)>,
    /// net population change per species, zero entries dropped
    pub deltas: Vec<(SpeciesId, i64)>,
    pub arity: u32,
    pub rate: f64,
    pub(crate) event: EventId,
    /// propensity used for the pending schedule; <= 0 means not scheduled
    pub(crate) last_propensity: f64,
    pub(crate) fire_count: u64,
}

impl Reaction {
    pub fn new(
        id: ReactionId,
        event: EventId,
        substrates: Vec<(SpeciesId, u32)>,
        products: Vec<(SpeciesId, u32)>,
        rate: f64,
    ) -> Self {
        let arity = substrates.iter().map(|(_, m)| *m).sum();
        let mut deltas: Vec<(SpeciesId, i64)> = Vec::new();
        let mut add = |species: SpeciesId, d: i64| match deltas.iter_mut().find(|(s, _)| *s == species) {
            Some(entry) => entry.1 += d,
            None => deltas.push((species, d)),
        };
        for (s, m) in substrates.iter() {
            add(*s, -(*m as i64));
        }
        for (s, m) in products.iter() {
            add(*s, *m as i64);
        }
        deltas.retain(|(_, d)| *d != 0);
        Self {
            id,
            substrates,
            products,
            deltas,
            arity,
            rate,
            event,
            last_propensity: -1.0,
            fire_count: 0,
        }
    }

    /// Substrate combinations times rate over `molar_factor^(arity - 1)`.
    ///
    /// Combinations are falling factorials p(p-1)...(p-m+1) per substrate, i.e.
    /// the number of ordered picks, which matches deterministic mass-action rates.
    pub fn propensity(&self, species: &[Species], molar_factor: f64) -> f64 {
        let mut combinations = 1.0;
        for (s, mult) in self.substrates.iter() {
            let mut pop = species[s.0].population() as f64;
            for _ in 0..*mult {
                combinations *= pop;
                pop -= 1.0;
            }
        }
        combinations * self.rate / molar_factor.powi(self.arity as i32 - 1)
    }

    /// Whether a freshly computed positive propensity warrants a new firing time.
    pub fn needs_reschedule(&self, propensity: f64, tolerance: &ToleranceBand) -> bool {
        self.last_propensity <= 0.0
            || propensity > self.last_propensity * tolerance.high
            || propensity < self.last_propensity * tolerance.low
    }

    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    pub fn last_propensity(&self) -> f64 {
        self.last_propensity
    }

    pub fn is_source(&self) -> bool {
        self.substrates.is_empty()
    }
}
