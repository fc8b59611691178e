//! Reaction generator traits and the slots through which features reach them.
//!
//! A generator never touches the reaction store itself: it looks at the
//! simulation (and may recognize plexes and build product species through it)
//! and hands back drafts. The simulation registers, sensitizes and schedules them.
use crate::Features::feature::{Context, FeatureId};
use crate::Stochastic::species::SpeciesId;
use crate::simulation::{SimError, Simulation};
use std::rc::Rc;

/// A reaction as proposed by a generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionDraft {
    pub substrates: Vec<(SpeciesId, u32)>,
    pub products: Vec<(SpeciesId, u32)>,
    pub rate: f64,
}

impl ReactionDraft {
    pub fn new(rate: f64) -> Self {
        Self {
            substrates: Vec::new(),
            products: Vec::new(),
            rate,
        }
    }

    /// adds a substrate, merging repeated species into one multiplicity
    pub fn substrate(mut self, species: SpeciesId, mult: u32) -> Self {
        merge(&mut self.substrates, species, mult);
        self
    }

    pub fn product(mut self, species: SpeciesId, mult: u32) -> Self {
        merge(&mut self.products, species, mult);
        self
    }
}

fn merge(list: &mut Vec<(SpeciesId, u32)>, species: SpeciesId, mult: u32) {
    match list.iter_mut().find(|(s, _)| *s == species) {
        Some(entry) => entry.1 += mult,
        None => list.push((species, mult)),
    }
}

/// Observer of a single feature.
pub trait UnaryGen {
    fn name(&self) -> &str;
    fn on_new_context(
        &self,
        context: &Context,
        sim: &mut Simulation,
    ) -> Result<Vec<ReactionDraft>, SimError>;
}

/// Observer of a pair of features. `left` is always a context of the left
/// feature and `right` one of the right feature.
pub trait BinaryGen {
    fn name(&self) -> &str;
    fn on_pair(
        &self,
        left: &Context,
        right: &Context,
        sim: &mut Simulation,
    ) -> Result<Vec<ReactionDraft>, SimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId(pub usize);

/// a binary generator and the two features its halves sit on
pub struct BinaryPair {
    pub generator: Rc<dyn BinaryGen>,
    pub left: FeatureId,
    pub right: FeatureId,
}

impl BinaryPair {
    /// both halves on one feature: only one slot is registered and pairs are unordered
    pub fn is_symmetric(&self) -> bool {
        self.left == self.right
    }
}

/// What a feature holds for each registered generator.
#[derive(Clone)]
pub enum GenSlot {
    Unary(Rc<dyn UnaryGen>),
    Left(PairId),
    Right(PairId),
}
