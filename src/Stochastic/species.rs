//! Species: a family member with a concrete parameter vector, a population
//! and the reactions sensitive to that population.
use crate::Recognition::plex_family::FamilyId;
use crate::Stochastic::dumpable::Dumpable;
use crate::Stochastic::reaction::ReactionId;
use crate::Structure::molecule::{HasModificationState, HasWeight, MolParam};
use crate::simulation::SimError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

/// derived state of one binding site of one mol of the species
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteState {
    pub bound: bool,
    pub shape: usize,
}

#[derive(Debug, Clone)]
pub struct Species {
    pub id: SpeciesId,
    pub family: FamilyId,
    pub params: Vec<MolParam>,
    /// per paradigm mol, per binding site
    pub site_states: Vec<Vec<SiteState>>,
    pub weight: f64,
    pub tag: String,
    pub name: String,
    population: u64,
    notified: bool,
    pub(crate) sensitive: Vec<ReactionId>,
}

impl Species {
    pub fn new(
        id: SpeciesId,
        family: FamilyId,
        params: Vec<MolParam>,
        site_states: Vec<Vec<SiteState>>,
        weight: f64,
        name: String,
    ) -> Self {
        Self {
            id,
            family,
            params,
            site_states,
            weight,
            tag: format!("sp{}", id.0),
            name,
            population: 0,
            notified: false,
            sensitive: Vec::new(),
        }
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }

    /// marks the species notified; returns false if it already was
    pub(crate) fn mark_notified(&mut self) -> bool {
        !std::mem::replace(&mut self.notified, true)
    }

    pub fn sensitive_reactions(&self) -> &[ReactionId] {
        &self.sensitive
    }

    pub(crate) fn add_sensitive(&mut self, reaction: ReactionId) {
        if !self.sensitive.contains(&reaction) {
            self.sensitive.push(reaction);
        }
    }

    /// population after applying `delta`, or an error if it would leave the range of `u64`
    pub fn checked_population(&self, delta: i64) -> Result<u64, SimError> {
        match self.population.checked_add_signed(delta) {
            Some(next) => Ok(next),
            None if delta < 0 => Err(SimError::NegativePopulation {
                species: self.tag.clone(),
                population: self.population,
                delta,
            }),
            None => Err(SimError::PopulationOverflow {
                species: self.tag.clone(),
                population: self.population,
                delta: delta.to_string(),
            }),
        }
    }

    pub(crate) fn set_population(&mut self, population: u64) {
        self.population = population;
    }

    pub fn site_state(&self, mol: usize, site: usize) -> Option<SiteState> {
        self.site_states.get(mol).and_then(|m| m.get(site)).copied()
    }
}

impl HasWeight for Species {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl HasModificationState for Species {
    fn mod_value(&self, mol_ndx: usize, mod_site_ndx: usize) -> Option<usize> {
        self.params
            .get(mol_ndx)
            .and_then(|p| p.mod_state())
            .and_then(|s| s.0.get(mod_site_ndx))
            .copied()
    }
}

impl Dumpable for Species {
    fn header(&self) -> String {
        self.tag.clone()
    }
    fn value(&self) -> String {
        self.population.to_string()
    }
}
