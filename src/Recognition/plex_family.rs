//! Families: one canonical plex (the paradigm) per isomorphism class, the
//! feature edges computed when the family was first recognized, and the
//! per-family member cache mapping a parameter vector to its species.
//!
//! Member keys are canonical: a paradigm with symmetries (a homodimer, a ring of
//! equal mols) can list one physical state under several parameter vectors, and
//! all of them are folded onto the smallest one.
use crate::Features::feature::{ContextSpec, FeatureEdge};
use crate::Recognition::omniplex::Omniplex;
use crate::Stochastic::species::{SiteState, Species, SpeciesId};
use crate::Structure::molecule::{MolParam, MolType};
use crate::Structure::plex::{Plex, SiteSpec};
use crate::Structure::plex_iso::automorphisms;
use crate::simulation::SimError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(pub usize);

#[derive(Debug, Clone)]
pub struct PlexFamily {
    pub id: FamilyId,
    pub paradigm: Plex,
    pub default_params: Vec<MolParam>,
    /// feature edges, fixed at recognition time (late omniplexes append)
    pub edges: Vec<FeatureEdge>,
    /// mol maps of the paradigm onto itself, identity included
    symmetries: Vec<Vec<usize>>,
    members: HashMap<Vec<MolParam>, SpeciesId>,
    member_order: Vec<SpeciesId>,
}

impl PlexFamily {
    pub fn new(id: FamilyId, paradigm: Plex, mols: &[MolType], edges: Vec<FeatureEdge>) -> Self {
        let default_params = paradigm
            .mols
            .iter()
            .map(|m| mols[m.0].default_param())
            .collect();
        let symmetries = automorphisms(&paradigm)
            .into_iter()
            .map(|a| a.forward.dense_mols())
            .collect();
        Self {
            id,
            paradigm,
            default_params,
            edges,
            symmetries,
            members: HashMap::new(),
            member_order: Vec::new(),
        }
    }

    pub fn member(&self, params: &[MolParam]) -> Option<SpeciesId> {
        self.members.get(&self.canonical_params(params)).copied()
    }

    pub fn symmetry_count(&self) -> usize {
        self.symmetries.len()
    }

    /// Smallest parameter vector among the relabelings of `params` by the
    /// paradigm symmetries.
    pub fn canonical_params(&self, params: &[MolParam]) -> Vec<MolParam> {
        let mut best = params.to_vec();
        for symmetry in self.symmetries.iter() {
            if symmetry.len() != params.len() {
                continue;
            }
            let mut permuted = params.to_vec();
            for (src, &tgt) in symmetry.iter().enumerate() {
                if let Some(slot) = permuted.get_mut(tgt) {
                    *slot = params[src].clone();
                }
            }
            if permuted < best {
                best = permuted;
            }
        }
        best
    }

    /// species of this family in construction order
    pub fn members(&self) -> &[SpeciesId] {
        &self.member_order
    }

    /// Inserts a freshly constructed member under its canonical key. A second
    /// insertion under the same key means the cache was bypassed somewhere,
    /// which is fatal.
    pub(crate) fn insert_member(
        &mut self,
        params: Vec<MolParam>,
        species: SpeciesId,
    ) -> Result<(), SimError> {
        let params = self.canonical_params(&params);
        if let Some(existing) = self.members.get(&params) {
            return Err(SimError::InconsistentMember {
                family: self.id.0,
                existing: existing.0,
            });
        }
        self.members.insert(params, species);
        self.member_order.push(species);
        Ok(())
    }

    pub fn check_params(&self, params: &[MolParam], mols: &[MolType]) -> Result<(), SimError> {
        if params.len() != self.paradigm.mols.len() {
            return Err(SimError::BadParamVector(format!(
                "family {} has {} mols, got {} parameters",
                self.id.0,
                self.paradigm.mols.len(),
                params.len()
            )));
        }
        for (ndx, (param, mol_id)) in params.iter().zip(self.paradigm.mols.iter()).enumerate() {
            let mol = &mols[mol_id.0];
            if !mol.accepts(param) {
                return Err(SimError::BadParamVector(format!(
                    "parameter {:?} does not fit mol {} ({}) of family {}",
                    param, ndx, mol.name, self.id.0
                )));
            }
        }
        Ok(())
    }

    /// Builds (but does not insert) the species for `params`.
    ///
    /// Site states start from the allosteric shapes of each mol; every omniplex
    /// edge whose query holds then lays its shape overlay on top.
    pub fn make_member(
        &self,
        id: SpeciesId,
        params: Vec<MolParam>,
        mols: &[MolType],
        omnis: &[Omniplex],
    ) -> Result<Species, SimError> {
        self.check_params(&params, mols)?;
        let bound = self.paradigm.site_to_binding();
        let mut site_states: Vec<Vec<SiteState>> = self
            .paradigm
            .mols
            .iter()
            .zip(params.iter())
            .enumerate()
            .map(|(mol_ndx, (mol_id, param))| {
                mols[mol_id.0]
                    .allostery(param)
                    .into_iter()
                    .enumerate()
                    .map(|(site, shape)| SiteState {
                        bound: bound.contains_key(&SiteSpec::new(mol_ndx, site)),
                        shape,
                    })
                    .collect()
            })
            .collect();

        for edge in self.edges.iter() {
            if let ContextSpec::Omni { omni, mol_map, .. } = &edge.spec {
                let omniplex = &omnis[omni.0];
                if !omniplex.query.holds(&params, mol_map) {
                    continue;
                }
                for (pattern_site, shape) in omniplex.overlay.iter() {
                    let host_mol = mol_map[pattern_site.mol];
                    if let Some(state) = site_states
                        .get_mut(host_mol)
                        .and_then(|s| s.get_mut(pattern_site.site))
                    {
                        state.shape = *shape;
                    }
                }
            }
        }

        let weight = self
            .paradigm
            .mols
            .iter()
            .zip(params.iter())
            .map(|(m, p)| mols[m.0].param_weight(p))
            .sum();
        let name = self.informative_name(&params, mols);
        Ok(Species::new(id, self.id, params, site_states, weight, name))
    }

    /// `A_B::(A//s1 -> B//s2)` followed by `::` and the modification values, if any.
    /// Values are listed in canonical parameter order, so relabelings share a name.
    pub fn informative_name(&self, params: &[MolParam], mols: &[MolType]) -> String {
        let mol_name = |ndx: usize| mols[self.paradigm.mols[ndx].0].name.as_str();
        let site_name = |spec: SiteSpec| {
            let mol = &mols[self.paradigm.mols[spec.mol].0];
            format!("{}//{}", mol.name, mol.sites[spec.site].name)
        };
        let mut name = (0..self.paradigm.mols.len())
            .map(mol_name)
            .collect::<Vec<_>>()
            .join("_");
        if !self.paradigm.bindings.is_empty() {
            let bonds: Vec<String> = self
                .paradigm
                .bindings
                .iter()
                .map(|b| format!("({} -> {})", site_name(b.0), site_name(b.1)))
                .collect();
            name.push_str("::");
            name.push_str(&bonds.join(","));
        }
        let params = self.canonical_params(params);
        let mods: Vec<String> = params
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, MolParam::Mod(_)))
            .map(|(ndx, p)| {
                let mol = &mols[self.paradigm.mols[ndx].0];
                format!("{}[{}]", mol.name, mol.param_value_names(p).join(","))
            })
            .collect();
        if !mods.is_empty() {
            name.push_str("::");
            name.push_str(&mods.join(","));
        }
        name
    }
}
