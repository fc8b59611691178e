//! Feature registry: one feature per recurring structural role, each holding
//! the contexts (species expressing the role) seen so far and the generator
//! slots listening to it.
use crate::Features::rxn_gen::GenSlot;
use crate::Recognition::omniplex::{OmniId, Omniplex};
use crate::Stochastic::species::SpeciesId;
use crate::Structure::molecule::{MolId, MolType};
use crate::Structure::plex::{Plex, SiteSpec};
use crate::Structure::plex_iso::find_injection_where;
use crate::simulation::SimError;
use log::error;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub usize);

/// Identity of a feature. Binding keys keep their two ends sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    FreeSite { mol: MolId, site: usize },
    Binding { left: (MolId, usize), right: (MolId, usize) },
    Mol(MolId),
    Omni(OmniId),
}

impl FeatureKey {
    pub fn binding(a: (MolId, usize), b: (MolId, usize)) -> Self {
        if b < a {
            FeatureKey::Binding { left: b, right: a }
        } else {
            FeatureKey::Binding { left: a, right: b }
        }
    }
}

/// How a feature shows up in a family; indices refer to the family paradigm.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSpec {
    FreeSite(SiteSpec),
    /// `left` and `right` follow the orientation of the feature key
    Binding {
        binding: usize,
        left: SiteSpec,
        right: SiteSpec,
    },
    Mol(usize),
    Omni {
        omni: OmniId,
        mol_map: Vec<usize>,
        binding_map: Vec<usize>,
    },
}

/// family -> feature edge created at behaviorization
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEdge {
    pub feature: FeatureId,
    pub spec: ContextSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub species: SpeciesId,
    pub spec: ContextSpec,
}

/// position of a context in its feature's list; contexts are never removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId {
    pub feature: FeatureId,
    pub index: usize,
}

pub struct Feature {
    pub id: FeatureId,
    pub key: FeatureKey,
    pub contexts: Vec<Context>,
    pub(crate) slots: Vec<GenSlot>,
}

impl Feature {
    fn new(id: FeatureId, key: FeatureKey) -> Self {
        Self {
            id,
            key,
            contexts: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn generator_count(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Default)]
pub struct FeatureRegistry {
    features: Vec<Feature>,
    index: HashMap<FeatureKey, FeatureId>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn find(&self, key: &FeatureKey) -> Option<FeatureId> {
        self.index.get(key).copied()
    }

    pub fn get_or_create(&mut self, key: FeatureKey) -> FeatureId {
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = FeatureId(self.features.len());
        self.features.push(Feature::new(id, key));
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, id: FeatureId) -> Result<&Feature, SimError> {
        self.features
            .get(id.0)
            .ok_or(SimError::UnknownFeature(id.0))
    }

    pub(crate) fn get_mut(&mut self, id: FeatureId) -> Result<&mut Feature, SimError> {
        self.features
            .get_mut(id.0)
            .ok_or(SimError::UnknownFeature(id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// appends a context and returns its stable id
    pub(crate) fn push_context(
        &mut self,
        id: FeatureId,
        context: Context,
    ) -> Result<ContextId, SimError> {
        let feature = self.get_mut(id)?;
        feature.contexts.push(context);
        Ok(ContextId {
            feature: id,
            index: feature.contexts.len() - 1,
        })
    }

    /// Maps every binding, free site, mol and embedded omniplex of a new paradigm
    /// to its feature.
    ///
    /// Binding features must already have been declared; a binding without one
    /// is a configuration error. Bindings are checked before anything is
    /// created, so a failure leaves the registry untouched.
    pub fn behaviorize(
        &mut self,
        paradigm: &Plex,
        mols: &[MolType],
        omnis: &[Omniplex],
    ) -> Result<Vec<FeatureEdge>, SimError> {
        let mut binding_edges = Vec::with_capacity(paradigm.bindings.len());
        for (ndx, b) in paradigm.bindings.iter().enumerate() {
            let end0 = (paradigm.mols[b.0.mol], b.0.site);
            let end1 = (paradigm.mols[b.1.mol], b.1.site);
            let key = FeatureKey::binding(end0, end1);
            let Some(feature) = self.find(&key) else {
                let mol0 = &mols[end0.0.0];
                let mol1 = &mols[end1.0.0];
                let err = SimError::MissingBindingFeature {
                    left: format!("{}//{}", mol0.name, mol0.sites[end0.1].name),
                    right: format!("{}//{}", mol1.name, mol1.sites[end1.1].name),
                };
                error!("{}", err);
                return Err(err);
            };
            let (left, right) = if end0 <= end1 { (b.0, b.1) } else { (b.1, b.0) };
            binding_edges.push(FeatureEdge {
                feature,
                spec: ContextSpec::Binding {
                    binding: ndx,
                    left,
                    right,
                },
            });
        }

        let mut edges = Vec::new();
        for site in paradigm.free_sites(mols) {
            let feature = self.get_or_create(FeatureKey::FreeSite {
                mol: paradigm.mols[site.mol],
                site: site.site,
            });
            edges.push(FeatureEdge {
                feature,
                spec: ContextSpec::FreeSite(site),
            });
        }
        edges.extend(binding_edges);
        for (ndx, mol) in paradigm.mols.iter().enumerate() {
            let feature = self.get_or_create(FeatureKey::Mol(*mol));
            edges.push(FeatureEdge {
                feature,
                spec: ContextSpec::Mol(ndx),
            });
        }
        for omni in omnis.iter() {
            if let Some(edge) = omni_edge(omni, paradigm) {
                edges.push(edge);
            }
        }
        Ok(edges)
    }
}

/// First embedding of the omniplex pattern in `paradigm` whose required free
/// sites are free in the host.
pub fn omni_edge(omni: &Omniplex, paradigm: &Plex) -> Option<FeatureEdge> {
    let host_sites = paradigm.site_to_binding();
    let iso = find_injection_where(&omni.pattern, paradigm, |iso| {
        omni.free_sites.iter().all(|site| {
            iso.forward
                .site(*site)
                .map(|host| !host_sites.contains_key(&host))
                .unwrap_or(false)
        })
    })?;
    Some(FeatureEdge {
        feature: omni.feature,
        spec: ContextSpec::Omni {
            omni: omni.id,
            mol_map: iso.forward.dense_mols(),
            binding_map: iso.forward.dense_bindings(),
        },
    })
}
