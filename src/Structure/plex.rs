//! Complex structure instances ("plexes"): an ordered list of mol occurrences and
//! a list of bindings between (mol occurrence, site) pairs.
use crate::Structure::molecule::{MolId, MolType};
use crate::simulation::SimError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// (mol occurrence index, binding site index) inside one plex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteSpec {
    pub mol: usize,
    pub site: usize,
}

impl SiteSpec {
    pub fn new(mol: usize, site: usize) -> Self {
        Self { mol, site }
    }
}

/// Unordered pair of sites. Stored with the smaller site first so that two
/// literal plexes listing the same bond compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding(pub SiteSpec, pub SiteSpec);

impl Binding {
    pub fn new(a: SiteSpec, b: SiteSpec) -> Self {
        if b < a { Binding(b, a) } else { Binding(a, b) }
    }

    /// the other end of the binding, if `site` is one of its ends
    pub fn partner(&self, site: SiteSpec) -> Option<SiteSpec> {
        if self.0 == site {
            Some(self.1)
        } else if self.1 == site {
            Some(self.0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plex {
    pub mols: Vec<MolId>,
    pub bindings: Vec<Binding>,
}

/// Permutation-invariant summary of a plex, used as the recognizer bucket key.
/// Two isomorphic plexes always have equal signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlexSignature {
    mol_multiset: Vec<MolId>,
    /// each binding as ((mol type, site), (mol type, site)), sorted
    bond_types: Vec<((MolId, usize), (MolId, usize))>,
}

impl Plex {
    pub fn new() -> Self {
        Self::default()
    }

    /// plex holding a single mol with every site free
    pub fn single(mol: MolId) -> Self {
        Self {
            mols: vec![mol],
            bindings: Vec::new(),
        }
    }

    pub fn add_mol(&mut self, mol: MolId) -> usize {
        self.mols.push(mol);
        self.mols.len() - 1
    }

    /// adds a binding, refusing sites that are already bound
    pub fn add_binding(&mut self, a: SiteSpec, b: SiteSpec) -> Result<usize, SimError> {
        for site in [a, b] {
            if self.binding_at(site).is_some() {
                return Err(SimError::SiteAlreadyBound {
                    mol: site.mol,
                    site: site.site,
                });
            }
        }
        if a == b {
            return Err(SimError::BadPlex(format!(
                "site {}:{} bound to itself",
                a.mol, a.site
            )));
        }
        self.bindings.push(Binding::new(a, b));
        Ok(self.bindings.len() - 1)
    }

    pub fn binding_at(&self, site: SiteSpec) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| b.0 == site || b.1 == site)
    }

    /// site -> binding index, for every bound site
    pub fn site_to_binding(&self) -> HashMap<SiteSpec, usize> {
        let mut map = HashMap::with_capacity(self.bindings.len() * 2);
        for (ndx, b) in self.bindings.iter().enumerate() {
            map.insert(b.0, ndx);
            map.insert(b.1, ndx);
        }
        map
    }

    /// binding indices touching each mol occurrence
    pub fn mol_bindings(&self) -> Vec<Vec<usize>> {
        let mut per_mol = vec![Vec::new(); self.mols.len()];
        for (ndx, b) in self.bindings.iter().enumerate() {
            per_mol[b.0.mol].push(ndx);
            if b.1.mol != b.0.mol {
                per_mol[b.1.mol].push(ndx);
            }
        }
        per_mol
    }

    /// every site of every mol occurrence not mentioned by a binding, in (mol, site) order
    pub fn free_sites(&self, mols: &[MolType]) -> Vec<SiteSpec> {
        let bound = self.site_to_binding();
        let mut free = Vec::new();
        for (mol_ndx, mol_id) in self.mols.iter().enumerate() {
            for site in 0..mols[mol_id.0].site_count() {
                let spec = SiteSpec::new(mol_ndx, site);
                if !bound.contains_key(&spec) {
                    free.push(spec);
                }
            }
        }
        free
    }

    /// Checks indices, the one-binding-per-site rule and connectivity.
    pub fn validate(&self, mols: &[MolType]) -> Result<(), SimError> {
        if self.mols.is_empty() {
            return Err(SimError::BadPlex("plex without mols".to_string()));
        }
        for mol_id in self.mols.iter() {
            if mol_id.0 >= mols.len() {
                return Err(SimError::UnknownMolecule(format!("#{}", mol_id.0)));
            }
        }
        let mut seen = HashSet::new();
        for b in self.bindings.iter() {
            for site in [b.0, b.1] {
                let mol_id = self.mols.get(site.mol).ok_or_else(|| {
                    SimError::BadPlex(format!("binding refers to mol occurrence {}", site.mol))
                })?;
                let mol = &mols[mol_id.0];
                if site.site >= mol.site_count() {
                    return Err(SimError::UnknownSite {
                        mol: mol.name.clone(),
                        site: format!("#{}", site.site),
                    });
                }
                if !seen.insert(site) {
                    return Err(SimError::SiteAlreadyBound {
                        mol: site.mol,
                        site: site.site,
                    });
                }
            }
        }
        if !self.is_connected() {
            return Err(SimError::PlexNotConnected);
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        if self.mols.is_empty() {
            return true;
        }
        self.component_mols(0, None).len() == self.mols.len()
    }

    /// mol occurrences reachable from `start`, optionally ignoring one binding
    fn component_mols(&self, start: usize, skip_binding: Option<usize>) -> Vec<usize> {
        let per_mol = self.mol_bindings();
        let mut visited = vec![false; self.mols.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(m) = queue.pop_front() {
            order.push(m);
            for &b_ndx in per_mol[m].iter() {
                if Some(b_ndx) == skip_binding {
                    continue;
                }
                let b = &self.bindings[b_ndx];
                let other = if b.0.mol == m { b.1.mol } else { b.0.mol };
                if !visited[other] {
                    visited[other] = true;
                    queue.push_back(other);
                }
            }
        }
        order.sort_unstable();
        order
    }

    /// Extracts the connected component of `start` with binding `skip_binding` removed.
    ///
    /// Returns the component and a map from old mol indices to new ones
    /// (`None` for mols left behind). Used when a binding breaks.
    pub fn tracked_component(
        &self,
        start: usize,
        skip_binding: Option<usize>,
    ) -> (Plex, Vec<Option<usize>>) {
        let members = self.component_mols(start, skip_binding);
        let mut old_to_new = vec![None; self.mols.len()];
        let mut component = Plex::new();
        for &old in members.iter() {
            old_to_new[old] = Some(component.add_mol(self.mols[old]));
        }
        for (ndx, b) in self.bindings.iter().enumerate() {
            if Some(ndx) == skip_binding {
                continue;
            }
            if let (Some(m0), Some(m1)) = (old_to_new[b.0.mol], old_to_new[b.1.mol]) {
                component.bindings.push(Binding::new(
                    SiteSpec::new(m0, b.0.site),
                    SiteSpec::new(m1, b.1.site),
                ));
            }
        }
        (component, old_to_new)
    }

    /// Joins `other` onto `self` with a new binding between `left` (a site of
    /// `self`) and `right` (a site of `other`). Mols of `other` are offset by
    /// the mol count of `self`.
    pub fn join(&self, other: &Plex, left: SiteSpec, right: SiteSpec) -> Result<Plex, SimError> {
        let offset = self.mols.len();
        let mut joined = self.clone();
        joined.mols.extend(other.mols.iter().copied());
        for b in other.bindings.iter() {
            joined.bindings.push(Binding::new(
                SiteSpec::new(b.0.mol + offset, b.0.site),
                SiteSpec::new(b.1.mol + offset, b.1.site),
            ));
        }
        joined.add_binding(left, SiteSpec::new(right.mol + offset, right.site))?;
        Ok(joined)
    }

    pub fn signature(&self) -> PlexSignature {
        let mut mol_multiset = self.mols.clone();
        mol_multiset.sort_unstable();
        let mut bond_types: Vec<_> = self
            .bindings
            .iter()
            .map(|b| {
                let a = (self.mols[b.0.mol], b.0.site);
                let c = (self.mols[b.1.mol], b.1.site);
                if c < a { (c, a) } else { (a, c) }
            })
            .collect();
        bond_types.sort_unstable();
        PlexSignature {
            mol_multiset,
            bond_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Plex {
        // 0:1 - 1:0, 1:1 - 2:0
        let mut p = Plex::new();
        for _ in 0..3 {
            p.add_mol(MolId(0));
        }
        p.add_binding(SiteSpec::new(0, 1), SiteSpec::new(1, 0)).unwrap();
        p.add_binding(SiteSpec::new(1, 1), SiteSpec::new(2, 0)).unwrap();
        p
    }

    #[test]
    fn test_binding_is_unordered() {
        let a = SiteSpec::new(1, 0);
        let b = SiteSpec::new(0, 2);
        assert_eq!(Binding::new(a, b), Binding::new(b, a));
        assert_eq!(Binding::new(a, b).partner(a), Some(b));
    }

    #[test]
    fn test_site_bound_twice_rejected() {
        let mut p = chain();
        let err = p.add_binding(SiteSpec::new(0, 1), SiteSpec::new(2, 1));
        assert!(matches!(err, Err(SimError::SiteAlreadyBound { mol: 0, site: 1 })));
    }

    #[test]
    fn test_tracked_component_splits_chain() {
        let p = chain();
        let (left, map) = p.tracked_component(0, Some(1));
        assert_eq!(left.mols.len(), 2);
        assert_eq!(left.bindings.len(), 1);
        assert_eq!(map, vec![Some(0), Some(1), None]);
        let (right, map) = p.tracked_component(2, Some(1));
        assert_eq!(right.mols.len(), 1);
        assert_eq!(map, vec![None, None, Some(0)]);
    }

    #[test]
    fn test_connectivity() {
        let mut p = chain();
        assert!(p.is_connected());
        p.add_mol(MolId(0));
        assert!(!p.is_connected());
    }

    #[test]
    fn test_signature_ignores_order() {
        let p = chain();
        let mut q = Plex::new();
        for _ in 0..3 {
            q.add_mol(MolId(0));
        }
        q.add_binding(SiteSpec::new(2, 0), SiteSpec::new(0, 1)).unwrap();
        q.add_binding(SiteSpec::new(1, 0), SiteSpec::new(2, 1)).unwrap();
        assert_eq!(p.signature(), q.signature());
    }
}
