//! Index maps between plexes and the backtracking search that finds them.
//!
//! The search fixes the image of the first source mol, then extends the map
//! along source bindings: once a mol is placed, each of its bindings determines
//! where the neighbouring mol must go. Because plexes are connected this pins
//! down the whole map, so backtracking only happens over the first mol's image.
//! Remaining bindings (rings, self-bonds) are checked afterwards.
use crate::Structure::plex::{Plex, SiteSpec};
use std::collections::HashMap;

/// partial map of mol and binding indices from one plex into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexMap {
    pub mol_map: Vec<Option<usize>>,
    pub binding_map: Vec<Option<usize>>,
}

impl PlexMap {
    fn empty(plex: &Plex) -> Self {
        Self {
            mol_map: vec![None; plex.mols.len()],
            binding_map: vec![None; plex.bindings.len()],
        }
    }

    pub fn mol(&self, ndx: usize) -> Option<usize> {
        self.mol_map.get(ndx).copied().flatten()
    }

    pub fn binding(&self, ndx: usize) -> Option<usize> {
        self.binding_map.get(ndx).copied().flatten()
    }

    pub fn site(&self, site: SiteSpec) -> Option<SiteSpec> {
        self.mol(site.mol).map(|m| SiteSpec::new(m, site.site))
    }

    /// dense mol map; only meaningful when every source mol is mapped
    pub fn dense_mols(&self) -> Vec<usize> {
        self.mol_map.iter().map(|m| m.unwrap_or(usize::MAX)).collect()
    }

    pub fn dense_bindings(&self) -> Vec<usize> {
        self.binding_map
            .iter()
            .map(|b| b.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Forward (source -> target) and backward (target -> source) maps kept in
/// step, so that every accepted assignment stays one-to-one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexIso {
    pub forward: PlexMap,
    pub backward: PlexMap,
}

impl PlexIso {
    fn empty(source: &Plex, target: &Plex) -> Self {
        Self {
            forward: PlexMap::empty(source),
            backward: PlexMap::empty(target),
        }
    }

    pub fn identity(plex: &Plex) -> Self {
        let map = PlexMap {
            mol_map: (0..plex.mols.len()).map(Some).collect(),
            binding_map: (0..plex.bindings.len()).map(Some).collect(),
        };
        Self {
            forward: map.clone(),
            backward: map,
        }
    }

    fn map_mol(&mut self, src: usize, tgt: usize) -> bool {
        match (self.forward.mol_map[src], self.backward.mol_map[tgt]) {
            (None, None) => {
                self.forward.mol_map[src] = Some(tgt);
                self.backward.mol_map[tgt] = Some(src);
                true
            }
            (Some(t), Some(s)) => t == tgt && s == src,
            _ => false,
        }
    }

    fn map_binding(&mut self, src: usize, tgt: usize) -> bool {
        match (self.forward.binding_map[src], self.backward.binding_map[tgt]) {
            (None, None) => {
                self.forward.binding_map[src] = Some(tgt);
                self.backward.binding_map[tgt] = Some(src);
                true
            }
            (Some(t), Some(s)) => t == tgt && s == src,
            _ => false,
        }
    }
}

/// one step of the extension order: place `mol` through the binding from `from` to (`mol`, `site`)
struct Step {
    mol: usize,
    from: SiteSpec,
    site: usize,
}

fn extension_order(plex: &Plex) -> Vec<Step> {
    let per_mol = plex.mol_bindings();
    let mut placed = vec![false; plex.mols.len()];
    let mut steps = Vec::new();
    let mut frontier = vec![0usize];
    placed[0] = true;
    while let Some(m) = frontier.pop() {
        for &b_ndx in per_mol[m].iter() {
            let b = plex.bindings[b_ndx];
            let (near, far) = if b.0.mol == m { (b.0, b.1) } else { (b.1, b.0) };
            if !placed[far.mol] {
                placed[far.mol] = true;
                steps.push(Step {
                    mol: far.mol,
                    from: near,
                    site: far.site,
                });
                frontier.push(far.mol);
            }
        }
    }
    steps
}

fn extend(
    source: &Plex,
    target: &Plex,
    target_sites: &HashMap<SiteSpec, usize>,
    steps: &[Step],
    iso: &mut PlexIso,
) -> bool {
    for step in steps {
        let Some(tgt_from) = iso.forward.site(step.from) else {
            return false;
        };
        let Some(&tgt_binding) = target_sites.get(&tgt_from) else {
            return false;
        };
        let Some(tgt_far) = target.bindings[tgt_binding].partner(tgt_from) else {
            return false;
        };
        if tgt_far.site != step.site || target.mols[tgt_far.mol] != source.mols[step.mol] {
            return false;
        }
        if !iso.map_mol(step.mol, tgt_far.mol) {
            return false;
        }
    }
    true
}

/// checks every source binding against the target once all mols are placed
fn map_rest_bindings(
    source: &Plex,
    target: &Plex,
    target_sites: &HashMap<SiteSpec, usize>,
    iso: &mut PlexIso,
) -> bool {
    for (ndx, b) in source.bindings.iter().enumerate() {
        let (Some(t0), Some(t1)) = (iso.forward.site(b.0), iso.forward.site(b.1)) else {
            return false;
        };
        let Some(&tgt_binding) = target_sites.get(&t0) else {
            return false;
        };
        if target.bindings[tgt_binding].partner(t0) != Some(t1) {
            return false;
        }
        if !iso.map_binding(ndx, tgt_binding) {
            return false;
        }
    }
    true
}

/// Runs `visit` on every injection of `source` into `target` until it returns true.
fn for_each_injection<F>(source: &Plex, target: &Plex, mut visit: F)
where
    F: FnMut(PlexIso) -> bool,
{
    if source.mols.is_empty()
        || source.mols.len() > target.mols.len()
        || source.bindings.len() > target.bindings.len()
    {
        return;
    }
    let steps = extension_order(source);
    let target_sites = target.site_to_binding();
    for candidate in 0..target.mols.len() {
        if target.mols[candidate] != source.mols[0] {
            continue;
        }
        let mut iso = PlexIso::empty(source, target);
        iso.map_mol(0, candidate);
        if extend(source, target, &target_sites, &steps, &mut iso)
            && map_rest_bindings(source, target, &target_sites, &mut iso)
            && visit(iso)
        {
            return;
        }
    }
}

/// Finds the first injection of `source` into `target` accepted by `accept`.
///
/// Mol types and site indices are preserved, and every source binding must be
/// present in the target. Sites free in the source may be bound in the target.
/// `source` must be connected.
pub fn find_injection_where<F>(source: &Plex, target: &Plex, accept: F) -> Option<PlexIso>
where
    F: Fn(&PlexIso) -> bool,
{
    let mut found = None;
    for_each_injection(source, target, |iso| {
        if accept(&iso) {
            found = Some(iso);
            true
        } else {
            false
        }
    });
    found
}

/// every injection of `source` into `target`, in order of the image of mol 0
pub fn find_all_injections(source: &Plex, target: &Plex) -> Vec<PlexIso> {
    let mut all = Vec::new();
    for_each_injection(source, target, |iso| {
        all.push(iso);
        false
    });
    all
}

/// Symmetries of a plex. The identity always comes first for a valid plex.
pub fn automorphisms(plex: &Plex) -> Vec<PlexIso> {
    find_all_injections(plex, plex)
}

pub fn find_injection(source: &Plex, target: &Plex) -> Option<PlexIso> {
    find_injection_where(source, target, |_| true)
}

/// Isomorphism: an injection between plexes of equal size, hence a bijection.
pub fn find_iso(source: &Plex, target: &Plex) -> Option<PlexIso> {
    if source.mols.len() != target.mols.len() || source.bindings.len() != target.bindings.len() {
        return None;
    }
    find_injection(source, target)
}
