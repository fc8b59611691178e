//! Embedded sub-complexes ("omniplexes"): a pattern plex that is looked for
//! inside every family, gated by a query over modification state.
use crate::Features::feature::FeatureId;
use crate::Structure::molecule::MolParam;
use crate::Structure::plex::{Plex, SiteSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OmniId(pub usize);

/// Boolean query over the modification state of the mols of a pattern.
/// Mol indices refer to the pattern; they are translated through the embedding
/// map before the host parameters are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateQuery {
    Always,
    ModIs {
        mol: usize,
        mod_site: usize,
        value: usize,
    },
    Not(Box<StateQuery>),
    All(Vec<StateQuery>),
    Any(Vec<StateQuery>),
}

impl StateQuery {
    /// # Arguments
    /// * `params` - parameters of the host species, indexed by host mol
    /// * `mol_map` - pattern mol -> host mol
    pub fn holds(&self, params: &[MolParam], mol_map: &[usize]) -> bool {
        match self {
            StateQuery::Always => true,
            StateQuery::ModIs {
                mol,
                mod_site,
                value,
            } => mol_map
                .get(*mol)
                .and_then(|host| params.get(*host))
                .and_then(|p| p.mod_state())
                .and_then(|state| state.0.get(*mod_site))
                .map(|v| v == value)
                .unwrap_or(false),
            StateQuery::Not(inner) => !inner.holds(params, mol_map),
            StateQuery::All(all) => all.iter().all(|q| q.holds(params, mol_map)),
            StateQuery::Any(any) => any.iter().any(|q| q.holds(params, mol_map)),
        }
    }
}

/// Declaration handed to the simulation.
#[derive(Debug, Clone)]
pub struct OmniSpec {
    pub pattern: Plex,
    /// pattern sites that must be free in the host
    pub free_sites: Vec<SiteSpec>,
    pub query: StateQuery,
    /// (pattern site, shape index) applied to hosts satisfying the query
    pub overlay: Vec<(SiteSpec, usize)>,
}

#[derive(Debug, Clone)]
pub struct Omniplex {
    pub id: OmniId,
    pub pattern: Plex,
    pub free_sites: Vec<SiteSpec>,
    pub query: StateQuery,
    pub overlay: Vec<(SiteSpec, usize)>,
    pub feature: FeatureId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Structure::molecule::ModState;

    #[test]
    fn test_state_query_combinators() {
        let params = vec![MolParam::Small, MolParam::Mod(ModState(vec![1, 0]))];
        let map = vec![1];
        let phospho = StateQuery::ModIs {
            mol: 0,
            mod_site: 0,
            value: 1,
        };
        let gtp = StateQuery::ModIs {
            mol: 0,
            mod_site: 1,
            value: 1,
        };
        assert!(phospho.holds(&params, &map));
        assert!(!gtp.holds(&params, &map));
        assert!(StateQuery::Any(vec![phospho.clone(), gtp.clone()]).holds(&params, &map));
        assert!(!StateQuery::All(vec![phospho.clone(), gtp.clone()]).holds(&params, &map));
        assert!(StateQuery::Not(Box::new(gtp)).holds(&params, &map));
        // a small mol has no modification state
        assert!(!phospho.holds(&params, &[0]));
    }
}
