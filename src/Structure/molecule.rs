//! Molecule types ("mols"): binding sites with their shapes, modification sites
//! with enumerated values, molecular weight and allosteric site-shape maps.
//!
//! A mol is immutable once it has been handed to the simulation. The only thing a
//! complex carries per mol occurrence is a [`MolParam`]: the unit variant for mols
//! without modification sites, or the full modification state otherwise.
use crate::simulation::SimError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Handle of a molecule type inside the simulation arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MolId(pub usize);

/// Anything that contributes mass, used by mass-action rate extrapolation.
pub trait HasWeight {
    fn weight(&self) -> f64;
}

/// Read access to modification values: (mol occurrence, modification site) -> value index.
pub trait HasModificationState {
    fn mod_value(&self, mol_ndx: usize, mod_site_ndx: usize) -> Option<usize>;
}

/// named attachment point on a mol. The first shape is the default one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSite {
    pub name: String,
    pub shapes: Vec<String>,
}

impl BindingSite {
    /// site with the single shape "default"
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shapes: vec!["default".to_string()],
        }
    }
    pub fn with_shapes(name: &str, shapes: Vec<&str>) -> Self {
        let shapes = if shapes.is_empty() {
            vec!["default".to_string()]
        } else {
            shapes.iter().map(|s| s.to_string()).collect()
        };
        Self {
            name: name.to_string(),
            shapes,
        }
    }
    pub fn shape_index(&self, shape: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s == shape)
    }
}

/// one value a modification site can take; phosphate and the like add weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModValue {
    pub name: String,
    pub weight_delta: f64,
}

impl ModValue {
    pub fn new(name: &str, weight_delta: f64) -> Self {
        Self {
            name: name.to_string(),
            weight_delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModSite {
    pub name: String,
    pub values: Vec<ModValue>,
    pub default: usize,
}

impl ModSite {
    /// # Arguments
    /// * `name` - name of the modification site
    /// * `values` - names of allowed values, all weightless
    /// * `default` - name of the default value, must be one of `values`
    pub fn new(name: &str, values: Vec<&str>, default: &str) -> Result<Self, SimError> {
        let values: Vec<ModValue> = values.iter().map(|v| ModValue::new(v, 0.0)).collect();
        Self::with_values(name, values, default)
    }

    pub fn with_values(name: &str, values: Vec<ModValue>, default: &str) -> Result<Self, SimError> {
        let default = values
            .iter()
            .position(|v| v.name == default)
            .ok_or_else(|| SimError::UnknownModValue {
                mol: String::new(),
                mod_site: name.to_string(),
                value: default.to_string(),
            })?;
        Ok(Self {
            name: name.to_string(),
            values,
            default,
        })
    }

    pub fn value_index(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name == value)
    }
}

/// value index chosen on every modification site of a mol, in mod-site order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModState(pub Vec<usize>);

/// Parameter of one mol occurrence inside a complex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MolParam {
    /// mol without modification sites
    Small,
    Mod(ModState),
}

impl MolParam {
    pub fn mod_state(&self) -> Option<&ModState> {
        match self {
            MolParam::Small => None,
            MolParam::Mod(state) => Some(state),
        }
    }
}

/// Molecule type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MolType {
    pub name: String,
    pub sites: Vec<BindingSite>,
    pub mod_sites: Vec<ModSite>,
    pub weight: f64,
    /// modification state -> shape index per binding site
    allostery: HashMap<ModState, Vec<usize>>,
}

impl MolType {
    /// creates a mol, rejecting duplicated site and modification-site names.
    /// Mols without a given weight weigh 1.0 so that mass extrapolation stays finite.
    pub fn new(
        name: &str,
        sites: Vec<BindingSite>,
        mod_sites: Vec<ModSite>,
        weight: Option<f64>,
    ) -> Result<Self, SimError> {
        let mut seen = HashSet::new();
        for site in sites.iter() {
            if !seen.insert(site.name.clone()) {
                return Err(SimError::DuplicateSite {
                    mol: name.to_string(),
                    site: site.name.clone(),
                });
            }
        }
        let mut seen_mods = HashSet::new();
        for mod_site in mod_sites.iter() {
            if !seen_mods.insert(mod_site.name.clone()) {
                return Err(SimError::DuplicateModSite {
                    mol: name.to_string(),
                    mod_site: mod_site.name.clone(),
                });
            }
            if mod_site.default >= mod_site.values.len() {
                return Err(SimError::UnknownModValue {
                    mol: name.to_string(),
                    mod_site: mod_site.name.clone(),
                    value: format!("#{}", mod_site.default),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            sites,
            mod_sites,
            weight: weight.unwrap_or(1.0),
            allostery: HashMap::new(),
        })
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn is_small(&self) -> bool {
        self.mod_sites.is_empty()
    }

    pub fn site_index(&self, site: &str) -> Result<usize, SimError> {
        self.sites
            .iter()
            .position(|s| s.name == site)
            .ok_or_else(|| SimError::UnknownSite {
                mol: self.name.clone(),
                site: site.to_string(),
            })
    }

    pub fn mod_site_index(&self, mod_site: &str) -> Result<usize, SimError> {
        self.mod_sites
            .iter()
            .position(|s| s.name == mod_site)
            .ok_or_else(|| SimError::UnknownModSite {
                mol: self.name.clone(),
                mod_site: mod_site.to_string(),
            })
    }

    pub fn mod_value_index(&self, mod_site: usize, value: &str) -> Result<usize, SimError> {
        let site = &self.mod_sites[mod_site];
        site.value_index(value).ok_or_else(|| SimError::UnknownModValue {
            mol: self.name.clone(),
            mod_site: site.name.clone(),
            value: value.to_string(),
        })
    }

    pub fn default_state(&self) -> ModState {
        ModState(self.mod_sites.iter().map(|s| s.default).collect())
    }

    pub fn default_param(&self) -> MolParam {
        if self.is_small() {
            MolParam::Small
        } else {
            MolParam::Mod(self.default_state())
        }
    }

    /// builds a parameter from (mod site, value) name pairs; unnamed sites keep defaults
    pub fn param_from_names(&self, values: &[(&str, &str)]) -> Result<MolParam, SimError> {
        if self.is_small() {
            if let Some((mod_site, _)) = values.first() {
                return Err(SimError::UnknownModSite {
                    mol: self.name.clone(),
                    mod_site: mod_site.to_string(),
                });
            }
            return Ok(MolParam::Small);
        }
        let mut state = self.default_state();
        for (mod_site, value) in values {
            let site_ndx = self.mod_site_index(mod_site)?;
            state.0[site_ndx] = self.mod_value_index(site_ndx, value)?;
        }
        Ok(MolParam::Mod(state))
    }

    /// true if the parameter has the right variant and every value index is in range
    pub fn accepts(&self, param: &MolParam) -> bool {
        match param {
            MolParam::Small => self.is_small(),
            MolParam::Mod(state) => {
                state.0.len() == self.mod_sites.len()
                    && state
                        .0
                        .iter()
                        .zip(self.mod_sites.iter())
                        .all(|(v, site)| *v < site.values.len())
            }
        }
    }

    /// Registers shape overrides that apply whenever the mol is in `state`.
    ///
    /// # Arguments
    /// * `state` - full modification state triggering the overrides
    /// * `overrides` - (binding site name, shape name) pairs
    pub fn set_allosteric_shapes(
        &mut self,
        state: ModState,
        overrides: &[(&str, &str)],
    ) -> Result<(), SimError> {
        let mut shapes = vec![0; self.sites.len()];
        for (site, shape) in overrides {
            let site_ndx = self.site_index(site)?;
            let shape_ndx = self.sites[site_ndx].shape_index(shape).ok_or_else(|| {
                SimError::UnknownSite {
                    mol: self.name.clone(),
                    site: format!("{}:{}", site, shape),
                }
            })?;
            shapes[site_ndx] = shape_ndx;
        }
        self.allostery.insert(state, shapes);
        Ok(())
    }

    /// shape index of every binding site when the mol carries `param`
    pub fn allostery(&self, param: &MolParam) -> Vec<usize> {
        param
            .mod_state()
            .and_then(|state| self.allostery.get(state))
            .cloned()
            .unwrap_or_else(|| vec![0; self.sites.len()])
    }

    /// weight of the mol with modifications applied
    pub fn param_weight(&self, param: &MolParam) -> f64 {
        match param {
            MolParam::Small => self.weight,
            MolParam::Mod(state) => {
                self.weight
                    + state
                        .0
                        .iter()
                        .zip(self.mod_sites.iter())
                        .map(|(v, site)| site.values.get(*v).map(|m| m.weight_delta).unwrap_or(0.0))
                        .sum::<f64>()
            }
        }
    }

    /// names of the values in a parameter, e.g. ["p", "GDP"]
    pub fn param_value_names(&self, param: &MolParam) -> Vec<String> {
        match param {
            MolParam::Small => Vec::new(),
            MolParam::Mod(state) => state
                .0
                .iter()
                .zip(self.mod_sites.iter())
                .map(|(v, site)| site.values.get(*v).map(|m| m.name.clone()).unwrap_or_default())
                .collect(),
        }
    }
}

impl HasWeight for MolType {
    fn weight(&self) -> f64 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinase() -> MolType {
        MolType::new(
            "Kin",
            vec![
                BindingSite::new("scaffold"),
                BindingSite::with_shapes("substrate", vec!["closed", "open"]),
            ],
            vec![
                ModSite::with_values(
                    "T1",
                    vec![ModValue::new("none", 0.0), ModValue::new("p", 80.0)],
                    "none",
                )
                .unwrap(),
            ],
            Some(50_000.0),
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_mod_site_rejected() {
        let m = ModSite::new("T1", vec!["none", "p"], "none").unwrap();
        let result = MolType::new("Kin", vec![], vec![m.clone(), m], None);
        assert!(matches!(result, Err(SimError::DuplicateModSite { .. })));
    }

    #[test]
    fn test_unknown_default_value() {
        let result = ModSite::new("T1", vec!["none", "p"], "pp");
        assert!(result.is_err());
    }

    #[test]
    fn test_param_weight_and_names() {
        let kin = kinase();
        let param = kin.param_from_names(&[("T1", "p")]).unwrap();
        assert_eq!(param, MolParam::Mod(ModState(vec![1])));
        assert_eq!(kin.param_weight(&param), 50_080.0);
        assert_eq!(kin.param_value_names(&param), vec!["p".to_string()]);
        assert!(kin.accepts(&param));
        assert!(!kin.accepts(&MolParam::Small));
    }

    #[test]
    fn test_allostery_defaults_and_overrides() {
        let mut kin = kinase();
        assert_eq!(kin.allostery(&kin.default_param()), vec![0, 0]);
        kin.set_allosteric_shapes(ModState(vec![1]), &[("substrate", "open")])
            .unwrap();
        let phospho = kin.param_from_names(&[("T1", "p")]).unwrap();
        assert_eq!(kin.allostery(&phospho), vec![0, 1]);
        assert_eq!(kin.allostery(&kin.default_param()), vec![0, 0]);
    }
}
