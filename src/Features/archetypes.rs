//! Generic reaction archetypes.
//!
//! - `DimerizeGen`: binary generator on two free-site features; joins the two
//!   complexes with a new binding.
//! - `DecomposeGen`: unary generator on a binding feature; breaks the binding and
//!   yields one product (the binding closed a ring) or two.
//! - `ModifyGen`: unary generator on a mol or omniplex feature; when the
//!   enabling query holds, exchanges modification values of one mol, with an
//!   optional auxiliary substrate and product (e.g. ATP -> ADP).
use crate::Features::extrapolation::{Extrapolation, RateContext, RateExtrapolator};
use crate::Features::feature::{Context, ContextSpec};
use crate::Features::rxn_gen::{BinaryGen, ReactionDraft, UnaryGen};
use crate::Recognition::omniplex::StateQuery;
use crate::Stochastic::species::SpeciesId;
use crate::Structure::molecule::{MolId, MolParam, MolType};
use crate::simulation::{SimError, Simulation};

/// shape of a site of a species, defaulting to the first shape
fn site_shape(
    sim: &Simulation,
    species: SpeciesId,
    mol: usize,
    site: usize,
) -> Result<usize, SimError> {
    Ok(sim
        .species(species)?
        .site_state(mol, site)
        .map(|s| s.shape)
        .unwrap_or(0))
}

fn missing_rate(generator: &str, ctx: &RateContext) -> SimError {
    SimError::MissingRate {
        generator: generator.to_string(),
        left_shape: ctx.left_shape,
        right_shape: ctx.right_shape,
    }
}

pub struct DimerizeGen {
    name: String,
    extrapolation: Extrapolation,
}

impl DimerizeGen {
    pub fn new(extrapolation: Extrapolation) -> Self {
        Self {
            name: "dimerize".to_string(),
            extrapolation,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

impl BinaryGen for DimerizeGen {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_pair(
        &self,
        left: &Context,
        right: &Context,
        sim: &mut Simulation,
    ) -> Result<Vec<ReactionDraft>, SimError> {
        let (ContextSpec::FreeSite(left_site), ContextSpec::FreeSite(right_site)) =
            (&left.spec, &right.spec)
        else {
            return Ok(Vec::new());
        };
        let left_sp = sim.species(left.species)?;
        let right_sp = sim.species(right.species)?;
        let ctx = RateContext {
            left_shape: site_shape(sim, left.species, left_site.mol, left_site.site)?,
            right_shape: site_shape(sim, right.species, right_site.mol, right_site.site)?,
            left_weight: left_sp.weight,
            right_weight: right_sp.weight,
        };
        let rate = self
            .extrapolation
            .rate(&ctx)
            .ok_or_else(|| missing_rate(&self.name, &ctx))?;

        let mut params = left_sp.params.clone();
        params.extend(right_sp.params.iter().cloned());
        let left_plex = &sim.family(left_sp.family)?.paradigm;
        let right_plex = &sim.family(right_sp.family)?.paradigm;
        let joined = left_plex.join(right_plex, *left_site, *right_site)?;
        let product = sim.species_from_plex(&joined, params)?;

        Ok(vec![
            ReactionDraft::new(rate)
                .substrate(left.species, 1)
                .substrate(right.species, 1)
                .product(product, 1),
        ])
    }
}

pub struct DecomposeGen {
    name: String,
    extrapolation: Extrapolation,
    /// rates are keyed (right end, left end) of the binding feature
    flipped: bool,
}

impl DecomposeGen {
    pub fn new(extrapolation: Extrapolation, flipped: bool) -> Self {
        Self {
            name: "decompose".to_string(),
            extrapolation,
            flipped,
        }
    }
}

/// parameters of a tracked component, in the component's own mol order
fn component_params(old_to_new: &[Option<usize>], params: &[MolParam]) -> Vec<MolParam> {
    let mut placed: Vec<(usize, MolParam)> = old_to_new
        .iter()
        .zip(params.iter())
        .filter_map(|(new, p)| new.map(|n| (n, p.clone())))
        .collect();
    placed.sort_by_key(|(n, _)| *n);
    placed.into_iter().map(|(_, p)| p).collect()
}

impl UnaryGen for DecomposeGen {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_new_context(
        &self,
        context: &Context,
        sim: &mut Simulation,
    ) -> Result<Vec<ReactionDraft>, SimError> {
        let ContextSpec::Binding {
            binding,
            left,
            right,
        } = &context.spec
        else {
            return Ok(Vec::new());
        };
        let species = sim.species(context.species)?;
        let params = species.params.clone();
        let mut left_shape = site_shape(sim, context.species, left.mol, left.site)?;
        let mut right_shape = site_shape(sim, context.species, right.mol, right.site)?;
        if self.flipped {
            std::mem::swap(&mut left_shape, &mut right_shape);
        }
        let paradigm = sim.family(species.family)?.paradigm.clone();

        let (left_part, left_map) = paradigm.tracked_component(left.mol, Some(*binding));
        let first = sim.species_from_plex(&left_part, component_params(&left_map, &params))?;
        let mut draft_products = vec![first];
        if left_map[right.mol].is_none() {
            let (right_part, right_map) = paradigm.tracked_component(right.mol, Some(*binding));
            let second =
                sim.species_from_plex(&right_part, component_params(&right_map, &params))?;
            draft_products.push(second);
        }

        let first_weight = sim.species(first)?.weight;
        let second_weight = match draft_products.get(1) {
            Some(second) => sim.species(*second)?.weight,
            None => first_weight,
        };
        let ctx = RateContext {
            left_shape,
            right_shape,
            left_weight: first_weight,
            right_weight: second_weight,
        };
        let rate = self
            .extrapolation
            .rate(&ctx)
            .ok_or_else(|| missing_rate(&self.name, &ctx))?;

        let mut draft = ReactionDraft::new(rate).substrate(context.species, 1);
        for product in draft_products {
            draft = draft.product(product, 1);
        }
        Ok(vec![draft])
    }
}

/// Modification of one mol, enabled by a query over modification state.
///
/// On a mol feature the pattern is the mol alone (pattern mol 0). On an
/// omniplex feature the pattern is the omniplex pattern and `target` names
/// the pattern mol that gets modified.
pub struct ModifyGen {
    name: String,
    pub mol: MolId,
    target: usize,
    enabling: StateQuery,
    /// (modification site, new value)
    exchanges: Vec<(usize, usize)>,
    aux_substrate: Option<SpeciesId>,
    aux_product: Option<SpeciesId>,
    extrapolation: Extrapolation,
}

impl ModifyGen {
    /// # Arguments
    /// * `mol_type` / `mol` - the modified mol
    /// * `required` - (modification site, value) pairs of the modified mol that must hold to react
    /// * `exchanges` - (modification site, new value) pairs applied by the reaction
    pub fn new(
        name: &str,
        mol_type: &MolType,
        mol: MolId,
        required: &[(&str, &str)],
        exchanges: &[(&str, &str)],
        extrapolation: Extrapolation,
    ) -> Result<Self, SimError> {
        if mol_type.is_small() {
            return Err(SimError::BadParamVector(format!(
                "{} has no modification sites to modify",
                mol_type.name
            )));
        }
        let mut queries = Vec::with_capacity(required.len());
        for (site, value) in required {
            let mod_site = mol_type.mod_site_index(site)?;
            queries.push(StateQuery::ModIs {
                mol: 0,
                mod_site,
                value: mol_type.mod_value_index(mod_site, value)?,
            });
        }
        let mut mapped = Vec::with_capacity(exchanges.len());
        for (site, value) in exchanges {
            let mod_site = mol_type.mod_site_index(site)?;
            mapped.push((mod_site, mol_type.mod_value_index(mod_site, value)?));
        }
        Ok(Self {
            name: name.to_string(),
            mol,
            target: 0,
            enabling: StateQuery::All(queries),
            exchanges: mapped,
            aux_substrate: None,
            aux_product: None,
            extrapolation,
        })
    }

    /// Modifies pattern mol `target` of an omniplex instead of a lone mol.
    /// Queries built by `new` are moved onto that pattern mol.
    pub fn with_target(mut self, target: usize) -> Self {
        self.enabling = retarget(self.enabling, target);
        self.target = target;
        self
    }

    /// replaces the enabling query; mol indices refer to the pattern
    pub fn with_query(mut self, query: StateQuery) -> Self {
        self.enabling = query;
        self
    }

    pub fn with_aux_substrate(mut self, species: SpeciesId) -> Self {
        self.aux_substrate = Some(species);
        self
    }

    pub fn with_aux_product(mut self, species: SpeciesId) -> Self {
        self.aux_product = Some(species);
        self
    }
}

fn retarget(query: StateQuery, target: usize) -> StateQuery {
    match query {
        StateQuery::ModIs {
            mod_site, value, ..
        } => StateQuery::ModIs {
            mol: target,
            mod_site,
            value,
        },
        StateQuery::Not(inner) => StateQuery::Not(Box::new(retarget(*inner, target))),
        StateQuery::All(all) => {
            StateQuery::All(all.into_iter().map(|q| retarget(q, target)).collect())
        }
        StateQuery::Any(any) => {
            StateQuery::Any(any.into_iter().map(|q| retarget(q, target)).collect())
        }
        StateQuery::Always => StateQuery::Always,
    }
}

impl UnaryGen for ModifyGen {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_new_context(
        &self,
        context: &Context,
        sim: &mut Simulation,
    ) -> Result<Vec<ReactionDraft>, SimError> {
        let (mol_map, mol_ndx) = match &context.spec {
            ContextSpec::Mol(ndx) => (vec![*ndx], *ndx),
            ContextSpec::Omni { mol_map, .. } => match mol_map.get(self.target) {
                Some(ndx) => (mol_map.clone(), *ndx),
                None => return Ok(Vec::new()),
            },
            _ => return Ok(Vec::new()),
        };
        let species = sim.species(context.species)?;
        if !self.enabling.holds(&species.params, &mol_map) {
            return Ok(Vec::new());
        }
        let mut params = species.params.clone();
        let Some(MolParam::Mod(state)) = params.get_mut(mol_ndx) else {
            return Ok(Vec::new());
        };
        for (mod_site, value) in self.exchanges.iter() {
            if let Some(slot) = state.0.get_mut(*mod_site) {
                *slot = *value;
            }
        }
        // nothing would change
        if params == species.params {
            return Ok(Vec::new());
        }
        let family = species.family;
        let own_weight = species.weight;
        let partner_weight = match self.aux_substrate {
            Some(aux) => sim.species(aux)?.weight,
            None => f64::INFINITY,
        };
        let ctx = RateContext::unshaped(own_weight, partner_weight);
        let rate = self
            .extrapolation
            .rate(&ctx)
            .ok_or_else(|| missing_rate(&self.name, &ctx))?;

        let product = sim.get_member(family, params)?;
        let mut draft = ReactionDraft::new(rate)
            .substrate(context.species, 1)
            .product(product, 1);
        if let Some(aux) = self.aux_substrate {
            draft = draft.substrate(aux, 1);
        }
        if let Some(aux) = self.aux_product {
            draft = draft.product(aux, 1);
        }
        Ok(vec![draft])
    }
}
