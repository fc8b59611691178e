//! # Simulation Module
//!
//! ## Purpose
//! Owns every object of a run (mol types, families, species, reactions, features,
//! generators, omniplexes, the event queue) and drives the exact stochastic
//! simulation over a reaction network that is generated while it runs.
//!
//! ## Cascade
//! When a species is populated for the first time it notifies every feature it
//! expresses. Features hand the new context to their generators, generators
//! return reaction drafts, and the drafts are registered, sensitized to their
//! substrates and scheduled before control returns to the event loop. Products
//! of new reactions are notified eagerly while the generation depth allows it.
//!
//! ## Usage Pattern
//! ```rust, ignore
//! let mut sim = Simulation::new(SimConfig::unit_molar(1.0));
//! let a = sim.define_molecule(MolType::new("A", vec![BindingSite::new("s1")], vec![], None)?)?;
//! let b = sim.define_molecule(MolType::new("B", vec![BindingSite::new("s2")], vec![], None)?)?;
//! sim.add_dimerization(a, "s1", b, "s2", NoExtrap::new(1.0).into())?;
//! let (fam_a, _) = sim.recognize(&Plex::single(a))?;
//! let sp_a = sim.get_default_member(fam_a)?;
//! sim.create_event(sp_a, 10)?;
//! sim.schedule_fixed_event(FixedEvent::Stop, 5.0)?;
//! let outcome = sim.run(|_| false)?;
//! ```
use crate::Features::archetypes::{DecomposeGen, DimerizeGen, ModifyGen};
use crate::Features::extrapolation::Extrapolation;
use crate::Features::feature::{
    Context, ContextId, ContextSpec, FeatureId, FeatureKey, FeatureRegistry, omni_edge,
};
use crate::Features::rxn_gen::{BinaryGen, BinaryPair, GenSlot, PairId, ReactionDraft, UnaryGen};
use crate::Recognition::omniplex::{OmniId, OmniSpec, Omniplex};
use crate::Recognition::plex_family::{FamilyId, PlexFamily};
use crate::Recognition::recognizer::Recognizer;
use crate::Stochastic::dumpable::{BindingRecord, SimCounters, SpeciesRecord, species_table};
use crate::Stochastic::event_queue::{EventId, EventKind, EventQueue, FixedEvent};
use crate::Stochastic::reaction::{Reaction, ReactionId};
use crate::Stochastic::species::{Species, SpeciesId};
use crate::Structure::molecule::{MolId, MolParam, MolType};
use crate::Structure::plex::{Plex, SiteSpec};
use crate::Structure::plex_iso::PlexIso;
use crate::settings::SimConfig;
use log::{debug, error, info, warn};
use prettytable::Table;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown molecule: {0}")]
    UnknownMolecule(String),
    #[error("molecule {0} is already defined")]
    DuplicateMolecule(String),
    #[error("molecule {mol} has no binding site {site}")]
    UnknownSite { mol: String, site: String },
    #[error("molecule {mol} declares binding site {site} twice")]
    DuplicateSite { mol: String, site: String },
    #[error("molecule {mol} has no modification site {mod_site}")]
    UnknownModSite { mol: String, mod_site: String },
    #[error("molecule {mol} declares modification site {mod_site} twice")]
    DuplicateModSite { mol: String, mod_site: String },
    #[error("modification site {mol}.{mod_site} has no value {value}")]
    UnknownModValue {
        mol: String,
        mod_site: String,
        value: String,
    },
    #[error("site {site} of mol occurrence {mol} is already bound")]
    SiteAlreadyBound { mol: usize, site: usize },
    #[error("malformed complex: {0}")]
    BadPlex(String),
    #[error("complex is not connected")]
    PlexNotConnected,
    #[error("no binding is declared between {left} and {right}")]
    MissingBindingFeature { left: String, right: String },
    #[error("bad parameter vector: {0}")]
    BadParamVector(String),
    #[error("no rate for reaction generated by {generator} (site shapes {left_shape}, {right_shape})")]
    MissingRate {
        generator: String,
        left_shape: usize,
        right_shape: usize,
    },
    #[error("invalid rate {0}")]
    InvalidRate(f64),
    #[error("unknown feature {0}")]
    UnknownFeature(usize),
    #[error("unknown species {0}")]
    UnknownSpecies(usize),
    #[error("unknown event {0}")]
    UnknownEvent(usize),
    #[error("population of {species} would become negative ({population} {delta:+})")]
    NegativePopulation {
        species: String,
        population: u64,
        delta: i64,
    },
    #[error("population of {species} would overflow ({population} + {delta})")]
    PopulationOverflow {
        species: String,
        population: u64,
        delta: String,
    },
    #[error("at simulation time {now}, next event is at past time {time}")]
    EventInPast { now: f64, time: f64 },
    #[error("family {family} already has member sp{existing} for this parameter vector")]
    InconsistentMember { family: usize, existing: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Stopped,
    QueueEmpty,
    TimedOut,
    EventLimit,
    Predicate,
}

/// result of executing a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Stop,
}

pub type DumpSink = Box<dyn FnMut(&Simulation) -> Result<(), SimError>>;

pub struct Simulation {
    pub config: SimConfig,
    mols: Vec<MolType>,
    mol_index: HashMap<String, MolId>,
    recognizer: Recognizer,
    families: Vec<PlexFamily>,
    species: Vec<Species>,
    reactions: Vec<Reaction>,
    features: FeatureRegistry,
    pairs: Vec<BinaryPair>,
    seen_pairs: HashSet<(PairId, ContextId, ContextId)>,
    omnis: Vec<Omniplex>,
    queue: EventQueue,
    rng: ChaCha8Rng,
    volume: f64,
    /// reactions whose propensity depends on the molar factor (arity != 1)
    volume_sensitive: Vec<ReactionId>,
    counters: SimCounters,
    generation_enabled: bool,
    dump_sink: Option<DumpSink>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let volume = config.volume;
        Self {
            config,
            mols: Vec::new(),
            mol_index: HashMap::new(),
            recognizer: Recognizer::new(),
            families: Vec::new(),
            species: Vec::new(),
            reactions: Vec::new(),
            features: FeatureRegistry::new(),
            pairs: Vec::new(),
            seen_pairs: HashSet::new(),
            omnis: Vec::new(),
            queue: EventQueue::new(),
            rng,
            volume,
            volume_sensitive: Vec::new(),
            counters: SimCounters::default(),
            generation_enabled: true,
            dump_sink: None,
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // MODEL DEFINITION
    ////////////////////////////////////////////////////////////////////////////

    pub fn define_molecule(&mut self, mol: MolType) -> Result<MolId, SimError> {
        if self.mol_index.contains_key(&mol.name) {
            error!("molecule {} defined twice", mol.name);
            return Err(SimError::DuplicateMolecule(mol.name));
        }
        let id = MolId(self.mols.len());
        self.mol_index.insert(mol.name.clone(), id);
        debug!("defined molecule {} as #{}", mol.name, id.0);
        self.mols.push(mol);
        Ok(id)
    }

    /// Adds an allosteric shape override to a defined mol. Only species built
    /// afterwards see it.
    pub fn set_allosteric_shapes(
        &mut self,
        mol: MolId,
        state: &[(&str, &str)],
        overrides: &[(&str, &str)],
    ) -> Result<(), SimError> {
        let mol_type = self.mol(mol)?;
        let state = match mol_type.param_from_names(state)? {
            MolParam::Mod(state) => state,
            MolParam::Small => {
                return Err(SimError::BadParamVector(format!(
                    "{} has no modification sites",
                    mol_type.name
                )));
            }
        };
        self.mols[mol.0].set_allosteric_shapes(state, overrides)
    }

    pub fn mol(&self, id: MolId) -> Result<&MolType, SimError> {
        self.mols
            .get(id.0)
            .ok_or_else(|| SimError::UnknownMolecule(format!("#{}", id.0)))
    }

    pub fn mol_id(&self, name: &str) -> Result<MolId, SimError> {
        self.mol_index
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownMolecule(name.to_string()))
    }

    pub fn mols(&self) -> &[MolType] {
        &self.mols
    }

    pub fn free_site_feature(&mut self, mol: MolId, site: &str) -> Result<FeatureId, SimError> {
        let site = self.mol(mol)?.site_index(site)?;
        Ok(self.features.get_or_create(FeatureKey::FreeSite { mol, site }))
    }

    pub fn mol_feature(&mut self, mol: MolId) -> Result<FeatureId, SimError> {
        self.mol(mol)?;
        Ok(self.features.get_or_create(FeatureKey::Mol(mol)))
    }

    /// Declares that `mol_a.site_a` may bind `mol_b.site_b`, creating the
    /// binding feature that every family containing such a bond is connected to.
    pub fn declare_binding(
        &mut self,
        mol_a: MolId,
        site_a: &str,
        mol_b: MolId,
        site_b: &str,
    ) -> Result<FeatureId, SimError> {
        let sa = self.mol(mol_a)?.site_index(site_a)?;
        let sb = self.mol(mol_b)?.site_index(site_b)?;
        Ok(self
            .features
            .get_or_create(FeatureKey::binding((mol_a, sa), (mol_b, sb))))
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn add_unary_generator(
        &mut self,
        feature: FeatureId,
        generator: Rc<dyn UnaryGen>,
    ) -> Result<(), SimError> {
        debug!("generator {} listens to feature {}", generator.name(), feature.0);
        self.features
            .get_mut(feature)?
            .slots
            .push(GenSlot::Unary(generator));
        Ok(())
    }

    /// Registers the two halves of a binary generator. When both halves sit on
    /// the same feature only one slot is added and pairs are taken unordered.
    pub fn add_binary_generator(
        &mut self,
        left: FeatureId,
        right: FeatureId,
        generator: Rc<dyn BinaryGen>,
    ) -> Result<PairId, SimError> {
        self.features.get(left)?;
        self.features.get(right)?;
        let id = PairId(self.pairs.len());
        debug!(
            "generator {} pairs features {} and {}",
            generator.name(),
            left.0,
            right.0
        );
        self.pairs.push(BinaryPair {
            generator,
            left,
            right,
        });
        self.features.get_mut(left)?.slots.push(GenSlot::Left(id));
        if left != right {
            self.features.get_mut(right)?.slots.push(GenSlot::Right(id));
        }
        Ok(id)
    }

    /// binding of `mol_a.site_a` to `mol_b.site_b` between free sites
    pub fn add_dimerization(
        &mut self,
        mol_a: MolId,
        site_a: &str,
        mol_b: MolId,
        site_b: &str,
        extrapolation: Extrapolation,
    ) -> Result<PairId, SimError> {
        self.declare_binding(mol_a, site_a, mol_b, site_b)?;
        let left = self.free_site_feature(mol_a, site_a)?;
        let right = self.free_site_feature(mol_b, site_b)?;
        self.add_binary_generator(left, right, Rc::new(DimerizeGen::new(extrapolation)))
    }

    /// breaking of the `mol_a.site_a` / `mol_b.site_b` binding
    pub fn add_decomposition(
        &mut self,
        mol_a: MolId,
        site_a: &str,
        mol_b: MolId,
        site_b: &str,
        extrapolation: Extrapolation,
    ) -> Result<FeatureId, SimError> {
        let feature = self.declare_binding(mol_a, site_a, mol_b, site_b)?;
        let sa = self.mol(mol_a)?.site_index(site_a)?;
        let sb = self.mol(mol_b)?.site_index(site_b)?;
        // rates are given for (a, b); the feature orders its ends by (mol, site)
        let flipped = (mol_b, sb) < (mol_a, sa);
        self.add_unary_generator(feature, Rc::new(DecomposeGen::new(extrapolation, flipped)))?;
        Ok(feature)
    }

    pub fn add_modification(&mut self, generator: ModifyGen) -> Result<FeatureId, SimError> {
        let feature = self.mol_feature(generator.mol)?;
        self.add_unary_generator(feature, Rc::new(generator))?;
        Ok(feature)
    }

    /// modification of a mol of an omniplex, e.g. a substrate docked next to its kinase
    pub fn add_omni_modification(
        &mut self,
        omni: OmniId,
        generator: ModifyGen,
    ) -> Result<FeatureId, SimError> {
        let feature = self
            .omniplex_feature(omni)
            .ok_or_else(|| SimError::BadPlex(format!("unknown omniplex {}", omni.0)))?;
        self.add_unary_generator(feature, Rc::new(generator))?;
        Ok(feature)
    }

    /// Declares an embedded sub-complex. Families recognized earlier are
    /// connected to it as well; species already notified are not notified again.
    pub fn add_omniplex(&mut self, spec: OmniSpec) -> Result<OmniId, SimError> {
        spec.pattern.validate(&self.mols)?;
        let pattern_sites = spec.pattern.site_to_binding();
        for site in spec.free_sites.iter().chain(spec.overlay.iter().map(|(s, _)| s)) {
            let mol = spec.pattern.mols.get(site.mol).ok_or_else(|| {
                SimError::BadPlex(format!("omniplex site refers to mol {}", site.mol))
            })?;
            if site.site >= self.mols[mol.0].site_count() {
                return Err(SimError::UnknownSite {
                    mol: self.mols[mol.0].name.clone(),
                    site: format!("#{}", site.site),
                });
            }
        }
        if let Some(bound) = spec.free_sites.iter().find(|s| pattern_sites.contains_key(*s)) {
            return Err(SimError::SiteAlreadyBound {
                mol: bound.mol,
                site: bound.site,
            });
        }
        let id = OmniId(self.omnis.len());
        let feature = self.features.get_or_create(FeatureKey::Omni(id));
        let omni = Omniplex {
            id,
            pattern: spec.pattern,
            free_sites: spec.free_sites,
            query: spec.query,
            overlay: spec.overlay,
            feature,
        };
        for family in self.families.iter_mut() {
            if let Some(edge) = omni_edge(&omni, &family.paradigm) {
                family.edges.push(edge);
            }
        }
        self.omnis.push(omni);
        Ok(id)
    }

    pub fn omniplex_feature(&self, omni: OmniId) -> Option<FeatureId> {
        self.omnis.get(omni.0).map(|o| o.feature)
    }

    pub fn set_dump_sink(&mut self, sink: DumpSink) {
        self.dump_sink = Some(sink);
    }

    ////////////////////////////////////////////////////////////////////////////
    // RECOGNITION AND SPECIES
    ////////////////////////////////////////////////////////////////////////////

    /// Family of `plex` and the map from its indices to the family paradigm.
    /// Unknown plexes become the paradigm of a new, behaviorized family.
    pub fn recognize(&mut self, plex: &Plex) -> Result<(FamilyId, PlexIso), SimError> {
        if let Err(e) = plex.validate(&self.mols) {
            error!("cannot recognize complex: {}", e);
            return Err(e);
        }
        if let Some(hit) = self.recognizer.lookup(plex, &self.families) {
            return Ok(hit);
        }
        let edges = self.features.behaviorize(plex, &self.mols, &self.omnis)?;
        let id = FamilyId(self.families.len());
        self.families
            .push(PlexFamily::new(id, plex.clone(), &self.mols, edges));
        self.recognizer.register(id, plex);
        self.counters.families += 1;
        debug!(
            "new family {} with {} mols and {} bindings",
            id.0,
            plex.mols.len(),
            plex.bindings.len()
        );
        Ok((id, PlexIso::identity(plex)))
    }

    pub fn family(&self, id: FamilyId) -> Result<&PlexFamily, SimError> {
        self.families
            .get(id.0)
            .ok_or_else(|| SimError::BadPlex(format!("unknown family {}", id.0)))
    }

    pub fn families(&self) -> &[PlexFamily] {
        &self.families
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    /// Get-or-create of the species with parameters `params` (indexed by paradigm mol).
    /// Parameter vectors related by a symmetry of the paradigm give the same
    /// species, whose `params` hold the canonical vector.
    ///
    /// A new species is inserted in its family's cache before anything else
    /// happens to it; it is not notified here, so lookups of the same key made
    /// while a cascade is running always see this one object.
    pub fn get_member(
        &mut self,
        family: FamilyId,
        params: Vec<MolParam>,
    ) -> Result<SpeciesId, SimError> {
        let fam = self.family(family)?;
        fam.check_params(&params, &self.mols)?;
        let params = fam.canonical_params(&params);
        if let Some(existing) = fam.member(&params) {
            return Ok(existing);
        }
        let id = SpeciesId(self.species.len());
        let species = fam.make_member(id, params.clone(), &self.mols, &self.omnis)?;
        self.families[family.0].insert_member(params, id)?;
        debug!("new species {} {}", species.tag, species.name);
        self.species.push(species);
        self.counters.species += 1;
        Ok(id)
    }

    pub fn get_default_member(&mut self, family: FamilyId) -> Result<SpeciesId, SimError> {
        let params = self.family(family)?.default_params.clone();
        self.get_member(family, params)
    }

    /// Recognizes `plex` and returns the member whose parameters are
    /// `params`, given in the indexing of `plex` itself.
    pub fn species_from_plex(
        &mut self,
        plex: &Plex,
        params: Vec<MolParam>,
    ) -> Result<SpeciesId, SimError> {
        if params.len() != plex.mols.len() {
            return Err(SimError::BadParamVector(format!(
                "{} parameters for {} mols",
                params.len(),
                plex.mols.len()
            )));
        }
        let (family, iso) = self.recognize(plex)?;
        let mut paradigm_params = Vec::with_capacity(params.len());
        for ndx in 0..params.len() {
            let src = iso.backward.mol(ndx).ok_or_else(|| {
                SimError::BadPlex(format!("paradigm mol {} has no preimage", ndx))
            })?;
            paradigm_params.push(params[src].clone());
        }
        self.get_member(family, paradigm_params)
    }

    pub fn species(&self, id: SpeciesId) -> Result<&Species, SimError> {
        self.species.get(id.0).ok_or(SimError::UnknownSpecies(id.0))
    }

    pub fn species_iter(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    pub fn reaction(&self, id: ReactionId) -> Option<&Reaction> {
        self.reactions.get(id.0)
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn counters(&self) -> SimCounters {
        self.counters
    }

    pub fn now(&self) -> f64 {
        self.queue.now()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn molar_factor(&self) -> f64 {
        self.config.avogadro_scale * self.volume
    }

    pub fn generation_enabled(&self) -> bool {
        self.generation_enabled
    }

    pub fn propensity(&self, reaction: ReactionId) -> Option<f64> {
        self.reactions
            .get(reaction.0)
            .map(|r| r.propensity(&self.species, self.molar_factor()))
    }

    pub fn is_scheduled(&self, reaction: ReactionId) -> bool {
        self.reactions
            .get(reaction.0)
            .map(|r| self.queue.is_scheduled(r.event))
            .unwrap_or(false)
    }

    pub fn species_table(&self) -> Table {
        species_table(self.species.iter())
    }

    ////////////////////////////////////////////////////////////////////////////
    // NOTIFICATION AND REACTION GENERATION
    ////////////////////////////////////////////////////////////////////////////

    /// Notifies every feature the species expresses, once per species.
    ///
    /// Omniplex contexts are only forwarded when the omniplex query holds for
    /// the species. New reactions are registered with `depth`; their products
    /// are notified in turn with `depth - 1` while that stays non-negative.
    pub fn ensure_notified(&mut self, species: SpeciesId, depth: i32) -> Result<(), SimError> {
        if !self.generation_enabled {
            return Ok(());
        }
        let sp = self
            .species
            .get_mut(species.0)
            .ok_or(SimError::UnknownSpecies(species.0))?;
        if !sp.mark_notified() {
            return Ok(());
        }
        let family = sp.family;
        let edges = self.families[family.0].edges.clone();
        for edge in edges {
            if let ContextSpec::Omni { omni, mol_map, .. } = &edge.spec {
                let params = &self.species[species.0].params;
                if !self.omnis[omni.0].query.holds(params, mol_map) {
                    continue;
                }
            }
            let context = Context {
                species,
                spec: edge.spec,
            };
            self.notify_new(edge.feature, context, depth)?;
        }
        Ok(())
    }

    /// Appends the context to the feature and runs its generators in registration order.
    fn notify_new(
        &mut self,
        feature: FeatureId,
        context: Context,
        depth: i32,
    ) -> Result<(), SimError> {
        let cid = self.features.push_context(feature, context.clone())?;
        let slots = self.features.get(feature)?.slots.clone();
        for slot in slots {
            match slot {
                GenSlot::Unary(generator) => {
                    let drafts = generator.on_new_context(&context, self)?;
                    self.register_drafts(drafts, depth)?;
                }
                GenSlot::Left(pair) => {
                    let (generator, partner_feature, symmetric) = {
                        let p = &self.pairs[pair.0];
                        (p.generator.clone(), p.right, p.is_symmetric())
                    };
                    let partners = self.features.get(partner_feature)?.contexts.clone();
                    for (ndx, partner) in partners.iter().enumerate() {
                        let other = ContextId {
                            feature: partner_feature,
                            index: ndx,
                        };
                        let key = if symmetric && other < cid {
                            (pair, other, cid)
                        } else {
                            (pair, cid, other)
                        };
                        if !self.seen_pairs.insert(key) {
                            continue;
                        }
                        let drafts = generator.on_pair(&context, partner, self)?;
                        self.register_drafts(drafts, depth)?;
                    }
                }
                GenSlot::Right(pair) => {
                    let (generator, partner_feature) = {
                        let p = &self.pairs[pair.0];
                        (p.generator.clone(), p.left)
                    };
                    let partners = self.features.get(partner_feature)?.contexts.clone();
                    for (ndx, partner) in partners.iter().enumerate() {
                        let other = ContextId {
                            feature: partner_feature,
                            index: ndx,
                        };
                        if !self.seen_pairs.insert((pair, other, cid)) {
                            continue;
                        }
                        let drafts = generator.on_pair(partner, &context, self)?;
                        self.register_drafts(drafts, depth)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn register_drafts(&mut self, drafts: Vec<ReactionDraft>, depth: i32) -> Result<(), SimError> {
        for draft in drafts {
            let products: Vec<SpeciesId> = draft.products.iter().map(|(s, _)| *s).collect();
            self.register_reaction(draft)?;
            if depth > 0 {
                for product in products {
                    self.ensure_notified(product, depth - 1)?;
                }
            }
        }
        Ok(())
    }

    /// Adds a reaction to the store, sensitizes it to its substrates and schedules it.
    pub fn register_reaction(&mut self, draft: ReactionDraft) -> Result<ReactionId, SimError> {
        if !draft.rate.is_finite() || draft.rate < 0.0 {
            return Err(SimError::InvalidRate(draft.rate));
        }
        for (s, _) in draft.substrates.iter().chain(draft.products.iter()) {
            self.species(*s)?;
        }
        let id = ReactionId(self.reactions.len());
        let event = self.queue.add_event(EventKind::Reaction(id));
        let reaction = Reaction::new(id, event, draft.substrates, draft.products, draft.rate);
        for (s, _) in reaction.substrates.iter() {
            self.species[s.0].add_sensitive(id);
        }
        if reaction.arity != 1 {
            self.volume_sensitive.push(id);
        }
        debug!("{}", self.describe_reaction(&reaction));
        self.reactions.push(reaction);
        self.counters.reactions += 1;
        self.schedule_reaction(id)?;
        Ok(id)
    }

    fn describe_reaction(&self, reaction: &Reaction) -> String {
        let side = |list: &[(SpeciesId, u32)]| {
            list.iter()
                .map(|(s, m)| format!("{} {}", m, self.species[s.0].tag))
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!(
            "reaction {}: {} -> {} (rate {:e})",
            reaction.id.0,
            side(&reaction.substrates),
            side(&reaction.products),
            reaction.rate
        )
    }

    ////////////////////////////////////////////////////////////////////////////
    // SCHEDULING
    ////////////////////////////////////////////////////////////////////////////

    /// Recomputes the propensity and reschedules when it left the tolerance band.
    fn schedule_reaction(&mut self, id: ReactionId) -> Result<(), SimError> {
        let molar_factor = self.molar_factor();
        let reaction = &self.reactions[id.0];
        let propensity = reaction.propensity(&self.species, molar_factor);
        let event = reaction.event;
        if propensity > 0.0 {
            if reaction.needs_reschedule(propensity, &self.config.tolerance) {
                self.reactions[id.0].last_propensity = propensity;
                self.counters.activations += 1;
                let u: f64 = self.rng.r#gen();
                let wait = -(1.0 - u).ln() / propensity;
                let time = self.queue.now() + wait;
                self.queue.schedule(event, time)?;
            }
        } else {
            self.reactions[id.0].last_propensity = -1.0;
            self.queue.deschedule(event);
        }
        Ok(())
    }

    fn reschedule_all(&mut self, affected: BTreeSet<ReactionId>) -> Result<(), SimError> {
        for id in affected {
            self.schedule_reaction(id)?;
        }
        Ok(())
    }

    /// Applies population deltas all-or-nothing and returns the reactions whose
    /// substrate populations changed. Species leaving zero for the first time
    /// are notified with the configured generation depth. If that cascade
    /// fails, the previous populations are restored before the error returns.
    fn apply_deltas(
        &mut self,
        deltas: &[(SpeciesId, i64)],
    ) -> Result<BTreeSet<ReactionId>, SimError> {
        let mut previous = Vec::with_capacity(deltas.len());
        let mut next = Vec::with_capacity(deltas.len());
        for (s, d) in deltas {
            let sp = self.species(*s)?;
            match sp.checked_population(*d) {
                Ok(pop) => {
                    previous.push(sp.population());
                    next.push(pop);
                }
                Err(e) => {
                    error!("{}", e);
                    return Err(e);
                }
            }
        }
        for ((s, _), pop) in deltas.iter().zip(next.iter()) {
            self.species[s.0].set_population(*pop);
        }
        let depth = self.config.generate_depth;
        for (s, d) in deltas {
            if *d != 0 && self.species[s.0].population() > 0 {
                if let Err(e) = self.ensure_notified(*s, depth) {
                    self.restore_populations(deltas, &previous);
                    error!("population change rolled back: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(self.sensitive_to(deltas))
    }

    fn sensitive_to(&self, deltas: &[(SpeciesId, i64)]) -> BTreeSet<ReactionId> {
        let mut affected = BTreeSet::new();
        for (s, d) in deltas {
            if *d != 0 {
                affected.extend(self.species[s.0].sensitive.iter().copied());
            }
        }
        affected
    }

    /// Puts back the populations seen before `deltas` were applied and
    /// reschedules the reactions the cascade scheduled against the new ones.
    fn restore_populations(&mut self, deltas: &[(SpeciesId, i64)], previous: &[u64]) {
        for ((s, _), pop) in deltas.iter().zip(previous.iter()).rev() {
            self.species[s.0].set_population(*pop);
        }
        let affected = self.sensitive_to(deltas);
        if let Err(e) = self.reschedule_all(affected) {
            error!("rescheduling after rollback failed: {}", e);
        }
    }

    /// Changes a population outside of any event and reschedules what depends on it.
    pub fn update_population(&mut self, species: SpeciesId, delta: i64) -> Result<(), SimError> {
        let affected = self.apply_deltas(&[(species, delta)])?;
        self.reschedule_all(affected)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), SimError> {
        self.volume = volume;
        let affected: BTreeSet<ReactionId> = self.volume_sensitive.iter().copied().collect();
        self.reschedule_all(affected)
    }

    ////////////////////////////////////////////////////////////////////////////
    // EVENTS AND DRIVER
    ////////////////////////////////////////////////////////////////////////////

    pub fn schedule_fixed_event(
        &mut self,
        event: FixedEvent,
        time: f64,
    ) -> Result<EventId, SimError> {
        if let FixedEvent::Create { species, .. } = &event {
            self.species(*species)?;
        }
        let id = self.queue.add_event(EventKind::Fixed(event));
        self.queue.schedule(id, time)?;
        Ok(id)
    }

    /// schedules the creation of `count` copies of a species at the current time
    pub fn create_event(&mut self, species: SpeciesId, count: u64) -> Result<EventId, SimError> {
        let now = self.queue.now();
        self.schedule_fixed_event(FixedEvent::Create { species, count }, now)
    }

    fn fire_reaction(&mut self, id: ReactionId) -> Result<(), SimError> {
        let deltas = self.reactions[id.0].deltas.clone();
        let mut affected = self.apply_deltas(&deltas)?;
        let reaction = &mut self.reactions[id.0];
        reaction.last_propensity = -1.0;
        reaction.fire_count += 1;
        self.counters.firings += 1;
        // the popped event is gone; source reactions are sensitive to nothing
        // and only get rescheduled here
        affected.insert(id);
        self.reschedule_all(affected)
    }

    fn fire_fixed(&mut self, event: EventId, fixed: FixedEvent) -> Result<StepOutcome, SimError> {
        match fixed {
            FixedEvent::Create { species, count } => {
                let delta = i64::try_from(count).map_err(|_| SimError::PopulationOverflow {
                    species: format!("sp{}", species.0),
                    population: self
                        .species
                        .get(species.0)
                        .map(|s| s.population())
                        .unwrap_or(0),
                    delta: count.to_string(),
                })?;
                let affected = self.apply_deltas(&[(species, delta)])?;
                self.reschedule_all(affected)?;
            }
            FixedEvent::Volume { volume } => self.set_volume(volume)?,
            FixedEvent::Grow { factor, period } => {
                self.set_volume(self.volume * factor)?;
                let next = self.queue.now() + period;
                self.queue.schedule(event, next)?;
            }
            FixedEvent::Dump { period } => {
                if let Some(mut sink) = self.dump_sink.take() {
                    let result = sink(&*self);
                    self.dump_sink = Some(sink);
                    result?;
                } else {
                    warn!("dump event at t = {} without a dump sink", self.queue.now());
                }
                if let Some(period) = period {
                    let next = self.queue.now() + period;
                    self.queue.schedule(event, next)?;
                }
            }
            FixedEvent::NoReact => {
                info!("reaction generation switched off at t = {}", self.queue.now());
                self.generation_enabled = false;
            }
            FixedEvent::Stop => return Ok(StepOutcome::Stop),
        }
        Ok(StepOutcome::Continue)
    }

    /// Executes the earliest event. `None` when nothing is scheduled.
    pub fn step(&mut self) -> Result<Option<StepOutcome>, SimError> {
        let Some(event) = self.queue.pop_next()? else {
            return Ok(None);
        };
        self.counters.events += 1;
        let kind = self
            .queue
            .kind(event)
            .cloned()
            .ok_or(SimError::UnknownEvent(event.0))?;
        let outcome = match kind {
            EventKind::Reaction(id) => {
                self.fire_reaction(id)?;
                StepOutcome::Continue
            }
            EventKind::Fixed(fixed) => self.fire_fixed(event, fixed)?,
        };
        Ok(Some(outcome))
    }

    /// Runs events until a stop event, an empty queue, a configured limit, or
    /// until `stop` returns true after an event.
    pub fn run<F>(&mut self, mut stop: F) -> Result<RunOutcome, SimError>
    where
        F: FnMut(&Simulation) -> bool,
    {
        let start = Instant::now();
        let mut executed: u64 = 0;
        info!(
            "run started at t = {} with {} species and {} reactions",
            self.queue.now(),
            self.species.len(),
            self.reactions.len()
        );
        let outcome = loop {
            if let Some(limit) = self.config.wall_clock_limit_secs {
                if start.elapsed().as_secs_f64() > limit {
                    warn!(
                        "wall-clock limit of {} s reached at t = {}",
                        limit,
                        self.queue.now()
                    );
                    break RunOutcome::TimedOut;
                }
            }
            if let Some(max) = self.config.max_events {
                if executed >= max {
                    break RunOutcome::EventLimit;
                }
            }
            match self.step()? {
                None => break RunOutcome::QueueEmpty,
                Some(StepOutcome::Stop) => break RunOutcome::Stopped,
                Some(StepOutcome::Continue) => {
                    executed += 1;
                    if stop(self) {
                        break RunOutcome::Predicate;
                    }
                }
            }
        };
        let c = self.counters;
        info!(
            "run ended ({:?}) at t = {}: {} families, {} species, {} reactions, {} firings, {} activations",
            outcome,
            self.queue.now(),
            c.families,
            c.species,
            c.reactions,
            c.firings,
            c.activations
        );
        Ok(outcome)
    }

    ////////////////////////////////////////////////////////////////////////////
    // SNAPSHOT AND REPLAY
    ////////////////////////////////////////////////////////////////////////////

    pub fn species_record(&self, id: SpeciesId) -> Result<SpeciesRecord, SimError> {
        let sp = self.species(id)?;
        let paradigm = &self.families[sp.family.0].paradigm;
        let mol = |ndx: usize| &self.mols[paradigm.mols[ndx].0];
        let bindings = paradigm
            .bindings
            .iter()
            .map(|b| BindingRecord {
                left_mol: b.0.mol,
                left_site: mol(b.0.mol).sites[b.0.site].name.clone(),
                right_mol: b.1.mol,
                right_site: mol(b.1.mol).sites[b.1.site].name.clone(),
            })
            .collect();
        let modifications = sp
            .params
            .iter()
            .enumerate()
            .map(|(ndx, p)| {
                let m = mol(ndx);
                m.mod_sites
                    .iter()
                    .map(|ms| ms.name.clone())
                    .zip(m.param_value_names(p))
                    .collect()
            })
            .collect();
        Ok(SpeciesRecord {
            tag: sp.tag.clone(),
            name: sp.name.clone(),
            population: sp.population(),
            mols: (0..paradigm.mols.len()).map(|n| mol(n).name.clone()).collect(),
            bindings,
            modifications,
        })
    }

    pub fn snapshot(&self) -> Result<Vec<SpeciesRecord>, SimError> {
        (0..self.species.len())
            .map(|n| self.species_record(SpeciesId(n)))
            .collect()
    }

    fn species_from_record(&mut self, record: &SpeciesRecord) -> Result<SpeciesId, SimError> {
        let mut plex = Plex::new();
        for name in record.mols.iter() {
            let id = self.mol_id(name)?;
            plex.add_mol(id);
        }
        for b in record.bindings.iter() {
            let site = |mol_ndx: usize, site: &str| -> Result<SiteSpec, SimError> {
                let mol_id = plex.mols.get(mol_ndx).ok_or_else(|| {
                    SimError::BadPlex(format!("{} binds missing mol {}", record.tag, mol_ndx))
                })?;
                Ok(SiteSpec::new(mol_ndx, self.mols[mol_id.0].site_index(site)?))
            };
            let left = site(b.left_mol, &b.left_site)?;
            let right = site(b.right_mol, &b.right_site)?;
            plex.add_binding(left, right)?;
        }
        let mut params = Vec::with_capacity(plex.mols.len());
        for (ndx, mol_id) in plex.mols.iter().enumerate() {
            let values: Vec<(&str, &str)> = record
                .modifications
                .get(ndx)
                .map(|v| v.iter().map(|(s, val)| (s.as_str(), val.as_str())).collect())
                .unwrap_or_default();
            params.push(self.mols[mol_id.0].param_from_names(&values)?);
        }
        self.species_from_plex(&plex, params)
    }

    /// Rebuilds a network from dumped species without re-running creation events.
    ///
    /// Every record is recognized and its population restored directly; then
    /// each replayed species is notified with the configured depth, whatever
    /// its population, and finally every reaction is rescheduled. Species
    /// created during the pass are only notified if the depth rule reaches them.
    pub fn replay(&mut self, records: &[SpeciesRecord]) -> Result<Vec<SpeciesId>, SimError> {
        let mut replayed = Vec::with_capacity(records.len());
        for record in records {
            let id = self.species_from_record(record)?;
            self.species[id.0].set_population(record.population);
            replayed.push(id);
        }
        let depth = self.config.generate_depth;
        for id in replayed.iter() {
            self.ensure_notified(*id, depth)?;
        }
        let all: BTreeSet<ReactionId> = (0..self.reactions.len()).map(ReactionId).collect();
        self.reschedule_all(all)?;
        info!(
            "replayed {} species into {} reactions",
            replayed.len(),
            self.reactions.len()
        );
        Ok(replayed)
    }
}
