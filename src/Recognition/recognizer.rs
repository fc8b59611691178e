//! Bucketed family lookup.
//!
//! Plexes are first bucketed by their permutation-invariant signature; inside a
//! bucket each family's paradigm is tried with the isomorphism search. A second
//! map caches results by the literal plex so that a plex seen before never
//! reaches the search again and always gets back the mapping found the first time.
use crate::Recognition::plex_family::{FamilyId, PlexFamily};
use crate::Structure::plex::{Plex, PlexSignature};
use crate::Structure::plex_iso::{PlexIso, find_iso};
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Recognizer {
    buckets: HashMap<PlexSignature, Vec<FamilyId>>,
    cache: HashMap<Plex, (FamilyId, PlexIso)>,
    searches: u64,
}

impl Recognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Family of `plex` among the known ones, with the map plex -> paradigm.
    /// `None` means the plex starts a new isomorphism class.
    pub fn lookup(&mut self, plex: &Plex, families: &[PlexFamily]) -> Option<(FamilyId, PlexIso)> {
        if let Some(hit) = self.cache.get(plex) {
            return Some(hit.clone());
        }
        let candidates = self.buckets.get(&plex.signature())?;
        for family_id in candidates.iter() {
            self.searches += 1;
            let paradigm = &families[family_id.0].paradigm;
            if let Some(iso) = find_iso(plex, paradigm) {
                debug!(
                    "plex with {} mols matched family {}",
                    plex.mols.len(),
                    family_id.0
                );
                self.cache.insert(plex.clone(), (*family_id, iso.clone()));
                return Some((*family_id, iso));
            }
        }
        None
    }

    /// Registers a new family whose paradigm is `paradigm` itself.
    pub fn register(&mut self, family: FamilyId, paradigm: &Plex) {
        self.buckets
            .entry(paradigm.signature())
            .or_default()
            .push(family);
        self.cache
            .insert(paradigm.clone(), (family, PlexIso::identity(paradigm)));
    }

    /// number of isomorphism searches run so far
    pub fn search_count(&self) -> u64 {
        self.searches
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
