/// Signature buckets plus isomorphism search, with a cache keyed by the literal plex.
pub mod recognizer;
/// Families (isomorphism classes) of plexes: paradigm, feature edges and the
/// get-or-create member cache from parameter vectors to species.
pub mod plex_family;
/// Embedded sub-complexes recognized inside families, with modification-state queries
/// and allosteric site-shape overlays.
pub mod omniplex;
mod recognition_tests;
