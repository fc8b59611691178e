/// eng
/// Structure model of molecular complexes:
/// 1) molecule types with binding sites (and their shapes), modification sites and weights
/// 2) complex instances ("plexes") as mol occurrences plus site-to-site bindings
/// 3) isomorphism and injection search between plexes
#[allow(non_snake_case)]
pub mod Structure;
/// Recognition engine: every plex is assigned to its structural family (isomorphism class)
/// through signature buckets, isomorphism search and a cache of literal plexes.
/// Families own the get-or-create cache of their species.
#[allow(non_snake_case)]
pub mod Recognition;
/// Feature registry and reaction generators: new species announce the features they express,
/// generators listening to the features synthesize the reactions the new species make possible.
#[allow(non_snake_case)]
pub mod Features;
/// Exact stochastic machinery: species populations, reactions with propensities,
/// the time-ordered event queue and output helpers.
#[allow(non_snake_case)]
pub mod Stochastic;
/// Ready-made models showing how to set up and run a simulation
#[allow(non_snake_case)]
pub mod Examples;
pub mod settings;
pub mod simulation;
