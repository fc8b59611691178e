/// Feature registry: free-site, binding, mol and omniplex features with their contexts,
/// and behaviorization of new families.
pub mod feature;
/// Unary and binary reaction generator traits, generator slots and reaction drafts.
pub mod rxn_gen;
/// Rate extrapolation policies (literal rate or mass-action scaling) dispatched through an enum.
pub mod extrapolation;
/// Generic reaction archetypes: dimerization, decomposition and modification.
pub mod archetypes;
