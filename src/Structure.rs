/// Molecule types: binding sites with shapes, modification sites with enumerated values,
/// molecular weight and the allosteric map from modification state to site shapes.
/// The per-occurrence parameter of a mol is a tagged union (`MolParam`): small mols carry
/// nothing, modifiable mols carry their full modification state.
pub mod molecule;
/// Complex structure instances ("plexes"): mol occurrences plus bindings between sites.
/// Validation, free sites, connected components and joining of two plexes.
pub mod plex;
/// Forward/backward index maps between plexes and the binding-extension search
/// for isomorphisms and injections (embedded sub-complexes).
pub mod plex_iso;
