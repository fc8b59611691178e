/// eng
/// Small models run from `main`:
/// 0) reversible binding A + B <-> AB
/// 1) kinase phosphorylating a substrate on a scaffold, with ATP -> ADP and allostery
/// 2) checkpoint and replay of a binding network
/// 3) growing volume with periodic species dumps
pub mod plex_examples;
