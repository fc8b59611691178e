/// Species: family member with concrete parameters, derived site states and a population.
pub mod species;
/// Reactions with falling-factorial propensities and the tolerance test used when rescheduling.
pub mod reaction;
/// Min-priority event queue (reaction firings and fixed-time events) with lazy invalidation.
pub mod event_queue;
/// `Dumpable` capability, counters, prettytable species tables and JSON species snapshots.
pub mod dumpable;
