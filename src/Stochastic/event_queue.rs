//! Time-ordered event queue.
//!
//! Entries live in a `priq` min-heap keyed by (time, insertion sequence), so
//! ties are broken by scheduling order. The heap cannot remove arbitrary
//! entries, so every event carries a stamp: rescheduling or descheduling bumps
//! it and heap entries with an old stamp are dropped when they surface.
use crate::Stochastic::reaction::ReactionId;
use crate::Stochastic::species::SpeciesId;
use crate::simulation::SimError;
use priq::PriorityQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub usize);

/// Actions fired at a fixed simulated time.
#[derive(Debug, Clone, PartialEq)]
pub enum FixedEvent {
    /// adds `count` copies of a species
    Create { species: SpeciesId, count: u64 },
    /// sets the volume, rescaling every propensity through the molar factor
    Volume { volume: f64 },
    /// multiplies the volume by `factor`, then again every `period`
    Grow { factor: f64, period: f64 },
    /// calls the dump sink, then again every `period` if given
    Dump { period: Option<f64> },
    /// stops generation of new reactions
    NoReact,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Reaction(ReactionId),
    Fixed(FixedEvent),
}

#[derive(Debug)]
struct Slot {
    kind: EventKind,
    stamp: u64,
    time: Option<f64>,
}

pub struct EventQueue {
    now: f64,
    slots: Vec<Slot>,
    heap: PriorityQueue<(f64, u64), (EventId, u64)>,
    seq: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            slots: Vec::new(),
            heap: PriorityQueue::new(),
            seq: 0,
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// registers an event without scheduling it
    pub fn add_event(&mut self, kind: EventKind) -> EventId {
        self.slots.push(Slot {
            kind,
            stamp: 0,
            time: None,
        });
        EventId(self.slots.len() - 1)
    }

    pub fn kind(&self, id: EventId) -> Option<&EventKind> {
        self.slots.get(id.0).map(|s| &s.kind)
    }

    pub fn scheduled_time(&self, id: EventId) -> Option<f64> {
        self.slots.get(id.0).and_then(|s| s.time)
    }

    pub fn is_scheduled(&self, id: EventId) -> bool {
        self.scheduled_time(id).is_some()
    }

    /// (re)schedules an event; any earlier schedule of it is dropped
    pub fn schedule(&mut self, id: EventId, time: f64) -> Result<(), SimError> {
        if time < self.now || time.is_nan() {
            return Err(SimError::EventInPast {
                now: self.now,
                time,
            });
        }
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or(SimError::UnknownEvent(id.0))?;
        slot.stamp += 1;
        slot.time = Some(time);
        self.seq += 1;
        self.heap.put((time, self.seq), (id, slot.stamp));
        Ok(())
    }

    pub fn deschedule(&mut self, id: EventId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if slot.time.take().is_some() {
                slot.stamp += 1;
            }
        }
    }

    /// Pops the earliest live event, advancing the clock to its time.
    /// The event is descheduled before it is returned.
    pub fn pop_next(&mut self) -> Result<Option<EventId>, SimError> {
        while let Some(((time, _), (id, stamp))) = self.heap.pop() {
            let slot = &mut self.slots[id.0];
            if slot.stamp != stamp || slot.time.is_none() {
                continue;
            }
            if time < self.now {
                return Err(SimError::EventInPast {
                    now: self.now,
                    time,
                });
            }
            self.now = time;
            slot.time = None;
            slot.stamp += 1;
            return Ok(Some(id));
        }
        Ok(None)
    }

    /// number of events currently scheduled
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|s| s.time.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_time_order_and_skips_stale() {
        let mut q = EventQueue::new();
        let a = q.add_event(EventKind::Fixed(FixedEvent::Stop));
        let b = q.add_event(EventKind::Fixed(FixedEvent::NoReact));
        let c = q.add_event(EventKind::Reaction(ReactionId(0)));
        q.schedule(a, 3.0).unwrap();
        q.schedule(b, 1.0).unwrap();
        q.schedule(c, 2.0).unwrap();
        // move b behind a, and drop c
        q.schedule(b, 4.0).unwrap();
        q.deschedule(c);
        assert_eq!(q.pending(), 2);
        assert_eq!(q.pop_next().unwrap(), Some(a));
        assert_eq!(q.now(), 3.0);
        assert_eq!(q.pop_next().unwrap(), Some(b));
        assert_eq!(q.pop_next().unwrap(), None);
        assert!(!q.is_scheduled(b));
    }

    #[test]
    fn test_ties_follow_schedule_order() {
        let mut q = EventQueue::new();
        let a = q.add_event(EventKind::Fixed(FixedEvent::Stop));
        let b = q.add_event(EventKind::Fixed(FixedEvent::NoReact));
        q.schedule(b, 1.0).unwrap();
        q.schedule(a, 1.0).unwrap();
        assert_eq!(q.pop_next().unwrap(), Some(b));
        assert_eq!(q.pop_next().unwrap(), Some(a));
    }

    #[test]
    fn test_schedule_in_past_rejected() {
        let mut q = EventQueue::new();
        let a = q.add_event(EventKind::Fixed(FixedEvent::Stop));
        q.schedule(a, 2.0).unwrap();
        q.pop_next().unwrap();
        let err = q.schedule(a, 1.0);
        assert!(matches!(err, Err(SimError::EventInPast { .. })));
    }
}
