//! Slot and band assignment arbitration (TDMA/FDMA scheduled access).
//!
//! Operates independently of the contention coordinator: each slot is owned
//! by exactly one transmission, so no collision model exists here. Even
//! slots are reported as TDMA, odd slots as FDMA; the classification only
//! changes which band label accompanies the slot, path resolution is
//! identical in both branches.

use rand::rngs::StdRng;
use rand::seq::index;

use super::types::{Event, SimTime, SlotAccess};
use crate::topology::{NodeId, TopologyProvider};

/// Assigns each slot boundary a fresh random transmission pair.
#[derive(Debug)]
pub struct ScheduleArbitrator {
    slot_duration: f64,
    frequency_bands: Vec<String>,
    current_slot: u64,
    /// Time the current slot opened; `None` before the first boundary.
    last_boundary: Option<SimTime>,
    /// Path assigned in the current slot, for render snapshots.
    last_path: Option<Vec<NodeId>>,
}

impl ScheduleArbitrator {
    pub fn new(slot_duration: f64, frequency_bands: Vec<String>) -> Self {
        debug_assert!(!frequency_bands.is_empty(), "frequency_bands must be non-empty");
        Self {
            slot_duration,
            frequency_bands,
            current_slot: 0,
            last_boundary: None,
            last_path: None,
        }
    }

    /// Evaluate one tick. The first call opens slot 0; afterwards a new slot
    /// opens whenever `slot_duration` has elapsed since the last boundary.
    /// A failed path resolution logs and skips the slot, but the slot
    /// counter still advances.
    pub fn advance<T: TopologyProvider>(
        &mut self,
        topology: &T,
        rng: &mut StdRng,
        now: SimTime,
    ) -> Vec<Event> {
        match self.last_boundary {
            None => {}
            Some(last) if now - last >= self.slot_duration => {
                self.current_slot += 1;
            }
            Some(_) => return Vec::new(),
        }
        self.last_boundary = Some(now);

        let slot = self.current_slot;
        let access = if slot % 2 == 0 {
            SlotAccess::Tdma
        } else {
            SlotAccess::Fdma
        };
        let band = self.active_band().to_string();

        let ids = topology.node_ids();
        if ids.len() < 2 {
            log::warn!("Fewer than two nodes; slot {} carries no transmission", slot);
            self.last_path = None;
            return Vec::new();
        }
        let picked = index::sample(rng, ids.len(), 2);
        let source = ids[picked.index(0)];
        let target = ids[picked.index(1)];

        let mut events = Vec::new();
        match topology.shortest_path(source, target) {
            Some(path) => {
                let key = super::types::PathKey::new(&path);
                log::info!(
                    "{}: communication between node {} and node {} using path {} (slot {}, band {})",
                    access,
                    source,
                    target,
                    key,
                    slot,
                    band
                );
                self.last_path = Some(path);
                events.push(Event::SlotStarted {
                    slot,
                    access,
                    band,
                    source,
                    target,
                    routed: true,
                });
            }
            None => {
                log::warn!(
                    "No path found from node {} to node {}; skipping slot {}",
                    source,
                    target,
                    slot
                );
                self.last_path = None;
                events.push(Event::SlotStarted {
                    slot,
                    access,
                    band,
                    source,
                    target,
                    routed: false,
                });
                events.push(Event::NoRoute { source, target });
            }
        }
        events
    }

    /// Slot counter, `None` before the first boundary has fired.
    pub fn current_slot(&self) -> Option<u64> {
        self.last_boundary.map(|_| self.current_slot)
    }

    /// Band label for the current slot. The index runs one ahead of the
    /// slot counter: the lookup happens after the boundary advance.
    pub fn active_band(&self) -> &str {
        let index = ((self.current_slot + 1) as usize) % self.frequency_bands.len();
        &self.frequency_bands[index]
    }

    pub fn last_path(&self) -> Option<&Vec<NodeId>> {
        self.last_path.as_ref()
    }

    /// Number of slots opened so far.
    pub fn slots_opened(&self) -> u64 {
        match self.last_boundary {
            Some(_) => self.current_slot + 1,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;
    use rand::SeedableRng;

    fn bands() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    #[test]
    fn slots_alternate_tdma_fdma_with_band_one_ahead() {
        let topology = Topology::fully_connected(4);
        let mut rng = StdRng::seed_from_u64(5);
        let mut arbitrator = ScheduleArbitrator::new(50.0, bands());

        let expected = [
            (0u64, SlotAccess::Tdma, "B"),
            (1, SlotAccess::Fdma, "A"),
            (2, SlotAccess::Tdma, "B"),
            (3, SlotAccess::Fdma, "A"),
        ];
        for (tick, (slot, access, band)) in [0.0, 50.0, 100.0, 150.0].iter().zip(expected) {
            let events = arbitrator.advance(&topology, &mut rng, *tick);
            match &events[0] {
                Event::SlotStarted {
                    slot: s,
                    access: a,
                    band: b,
                    routed,
                    ..
                } => {
                    assert_eq!(*s, slot);
                    assert_eq!(*a, access);
                    assert_eq!(b, band);
                    assert!(routed);
                }
                other => panic!("expected SlotStarted, got {:?}", other),
            }
            assert_eq!(arbitrator.current_slot(), Some(slot));
        }
    }

    #[test]
    fn sub_boundary_ticks_are_inert() {
        let topology = Topology::fully_connected(3);
        let mut rng = StdRng::seed_from_u64(1);
        let mut arbitrator = ScheduleArbitrator::new(50.0, bands());

        assert!(!arbitrator.advance(&topology, &mut rng, 0.0).is_empty());
        assert!(arbitrator.advance(&topology, &mut rng, 10.0).is_empty());
        assert!(arbitrator.advance(&topology, &mut rng, 49.9).is_empty());
        assert_eq!(arbitrator.current_slot(), Some(0));
        assert!(!arbitrator.advance(&topology, &mut rng, 50.0).is_empty());
        assert_eq!(arbitrator.current_slot(), Some(1));
    }

    #[test]
    fn unrouted_pair_skips_slot_but_counter_advances() {
        struct NoLinks;
        impl TopologyProvider for NoLinks {
            fn node_ids(&self) -> Vec<NodeId> {
                vec![0, 1]
            }
            fn neighbors(&self, _node: NodeId) -> Vec<NodeId> {
                Vec::new()
            }
            fn shortest_path(&self, _s: NodeId, _t: NodeId) -> Option<Vec<NodeId>> {
                None
            }
        }

        let mut rng = StdRng::seed_from_u64(0);
        let mut arbitrator = ScheduleArbitrator::new(50.0, bands());

        let events = arbitrator.advance(&NoLinks, &mut rng, 0.0);
        assert!(matches!(
            events[0],
            Event::SlotStarted { slot: 0, routed: false, .. }
        ));
        assert!(matches!(events[1], Event::NoRoute { .. }));
        assert_eq!(arbitrator.last_path(), None);

        let events = arbitrator.advance(&NoLinks, &mut rng, 50.0);
        assert!(matches!(
            events[0],
            Event::SlotStarted { slot: 1, .. }
        ));
    }

    #[test]
    fn band_cycles_through_longer_lists() {
        let topology = Topology::fully_connected(3);
        let mut rng = StdRng::seed_from_u64(9);
        let bands = vec!["X".to_string(), "Y".to_string(), "Z".to_string()];
        let mut arbitrator = ScheduleArbitrator::new(10.0, bands);

        let mut seen = Vec::new();
        for tick in [0.0, 10.0, 20.0, 30.0, 40.0, 50.0] {
            for event in arbitrator.advance(&topology, &mut rng, tick) {
                if let Event::SlotStarted { band, .. } = event {
                    seen.push(band);
                }
            }
        }
        assert_eq!(seen, vec!["Y", "Z", "X", "Y", "Z", "X"]);
    }
}
