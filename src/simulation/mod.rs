//! Channel arbitration simulation core.
//!
//! Owns every piece of mutable simulation state in one explicit context
//! object (no process-wide singletons) and advances it cooperatively: an
//! external driver calls [`Simulation::advance`] with an explicit timestamp
//! at a fixed cadence, and the core evaluates at most one stage transition
//! per tick. All waiting is elapsed-time comparison; the core never sleeps,
//! blocks, or reads a clock.
//!
//! ## Module Organization
//!
//! - `types`: shared data structures (stages, sessions, events, snapshot)
//! - `channel`: per-path busy flags and reservation arbitration
//! - `scheduler`: session admission and the waiting queue
//! - `contention`: the transmission state machine (carrier sensing, backoff)
//! - `slotted`: TDMA/FDMA slot and band assignment, collision-free

pub mod channel;
pub mod contention;
pub mod scheduler;
pub mod slotted;
pub mod types;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{ConfigError, Protocol, SimulationConfig, validate_config};
use crate::topology::{NodeId, Topology, TopologyProvider};

pub use channel::ChannelAccessCoordinator;
pub use contention::TransmissionStateMachine;
pub use scheduler::{AdmitOutcome, SessionScheduler};
pub use slotted::ScheduleArbitrator;
pub use types::{Event, PathKey, RenderSnapshot, Session, SimTime, SlotAccess, Stage};

/// Protocol-specific arbitration state.
enum Engine {
    Contention {
        scheduler: SessionScheduler,
        coordinator: ChannelAccessCoordinator,
        machine: TransmissionStateMachine,
        /// At most one active session exists system-wide.
        session: Option<Session>,
    },
    Scheduled {
        arbitrator: ScheduleArbitrator,
    },
}

/// Simulation context owning topology, RNG, and arbitration state.
pub struct Simulation<T: TopologyProvider> {
    topology: T,
    engine: Engine,
    rng: StdRng,
    /// Sessions completed (contention) or slots opened (scheduled).
    completed: u64,
    /// Optional admission cap; `None` runs indefinitely.
    max_sessions: Option<u64>,
}

impl Simulation<Topology> {
    /// Validate the configuration, generate its topology, and assemble the
    /// selected engine. Fails with `InvalidConfiguration` semantics before
    /// any simulation state exists.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::ValidationError)?;
        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let topology = Topology::generate(config.topology, config.node_count as usize, &mut rng);
        Ok(Self::new(topology, config, rng))
    }
}

impl<T: TopologyProvider> Simulation<T> {
    /// Assemble a simulation over an existing topology provider. The caller
    /// supplies the RNG so deterministic runs are reproducible end to end.
    pub fn new(topology: T, config: &SimulationConfig, rng: StdRng) -> Self {
        let engine = match config.protocol {
            Protocol::Contention => Engine::Contention {
                scheduler: SessionScheduler::new(),
                coordinator: ChannelAccessCoordinator::new(),
                machine: TransmissionStateMachine::new(config.ack_delay, config.transfer_delay),
                session: None,
            },
            Protocol::Scheduled => Engine::Scheduled {
                arbitrator: ScheduleArbitrator::new(
                    config.slot_duration,
                    config.frequency_bands.clone(),
                ),
            },
        };
        Self {
            topology,
            engine,
            rng,
            completed: 0,
            max_sessions: config.max_sessions,
        }
    }

    /// Evaluate one tick at simulated time `now`.
    ///
    /// Contention mode: admit a new session when the system is idle and the
    /// waiting queue is empty, otherwise poll the state machine for at most
    /// one transition. Scheduled mode: open a slot when its boundary has
    /// been reached.
    pub fn advance(&mut self, now: SimTime) -> Vec<Event> {
        let admission_open = self.admission_open();
        match &mut self.engine {
            Engine::Contention {
                scheduler,
                coordinator,
                machine,
                session,
            } => match session {
                None => {
                    if !admission_open {
                        return Vec::new();
                    }
                    match scheduler.try_admit_random(&self.topology, &mut self.rng, now) {
                        AdmitOutcome::Admitted(new_session) => {
                            let event = admission_event(&new_session);
                            *session = Some(new_session);
                            vec![event]
                        }
                        AdmitOutcome::NoRoute { source, target } => {
                            vec![Event::NoRoute { source, target }]
                        }
                        AdmitOutcome::Blocked => Vec::new(),
                    }
                }
                Some(active) => {
                    let event = machine.step(active, coordinator, &mut self.rng, now);
                    if active.stage == Stage::Idle {
                        scheduler.complete();
                        *session = None;
                        self.completed += 1;
                    }
                    event.into_iter().collect()
                }
            },
            Engine::Scheduled { arbitrator } => {
                if !admission_open {
                    return Vec::new();
                }
                let events = arbitrator.advance(&self.topology, &mut self.rng, now);
                self.completed = arbitrator.slots_opened();
                events
            }
        }
    }

    /// Admit a session for a caller-supplied pair instead of a random one.
    /// Contention mode only; respects the single-flight discipline.
    pub fn begin_session_between(
        &mut self,
        source: NodeId,
        target: NodeId,
        now: SimTime,
    ) -> Vec<Event> {
        let Engine::Contention {
            scheduler, session, ..
        } = &mut self.engine
        else {
            log::warn!("begin_session_between is a contention-mode operation");
            return Vec::new();
        };
        if session.is_some() {
            return Vec::new();
        }
        match scheduler.admit_pair(&self.topology, source, target, now) {
            AdmitOutcome::Admitted(new_session) => {
                let event = admission_event(&new_session);
                *session = Some(new_session);
                vec![event]
            }
            AdmitOutcome::NoRoute { source, target } => vec![Event::NoRoute { source, target }],
            AdmitOutcome::Blocked => Vec::new(),
        }
    }

    /// Admit a session over an explicit precomputed path. Contention mode
    /// only; respects the single-flight discipline.
    pub fn begin_session_on_path(&mut self, path: Vec<NodeId>, now: SimTime) -> Vec<Event> {
        let Engine::Contention {
            scheduler, session, ..
        } = &mut self.engine
        else {
            log::warn!("begin_session_on_path is a contention-mode operation");
            return Vec::new();
        };
        if session.is_some() || !scheduler.waiting().is_empty() || path.is_empty() {
            return Vec::new();
        }
        let new_session = scheduler.admit_on_path(path, now);
        let event = admission_event(&new_session);
        *session = Some(new_session);
        vec![event]
    }

    /// Read-only snapshot for a renderer collaborator.
    pub fn snapshot(&self) -> RenderSnapshot {
        match &self.engine {
            Engine::Contention {
                scheduler, session, ..
            } => RenderSnapshot {
                paths: session.iter().map(|s| s.path.clone()).collect(),
                stage: session.as_ref().map(|s| s.stage).unwrap_or(Stage::Idle),
                waiting: scheduler.waiting().iter().copied().collect(),
                collision: session.as_ref().map(|s| s.collision).unwrap_or(false),
                current_slot: None,
                active_band: None,
            },
            Engine::Scheduled { arbitrator } => RenderSnapshot {
                paths: arbitrator.last_path().cloned().into_iter().collect(),
                stage: Stage::Idle,
                waiting: Vec::new(),
                collision: false,
                current_slot: arbitrator.current_slot(),
                active_band: arbitrator.current_slot().map(|_| arbitrator.active_band().to_string()),
            },
        }
    }

    /// The currently admitted session, if any.
    pub fn active_session(&self) -> Option<&Session> {
        match &self.engine {
            Engine::Contention { session, .. } => session.as_ref(),
            Engine::Scheduled { .. } => None,
        }
    }

    /// Number of paths currently flagged busy (contention mode).
    pub fn busy_path_count(&self) -> usize {
        match &self.engine {
            Engine::Contention { coordinator, .. } => coordinator.busy_path_count(),
            Engine::Scheduled { .. } => 0,
        }
    }

    /// Completed sessions (contention) or opened slots (scheduled).
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// True once the admission cap is reached and nothing is in flight.
    /// Never true without a configured cap.
    pub fn is_finished(&self) -> bool {
        let in_flight = self.active_session().is_some();
        match self.max_sessions {
            Some(cap) => self.completed >= cap && !in_flight,
            None => false,
        }
    }

    fn admission_open(&self) -> bool {
        match self.max_sessions {
            Some(cap) => self.completed < cap,
            None => true,
        }
    }
}

fn admission_event(session: &Session) -> Event {
    Event::StageChanged {
        session_id: session.id,
        from: Stage::Idle,
        to: Stage::CarrierSensing,
        source: session.source(),
        target: session.target(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use crate::topology::{Topology, TopologyKind};

    fn config(protocol: Protocol) -> SimulationConfig {
        SimulationConfig {
            protocol,
            node_count: 5,
            topology: TopologyKind::Grid,
            slot_duration: 50.0,
            ack_delay: 10.0,
            transfer_delay: 20.0,
            frequency_bands: vec!["A".to_string(), "B".to_string()],
            random_seed: Some(42),
            max_sessions: None,
            tick_interval: 1.0,
        }
    }

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn end_to_end_contention_over_three_hop_path() {
        let topology = Topology::fully_connected(5);
        let mut sim = Simulation::new(topology, &config(Protocol::Contention), seeded_rng());

        let events = sim.begin_session_on_path(vec![0, 2, 4], 0.0);
        assert!(matches!(
            events[0],
            Event::StageChanged {
                from: Stage::Idle,
                to: Stage::CarrierSensing,
                ..
            }
        ));

        // t=0: carrier sensing succeeds, optimistic reservation taken
        sim.advance(0.0);
        assert_eq!(sim.active_session().unwrap().stage, Stage::Request);
        assert_eq!(sim.busy_path_count(), 1);

        // request re-validation passes well before the ack delay
        sim.advance(1.0);
        assert_eq!(sim.active_session().unwrap().stage, Stage::Acknowledgment);

        // t=10: acknowledgment granted, transfer begins
        sim.advance(10.0);
        assert_eq!(sim.active_session().unwrap().stage, Stage::DataTransfer);

        // t=30: twenty units after the acknowledgment transition
        sim.advance(30.0);
        assert!(sim.active_session().is_none());
        assert_eq!(sim.busy_path_count(), 0);
        assert!(sim.snapshot().waiting.is_empty());
        assert_eq!(sim.completed(), 1);
    }

    #[test]
    fn stage_sequence_is_closed_over_a_long_random_run() {
        let allowed = [
            (Stage::Idle, Stage::CarrierSensing),
            (Stage::CarrierSensing, Stage::Request),
            (Stage::CarrierSensing, Stage::Backoff),
            (Stage::Request, Stage::Acknowledgment),
            (Stage::Request, Stage::Backoff),
            (Stage::Acknowledgment, Stage::DataTransfer),
            (Stage::DataTransfer, Stage::Idle),
            (Stage::Backoff, Stage::CarrierSensing),
        ];

        let mut rng = seeded_rng();
        let topology = Topology::generate(TopologyKind::Random, 8, &mut rng);
        let mut sim = Simulation::new(topology, &config(Protocol::Contention), rng);

        for tick in 0..600 {
            let now = tick as f64;
            for event in sim.advance(now) {
                if let Event::StageChanged { from, to, .. } = event {
                    assert!(
                        allowed.contains(&(from, to)),
                        "illegal transition {:?} -> {:?}",
                        from,
                        to
                    );
                }
            }
            // Invariants hold at every tick
            assert!(sim.busy_path_count() <= 1);
            assert!(sim.snapshot().waiting.len() <= 1);
        }
    }

    #[test]
    fn admission_cap_stops_new_sessions() {
        let topology = Topology::fully_connected(5);
        let mut cfg = config(Protocol::Contention);
        cfg.max_sessions = Some(2);
        let mut sim = Simulation::new(topology, &cfg, seeded_rng());

        let mut tick = 0.0;
        while !sim.is_finished() && tick < 10_000.0 {
            sim.advance(tick);
            tick += 1.0;
        }
        assert!(sim.is_finished());
        assert_eq!(sim.completed(), 2);

        // Further ticks are inert
        assert!(sim.advance(tick).is_empty());
        assert!(sim.active_session().is_none());
    }

    #[test]
    fn scheduled_mode_snapshot_reports_slot_and_band() {
        let topology = Topology::fully_connected(5);
        let mut sim = Simulation::new(topology, &config(Protocol::Scheduled), seeded_rng());

        let before = sim.snapshot();
        assert_eq!(before.current_slot, None);
        assert_eq!(before.active_band, None);

        sim.advance(0.0);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.current_slot, Some(0));
        assert_eq!(snapshot.active_band.as_deref(), Some("B"));
        assert_eq!(snapshot.stage, Stage::Idle);
        assert!(!snapshot.collision);
        assert_eq!(snapshot.paths.len(), 1);

        sim.advance(50.0);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.current_slot, Some(1));
        assert_eq!(snapshot.active_band.as_deref(), Some("A"));
    }

    #[test]
    fn single_flight_blocks_explicit_second_admission() {
        let topology = Topology::fully_connected(5);
        let mut sim = Simulation::new(topology, &config(Protocol::Contention), seeded_rng());

        assert_eq!(sim.begin_session_on_path(vec![0, 1], 0.0).len(), 1);
        assert!(sim.begin_session_on_path(vec![2, 3], 0.0).is_empty());
        assert!(sim.begin_session_between(2, 3, 0.0).is_empty());
        assert_eq!(sim.snapshot().waiting.len(), 1);
    }

    #[test]
    fn no_route_surfaces_as_event_and_leaves_system_idle() {
        struct NoLinks;
        impl TopologyProvider for NoLinks {
            fn node_ids(&self) -> Vec<NodeId> {
                vec![0, 1, 2]
            }
            fn neighbors(&self, _node: NodeId) -> Vec<NodeId> {
                Vec::new()
            }
            fn shortest_path(&self, _s: NodeId, _t: NodeId) -> Option<Vec<NodeId>> {
                None
            }
        }

        let mut sim = Simulation::new(NoLinks, &config(Protocol::Contention), seeded_rng());
        let events = sim.advance(0.0);
        assert!(matches!(events[0], Event::NoRoute { .. }));
        assert!(sim.active_session().is_none());
        assert!(sim.snapshot().waiting.is_empty());

        // Retried with a fresh pair on a later tick
        let events = sim.advance(1.0);
        assert!(matches!(events[0], Event::NoRoute { .. }));
    }
}
