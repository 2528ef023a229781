//! Shared-channel arbitration simulator for multi-hop wireless sensor
//! networks.
//!
//! Decides when a sender may seize the channel, detects and resolves
//! collisions with randomized backoff, and alternatively supports a
//! reservation-based (time/frequency-slotted) access mode with no
//! contention. The core is single-threaded and tick-driven: an external
//! driver calls [`Simulation::advance`] with explicit timestamps, and every
//! transition is reported both as a log line and as an inspectable
//! [`simulation::Event`].
//!
//! Topology construction lives behind the [`topology::TopologyProvider`]
//! trait; rendering consumes the read-only [`simulation::RenderSnapshot`].

pub mod config;
pub mod simulation;
pub mod topology;

pub use config::{ConfigError, Protocol, SimulationConfig, load_config, validate_config};
pub use simulation::{
    Event, PathKey, RenderSnapshot, Session, SimTime, Simulation, SlotAccess, Stage,
};
pub use topology::{NodeId, Topology, TopologyKind, TopologyProvider};
