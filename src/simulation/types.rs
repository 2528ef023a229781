//! Type definitions for the channel arbitration simulation.
//!
//! Contains the data structures shared across the simulation core:
//! - Transmission stages and the session record moving through them
//! - Path identity used as the unit of busy-state
//! - Events emitted on the observability channel
//! - The read-only snapshot handed to renderers

use serde::Serialize;
use std::fmt;

use crate::topology::NodeId;

/// Simulated time in abstract units. Always passed in by the external tick
/// driver; the core never reads a wall clock.
pub type SimTime = f64;

/// Inclusive lower bound of the randomized backoff window (time units).
pub const BACKOFF_MIN: u32 = 1;
/// Inclusive upper bound of the randomized backoff window (time units).
pub const BACKOFF_MAX: u32 = 10;

/// Stage of an admitted transmission session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Idle,
    CarrierSensing,
    Request,
    Acknowledgment,
    DataTransfer,
    Backoff,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::CarrierSensing => "carrier_sensing",
            Stage::Request => "request",
            Stage::Acknowledgment => "acknowledgment",
            Stage::DataTransfer => "data_transfer",
            Stage::Backoff => "backoff",
        };
        write!(f, "{}", name)
    }
}

/// Canonical identity of a full multi-hop path, used as the unit of
/// busy-state. The whole path is one lock, not per-hop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey(Vec<NodeId>);

impl PathKey {
    pub fn new(path: &[NodeId]) -> Self {
        Self(path.to_vec())
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(f, "{}", joined)
    }
}

/// One admitted sender-to-receiver transmission attempt.
///
/// Timestamps are recorded at stage entry so every wait is an elapsed-time
/// comparison against an explicit value passed into the tick.
#[derive(Debug, Clone)]
pub struct Session {
    /// Monotonic id assigned at admission; the coordinator records it as the
    /// reservation holder so the Request-stage re-validation is expressible.
    pub id: u64,
    /// Ordered node ids from sender to receiver, length at least 1.
    pub path: Vec<NodeId>,
    /// Time the session was admitted.
    pub start_time: SimTime,
    pub stage: Stage,
    pub collision: bool,
    /// Randomized wait set on collision (time units).
    pub backoff_remaining: f64,
    /// Time the current backoff started.
    pub backoff_started: SimTime,
    /// Time of the Acknowledgment -> DataTransfer transition; the transfer
    /// delay is measured from here, not from `start_time`.
    pub transfer_started: SimTime,
}

impl Session {
    pub fn new(id: u64, path: Vec<NodeId>, start_time: SimTime) -> Self {
        debug_assert!(!path.is_empty(), "session path must have length >= 1");
        Self {
            id,
            path,
            start_time,
            stage: Stage::CarrierSensing,
            collision: false,
            backoff_remaining: 0.0,
            backoff_started: 0.0,
            transfer_started: 0.0,
        }
    }

    pub fn key(&self) -> PathKey {
        PathKey::new(&self.path)
    }

    /// Sending node (first hop of the path).
    pub fn source(&self) -> NodeId {
        self.path[0]
    }

    /// Receiving node (last hop of the path).
    pub fn target(&self) -> NodeId {
        *self.path.last().expect("session path is non-empty")
    }
}

/// Slot classification in scheduled mode. Only the reported label differs;
/// path resolution is identical in both branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotAccess {
    Tdma,
    Fdma,
}

impl fmt::Display for SlotAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotAccess::Tdma => write!(f, "TDMA"),
            SlotAccess::Fdma => write!(f, "FDMA"),
        }
    }
}

/// Events emitted by `Simulation::advance`. Advisory log lines accompany
/// each of these; the event values are the inspectable record.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A session moved from one stage to another.
    StageChanged {
        session_id: u64,
        from: Stage,
        to: Stage,
        source: NodeId,
        target: NodeId,
    },
    /// No path resolved between the chosen pair; retried on a later tick.
    NoRoute { source: NodeId, target: NodeId },
    /// A new slot opened in scheduled mode. `routed` is false when no path
    /// resolved for the chosen pair; the slot counter advanced regardless.
    SlotStarted {
        slot: u64,
        access: SlotAccess,
        band: String,
        source: NodeId,
        target: NodeId,
        routed: bool,
    },
}

/// Read-only view of the simulation handed to a renderer. The core never
/// draws; a renderer collaborator turns this into a frame.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    /// Active paths as ordered node-id sequences.
    pub paths: Vec<Vec<NodeId>>,
    /// Stage of the active session, `Idle` when none.
    pub stage: Stage,
    /// Node ids awaiting completion of the current session.
    pub waiting: Vec<NodeId>,
    pub collision: bool,
    /// Current slot counter (scheduled mode only).
    pub current_slot: Option<u64>,
    /// Active band label (scheduled mode only).
    pub active_band: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_key_displays_hop_sequence() {
        let key = PathKey::new(&[0, 2, 4]);
        assert_eq!(key.to_string(), "0 -> 2 -> 4");
    }

    #[test]
    fn path_keys_compare_on_full_sequence() {
        assert_eq!(PathKey::new(&[0, 2, 4]), PathKey::new(&[0, 2, 4]));
        assert_ne!(PathKey::new(&[0, 2, 4]), PathKey::new(&[0, 4]));
        assert_ne!(PathKey::new(&[0, 2, 4]), PathKey::new(&[4, 2, 0]));
    }

    #[test]
    fn session_endpoints_come_from_path() {
        let session = Session::new(1, vec![3, 1, 7], 0.0);
        assert_eq!(session.source(), 3);
        assert_eq!(session.target(), 7);
        assert_eq!(session.stage, Stage::CarrierSensing);
        assert!(!session.collision);
    }
}
