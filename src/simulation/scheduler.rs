//! Session admission and the waiting queue.
//!
//! Admits at most one logical transmission at a time. A new session starts
//! only when nothing is active and the waiting queue is empty; the source
//! node is enqueued at admission and dequeued when its transfer completes,
//! so the queue length is always 0 or 1 under the single-flight model.

use rand::rngs::StdRng;
use rand::seq::index;
use std::collections::VecDeque;

use super::types::{Session, SimTime};
use crate::topology::{NodeId, TopologyProvider};

/// Result of one admission attempt.
#[derive(Debug)]
pub enum AdmitOutcome {
    /// A session was created; the source node is now in the waiting queue.
    Admitted(Session),
    /// The chosen pair has no connecting path; retried on a later tick.
    NoRoute { source: NodeId, target: NodeId },
    /// Admission is not possible this tick (waiting queue occupied, or
    /// fewer than two nodes to pick a pair from).
    Blocked,
}

/// Admits sessions and owns the FIFO of nodes awaiting completion.
#[derive(Debug, Default)]
pub struct SessionScheduler {
    waiting: VecDeque<NodeId>,
    next_session_id: u64,
}

impl SessionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes awaiting completion of the current session, FIFO order.
    pub fn waiting(&self) -> &VecDeque<NodeId> {
        &self.waiting
    }

    /// Pick a uniformly random (source, target) pair of distinct nodes and
    /// try to admit a session over the shortest path between them.
    pub fn try_admit_random<T: TopologyProvider>(
        &mut self,
        topology: &T,
        rng: &mut StdRng,
        now: SimTime,
    ) -> AdmitOutcome {
        if let Some(&waiting_node) = self.waiting.front() {
            log::info!("Node {} waiting to transmit", waiting_node);
            return AdmitOutcome::Blocked;
        }
        let ids = topology.node_ids();
        if ids.len() < 2 {
            log::warn!("Fewer than two nodes; nothing to transmit");
            return AdmitOutcome::Blocked;
        }
        let picked = index::sample(rng, ids.len(), 2);
        let source = ids[picked.index(0)];
        let target = ids[picked.index(1)];
        self.admit_pair(topology, source, target, now)
    }

    /// Try to admit a session for a caller-supplied pair.
    pub fn admit_pair<T: TopologyProvider>(
        &mut self,
        topology: &T,
        source: NodeId,
        target: NodeId,
        now: SimTime,
    ) -> AdmitOutcome {
        if !self.waiting.is_empty() {
            return AdmitOutcome::Blocked;
        }
        match topology.shortest_path(source, target) {
            Some(path) => AdmitOutcome::Admitted(self.admit_on_path(path, now)),
            None => {
                log::warn!("No path found from node {} to node {}", source, target);
                AdmitOutcome::NoRoute { source, target }
            }
        }
    }

    /// Admit a session over an explicit path, enqueueing its source.
    ///
    /// The caller is responsible for the single-flight discipline; this is
    /// the deterministic entry point tests and drivers with precomputed
    /// routes use.
    pub fn admit_on_path(&mut self, path: Vec<NodeId>, now: SimTime) -> Session {
        let session = Session::new(self.next_session_id, path, now);
        self.next_session_id += 1;
        self.waiting.push_back(session.source());
        log::info!(
            "Node {} starting transmission to node {} via path {}",
            session.source(),
            session.target(),
            session.key()
        );
        session
    }

    /// Dequeue the completed session's source node.
    pub fn complete(&mut self) {
        self.waiting.pop_front();
    }
}
