//! Transmission state machine for contention-based channel access.
//!
//! Drives an admitted session through carrier sensing, reservation,
//! acknowledgment, and data transfer under elapsed-time gating, routing
//! collisions into randomized backoff. The machine is polled once per
//! external tick and never blocks; at most one transition happens per poll.
//!
//! Stage order for every reachable run:
//! `Idle -> CarrierSensing -> {Request -> Acknowledgment -> DataTransfer ->
//! Idle | Backoff -> CarrierSensing}*`

use rand::Rng;
use rand::rngs::StdRng;

use super::channel::ChannelAccessCoordinator;
use super::types::{BACKOFF_MAX, BACKOFF_MIN, Event, Session, SimTime, Stage};

/// Polls one session through the transmission stages.
#[derive(Debug)]
pub struct TransmissionStateMachine {
    /// Elapsed time since session start before the acknowledgment is granted.
    ack_delay: f64,
    /// Elapsed time since the acknowledgment before the transfer completes.
    transfer_delay: f64,
}

impl TransmissionStateMachine {
    pub fn new(ack_delay: f64, transfer_delay: f64) -> Self {
        Self {
            ack_delay,
            transfer_delay,
        }
    }

    /// Evaluate at most one transition for the session at time `now`.
    ///
    /// Returns the transition event, or `None` when the session's current
    /// guard has not elapsed yet. The caller observes `Stage::Idle` on the
    /// session to detect completion.
    pub fn step(
        &self,
        session: &mut Session,
        coordinator: &mut ChannelAccessCoordinator,
        rng: &mut StdRng,
        now: SimTime,
    ) -> Option<Event> {
        let key = session.key();
        let from = session.stage;
        let to = match session.stage {
            Stage::Idle => return None,
            Stage::CarrierSensing => {
                if coordinator.try_reserve(&key, session.id) {
                    log::info!(
                        "Node {} detected that the channel is clear on path {}; proceeding to request",
                        session.source(),
                        key
                    );
                    Stage::Request
                } else {
                    self.enter_backoff(session, rng, now);
                    log::warn!(
                        "Collision detected on path {}; node {} will back off for {} units",
                        key,
                        session.source(),
                        session.backoff_remaining
                    );
                    Stage::Backoff
                }
            }
            Stage::Request => {
                if coordinator.is_held_by(&key, session.id) {
                    log::info!(
                        "Node {} is requesting communication with node {} via path {}",
                        session.source(),
                        session.target(),
                        key
                    );
                    Stage::Acknowledgment
                } else {
                    // Contention fault: the reservation was lost between
                    // sensing and request. Only reachable when sessions run
                    // concurrently; handled exactly like a collision.
                    self.enter_backoff(session, rng, now);
                    log::warn!(
                        "Contention fault on path {}; node {} will back off for {} units",
                        key,
                        session.source(),
                        session.backoff_remaining
                    );
                    Stage::Backoff
                }
            }
            Stage::Acknowledgment => {
                if now - session.start_time >= self.ack_delay {
                    session.transfer_started = now;
                    log::info!(
                        "Receiver node {} has granted acknowledgment to sender node {} via path {}",
                        session.target(),
                        session.source(),
                        key
                    );
                    Stage::DataTransfer
                } else {
                    return None;
                }
            }
            Stage::DataTransfer => {
                if now - session.transfer_started >= self.transfer_delay {
                    coordinator.release(&key);
                    session.collision = false;
                    log::info!(
                        "Data transfer from sender node {} to receiver node {} via path {} successful; releasing medium",
                        session.source(),
                        session.target(),
                        key
                    );
                    Stage::Idle
                } else {
                    return None;
                }
            }
            Stage::Backoff => {
                if now - session.backoff_started >= session.backoff_remaining {
                    session.collision = false;
                    // The flag is re-examined on the next carrier-sensing
                    // tick; no assumption that it has cleared.
                    log::info!(
                        "Backoff completed; node {} retrying carrier sensing on path {}",
                        session.source(),
                        key
                    );
                    Stage::CarrierSensing
                } else {
                    return None;
                }
            }
        };
        session.stage = to;
        Some(Event::StageChanged {
            session_id: session.id,
            from,
            to,
            source: session.source(),
            target: session.target(),
        })
    }

    fn enter_backoff(&self, session: &mut Session, rng: &mut StdRng, now: SimTime) {
        session.collision = true;
        session.backoff_remaining = rng.gen_range(BACKOFF_MIN..=BACKOFF_MAX) as f64;
        session.backoff_started = now;
    }
}
