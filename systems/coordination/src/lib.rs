#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Squad coordination system driving a single warbot.
//!
//! Each [`Warbot`] elects a leader over the radio, takes a role from the
//! leader's team assignment, forms up at the rally point and then works
//! through the movement, contact, lift-and-shift and secure phases. The
//! system is pure: radio frames and visible windows go in, radio frames and
//! actions come out.

mod election;
pub mod teams;
mod travel;
mod warbot;

use warbots_core::{RadioBody, WarbotId};

pub use teams::{assign_teams, formation_slot, Role};
pub use warbot::{PhaseKind, Warbot};

/// Output produced by a warbot for its runtime to deliver.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Frame to broadcast on the squad radio.
    Radio(RadioBody),
    /// Report to the orchestrator that the squad secured the objective.
    MissionComplete,
}

/// Failures surfaced by a warbot's coordination logic.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// A signal the warbot depends on never arrived.
    #[error("{id} gave up waiting for the {waiting_for} after {cycles} receive cycles")]
    Stalled {
        /// Warbot that stalled.
        id: WarbotId,
        /// Signal it was waiting for.
        waiting_for: &'static str,
        /// Receive cycles spent waiting.
        cycles: u32,
    },
}
