#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the warbot squad simulation.
//!
//! This crate defines the value types and message surface that connect the
//! authoritative mission map, the orchestrator and every autonomous unit.
//! The orchestrator talks to units through the turn protocol in [`turn`];
//! warbots talk to each other through the radio frames in [`radio`]. Both
//! message families carry a kind discriminant and a timestamp and frame as
//! flat JSON records via [`wire`].

pub mod doctrine;
pub mod geometry;
pub mod ids;
pub mod radio;
pub mod tag;
pub mod turn;
pub mod wire;

pub use geometry::{Direction, Offset, Point};
pub use ids::{AgentId, CivilianId, IdOutOfRange, OpforId, WarbotId};
pub use radio::{RadioBody, RadioMessage, TeamAssignment};
pub use tag::{Munition, Tag, TagCategory, TagSet, Terrain};
pub use turn::{timestamp, Action, AgentMessage, SimMessage, Timestamp, VisibleWindow};
pub use wire::WireError;

/// Canonical banner emitted when the simulation boots.
pub const WELCOME_BANNER: &str = "Autonomous Squad Assault.";
