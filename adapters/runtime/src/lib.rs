#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tokio runtime hosting the squad, the hostiles and the turn protocol.
//!
//! Every unit runs as its own task and talks to the orchestrator over typed
//! channels. Warbots additionally share the broadcast radio. The orchestrator
//! plays rounds: it cuts a window for each live unit, collects one action per
//! unit within the turn timeout and resolves the actions on the mission map.

mod actor;
pub mod config;
mod orchestrator;

pub use config::{ConfigError, SimulationConfig};
pub use orchestrator::{run, Outcome, RoundReport};

use thiserror::Error;
use warbots_radio::RadioError;
use warbots_world::{GenerationError, MapError};

/// Failures that stop a run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The mission map could not be generated.
    #[error("failed to generate the mission map")]
    Generation(#[from] GenerationError),
    /// A window could not be cut from the mission map.
    #[error("mission map rejected a request")]
    Map(#[from] MapError),
    /// The radio broker refused a subscription.
    #[error("radio failure")]
    Radio(#[from] RadioError),
    /// The generated map lacks a mission marker.
    #[error("mission map has no {0}")]
    MissingMarker(&'static str),
}
