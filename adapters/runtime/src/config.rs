//! Simulation settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warbots_core::doctrine::{
    DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH, OPFOR_VISION_DISTANCE, WARBOT_VISION_DISTANCE,
};
use warbots_world::{generation::MIN_MAP_SIDE, GenerationConfig};

/// Fewest warbots that still make a squad.
pub const MIN_WARBOTS: u8 = 2;
/// Most warbots the squad doctrine has slots for.
pub const MAX_WARBOTS: u8 = 10;
/// Most hostiles a mission spawns.
pub const MAX_OPFOR: u8 = 10;

/// Everything needed to stage and run one mission.
///
/// Missing fields fall back to [`SimulationConfig::default`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Map columns.
    pub width: u32,
    /// Map rows.
    pub height: u32,
    /// Seed for terrain and spawn placement.
    pub seed: u64,
    /// Warbots in the squad.
    pub warbots: u8,
    /// Hostiles guarding the objective.
    pub opfor: u8,
    /// Radius of the window each warbot sees.
    pub warbot_vision: u32,
    /// Radius of the window each hostile sees.
    pub opfor_vision: u32,
    /// Length of one radio receive cycle in milliseconds.
    pub cycle_ms: u64,
    /// How long a round waits for turn replies in milliseconds.
    pub turn_timeout_ms: u64,
    /// Consecutive missed turns before a unit is dropped as lost.
    pub max_missed_turns: u32,
    /// Rounds played before the run is abandoned.
    pub max_rounds: u32,
    /// Pause between rounds in milliseconds.
    pub turn_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            seed: 0,
            warbots: 5,
            opfor: 3,
            warbot_vision: WARBOT_VISION_DISTANCE,
            opfor_vision: OPFOR_VISION_DISTANCE,
            cycle_ms: 5,
            turn_timeout_ms: 2_000,
            max_missed_turns: 3,
            max_rounds: 5_000,
            turn_delay_ms: 0,
        }
    }
}

/// Settings rejected by [`SimulationConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The squad size is outside the supported range.
    #[error("warbots must be between {min} and {max}, got {0}", min = MIN_WARBOTS, max = MAX_WARBOTS)]
    Warbots(u8),
    /// The hostile count is outside the supported range.
    #[error("opfor must be between 1 and {max}, got {0}", max = MAX_OPFOR)]
    Opfor(u8),
    /// The map cannot fit the assault.
    #[error("map of {width}x{height} is smaller than {min}x{min}", min = MIN_MAP_SIDE)]
    MapTooSmall {
        /// Requested columns.
        width: u32,
        /// Requested rows.
        height: u32,
    },
    /// A setting that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl SimulationConfig {
    /// Checks the settings before anything is spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WARBOTS..=MAX_WARBOTS).contains(&self.warbots) {
            return Err(ConfigError::Warbots(self.warbots));
        }
        if !(1..=MAX_OPFOR).contains(&self.opfor) {
            return Err(ConfigError::Opfor(self.opfor));
        }
        if self.width < MIN_MAP_SIDE || self.height < MIN_MAP_SIDE {
            return Err(ConfigError::MapTooSmall {
                width: self.width,
                height: self.height,
            });
        }

        let positive = [
            ("warbot_vision", u64::from(self.warbot_vision)),
            ("opfor_vision", u64::from(self.opfor_vision)),
            ("cycle_ms", self.cycle_ms),
            ("turn_timeout_ms", self.turn_timeout_ms),
            ("max_missed_turns", u64::from(self.max_missed_turns)),
            ("max_rounds", u64::from(self.max_rounds)),
        ];
        match positive.into_iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::Zero(field)),
            None => Ok(()),
        }
    }

    /// Map generation settings derived from this configuration.
    #[must_use]
    pub const fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            width: self.width,
            height: self.height,
            warbots: self.warbots,
            opfor: self.opfor,
            seed: self.seed,
        }
    }

    /// Radio receive cycle length.
    #[must_use]
    pub const fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }

    /// Per-round reply timeout.
    #[must_use]
    pub const fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    /// Pause between rounds.
    #[must_use]
    pub const fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }
}
