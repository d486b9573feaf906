//! Identities of the units that inhabit the mission map.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of warbots the tag space can represent.
pub const MAX_WARBOTS: u8 = 11;
/// Largest number of opposing force units the tag space can represent.
pub const MAX_OPFOR: u8 = 11;
/// Largest number of civilians the tag space can represent.
pub const MAX_CIVILIANS: u8 = 20;

/// Raised when a numeric identifier falls outside the tag space.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("{kind} number {value} is outside 1..={max}")]
pub struct IdOutOfRange {
    kind: &'static str,
    value: u8,
    max: u8,
}

macro_rules! unit_id {
    ($(#[$meta:meta])* $name:ident, $max:expr, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Creates an identifier, rejecting numbers outside the tag space.
            #[must_use]
            pub const fn new(value: u8) -> Option<Self> {
                if value >= 1 && value <= $max {
                    Some(Self(value))
                } else {
                    None
                }
            }

            /// Numeric part of the identifier, starting at one.
            #[must_use]
            pub const fn get(&self) -> u8 {
                self.0
            }

            /// Zero-based position of the identifier within its tag block.
            #[must_use]
            pub const fn index(&self) -> u32 {
                self.0 as u32 - 1
            }

            /// Every valid identifier in ascending order.
            pub fn all() -> impl Iterator<Item = Self> {
                (1..=$max).map(Self)
            }
        }

        impl TryFrom<u8> for $name {
            type Error = IdOutOfRange;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(IdOutOfRange {
                    kind: $prefix,
                    value,
                    max: $max,
                })
            }
        }

        impl From<$name> for u8 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }
    };
}

unit_id!(
    /// Identity of a friendly warbot, `WARBOT_1` through `WARBOT_11`.
    WarbotId,
    MAX_WARBOTS,
    "WARBOT"
);

unit_id!(
    /// Identity of an opposing force unit, `OPFOR_1` through `OPFOR_11`.
    OpforId,
    MAX_OPFOR,
    "OPFOR"
);

unit_id!(
    /// Identity of a civilian, `CIV_1` through `CIV_20`.
    CivilianId,
    MAX_CIVILIANS,
    "CIV"
);

/// Any unit that takes part in the turn protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    /// A friendly warbot.
    Warbot(WarbotId),
    /// An opposing force unit.
    Opfor(OpforId),
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warbot(id) => id.fmt(f),
            Self::Opfor(id) => id.fmt(f),
        }
    }
}

impl From<WarbotId> for AgentId {
    fn from(id: WarbotId) -> Self {
        Self::Warbot(id)
    }
}

impl From<OpforId> for AgentId {
    fn from(id: OpforId) -> Self {
        Self::Opfor(id)
    }
}
