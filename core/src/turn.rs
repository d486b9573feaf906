//! Messages exchanged between the orchestrator and every live unit.
//!
//! Each round the orchestrator hands every unit a [`SimMessage::YourTurn`]
//! carrying the slice of the mission map the unit can currently see. The
//! unit answers with exactly one [`AgentMessage::TakeTurn`] echoing the
//! request's round, so a late answer to an earlier round is never taken for
//! the current one.

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Direction, Offset, Point},
    ids::{AgentId, WarbotId},
    tag::TagSet,
};

/// Wall-clock instant stamped on every message.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current wall-clock instant.
#[must_use]
pub fn timestamp() -> Timestamp {
    chrono::Utc::now()
}

/// Action a unit submits for a single turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// The unit stays put.
    DoNothing,
    /// The unit steps into an adjacent cell.
    MoveTo {
        /// Destination cell, one step from the unit.
        location: Point,
    },
    /// The unit fires a round.
    FireAt {
        /// Point the unit is aiming at.
        location: Point,
        /// Direction the round travels from the shooter.
        direction: Direction,
    },
}

/// Rectangular slice of the mission map visible to one unit.
///
/// Cells are stored row-major relative to `origin`, the world coordinate of
/// the slice's top-left cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleWindow {
    location: Point,
    origin: Point,
    width: u32,
    height: u32,
    cells: Vec<TagSet>,
}

impl VisibleWindow {
    /// Assembles a window, returning `None` when `cells` does not match the dimensions.
    #[must_use]
    pub fn new(
        location: Point,
        origin: Point,
        width: u32,
        height: u32,
        cells: Vec<TagSet>,
    ) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
        if cells.len() != expected {
            return None;
        }

        Some(Self {
            location,
            origin,
            width,
            height,
            cells,
        })
    }

    /// World location of the unit the window was cut for.
    #[must_use]
    pub const fn location(&self) -> Point {
        self.location
    }

    /// World coordinate of the top-left cell.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Number of columns in the window.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the window.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Row-major cell values.
    #[must_use]
    pub fn cells(&self) -> &[TagSet] {
        &self.cells
    }

    /// Offset that converts window-local points into world points.
    #[must_use]
    pub const fn world_offset(&self) -> Offset {
        Offset::new(self.origin.x(), self.origin.y())
    }

    /// Consumes the window, yielding its raw cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<TagSet> {
        self.cells
    }
}

/// Messages sent from the orchestrator to a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum SimMessage {
    /// The unit must decide and submit one action.
    YourTurn {
        /// Round the request belongs to.
        round: u32,
        /// Slice of the map around the unit.
        visible_map: VisibleWindow,
        /// Time the round started.
        timestamp: Timestamp,
    },
    /// The unit must leave the radio and exit.
    Shutdown {
        /// Time shutdown was ordered.
        timestamp: Timestamp,
    },
}

impl SimMessage {
    /// Builds the request for `round` carrying the provided window.
    #[must_use]
    pub fn your_turn(round: u32, visible_map: VisibleWindow) -> Self {
        Self::YourTurn {
            round,
            visible_map,
            timestamp: timestamp(),
        }
    }

    /// Builds a shutdown order.
    #[must_use]
    pub fn shutdown() -> Self {
        Self::Shutdown {
            timestamp: timestamp(),
        }
    }
}

/// Messages sent from a unit to the orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// The unit's action for the current round.
    TakeTurn {
        /// Unit submitting the action.
        from: AgentId,
        /// Round of the request being answered.
        round: u32,
        /// Chosen action.
        action: Action,
        /// Time the action was chosen.
        timestamp: Timestamp,
    },
    /// The squad leader reports every unit on the security perimeter.
    MissionComplete {
        /// Squad leader reporting completion.
        from: WarbotId,
        /// Time the report was sent.
        timestamp: Timestamp,
    },
}

impl AgentMessage {
    /// Builds the reply to the request for `round`.
    #[must_use]
    pub fn take_turn(from: impl Into<AgentId>, round: u32, action: Action) -> Self {
        Self::TakeTurn {
            from: from.into(),
            round,
            action,
            timestamp: timestamp(),
        }
    }

    /// Builds a mission complete notice.
    #[must_use]
    pub fn mission_complete(from: WarbotId) -> Self {
        Self::MissionComplete {
            from,
            timestamp: timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_rejects_mismatched_cell_counts() {
        let location = Point::new(2, 2);
        assert!(VisibleWindow::new(location, Point::new(0, 0), 3, 3, vec![TagSet::EMPTY; 8]).is_none());
        assert!(VisibleWindow::new(location, Point::new(0, 0), 3, 3, vec![TagSet::EMPTY; 9]).is_some());
    }

    #[test]
    fn take_turn_encodes_as_a_flat_record() {
        let from = WarbotId::new(2).expect("valid id");
        let message = AgentMessage::take_turn(
            from,
            12,
            Action::FireAt {
                location: Point::new(4, 1),
                direction: Direction::North,
            },
        );
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["message_type"], "take_turn");
        assert_eq!(value["round"], 12);
        assert_eq!(value["action"]["action"], "fire_at");
        assert_eq!(value["action"]["direction"], "north");
        let restored: AgentMessage = serde_json::from_value(value).expect("deserialize");
        assert_eq!(restored, message);
    }
}
