//! Messages warbots broadcast to each other over the squad radio.

use serde::{Deserialize, Serialize};

use crate::{
    geometry::Point,
    ids::WarbotId,
    turn::{timestamp, Timestamp},
};

/// Frame carried over the squad radio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadioMessage {
    /// Warbot that transmitted the frame.
    pub from: WarbotId,
    /// Time the frame was transmitted.
    pub timestamp: Timestamp,
    /// Phase-specific content.
    #[serde(flatten)]
    pub body: RadioBody,
}

impl RadioMessage {
    /// Stamps `body` with the sender and the current time.
    #[must_use]
    pub fn new(from: WarbotId, body: RadioBody) -> Self {
        Self {
            from,
            timestamp: timestamp(),
            body,
        }
    }
}

/// Squad roles handed out by the elected leader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssignment {
    /// Elected squad leader, who also leads team A.
    pub squad_leader: WarbotId,
    /// Leader of the flanking team.
    pub team_b_leader: WarbotId,
    /// Team A in slot order, squad leader first.
    pub team_a: Vec<WarbotId>,
    /// Team B in slot order, team-B leader first.
    pub team_b: Vec<WarbotId>,
}

impl TeamAssignment {
    /// Every warbot named in the assignment.
    pub fn members(&self) -> impl Iterator<Item = WarbotId> + '_ {
        self.team_a.iter().chain(self.team_b.iter()).copied()
    }
}

/// Content of a radio frame, discriminated by `message_type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum RadioBody {
    /// The sender has joined the radio net.
    WarbotOnline,
    /// The sender enters the leader election under its own name.
    ElectionNameDeclare,
    /// The sender beat `loser` in an ID comparison.
    ElectionCompare {
        /// Lower-numbered warbot.
        winner: WarbotId,
        /// Warbot that stops contesting.
        loser: WarbotId,
    },
    /// The sender went unchallenged and leads the squad.
    ElectionEnd {
        /// Elected squad leader.
        winner: WarbotId,
    },
    /// The leader's partition of the squad.
    TeamAssignment(TeamAssignment),
    /// The sender reached its formation slot.
    ReadyForMovement,
    /// The squad leaves the rally point.
    StartMovement,
    /// Intermediate point the squad leader is heading for.
    SquadLeaderWaypoint {
        /// Waypoint in world coordinates.
        waypoint: Point,
    },
    /// The sender sees hostiles.
    Contact {
        /// Location of a hostile the sender sees.
        location: Point,
    },
    /// The squad leader's base of fire.
    SuppressiveFirePosition {
        /// Squad leader's position on the firing line.
        location: Point,
    },
    /// The team-B leader's chosen flank.
    FlankingPosition {
        /// Flanking base point.
        location: Point,
        /// Intermediate point travelled through first.
        waypoint: Point,
    },
    /// The sender is in its flanking position.
    ReadyToFlank,
    /// Team A lifts fire and team B assaults.
    LiftAndShift,
    /// The sender reached its limit of advance.
    LimitOfAdvance,
    /// The squad moves to the security perimeter.
    SecureObjective,
    /// The sender is on the security perimeter.
    InSecurityPerimeterPosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(number: u8) -> WarbotId {
        WarbotId::new(number).expect("valid id")
    }

    #[test]
    fn frames_flatten_the_body_next_to_the_sender() {
        let message = RadioMessage::new(
            id(1),
            RadioBody::FlankingPosition {
                location: Point::new(10, 4),
                waypoint: Point::new(10, 20),
            },
        );
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["from"], 1);
        assert_eq!(value["message_type"], "flanking_position");
        assert_eq!(value["location"]["x"], 10);
        assert_eq!(value["waypoint"]["y"], 20);
    }

    #[test]
    fn team_assignment_survives_the_wire() {
        let assignment = TeamAssignment {
            squad_leader: id(1),
            team_b_leader: id(2),
            team_a: vec![id(1), id(3), id(5)],
            team_b: vec![id(2), id(4)],
        };
        let message = RadioMessage::new(id(1), RadioBody::TeamAssignment(assignment.clone()));
        let frame = serde_json::to_string(&message).expect("serialize");
        let restored: RadioMessage = serde_json::from_str(&frame).expect("deserialize");
        assert_eq!(restored.body, RadioBody::TeamAssignment(assignment));
    }
}
