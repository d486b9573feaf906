//! Fixed squad doctrine: vision, generation radii, formation and maneuver offsets.
//!
//! Formation offsets are measured from the owning team leader's slot.
//! Team B offsets mirror team A so a sparse squad still stays balanced.

use crate::geometry::Offset;

/// Default number of map columns.
pub const DEFAULT_MAP_WIDTH: u32 = 128;
/// Default number of map rows.
pub const DEFAULT_MAP_HEIGHT: u32 = 96;

/// Cells a warbot sees in every direction.
pub const WARBOT_VISION_DISTANCE: u32 = 12;
/// Cells an opposing force unit sees in every direction.
pub const OPFOR_VISION_DISTANCE: u32 = 8;
/// Maximum spawn distance of a warbot from the rally point.
pub const WARBOT_GENERATE_RADIUS: u32 = 5;
/// Maximum spawn distance of an opposing force unit from the objective.
pub const OPFOR_GENERATE_RADIUS: u32 = 3;
/// Cells a round travels before it is spent.
pub const FIRE_RANGE: u32 = WARBOT_VISION_DISTANCE;

/// Quiet receive cycles after which an undefeated candidate claims the election.
pub const ELECTION_WINNER_WAIT_CYCLES: u32 = 4;
/// Receive cycles a follower waits for the team assignment before giving up.
pub const TEAM_ASSIGNMENT_WAIT_CYCLES: u32 = 200;
/// Turns the squad leader waits on a quorum before excluding silent peers.
pub const QUORUM_WAIT_TURNS: u32 = 150;
/// Turns a unit keeps trying to reach a target before treating it as reached.
pub const TRAVEL_TURN_BUDGET: u32 = 250;

/// Squad leader slot, measured from the rally point.
pub const SCW_SQUAD_LEADER_OFFSET: Offset = Offset::new(0, -5);
/// Team-B leader slot, measured from the squad leader slot.
pub const SCW_TEAM_B_LEADER_OFFSET: Offset = Offset::new(0, 5);
/// Team A member slots in squad column wedge.
pub const SCW_TEAM_A_OFFSETS: [Offset; 4] = [
    Offset::new(-2, 2),
    Offset::new(2, 2),
    Offset::new(-4, 4),
    Offset::new(4, 4),
];
/// Team B member slots in squad column wedge.
pub const SCW_TEAM_B_OFFSETS: [Offset; 4] = [
    Offset::new(2, 2),
    Offset::new(-2, 2),
    Offset::new(4, 4),
    Offset::new(-4, 4),
];

/// Where the squad leader halts short of a visible objective.
pub const LEADER_OBJECTIVE_STANDOFF: Offset = Offset::new(0, 5);

/// Team A firing line positions, measured from the squad leader.
pub const SUPPRESSIVE_OFFSETS: [Offset; 4] = [
    Offset::new(-2, 0),
    Offset::new(2, 0),
    Offset::new(-4, 0),
    Offset::new(4, 0),
];

/// Cells between the objective and the flanking base point.
pub const FLANKING_DISTANCE: i32 = WARBOT_VISION_DISTANCE as i32 - 2;

/// Team B flanking positions, measured from the flanking base point.
pub const FLANKING_OFFSETS: [Offset; 4] = [
    Offset::new(0, -2),
    Offset::new(0, 2),
    Offset::new(0, -4),
    Offset::new(0, 4),
];

/// Security perimeter positions around the objective, keyed by warbot number.
pub const SECURITY_PERIMETER_OFFSETS: [Offset; 10] = [
    Offset::new(0, 3),
    Offset::new(0, -3),
    Offset::new(-3, 0),
    Offset::new(3, 0),
    Offset::new(-2, 2),
    Offset::new(2, -2),
    Offset::new(2, 2),
    Offset::new(-2, -2),
    Offset::new(-1, 0),
    Offset::new(1, 0),
];

/// Member offset for the one-based `index` within a team, wrapping past four.
#[must_use]
pub fn member_offset(offsets: &[Offset; 4], index: usize) -> Offset {
    offsets[index.saturating_sub(1) % offsets.len()]
}

/// Perimeter offset for the warbot numbered `number`, wrapping past ten.
#[must_use]
pub fn perimeter_offset(number: u8) -> Offset {
    SECURITY_PERIMETER_OFFSETS[usize::from(number.saturating_sub(1)) % SECURITY_PERIMETER_OFFSETS.len()]
}
