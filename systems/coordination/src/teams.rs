//! Team partitioning, roles and squad column wedge slots.

use warbots_core::{
    doctrine::{
        member_offset, SCW_SQUAD_LEADER_OFFSET, SCW_TEAM_A_OFFSETS, SCW_TEAM_B_LEADER_OFFSET,
        SCW_TEAM_B_OFFSETS,
    },
    Point, TeamAssignment, WarbotId,
};

/// Position a warbot holds in the squad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Elected coordinator, also leading team A.
    SquadLeader,
    /// Leader of the flanking team.
    TeamBLeader,
    /// Member of the base-of-fire team.
    TeamAMember {
        /// One-based slot within team A, after the squad leader.
        index: usize,
    },
    /// Member of the flanking team.
    TeamBMember {
        /// One-based slot within team B, after the team-B leader.
        index: usize,
    },
}

impl Role {
    /// Looks up the role `id` was given, if it was assigned at all.
    #[must_use]
    pub fn from_assignment(assignment: &TeamAssignment, id: WarbotId) -> Option<Self> {
        if assignment.squad_leader == id {
            return Some(Self::SquadLeader);
        }
        if assignment.team_b_leader == id {
            return Some(Self::TeamBLeader);
        }
        if let Some(index) = assignment.team_a.iter().position(|member| *member == id) {
            return Some(Self::TeamAMember { index });
        }
        assignment
            .team_b
            .iter()
            .position(|member| *member == id)
            .map(|index| Self::TeamBMember { index })
    }
}

/// Splits the squad under `leader`.
///
/// The roster is sorted ascending; the first unit leads team B and the rest
/// alternate between team A and team B. Returns `None` when the leader is
/// alone.
#[must_use]
pub fn assign_teams(
    leader: WarbotId,
    roster: impl IntoIterator<Item = WarbotId>,
) -> Option<TeamAssignment> {
    let mut members: Vec<WarbotId> = roster.into_iter().filter(|id| *id != leader).collect();
    members.sort_unstable();
    members.dedup();

    let mut members = members.into_iter();
    let team_b_leader = members.next()?;
    let mut team_a = vec![leader];
    let mut team_b = vec![team_b_leader];
    for (position, member) in members.enumerate() {
        if position % 2 == 0 {
            team_a.push(member);
        } else {
            team_b.push(member);
        }
    }

    Some(TeamAssignment {
        squad_leader: leader,
        team_b_leader,
        team_a,
        team_b,
    })
}

/// Squad column wedge slot for `role`, anchored on the rally point.
#[must_use]
pub fn formation_slot(rally_point: Point, role: Role) -> Point {
    let leader_slot = rally_point + SCW_SQUAD_LEADER_OFFSET;
    let team_b_leader_slot = leader_slot + SCW_TEAM_B_LEADER_OFFSET;
    match role {
        Role::SquadLeader => leader_slot,
        Role::TeamBLeader => team_b_leader_slot,
        Role::TeamAMember { index } => leader_slot + member_offset(&SCW_TEAM_A_OFFSETS, index),
        Role::TeamBMember { index } => {
            team_b_leader_slot + member_offset(&SCW_TEAM_B_OFFSETS, index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(number: u8) -> WarbotId {
        WarbotId::new(number).expect("valid id")
    }

    fn ids(numbers: &[u8]) -> Vec<WarbotId> {
        numbers.iter().map(|number| id(*number)).collect()
    }

    #[test]
    fn roster_of_four_splits_into_alternating_teams() {
        let assignment = assign_teams(id(1), ids(&[5, 3, 2, 4])).expect("assignment");
        assert_eq!(assignment.team_b_leader, id(2));
        assert_eq!(assignment.team_a, ids(&[1, 3, 5]));
        assert_eq!(assignment.team_b, ids(&[2, 4]));
    }

    #[test]
    fn team_sizes_never_differ_by_more_than_one() {
        for size in 1..=9u8 {
            let roster: Vec<_> = (2..=size + 1).map(id).collect();
            let assignment = assign_teams(id(1), roster.clone()).expect("assignment");
            let a = assignment.team_a.len();
            let b = assignment.team_b.len();
            assert!(a.abs_diff(b) <= 1, "roster of {size}: {a} vs {b}");

            for member in roster {
                let appearances = assignment.members().filter(|m| *m == member).count();
                assert_eq!(appearances, 1);
            }
        }
    }

    #[test]
    fn a_lone_leader_has_no_teams() {
        assert_eq!(assign_teams(id(3), ids(&[3])), None);
    }

    #[test]
    fn roles_follow_slot_order() {
        let assignment = assign_teams(id(1), ids(&[2, 3, 4, 5])).expect("assignment");
        assert_eq!(Role::from_assignment(&assignment, id(1)), Some(Role::SquadLeader));
        assert_eq!(Role::from_assignment(&assignment, id(2)), Some(Role::TeamBLeader));
        assert_eq!(
            Role::from_assignment(&assignment, id(5)),
            Some(Role::TeamAMember { index: 2 })
        );
        assert_eq!(
            Role::from_assignment(&assignment, id(4)),
            Some(Role::TeamBMember { index: 1 })
        );
        assert_eq!(Role::from_assignment(&assignment, id(6)), None);
    }

    #[test]
    fn wedge_slots_hang_off_the_rally_point() {
        let rally = Point::new(50, 80);
        assert_eq!(formation_slot(rally, Role::SquadLeader), Point::new(50, 75));
        assert_eq!(formation_slot(rally, Role::TeamBLeader), Point::new(50, 80));
        assert_eq!(
            formation_slot(rally, Role::TeamAMember { index: 1 }),
            Point::new(48, 77)
        );
        assert_eq!(
            formation_slot(rally, Role::TeamBMember { index: 2 }),
            Point::new(48, 82)
        );
    }
}
