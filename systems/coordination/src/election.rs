//! Leaderless election by pairwise identifier comparison.

use std::collections::BTreeSet;

use warbots_core::{doctrine::ELECTION_WINNER_WAIT_CYCLES, RadioBody, WarbotId};

/// One unit's progress through the election.
///
/// The lower identifier wins every comparison. A unit that never loses and
/// hears no new challenger for [`ELECTION_WINNER_WAIT_CYCLES`] consecutive
/// receive cycles claims the squad.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Election {
    defeated: bool,
    beaten: BTreeSet<WarbotId>,
    challenged: bool,
    quiet_cycles: u32,
    waited_cycles: u32,
}

impl Election {
    /// Records a declaration from `peer`, returning the compare frame to broadcast when `me` wins.
    pub(crate) fn observe_candidate(&mut self, me: WarbotId, peer: WarbotId) -> Option<RadioBody> {
        if peer == me {
            return None;
        }
        if peer < me {
            self.defeated = true;
            return None;
        }
        if !self.beaten.insert(peer) {
            return None;
        }

        self.challenged = true;
        (!self.defeated).then_some(RadioBody::ElectionCompare {
            winner: me,
            loser: peer,
        })
    }

    /// Records the outcome of a comparison between two other units.
    pub(crate) fn observe_compare(&mut self, me: WarbotId, winner: WarbotId, loser: WarbotId) {
        if loser == me || winner < me {
            self.defeated = true;
        }
        if loser > me && self.beaten.insert(loser) {
            self.challenged = true;
        }
    }

    /// Closes a receive cycle, reporting whether `me` has now won.
    pub(crate) fn finish_cycle(&mut self) -> bool {
        self.waited_cycles = self.waited_cycles.saturating_add(1);
        if self.defeated {
            return false;
        }

        if std::mem::take(&mut self.challenged) {
            self.quiet_cycles = 0;
        } else {
            self.quiet_cycles += 1;
        }
        self.quiet_cycles >= ELECTION_WINNER_WAIT_CYCLES
    }

    /// Reports whether the unit lost a comparison.
    pub(crate) fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Receive cycles spent in the election so far.
    pub(crate) fn waited_cycles(&self) -> u32 {
        self.waited_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(number: u8) -> WarbotId {
        WarbotId::new(number).expect("valid id")
    }

    #[test]
    fn lower_identifier_wins_and_announces_the_comparison() {
        let mut election = Election::default();
        assert_eq!(
            election.observe_candidate(id(2), id(5)),
            Some(RadioBody::ElectionCompare {
                winner: id(2),
                loser: id(5),
            })
        );
        assert_eq!(election.observe_candidate(id(2), id(5)), None);
        assert!(!election.is_defeated());

        assert_eq!(election.observe_candidate(id(2), id(1)), None);
        assert!(election.is_defeated());
    }

    #[test]
    fn defeated_units_stop_contesting() {
        let mut election = Election::default();
        election.observe_compare(id(3), id(1), id(3));
        assert!(election.is_defeated());
        assert_eq!(election.observe_candidate(id(3), id(4)), None);
        for _ in 0..10 {
            assert!(!election.finish_cycle());
        }
    }

    #[test]
    fn quiet_cycles_end_the_election() {
        let mut election = Election::default();
        let _ = election.observe_candidate(id(1), id(2));
        assert!(!election.finish_cycle());

        for _ in 1..ELECTION_WINNER_WAIT_CYCLES {
            assert!(!election.finish_cycle());
        }
        assert!(election.finish_cycle());
    }

    #[test]
    fn new_challengers_restart_the_quiet_count() {
        let mut election = Election::default();
        for _ in 1..ELECTION_WINNER_WAIT_CYCLES {
            assert!(!election.finish_cycle());
        }
        election.observe_compare(id(1), id(2), id(7));
        assert!(!election.finish_cycle());
        assert_eq!(election.waited_cycles(), ELECTION_WINNER_WAIT_CYCLES);
    }
}
