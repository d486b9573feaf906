#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Opposing force system. Hostiles hold their ground and never act.

use warbots_core::{Action, OpforId, VisibleWindow};
use warbots_world::VisibleMap;

/// Pure system driving one hostile unit.
#[derive(Debug)]
pub struct Opfor {
    id: OpforId,
    turns: u32,
}

impl Opfor {
    /// Creates the system for hostile `id`.
    #[must_use]
    pub const fn new(id: OpforId) -> Self {
        Self { id, turns: 0 }
    }

    /// Identity of the hostile.
    #[must_use]
    pub const fn id(&self) -> OpforId {
        self.id
    }

    /// Turns taken so far.
    #[must_use]
    pub const fn turns(&self) -> u32 {
        self.turns
    }

    /// Looks around and holds position.
    pub fn take_turn(&mut self, window: VisibleWindow) -> Action {
        self.turns = self.turns.saturating_add(1);
        let map = VisibleMap::new(window);
        let warbots = map.warbot_locations().len();
        if warbots > 0 {
            tracing::trace!(opfor = %self.id, warbots, turn = self.turns, "warbots in sight");
        }
        Action::DoNothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbots_core::{Point, Terrain, WarbotId};
    use warbots_world::MissionMap;

    #[test]
    fn hostiles_hold_their_ground() {
        let mut map = MissionMap::new(10, 10, Terrain::Dirt);
        let id = OpforId::new(1).expect("valid id");
        let location = Point::new(4, 4);
        map.place_unit(id.into(), location).expect("placed");
        map.place_unit(WarbotId::new(2).expect("valid id").into(), Point::new(6, 6))
            .expect("placed");

        let mut opfor = Opfor::new(id);
        for _ in 0..3 {
            let window = map.window_around(location, 3).expect("window");
            assert_eq!(opfor.take_turn(window), Action::DoNothing);
        }
        assert_eq!(opfor.turns(), 3);
        assert_eq!(opfor.id(), id);
    }
}
