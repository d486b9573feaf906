#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map state for the warbot squad simulation.
//!
//! The orchestrator owns the authoritative [`MissionMap`] and resolves unit
//! actions against it through [`apply`]. Units only ever see a
//! [`VisibleMap`] cut from it. Both maps share occupancy, navigability and
//! bounds logic through [`MapView`], and both can be planned over with
//! [`navigation::find_path`].

pub mod generation;
pub mod grid;
pub mod mission;
pub mod navigation;
pub mod resolution;
pub mod view;
pub mod visible;

pub use generation::{generate, GenerationConfig, GenerationError};
pub use grid::{GridError, OccupancyGrid};
pub use mission::{MapError, MissionMap};
pub use navigation::{find_path, find_path_avoiding};
pub use resolution::{apply, Event, MoveRejection};
pub use view::MapView;
pub use visible::{FlankingRoute, VisibleMap};

/// Read-only helpers the adapters use to inspect the mission map.
pub mod query {
    use warbots_core::{AgentId, Point, Tag, TagSet, Terrain};

    use crate::{mission::MissionMap, view::MapView};

    /// Every unit still on the map, warbots first, each group in identifier order.
    #[must_use]
    pub fn live_agents(map: &MissionMap) -> Vec<AgentId> {
        map.warbots()
            .map(|(id, _)| AgentId::from(id))
            .chain(map.opfor().map(|(id, _)| AgentId::from(id)))
            .collect()
    }

    /// Renders the map as one string per row.
    ///
    /// Warbots show their number in base 36, hostiles `X`, the objective `O`
    /// and the rally point `R`; terrain fills the remaining cells.
    #[must_use]
    pub fn render_rows(map: &MissionMap) -> Vec<String> {
        let (min, max) = map.bounds();
        (min.y()..=max.y())
            .map(|y| {
                (min.x()..=max.x())
                    .map(|x| glyph(map.get(Point::new(x, y))))
                    .collect()
            })
            .collect()
    }

    fn glyph(cell: TagSet) -> char {
        if let Some(id) = cell.warbot() {
            return char::from_digit(u32::from(id.get()), 36).unwrap_or('W');
        }
        if cell.opfor().is_some() {
            return 'X';
        }
        if cell.contains(Tag::Objective) {
            return 'O';
        }
        if cell.contains(Tag::RallyPoint) {
            return 'R';
        }

        match cell.terrain() {
            Some(Terrain::Water) => '~',
            Some(Terrain::Mud) => ',',
            Some(Terrain::Dirt) => '.',
            Some(Terrain::Grass) => '"',
            Some(Terrain::Tree) => 'T',
            Some(Terrain::Rock) => '^',
            Some(Terrain::Door) => '+',
            Some(Terrain::Wall) => '#',
            None => ' ',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbots_core::{AgentId, OpforId, Point, Terrain, WarbotId};

    #[test]
    fn live_agents_lists_warbots_before_opfor() {
        let mut map = MissionMap::new(8, 8, Terrain::Dirt);
        let opfor = AgentId::from(OpforId::new(1).expect("valid id"));
        let warbot = AgentId::from(WarbotId::new(2).expect("valid id"));
        map.place_unit(opfor, Point::new(1, 1)).expect("free cell");
        map.place_unit(warbot, Point::new(2, 2)).expect("free cell");

        assert_eq!(query::live_agents(&map), vec![warbot, opfor]);
    }

    #[test]
    fn rendering_marks_units_and_markers() {
        let mut map = MissionMap::new(4, 2, Terrain::Dirt);
        map.set_terrain(Point::new(3, 1), Terrain::Water).expect("in bounds");
        map.place_objective(Point::new(0, 0)).expect("in bounds");
        map.place_unit(
            AgentId::from(WarbotId::new(10).expect("valid id")),
            Point::new(1, 1),
        )
        .expect("free cell");
        map.place_unit(
            AgentId::from(OpforId::new(1).expect("valid id")),
            Point::new(2, 0),
        )
        .expect("free cell");

        assert_eq!(query::render_rows(&map), vec!["O.X.", ".a.~"]);
    }
}
