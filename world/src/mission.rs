//! Authoritative mission map owned by the orchestrator.

use std::{collections::BTreeMap, mem};

use thiserror::Error;
use warbots_core::{
    AgentId, OpforId, Point, Tag, TagCategory, TagSet, Terrain, VisibleWindow, WarbotId,
};

use crate::{
    grid::{GridError, OccupancyGrid},
    view::MapView,
};

/// Errors raised while editing the mission map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// The underlying grid rejected the edit.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// The destination cell cannot be entered.
    #[error("{point} is blocked")]
    Blocked {
        /// Rejected destination.
        point: Point,
    },
    /// The unit is not on the map.
    #[error("{agent} is not on the map")]
    UnknownUnit {
        /// Missing unit.
        agent: AgentId,
    },
    /// The unit has already been placed.
    #[error("{agent} is already on the map")]
    AlreadyPlaced {
        /// Duplicate unit.
        agent: AgentId,
    },
}

/// Ground truth for the whole simulation.
///
/// Every unit's tag appears on exactly one cell and the registries mirror the
/// grid; edits go through methods that keep both in step.
#[derive(Clone, Debug)]
pub struct MissionMap {
    grid: OccupancyGrid,
    objective: Option<Point>,
    rally_point: Option<Point>,
    warbots: BTreeMap<WarbotId, Point>,
    opfor: BTreeMap<OpforId, Point>,
}

impl MissionMap {
    /// Creates a map covered by a single terrain.
    #[must_use]
    pub fn new(width: u32, height: u32, terrain: Terrain) -> Self {
        Self {
            grid: OccupancyGrid::filled(width, height, TagSet::only(Tag::Terrain(terrain))),
            objective: None,
            rally_point: None,
            warbots: BTreeMap::new(),
            opfor: BTreeMap::new(),
        }
    }

    /// Replaces the terrain of a cell, keeping units and markers.
    pub fn set_terrain(&mut self, point: Point, terrain: Terrain) -> Result<(), MapError> {
        let mut value = self.get(point);
        if let Some(previous) = value.terrain() {
            value.remove(Tag::Terrain(previous));
        }
        value.insert(Tag::Terrain(terrain));
        self.grid.set(point, value)?;
        Ok(())
    }

    /// Marks the objective, moving it if it was already placed.
    pub fn place_objective(&mut self, point: Point) -> Result<(), MapError> {
        if let Some(previous) = self.objective.take() {
            self.grid.remove(previous, Tag::Objective)?;
        }
        self.grid.insert(point, Tag::Objective)?;
        self.objective = Some(point);
        Ok(())
    }

    /// Marks the rally point, moving it if it was already placed.
    pub fn place_rally_point(&mut self, point: Point) -> Result<(), MapError> {
        if let Some(previous) = self.rally_point.take() {
            self.grid.remove(previous, Tag::RallyPoint)?;
        }
        self.grid.insert(point, Tag::RallyPoint)?;
        self.rally_point = Some(point);
        Ok(())
    }

    /// Puts a unit that is not yet on the map onto a free cell.
    pub fn place_unit(&mut self, agent: AgentId, point: Point) -> Result<(), MapError> {
        if self.location_of(agent).is_some() {
            return Err(MapError::AlreadyPlaced { agent });
        }
        if !self.can_enter(point) {
            return Err(MapError::Blocked { point });
        }

        self.grid.insert(point, unit_tag(agent))?;
        self.register(agent, point);
        Ok(())
    }

    /// Moves a unit onto a free cell, returning where it came from.
    pub fn move_unit(&mut self, agent: AgentId, to: Point) -> Result<Point, MapError> {
        let from = self
            .location_of(agent)
            .ok_or(MapError::UnknownUnit { agent })?;
        if !self.can_enter(to) {
            return Err(MapError::Blocked { point: to });
        }

        let tag = unit_tag(agent);
        self.grid.remove(from, tag)?;
        self.grid.insert(to, tag)?;
        self.register(agent, to);
        Ok(from)
    }

    /// Takes a unit off the map, returning its last location.
    pub fn remove_unit(&mut self, agent: AgentId) -> Option<Point> {
        let location = match agent {
            AgentId::Warbot(id) => self.warbots.remove(&id),
            AgentId::Opfor(id) => self.opfor.remove(&id),
        }?;
        if let Err(error) = self.grid.remove(location, unit_tag(agent)) {
            tracing::warn!(%agent, %error, "unit registry pointed off the map");
        }
        Some(location)
    }

    /// Cuts the square window of `radius` cells around `center`.
    ///
    /// Both corners are clamped onto the map, so windows near an edge shrink
    /// instead of reaching past it.
    pub fn window_around(&self, center: Point, radius: u32) -> Result<VisibleWindow, MapError> {
        let reach = i32::try_from(radius).unwrap_or(i32::MAX);
        let min = self.clamp(Point::new(
            center.x().saturating_sub(reach),
            center.y().saturating_sub(reach),
        ));
        let max = self.clamp(Point::new(
            center.x().saturating_add(reach),
            center.y().saturating_add(reach),
        ));
        let cells = self.grid.slice(min, max)?;
        let actual = cells.len();
        let width = min.x().abs_diff(max.x()) + 1;
        let height = min.y().abs_diff(max.y()) + 1;

        VisibleWindow::new(center, min, width, height, cells).ok_or(MapError::Grid(
            GridError::SliceMismatch {
                width,
                height,
                actual,
            },
        ))
    }

    /// First tag at `point` belonging to `category`'s kind.
    ///
    /// Terrain matches any terrain regardless of the variant carried.
    #[must_use]
    pub fn named_tag_at(&self, point: Point, category: TagCategory) -> Option<Tag> {
        let wanted = mem::discriminant(&category);
        self.get(point)
            .iter()
            .find(|tag| mem::discriminant(&tag.category()) == wanted)
    }

    /// Objective location, once placed.
    #[must_use]
    pub const fn objective(&self) -> Option<Point> {
        self.objective
    }

    /// Rally point location, once placed.
    #[must_use]
    pub const fn rally_point(&self) -> Option<Point> {
        self.rally_point
    }

    /// Location of a warbot still on the map.
    #[must_use]
    pub fn warbot_location(&self, id: WarbotId) -> Option<Point> {
        self.warbots.get(&id).copied()
    }

    /// Location of an opposing force unit still on the map.
    #[must_use]
    pub fn opfor_location(&self, id: OpforId) -> Option<Point> {
        self.opfor.get(&id).copied()
    }

    /// Location of any unit still on the map.
    #[must_use]
    pub fn location_of(&self, agent: AgentId) -> Option<Point> {
        match agent {
            AgentId::Warbot(id) => self.warbot_location(id),
            AgentId::Opfor(id) => self.opfor_location(id),
        }
    }

    /// Warbots on the map in identifier order.
    pub fn warbots(&self) -> impl Iterator<Item = (WarbotId, Point)> + '_ {
        self.warbots.iter().map(|(id, point)| (*id, *point))
    }

    /// Opposing force units on the map in identifier order.
    pub fn opfor(&self) -> impl Iterator<Item = (OpforId, Point)> + '_ {
        self.opfor.iter().map(|(id, point)| (*id, *point))
    }

    fn register(&mut self, agent: AgentId, point: Point) {
        let _ = match agent {
            AgentId::Warbot(id) => self.warbots.insert(id, point),
            AgentId::Opfor(id) => self.opfor.insert(id, point),
        };
    }
}

impl MapView for MissionMap {
    fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }
}

fn unit_tag(agent: AgentId) -> Tag {
    match agent {
        AgentId::Warbot(id) => Tag::Warbot(id),
        AgentId::Opfor(id) => Tag::Opfor(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warbot(number: u8) -> AgentId {
        AgentId::Warbot(WarbotId::new(number).expect("valid id"))
    }

    fn opfor(number: u8) -> AgentId {
        AgentId::Opfor(OpforId::new(number).expect("valid id"))
    }

    #[test]
    fn units_occupy_exactly_one_cell() {
        let mut map = MissionMap::new(10, 10, Terrain::Dirt);
        map.place_unit(warbot(1), Point::new(3, 3)).expect("free cell");
        let from = map.move_unit(warbot(1), Point::new(4, 3)).expect("free cell");

        assert_eq!(from, Point::new(3, 3));
        assert!(map.get(Point::new(3, 3)).warbot().is_none());
        assert_eq!(map.get(Point::new(4, 3)).warbot().map(|id| id.get()), Some(1));
        assert_eq!(map.location_of(warbot(1)), Some(Point::new(4, 3)));
    }

    #[test]
    fn occupied_and_impassable_cells_reject_units() {
        let mut map = MissionMap::new(10, 10, Terrain::Dirt);
        map.set_terrain(Point::new(5, 5), Terrain::Water).expect("in bounds");
        map.place_unit(opfor(1), Point::new(2, 2)).expect("free cell");

        assert_eq!(
            map.place_unit(warbot(1), Point::new(2, 2)),
            Err(MapError::Blocked { point: Point::new(2, 2) })
        );
        assert_eq!(
            map.place_unit(warbot(1), Point::new(5, 5)),
            Err(MapError::Blocked { point: Point::new(5, 5) })
        );
        assert_eq!(
            map.place_unit(opfor(1), Point::new(7, 7)),
            Err(MapError::AlreadyPlaced { agent: opfor(1) })
        );
    }

    #[test]
    fn removed_units_leave_the_grid_and_registry() {
        let mut map = MissionMap::new(6, 6, Terrain::Grass);
        map.place_unit(opfor(2), Point::new(1, 4)).expect("free cell");
        assert_eq!(map.remove_unit(opfor(2)), Some(Point::new(1, 4)));
        assert!(!map.is_occupied(Point::new(1, 4)));
        assert_eq!(map.remove_unit(opfor(2)), None);
        assert_eq!(
            map.move_unit(opfor(2), Point::new(2, 4)),
            Err(MapError::UnknownUnit { agent: opfor(2) })
        );
    }

    #[test]
    fn windows_near_the_edge_are_clamped() {
        let map = MissionMap::new(20, 15, Terrain::Dirt);
        let window = map.window_around(Point::new(1, 13), 4).expect("window");
        assert_eq!(window.origin(), Point::new(0, 9));
        assert_eq!(window.width(), 6);
        assert_eq!(window.height(), 6);
        assert_eq!(window.location(), Point::new(1, 13));
    }

    #[test]
    fn windows_in_the_interior_are_square() {
        let mut map = MissionMap::new(40, 40, Terrain::Dirt);
        map.place_objective(Point::new(22, 18)).expect("in bounds");
        let window = map.window_around(Point::new(20, 20), 3).expect("window");
        assert_eq!(window.origin(), Point::new(17, 17));
        assert_eq!(window.width(), 7);
        assert_eq!(window.height(), 7);
        assert!(window.cells()[7 + 5].contains(Tag::Objective));
    }

    #[test]
    fn named_tag_lookup_matches_by_kind() {
        let mut map = MissionMap::new(5, 5, Terrain::Mud);
        map.place_rally_point(Point::new(2, 2)).expect("in bounds");
        map.place_unit(warbot(4), Point::new(2, 2)).expect("free cell");

        assert_eq!(
            map.named_tag_at(Point::new(2, 2), TagCategory::Friendly),
            Some(Tag::Warbot(WarbotId::new(4).expect("valid id")))
        );
        assert_eq!(
            map.named_tag_at(Point::new(2, 2), TagCategory::Terrain(Terrain::Water)),
            Some(Tag::Terrain(Terrain::Mud))
        );
        assert_eq!(
            map.named_tag_at(Point::new(2, 2), TagCategory::Mission),
            Some(Tag::RallyPoint)
        );
        assert_eq!(map.named_tag_at(Point::new(2, 2), TagCategory::Hostile), None);
    }
}
