//! A unit's partial view of the mission map.

use std::collections::BTreeMap;

use warbots_core::{
    doctrine::FLANKING_DISTANCE, CivilianId, Direction, OpforId, Point, Tag, VisibleWindow,
    WarbotId,
};

use crate::{grid::OccupancyGrid, navigation::find_path, view::MapView};

/// Flank chosen by [`VisibleMap::find_flanking_position`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlankingRoute {
    /// Flanking base point beside the objective.
    pub position: Point,
    /// Point level with the unit on the flank's column, travelled through first.
    pub waypoint: Point,
}

/// Window of the mission map as seen by one unit, addressed in world coordinates.
///
/// Registries of marker and unit locations are rebuilt from the raw cells by
/// [`VisibleMap::scan`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleMap {
    grid: OccupancyGrid,
    origin: Point,
    location: Point,
    objective: Option<Point>,
    rally_point: Option<Point>,
    warbots: BTreeMap<WarbotId, Point>,
    opfor: BTreeMap<OpforId, Point>,
    civilians: BTreeMap<CivilianId, Point>,
}

impl VisibleMap {
    /// Builds a scanned view from a window handed out by the orchestrator.
    #[must_use]
    pub fn new(window: VisibleWindow) -> Self {
        let origin = window.origin();
        let location = window.location();
        let mut map = Self {
            grid: OccupancyGrid::from_window(window),
            origin,
            location,
            objective: None,
            rally_point: None,
            warbots: BTreeMap::new(),
            opfor: BTreeMap::new(),
            civilians: BTreeMap::new(),
        };
        map.scan();
        map
    }

    /// Rebuilds every registry from the raw window contents.
    pub fn scan(&mut self) {
        self.objective = None;
        self.rally_point = None;
        self.warbots.clear();
        self.opfor.clear();
        self.civilians.clear();

        for (local, value) in self.grid.iter() {
            if value.is_empty() {
                continue;
            }
            let point = self.to_world(local);
            for tag in value.iter() {
                match tag {
                    Tag::Objective => self.objective = Some(point),
                    Tag::RallyPoint => self.rally_point = Some(point),
                    Tag::Warbot(id) => {
                        let _ = self.warbots.insert(id, point);
                    }
                    Tag::Opfor(id) => {
                        let _ = self.opfor.insert(id, point);
                    }
                    Tag::Civilian(id) => {
                        let _ = self.civilians.insert(id, point);
                    }
                    Tag::Munition(_) | Tag::Terrain(_) => {}
                }
            }
        }
    }

    /// World location of the unit the window was cut for.
    #[must_use]
    pub const fn location(&self) -> Point {
        self.location
    }

    /// Objective location, when visible.
    #[must_use]
    pub const fn objective(&self) -> Option<Point> {
        self.objective
    }

    /// Rally point location, when visible.
    #[must_use]
    pub const fn rally_point(&self) -> Option<Point> {
        self.rally_point
    }

    /// Location of a visible warbot.
    #[must_use]
    pub fn warbot_location(&self, id: WarbotId) -> Option<Point> {
        self.warbots.get(&id).copied()
    }

    /// Every visible warbot.
    #[must_use]
    pub fn warbot_locations(&self) -> &BTreeMap<WarbotId, Point> {
        &self.warbots
    }

    /// Every visible opposing force unit.
    #[must_use]
    pub fn opfor_locations(&self) -> &BTreeMap<OpforId, Point> {
        &self.opfor
    }

    /// Every visible civilian.
    #[must_use]
    pub fn civilian_locations(&self) -> &BTreeMap<CivilianId, Point> {
        &self.civilians
    }

    /// Visible hostile closest to `from`, ties broken by identifier.
    #[must_use]
    pub fn closest_opfor(&self, from: Point) -> Option<Point> {
        self.opfor
            .values()
            .copied()
            .min_by_key(|location| location.chebyshev_distance(from))
    }

    /// Navigable boundary cell closest to `target`.
    ///
    /// Used as an intermediate waypoint toward targets outside the window.
    #[must_use]
    pub fn find_closest_boundary_point(&self, target: Point) -> Option<Point> {
        let (min, max) = self.bounds();
        let mut best: Option<(f64, Point)> = None;

        for (local, _) in self.grid.iter() {
            let point = self.to_world(local);
            let on_boundary = point.x() == min.x()
                || point.x() == max.x()
                || point.y() == min.y()
                || point.y() == max.y();
            if !on_boundary || point == self.location || !self.is_navigable(point) {
                continue;
            }

            let distance = point.distance(target);
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, point));
            }
        }

        best.map(|(_, point)| point)
    }

    /// Closest cell to `point` that is navigable and free, searching the window.
    ///
    /// The unit's own cell counts as free.
    #[must_use]
    pub fn nearest_navigable(&self, point: Point) -> Option<Point> {
        let anchor = self.clamp(point);
        let width = i32::try_from(self.grid.width()).unwrap_or(i32::MAX);
        let height = i32::try_from(self.grid.height()).unwrap_or(i32::MAX);
        let max_radius = width.max(height);

        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = Point::new(anchor.x() + dx, anchor.y() + dy);
                    if self.is_free(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }

        None
    }

    /// Spot on a team leader's row directly in front of or behind `me`.
    #[must_use]
    pub fn line_position(&self, leader: Point, me: Point) -> Point {
        Point::new(me.x(), leader.y())
    }

    /// Picks the west or east flank of `objective` that `me` reaches sooner.
    ///
    /// Candidates inside the window must be navigable and reachable; candidates
    /// beyond it are estimated by straight-line steps. Ties go east.
    #[must_use]
    pub fn find_flanking_position(&self, objective: Point, me: Point) -> Option<FlankingRoute> {
        let west = self.flank_cost(objective + Direction::West.scaled_vector(FLANKING_DISTANCE), me);
        let east = self.flank_cost(objective + Direction::East.scaled_vector(FLANKING_DISTANCE), me);

        let position = match (west, east) {
            (Some((west_cost, west)), Some((east_cost, _))) if west_cost < east_cost => west,
            (_, Some((_, east))) => east,
            (Some((_, west)), None) => west,
            (None, None) => return None,
        };

        Some(FlankingRoute {
            position,
            waypoint: Point::new(position.x(), me.y()),
        })
    }

    fn flank_cost(&self, candidate: Point, me: Point) -> Option<(usize, Point)> {
        if candidate.x() < 0 || candidate.y() < 0 {
            return None;
        }
        if !self.on_map(candidate) {
            let estimate = usize::try_from(candidate.chebyshev_distance(me)).ok()?;
            return Some((estimate, candidate));
        }
        if !self.is_navigable(candidate) {
            return None;
        }

        let path = find_path(self, me, candidate);
        if path.is_empty() && candidate != me {
            return None;
        }
        Some((path.len(), candidate))
    }

    fn is_free(&self, point: Point) -> bool {
        self.is_navigable(point) && (point == self.location || !self.is_occupied(point))
    }
}

impl MapView for VisibleMap {
    fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    fn origin(&self) -> Point {
        self.origin
    }
}
