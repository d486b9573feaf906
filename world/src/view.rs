//! Read-side map abstraction shared by the mission map and visible maps.

use warbots_core::{Point, TagSet};

use crate::grid::OccupancyGrid;

/// Occupancy, navigability and bounds queries addressed in world coordinates.
///
/// Implementors only supply the backing grid and the world coordinate of its
/// top-left cell; every query is derived from those two.
pub trait MapView {
    /// Grid holding the map contents.
    fn grid(&self) -> &OccupancyGrid;

    /// World coordinate of the grid's top-left cell.
    fn origin(&self) -> Point {
        Point::new(0, 0)
    }

    /// Converts a world point into a grid-local point.
    fn to_local(&self, point: Point) -> Point {
        let origin = self.origin();
        Point::new(point.x() - origin.x(), point.y() - origin.y())
    }

    /// Converts a grid-local point into a world point.
    fn to_world(&self, point: Point) -> Point {
        let origin = self.origin();
        Point::new(point.x() + origin.x(), point.y() + origin.y())
    }

    /// Tags at `point`; empty off the map.
    fn get(&self, point: Point) -> TagSet {
        self.grid().get(self.to_local(point))
    }

    /// Reports whether `point` lies on the map.
    fn on_map(&self, point: Point) -> bool {
        self.grid().contains(self.to_local(point))
    }

    /// Reports whether something at `point` blocks movement; `false` off the map.
    fn is_occupied(&self, point: Point) -> bool {
        self.get(point).is_occupied()
    }

    /// Reports whether route planning may cross `point`; `false` off the map.
    fn is_navigable(&self, point: Point) -> bool {
        self.on_map(point) && self.get(point).is_navigable()
    }

    /// Reports whether a unit could step into `point` right now.
    fn can_enter(&self, point: Point) -> bool {
        self.on_map(point) && !self.is_occupied(point)
    }

    /// Reports whether a planned route may pass through `point`.
    fn can_enter_route_plan(&self, point: Point) -> bool {
        self.is_navigable(point)
    }

    /// Nearest on-map point to `point`.
    fn clamp(&self, point: Point) -> Point {
        let grid = self.grid();
        let local = self.to_local(point);
        let max_x = i32::try_from(grid.width().saturating_sub(1)).unwrap_or(i32::MAX);
        let max_y = i32::try_from(grid.height().saturating_sub(1)).unwrap_or(i32::MAX);
        self.to_world(Point::new(local.x().clamp(0, max_x), local.y().clamp(0, max_y)))
    }

    /// Inclusive world-coordinate corners of the map.
    fn bounds(&self) -> (Point, Point) {
        let grid = self.grid();
        let max_x = i32::try_from(grid.width()).unwrap_or(i32::MAX) - 1;
        let max_y = i32::try_from(grid.height()).unwrap_or(i32::MAX) - 1;
        (self.origin(), self.to_world(Point::new(max_x, max_y)))
    }
}
