//! Eight-directional A* route planning over any [`MapView`].

use std::{cmp::Reverse, collections::BinaryHeap};

use warbots_core::{Direction, Point};

use crate::view::MapView;

/// Plans a route from `start` to `goal`.
///
/// The returned steps exclude `start` and end on `goal`. The route is empty
/// when `start == goal` or when no route exists inside the map. Among equally
/// short routes the one hugging the straight line wins, then the earliest
/// expanded in [`Direction::ALL`] order.
#[must_use]
pub fn find_path<M: MapView + ?Sized>(map: &M, start: Point, goal: Point) -> Vec<Point> {
    find_path_avoiding(map, start, goal, &[])
}

/// Plans a route like [`find_path`] while treating `avoid` as impassable.
#[must_use]
pub fn find_path_avoiding<M: MapView + ?Sized>(
    map: &M,
    start: Point,
    goal: Point,
    avoid: &[Point],
) -> Vec<Point> {
    if start == goal || !map.can_enter_route_plan(goal) || avoid.contains(&goal) {
        return Vec::new();
    }

    let grid = map.grid();
    let Some(start_index) = grid.index(map.to_local(start)) else {
        return Vec::new();
    };
    let Some(goal_index) = grid.index(map.to_local(goal)) else {
        return Vec::new();
    };

    let cell_count = usize::try_from(u64::from(grid.width()) * u64::from(grid.height()))
        .unwrap_or(0);
    let mut cost = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<usize>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut open = BinaryHeap::new();
    let mut sequence = 0u64;

    cost[start_index] = 0;
    let estimate = start.chebyshev_distance(goal);
    open.push(Reverse((
        estimate,
        estimate,
        straightness(start, goal),
        sequence,
        start_index,
    )));

    while let Some(Reverse((_, _, _, _, index))) = open.pop() {
        if index == goal_index {
            return reconstruct(map, &came_from, start_index, goal_index);
        }

        if closed[index] {
            continue;
        }
        closed[index] = true;

        let Some(local) = grid.point(index) else {
            continue;
        };
        let current = map.to_world(local);
        let next_cost = cost[index].saturating_add(1);

        for direction in Direction::ALL {
            let neighbor = current + direction;
            if avoid.contains(&neighbor) || !map.can_enter_route_plan(neighbor) {
                continue;
            }

            let Some(neighbor_index) = grid.index(map.to_local(neighbor)) else {
                continue;
            };
            if closed[neighbor_index] || next_cost >= cost[neighbor_index] {
                continue;
            }

            cost[neighbor_index] = next_cost;
            came_from[neighbor_index] = Some(index);
            sequence += 1;
            let remaining = neighbor.chebyshev_distance(goal);
            open.push(Reverse((
                next_cost.saturating_add(remaining),
                remaining,
                straightness(neighbor, goal),
                sequence,
                neighbor_index,
            )));
        }
    }

    Vec::new()
}

/// Squared straight-line distance, preferring straight runs among equally short routes.
fn straightness(from: Point, to: Point) -> u64 {
    let dx = u64::from(from.x().abs_diff(to.x()));
    let dy = u64::from(from.y().abs_diff(to.y()));
    dx * dx + dy * dy
}

fn reconstruct<M: MapView + ?Sized>(
    map: &M,
    came_from: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Vec<Point> {
    let grid = map.grid();
    let mut path = Vec::new();
    let mut cursor = goal_index;

    while cursor != start_index {
        let Some(local) = grid.point(cursor) else {
            return Vec::new();
        };
        path.push(map.to_world(local));

        match came_from[cursor] {
            Some(previous) => cursor = previous,
            None => return Vec::new(),
        }
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::OccupancyGrid, visible::VisibleMap};
    use warbots_core::{Tag, TagSet, Terrain, VisibleWindow};

    fn dirt() -> TagSet {
        TagSet::only(Tag::Terrain(Terrain::Dirt))
    }

    fn open_window(width: u32, height: u32, origin: Point) -> VisibleWindow {
        let cells = vec![dirt(); (width * height) as usize];
        VisibleWindow::new(origin, origin, width, height, cells).expect("matching cells")
    }

    fn walled_window(width: u32, height: u32, wall_x: i32) -> VisibleWindow {
        let mut grid = OccupancyGrid::filled(width, height, dirt());
        for y in 0..height as i32 {
            grid.insert(Point::new(wall_x, y), Tag::Terrain(Terrain::Wall))
                .expect("in bounds");
        }
        let cells = grid.iter().map(|(_, value)| value).collect();
        VisibleWindow::new(Point::new(0, 0), Point::new(0, 0), width, height, cells)
            .expect("matching cells")
    }

    fn assert_connected(start: Point, path: &[Point]) {
        let mut previous = start;
        for step in path {
            assert_eq!(previous.chebyshev_distance(*step), 1, "{previous} -> {step}");
            previous = *step;
        }
    }

    #[test]
    fn diagonal_route_across_open_ground_takes_five_steps() {
        let map = VisibleMap::new(open_window(10, 10, Point::new(0, 0)));
        let path = find_path(&map, Point::new(0, 0), Point::new(5, 5));
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&Point::new(5, 5)));
        assert_connected(Point::new(0, 0), &path);
    }

    #[test]
    fn route_is_empty_when_start_equals_goal() {
        let map = VisibleMap::new(open_window(4, 4, Point::new(0, 0)));
        assert!(find_path(&map, Point::new(2, 2), Point::new(2, 2)).is_empty());
    }

    #[test]
    fn route_is_empty_when_a_wall_splits_the_window() {
        let map = VisibleMap::new(walled_window(8, 6, 4));
        assert!(find_path(&map, Point::new(1, 1), Point::new(6, 4)).is_empty());
    }

    #[test]
    fn route_is_empty_when_the_goal_leaves_the_window() {
        let map = VisibleMap::new(open_window(5, 5, Point::new(0, 0)));
        assert!(find_path(&map, Point::new(1, 1), Point::new(9, 9)).is_empty());
    }

    #[test]
    fn routes_work_in_world_coordinates_of_an_offset_window() {
        let origin = Point::new(40, 30);
        let map = VisibleMap::new(open_window(9, 9, origin));
        let start = Point::new(41, 38);
        let goal = Point::new(48, 31);
        let path = find_path(&map, start, goal);
        assert_eq!(path.len(), 7);
        assert_eq!(path.last(), Some(&goal));
        assert_connected(start, &path);
    }

    #[test]
    fn avoided_cells_are_routed_around() {
        let map = VisibleMap::new(open_window(6, 3, Point::new(0, 0)));
        let start = Point::new(0, 1);
        let goal = Point::new(4, 1);
        let blocked = Point::new(1, 1);
        let path = find_path_avoiding(&map, start, goal, &[blocked]);
        assert!(!path.contains(&blocked));
        assert_eq!(path.len(), 4);
        assert_connected(start, &path);
    }

    #[test]
    fn routes_detour_through_a_gap_in_the_wall() {
        let mut grid = OccupancyGrid::filled(7, 7, dirt());
        for y in 0..6 {
            grid.insert(Point::new(3, y), Tag::Terrain(Terrain::Water))
                .expect("in bounds");
        }
        let cells = grid.iter().map(|(_, value)| value).collect();
        let window = VisibleWindow::new(Point::new(0, 0), Point::new(0, 0), 7, 7, cells)
            .expect("matching cells");
        let map = VisibleMap::new(window);

        let start = Point::new(0, 0);
        let goal = Point::new(6, 0);
        let path = find_path(&map, start, goal);
        assert!(path.contains(&Point::new(3, 6)));
        assert_eq!(path.last(), Some(&goal));
        assert_connected(start, &path);
    }

    #[test]
    fn straight_routes_stay_on_the_line() {
        let map = VisibleMap::new(open_window(9, 9, Point::new(0, 0)));
        let path = find_path(&map, Point::new(1, 4), Point::new(6, 4));
        assert_eq!(
            path,
            (2..=6).map(|x| Point::new(x, 4)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn planning_is_deterministic() {
        let map = VisibleMap::new(open_window(12, 12, Point::new(0, 0)));
        let first = find_path(&map, Point::new(0, 11), Point::new(11, 3));
        let second = find_path(&map, Point::new(0, 11), Point::new(11, 3));
        assert_eq!(first, second);
    }
}
