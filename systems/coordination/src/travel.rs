//! Step-by-step travel toward a target through successive visible windows.

use std::collections::VecDeque;

use warbots_core::{doctrine::TRAVEL_TURN_BUDGET, Point};
use warbots_world::{find_path_avoiding, MapView, VisibleMap};

/// Route a unit is following toward a world target.
///
/// Targets outside the current window are approached through the closest
/// boundary cell; the route is replanned whenever the intermediate goal
/// shifts, the last move did not land, or the next step became blocked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Travel {
    target: Point,
    goal: Option<Point>,
    path: VecDeque<Point>,
    expected: Option<Point>,
    turns: u32,
}

impl Travel {
    pub(crate) fn new(target: Point) -> Self {
        Self {
            target,
            goal: None,
            path: VecDeque::new(),
            expected: None,
            turns: 0,
        }
    }

    pub(crate) fn target(&self) -> Point {
        self.target
    }

    /// Reports whether the unit is at the target or as close as it will get.
    ///
    /// A unit adjacent to a target somebody else stands on counts as arrived,
    /// as does a unit that spent [`TRAVEL_TURN_BUDGET`] turns on the way.
    pub(crate) fn arrived(&self, map: &VisibleMap) -> bool {
        let location = map.location();
        if location == self.target {
            return true;
        }
        if self.turns >= TRAVEL_TURN_BUDGET {
            tracing::warn!(target = %self.target, %location, "travel budget spent");
            return true;
        }
        if !map.on_map(self.target) {
            return false;
        }
        if location.chebyshev_distance(self.target) == 1 && map.is_occupied(self.target) {
            return true;
        }
        !map.is_navigable(self.target) && map.nearest_navigable(self.target) == Some(location)
    }

    /// Next cell to step into, or `None` when the unit should hold this turn.
    pub(crate) fn next_step(&mut self, map: &VisibleMap) -> Option<Point> {
        self.turns = self.turns.saturating_add(1);
        let location = map.location();
        let goal = self.goal_within(map)?;
        if goal == location {
            return None;
        }

        let drifted = self.expected.is_some_and(|expected| expected != location);
        if drifted || self.goal != Some(goal) || self.path.is_empty() {
            self.replan(map, location, goal, &[]);
        }

        let next = *self.path.front()?;
        if !map.can_enter(next) {
            tracing::debug!(%location, blocked = %next, "next step blocked, replanning");
            self.replan(map, location, goal, &[next]);
        }

        let next = self.path.pop_front()?;
        if !map.can_enter(next) {
            self.path.clear();
            self.expected = None;
            return None;
        }

        self.expected = Some(next);
        Some(next)
    }

    fn goal_within(&self, map: &VisibleMap) -> Option<Point> {
        if !map.on_map(self.target) {
            return map.find_closest_boundary_point(self.target);
        }
        if map.is_navigable(self.target) {
            return Some(self.target);
        }
        map.nearest_navigable(self.target)
    }

    fn replan(&mut self, map: &VisibleMap, location: Point, goal: Point, avoid: &[Point]) {
        self.goal = Some(goal);
        self.expected = None;
        self.path = find_path_avoiding(map, location, goal, avoid).into();
        if self.path.is_empty() && avoid.is_empty() {
            tracing::debug!(%location, %goal, "no route inside the window");
        }
    }
}
