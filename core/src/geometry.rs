//! Integer grid coordinates, offsets and the eight compass directions.

use std::{
    fmt,
    ops::{Add, Neg, Sub},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Location of a single grid cell.
///
/// Points are expressed in world coordinates unless a visible map explicitly
/// translates them. The `y` axis grows toward the south edge of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    /// Creates a new point from its column and row.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the point.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the point.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Point one step away in the provided direction.
    #[must_use]
    pub const fn plus_direction(self, direction: Direction) -> Self {
        self.plus_vector(direction.unit_vector())
    }

    /// Point one step away against the provided direction.
    #[must_use]
    pub const fn minus_direction(self, direction: Direction) -> Self {
        self.minus_vector(direction.unit_vector())
    }

    /// Translates the point by a raw offset.
    #[must_use]
    pub const fn plus_vector(self, offset: Offset) -> Self {
        Self::new(self.x + offset.dx, self.y + offset.dy)
    }

    /// Translates the point by the negated offset.
    #[must_use]
    pub const fn minus_vector(self, offset: Offset) -> Self {
        Self::new(self.x - offset.dx, self.y - offset.dy)
    }

    /// Number of king moves separating two points.
    #[must_use]
    pub fn chebyshev_distance(self, other: Point) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Straight-line distance between two points.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }

    /// Compass direction of the normalized displacement toward `other`.
    #[must_use]
    pub fn direction_to(self, other: Point) -> Option<Direction> {
        Direction::between(self, other)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", self.x, self.y)
    }
}

impl Add<Offset> for Point {
    type Output = Point;

    fn add(self, rhs: Offset) -> Self::Output {
        self.plus_vector(rhs)
    }
}

impl Sub<Offset> for Point {
    type Output = Point;

    fn sub(self, rhs: Offset) -> Self::Output {
        self.minus_vector(rhs)
    }
}

impl Add<Direction> for Point {
    type Output = Point;

    fn add(self, rhs: Direction) -> Self::Output {
        self.plus_direction(rhs)
    }
}

impl Sub<Direction> for Point {
    type Output = Point;

    fn sub(self, rhs: Direction) -> Self::Output {
        self.minus_direction(rhs)
    }
}

impl Sub for Point {
    type Output = Offset;

    fn sub(self, rhs: Point) -> Self::Output {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Raw displacement between two points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    dx: i32,
    dy: i32,
}

impl Offset {
    /// Creates a new offset from its horizontal and vertical components.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Horizontal component.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Vertical component.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }

    /// Multiplies both components by `scalar`.
    #[must_use]
    pub const fn scaled(self, scalar: i32) -> Self {
        Self::new(self.dx * scalar, self.dy * scalar)
    }

    /// Offset with each component reduced to its sign.
    #[must_use]
    pub const fn signum(self) -> Self {
        Self::new(self.dx.signum(), self.dy.signum())
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Self::Output {
        Offset::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Self::Output {
        Offset::new(-self.dx, -self.dy)
    }
}

/// The eight compass directions a unit can step or fire in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward decreasing rows.
    North,
    /// Toward increasing columns and decreasing rows.
    NorthEast,
    /// Toward increasing columns.
    East,
    /// Toward increasing columns and rows.
    SouthEast,
    /// Toward increasing rows.
    South,
    /// Toward decreasing columns and increasing rows.
    SouthWest,
    /// Toward decreasing columns.
    West,
    /// Toward decreasing columns and rows.
    NorthWest,
}

impl Direction {
    /// Every direction in clockwise order starting at north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Unit displacement of a single step in this direction.
    #[must_use]
    pub const fn unit_vector(self) -> Offset {
        match self {
            Self::North => Offset::new(0, -1),
            Self::NorthEast => Offset::new(1, -1),
            Self::East => Offset::new(1, 0),
            Self::SouthEast => Offset::new(1, 1),
            Self::South => Offset::new(0, 1),
            Self::SouthWest => Offset::new(-1, 1),
            Self::West => Offset::new(-1, 0),
            Self::NorthWest => Offset::new(-1, -1),
        }
    }

    /// Displacement of `scalar` steps in this direction.
    #[must_use]
    pub const fn scaled_vector(self, scalar: i32) -> Offset {
        self.unit_vector().scaled(scalar)
    }

    /// Looks up the direction whose unit vector equals `offset`.
    #[must_use]
    pub fn from_unit_vector(offset: Offset) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.unit_vector() == offset)
    }

    /// Direction of the normalized displacement from `from` to `to`.
    ///
    /// Returns `None` when both points coincide.
    #[must_use]
    pub fn between(from: Point, to: Point) -> Option<Self> {
        Self::from_unit_vector((to - from).signum())
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::SouthEast,
        }
    }

    /// Samples a direction uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}
