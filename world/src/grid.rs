//! Dense tag storage backing both map flavours.

use thiserror::Error;
use warbots_core::{Point, Tag, TagSet, VisibleWindow};

/// Errors raised when writing to a grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The point lies outside the grid.
    #[error("{point} lies outside the {width}x{height} grid")]
    OutOfBounds {
        /// Rejected grid-local point.
        point: Point,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// An imported slice does not match the requested dimensions.
    #[error("slice of {actual} cells does not fill a {width}x{height} grid")]
    SliceMismatch {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Number of cells supplied.
        actual: usize,
    },
}

/// Rectangular array of [`TagSet`] cells addressed by grid-local points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<TagSet>,
}

impl OccupancyGrid {
    /// Creates a grid with every cell empty.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TagSet::EMPTY)
    }

    /// Creates a grid with every cell holding `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: TagSet) -> Self {
        let count = cell_count(width, height);
        Self {
            width,
            height,
            cells: vec![value; count],
        }
    }

    /// Builds a grid from a row-major slice of cells.
    pub fn import(width: u32, height: u32, cells: Vec<TagSet>) -> Result<Self, GridError> {
        if cells.len() != cell_count(width, height) {
            return Err(GridError::SliceMismatch {
                width,
                height,
                actual: cells.len(),
            });
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Adopts the already validated cells of a visible window.
    pub(crate) fn from_window(window: VisibleWindow) -> Self {
        let width = window.width();
        let height = window.height();
        Self {
            width,
            height,
            cells: window.into_cells(),
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether `point` addresses a cell of the grid.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.index(point).is_some()
    }

    /// Row-major index of `point`, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, point: Point) -> Option<usize> {
        let x = u32::try_from(point.x()).ok()?;
        let y = u32::try_from(point.y()).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }

        usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()
    }

    /// Grid-local point stored at `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Point> {
        if index >= self.cells.len() || self.width == 0 {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        let x = i32::try_from(index % width).ok()?;
        let y = i32::try_from(index / width).ok()?;
        Some(Point::new(x, y))
    }

    /// Cell contents, empty when `point` lies outside the grid.
    #[must_use]
    pub fn get(&self, point: Point) -> TagSet {
        self.index(point)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(TagSet::EMPTY)
    }

    /// Overwrites the contents of a cell.
    pub fn set(&mut self, point: Point, value: TagSet) -> Result<(), GridError> {
        let index = self.index(point).ok_or(GridError::OutOfBounds {
            point,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Adds `tag` to a cell.
    pub fn insert(&mut self, point: Point, tag: Tag) -> Result<(), GridError> {
        let value = self.get(point).with(tag);
        self.set(point, value)
    }

    /// Removes `tag` from a cell.
    pub fn remove(&mut self, point: Point, tag: Tag) -> Result<(), GridError> {
        let value = self.get(point).without(tag);
        self.set(point, value)
    }

    /// Copies the inclusive rectangle `min..=max` out in row-major order.
    ///
    /// Both corners must already lie inside the grid.
    pub fn slice(&self, min: Point, max: Point) -> Result<Vec<TagSet>, GridError> {
        for corner in [min, max] {
            if !self.contains(corner) {
                return Err(GridError::OutOfBounds {
                    point: corner,
                    width: self.width,
                    height: self.height,
                });
            }
        }

        let mut cells = Vec::new();
        for y in min.y()..=max.y() {
            for x in min.x()..=max.x() {
                cells.push(self.get(Point::new(x, y)));
            }
        }
        Ok(cells)
    }

    /// Iterates over every grid-local point with its contents, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (Point, TagSet)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, value)| self.point(index).map(|point| (point, *value)))
    }
}

fn cell_count(width: u32, height: u32) -> usize {
    usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbots_core::Terrain;

    #[test]
    fn reads_outside_the_grid_are_empty() {
        let grid = OccupancyGrid::filled(4, 3, TagSet::only(Tag::Terrain(Terrain::Dirt)));
        assert!(grid.get(Point::new(-1, 0)).is_empty());
        assert!(grid.get(Point::new(4, 0)).is_empty());
        assert!(grid.get(Point::new(0, 3)).is_empty());
        assert!(!grid.get(Point::new(3, 2)).is_empty());
    }

    #[test]
    fn writes_outside_the_grid_are_rejected() {
        let mut grid = OccupancyGrid::new(4, 3);
        let result = grid.set(Point::new(4, 1), TagSet::EMPTY);
        assert_eq!(
            result,
            Err(GridError::OutOfBounds {
                point: Point::new(4, 1),
                width: 4,
                height: 3,
            })
        );
    }

    #[test]
    fn import_rejects_a_short_slice() {
        let result = OccupancyGrid::import(3, 3, vec![TagSet::EMPTY; 8]);
        assert!(matches!(result, Err(GridError::SliceMismatch { actual: 8, .. })));
    }

    #[test]
    fn slice_copies_rows_in_order() {
        let mut grid = OccupancyGrid::new(5, 5);
        grid.insert(Point::new(2, 1), Tag::Objective).expect("in bounds");
        grid.insert(Point::new(3, 2), Tag::RallyPoint).expect("in bounds");

        let cells = grid
            .slice(Point::new(2, 1), Point::new(3, 2))
            .expect("corners in bounds");
        assert_eq!(cells.len(), 4);
        assert!(cells[0].contains(Tag::Objective));
        assert!(cells[3].contains(Tag::RallyPoint));

        let imported = OccupancyGrid::import(2, 2, cells).expect("matching slice");
        assert!(imported.get(Point::new(0, 0)).contains(Tag::Objective));
        assert!(imported.get(Point::new(1, 1)).contains(Tag::RallyPoint));
    }

    #[test]
    fn index_and_point_agree() {
        let grid = OccupancyGrid::new(7, 4);
        let point = Point::new(5, 3);
        let index = grid.index(point).expect("in bounds");
        assert_eq!(grid.point(index), Some(point));
    }
}
