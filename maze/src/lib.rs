#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative maze model for the micromouse.
//!
//! The [`Maze`] owns every [`Cell`] and is the only place wall knowledge,
//! distance fields and confirmation flags are stored. Other crates refer to
//! cells through [`CellCoord`] values and go through the accessor methods
//! below, which keeps wall symmetry and bounds checking in one place.

use std::fmt;

use micromouse_core::{CellCoord, Direction};
use thiserror::Error;

mod flood;
mod pathfinding;

pub use pathfinding::{count_corners, FastestPath, PathCost};

/// Failures raised by maze lookups and searches.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    /// A maze needs at least one cell.
    #[error("maze dimensions {width}x{height} contain no cells")]
    EmptyMaze {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The coordinate lies outside the maze.
    #[error("cell {cell} lies outside the maze")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
    },
    /// Stepping from `from` towards `direction` leaves the maze.
    #[error("no cell {direction:?} of {from}")]
    EdgeOfMaze {
        /// Cell the step started from.
        from: CellCoord,
        /// Direction of the attempted step.
        direction: Direction,
    },
    /// No route of confirmed cells connects the endpoints yet.
    #[error("no confirmed route from {start} to {goal}")]
    SearchExhausted {
        /// Requested start cell.
        start: CellCoord,
        /// Requested goal cell.
        goal: CellCoord,
    },
}

/// Selects which of the two per-cell distance fields is read or written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistanceField {
    /// Hop count towards the goal cell.
    Goal,
    /// Hop count towards the start cell.
    Start,
}

/// A single maze square and everything the mouse learned about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    position: CellCoord,
    walls: [bool; 4],
    distance_to_goal: Option<u32>,
    distance_to_start: Option<u32>,
    confirmed: bool,
}

impl Cell {
    fn new(position: CellCoord) -> Self {
        Self {
            position,
            walls: [false; 4],
            distance_to_goal: None,
            distance_to_start: None,
            confirmed: false,
        }
    }

    /// Coordinate of the cell.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Reports whether a wall is known on the provided side.
    #[must_use]
    pub const fn has_wall(&self, direction: Direction) -> bool {
        self.walls[direction.index()]
    }

    /// Known walls indexed by [`Direction::index`].
    #[must_use]
    pub const fn walls(&self) -> [bool; 4] {
        self.walls
    }

    /// Distance stored in the selected field, `None` when unknown.
    #[must_use]
    pub const fn distance(&self, field: DistanceField) -> Option<u32> {
        match field {
            DistanceField::Goal => self.distance_to_goal,
            DistanceField::Start => self.distance_to_start,
        }
    }

    /// Whether the mouse has physically occupied the cell while exploring.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    fn set_distance(&mut self, field: DistanceField, distance: Option<u32>) {
        match field {
            DistanceField::Goal => self.distance_to_goal = distance,
            DistanceField::Start => self.distance_to_start = distance,
        }
    }
}

/// Rectangular grid of cells with the perimeter walled in.
#[derive(Clone, Debug)]
pub struct Maze {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Maze {
    /// Creates a maze whose only known walls are the four outer edges.
    pub fn new(width: u32, height: u32) -> Result<Self, MazeError> {
        let cell_count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        if cell_count == 0 {
            return Err(MazeError::EmptyMaze { width, height });
        }

        let mut cells = Vec::with_capacity(cell_count);
        for y in 0..height {
            for x in 0..width {
                let mut cell = Cell::new(CellCoord::new(x, y));
                cell.walls[Direction::West.index()] = x == 0;
                cell.walls[Direction::East.index()] = x + 1 == width;
                cell.walls[Direction::South.index()] = y == 0;
                cell.walls[Direction::North.index()] = y + 1 == height;
                cells.push(cell);
            }
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Width of the maze in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the maze in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the coordinate lies inside the maze.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// All cells in row-major order, starting at the origin.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Looks up the cell stored at the provided coordinate.
    pub fn cell(&self, cell: CellCoord) -> Result<&Cell, MazeError> {
        self.index(cell)
            .map(|index| &self.cells[index])
            .ok_or(MazeError::OutOfBounds { cell })
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Result<&mut Cell, MazeError> {
        match self.index(cell) {
            Some(index) => Ok(&mut self.cells[index]),
            None => Err(MazeError::OutOfBounds { cell }),
        }
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let x = usize::try_from(cell.x()).ok()?;
        let y = usize::try_from(cell.y()).ok()?;
        y.checked_mul(width)?.checked_add(x)
    }

    /// Cell adjacent to `cell` in `direction`, ignoring walls.
    pub fn neighbor(&self, cell: CellCoord, direction: Direction) -> Result<CellCoord, MazeError> {
        if !self.contains(cell) {
            return Err(MazeError::OutOfBounds { cell });
        }
        direction
            .step(cell)
            .filter(|next| self.contains(*next))
            .ok_or(MazeError::EdgeOfMaze {
                from: cell,
                direction,
            })
    }

    /// Reports whether a wall is known between `cell` and its neighbor in `direction`.
    pub fn has_wall(&self, cell: CellCoord, direction: Direction) -> Result<bool, MazeError> {
        Ok(self.cell(cell)?.has_wall(direction))
    }

    /// Reports whether the mouse may pass from `cell` towards `direction`
    /// according to current knowledge.
    ///
    /// Coordinates outside the maze are never open.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord, direction: Direction) -> bool {
        match self.cell(cell) {
            Ok(current) => !current.has_wall(direction) && self.neighbor(cell, direction).is_ok(),
            Err(_) => false,
        }
    }

    /// Records a wall on both sides of the shared edge.
    pub fn set_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), MazeError> {
        self.write_wall(cell, direction, true)
    }

    /// Removes a wall from both sides of the shared edge.
    ///
    /// The perimeter is permanent; clearing an outer wall leaves it in place.
    pub fn clear_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), MazeError> {
        if self.neighbor(cell, direction).is_err() {
            if self.contains(cell) {
                tracing::warn!(%cell, ?direction, "ignoring request to clear a perimeter wall");
                return Ok(());
            }
            return Err(MazeError::OutOfBounds { cell });
        }
        self.write_wall(cell, direction, false)
    }

    fn write_wall(
        &mut self,
        cell: CellCoord,
        direction: Direction,
        present: bool,
    ) -> Result<(), MazeError> {
        self.cell_mut(cell)?.walls[direction.index()] = present;
        if let Ok(neighbor) = self.neighbor(cell, direction) {
            self.cell_mut(neighbor)?.walls[direction.reverse().index()] = present;
        }
        Ok(())
    }

    /// Adjacent cells reachable from `cell` without crossing a known wall.
    pub fn reachable_neighbors(&self, cell: CellCoord) -> Result<Vec<CellCoord>, MazeError> {
        if !self.contains(cell) {
            return Err(MazeError::OutOfBounds { cell });
        }
        Ok(Direction::ALL
            .into_iter()
            .filter(|direction| self.is_open(cell, *direction))
            .filter_map(|direction| self.neighbor(cell, direction).ok())
            .collect())
    }

    /// Distance stored for `cell` in the selected field.
    pub fn distance(&self, cell: CellCoord, field: DistanceField) -> Result<Option<u32>, MazeError> {
        Ok(self.cell(cell)?.distance(field))
    }

    /// Marks the cell as physically visited during exploration.
    ///
    /// Returns `true` when the cell was not confirmed before. Confirmation is
    /// never revoked.
    pub fn confirm(&mut self, cell: CellCoord) -> Result<bool, MazeError> {
        let target = self.cell_mut(cell)?;
        let newly_confirmed = !target.confirmed;
        target.confirmed = true;
        Ok(newly_confirmed)
    }

    /// Whether the mouse has confirmed the cell.
    pub fn is_confirmed(&self, cell: CellCoord) -> Result<bool, MazeError> {
        Ok(self.cell(cell)?.is_confirmed())
    }

    /// Text rendering of the selected distance field, north row first.
    #[must_use]
    pub fn render(&self, field: DistanceField) -> DistanceRender<'_> {
        DistanceRender { maze: self, field }
    }
}

/// Display adapter produced by [`Maze::render`].
#[derive(Clone, Copy, Debug)]
pub struct DistanceRender<'a> {
    maze: &'a Maze,
    field: DistanceField,
}

impl fmt::Display for DistanceRender<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.maze.height).rev() {
            for x in 0..self.maze.width {
                match self.maze.distance(CellCoord::new(x, y), self.field) {
                    Ok(Some(distance)) => write!(f, "{distance}\t")?,
                    _ => write!(f, "-\t")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_maze_walls_in_the_perimeter_only() {
        let maze = Maze::new(3, 2).expect("maze");

        let corner = maze.cell(CellCoord::new(0, 0)).expect("corner");
        assert!(corner.has_wall(Direction::South));
        assert!(corner.has_wall(Direction::West));
        assert!(!corner.has_wall(Direction::North));
        assert!(!corner.has_wall(Direction::East));

        let top_right = maze.cell(CellCoord::new(2, 1)).expect("top right");
        assert!(top_right.has_wall(Direction::North));
        assert!(top_right.has_wall(Direction::East));

        let middle_bottom = maze.cell(CellCoord::new(1, 0)).expect("middle");
        assert_eq!(middle_bottom.walls(), [false, false, true, false]);
    }

    #[test]
    fn single_cell_maze_is_fully_enclosed() {
        let maze = Maze::new(1, 1).expect("maze");
        let cell = maze.cell(CellCoord::new(0, 0)).expect("cell");
        assert_eq!(cell.walls(), [true; 4]);
        assert!(maze
            .reachable_neighbors(CellCoord::new(0, 0))
            .expect("in bounds")
            .is_empty());
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        assert_eq!(
            Maze::new(0, 4).unwrap_err(),
            MazeError::EmptyMaze {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn set_wall_writes_both_sides() {
        let mut maze = Maze::new(3, 3).expect("maze");
        maze.set_wall(CellCoord::new(1, 1), Direction::North)
            .expect("in bounds");

        assert!(maze
            .has_wall(CellCoord::new(1, 1), Direction::North)
            .expect("cell"));
        assert!(maze
            .has_wall(CellCoord::new(1, 2), Direction::South)
            .expect("neighbor"));
        assert!(!maze.is_open(CellCoord::new(1, 2), Direction::South));
    }

    #[test]
    fn clear_wall_opens_both_sides_but_keeps_perimeter() {
        let mut maze = Maze::new(2, 2).expect("maze");
        maze.set_wall(CellCoord::new(0, 0), Direction::East)
            .expect("set");
        maze.clear_wall(CellCoord::new(1, 0), Direction::West)
            .expect("clear");
        assert!(maze.is_open(CellCoord::new(0, 0), Direction::East));

        maze.clear_wall(CellCoord::new(0, 0), Direction::South)
            .expect("perimeter request is ignored");
        assert!(maze
            .has_wall(CellCoord::new(0, 0), Direction::South)
            .expect("cell"));
    }

    #[test]
    fn lookups_outside_the_maze_fail() {
        let maze = Maze::new(2, 2).expect("maze");
        let outside = CellCoord::new(2, 0);
        assert_eq!(
            maze.cell(outside).unwrap_err(),
            MazeError::OutOfBounds { cell: outside }
        );
        assert_eq!(
            maze.neighbor(CellCoord::new(1, 1), Direction::North)
                .unwrap_err(),
            MazeError::EdgeOfMaze {
                from: CellCoord::new(1, 1),
                direction: Direction::North,
            }
        );
        assert!(!maze.is_open(outside, Direction::West));
    }

    #[test]
    fn confirmation_is_monotonic() {
        let mut maze = Maze::new(2, 2).expect("maze");
        let cell = CellCoord::new(1, 1);
        assert!(maze.confirm(cell).expect("first"));
        assert!(!maze.confirm(cell).expect("second"));
        maze.set_wall(cell, Direction::West).expect("wall");
        let _ = maze
            .propagate_distances(CellCoord::new(0, 0), DistanceField::Goal)
            .expect("flood");
        assert!(maze.is_confirmed(cell).expect("cell"));
    }

    #[test]
    fn render_prints_north_row_first() {
        let mut maze = Maze::new(2, 2).expect("maze");
        let _ = maze
            .propagate_distances(CellCoord::new(0, 0), DistanceField::Goal)
            .expect("flood");
        let rendered = maze.render(DistanceField::Goal).to_string();
        assert_eq!(rendered, "1\t2\t\n0\t1\t\n");
        assert_eq!(
            maze.render(DistanceField::Start).to_string(),
            "-\t-\t\n-\t-\t\n"
        );
    }
}
