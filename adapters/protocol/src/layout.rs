//! Ground-truth wall layouts for the in-memory simulator.

use std::fmt;

use micromouse_core::{CellCoord, Direction};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Failures raised while building a [`WallLayout`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// A layout needs at least one cell.
    #[error("layout dimensions {width}x{height} contain no cells")]
    EmptyMaze {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The coordinate lies outside the layout.
    #[error("cell {cell} lies outside the layout")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
    },
}

/// Complete and symmetric wall table of a rectangular maze.
///
/// The perimeter is always walled. Interior walls are stored on both sides
/// of every edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WallLayout {
    width: u32,
    height: u32,
    walls: Vec<[bool; 4]>,
}

impl WallLayout {
    /// Layout whose only walls form the perimeter.
    pub fn open(width: u32, height: u32) -> Result<Self, LayoutError> {
        let mut layout = Self::filled(width, height, false)?;
        for y in 0..height {
            for x in 0..width {
                let index = layout.offset(x, y);
                let walls = &mut layout.walls[index];
                walls[Direction::West.index()] = x == 0;
                walls[Direction::East.index()] = x + 1 == width;
                walls[Direction::South.index()] = y == 0;
                walls[Direction::North.index()] = y + 1 == height;
            }
        }
        Ok(layout)
    }

    /// Layout with every edge walled, each cell sealed off.
    pub fn closed(width: u32, height: u32) -> Result<Self, LayoutError> {
        Self::filled(width, height, true)
    }

    fn filled(width: u32, height: u32, walled: bool) -> Result<Self, LayoutError> {
        let cell_count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        if cell_count == 0 {
            return Err(LayoutError::EmptyMaze { width, height });
        }
        Ok(Self {
            width,
            height,
            walls: vec![[walled; 4]; cell_count],
        })
    }

    /// Perfect maze carved by a seeded depth-first backtracker.
    ///
    /// Every cell is reachable from every other along exactly one route.
    /// The same seed always yields the same layout.
    pub fn generate(width: u32, height: u32, seed: u64) -> Result<Self, LayoutError> {
        let mut layout = Self::closed(width, height)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut carved = vec![false; layout.walls.len()];
        let origin = CellCoord::new(0, 0);
        carved[layout.offset(0, 0)] = true;
        let mut stack = vec![origin];

        while let Some(&cell) = stack.last() {
            let mut unvisited: Vec<(Direction, CellCoord)> = Direction::ALL
                .into_iter()
                .filter_map(|direction| {
                    let next = layout.neighbor(cell, direction)?;
                    (!carved[layout.offset(next.x(), next.y())]).then_some((direction, next))
                })
                .collect();
            unvisited.shuffle(&mut rng);

            match unvisited.first() {
                Some(&(direction, next)) => {
                    layout.write_wall(cell, direction, false);
                    carved[layout.offset(next.x(), next.y())] = true;
                    stack.push(next);
                }
                None => {
                    let _ = stack.pop();
                }
            }
        }

        tracing::debug!(width, height, seed, "generated maze layout");
        Ok(layout)
    }

    /// Knocks down up to `count` random interior walls to create loops.
    ///
    /// Stops early once no interior wall remains.
    #[must_use]
    pub fn with_loops(mut self, count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..count {
            let interior: Vec<(CellCoord, Direction)> = self
                .coords()
                .flat_map(|cell| {
                    [Direction::North, Direction::East]
                        .into_iter()
                        .map(move |direction| (cell, direction))
                })
                .filter(|&(cell, direction)| {
                    self.neighbor(cell, direction).is_some() && self.has_wall(cell, direction)
                })
                .collect();
            if interior.is_empty() {
                break;
            }
            let (cell, direction) = interior[rng.gen_range(0..interior.len())];
            self.write_wall(cell, direction, false);
        }
        self
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the coordinate lies inside the layout.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// Whether a wall blocks leaving `cell` towards `direction`.
    ///
    /// Cells outside the layout are treated as solid.
    #[must_use]
    pub fn has_wall(&self, cell: CellCoord, direction: Direction) -> bool {
        if !self.contains(cell) {
            return true;
        }
        self.walls[self.offset(cell.x(), cell.y())][direction.index()]
    }

    /// Adds a wall on both sides of an edge.
    pub fn add_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), LayoutError> {
        self.require(cell)?;
        self.write_wall(cell, direction, true);
        Ok(())
    }

    /// Removes an interior wall from both sides of an edge.
    ///
    /// Perimeter walls are kept.
    pub fn remove_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), LayoutError> {
        self.require(cell)?;
        if self.neighbor(cell, direction).is_some() {
            self.write_wall(cell, direction, false);
        }
        Ok(())
    }

    /// Builder form of [`WallLayout::add_wall`].
    pub fn with_wall(mut self, cell: CellCoord, direction: Direction) -> Result<Self, LayoutError> {
        self.add_wall(cell, direction)?;
        Ok(self)
    }

    /// In-bounds neighbor of `cell` towards `direction`, walls ignored.
    #[must_use]
    pub fn neighbor(&self, cell: CellCoord, direction: Direction) -> Option<CellCoord> {
        direction.step(cell).filter(|next| self.contains(*next))
    }

    /// Every coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| CellCoord::new(x, y)))
    }

    fn require(&self, cell: CellCoord) -> Result<(), LayoutError> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(LayoutError::OutOfBounds { cell })
        }
    }

    fn write_wall(&mut self, cell: CellCoord, direction: Direction, present: bool) {
        let index = self.offset(cell.x(), cell.y());
        self.walls[index][direction.index()] = present;
        if let Some(next) = self.neighbor(cell, direction) {
            let index = self.offset(next.x(), next.y());
            self.walls[index][direction.reverse().index()] = present;
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

/// Renders the layout in the mms `.map` format, north row first.
impl fmt::Display for WallLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.height).rev() {
            f.write_str("+")?;
            for x in 0..self.width {
                let segment = if self.has_wall(CellCoord::new(x, y), Direction::North) {
                    "---"
                } else {
                    "   "
                };
                write!(f, "{segment}+")?;
            }
            writeln!(f)?;

            for x in 0..self.width {
                let post = if self.has_wall(CellCoord::new(x, y), Direction::West) {
                    '|'
                } else {
                    ' '
                };
                write!(f, "{post}   ")?;
            }
            let east = if self.has_wall(CellCoord::new(self.width - 1, y), Direction::East) {
                '|'
            } else {
                ' '
            };
            writeln!(f, "{east}")?;
        }

        f.write_str("+")?;
        for x in 0..self.width {
            let segment = if self.has_wall(CellCoord::new(x, 0), Direction::South) {
                "---"
            } else {
                "   "
            };
            write!(f, "{segment}+")?;
        }
        writeln!(f)
    }
}
