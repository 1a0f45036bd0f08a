#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mouse controller that explores a maze through a [`Protocol`].
//!
//! The [`Mouse`] owns the [`Maze`] it is learning and the protocol used to
//! sense walls and move. Its pose only changes after the protocol has
//! acknowledged the corresponding physical action, so the controller's view
//! never runs ahead of the mouse. The run phases built on top of these
//! primitives live in the `phases` module.

use std::collections::HashSet;

use micromouse_core::{
    CellCoord, Color, Direction, MoveOutcome, Protocol, ProtocolError, RelativeDirection,
};
use micromouse_maze::{DistanceField, Maze, MazeError};
use thiserror::Error;

mod phases;

pub use phases::{straight_runs, StraightRun};

/// Default cap on the decisions a single phase may take.
pub const DEFAULT_STEP_LIMIT: u32 = 10_000;

/// Failures raised while driving the mouse.
#[derive(Debug, Error)]
pub enum MouseError {
    /// The protocol reported a collision while moving.
    #[error("mouse crashed at {at} while heading {heading:?}")]
    Crashed {
        /// Cell the move started from.
        at: CellCoord,
        /// Heading during the move.
        heading: Direction,
    },
    /// A wall was sensed in front of the mouse before moving.
    #[error("wall between {from} and {to} blocks the move")]
    PathBlocked {
        /// Current cell.
        from: CellCoord,
        /// Cell the mouse tried to enter.
        to: CellCoord,
    },
    /// A turn target is not orthogonally adjacent to the mouse.
    #[error("{target} is not adjacent to {from}")]
    NotANeighbor {
        /// Current cell.
        from: CellCoord,
        /// Requested target.
        target: CellCoord,
    },
    /// Candidate selection received no cells to choose from.
    #[error("no candidate cells to move to from {at}")]
    NoCandidates {
        /// Current cell.
        at: CellCoord,
    },
    /// A replayed path does not begin where the mouse stands.
    #[error("path starts at {actual} but the mouse is at {expected}")]
    PathStartMismatch {
        /// Current cell of the mouse.
        expected: CellCoord,
        /// First cell of the path, if any.
        actual: PathStart,
    },
    /// A phase took more decisions than the configured limit.
    #[error("phase exceeded the limit of {limit} steps")]
    StepLimitExceeded {
        /// Configured limit.
        limit: u32,
    },
    /// A maze query or search failed.
    #[error(transparent)]
    Maze(#[from] MazeError),
    /// The protocol peer failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl MouseError {
    /// Whether the run may continue after this error.
    ///
    /// Only an exhausted path search qualifies: the mouse can keep exploring
    /// and search again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Maze(MazeError::SearchExhausted { .. }))
    }
}

/// First cell of a replayed path as reported by [`MouseError::PathStartMismatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStart {
    /// The path was empty.
    Empty,
    /// The path started at this cell.
    Cell(CellCoord),
}

impl std::fmt::Display for PathStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("nowhere (empty path)"),
            Self::Cell(cell) => write!(f, "{cell}"),
        }
    }
}

/// Tunables of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseConfig {
    /// Mirror distances, confirmed cells and paths on the simulator display.
    pub annotate: bool,
    /// Maximum number of decisions a single phase may take.
    pub step_limit: u32,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

/// Physical activity counted by the controller.
///
/// Each phase returns the activity it caused; [`Mouse::odometer`] holds the
/// running total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Cells travelled.
    pub cells_moved: u32,
    /// Forward move commands issued.
    pub move_commands: u32,
    /// Quarter turns performed.
    pub turns: u32,
}

impl PhaseReport {
    /// Activity accumulated since `earlier` was captured.
    #[must_use]
    pub const fn since(self, earlier: PhaseReport) -> PhaseReport {
        PhaseReport {
            cells_moved: self.cells_moved - earlier.cells_moved,
            move_commands: self.move_commands - earlier.move_commands,
            turns: self.turns - earlier.turns,
        }
    }
}

/// Controller state for a single mouse.
#[derive(Debug)]
pub struct Mouse<P> {
    protocol: P,
    maze: Maze,
    position: CellCoord,
    heading: Direction,
    visited: HashSet<CellCoord>,
    exploring: bool,
    config: MouseConfig,
    odometer: PhaseReport,
}

impl<P: Protocol> Mouse<P> {
    /// Places the mouse at `start` facing `heading` and senses the walls
    /// around it.
    pub fn new(
        protocol: P,
        maze: Maze,
        start: CellCoord,
        heading: Direction,
        config: MouseConfig,
    ) -> Result<Self, MouseError> {
        if !maze.contains(start) {
            return Err(MazeError::OutOfBounds { cell: start }.into());
        }

        let mut mouse = Self {
            protocol,
            maze,
            position: start,
            heading,
            visited: HashSet::from([start]),
            exploring: true,
            config,
            odometer: PhaseReport::default(),
        };
        let _ = mouse.sense_walls()?;
        Ok(mouse)
    }

    /// Current cell.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Current heading.
    #[must_use]
    pub const fn heading(&self) -> Direction {
        self.heading
    }

    /// Maze knowledge gathered so far.
    #[must_use]
    pub const fn maze(&self) -> &Maze {
        &self.maze
    }

    /// Protocol driving the mouse.
    #[must_use]
    pub const fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Mutable access to the protocol, for reset polling and annotations
    /// outside the controller.
    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }

    /// Running total of the mouse's physical activity.
    #[must_use]
    pub const fn odometer(&self) -> PhaseReport {
        self.odometer
    }

    /// Whether moves currently confirm the cells they enter.
    #[must_use]
    pub const fn is_exploring(&self) -> bool {
        self.exploring
    }

    /// Whether the mouse occupied `cell` since the last restart.
    #[must_use]
    pub fn has_visited(&self, cell: CellCoord) -> bool {
        self.visited.contains(&cell)
    }

    /// Consumes the controller, returning the protocol and the learned maze.
    pub fn into_parts(self) -> (P, Maze) {
        (self.protocol, self.maze)
    }

    /// Re-seats the mouse after the peer was reset.
    ///
    /// Walls and confirmed cells survive; the visited set does not.
    pub fn restart(&mut self, start: CellCoord, heading: Direction) -> Result<(), MouseError> {
        if !self.maze.contains(start) {
            return Err(MazeError::OutOfBounds { cell: start }.into());
        }
        tracing::info!(%start, ?heading, "restarting mouse");
        self.position = start;
        self.heading = heading;
        self.visited.clear();
        let _ = self.visited.insert(start);
        self.exploring = true;
        Ok(())
    }

    /// Probes the front, left and right walls and records every wall found.
    ///
    /// Returns the absolute directions found walled.
    pub fn sense_walls(&mut self) -> Result<Vec<Direction>, MouseError> {
        let mut walls = Vec::new();
        for side in RelativeDirection::SENSED {
            if self.sense_side(side)? {
                walls.push(side.to_absolute(self.heading));
            }
        }
        tracing::debug!(position = %self.position, heading = ?self.heading, ?walls, "sensed walls");
        Ok(walls)
    }

    fn sense_side(&mut self, side: RelativeDirection) -> Result<bool, MouseError> {
        let walled = self.protocol.wall(side, None)?;
        if walled {
            let direction = side.to_absolute(self.heading);
            self.maze.set_wall(self.position, direction)?;
            self.protocol.set_wall(self.position, direction)?;
        }
        Ok(walled)
    }

    /// Cells the mouse may enter next according to current wall knowledge.
    ///
    /// Front, left and right are checked first. When all three are closed
    /// the mouse turns around, senses its new front and offers only that
    /// cell.
    pub fn reachable_neighbors(&mut self) -> Result<Vec<CellCoord>, MouseError> {
        self.reachable_cells(true)
    }

    /// Same as [`Mouse::reachable_neighbors`], but when `sense` is false the
    /// dead-end fallback trusts the maze instead of probing the new front.
    pub(crate) fn reachable_cells(&mut self, sense: bool) -> Result<Vec<CellCoord>, MouseError> {
        let neighbors = self.open_cells(&RelativeDirection::SENSED);
        if !neighbors.is_empty() {
            return Ok(neighbors);
        }

        tracing::debug!(position = %self.position, "dead end, turning around");
        self.turn_around()?;
        if sense {
            let _ = self.sense_side(RelativeDirection::Front)?;
        }
        Ok(self.open_cells(&[RelativeDirection::Front]))
    }

    fn open_cells(&self, sides: &[RelativeDirection]) -> Vec<CellCoord> {
        sides
            .iter()
            .map(|side| side.to_absolute(self.heading))
            .filter(|direction| self.maze.is_open(self.position, *direction))
            .filter_map(|direction| self.maze.neighbor(self.position, direction).ok())
            .collect()
    }

    /// Picks the most promising cell among `candidates`.
    ///
    /// Candidates are ranked by distance in `field` (unknown last), then
    /// unvisited before visited, then by the quarter turns needed to face
    /// them. Ties keep the earlier candidate.
    pub fn best_candidate(
        &self,
        candidates: &[CellCoord],
        field: DistanceField,
    ) -> Result<CellCoord, MouseError> {
        let mut best: Option<((u32, u8, u32), CellCoord)> = None;
        for &candidate in candidates {
            let distance = self.maze.distance(candidate, field)?.unwrap_or(u32::MAX);
            let visited = u8::from(self.visited.contains(&candidate));
            let key = (distance, visited, self.turns_to(candidate)?);
            if best.map_or(true, |(best_key, _)| key < best_key) {
                best = Some((key, candidate));
            }
        }

        best.map(|(_, cell)| cell).ok_or(MouseError::NoCandidates {
            at: self.position,
        })
    }

    /// Quarter turns needed to face the adjacent `target`.
    pub fn turns_to(&self, target: CellCoord) -> Result<u32, MouseError> {
        Ok(self.side_of(target)?.turns())
    }

    fn side_of(&self, target: CellCoord) -> Result<RelativeDirection, MouseError> {
        let direction =
            Direction::between(self.position, target).ok_or(MouseError::NotANeighbor {
                from: self.position,
                target,
            })?;
        Ok(RelativeDirection::from_absolute(self.heading, direction))
    }

    /// Turns 90 degrees counter-clockwise.
    pub fn turn_left(&mut self) -> Result<(), MouseError> {
        self.protocol.turn_left()?;
        self.heading = self.heading.minus_90();
        self.odometer.turns += 1;
        Ok(())
    }

    /// Turns 90 degrees clockwise.
    pub fn turn_right(&mut self) -> Result<(), MouseError> {
        self.protocol.turn_right()?;
        self.heading = self.heading.plus_90();
        self.odometer.turns += 1;
        Ok(())
    }

    /// Turns 180 degrees as two left turns.
    pub fn turn_around(&mut self) -> Result<(), MouseError> {
        self.turn_left()?;
        self.turn_left()
    }

    /// Turns until the mouse faces the adjacent `target`.
    pub fn turn_towards(&mut self, target: CellCoord) -> Result<(), MouseError> {
        let side = match self.side_of(target) {
            Ok(side) => side,
            Err(error) => {
                if self.maze.contains(target) {
                    self.annotate_color(target, Color::Red)?;
                }
                return Err(error);
            }
        };

        match side {
            RelativeDirection::Front => Ok(()),
            RelativeDirection::Left => self.turn_left(),
            RelativeDirection::Right => self.turn_right(),
            RelativeDirection::Back => self.turn_around(),
        }
    }

    /// Moves `cells` cells straight ahead with a single protocol command.
    ///
    /// Only the wall directly in front is probed before moving. While
    /// exploring, every cell entered is confirmed.
    pub fn move_forward(&mut self, cells: u32) -> Result<(), MouseError> {
        if cells == 0 {
            return Ok(());
        }

        let ahead = self.maze.neighbor(self.position, self.heading)?;
        if self.protocol.wall(RelativeDirection::Front, None)? {
            self.maze.set_wall(self.position, self.heading)?;
            self.annotate_color(ahead, Color::Red)?;
            return Err(MouseError::PathBlocked {
                from: self.position,
                to: ahead,
            });
        }

        let distance = (cells > 1).then_some(cells);
        if self.protocol.move_forward(distance)? == MoveOutcome::Crashed {
            return Err(MouseError::Crashed {
                at: self.position,
                heading: self.heading,
            });
        }
        self.odometer.move_commands += 1;

        for _ in 0..cells {
            let next = self.maze.neighbor(self.position, self.heading)?;
            self.position = next;
            let _ = self.visited.insert(next);
            self.odometer.cells_moved += 1;
            if self.exploring {
                self.mark_confirmed(next)?;
            }
        }
        Ok(())
    }

    fn mark_confirmed(&mut self, cell: CellCoord) -> Result<(), MouseError> {
        if self.maze.confirm(cell)? {
            self.annotate_color(cell, Color::Blue)?;
        }
        Ok(())
    }

    fn annotate_color(&mut self, cell: CellCoord, color: Color) -> Result<(), MouseError> {
        if self.config.annotate {
            self.protocol.set_color(cell, color)?;
        }
        Ok(())
    }

    fn annotate_distances(&mut self, field: DistanceField) -> Result<(), MouseError> {
        if !self.config.annotate {
            return Ok(());
        }
        self.protocol.clear_all_text()?;
        for cell in self.maze.cells() {
            if let Some(distance) = cell.distance(field) {
                self.protocol.set_text(cell.position(), &distance.to_string())?;
            }
        }
        Ok(())
    }
}
