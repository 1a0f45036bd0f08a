#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the micromouse workspace.
//!
//! This crate defines the vocabulary that connects the maze model, the mouse
//! controller, and the adapters that talk to a simulator or to hardware.
//! Positions are expressed as [`CellCoord`] values, headings as [`Direction`]
//! values, and every physical interaction flows through the [`Protocol`]
//! trait so the controller never depends on a concrete transport.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a single maze cell expressed as x and y coordinates.
///
/// The origin sits in the south-west corner of the maze, `x` grows towards
/// the east and `y` grows towards the north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell, growing eastwards.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the cell, growing northwards.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal headings, ordered clockwise starting from north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards increasing `y`.
    North,
    /// Towards increasing `x`.
    East,
    /// Towards decreasing `y`.
    South,
    /// Towards decreasing `x`.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Position of the direction within the clockwise cycle.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Direction at the provided position of the clockwise cycle, wrapping modulo four.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Rotates the direction 90 degrees counter-clockwise.
    #[must_use]
    pub const fn minus_90(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Rotates the direction 90 degrees clockwise.
    #[must_use]
    pub const fn plus_90(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Rotates the direction by 180 degrees.
    #[must_use]
    pub const fn reverse(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// Adds the clockwise rotation encoded by `other` to this direction.
    ///
    /// North acts as the identity, east as a right turn, south as a reversal
    /// and west as a left turn.
    #[must_use]
    pub const fn compose(self, other: Direction) -> Self {
        Self::from_index(self.index() + other.index())
    }

    /// Unit displacement of a single step taken in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Cell reached by stepping once from `cell`, if the coordinate stays representable.
    ///
    /// Bounds of a concrete maze are not checked here.
    #[must_use]
    pub fn step(self, cell: CellCoord) -> Option<CellCoord> {
        match self {
            Self::North => cell.y().checked_add(1).map(|y| CellCoord::new(cell.x(), y)),
            Self::East => cell.x().checked_add(1).map(|x| CellCoord::new(x, cell.y())),
            Self::South => cell.y().checked_sub(1).map(|y| CellCoord::new(cell.x(), y)),
            Self::West => cell.x().checked_sub(1).map(|x| CellCoord::new(x, cell.y())),
        }
    }

    /// Direction leading from `from` to the adjacent cell `to`.
    ///
    /// Returns `None` when the cells are not orthogonally adjacent.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.step(from) == Some(to))
    }
}

/// Side of the mouse expressed relative to its current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelativeDirection {
    /// The side the mouse is facing.
    Front,
    /// A quarter turn clockwise from the heading.
    Right,
    /// Behind the mouse.
    Back,
    /// A quarter turn counter-clockwise from the heading.
    Left,
}

impl RelativeDirection {
    /// Sides probed by the wall sensors, in the order the controller reads them.
    pub const SENSED: [RelativeDirection; 3] = [
        RelativeDirection::Front,
        RelativeDirection::Left,
        RelativeDirection::Right,
    ];

    /// Rotation this side represents when composed with a heading.
    #[must_use]
    pub const fn as_rotation(self) -> Direction {
        match self {
            Self::Front => Direction::North,
            Self::Right => Direction::East,
            Self::Back => Direction::South,
            Self::Left => Direction::West,
        }
    }

    /// Absolute direction of this side for a mouse facing `heading`.
    #[must_use]
    pub const fn to_absolute(self, heading: Direction) -> Direction {
        heading.compose(self.as_rotation())
    }

    /// Side on which `direction` lies for a mouse facing `heading`.
    #[must_use]
    pub const fn from_absolute(heading: Direction, direction: Direction) -> Self {
        match (direction.index() + 4 - heading.index()) % 4 {
            0 => Self::Front,
            1 => Self::Right,
            2 => Self::Back,
            _ => Self::Left,
        }
    }

    /// Minimal number of quarter turns required to face this side.
    #[must_use]
    pub const fn turns(self) -> u32 {
        match self {
            Self::Front => 0,
            Self::Right | Self::Left => 1,
            Self::Back => 2,
        }
    }
}

/// Palette understood by the simulator's cell highlighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    /// Black.
    Black,
    /// Blue, used for confirmed cells.
    Blue,
    /// Gray.
    Gray,
    /// Cyan.
    Cyan,
    /// Green, used for the goal cell.
    Green,
    /// Orange.
    Orange,
    /// Red, used for rejected turn targets.
    Red,
    /// White.
    White,
    /// Yellow, used for the fastest path.
    Yellow,
    /// Dark blue.
    DarkBlue,
    /// Dark cyan.
    DarkCyan,
    /// Dark gray.
    DarkGray,
    /// Dark green.
    DarkGreen,
    /// Dark red.
    DarkRed,
    /// Dark yellow.
    DarkYellow,
}

impl Color {
    /// Every supported color.
    pub const ALL: [Color; 15] = [
        Color::Black,
        Color::Blue,
        Color::Gray,
        Color::Cyan,
        Color::Green,
        Color::Orange,
        Color::Red,
        Color::White,
        Color::Yellow,
        Color::DarkBlue,
        Color::DarkCyan,
        Color::DarkGray,
        Color::DarkGreen,
        Color::DarkRed,
        Color::DarkYellow,
    ];

    /// Single character code used on the wire.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Black => 'k',
            Self::Blue => 'b',
            Self::Gray => 'a',
            Self::Cyan => 'c',
            Self::Green => 'g',
            Self::Orange => 'o',
            Self::Red => 'r',
            Self::White => 'w',
            Self::Yellow => 'y',
            Self::DarkBlue => 'B',
            Self::DarkCyan => 'C',
            Self::DarkGray => 'A',
            Self::DarkGreen => 'G',
            Self::DarkRed => 'R',
            Self::DarkYellow => 'Y',
        }
    }

    /// Parses a wire color code.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.code() == code)
    }
}

/// Result of a forward move reported by the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The mouse completed the requested move.
    Moved,
    /// The mouse collided with a wall and did not complete the move.
    Crashed,
}

/// Failures raised while exchanging commands with a simulator or robot.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Reading from or writing to the underlying streams failed.
    #[error("protocol I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The peer answered with a line the command does not accept.
    #[error("unexpected response {response:?} to command {command:?}")]
    UnexpectedResponse {
        /// Command that was sent.
        command: String,
        /// Line received in reply.
        response: String,
    },
    /// The peer closed its output before replying.
    #[error("protocol peer disconnected")]
    Disconnected,
}

/// Request/response surface of the simulator or robot driving the mouse.
///
/// Every call is synchronous: it returns once the peer acknowledged the
/// command. Annotation calls only affect the peer's display.
pub trait Protocol {
    /// Width of the maze in cells.
    fn maze_width(&mut self) -> Result<u32, ProtocolError>;

    /// Height of the maze in cells.
    fn maze_height(&mut self) -> Result<u32, ProtocolError>;

    /// Maze dimensions as `(width, height)`.
    fn dimensions(&mut self) -> Result<(u32, u32), ProtocolError> {
        Ok((self.maze_width()?, self.maze_height()?))
    }

    /// Reports whether a wall lies on `side` of the mouse.
    ///
    /// `half_steps_away` probes further ahead when supported by the peer.
    fn wall(
        &mut self,
        side: RelativeDirection,
        half_steps_away: Option<u32>,
    ) -> Result<bool, ProtocolError>;

    /// Moves forward by `distance` cells, or a single cell when `None`.
    fn move_forward(&mut self, distance: Option<u32>) -> Result<MoveOutcome, ProtocolError>;

    /// Turns 90 degrees counter-clockwise in place.
    fn turn_left(&mut self) -> Result<(), ProtocolError>;

    /// Turns 90 degrees clockwise in place.
    fn turn_right(&mut self) -> Result<(), ProtocolError>;

    /// Marks a wall on the peer's display.
    fn set_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError>;

    /// Removes a wall from the peer's display.
    fn clear_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError>;

    /// Highlights a cell.
    fn set_color(&mut self, cell: CellCoord, color: Color) -> Result<(), ProtocolError>;

    /// Removes the highlight from a cell.
    fn clear_color(&mut self, cell: CellCoord) -> Result<(), ProtocolError>;

    /// Removes every cell highlight.
    fn clear_all_color(&mut self) -> Result<(), ProtocolError>;

    /// Writes a short label into a cell.
    fn set_text(&mut self, cell: CellCoord, text: &str) -> Result<(), ProtocolError>;

    /// Removes the label from a cell.
    fn clear_text(&mut self, cell: CellCoord) -> Result<(), ProtocolError>;

    /// Removes every cell label.
    fn clear_all_text(&mut self) -> Result<(), ProtocolError>;

    /// Reports whether the peer was reset since the last acknowledgement.
    fn was_reset(&mut self) -> Result<bool, ProtocolError>;

    /// Acknowledges a reset reported by [`Protocol::was_reset`].
    fn ack_reset(&mut self) -> Result<(), ProtocolError>;

    /// Emits a diagnostic line to the peer's log.
    fn log(&mut self, message: &str);
}
