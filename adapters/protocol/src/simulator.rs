//! In-memory stand-in for the mms simulator.

use std::collections::{HashMap, HashSet};

use micromouse_core::{
    CellCoord, Color, Direction, MoveOutcome, Protocol, ProtocolError, RelativeDirection,
};

use crate::layout::{LayoutError, WallLayout};

/// Tally of the commands a [`Simulator`] has served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandCounts {
    /// Wall sensor queries.
    pub wall_queries: u32,
    /// Forward move commands, crashed ones included.
    pub move_commands: u32,
    /// Cells actually travelled.
    pub cells_moved: u32,
    /// Quarter turns.
    pub turns: u32,
    /// Moves rejected because a wall was in the way.
    pub crashes: u32,
}

/// Simulated maze and mouse answering [`Protocol`] requests from a
/// [`WallLayout`].
///
/// A move that would pass through a wall is reported as
/// [`MoveOutcome::Crashed`] and leaves the mouse where it was. Display
/// annotations are recorded so tests can inspect them.
#[derive(Clone, Debug)]
pub struct Simulator {
    layout: WallLayout,
    start: CellCoord,
    start_heading: Direction,
    position: CellCoord,
    heading: Direction,
    reset_pending: bool,
    trail: Vec<CellCoord>,
    marked_walls: HashSet<(CellCoord, Direction)>,
    colors: HashMap<CellCoord, Color>,
    texts: HashMap<CellCoord, String>,
    log: Vec<String>,
    counts: CommandCounts,
}

impl Simulator {
    /// Places the simulated mouse at `start` facing `heading`.
    pub fn new(
        layout: WallLayout,
        start: CellCoord,
        heading: Direction,
    ) -> Result<Self, LayoutError> {
        if !layout.contains(start) {
            return Err(LayoutError::OutOfBounds { cell: start });
        }
        Ok(Self {
            layout,
            start,
            start_heading: heading,
            position: start,
            heading,
            reset_pending: false,
            trail: vec![start],
            marked_walls: HashSet::new(),
            colors: HashMap::new(),
            texts: HashMap::new(),
            log: Vec::new(),
            counts: CommandCounts::default(),
        })
    }

    /// Cell the simulated mouse occupies.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Heading of the simulated mouse.
    #[must_use]
    pub const fn heading(&self) -> Direction {
        self.heading
    }

    /// Commands served so far.
    #[must_use]
    pub const fn counts(&self) -> CommandCounts {
        self.counts
    }

    /// Every cell occupied so far in order, starting with the start cell.
    #[must_use]
    pub fn trail(&self) -> &[CellCoord] {
        &self.trail
    }

    /// Color last assigned to `cell`.
    #[must_use]
    pub fn color(&self, cell: CellCoord) -> Option<Color> {
        self.colors.get(&cell).copied()
    }

    /// Label last written into `cell`.
    #[must_use]
    pub fn text(&self, cell: CellCoord) -> Option<&str> {
        self.texts.get(&cell).map(String::as_str)
    }

    /// Whether the controller marked a wall on this side of `cell`.
    #[must_use]
    pub fn is_wall_marked(&self, cell: CellCoord, direction: Direction) -> bool {
        self.marked_walls.contains(&(cell, direction))
    }

    /// Number of distinct wall markings received.
    #[must_use]
    pub fn marked_wall_count(&self) -> usize {
        self.marked_walls.len()
    }

    /// Lines received through [`Protocol::log`].
    #[must_use]
    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    /// Puts the mouse back on its start pose and flags a pending reset,
    /// as pressing reset in the simulator does.
    pub fn trigger_reset(&mut self) {
        self.position = self.start;
        self.heading = self.start_heading;
        self.reset_pending = true;
        self.trail.push(self.start);
    }
}

impl Protocol for Simulator {
    fn maze_width(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.layout.width())
    }

    fn maze_height(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.layout.height())
    }

    fn wall(
        &mut self,
        side: RelativeDirection,
        half_steps_away: Option<u32>,
    ) -> Result<bool, ProtocolError> {
        self.counts.wall_queries += 1;
        let mut cell = self.position;
        for _ in 0..half_steps_away.map_or(0, |half_steps| half_steps / 2) {
            match self.layout.neighbor(cell, self.heading) {
                Some(next) if !self.layout.has_wall(cell, self.heading) => cell = next,
                _ => return Ok(true),
            }
        }
        Ok(self.layout.has_wall(cell, side.to_absolute(self.heading)))
    }

    fn move_forward(&mut self, distance: Option<u32>) -> Result<MoveOutcome, ProtocolError> {
        self.counts.move_commands += 1;
        let cells = distance.unwrap_or(1);

        let mut route = Vec::new();
        let mut cell = self.position;
        for _ in 0..cells {
            match self.layout.neighbor(cell, self.heading) {
                Some(next) if !self.layout.has_wall(cell, self.heading) => {
                    route.push(next);
                    cell = next;
                }
                _ => {
                    self.counts.crashes += 1;
                    tracing::warn!(
                        position = %self.position,
                        heading = ?self.heading,
                        cells,
                        "simulated mouse crashed"
                    );
                    return Ok(MoveOutcome::Crashed);
                }
            }
        }

        self.counts.cells_moved += cells;
        self.position = cell;
        self.trail.extend(route);
        Ok(MoveOutcome::Moved)
    }

    fn turn_left(&mut self) -> Result<(), ProtocolError> {
        self.counts.turns += 1;
        self.heading = self.heading.minus_90();
        Ok(())
    }

    fn turn_right(&mut self) -> Result<(), ProtocolError> {
        self.counts.turns += 1;
        self.heading = self.heading.plus_90();
        Ok(())
    }

    fn set_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError> {
        let _ = self.marked_walls.insert((cell, direction));
        Ok(())
    }

    fn clear_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError> {
        let _ = self.marked_walls.remove(&(cell, direction));
        Ok(())
    }

    fn set_color(&mut self, cell: CellCoord, color: Color) -> Result<(), ProtocolError> {
        let _ = self.colors.insert(cell, color);
        Ok(())
    }

    fn clear_color(&mut self, cell: CellCoord) -> Result<(), ProtocolError> {
        let _ = self.colors.remove(&cell);
        Ok(())
    }

    fn clear_all_color(&mut self) -> Result<(), ProtocolError> {
        self.colors.clear();
        Ok(())
    }

    fn set_text(&mut self, cell: CellCoord, text: &str) -> Result<(), ProtocolError> {
        let _ = self.texts.insert(cell, text.to_owned());
        Ok(())
    }

    fn clear_text(&mut self, cell: CellCoord) -> Result<(), ProtocolError> {
        let _ = self.texts.remove(&cell);
        Ok(())
    }

    fn clear_all_text(&mut self) -> Result<(), ProtocolError> {
        self.texts.clear();
        Ok(())
    }

    fn was_reset(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.reset_pending)
    }

    fn ack_reset(&mut self) -> Result<(), ProtocolError> {
        self.reset_pending = false;
        Ok(())
    }

    fn log(&mut self, message: &str) {
        self.log.push(message.to_owned());
    }
}
