//! Line-based mms simulator protocol.
//!
//! Only whole-cell moves and quarter turns are spoken; the simulator's
//! diagonal wall probes, half steps and 45 degree turns are never sent.

use std::io::{self, BufRead, StdinLock, Stderr, Stdout, Write};

use micromouse_core::{
    CellCoord, Color, Direction, MoveOutcome, Protocol, ProtocolError, RelativeDirection,
};

/// Single-letter wall side code used by `setWall` and `clearWall`.
#[must_use]
pub const fn direction_code(direction: Direction) -> char {
    match direction {
        Direction::North => 'n',
        Direction::East => 'e',
        Direction::South => 's',
        Direction::West => 'w',
    }
}

const fn wall_command(side: RelativeDirection) -> &'static str {
    match side {
        RelativeDirection::Front => "wallFront",
        RelativeDirection::Right => "wallRight",
        RelativeDirection::Back => "wallBack",
        RelativeDirection::Left => "wallLeft",
    }
}

/// [`Protocol`] implementation writing commands to `writer` and reading
/// replies from `reader`, one line each.
///
/// Log messages go to the separate `diagnostics` stream so they never
/// interleave with commands.
#[derive(Debug)]
pub struct TextProtocol<R, W, D> {
    reader: R,
    writer: W,
    diagnostics: D,
    reply: String,
}

impl TextProtocol<StdinLock<'static>, Stdout, Stderr> {
    /// Protocol over the process's standard streams, as launched by mms.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout(), io::stderr())
    }
}

impl<R: BufRead, W: Write, D: Write> TextProtocol<R, W, D> {
    /// Wraps the provided streams.
    pub fn new(reader: R, writer: W, diagnostics: D) -> Self {
        Self {
            reader,
            writer,
            diagnostics,
            reply: String::new(),
        }
    }

    /// Releases the underlying streams.
    pub fn into_inner(self) -> (R, W, D) {
        (self.reader, self.writer, self.diagnostics)
    }

    fn send(&mut self, command: &str) -> Result<(), ProtocolError> {
        tracing::trace!(command, "sending");
        writeln!(self.writer, "{command}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn request(&mut self, command: &str) -> Result<&str, ProtocolError> {
        self.send(command)?;
        self.reply.clear();
        if self.reader.read_line(&mut self.reply)? == 0 {
            return Err(ProtocolError::Disconnected);
        }
        let reply = self.reply.trim();
        tracing::trace!(command, reply, "received");
        Ok(reply)
    }

    fn request_bool(&mut self, command: &str) -> Result<bool, ProtocolError> {
        match self.request(command)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(unexpected(command, other)),
        }
    }

    fn request_ack(&mut self, command: &str) -> Result<(), ProtocolError> {
        match self.request(command)? {
            "ack" => Ok(()),
            other => Err(unexpected(command, other)),
        }
    }

    fn request_number(&mut self, command: &str) -> Result<u32, ProtocolError> {
        let reply = self.request(command)?;
        reply.parse().map_err(|_| unexpected(command, reply))
    }
}

fn unexpected(command: &str, response: &str) -> ProtocolError {
    ProtocolError::UnexpectedResponse {
        command: command.to_owned(),
        response: response.to_owned(),
    }
}

fn with_optional(command: &str, argument: Option<u32>) -> String {
    match argument {
        Some(value) => format!("{command} {value}"),
        None => command.to_owned(),
    }
}

impl<R: BufRead, W: Write, D: Write> Protocol for TextProtocol<R, W, D> {
    fn maze_width(&mut self) -> Result<u32, ProtocolError> {
        self.request_number("mazeWidth")
    }

    fn maze_height(&mut self) -> Result<u32, ProtocolError> {
        self.request_number("mazeHeight")
    }

    fn wall(
        &mut self,
        side: RelativeDirection,
        half_steps_away: Option<u32>,
    ) -> Result<bool, ProtocolError> {
        self.request_bool(&with_optional(wall_command(side), half_steps_away))
    }

    fn move_forward(&mut self, distance: Option<u32>) -> Result<MoveOutcome, ProtocolError> {
        let command = with_optional("moveForward", distance);
        match self.request(&command)? {
            "ack" => Ok(MoveOutcome::Moved),
            "crash" => Ok(MoveOutcome::Crashed),
            other => Err(unexpected(&command, other)),
        }
    }

    fn turn_left(&mut self) -> Result<(), ProtocolError> {
        self.request_ack("turnLeft")
    }

    fn turn_right(&mut self) -> Result<(), ProtocolError> {
        self.request_ack("turnRight")
    }

    fn set_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError> {
        self.send(&format!(
            "setWall {} {} {}",
            cell.x(),
            cell.y(),
            direction_code(direction)
        ))
    }

    fn clear_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError> {
        self.send(&format!(
            "clearWall {} {} {}",
            cell.x(),
            cell.y(),
            direction_code(direction)
        ))
    }

    fn set_color(&mut self, cell: CellCoord, color: Color) -> Result<(), ProtocolError> {
        self.send(&format!("setColor {} {} {}", cell.x(), cell.y(), color.code()))
    }

    fn clear_color(&mut self, cell: CellCoord) -> Result<(), ProtocolError> {
        self.send(&format!("clearColor {} {}", cell.x(), cell.y()))
    }

    fn clear_all_color(&mut self) -> Result<(), ProtocolError> {
        self.send("clearAllColor")
    }

    fn set_text(&mut self, cell: CellCoord, text: &str) -> Result<(), ProtocolError> {
        self.send(&format!("setText {} {} {text}", cell.x(), cell.y()))
    }

    fn clear_text(&mut self, cell: CellCoord) -> Result<(), ProtocolError> {
        self.send(&format!("clearText {} {}", cell.x(), cell.y()))
    }

    fn clear_all_text(&mut self) -> Result<(), ProtocolError> {
        self.send("clearAllText")
    }

    fn was_reset(&mut self) -> Result<bool, ProtocolError> {
        self.request_bool("wasReset")
    }

    fn ack_reset(&mut self) -> Result<(), ProtocolError> {
        self.request_ack("ackReset")
    }

    fn log(&mut self, message: &str) {
        let written = writeln!(self.diagnostics, "{message}").and_then(|()| self.diagnostics.flush());
        if let Err(error) = written {
            tracing::warn!(%error, "failed to write protocol log line");
        }
    }
}
