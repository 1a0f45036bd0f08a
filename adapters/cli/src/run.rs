//! Phase sequencing for a complete micromouse run.

use std::fmt;

use anyhow::{bail, ensure, Context, Result};
use micromouse_core::{CellCoord, Color, Direction, Protocol};
use micromouse_maze::{Maze, PathCost};
use micromouse_system_mouse::{Mouse, MouseConfig, MouseError, PhaseReport};

/// How often a failed path search may send the mouse back to explore.
const MAX_SEARCH_ATTEMPTS: u32 = 3;

/// How many simulator resets a single run tolerates.
const MAX_RESTARTS: u32 = 8;

/// Everything the orchestrator needs besides the protocol.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunSettings {
    pub(crate) start: CellCoord,
    pub(crate) heading: Direction,
    pub(crate) goal: Option<CellCoord>,
    pub(crate) mouse: MouseConfig,
    pub(crate) path_cost: PathCost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Explore,
    Return,
    Replay,
    FastSearch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Explore => "explore",
            Self::Return => "return to start",
            Self::Replay => "fastest path replay",
            Self::FastSearch => "fast goal search",
        };
        f.write_str(name)
    }
}

/// Shape of the replayed fastest path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PathSummary {
    pub(crate) hops: u32,
    pub(crate) corners: u32,
    pub(crate) cost: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) goal: Option<CellCoord>,
    pub(crate) phases: Vec<(Phase, PhaseReport)>,
    pub(crate) path: Option<PathSummary>,
    pub(crate) restarts: u32,
    pub(crate) total: PhaseReport,
}

/// Result of [`run`]: the summary plus the parts the mouse owned.
pub(crate) struct RunOutcome<P> {
    pub(crate) summary: RunSummary,
    pub(crate) protocol: P,
    pub(crate) maze: Maze,
}

/// Drives the mouse through explore, return, replay and fast search.
///
/// A reset reported by the peer between phases re-seats the mouse on its
/// start pose and resumes with exploration; learned walls are kept.
pub(crate) fn run<P: Protocol>(mut protocol: P, settings: &RunSettings) -> Result<RunOutcome<P>> {
    let (width, height) = protocol
        .dimensions()
        .context("failed to query the maze dimensions")?;
    let maze = Maze::new(width, height).context("the peer reported an unusable maze")?;
    let goal = settings
        .goal
        .unwrap_or_else(|| CellCoord::new(width / 2, height / 2));
    ensure!(
        maze.contains(goal),
        "goal {goal} lies outside the {width}x{height} maze"
    );
    ensure!(
        maze.contains(settings.start),
        "start {} lies outside the {width}x{height} maze",
        settings.start
    );

    tracing::info!(width, height, start = %settings.start, %goal, "starting run");
    protocol.log(&format!("Goal: {goal}"));

    let mut mouse = Mouse::new(
        protocol,
        maze,
        settings.start,
        settings.heading,
        settings.mouse,
    )
    .context("failed to place the mouse")?;

    let mut summary = RunSummary {
        goal: Some(goal),
        ..RunSummary::default()
    };
    let mut search_attempts = 0;
    let mut next = Some(Phase::Explore);

    while let Some(phase) = next {
        let phase = if poll_reset(&mut mouse)? {
            summary.restarts += 1;
            ensure!(
                summary.restarts <= MAX_RESTARTS,
                "peer was reset more than {MAX_RESTARTS} times"
            );
            mouse
                .restart(settings.start, settings.heading)
                .context("failed to restart after a reset")?;
            tracing::warn!(interrupted = %phase, "peer was reset, exploring again");
            Phase::Explore
        } else {
            phase
        };

        mouse.protocol_mut().log(&format!("Starting {phase}"));
        let report = match phase {
            Phase::Explore => {
                next = Some(Phase::Return);
                mouse.explore_to(goal)
            }
            Phase::Return => {
                next = Some(Phase::Replay);
                mouse.return_to_start(settings.start, goal)
            }
            Phase::Replay => {
                let search = mouse
                    .maze()
                    .find_fastest_path_with(settings.start, goal, settings.path_cost)
                    .map_err(MouseError::from);
                let path = match search {
                    Ok(path) => path,
                    Err(error) if error.is_recoverable() => {
                        search_attempts += 1;
                        if search_attempts >= MAX_SEARCH_ATTEMPTS {
                            bail!("no confirmed route after {search_attempts} attempts: {error}");
                        }
                        tracing::warn!(%error, "exploring again before the replay");
                        next = Some(Phase::Explore);
                        continue;
                    }
                    Err(error) => return Err(error).context("fastest path search failed"),
                };

                tracing::info!(
                    hops = path.hops(),
                    corners = path.corners(),
                    cost = path.cost(),
                    "fastest path found"
                );
                summary.path = Some(PathSummary {
                    hops: path.hops(),
                    corners: path.corners(),
                    cost: path.cost(),
                });
                next = Some(Phase::FastSearch);
                mouse.follow_path(path.cells())
            }
            Phase::FastSearch => {
                next = None;
                mouse.find_goal_fast(goal)
            }
        };

        let report = report.with_context(|| format!("{phase} phase failed"))?;
        tracing::info!(%phase, ?report, "phase complete");
        summary.phases.push((phase, report));
    }

    if settings.mouse.annotate {
        mouse
            .protocol_mut()
            .set_color(goal, Color::Green)
            .context("failed to mark the goal")?;
    }
    mouse.protocol_mut().log("Mouse found goal");
    summary.total = mouse.odometer();

    let (protocol, maze) = mouse.into_parts();
    Ok(RunOutcome {
        summary,
        protocol,
        maze,
    })
}

fn poll_reset<P: Protocol>(mouse: &mut Mouse<P>) -> Result<bool> {
    let protocol = mouse.protocol_mut();
    if !protocol.was_reset().context("failed to poll for a reset")? {
        return Ok(false);
    }
    protocol.ack_reset().context("failed to acknowledge the reset")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use micromouse_core::{MoveOutcome, ProtocolError, RelativeDirection};
    use micromouse_protocol::{Simulator, WallLayout};

    use super::*;

    fn settings() -> RunSettings {
        RunSettings {
            start: CellCoord::new(0, 0),
            heading: Direction::North,
            goal: None,
            mouse: MouseConfig::default(),
            path_cost: PathCost::default(),
        }
    }

    fn simulator(width: u32, height: u32, seed: u64) -> Simulator {
        let layout = WallLayout::generate(width, height, seed).expect("layout");
        Simulator::new(layout, CellCoord::new(0, 0), Direction::North).expect("simulator")
    }

    #[test]
    fn full_run_ends_on_the_centre_cell() {
        let outcome = run(simulator(8, 8, 21), &settings()).expect("run");

        let summary = &outcome.summary;
        assert_eq!(summary.goal, Some(CellCoord::new(4, 4)));
        let phases: Vec<Phase> = summary.phases.iter().map(|(phase, _)| *phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Explore,
                Phase::Return,
                Phase::Replay,
                Phase::FastSearch
            ]
        );
        let path = summary.path.expect("replayed path");
        assert_eq!(path.cost, 2 * path.corners + path.hops);
        assert_eq!(outcome.protocol.position(), CellCoord::new(4, 4));
        assert_eq!(outcome.protocol.counts().crashes, 0);
        assert_eq!(
            outcome.protocol.log_lines().first().map(String::as_str),
            Some("Goal: (4, 4)")
        );
        assert_eq!(
            outcome.protocol.color(CellCoord::new(4, 4)),
            Some(Color::Green)
        );
        assert!(outcome.maze.is_confirmed(CellCoord::new(4, 4)).expect("goal"));
    }

    #[test]
    fn explicit_goal_outside_the_maze_is_rejected() {
        let settings = RunSettings {
            goal: Some(CellCoord::new(9, 0)),
            ..settings()
        };
        assert!(run(simulator(4, 4, 1), &settings).is_err());
    }

    /// Simulator wrapper that reports a reset on one chosen poll.
    struct ResetOnPoll {
        inner: Simulator,
        polls_until_reset: u32,
    }

    impl Protocol for ResetOnPoll {
        fn maze_width(&mut self) -> Result<u32, ProtocolError> {
            self.inner.maze_width()
        }

        fn maze_height(&mut self) -> Result<u32, ProtocolError> {
            self.inner.maze_height()
        }

        fn wall(
            &mut self,
            side: RelativeDirection,
            half_steps_away: Option<u32>,
        ) -> Result<bool, ProtocolError> {
            self.inner.wall(side, half_steps_away)
        }

        fn move_forward(&mut self, distance: Option<u32>) -> Result<MoveOutcome, ProtocolError> {
            self.inner.move_forward(distance)
        }

        fn turn_left(&mut self) -> Result<(), ProtocolError> {
            self.inner.turn_left()
        }

        fn turn_right(&mut self) -> Result<(), ProtocolError> {
            self.inner.turn_right()
        }

        fn set_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError> {
            self.inner.set_wall(cell, direction)
        }

        fn clear_wall(&mut self, cell: CellCoord, direction: Direction) -> Result<(), ProtocolError> {
            self.inner.clear_wall(cell, direction)
        }

        fn set_color(&mut self, cell: CellCoord, color: Color) -> Result<(), ProtocolError> {
            self.inner.set_color(cell, color)
        }

        fn clear_color(&mut self, cell: CellCoord) -> Result<(), ProtocolError> {
            self.inner.clear_color(cell)
        }

        fn clear_all_color(&mut self) -> Result<(), ProtocolError> {
            self.inner.clear_all_color()
        }

        fn set_text(&mut self, cell: CellCoord, text: &str) -> Result<(), ProtocolError> {
            self.inner.set_text(cell, text)
        }

        fn clear_text(&mut self, cell: CellCoord) -> Result<(), ProtocolError> {
            self.inner.clear_text(cell)
        }

        fn clear_all_text(&mut self) -> Result<(), ProtocolError> {
            self.inner.clear_all_text()
        }

        fn was_reset(&mut self) -> Result<bool, ProtocolError> {
            if self.polls_until_reset == 0 {
                self.inner.trigger_reset();
            }
            self.polls_until_reset = self.polls_until_reset.wrapping_sub(1);
            self.inner.was_reset()
        }

        fn ack_reset(&mut self) -> Result<(), ProtocolError> {
            self.inner.ack_reset()
        }

        fn log(&mut self, message: &str) {
            self.inner.log(message);
        }
    }

    #[test]
    fn reset_between_phases_restarts_exploration() {
        // Polls happen before each phase; the second one precedes the return.
        let protocol = ResetOnPoll {
            inner: simulator(6, 6, 4),
            polls_until_reset: 1,
        };

        let outcome = run(protocol, &settings()).expect("run");

        let summary = &outcome.summary;
        assert_eq!(summary.restarts, 1);
        let phases: Vec<Phase> = summary.phases.iter().map(|(phase, _)| *phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Explore,
                Phase::Explore,
                Phase::Return,
                Phase::Replay,
                Phase::FastSearch
            ]
        );
        assert_eq!(outcome.protocol.inner.position(), CellCoord::new(3, 3));
        assert_eq!(outcome.protocol.inner.counts().crashes, 0);
    }
}
