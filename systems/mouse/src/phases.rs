//! Run phases composed from the controller primitives.

use std::mem;

use micromouse_core::{CellCoord, Color, Direction, Protocol};
use micromouse_maze::{DistanceField, MazeError};

use crate::{Mouse, MouseError, PathStart, PhaseReport};

/// A straight stretch of a path covered by one forward move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StraightRun {
    /// Heading held during the run.
    pub direction: Direction,
    /// Number of cells travelled.
    pub length: u32,
}

/// Compacts a path into maximal straight runs.
///
/// Consecutive cells must be orthogonally adjacent. A path with fewer than
/// two cells has no runs.
pub fn straight_runs(path: &[CellCoord]) -> Result<Vec<StraightRun>, MouseError> {
    let mut runs: Vec<StraightRun> = Vec::new();
    for pair in path.windows(2) {
        let direction = Direction::between(pair[0], pair[1]).ok_or(MouseError::NotANeighbor {
            from: pair[0],
            target: pair[1],
        })?;
        match runs.last_mut() {
            Some(run) if run.direction == direction => run.length += 1,
            _ => runs.push(StraightRun {
                direction,
                length: 1,
            }),
        }
    }
    Ok(runs)
}

struct StepBudget {
    limit: u32,
    taken: u32,
}

impl StepBudget {
    const fn new(limit: u32) -> Self {
        Self { limit, taken: 0 }
    }

    fn take(&mut self) -> Result<(), MouseError> {
        if self.taken >= self.limit {
            return Err(MouseError::StepLimitExceeded { limit: self.limit });
        }
        self.taken += 1;
        Ok(())
    }
}

impl<P: Protocol> Mouse<P> {
    /// Explores until the mouse stands on `goal`.
    ///
    /// Each step senses the walls, refreshes the goal distances, confirms the
    /// current cell and moves one cell towards the best candidate.
    pub fn explore_to(&mut self, goal: CellCoord) -> Result<PhaseReport, MouseError> {
        self.require_in_bounds(goal)?;
        let before = self.odometer;
        let mut budget = StepBudget::new(self.config.step_limit);
        tracing::info!(start = %self.position, %goal, "exploring towards the goal");
        self.annotate_color(goal, Color::Green)?;

        while self.position != goal {
            budget.take()?;
            let _ = self.sense_walls()?;
            let _ = self
                .maze
                .propagate_distances(goal, DistanceField::Goal)?;
            self.annotate_distances(DistanceField::Goal)?;
            self.mark_confirmed(self.position)?;

            let candidates = self.reachable_neighbors()?;
            let next = self.best_candidate(&candidates, DistanceField::Goal)?;
            tracing::debug!(
                position = %self.position,
                ?candidates,
                %next,
                "exploration step"
            );
            self.turn_towards(next)?;
            self.move_forward(1)?;
        }

        let report = self.odometer.since(before);
        tracing::info!(?report, "reached the goal");
        Ok(report)
    }

    /// Walks back to `start`, still learning walls on the way.
    ///
    /// The goal distances are kept current for display; decisions use only
    /// the start distances.
    pub fn return_to_start(
        &mut self,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<PhaseReport, MouseError> {
        self.require_in_bounds(start)?;
        self.require_in_bounds(goal)?;
        let before = self.odometer;
        let mut budget = StepBudget::new(self.config.step_limit);
        tracing::info!(from = %self.position, %start, "returning to the start");

        while self.position != start {
            budget.take()?;
            let _ = self.sense_walls()?;
            let _ = self
                .maze
                .propagate_distances(goal, DistanceField::Goal)?;
            self.annotate_distances(DistanceField::Goal)?;
            let _ = self
                .maze
                .propagate_distances(start, DistanceField::Start)?;

            let candidates = self.reachable_neighbors()?;
            let next = self.best_candidate(&candidates, DistanceField::Start)?;
            tracing::debug!(position = %self.position, %next, "return step");
            self.turn_towards(next)?;
            self.move_forward(1)?;
        }

        let report = self.odometer.since(before);
        tracing::info!(?report, "back at the start");
        Ok(report)
    }

    /// Drives along `path`, which must begin at the current position.
    ///
    /// Straight stretches are covered with a single multi-cell move. Cells
    /// entered during the replay are never confirmed.
    pub fn follow_path(&mut self, path: &[CellCoord]) -> Result<PhaseReport, MouseError> {
        match path.first() {
            Some(&first) if first == self.position => {}
            first => {
                return Err(MouseError::PathStartMismatch {
                    expected: self.position,
                    actual: first.map_or(PathStart::Empty, |cell| PathStart::Cell(*cell)),
                })
            }
        }

        let runs = straight_runs(path)?;
        let before = self.odometer;
        tracing::info!(cells = path.len(), runs = runs.len(), "replaying path");
        for &cell in path {
            self.annotate_color(cell, Color::Yellow)?;
        }

        let was_exploring = mem::replace(&mut self.exploring, false);
        let outcome = self.drive_runs(&runs);
        self.exploring = was_exploring;
        outcome?;

        Ok(self.odometer.since(before))
    }

    fn drive_runs(&mut self, runs: &[StraightRun]) -> Result<(), MouseError> {
        for run in runs {
            let target = self.maze.neighbor(self.position, run.direction)?;
            self.turn_towards(target)?;
            self.move_forward(run.length)?;
        }
        Ok(())
    }

    /// Heads for `goal` over confirmed cells only, without sensing or
    /// refreshing distances.
    pub fn find_goal_fast(&mut self, goal: CellCoord) -> Result<PhaseReport, MouseError> {
        self.require_in_bounds(goal)?;
        let before = self.odometer;
        let mut budget = StepBudget::new(self.config.step_limit);
        tracing::info!(from = %self.position, %goal, "fast goal search");

        while self.position != goal {
            budget.take()?;
            let mut candidates = self.reachable_cells(false)?;
            candidates.retain(|cell| self.maze.is_confirmed(*cell).unwrap_or(false));
            let next = self.best_candidate(&candidates, DistanceField::Goal)?;
            self.turn_towards(next)?;
            self.move_forward(1)?;
        }

        Ok(self.odometer.since(before))
    }

    fn require_in_bounds(&self, cell: CellCoord) -> Result<(), MouseError> {
        if self.maze.contains(cell) {
            Ok(())
        } else {
            Err(MazeError::OutOfBounds { cell }.into())
        }
    }
}
