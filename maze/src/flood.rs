//! Breadth-first distance propagation over the known-open maze graph.

use std::collections::VecDeque;

use micromouse_core::{CellCoord, Direction};

use crate::{DistanceField, Maze, MazeError};

impl Maze {
    /// Recomputes the selected distance field from `target` using a
    /// breadth-first flood fill.
    ///
    /// Every cell's field is reset to unknown first, so the result reflects
    /// only the walls known right now. Cells the fill cannot reach keep an
    /// unknown distance. Returns the number of cells that received a
    /// distance, including the target itself.
    pub fn propagate_distances(
        &mut self,
        target: CellCoord,
        field: DistanceField,
    ) -> Result<usize, MazeError> {
        let target_index = self
            .index(target)
            .ok_or(MazeError::OutOfBounds { cell: target })?;

        for cell in &mut self.cells {
            cell.set_distance(field, None);
        }

        self.cells[target_index].set_distance(field, Some(0));
        let mut reached = 1;
        let mut queue = VecDeque::from([target]);

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = self.index(cell) else {
                continue;
            };
            let Some(current_distance) = self.cells[current_index].distance(field) else {
                continue;
            };
            let next_distance = current_distance + 1;

            for direction in Direction::ALL {
                if !self.is_open(cell, direction) {
                    continue;
                }

                let Ok(neighbor) = self.neighbor(cell, direction) else {
                    continue;
                };
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };

                if self.cells[neighbor_index].distance(field).is_some() {
                    continue;
                }

                self.cells[neighbor_index].set_distance(field, Some(next_distance));
                reached += 1;
                queue.push_back(neighbor);
            }
        }

        tracing::trace!(%target, ?field, reached, "flood fill complete");
        Ok(reached)
    }
}
