//! Corner-aware A* search over confirmed cells.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
};

use micromouse_core::{CellCoord, Direction};

use crate::{Maze, MazeError};

/// Weights combining corners and hops into a single path cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathCost {
    corner_weight: u32,
    hop_weight: u32,
}

impl PathCost {
    /// Creates a cost model with explicit weights.
    #[must_use]
    pub const fn new(corner_weight: u32, hop_weight: u32) -> Self {
        Self {
            corner_weight,
            hop_weight,
        }
    }

    /// Cost charged for every change of direction.
    #[must_use]
    pub const fn corner_weight(&self) -> u32 {
        self.corner_weight
    }

    /// Cost charged for every edge travelled.
    #[must_use]
    pub const fn hop_weight(&self) -> u32 {
        self.hop_weight
    }

    /// Total cost of a path with the provided corner and hop counts,
    /// saturating at `u32::MAX`.
    #[must_use]
    pub const fn cost(&self, corners: u32, hops: u32) -> u32 {
        self.corner_weight
            .saturating_mul(corners)
            .saturating_add(self.hop_weight.saturating_mul(hops))
    }
}

impl Default for PathCost {
    fn default() -> Self {
        Self::new(2, 1)
    }
}

/// Route returned by [`Maze::find_fastest_path`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastestPath {
    cells: Vec<CellCoord>,
    corners: u32,
    cost: u32,
}

impl FastestPath {
    /// Cells from start to goal, both included.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of direction changes along the path.
    #[must_use]
    pub const fn corners(&self) -> u32 {
        self.corners
    }

    /// Number of edges travelled.
    #[must_use]
    pub fn hops(&self) -> u32 {
        u32::try_from(self.cells.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Cost of the path under the weights it was searched with.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }
}

/// Counts interior vertices where the incoming and outgoing steps differ.
#[must_use]
pub fn count_corners(path: &[CellCoord]) -> u32 {
    let corners = path
        .windows(3)
        .filter(|window| displacement(window[0], window[1]) != displacement(window[1], window[2]))
        .count();
    u32::try_from(corners).unwrap_or(u32::MAX)
}

fn displacement(from: CellCoord, to: CellCoord) -> (i64, i64) {
    (
        i64::from(to.x()) - i64::from(from.x()),
        i64::from(to.y()) - i64::from(from.y()),
    )
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    cell: CellCoord,
    arrival: Option<Direction>,
    parent: Option<usize>,
    cost: u32,
}

/// Open-set entry ordered so the binary heap pops the cheapest estimate
/// first, and among equal estimates the earliest inserted entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    estimate: u32,
    sequence: u64,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Maze {
    /// Finds the cheapest route of confirmed cells from `start` to `goal`
    /// using the default [`PathCost`].
    pub fn find_fastest_path(
        &self,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<FastestPath, MazeError> {
        self.find_fastest_path_with(start, goal, PathCost::default())
    }

    /// Finds the cheapest route of confirmed cells from `start` to `goal`.
    ///
    /// Only cells the mouse confirmed are expanded, and only through walls
    /// known to be open. The start cell itself does not need to be confirmed.
    /// A cell may be settled once per arrival direction because the corner
    /// cost of leaving it depends on how it was entered.
    pub fn find_fastest_path_with(
        &self,
        start: CellCoord,
        goal: CellCoord,
        weights: PathCost,
    ) -> Result<FastestPath, MazeError> {
        if !self.contains(start) {
            return Err(MazeError::OutOfBounds { cell: start });
        }
        if !self.contains(goal) {
            return Err(MazeError::OutOfBounds { cell: goal });
        }

        let mut nodes = vec![SearchNode {
            cell: start,
            arrival: None,
            parent: None,
            cost: 0,
        }];
        let mut open = BinaryHeap::new();
        let mut sequence: u64 = 0;
        open.push(OpenEntry {
            estimate: estimate_remaining(start, None, goal, weights),
            sequence,
            node: 0,
        });
        let mut closed: HashSet<(CellCoord, Option<Direction>)> = HashSet::new();

        while let Some(entry) = open.pop() {
            let current = nodes[entry.node];

            if current.cell == goal {
                let path = reconstruct(&nodes, entry.node);
                let corners = count_corners(&path);
                tracing::debug!(
                    %start,
                    %goal,
                    cost = current.cost,
                    corners,
                    expanded = closed.len(),
                    "fastest path found"
                );
                return Ok(FastestPath {
                    cells: path,
                    corners,
                    cost: current.cost,
                });
            }

            if !closed.insert((current.cell, current.arrival)) {
                continue;
            }

            for direction in Direction::ALL {
                if !self.is_open(current.cell, direction) {
                    continue;
                }
                let Ok(neighbor) = self.neighbor(current.cell, direction) else {
                    continue;
                };
                if !self.is_confirmed(neighbor)? {
                    continue;
                }
                if closed.contains(&(neighbor, Some(direction))) {
                    continue;
                }

                let turned = current
                    .arrival
                    .is_some_and(|arrival| arrival != direction);
                let step = if turned {
                    weights.cost(1, 1)
                } else {
                    weights.cost(0, 1)
                };
                let cost = current.cost.saturating_add(step);

                nodes.push(SearchNode {
                    cell: neighbor,
                    arrival: Some(direction),
                    parent: Some(entry.node),
                    cost,
                });
                sequence += 1;
                open.push(OpenEntry {
                    estimate: cost.saturating_add(estimate_remaining(
                        neighbor,
                        Some(direction),
                        goal,
                        weights,
                    )),
                    sequence,
                    node: nodes.len() - 1,
                });
            }
        }

        tracing::debug!(%start, %goal, "no confirmed route between cells");
        Err(MazeError::SearchExhausted { start, goal })
    }
}

/// Admissible and consistent lower bound on the remaining cost: every
/// remaining hop, plus one corner whenever the goal is not straight ahead.
fn estimate_remaining(
    cell: CellCoord,
    arrival: Option<Direction>,
    goal: CellCoord,
    weights: PathCost,
) -> u32 {
    if cell == goal {
        return 0;
    }

    let (dx, dy) = displacement(cell, goal);
    let straight_ahead = match arrival {
        None => dx == 0 || dy == 0,
        Some(direction) => {
            let (ox, oy) = direction.offset();
            if ox != 0 {
                dy == 0 && dx.signum() == i64::from(ox)
            } else {
                dx == 0 && dy.signum() == i64::from(oy)
            }
        }
    };

    let corners = if straight_ahead { 0 } else { 1 };
    weights.cost(corners, cell.manhattan_distance(goal))
}

fn reconstruct(nodes: &[SearchNode], mut index: usize) -> Vec<CellCoord> {
    let mut path = vec![nodes[index].cell];
    while let Some(parent) = nodes[index].parent {
        path.push(nodes[parent].cell);
        index = parent;
    }
    path.reverse();
    path
}
