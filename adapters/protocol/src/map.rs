//! Parser for the mms ASCII `.map` maze format.
//!
//! A map alternates post rows (`+---+   +`) and wall rows (`|   |   |`),
//! starting and ending with a post row, north first. Any non-space
//! character between two posts marks a horizontal wall; any non-space
//! character in a post column of a wall row marks a vertical wall.

use micromouse_core::{CellCoord, Direction};
use thiserror::Error;

use crate::layout::{LayoutError, WallLayout};

/// Failures raised while reading a `.map` file.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MapParseError {
    /// The input holds no maze rows.
    #[error("map is empty")]
    Empty,
    /// A map needs an odd number of lines, posts rows around wall rows.
    #[error("map has {lines} lines; expected an odd number of at least 3")]
    LineCount {
        /// Number of lines from the first to the last non-blank one.
        lines: usize,
    },
    /// A post row does not contain at least two `+` posts.
    #[error("line {line} has no cell posts")]
    MissingPosts {
        /// One-based line number.
        line: usize,
    },
    /// The parsed dimensions were rejected.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Parses an mms `.map` description into a [`WallLayout`].
///
/// Column positions are taken from the `+` posts of the first line. The
/// perimeter is always walled regardless of the file contents.
pub fn parse_map(text: &str) -> Result<WallLayout, MapParseError> {
    let all_lines: Vec<&[u8]> = text
        .lines()
        .map(|line| line.trim_end().as_bytes())
        .collect();
    let first = all_lines.iter().position(|line| !line.is_empty());
    let last = all_lines.iter().rposition(|line| !line.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return Err(MapParseError::Empty);
    };
    let lines = &all_lines[first..=last];

    if lines.len() < 3 || lines.len() % 2 == 0 {
        return Err(MapParseError::LineCount { lines: lines.len() });
    }

    let posts: Vec<usize> = lines[0]
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'+')
        .map(|(column, _)| column)
        .collect();
    let missing_posts = MapParseError::MissingPosts { line: first + 1 };
    if posts.len() < 2 {
        return Err(missing_posts);
    }

    let too_long = MapParseError::LineCount { lines: lines.len() };
    let width = u32::try_from(posts.len() - 1).map_err(|_| missing_posts)?;
    let height = u32::try_from(lines.len() / 2).map_err(|_| too_long.clone())?;
    let mut layout = WallLayout::open(width, height)?;

    let marked = |line: &[u8], column: usize| line.get(column).is_some_and(|byte| *byte != b' ');

    for (row, line) in lines.iter().enumerate() {
        let row = u32::try_from(row).map_err(|_| too_long.clone())?;
        if row % 2 == 0 {
            // Post row `row / 2` lies north of cell row `height - 1 - row / 2`.
            let boundary = row / 2;
            if boundary == height {
                continue;
            }
            let y = height - 1 - boundary;
            for (x, span) in (0..width).zip(posts.windows(2)) {
                if (span[0] + 1..span[1]).any(|column| marked(line, column)) {
                    layout.add_wall(CellCoord::new(x, y), Direction::North)?;
                }
            }
        } else {
            let y = height - 1 - row / 2;
            for (x, &column) in (0..=width).zip(posts.iter()) {
                if !marked(line, column) {
                    continue;
                }
                if x < width {
                    layout.add_wall(CellCoord::new(x, y), Direction::West)?;
                } else {
                    layout.add_wall(CellCoord::new(width - 1, y), Direction::East)?;
                }
            }
        }
    }

    tracing::debug!(width, height, "parsed maze map");
    Ok(layout)
}
