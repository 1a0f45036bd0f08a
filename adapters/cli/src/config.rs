//! Run configuration loaded from `micromouse.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use micromouse_core::{CellCoord, Direction};
use micromouse_maze::PathCost;
use micromouse_system_mouse::{MouseConfig, DEFAULT_STEP_LIMIT};
use serde::Deserialize;

/// File consulted when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "micromouse.toml";

/// Top-level configuration of a run.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct RunConfig {
    /// Cell the mouse starts in.
    #[serde(default = "default_start")]
    pub(crate) start: CellCoord,
    /// Heading at the start.
    #[serde(default = "default_heading")]
    pub(crate) heading: Direction,
    /// Target cell; the maze centre when absent.
    #[serde(default)]
    pub(crate) goal: Option<CellCoord>,
    /// Controller tunables.
    #[serde(default)]
    pub(crate) mouse: MouseSection,
    /// Fastest-path weights.
    #[serde(default)]
    pub(crate) path_cost: PathCostSection,
}

/// `[mouse]` table.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct MouseSection {
    /// Mirror the controller's knowledge on the simulator display.
    #[serde(default = "default_annotate")]
    pub(crate) annotate: bool,
    /// Decision cap per phase.
    #[serde(default = "default_step_limit")]
    pub(crate) step_limit: u32,
}

/// `[path_cost]` table.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct PathCostSection {
    /// Cost of one change of direction.
    #[serde(default = "default_corner_weight")]
    pub(crate) corner_weight: u32,
    /// Cost of one cell travelled.
    #[serde(default = "default_hop_weight")]
    pub(crate) hop_weight: u32,
}

fn default_start() -> CellCoord {
    CellCoord::new(0, 0)
}

fn default_heading() -> Direction {
    Direction::North
}

fn default_annotate() -> bool {
    true
}

fn default_step_limit() -> u32 {
    DEFAULT_STEP_LIMIT
}

fn default_corner_weight() -> u32 {
    PathCost::default().corner_weight()
}

fn default_hop_weight() -> u32 {
    PathCost::default().hop_weight()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            heading: default_heading(),
            goal: None,
            mouse: MouseSection::default(),
            path_cost: PathCostSection::default(),
        }
    }
}

impl Default for MouseSection {
    fn default() -> Self {
        Self {
            annotate: default_annotate(),
            step_limit: default_step_limit(),
        }
    }
}

impl Default for PathCostSection {
    fn default() -> Self {
        Self {
            corner_weight: default_corner_weight(),
            hop_weight: default_hop_weight(),
        }
    }
}

impl RunConfig {
    /// Reads and parses a TOML configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Loads `path` when given, else the default file if present, else the
    /// built-in defaults.
    pub(crate) fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            tracing::info!(path = %fallback.display(), "loading configuration");
            Self::load(fallback)
        } else {
            Ok(Self::default())
        }
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub(crate) fn mouse_config(&self) -> MouseConfig {
        MouseConfig {
            annotate: self.mouse.annotate,
            step_limit: self.mouse.step_limit,
        }
    }

    pub(crate) fn path_cost(&self) -> PathCost {
        PathCost::new(self.path_cost.corner_weight, self.path_cost.hop_weight)
    }
}
