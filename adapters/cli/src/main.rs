#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the micromouse controller.
//!
//! Without maze options the binary speaks the mms text protocol on stdin
//! and stdout, as the simulator expects when it launches the mouse. With
//! `--maze` or `--generate` the run happens offline against the in-memory
//! simulator.

mod config;
mod run;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use micromouse_core::{CellCoord, Protocol};
use micromouse_maze::DistanceField;
use micromouse_protocol::{parse_map, Simulator, TextProtocol, WallLayout};
use tracing_subscriber::EnvFilter;

use crate::config::RunConfig;
use crate::run::{run, RunOutcome, RunSettings};

const DEFAULT_LOG_FILTER: &str = "micromouse=info";

/// Micromouse maze solver.
#[derive(Debug, Parser)]
#[command(name = "micromouse", version, about)]
struct Cli {
    /// Configuration file (defaults to ./micromouse.toml when present).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run offline against an mms `.map` file.
    #[arg(long, value_name = "FILE", conflicts_with = "generate")]
    maze: Option<PathBuf>,

    /// Run offline against a generated maze of the given size.
    #[arg(long, value_name = "WxH", value_parser = parse_dimensions)]
    generate: Option<(u32, u32)>,

    /// Seed for `--generate`.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Extra interior walls to knock down in a generated maze.
    #[arg(long, default_value_t = 0)]
    loops: usize,

    /// Goal cell, overriding the configuration.
    #[arg(long, value_name = "X,Y", value_parser = parse_cell)]
    goal: Option<CellCoord>,

    /// Do not mirror distances, visited cells and paths on the display.
    #[arg(long)]
    no_annotate: bool,

    /// Tracing filter, overriding `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width {width:?}"))?;
    let height = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height {height:?}"))?;
    Ok((width, height))
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {value:?}"))?;
    let x = x.trim().parse().map_err(|_| format!("invalid x {x:?}"))?;
    let y = y.trim().parse().map_err(|_| format!("invalid y {y:?}"))?;
    Ok(CellCoord::new(x, y))
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log filter {level:?}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    // stdout carries the simulator protocol.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn offline_layout(cli: &Cli) -> Result<Option<WallLayout>> {
    if let Some(path) = &cli.maze {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read maze {}", path.display()))?;
        let layout =
            parse_map(&text).with_context(|| format!("invalid maze {}", path.display()))?;
        return Ok(Some(layout));
    }
    if let Some((width, height)) = cli.generate {
        let layout = WallLayout::generate(width, height, cli.seed)
            .context("failed to generate a maze")?
            .with_loops(cli.loops, cli.seed);
        return Ok(Some(layout));
    }
    Ok(None)
}

fn report<P>(outcome: &RunOutcome<P>) {
    let summary = &outcome.summary;
    for (phase, report) in &summary.phases {
        tracing::info!(
            %phase,
            cells = report.cells_moved,
            moves = report.move_commands,
            turns = report.turns,
            "phase summary"
        );
    }
    if let Some(path) = summary.path {
        tracing::info!(
            hops = path.hops,
            corners = path.corners,
            cost = path.cost,
            "fastest path"
        );
    }
    tracing::info!(
        goal = ?summary.goal,
        restarts = summary.restarts,
        cells = summary.total.cells_moved,
        moves = summary.total.move_commands,
        turns = summary.total.turns,
        "run complete"
    );
    tracing::debug!(
        "goal distances:\n{}",
        outcome.maze.render(DistanceField::Goal)
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let config = RunConfig::resolve(cli.config.as_deref())?;
    let mut mouse = config.mouse_config();
    if cli.no_annotate {
        mouse.annotate = false;
    }
    let settings = RunSettings {
        start: config.start,
        heading: config.heading,
        goal: cli.goal.or(config.goal),
        mouse,
        path_cost: config.path_cost(),
    };

    match offline_layout(&cli)? {
        Some(layout) => {
            tracing::info!(
                width = layout.width(),
                height = layout.height(),
                "running against the in-memory simulator"
            );
            tracing::debug!("maze layout:\n{layout}");
            let simulator = Simulator::new(layout, settings.start, settings.heading)
                .context("start cell lies outside the maze")?;
            let outcome = run(simulator, &settings)?;
            report(&outcome);
            let counts = outcome.protocol.counts();
            tracing::info!(
                wall_queries = counts.wall_queries,
                crashes = counts.crashes,
                "simulator statistics"
            );
        }
        None => {
            let mut protocol = TextProtocol::stdio();
            protocol.log("micromouse controller starting");
            let outcome = run(protocol, &settings)?;
            report(&outcome);
        }
    }
    Ok(())
}
