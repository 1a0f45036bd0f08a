use micromouse_core::{CellCoord, Color, Direction, Protocol};
use micromouse_maze::{DistanceField, Maze, MazeError};
use micromouse_protocol::{Simulator, WallLayout};
use micromouse_system_mouse::{
    straight_runs, Mouse, MouseConfig, MouseError, PathStart, PhaseReport,
};

fn mouse_in(layout: WallLayout, start: CellCoord, heading: Direction) -> Mouse<Simulator> {
    let maze = Maze::new(layout.width(), layout.height()).expect("maze");
    let simulator = Simulator::new(layout, start, heading).expect("simulator");
    Mouse::new(simulator, maze, start, heading, MouseConfig::default()).expect("mouse")
}

/// 3x3 maze whose only route snakes east, west, then east again.
fn serpentine() -> WallLayout {
    let mut layout = WallLayout::open(3, 3).expect("layout");
    for (x, y) in [(0, 0), (1, 0), (1, 1), (2, 1)] {
        layout
            .add_wall(CellCoord::new(x, y), Direction::North)
            .expect("wall");
    }
    layout
}

/// Maze knowledge matching `layout` exactly, every cell confirmed.
fn fully_known(layout: &WallLayout) -> Maze {
    let mut maze = Maze::new(layout.width(), layout.height()).expect("maze");
    for cell in layout.coords() {
        for direction in Direction::ALL {
            if layout.has_wall(cell, direction) {
                maze.set_wall(cell, direction).expect("wall");
            }
        }
        let _ = maze.confirm(cell).expect("cell");
    }
    maze
}

#[test]
fn single_cell_maze_needs_no_moves() {
    let origin = CellCoord::new(0, 0);
    let mut mouse = mouse_in(WallLayout::open(1, 1).expect("layout"), origin, Direction::North);

    let report = mouse.explore_to(origin).expect("explore");

    assert_eq!(report, PhaseReport::default());
    assert_eq!(mouse.protocol().counts().move_commands, 0);
}

#[test]
fn two_cell_corridor_takes_one_turn_and_one_move() {
    let mut mouse = mouse_in(
        WallLayout::open(2, 1).expect("layout"),
        CellCoord::new(0, 0),
        Direction::North,
    );

    let report = mouse.explore_to(CellCoord::new(1, 0)).expect("explore");

    assert_eq!(
        report,
        PhaseReport {
            cells_moved: 1,
            move_commands: 1,
            turns: 1
        }
    );
    assert_eq!(mouse.position(), CellCoord::new(1, 0));
    assert_eq!(mouse.heading(), Direction::East);
    let maze = mouse.maze();
    assert_eq!(
        maze.distance(CellCoord::new(0, 0), DistanceField::Goal),
        Ok(Some(1))
    );
    assert_eq!(
        maze.distance(CellCoord::new(1, 0), DistanceField::Goal),
        Ok(Some(0))
    );
    assert_eq!(mouse.protocol().text(CellCoord::new(0, 0)), Some("1"));
    assert_eq!(
        mouse.protocol().color(CellCoord::new(0, 0)),
        Some(Color::Blue)
    );
}

#[test]
fn exploration_never_revokes_confirmation() {
    let layout = WallLayout::generate(5, 5, 11).expect("layout");
    let mut mouse = mouse_in(layout, CellCoord::new(0, 0), Direction::North);

    let _ = mouse.explore_to(CellCoord::new(2, 2)).expect("explore");
    let confirmed: Vec<CellCoord> = mouse
        .maze()
        .cells()
        .iter()
        .filter(|cell| cell.is_confirmed())
        .map(|cell| cell.position())
        .collect();
    let _ = mouse
        .return_to_start(CellCoord::new(0, 0), CellCoord::new(2, 2))
        .expect("return");

    for cell in confirmed {
        assert!(mouse.maze().is_confirmed(cell).expect("cell"));
    }
}

#[test]
fn explored_cells_form_the_trail() {
    let layout = WallLayout::generate(6, 4, 5).expect("layout");
    let mut mouse = mouse_in(layout, CellCoord::new(0, 0), Direction::North);

    let report = mouse.explore_to(CellCoord::new(3, 2)).expect("explore");

    let trail = mouse.protocol().trail();
    assert_eq!(u32::try_from(trail.len() - 1).expect("small"), report.cells_moved);
    for cell in trail {
        assert!(mouse.maze().is_confirmed(*cell).expect("cell"));
    }
    assert_eq!(mouse.protocol().counts().crashes, 0);
}

#[test]
fn fast_search_follows_confirmed_cells() {
    let layout = serpentine();
    let mut maze = fully_known(&layout);
    let goal = CellCoord::new(2, 2);
    let _ = maze
        .propagate_distances(goal, DistanceField::Goal)
        .expect("flood");
    let start = CellCoord::new(0, 0);
    let simulator = Simulator::new(layout, start, Direction::North).expect("simulator");
    let mut mouse =
        Mouse::new(simulator, maze, start, Direction::North, MouseConfig::default()).expect("mouse");

    let report = mouse.find_goal_fast(goal).expect("fast search");

    assert_eq!(mouse.position(), goal);
    assert_eq!(
        report,
        PhaseReport {
            cells_moved: 8,
            move_commands: 8,
            turns: 5
        }
    );
}

#[test]
fn fast_search_without_confirmed_neighbors_fails() {
    let mut mouse = mouse_in(
        WallLayout::open(3, 1).expect("layout"),
        CellCoord::new(0, 0),
        Direction::East,
    );

    let error = mouse.find_goal_fast(CellCoord::new(2, 0)).unwrap_err();

    assert!(matches!(error, MouseError::NoCandidates { at } if at == CellCoord::new(0, 0)));
}

#[test]
fn fast_search_turns_out_of_a_dead_end_without_sensing() {
    let layout = WallLayout::open(3, 1).expect("layout");
    let mut maze = fully_known(&layout);
    let goal = CellCoord::new(0, 0);
    let _ = maze
        .propagate_distances(goal, DistanceField::Goal)
        .expect("flood");
    let start = CellCoord::new(2, 0);
    let simulator = Simulator::new(layout, start, Direction::East).expect("simulator");
    let mut mouse =
        Mouse::new(simulator, maze, start, Direction::East, MouseConfig::default()).expect("mouse");
    let queries_before = mouse.protocol().counts().wall_queries;
    let marked_before = mouse.protocol().marked_wall_count();

    let report = mouse.find_goal_fast(goal).expect("fast search");

    assert_eq!(mouse.position(), goal);
    assert_eq!(report.move_commands, 2);
    // Only the pre-move front checks reach the protocol.
    assert_eq!(
        mouse.protocol().counts().wall_queries - queries_before,
        report.move_commands
    );
    assert_eq!(mouse.protocol().marked_wall_count(), marked_before);
}

#[test]
fn replay_compacts_straight_runs() {
    let layout = serpentine();
    let maze = fully_known(&layout);
    let start = CellCoord::new(0, 0);
    let simulator = Simulator::new(layout, start, Direction::North).expect("simulator");
    let mut mouse =
        Mouse::new(simulator, maze, start, Direction::North, MouseConfig::default()).expect("mouse");
    let path = mouse
        .maze()
        .find_fastest_path(start, CellCoord::new(2, 2))
        .expect("path");

    let report = mouse.follow_path(path.cells()).expect("replay");

    assert_eq!(straight_runs(path.cells()).expect("runs").len(), 5);
    assert_eq!(
        report,
        PhaseReport {
            cells_moved: 8,
            move_commands: 5,
            turns: 5
        }
    );
    // The simulator saw exactly the cells of the path, in order.
    assert_eq!(mouse.protocol().trail(), path.cells());
    for &cell in path.cells() {
        assert_eq!(mouse.protocol().color(cell), Some(Color::Yellow));
    }
}

#[test]
fn replay_does_not_confirm_cells() {
    let mut mouse = mouse_in(
        WallLayout::open(4, 1).expect("layout"),
        CellCoord::new(0, 0),
        Direction::East,
    );
    let path: Vec<CellCoord> = (0..4).map(|x| CellCoord::new(x, 0)).collect();

    let report = mouse.follow_path(&path).expect("replay");

    assert_eq!(report.move_commands, 1);
    assert_eq!(mouse.position(), CellCoord::new(3, 0));
    for cell in &path[1..] {
        assert!(!mouse.maze().is_confirmed(*cell).expect("cell"));
        assert!(mouse.has_visited(*cell));
    }
    assert!(mouse.is_exploring());
}

#[test]
fn failed_replay_restores_exploration_mode() {
    let layout = WallLayout::open(3, 1)
        .and_then(|layout| layout.with_wall(CellCoord::new(1, 0), Direction::East))
        .expect("layout");
    let mut mouse = mouse_in(layout, CellCoord::new(0, 0), Direction::East);
    let path: Vec<CellCoord> = (0..3).map(|x| CellCoord::new(x, 0)).collect();

    let error = mouse.follow_path(&path).unwrap_err();

    assert!(matches!(error, MouseError::Crashed { .. }));
    assert!(mouse.is_exploring());
}

#[test]
fn replay_must_start_at_the_mouse() {
    let mut mouse = mouse_in(
        WallLayout::open(3, 1).expect("layout"),
        CellCoord::new(0, 0),
        Direction::East,
    );

    assert!(matches!(
        mouse.follow_path(&[]),
        Err(MouseError::PathStartMismatch {
            actual: PathStart::Empty,
            ..
        })
    ));
    assert!(matches!(
        mouse.follow_path(&[CellCoord::new(1, 0), CellCoord::new(2, 0)]),
        Err(MouseError::PathStartMismatch { expected, actual })
            if expected == CellCoord::new(0, 0)
                && actual == PathStart::Cell(CellCoord::new(1, 0))
    ));
    assert_eq!(mouse.protocol().counts().move_commands, 0);
}

#[test]
fn unreachable_goal_exhausts_the_step_budget() {
    // Sensing both walls in front of the goal leaves every distance unknown,
    // and no cell has three closed sides, so the mouse wanders until the cap.
    let layout = WallLayout::open(3, 3)
        .and_then(|layout| layout.with_wall(CellCoord::new(2, 2), Direction::West))
        .and_then(|layout| layout.with_wall(CellCoord::new(2, 2), Direction::South))
        .expect("layout");
    let maze = Maze::new(3, 3).expect("maze");
    let start = CellCoord::new(0, 0);
    let simulator = Simulator::new(layout, start, Direction::North).expect("simulator");
    let config = MouseConfig {
        step_limit: 50,
        ..MouseConfig::default()
    };
    let mut mouse = Mouse::new(simulator, maze, start, Direction::North, config).expect("mouse");

    let error = mouse.explore_to(CellCoord::new(2, 2)).unwrap_err();

    assert!(matches!(error, MouseError::StepLimitExceeded { limit: 50 }));
    assert!(!error.is_recoverable());
    let goal = CellCoord::new(2, 2);
    assert!(mouse.maze().has_wall(goal, Direction::West).expect("cell"));
    assert!(mouse.maze().has_wall(goal, Direction::South).expect("cell"));
    assert_eq!(mouse.maze().distance(start, DistanceField::Goal), Ok(None));
    assert_eq!(mouse.protocol().counts().crashes, 0);
}

#[test]
fn search_exhaustion_is_recoverable() {
    let error = MouseError::from(MazeError::SearchExhausted {
        start: CellCoord::new(0, 0),
        goal: CellCoord::new(1, 1),
    });
    assert!(error.is_recoverable());
}

#[test]
fn goal_outside_the_maze_is_rejected() {
    let mut mouse = mouse_in(
        WallLayout::open(2, 2).expect("layout"),
        CellCoord::new(0, 0),
        Direction::North,
    );
    assert!(matches!(
        mouse.explore_to(CellCoord::new(5, 5)),
        Err(MouseError::Maze(MazeError::OutOfBounds { .. }))
    ));
}

#[test]
fn full_run_on_generated_mazes() {
    for seed in 0..6 {
        let layout = WallLayout::generate(8, 8, seed).expect("layout");
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(4, 4);
        let mut mouse = mouse_in(layout, start, Direction::North);

        let explored = mouse.explore_to(goal).expect("explore");
        assert!(explored.cells_moved >= start.manhattan_distance(goal));
        assert_eq!(mouse.position(), goal);

        let _ = mouse.return_to_start(start, goal).expect("return");
        assert_eq!(mouse.position(), start);

        let path = mouse
            .maze()
            .find_fastest_path(start, goal)
            .expect("explored route is confirmed");
        let trail_before = mouse.protocol().trail().len();
        let replay = mouse.follow_path(path.cells()).expect("replay");
        assert_eq!(mouse.position(), goal);
        assert_eq!(
            replay.move_commands,
            u32::try_from(straight_runs(path.cells()).expect("runs").len()).expect("small")
        );
        assert_eq!(&mouse.protocol().trail()[trail_before - 1..], path.cells());

        let fast = mouse.find_goal_fast(goal).expect("fast search");
        assert_eq!(fast, PhaseReport::default());

        let simulator = mouse.protocol();
        assert_eq!(simulator.counts().crashes, 0, "seed {seed} crashed");
        assert_eq!(simulator.position(), goal);
    }
}

#[test]
fn reset_between_phases_restarts_from_the_start_pose() {
    let layout = WallLayout::generate(4, 4, 2).expect("layout");
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(2, 2);
    let mut mouse = mouse_in(layout, start, Direction::North);
    let _ = mouse.explore_to(goal).expect("explore");

    mouse.protocol_mut().trigger_reset();
    assert!(mouse.protocol_mut().was_reset().expect("poll"));
    mouse.protocol_mut().ack_reset().expect("ack");
    mouse.restart(start, Direction::North).expect("restart");

    let _ = mouse.explore_to(goal).expect("second exploration");
    assert_eq!(mouse.position(), goal);
    assert_eq!(mouse.protocol().position(), goal);
}
