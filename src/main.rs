//! Tread - headless runner
//!
//! Drives the test arena with scripted tank input and prints one JSON
//! snapshot line per tank at a fixed interval.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde::Serialize;
use tread_game::input::{ActionInput, MovementInput};
use tread_game::{
    Level, MotionEvent, MotionSnapshot, Simulation, SimulationConfig, TankInput, Team,
};

const TEAMS: [Team; 4] = [Team::Red, Team::Green, Team::Blue, Team::Purple];

/// Tread tank motion runner
#[derive(Parser)]
#[command(version, about = "Runs the tread test arena headless and prints tank snapshots")]
struct Cli {
    /// Simulation config as JSON; missing fields keep their defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 300)]
    ticks: u32,

    /// Number of tanks to add.
    #[arg(long, default_value_t = 2)]
    tanks: u32,

    /// Print snapshots every N ticks.
    #[arg(long, default_value_t = 30)]
    every: u32,

    /// Advance by this many seconds per frame instead of the fixed tick,
    /// letting the simulation split it into sub-ticks.
    #[arg(long, value_name = "SECONDS")]
    frame_time: Option<f32>,
}

#[derive(Serialize)]
struct Line<'a> {
    frame: u64,
    time: f32,
    tank: u32,
    name: &'a str,
    snapshot: MotionSnapshot,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}: {e}", path.display());
                process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };

    let level = match Level::test_arena() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error building arena: {e}");
            process::exit(1);
        }
    };

    log::info!(
        "running {} for {} ticks at {} Hz with {} tanks",
        level.name,
        cli.ticks,
        config.tick_rate,
        cli.tanks
    );

    let mut sim = Simulation::new(config, level);
    for i in 0..cli.tanks {
        let team = TEAMS[i as usize % TEAMS.len()];
        sim.add_tank(&format!("tank-{i}"), team);
    }

    let every = cli.every.max(1);
    for tick in 0..cli.ticks {
        let inputs: Vec<TankInput> = (0..sim.tanks.len()).map(|i| scripted_input(tick, i)).collect();
        let reports = match cli.frame_time {
            Some(frame_time) => {
                let reports = sim.advance(frame_time, &inputs);
                sim.frame += 1;
                reports
            }
            None => sim.tick(&inputs),
        };

        for report in &reports {
            for event in report.report.iter() {
                log_event(report.tank, event);
            }
        }

        if tick % every == 0 || tick + 1 == cli.ticks {
            print_snapshots(&sim);
        }
    }
}

fn load_config(path: &Path) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(SimulationConfig::from_json(&json)?)
}

/// Each tank drives forward, weaving with a period offset by its index.
fn scripted_input(tick: u32, index: usize) -> TankInput {
    let phase = (tick as usize + index * 17) / 45;
    TankInput {
        movement: MovementInput {
            forward: tick % 90 != 0,
            backward: false,
            left: phase % 3 == 0,
            right: phase % 3 == 1,
        },
        analog: None,
        actions: ActionInput {
            jump: (tick as usize + index * 7) % 120 == 0,
        },
        frame: tick,
    }
}

fn log_event(tank: u32, event: &MotionEvent) {
    match event {
        MotionEvent::Teleported { source, dest, .. } => {
            log::info!("tank {tank} teleported {source:?} -> {dest:?}")
        }
        MotionEvent::DeathDriver { message, .. } => {
            log::info!("tank {tank} died: {}", message.as_deref().unwrap_or("killed"))
        }
        MotionEvent::ExplosionFinished => log::info!("tank {tank} finished exploding"),
        other => log::debug!("tank {tank}: {other:?}"),
    }
}

fn print_snapshots(sim: &Simulation) {
    for tank in &sim.tanks {
        let line = Line {
            frame: sim.frame,
            time: sim.time,
            tank: tank.id,
            name: &tank.name,
            snapshot: tank.snapshot(),
        };
        match serde_json::to_string(&line) {
            Ok(json) => println!("{json}"),
            Err(e) => log::warn!("failed to serialize tank {}: {e}", tank.id),
        }
    }
}
