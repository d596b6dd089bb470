//! Game simulation - the main game loop.
//!
//! This module contains the deterministic tank simulation that can be run
//! identically on all clients for lockstep multiplayer.

use serde::{Deserialize, Serialize};
use tread_physics::{
    ConfigError, MotionConfig, MotionEvent, TankController, Team, TickReport, WorldError,
};

use crate::input::TankInput;
use crate::level::Level;
use crate::tank::{EntityId, Tank};

/// Game simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation tick rate (ticks per second).
    pub tick_rate: u32,

    /// Longest time step handed to the motion core; longer frames are split.
    pub max_sub_tick: f32,

    /// Seconds a dead tank waits before respawning.
    pub respawn_delay: f32,

    /// Tank motion configuration.
    pub motion: MotionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            max_sub_tick: 0.1,
            respawn_delay: 3.0,
            motion: MotionConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_rate",
                reason: "must be positive",
            });
        }
        if !(self.max_sub_tick > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_sub_tick",
                reason: "must be positive",
            });
        }
        if self.respawn_delay < 0.0 {
            return Err(ConfigError::Invalid {
                field: "respawn_delay",
                reason: "must not be negative",
            });
        }
        self.motion.validate()
    }

    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// Events one tank produced during a tick.
#[derive(Debug, Clone)]
pub struct TankReport {
    pub tank: EntityId,
    pub report: TickReport,
}

/// The main game simulation.
///
/// This contains all game state and advances it deterministically based on
/// tank inputs. For lockstep multiplayer, all clients run the same
/// simulation with the same inputs.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame/tick number.
    pub frame: u64,

    /// Simulated seconds since start.
    pub time: f32,

    /// Simulation configuration.
    pub config: SimulationConfig,

    /// Current level.
    pub level: Level,

    /// All tanks in the game.
    pub tanks: Vec<Tank>,

    /// Tank motion controller.
    controller: TankController,

    /// Next entity ID to assign.
    next_entity_id: EntityId,

    /// Spawns handed out so far, for rotating through spawn points.
    spawns: usize,
}

impl Simulation {
    /// Create a new simulation with the given configuration and level.
    pub fn new(config: SimulationConfig, level: Level) -> Self {
        let controller = TankController::new(config.motion.clone());

        Self {
            frame: 0,
            time: 0.0,
            config,
            level,
            tanks: Vec::new(),
            controller,
            next_entity_id: 1,
            spawns: 0,
        }
    }

    /// Create a simulation with default configuration and test arena.
    pub fn test() -> Result<Self, WorldError> {
        Ok(Self::new(SimulationConfig::default(), Level::test_arena()?))
    }

    /// Add a tank and spawn it.
    ///
    /// Returns the tank's ID.
    pub fn add_tank(&mut self, name: &str, team: Team) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let mut tank = Tank::new(id, name.to_string(), team);
        self.spawn(&mut tank);
        self.tanks.push(tank);
        id
    }

    /// Remove a tank from the simulation.
    pub fn remove_tank(&mut self, tank_id: EntityId) {
        self.tanks.retain(|t| t.id != tank_id);
    }

    /// Get a tank by ID.
    pub fn get_tank(&self, tank_id: EntityId) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.id == tank_id)
    }

    /// Get a mutable reference to a tank by ID.
    pub fn get_tank_mut(&mut self, tank_id: EntityId) -> Option<&mut Tank> {
        self.tanks.iter_mut().find(|t| t.id == tank_id)
    }

    /// Advance the simulation by one fixed tick.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Tank inputs indexed by tank position in the `tanks` array
    pub fn tick(&mut self, inputs: &[TankInput]) -> Vec<TankReport> {
        let dt = self.config.delta_time();
        let reports = self.advance(dt, inputs);
        self.frame += 1;
        reports
    }

    /// Advance by an arbitrary frame time, split into sub-ticks no longer
    /// than the configured cap.
    pub fn advance(&mut self, frame_time: f32, inputs: &[TankInput]) -> Vec<TankReport> {
        let mut reports: Vec<TankReport> = self
            .tanks
            .iter()
            .map(|t| TankReport {
                tank: t.id,
                report: TickReport::default(),
            })
            .collect();
        if !(frame_time > 0.0) || !frame_time.is_finite() {
            return reports;
        }

        let steps = (frame_time / self.config.max_sub_tick).ceil().max(1.0) as u32;
        let dt = frame_time / steps as f32;

        for _ in 0..steps {
            self.step(dt, inputs, &mut reports);
        }
        reports
    }

    fn step(&mut self, dt: f32, inputs: &[TankInput], reports: &mut [TankReport]) {
        let Self {
            tanks,
            level,
            controller,
            spawns,
            config,
            ..
        } = self;

        for (i, tank) in tanks.iter_mut().enumerate() {
            if tank.tick_respawn(dt) {
                spawn_tank(level, controller, spawns, tank);
                continue;
            }

            let input = inputs.get(i).cloned().unwrap_or_default();
            let control = input.to_control(&controller.config);
            let report = controller.update(&mut tank.state, &control, &level.world, dt);

            for event in report.iter() {
                match event {
                    MotionEvent::DeathDriver { message, .. } => {
                        if tank.explode() {
                            log::debug!(
                                "tank {} exploded: {}",
                                tank.id,
                                message.as_deref().unwrap_or("killed by the world")
                            );
                        }
                    }
                    MotionEvent::ExplosionFinished => tank.on_death(config.respawn_delay),
                    MotionEvent::Teleported { .. } => tank.teleports += 1,
                    _ => {}
                }
            }

            if let Some(slot) = reports.get_mut(i) {
                slot.report.events.extend(report.events);
            }
        }

        self.time += dt;
    }

    fn spawn(&mut self, tank: &mut Tank) {
        spawn_tank(&self.level, &self.controller, &mut self.spawns, tank);
    }

    /// Get the delta time for this simulation.
    pub fn delta_time(&self) -> f32 {
        self.config.delta_time()
    }
}

/// Place `tank` at the next spawn point open to its team.
fn spawn_tank(level: &Level, controller: &TankController, spawns: &mut usize, tank: &mut Tank) {
    let pose = level
        .spawn_for(tank.state.team, *spawns)
        .map(|s| s.pose())
        .unwrap_or_default();
    *spawns += 1;

    controller.spawn(&mut tank.state, pose, &level.world);
    log::debug!("tank {} ({}) spawned at {:?}", tank.id, tank.name, pose.position);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use crate::level::SpawnPoint;
    use tread_physics::{Location, ObstacleQuery, PhysicsDriver, Pose};

    fn forward() -> TankInput {
        let mut input = TankInput::default();
        input.movement.forward = true;
        input
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::test().unwrap();
        assert_eq!(sim.frame, 0);
        assert!(sim.tanks.is_empty());
    }

    #[test]
    fn test_add_tank() {
        let mut sim = Simulation::test().unwrap();

        let id = sim.add_tank("Tank1", Team::Red);
        assert!(id > 0);
        assert_eq!(sim.tanks.len(), 1);

        let tank = sim.get_tank(id).unwrap();
        assert_eq!(tank.name, "Tank1");
        assert!(tank.is_alive());
        assert_eq!(tank.location(), Location::OnGround);
    }

    #[test]
    fn test_tanks_rotate_through_spawns() {
        let mut sim = Simulation::test().unwrap();
        let a = sim.add_tank("A", Team::Red);
        let b = sim.add_tank("B", Team::Blue);

        let pa = sim.get_tank(a).unwrap().position();
        let pb = sim.get_tank(b).unwrap().position();
        assert_ne!(pa, pb);
    }

    #[test]
    fn test_tick_advances_frame() {
        let mut sim = Simulation::test().unwrap();
        sim.add_tank("Test", Team::Rogue);

        sim.tick(&[TankInput::default()]);
        assert_eq!(sim.frame, 1);

        sim.tick(&[TankInput::default()]);
        assert_eq!(sim.frame, 2);
    }

    #[test]
    fn test_movement_input() {
        let mut sim = Simulation::test().unwrap();
        let id = sim.add_tank("Test", Team::Rogue);

        let start_pos = sim.get_tank(id).unwrap().position();

        for _ in 0..30 {
            sim.tick(&[forward()]);
        }

        let end_pos = sim.get_tank(id).unwrap().position();
        let distance = (end_pos - start_pos).length();

        assert!(distance > 1.0, "Tank should have moved, distance={}", distance);
    }

    #[test]
    fn test_long_frames_are_split() {
        let mut sim = Simulation::test().unwrap();
        let id = sim.add_tank("Test", Team::Rogue);

        // Driving east from (-20, 0) towards the central block at x = -2
        sim.advance(2.0, &[forward()]);

        let tank = sim.get_tank(id).unwrap();
        let dims = sim.config.motion.dims();
        let front = tank.position().x + dims.length * 0.5;
        assert!(front <= -2.0 + 1e-3, "stopped at the block, front={front}");
        assert!(front > -2.5, "front={front}");
        assert!(
            sim.level
                .world
                .blocking_obstacle(tank.state.pose(), tank.state.pose(), dims, false)
                .is_none()
        );
    }

    #[test]
    fn test_death_driver_explodes_and_respawns() {
        let mut level = Level::new("pit", "Pit");
        level
            .world
            .add_driver_face(
                &[
                    Vec3::new(-10.0, -10.0, 1.0),
                    Vec3::new(10.0, -10.0, 1.0),
                    Vec3::new(10.0, 10.0, 1.0),
                    Vec3::new(-10.0, 10.0, 1.0),
                ],
                PhysicsDriver::death("burned"),
            )
            .unwrap();
        level.spawn_points.push(SpawnPoint::new(Vec3::new(0.0, 0.0, 1.0), 0.0));
        level.spawn_points.push(SpawnPoint::new(Vec3::new(30.0, 0.0, 0.0), 0.0));

        let config = SimulationConfig {
            respawn_delay: 0.5,
            motion: MotionConfig {
                explode_time: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut sim = Simulation::new(config, level);
        let id = sim.add_tank("Test", Team::Rogue);

        let reports = sim.tick(&[]);
        assert!(reports[0].report.death_driver().is_some());
        assert_eq!(sim.get_tank(id).unwrap().location(), Location::Exploding);

        let mut finished = false;
        for _ in 0..60 {
            let reports = sim.tick(&[]);
            finished |= reports[0]
                .report
                .iter()
                .any(|e| *e == MotionEvent::ExplosionFinished);
        }
        assert!(finished);

        let tank = sim.get_tank(id).unwrap();
        assert_eq!(tank.deaths, 1);
        assert!(tank.is_alive(), "respawned after the delay");
        assert_eq!(tank.position(), Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(tank.state.pose(), Pose::new(Vec3::new(30.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn test_config_validation() {
        assert!(SimulationConfig::default().validate().is_ok());

        let config = SimulationConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig::from_json(r#"{"tick_rate": 60, "motion": {"tank_speed": 10.0}}"#).unwrap();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.motion.tank_speed, 10.0);
        assert_eq!(config.respawn_delay, 3.0);

        assert!(SimulationConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_determinism() {
        // Run simulation twice with same inputs - should get same results
        let inputs: Vec<_> = (0..200)
            .map(|i| {
                let mut input = TankInput::default();
                input.movement.forward = i % 7 != 0;
                input.movement.left = (i / 20) % 2 == 0;
                input.actions.jump = i % 50 == 0;
                input
            })
            .collect();

        let run = || {
            let mut sim = Simulation::test().unwrap();
            sim.add_tank("A", Team::Red);
            sim.add_tank("B", Team::Green);
            for input in &inputs {
                sim.tick(&[input.clone(), input.clone()]);
            }
            sim.tanks.iter().map(|t| t.snapshot()).collect::<Vec<_>>()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second, "Simulations should be deterministic");
    }
}
