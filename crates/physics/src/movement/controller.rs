//! Tank motion controller.
//!
//! This is the main entry point for tank motion. It takes the control input
//! for a tick and advances the tank's state through the world, running the
//! velocity composer, the contact resolver, the teleport handler and the
//! location state machine in that order.

use glam::Vec3;

use super::compose::compose_velocity;
use super::config::MotionConfig;
use super::resolve::{find_support, resolve_motion, Motion};
use super::state::{ActorState, Capability, ControlInput, Location, MotionEvent, StatusFlags, TickReport};
use super::teleport::{handle_teleport, Passage};
use crate::collision::{ObstacleQuery, Pose};
use crate::world::World;

/// Tank motion controller.
///
/// Stateless apart from its configuration; every per-tank value lives in
/// [`ActorState`], so one controller can drive any number of tanks.
///
/// # Example
///
/// ```ignore
/// let controller = TankController::new(MotionConfig::default());
/// let mut state = ActorState::new(Team::Red);
/// controller.spawn(&mut state, spawn_pose, &world);
///
/// // Each tick:
/// let report = controller.update(&mut state, &input, &world, dt);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TankController {
    pub config: MotionConfig,
}

impl TankController {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(MotionConfig::default())
    }

    /// Bring a tank to life at `pose`.
    ///
    /// Tanks below the ground limit are lifted to it. The tank starts on
    /// the ground, on a building when something holds it up, or in the air.
    pub fn spawn<W: ObstacleQuery + ?Sized>(&self, state: &mut ActorState, pose: Pose, world: &W) {
        let ground_limit = world.ground_limit(state.capability);
        let mut pose = pose;
        pose.position.z = pose.position.z.max(ground_limit);

        let location = if pose.position.z <= ground_limit {
            Location::OnGround
        } else if find_support(world, pose, false, &self.config).is_some() {
            Location::OnBuilding
        } else {
            Location::InAir
        };

        log::debug!("spawn at {:?} ({location:?})", pose.position);
        state.respawn(pose, location);
    }

    /// Start a jump. Grounded tanks always can; winged tanks may also jump
    /// in the air while flaps remain.
    pub fn jump(&self, state: &mut ActorState) -> bool {
        if !state.is_alive() || state.is_paused() {
            return false;
        }

        let location = state.location();
        if location.is_grounded() {
            state.flaps_remaining = match state.capability {
                Capability::Wings => self.config.wings_jump_count,
                _ => 0,
            };
        } else if state.capability == Capability::Wings && state.flaps_remaining > 0 {
            state.flaps_remaining -= 1;
        } else {
            return false;
        }

        state.velocity.z = self.config.jump_velocity;
        state.set_location(Location::InAir);
        true
    }

    /// Advance one tank by one tick.
    ///
    /// # Arguments
    ///
    /// * `state` - The tank's motion state (will be modified)
    /// * `input` - Control input for this tick
    /// * `world` - Obstacles, drivers and links (read only)
    /// * `dt` - Time step in seconds; callers split long frames
    pub fn update<W: World + ?Sized>(
        &self,
        state: &mut ActorState,
        input: &ControlInput,
        world: &W,
        dt: f32,
    ) -> TickReport {
        let mut report = TickReport::default();
        if !(dt > 0.0) || !dt.is_finite() {
            return report;
        }

        match state.location() {
            Location::Dead => {
                state.velocity = Vec3::ZERO;
                state.angular_velocity = 0.0;
                return report;
            }
            Location::Exploding => {
                state.explode_elapsed += dt;
                if state.explode_elapsed >= self.config.explode_time {
                    log::debug!("explosion finished after {:.2}s", state.explode_elapsed);
                    state.kill();
                    report.push(MotionEvent::ExplosionFinished);
                    return report;
                }
            }
            _ if state.is_paused() => {
                state.velocity = Vec3::ZERO;
                state.angular_velocity = 0.0;
                return report;
            }
            _ => {}
        }

        state.clock += dt;
        if input.jump {
            self.jump(state);
        }

        let start = state.pose();
        let previous_location = state.location();
        let ground_limit = world.ground_limit(state.capability);

        let candidate = compose_velocity(state, input, &self.config, world, dt, &mut report);
        let motion = Motion {
            start,
            velocity: candidate.velocity,
            angular_velocity: candidate.angular_velocity,
            dt,
            location: previous_location,
            phased: state.is_phased(),
            ground_limit,
        };
        let resolution = resolve_motion(world, &motion, &self.config);

        state.set_pose(resolution.pose);
        state.velocity = resolution.velocity;
        state.angular_velocity = resolution.angular_velocity;
        state.last_obstacle = resolution.last_obstacle;
        state.set_location(resolution.location);

        if let Some(obstacle) = resolution.stuck {
            report.push(MotionEvent::Stuck { obstacle });
        }
        if let Some(bump) = resolution.bump {
            report.push(MotionEvent::Bumped {
                obstacle: bump.obstacle,
                height: bump.height,
            });
        }

        if state.is_alive() {
            if previous_location == Location::InAir && resolution.location.is_grounded() {
                report.push(MotionEvent::Landed {
                    speed: (-candidate.velocity.z).max(0.0),
                });
            }

            self.attach_driver(state, world, &mut report);

            if state.capability == Capability::Burrow && start.position.z >= 0.0 && state.position.z < 0.0 {
                report.push(MotionEvent::Burrowed);
            }

            let passage = Passage {
                previous: start,
                previous_location,
                entry_velocity: candidate.velocity,
                touched: resolution.touched_link,
            };
            handle_teleport(state, &passage, world, &self.config, &mut report);

            if state.location().is_grounded() {
                state.flaps_remaining = match state.capability {
                    Capability::Wings => self.config.wings_jump_count,
                    _ => 0,
                };
            }
            state.crossing_plane = world.crossing_plane(state.pose(), self.config.dims());
        } else {
            state.physics_driver = None;
            state.crossing_plane = None;
        }

        state
            .status
            .set(StatusFlags::CROSSING_WALL, state.crossing_plane.is_some());
        state.status.set(
            StatusFlags::FALLING,
            state.location() == Location::InAir && state.velocity.z < 0.0,
        );

        log::trace!(
            "tick pos={:?} vel={:?} loc={:?} steps={}",
            state.position,
            state.velocity,
            state.location(),
            resolution.steps
        );

        report
    }

    /// Pick up the driver of the last touched obstacle.
    fn attach_driver<W: World + ?Sized>(&self, state: &mut ActorState, world: &W, report: &mut TickReport) {
        state.physics_driver = state
            .last_obstacle
            .and_then(|id| world.obstacle(id))
            .and_then(|obstacle| obstacle.physics_driver());
        state.death_driver = None;

        let Some(id) = state.physics_driver else {
            return;
        };
        if let Some(driver) = world.driver(id).filter(|driver| driver.is_death) {
            log::debug!("touched death driver {id:?}");
            state.death_driver = Some(id);
            report.push(MotionEvent::DeathDriver {
                driver: id,
                message: driver.death_message.clone(),
            });
        }
    }
}
