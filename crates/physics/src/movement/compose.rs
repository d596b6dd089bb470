//! Velocity composition.
//!
//! Turns the previous velocity, the control input and the tank's situation
//! into the candidate velocity the contact resolver will try to follow.
//! Nothing here touches the world; it only reads drivers and the ground
//! limit.

use glam::{Vec2, Vec3};

use super::config::MotionConfig;
use super::state::{ActorState, Capability, ControlInput, Location, MotionEvent, TickReport};
use crate::drivers::PhysicsDriver;
use crate::world::World;

/// Acceleration limits are expressed in units of this many per second.
const ACCELERATION_SCALE: f32 = 20.0;

/// Velocity and turn rate the tank tries to follow this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub velocity: Vec3,
    pub angular_velocity: f32,
}

impl Candidate {
    const STILL: Self = Self {
        velocity: Vec3::ZERO,
        angular_velocity: 0.0,
    };
}

/// Compose the candidate velocity for one tick.
pub fn compose_velocity<W: World + ?Sized>(
    state: &ActorState,
    input: &ControlInput,
    config: &MotionConfig,
    world: &W,
    dt: f32,
    report: &mut TickReport,
) -> Candidate {
    let ground_limit = world.ground_limit(state.capability);
    let z = state.position.z;

    let mut candidate = match state.location() {
        Location::Dead => return Candidate::STILL,

        Location::Exploding => Candidate {
            velocity: state.velocity + Vec3::Z * (config.gravity * dt),
            angular_velocity: 0.0,
        },

        _ if state.is_paused() => return Candidate::STILL,

        location
            if location.is_grounded()
                || (location == Location::InBuilding && z == ground_limit) =>
        {
            grounded(state, input, config, world, dt, report)
        }

        _ => airborne(state, input, config, dt),
    };

    // However the tank got below the ground limit, creep back up.
    if z < ground_limit {
        let depth = ground_limit - z;
        candidate.velocity.z = candidate.velocity.z.max(depth * 0.5 + 0.5);
    }

    candidate
}

fn grounded<W: World + ?Sized>(
    state: &ActorState,
    input: &ControlInput,
    config: &MotionConfig,
    world: &W,
    dt: f32,
    report: &mut TickReport,
) -> Candidate {
    let driver = state.physics_driver.and_then(|id| world.driver(id));
    let slide = driver.filter(|d| d.is_slide);

    let (speed, angular_velocity) = match slide {
        Some(_) => (input.desired_speed, input.desired_angular_velocity),
        None => limit_momentum(state, input, config, dt),
    };

    let heading = half_step_heading(state.azimuth, angular_velocity, dt);
    let desired = heading * speed;

    let mut velocity = Vec3::ZERO;
    match slide {
        Some(driver) => {
            let horizontal = slide_blend(state.velocity.truncate(), desired, driver.slide_time, dt);
            velocity.x = horizontal.x;
            velocity.y = horizontal.y;
        }
        None => {
            let horizontal = limit_friction(state, desired, config, dt);
            velocity.x = horizontal.x;
            velocity.y = horizontal.y;
        }
    }

    let mut candidate = Candidate {
        velocity,
        angular_velocity,
    };

    if let (Some(driver), None) = (driver, slide) {
        apply_driver(&mut candidate, driver, state.position);
        if driver.linear_velocity.z > 0.0 {
            if let Some(id) = state.physics_driver {
                report.push(MotionEvent::Bounced { driver: id });
            }
        }
    }

    candidate
}

fn airborne(state: &ActorState, input: &ControlInput, config: &MotionConfig, dt: f32) -> Candidate {
    let mut velocity = state.velocity;
    let mut angular_velocity = state.angular_velocity;

    let gravity = if state.capability == Capability::Wings {
        let (speed, turn) = limit_momentum(state, input, config, dt);
        angular_velocity = turn;
        let desired = half_step_heading(state.azimuth, turn, dt) * speed;
        let horizontal = if config.wings_slide_time > 0.0 {
            slide_blend(state.velocity.truncate(), desired, config.wings_slide_time, dt)
        } else {
            desired
        };
        velocity.x = horizontal.x;
        velocity.y = horizontal.y;
        config.wings_gravity
    } else {
        config.gravity
    };

    velocity.z += gravity * dt;
    Candidate {
        velocity,
        angular_velocity,
    }
}

/// Heading halfway through the turn so straight-line steps do not drift.
#[inline]
fn half_step_heading(azimuth: f32, angular_velocity: f32, dt: f32) -> Vec2 {
    let (sin, cos) = (azimuth + 0.5 * dt * angular_velocity).sin_cos();
    Vec2::new(cos, sin)
}

/// Bound the change in forward speed and turn rate.
fn limit_momentum(
    state: &ActorState,
    input: &ControlInput,
    config: &MotionConfig,
    dt: f32,
) -> (f32, f32) {
    let (linear, angular) = if state.capability == Capability::Momentum {
        (
            config.momentum_linear_acceleration,
            config.momentum_angular_acceleration,
        )
    } else {
        (config.linear_acceleration, config.angular_acceleration)
    };

    let mut speed = input.desired_speed;
    if linear > 0.0 {
        let (sin, cos) = state.azimuth.sin_cos();
        let last_speed = state.velocity.truncate().dot(Vec2::new(cos, sin));
        let step = dt * ACCELERATION_SCALE * linear;
        speed = speed.clamp(last_speed - step, last_speed + step);
    }

    let mut angular_velocity = input.desired_angular_velocity;
    if angular > 0.0 {
        let step = dt * angular;
        angular_velocity = angular_velocity.clamp(
            state.angular_velocity - step,
            state.angular_velocity + step,
        );
    }

    (speed, angular_velocity)
}

/// Bound the horizontal acceleration on the ground.
fn limit_friction(state: &ActorState, desired: Vec2, config: &MotionConfig, dt: f32) -> Vec2 {
    let friction = if state.capability == Capability::Momentum {
        config.momentum_friction
    } else {
        config.friction
    };
    if friction <= 0.0 {
        return desired;
    }

    let old = state.velocity.truncate();
    let delta = desired - old;
    let limit = ACCELERATION_SCALE * friction * dt;
    if delta.length() > limit {
        old + delta.normalize_or_zero() * limit
    } else {
        desired
    }
}

/// Exponential-ish approach of `old` towards `desired` over `slide_time`.
pub fn slide_blend(old: Vec2, desired: Vec2, slide_time: f32, dt: f32) -> Vec2 {
    if slide_time <= 0.0 || dt >= slide_time {
        return desired;
    }
    old + (desired - old) * (dt / slide_time)
}

fn apply_driver(candidate: &mut Candidate, driver: &PhysicsDriver, position: Vec3) {
    let field = driver.field_velocity(position);
    candidate.velocity.x += driver.linear_velocity.x + field.x;
    candidate.velocity.y += driver.linear_velocity.y + field.y;
    candidate.angular_velocity += driver.angular_velocity;
    if driver.linear_velocity.z > 0.0 {
        candidate.velocity.z = driver.linear_velocity.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Pose;
    use crate::world::StaticWorld;
    use std::f32::consts::FRAC_PI_2;

    fn grounded_tank() -> ActorState {
        let mut state = ActorState::default();
        state.respawn(Pose::default(), Location::OnGround);
        state
    }

    fn compose(state: &ActorState, input: ControlInput, config: &MotionConfig, world: &StaticWorld) -> Candidate {
        compose_velocity(state, &input, config, world, 0.1, &mut TickReport::default())
    }

    #[test]
    fn test_dead_and_paused_hold_still() {
        let world = StaticWorld::new();
        let config = MotionConfig::default();
        let input = ControlInput::new(10.0, 1.0);

        let dead = ActorState::default();
        assert_eq!(compose(&dead, input, &config, &world), Candidate::STILL);

        let mut paused = grounded_tank();
        paused.velocity = Vec3::X;
        paused.set_paused(true);
        assert_eq!(compose(&paused, input, &config, &world), Candidate::STILL);
    }

    #[test]
    fn test_ground_follows_input_along_half_step_heading() {
        let world = StaticWorld::new();
        let config = MotionConfig::default();
        let state = grounded_tank();

        let candidate = compose(&state, ControlInput::new(10.0, FRAC_PI_2), &config, &world);
        let expected = 0.5 * 0.1 * FRAC_PI_2;
        let heading = candidate.velocity.y.atan2(candidate.velocity.x);
        assert!((heading - expected).abs() < 1e-5, "heading={heading}");
        assert!((candidate.velocity.truncate().length() - 10.0).abs() < 1e-4);
        assert_eq!(candidate.velocity.z, 0.0);
        assert_eq!(candidate.angular_velocity, FRAC_PI_2);
    }

    #[test]
    fn test_momentum_limits_acceleration() {
        let world = StaticWorld::new();
        let config = MotionConfig::momentum();
        let state = grounded_tank();

        let candidate = compose(&state, ControlInput::new(25.0, 0.0), &config, &world);
        // 20 * 0.5 * 0.1 = 1.0
        assert!((candidate.velocity.x - 1.0).abs() < 1e-5, "v={:?}", candidate.velocity);
    }

    #[test]
    fn test_airborne_keeps_velocity_and_falls() {
        let world = StaticWorld::new();
        let config = MotionConfig::default();
        let mut state = grounded_tank();
        state.set_location(Location::InAir);
        state.position.z = 5.0;
        state.velocity = Vec3::new(3.0, 0.0, 0.0);

        let candidate = compose(&state, ControlInput::new(20.0, 1.0), &config, &world);
        assert_eq!(candidate.velocity.x, 3.0, "no air control without wings");
        assert!((candidate.velocity.z - config.gravity * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_wings_give_air_control() {
        let world = StaticWorld::new();
        let config = MotionConfig::default();
        let mut state = grounded_tank();
        state.set_location(Location::InAir);
        state.position.z = 5.0;
        state.capability = Capability::Wings;

        let candidate = compose(&state, ControlInput::new(20.0, 0.0), &config, &world);
        assert!((candidate.velocity.x - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_below_ground_creeps_up() {
        let world = StaticWorld::new();
        let config = MotionConfig::default();
        let mut state = grounded_tank();
        state.set_location(Location::InAir);
        state.position.z = -1.0;
        state.velocity = Vec3::new(0.0, 0.0, -5.0);

        let candidate = compose(&state, ControlInput::default(), &config, &world);
        assert!((candidate.velocity.z - 1.0).abs() < 1e-6, "vz={}", candidate.velocity.z);
    }

    #[test]
    fn test_driver_overlay() {
        let mut world = StaticWorld::new();
        let conveyor = world.drivers.add(PhysicsDriver::linear(Vec3::new(1.0, 0.0, 0.0)));
        let spinner = world.drivers.add(PhysicsDriver::spinning(1.0, glam::Vec2::ZERO));
        let config = MotionConfig::default();

        let mut state = grounded_tank();
        state.physics_driver = Some(conveyor);
        let candidate = compose(&state, ControlInput::default(), &config, &world);
        assert_eq!(candidate.velocity, Vec3::new(1.0, 0.0, 0.0));

        state.physics_driver = Some(spinner);
        state.position = Vec3::new(2.0, 0.0, 0.0);
        let candidate = compose(&state, ControlInput::default(), &config, &world);
        assert!((candidate.velocity.y - 2.0).abs() < 1e-6);
        assert_eq!(candidate.angular_velocity, 1.0);
    }

    #[test]
    fn test_slide_driver_blends() {
        let mut world = StaticWorld::new();
        let ice = world.drivers.add(PhysicsDriver::slide(1.0));
        let config = MotionConfig::default();

        let mut state = grounded_tank();
        state.physics_driver = Some(ice);
        let candidate = compose(&state, ControlInput::new(10.0, 0.0), &config, &world);
        // dt / slide_time = 0.1 of the way there
        assert!((candidate.velocity.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounce_driver_reports() {
        let mut world = StaticWorld::new();
        let pad = world.drivers.add(PhysicsDriver::linear(Vec3::new(0.0, 0.0, 30.0)));
        let config = MotionConfig::default();

        let mut state = grounded_tank();
        state.physics_driver = Some(pad);
        let mut report = TickReport::default();
        let candidate =
            compose_velocity(&state, &ControlInput::default(), &config, &world, 0.1, &mut report);
        assert_eq!(candidate.velocity.z, 30.0);
        assert_eq!(report.events, vec![MotionEvent::Bounced { driver: pad }]);
    }
}
