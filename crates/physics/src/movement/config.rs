//! Motion configuration constants.
//!
//! All motion parameters are grouped here for easy tuning. Defaults follow
//! the classic tank game feel: world units, seconds, radians.

use serde::{Deserialize, Serialize};

use crate::collision::TankDimensions;
use crate::error::ConfigError;

/// Configuration for tank motion physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    // ========================================================================
    // Tank Dimensions
    // ========================================================================
    /// Extent along the heading.
    pub tank_length: f32,

    /// Extent across the heading.
    pub tank_width: f32,

    pub tank_height: f32,

    // ========================================================================
    // Speeds
    // ========================================================================
    /// Top forward speed (units/second).
    pub tank_speed: f32,

    /// Top turn rate (radians/second).
    pub tank_angular_velocity: f32,

    /// Upward velocity given by a jump (units/second).
    pub jump_velocity: f32,

    // ========================================================================
    // Gravity
    // ========================================================================
    /// Vertical acceleration (units/second², negative is down).
    pub gravity: f32,

    /// Gravity while carrying wings.
    pub wings_gravity: f32,

    /// Air jumps granted by wings per landing.
    pub wings_jump_count: u32,

    /// Slide time constant for winged air control. Zero gives direct control.
    pub wings_slide_time: f32,

    // ========================================================================
    // Momentum and Friction
    // ========================================================================
    /// Linear acceleration limit factor. Zero disables the limit.
    pub linear_acceleration: f32,

    /// Angular acceleration limit (radians/second²). Zero disables the limit.
    pub angular_acceleration: f32,

    /// Limits used while carrying the momentum capability.
    pub momentum_linear_acceleration: f32,
    pub momentum_angular_acceleration: f32,

    /// Horizontal acceleration limit factor on the ground. Zero disables it.
    pub friction: f32,

    pub momentum_friction: f32,

    // ========================================================================
    // Bumps
    // ========================================================================
    /// Highest ledge a grounded tank climbs without jumping.
    pub max_bump_height: f32,

    /// Fraction of the step's horizontal travel used for the bump probe.
    pub bump_speed_factor: f32,

    /// Scale applied to the probe for the single retry.
    pub bump_retry_scale: f32,

    // ========================================================================
    // Contact Resolution
    // ========================================================================
    /// Outer resolution steps per tick.
    pub max_steps: u32,

    /// Bisection refinements per time-of-impact search.
    pub max_search_steps: u32,

    /// Bisection stops once the step shrinks below this (seconds).
    pub min_search_step: f32,

    /// Back-off along a contact normal, per unit of cancelled speed.
    pub tiny_distance: f32,

    /// Normals with a Z part above this count as standing surfaces.
    pub normal_threshold: f32,

    /// Normal speeds above this (towards zero) stop the tank turning.
    pub jam_threshold: f32,

    /// How far below the tank to look for a supporting surface.
    pub support_probe: f32,

    // ========================================================================
    // Teleports
    // ========================================================================
    /// Z nudge for the second destination check.
    pub teleport_nudge: f32,

    /// How far below the ground limit a destination may sit.
    pub ground_epsilon: f32,

    // ========================================================================
    // Timers (seconds)
    // ========================================================================
    /// Duration of the exploding state.
    pub explode_time: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            // Tank dimensions
            tank_length: 6.0,
            tank_width: 2.8,
            tank_height: 2.05,

            // Speeds
            tank_speed: 25.0,
            tank_angular_velocity: 0.785_398,
            jump_velocity: 19.0,

            // Gravity
            gravity: -9.81,
            wings_gravity: -9.81,
            wings_jump_count: 1,
            wings_slide_time: 0.0,

            // Momentum and friction (off by default)
            linear_acceleration: 0.0,
            angular_acceleration: 0.0,
            momentum_linear_acceleration: 1.0,
            momentum_angular_acceleration: 1.0,
            friction: 0.0,
            momentum_friction: 0.0,

            // Bumps
            max_bump_height: 0.33,
            bump_speed_factor: 1.0,
            bump_retry_scale: 0.1,

            // Contact resolution
            max_steps: 4,
            max_search_steps: 7,
            min_search_step: 1e-4,
            tiny_distance: 0.001,
            normal_threshold: 0.001,
            jam_threshold: -0.01,
            support_probe: 0.05,

            // Teleports
            teleport_nudge: 0.001,
            ground_epsilon: 1e-3,

            // Timers
            explode_time: 5.0,
        }
    }
}

impl MotionConfig {
    /// The default tank game feel.
    pub fn classic() -> Self {
        Self::default()
    }

    /// Moon-like gravity with long wing glides.
    pub fn low_gravity() -> Self {
        Self {
            gravity: -3.0,
            wings_gravity: -1.5,
            wings_jump_count: 3,
            wings_slide_time: 0.5,
            jump_velocity: 12.0,
            ..Default::default()
        }
    }

    /// Heavy tanks: limited acceleration, turning and traction.
    pub fn momentum() -> Self {
        Self {
            linear_acceleration: 0.5,
            angular_acceleration: 2.0,
            friction: 1.0,
            momentum_friction: 0.5,
            ..Default::default()
        }
    }

    /// Overlay a JSON document on the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the motion core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tank_length <= 0.0 || self.tank_width <= 0.0 || self.tank_height <= 0.0 {
            return Err(ConfigError::invalid("tank dimensions", "must be positive"));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::invalid("max_steps", "must be at least 1"));
        }
        if self.max_search_steps == 0 {
            return Err(ConfigError::invalid("max_search_steps", "must be at least 1"));
        }
        if self.gravity > 0.0 || self.wings_gravity > 0.0 {
            return Err(ConfigError::invalid("gravity", "must not point up"));
        }
        if self.explode_time <= 0.0 {
            return Err(ConfigError::invalid("explode_time", "must be positive"));
        }
        if self.max_bump_height < 0.0 || self.tiny_distance < 0.0 || self.support_probe < 0.0 {
            return Err(ConfigError::invalid("tolerances", "must not be negative"));
        }
        Ok(())
    }

    /// The tank's bounding box.
    #[inline]
    pub fn dims(&self) -> TankDimensions {
        TankDimensions::new(self.tank_length, self.tank_width, self.tank_height)
    }
}
