//! Tank input handling.
//!
//! This module converts raw key state into the [`ControlInput`] the motion
//! core consumes.

use serde::{Deserialize, Serialize};
use tread_physics::{ControlInput, MotionConfig};

/// Reverse gear runs at half the forward speed.
const REVERSE_FACTOR: f32 = 0.5;

/// Raw tank input for a single frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TankInput {
    /// Drive keys pressed.
    pub movement: MovementInput,

    /// Analog throttle and steering in `[-1, 1]`, overriding the keys.
    pub analog: Option<(f32, f32)>,

    /// Action buttons pressed.
    pub actions: ActionInput,

    /// Frame number this input was generated.
    pub frame: u32,
}

/// Drive key states.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Action button states.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActionInput {
    pub jump: bool,
}

impl TankInput {
    /// Convert to a motion command, scaled by the configured top speeds.
    pub fn to_control(&self, config: &MotionConfig) -> ControlInput {
        let (throttle, steer) = match self.analog {
            Some((throttle, steer)) => (throttle.clamp(-1.0, 1.0), steer.clamp(-1.0, 1.0)),
            None => (self.key_axis_throttle(), self.key_axis_steer()),
        };

        let throttle = if throttle < 0.0 {
            throttle * REVERSE_FACTOR
        } else {
            throttle
        };

        ControlInput {
            desired_speed: throttle * config.tank_speed,
            desired_angular_velocity: steer * config.tank_angular_velocity,
            jump: self.actions.jump,
        }
    }

    fn key_axis_throttle(&self) -> f32 {
        axis(self.movement.forward, self.movement.backward)
    }

    /// Left turns are counter-clockwise, so positive.
    fn key_axis_steer(&self) -> f32 {
        axis(self.movement.left, self.movement.right)
    }

    /// Check if any drive input is active.
    pub fn has_movement(&self) -> bool {
        self.analog.is_some_and(|(t, s)| t != 0.0 || s != 0.0)
            || self.movement.forward
            || self.movement.backward
            || self.movement.left
            || self.movement.right
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_to_control() {
        let config = MotionConfig::default();
        let mut input = TankInput::default();
        input.movement.forward = true;
        input.movement.left = true;
        input.actions.jump = true;

        let control = input.to_control(&config);

        assert_eq!(control.desired_speed, config.tank_speed);
        assert_eq!(control.desired_angular_velocity, config.tank_angular_velocity);
        assert!(control.jump);
    }

    #[test]
    fn test_reverse_is_slower() {
        let config = MotionConfig::default();
        let mut input = TankInput::default();
        input.movement.backward = true;
        input.movement.right = true;

        let control = input.to_control(&config);

        assert_eq!(control.desired_speed, -config.tank_speed * 0.5);
        assert_eq!(control.desired_angular_velocity, -config.tank_angular_velocity);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut input = TankInput::default();
        input.movement.forward = true;
        input.movement.backward = true;

        let control = input.to_control(&MotionConfig::default());
        assert_eq!(control.desired_speed, 0.0);
        assert!(input.has_movement());
    }

    #[test]
    fn test_analog_overrides_and_clamps() {
        let config = MotionConfig::default();
        let input = TankInput {
            analog: Some((2.0, -0.5)),
            ..Default::default()
        };

        let control = input.to_control(&config);
        assert_eq!(control.desired_speed, config.tank_speed);
        assert_eq!(control.desired_angular_velocity, -0.5 * config.tank_angular_velocity);
    }
}
