//! Physics drivers: velocity fields attached to obstacle faces.
//!
//! A tank resting on (or touching) a face with a driver picks up the
//! driver's translation, rotation about a pivot, and radial flow. Slide
//! drivers replace normal traction with an exponential slide model.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Stable handle into the driver table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverId(pub u32);

/// Immutable description of one velocity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsDriver {
    /// Added directly to the tank's velocity.
    pub linear_velocity: Vec3,

    /// Rotation rate about `angular_pivot` (radians/second).
    pub angular_velocity: f32,
    pub angular_pivot: Vec2,

    /// Speed away from `radial_center` (negative pulls inward).
    pub radial_velocity: f32,
    pub radial_center: Vec2,

    /// Use the slide model instead of normal traction.
    pub is_slide: bool,
    /// Time constant of the slide model (seconds).
    pub slide_time: f32,

    /// Touching this driver kills the tank.
    pub is_death: bool,
    pub death_message: Option<String>,
}

impl Default for PhysicsDriver {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::ZERO,
            angular_velocity: 0.0,
            angular_pivot: Vec2::ZERO,
            radial_velocity: 0.0,
            radial_center: Vec2::ZERO,
            is_slide: false,
            slide_time: 0.0,
            is_death: false,
            death_message: None,
        }
    }
}

impl PhysicsDriver {
    /// A plain conveyor.
    pub fn linear(velocity: Vec3) -> Self {
        Self {
            linear_velocity: velocity,
            ..Default::default()
        }
    }

    /// A turntable spinning about `pivot`.
    pub fn spinning(angular_velocity: f32, pivot: Vec2) -> Self {
        Self {
            angular_velocity,
            angular_pivot: pivot,
            ..Default::default()
        }
    }

    /// Ice: slide with the given time constant.
    pub fn slide(slide_time: f32) -> Self {
        Self {
            is_slide: slide_time > 0.0,
            slide_time,
            ..Default::default()
        }
    }

    pub fn death(message: impl Into<String>) -> Self {
        Self {
            is_death: true,
            death_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Horizontal velocity the rotation and radial fields impart at
    /// `position`. Positions at the radial center get no radial push.
    pub fn field_velocity(&self, position: Vec3) -> Vec2 {
        let mut velocity = Vec2::ZERO;
        let here = position.truncate();

        if self.angular_velocity != 0.0 {
            let offset = here - self.angular_pivot;
            velocity += Vec2::new(-offset.y, offset.x) * self.angular_velocity;
        }

        if self.radial_velocity != 0.0 {
            let offset = here - self.radial_center;
            let distance = offset.length();
            if distance > f32::EPSILON {
                velocity += offset * (self.radial_velocity / distance);
            }
        }

        velocity
    }
}

/// Lookup of drivers by id.
pub trait DriverRegistry {
    fn driver(&self, id: DriverId) -> Option<&PhysicsDriver>;
}

/// Arena of physics drivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverTable {
    drivers: Vec<PhysicsDriver>,
}

impl DriverTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, driver: PhysicsDriver) -> DriverId {
        let id = DriverId(self.drivers.len() as u32);
        self.drivers.push(driver);
        id
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl DriverRegistry for DriverTable {
    fn driver(&self, id: DriverId) -> Option<&PhysicsDriver> {
        self.drivers.get(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut table = DriverTable::new();
        let id = table.add(PhysicsDriver::linear(Vec3::X));
        assert_eq!(table.driver(id).unwrap().linear_velocity, Vec3::X);
        assert!(table.driver(DriverId(7)).is_none());
    }

    #[test]
    fn test_spin_is_tangential() {
        let driver = PhysicsDriver::spinning(2.0, Vec2::ZERO);
        let velocity = driver.field_velocity(Vec3::new(3.0, 0.0, 0.0));
        assert!(velocity.x.abs() < 1e-6);
        assert!((velocity.y - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_radial_at_center_is_skipped() {
        let driver = PhysicsDriver {
            radial_velocity: 4.0,
            radial_center: Vec2::new(1.0, 1.0),
            ..Default::default()
        };
        assert_eq!(driver.field_velocity(Vec3::new(1.0, 1.0, 5.0)), Vec2::ZERO);

        let velocity = driver.field_velocity(Vec3::new(1.0, 3.0, 0.0));
        assert!((velocity - Vec2::new(0.0, 4.0)).length() < 1e-6);
    }
}
