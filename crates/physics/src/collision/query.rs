//! The obstacle query interface consumed by the motion core.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::obstacle::{Obstacle, ObstacleId};
use crate::movement::Capability;

/// Position (bottom-center of the tank) and heading about Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Heading in radians, counter-clockwise from +X.
    pub azimuth: f32,
}

impl Pose {
    #[inline]
    pub const fn new(position: Vec3, azimuth: f32) -> Self {
        Self { position, azimuth }
    }

    /// Unit heading vector in the XY plane.
    #[inline]
    pub fn heading(&self) -> Vec3 {
        let (sin, cos) = self.azimuth.sin_cos();
        Vec3::new(cos, sin, 0.0)
    }

    /// Center of the tank box at this pose.
    #[inline]
    pub fn center(&self, dims: TankDimensions) -> Vec3 {
        self.position + Vec3::new(0.0, 0.0, dims.height * 0.5)
    }
}

/// Size of the actor's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankDimensions {
    /// Extent along the heading.
    pub length: f32,
    /// Extent across the heading.
    pub width: f32,
    pub height: f32,
}

impl TankDimensions {
    pub const fn new(length: f32, width: f32, height: f32) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Half extents in the tank's local frame (x along heading).
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height) * 0.5
    }

    /// The eight corners of the tank box at a pose.
    pub fn corners(&self, pose: Pose) -> [Vec3; 8] {
        let half = self.half_extents();
        let forward = pose.heading() * half.x;
        let side = Vec3::new(-pose.heading().y, pose.heading().x, 0.0) * half.y;
        let center = pose.center(*self);
        let up = Vec3::Z * half.z;
        [
            center + forward + side + up,
            center + forward - side + up,
            center - forward + side + up,
            center - forward - side + up,
            center + forward + side - up,
            center + forward - side - up,
            center - forward + side - up,
            center - forward - side - up,
        ]
    }
}

/// Result of a blocking-obstacle query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub obstacle: ObstacleId,
    /// Whether the contact should push the actor out.
    pub expel: bool,
}

/// Read-only obstacle lookups against the world's static geometry.
pub trait ObstacleQuery {
    /// The single most relevant obstacle the tank overlaps at `to`, having
    /// moved there from `from`.
    ///
    /// When `phased`, ordinary solids are still reported but with
    /// `expel == false`; walls and portal faces keep expelling.
    fn blocking_obstacle(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
    ) -> Option<Contact>;

    /// As [`blocking_obstacle`](Self::blocking_obstacle), skipping `skip`.
    fn blocking_obstacle_except(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
        skip: ObstacleId,
    ) -> Option<Contact>;

    /// Outward surface normal of `obstacle` where the tank at `pose` touches
    /// it. `None` when no stable normal can be computed.
    fn surface_normal(&self, obstacle: ObstacleId, pose: Pose, dims: TankDimensions)
        -> Option<Vec3>;

    fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle>;

    /// Lowest Z the tank may rest at for the capability it carries.
    fn ground_limit(&self, capability: Capability) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_pose_heading() {
        let pose = Pose::new(Vec3::ZERO, FRAC_PI_2);
        let heading = pose.heading();
        assert!(heading.x.abs() < 1e-6);
        assert!((heading.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_corners_span_box() {
        let dims = TankDimensions::new(6.0, 2.0, 2.0);
        let corners = dims.corners(Pose::new(Vec3::new(10.0, 0.0, 0.0), 0.0));
        let max_x = corners.iter().map(|c| c.x).fold(f32::MIN, f32::max);
        let min_z = corners.iter().map(|c| c.z).fold(f32::MAX, f32::min);
        assert!((max_x - 13.0).abs() < 1e-5);
        assert!(min_z.abs() < 1e-5);
    }
}
