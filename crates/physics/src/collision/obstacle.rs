//! Obstacle descriptions stored in the world arena.
//!
//! Obstacles are referenced by [`ObstacleId`] handles only. The motion core
//! asks them a handful of questions (flat top? how high? which driver?) and
//! never holds on to them across ticks.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::drivers::DriverId;
use crate::links::LinkFaceId;

/// Stable handle into the obstacle arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Coarse obstacle category used by collision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Boundary wall. Expels even phased actors.
    Wall,
    /// A single mesh face, possibly a portal or a driver surface.
    Face,
    /// Any other solid (boxes, pyramids).
    Generic,
}

/// Geometry of an obstacle.
///
/// Positions are world space with Z up. `base` is the bottom-center of the
/// footprint and `rotation` is about the Z axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObstacleShape {
    /// A vertical wall whose front faces along `normal` (horizontal).
    Wall {
        origin: Vec3,
        normal: Vec3,
        half_width: f32,
        height: f32,
    },

    /// An oriented box.
    Box {
        base: Vec3,
        rotation: f32,
        half_size: Vec2,
        height: f32,
    },

    /// A four-sided pyramid. A flipped pyramid stands on its apex and
    /// therefore has a flat top.
    Pyramid {
        base: Vec3,
        rotation: f32,
        half_size: Vec2,
        height: f32,
        flipped: bool,
    },

    /// A planar convex polygon. One-sided: `normal` is the front.
    Face { vertices: Vec<Vec3>, normal: Vec3 },
}

/// An obstacle in the world arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub shape: ObstacleShape,
    /// Velocity-field region attached to this obstacle (faces only).
    pub physics_driver: Option<DriverId>,
    /// Portal face this obstacle is the tangible trigger of.
    pub link: Option<LinkFaceId>,
    /// Drive-through obstacles are visible but never block.
    pub drive_through: bool,
}

/// Normals with a Z component above this are treated as pointing straight up.
const UP_PLANE_Z: f32 = 0.999;

impl Obstacle {
    pub fn new(id: ObstacleId, shape: ObstacleShape) -> Self {
        Self {
            id,
            shape,
            physics_driver: None,
            link: None,
            drive_through: false,
        }
    }

    pub fn kind(&self) -> ObstacleKind {
        match self.shape {
            ObstacleShape::Wall { .. } => ObstacleKind::Wall,
            ObstacleShape::Face { .. } => ObstacleKind::Face,
            ObstacleShape::Box { .. } | ObstacleShape::Pyramid { .. } => ObstacleKind::Generic,
        }
    }

    /// Whether a tank can rest on (and bump up onto) the top of this obstacle.
    pub fn is_flat_top(&self) -> bool {
        match &self.shape {
            ObstacleShape::Wall { .. } => false,
            ObstacleShape::Box { .. } => true,
            ObstacleShape::Pyramid { flipped, .. } => *flipped,
            ObstacleShape::Face { normal, .. } => normal.z > UP_PLANE_Z,
        }
    }

    /// Lowest Z of the obstacle.
    pub fn base_z(&self) -> f32 {
        match &self.shape {
            ObstacleShape::Wall { origin, .. } => origin.z,
            ObstacleShape::Box { base, .. } | ObstacleShape::Pyramid { base, .. } => base.z,
            ObstacleShape::Face { vertices, .. } => vertices
                .iter()
                .map(|v| v.z)
                .fold(f32::INFINITY, f32::min),
        }
    }

    pub fn height(&self) -> f32 {
        match &self.shape {
            ObstacleShape::Wall { height, .. }
            | ObstacleShape::Box { height, .. }
            | ObstacleShape::Pyramid { height, .. } => *height,
            ObstacleShape::Face { vertices, .. } => {
                let top = vertices.iter().map(|v| v.z).fold(f32::NEG_INFINITY, f32::max);
                top - self.base_z()
            }
        }
    }

    /// Z of the top of the obstacle.
    #[inline]
    pub fn top(&self) -> f32 {
        self.base_z() + self.height()
    }

    #[inline]
    pub fn physics_driver(&self) -> Option<DriverId> {
        self.physics_driver
    }

    #[inline]
    pub fn is_link_face(&self) -> bool {
        self.link.is_some()
    }

    /// Whether this obstacle still pushes out a phased actor.
    pub fn expels_phased(&self) -> bool {
        self.kind() == ObstacleKind::Wall || self.is_link_face()
    }

    /// Normal that does not depend on where the actor touches, if the shape
    /// has one (walls and faces).
    pub fn fixed_normal(&self) -> Option<Vec3> {
        match &self.shape {
            ObstacleShape::Wall { normal, .. } | ObstacleShape::Face { normal, .. } => {
                Some(*normal)
            }
            _ => None,
        }
    }
}

/// Unit normal of a planar polygon using Newell's method.
///
/// Returns `None` for polygons with no area.
pub fn polygon_normal(vertices: &[Vec3]) -> Option<Vec3> {
    let mut normal = Vec3::ZERO;
    for (i, current) in vertices.iter().enumerate() {
        let next = vertices[(i + 1) % vertices.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    let normal = normal.normalize_or_zero();
    (normal != Vec3::ZERO).then_some(normal)
}
