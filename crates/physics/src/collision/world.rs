//! Obstacle arena backed by parry3d shape queries.
//!
//! The world is built once per map load and is read-only afterwards, so any
//! number of actor updates can query it back to back or in parallel.

use std::fmt;

use glam::{Vec2, Vec3};
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::query::{self, Contact as ShapeContact};
use parry3d::shape::{Cuboid, SharedShape};

use super::obstacle::{polygon_normal, Obstacle, ObstacleId, ObstacleKind, ObstacleShape};
use super::query::{Contact, ObstacleQuery, Pose, TankDimensions};
use crate::drivers::DriverId;
use crate::error::WorldError;
use crate::links::LinkFaceId;
use crate::movement::Capability;

/// Penetration depth below which shapes are considered merely touching.
pub const CONTACT_SLOP: f32 = 1e-4;

/// Default Z limit for burrowing tanks.
pub const DEFAULT_BURROW_DEPTH: f32 = -1.32;

/// Faces are extruded backwards into thin slabs of this thickness.
const FACE_THICKNESS: f32 = 0.1;

/// Walls are slabs of this thickness behind their front plane.
const WALL_THICKNESS: f32 = 1.0;

/// How far apart shapes may be and still report a contact normal.
const NORMAL_PREDICTION: f32 = 0.5;

/// Collision shape and placement for one obstacle.
#[derive(Clone)]
struct Collider {
    shape: SharedShape,
    transform: Isometry<Real>,
}

/// The static obstacle arena.
///
/// Supports:
/// - Boundary walls
/// - Oriented boxes and (optionally flipped) pyramids
/// - One-sided planar mesh faces, optionally carrying a physics driver or
///   acting as a tangible portal trigger
#[derive(Clone)]
pub struct ObstacleWorld {
    obstacles: Vec<Obstacle>,
    /// Parallel to `obstacles`.
    colliders: Vec<Collider>,
    burrow_depth: f32,
    contact_slop: f32,
}

impl fmt::Debug for ObstacleWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObstacleWorld")
            .field("obstacles", &self.obstacles)
            .field("burrow_depth", &self.burrow_depth)
            .field("contact_slop", &self.contact_slop)
            .finish()
    }
}

impl Default for ObstacleWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleWorld {
    /// Create an empty obstacle world.
    pub fn new() -> Self {
        Self {
            obstacles: Vec::new(),
            colliders: Vec::new(),
            burrow_depth: DEFAULT_BURROW_DEPTH,
            contact_slop: CONTACT_SLOP,
        }
    }

    /// Set the ground limit used for burrowing tanks.
    pub fn with_burrow_depth(mut self, depth: f32) -> Self {
        self.burrow_depth = depth.min(0.0);
        self
    }

    /// Add a boundary wall.
    ///
    /// # Arguments
    ///
    /// * `origin` - Bottom-center of the wall's front plane
    /// * `normal` - Direction the wall faces; the Z component is ignored
    /// * `half_width` - Half the wall's horizontal extent
    /// * `height` - Wall height above `origin`
    pub fn add_wall(
        &mut self,
        origin: Vec3,
        normal: Vec3,
        half_width: f32,
        height: f32,
    ) -> Result<ObstacleId, WorldError> {
        let normal = Vec3::new(normal.x, normal.y, 0.0).normalize_or_zero();
        if normal == Vec3::ZERO {
            return Err(WorldError::Degenerate("wall normal must have a horizontal part"));
        }
        if half_width <= 0.0 || height <= 0.0 {
            return Err(WorldError::Degenerate("wall must have positive size"));
        }

        let center = origin - normal * (WALL_THICKNESS * 0.5) + Vec3::Z * (height * 0.5);
        let collider = Collider {
            shape: SharedShape::cuboid(WALL_THICKNESS * 0.5, half_width, height * 0.5),
            transform: placement(center, normal.y.atan2(normal.x)),
        };

        Ok(self.push(
            ObstacleShape::Wall {
                origin,
                normal,
                half_width,
                height,
            },
            collider,
        ))
    }

    /// Add an oriented box standing on `base`.
    pub fn add_box(&mut self, base: Vec3, rotation: f32, half_size: Vec2, height: f32) -> ObstacleId {
        let collider = Collider {
            shape: SharedShape::cuboid(half_size.x, half_size.y, height * 0.5),
            transform: placement(base + Vec3::Z * (height * 0.5), rotation),
        };

        self.push(
            ObstacleShape::Box {
                base,
                rotation,
                half_size,
                height,
            },
            collider,
        )
    }

    /// Add a pyramid standing on `base`.
    pub fn add_pyramid(
        &mut self,
        base: Vec3,
        rotation: f32,
        half_size: Vec2,
        height: f32,
        flipped: bool,
    ) -> Result<ObstacleId, WorldError> {
        let (square_z, apex_z) = if flipped { (height, 0.0) } else { (0.0, height) };
        let points = [
            Point::new(-half_size.x, -half_size.y, square_z),
            Point::new(half_size.x, -half_size.y, square_z),
            Point::new(half_size.x, half_size.y, square_z),
            Point::new(-half_size.x, half_size.y, square_z),
            Point::new(0.0, 0.0, apex_z),
        ];
        let shape = SharedShape::convex_hull(&points).ok_or(WorldError::HullFailed)?;
        let collider = Collider {
            shape,
            transform: placement(base, rotation),
        };

        Ok(self.push(
            ObstacleShape::Pyramid {
                base,
                rotation,
                half_size,
                height,
                flipped,
            },
            collider,
        ))
    }

    /// Add a planar convex face. The front side follows the winding
    /// (counter-clockwise seen from the front).
    pub fn add_face(&mut self, vertices: &[Vec3]) -> Result<ObstacleId, WorldError> {
        if vertices.len() < 3 {
            return Err(WorldError::TooFewVertices(vertices.len()));
        }
        let normal = polygon_normal(vertices).ok_or(WorldError::Degenerate("face has no area"))?;

        let back = normal * FACE_THICKNESS;
        let points: Vec<Point<Real>> = vertices
            .iter()
            .chain(vertices.iter())
            .enumerate()
            .map(|(i, v)| {
                let v = if i < vertices.len() { *v } else { *v - back };
                Point::new(v.x, v.y, v.z)
            })
            .collect();
        let shape = SharedShape::convex_hull(&points).ok_or(WorldError::HullFailed)?;

        Ok(self.push(
            ObstacleShape::Face {
                vertices: vertices.to_vec(),
                normal,
            },
            Collider {
                shape,
                transform: Isometry::identity(),
            },
        ))
    }

    /// Attach (or detach) a physics driver to an obstacle.
    pub fn set_physics_driver(
        &mut self,
        id: ObstacleId,
        driver: Option<DriverId>,
    ) -> Result<(), WorldError> {
        self.obstacle_mut(id)?.physics_driver = driver;
        Ok(())
    }

    /// Mark a face as the tangible trigger of a portal face.
    pub fn set_link(&mut self, id: ObstacleId, link: Option<LinkFaceId>) -> Result<(), WorldError> {
        let obstacle = self.obstacle_mut(id)?;
        if obstacle.kind() != ObstacleKind::Face {
            return Err(WorldError::Degenerate("only faces can trigger links"));
        }
        obstacle.link = link;
        Ok(())
    }

    pub fn set_drive_through(&mut self, id: ObstacleId, drive_through: bool) -> Result<(), WorldError> {
        self.obstacle_mut(id)?.drive_through = drive_through;
        Ok(())
    }

    /// Get the number of obstacles.
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn push(&mut self, shape: ObstacleShape, collider: Collider) -> ObstacleId {
        let id = ObstacleId(self.obstacles.len() as u32);
        self.obstacles.push(Obstacle::new(id, shape));
        self.colliders.push(collider);
        id
    }

    fn obstacle_mut(&mut self, id: ObstacleId) -> Result<&mut Obstacle, WorldError> {
        self.obstacles
            .get_mut(id.0 as usize)
            .ok_or(WorldError::UnknownObstacle(id))
    }

    /// Shape contact between the tank at `pose` and one collider.
    fn shape_contact(
        &self,
        collider: &Collider,
        pose: Pose,
        dims: TankDimensions,
        prediction: f32,
    ) -> Option<ShapeContact> {
        let half = dims.half_extents();
        let tank = Cuboid::new(Vector::new(half.x, half.y, half.z));
        let tank_transform = placement(pose.center(dims), pose.azimuth);

        match query::contact(
            &tank_transform,
            &tank,
            &collider.transform,
            collider.shape.as_ref(),
            prediction,
        ) {
            Ok(contact) => contact,
            Err(_) => {
                log::warn!("unsupported shape pair in contact query");
                None
            }
        }
    }

    fn overlaps(&self, collider: &Collider, pose: Pose, dims: TankDimensions) -> bool {
        self.shape_contact(collider, pose, dims, 0.0)
            .is_some_and(|c| c.dist < -self.contact_slop)
    }

    /// First expelling overlap in arena order, else the first passive one.
    fn scan(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
        skip: Option<ObstacleId>,
    ) -> Option<Contact> {
        let mut passive = None;

        for (obstacle, collider) in self.obstacles.iter().zip(&self.colliders) {
            if Some(obstacle.id) == skip {
                continue;
            }
            if obstacle.drive_through || !self.approaches_front(obstacle, from, dims) {
                continue;
            }
            if !self.overlaps(collider, to, dims) {
                continue;
            }

            let expel = !phased || obstacle.expels_phased();
            if expel {
                return Some(Contact {
                    obstacle: obstacle.id,
                    expel,
                });
            }
            passive.get_or_insert(Contact {
                obstacle: obstacle.id,
                expel,
            });
        }

        passive
    }

    /// One-sided faces only block tanks coming from their front.
    fn approaches_front(&self, obstacle: &Obstacle, from: Pose, dims: TankDimensions) -> bool {
        match &obstacle.shape {
            ObstacleShape::Face { vertices, normal } => {
                (from.center(dims) - vertices[0]).dot(*normal) >= -self.contact_slop
            }
            _ => true,
        }
    }
}

impl ObstacleQuery for ObstacleWorld {
    fn blocking_obstacle(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
    ) -> Option<Contact> {
        self.scan(from, to, dims, phased, None)
    }

    fn blocking_obstacle_except(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
        skip: ObstacleId,
    ) -> Option<Contact> {
        self.scan(from, to, dims, phased, Some(skip))
    }

    fn surface_normal(
        &self,
        obstacle: ObstacleId,
        pose: Pose,
        dims: TankDimensions,
    ) -> Option<Vec3> {
        let index = obstacle.0 as usize;
        let fixed = self.obstacles.get(index)?.fixed_normal();
        if fixed.is_some() {
            return fixed;
        }

        let contact = self.shape_contact(&self.colliders[index], pose, dims, NORMAL_PREDICTION)?;
        let normal = Vec3::new(contact.normal2.x, contact.normal2.y, contact.normal2.z);
        normal.is_finite().then_some(normal)
    }

    fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id.0 as usize)
    }

    fn ground_limit(&self, capability: Capability) -> f32 {
        if capability == Capability::Burrow {
            self.burrow_depth
        } else {
            0.0
        }
    }
}

/// Isometry placing a shape at `center`, rotated about Z.
fn placement(center: Vec3, rotation: f32) -> Isometry<Real> {
    Isometry::new(
        Vector::new(center.x, center.y, center.z),
        Vector::new(0.0, 0.0, rotation),
    )
}

// ============================================================================
// Tests
// ============================================================================
