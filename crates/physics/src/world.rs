//! The combined world collaborator handed to the motion core.

use glam::Vec3;

use crate::collision::{Contact, Obstacle, ObstacleId, ObstacleQuery, ObstacleWorld, Pose, TankDimensions};
use crate::drivers::{DriverId, DriverRegistry, DriverTable, PhysicsDriver};
use crate::error::WorldError;
use crate::links::{LinkFaceId, LinkResolution, LinkResolver, LinkTable, Plane};
use crate::movement::{Capability, Team};

/// Everything the motion core reads from the world.
pub trait World: ObstacleQuery + DriverRegistry + LinkResolver {}

impl<T: ObstacleQuery + DriverRegistry + LinkResolver> World for T {}

/// Static level data: obstacles, physics drivers and teleport links.
///
/// Built once per map load, then shared read-only by every tank update.
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    pub obstacles: ObstacleWorld,
    pub drivers: DriverTable,
    pub links: LinkTable,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh face carrying a physics driver.
    pub fn add_driver_face(
        &mut self,
        vertices: &[Vec3],
        driver: PhysicsDriver,
    ) -> Result<(ObstacleId, DriverId), WorldError> {
        let obstacle = self.obstacles.add_face(vertices)?;
        let driver = self.drivers.add(driver);
        self.obstacles.set_physics_driver(obstacle, Some(driver))?;
        Ok((obstacle, driver))
    }

    /// Add a tangible portal: a link face plus the solid face that triggers
    /// it on touch.
    pub fn add_touch_portal(
        &mut self,
        center: Vec3,
        normal: Vec3,
        half_width: f32,
        half_height: f32,
    ) -> Result<(LinkFaceId, ObstacleId), WorldError> {
        let link = self.links.add_face(center, normal, half_width, half_height)?;
        self.links.set_touch(link, true)?;

        let corners = self
            .links
            .face(link)
            .ok_or(WorldError::UnknownLinkFace(link))?
            .corners();
        let obstacle = self.obstacles.add_face(&corners)?;
        self.obstacles.set_link(obstacle, Some(link))?;
        Ok((link, obstacle))
    }
}

impl ObstacleQuery for StaticWorld {
    fn blocking_obstacle(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
    ) -> Option<Contact> {
        self.obstacles.blocking_obstacle(from, to, dims, phased)
    }

    fn blocking_obstacle_except(
        &self,
        from: Pose,
        to: Pose,
        dims: TankDimensions,
        phased: bool,
        skip: ObstacleId,
    ) -> Option<Contact> {
        self.obstacles
            .blocking_obstacle_except(from, to, dims, phased, skip)
    }

    fn surface_normal(&self, obstacle: ObstacleId, pose: Pose, dims: TankDimensions) -> Option<Vec3> {
        self.obstacles.surface_normal(obstacle, pose, dims)
    }

    fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.obstacle(id)
    }

    fn ground_limit(&self, capability: Capability) -> f32 {
        self.obstacles.ground_limit(capability)
    }
}

impl DriverRegistry for StaticWorld {
    fn driver(&self, id: DriverId) -> Option<&PhysicsDriver> {
        self.drivers.driver(id)
    }
}

impl LinkResolver for StaticWorld {
    fn crossed_source(&self, from: Pose, to: Pose, dims: TankDimensions) -> Option<LinkFaceId> {
        self.links.crossed_source(from, to, dims)
    }

    fn crossing_plane(&self, pose: Pose, dims: TankDimensions) -> Option<Plane> {
        self.links.crossing_plane(pose, dims)
    }

    fn resolve_destination(
        &self,
        source: LinkFaceId,
        team: Team,
        capability: Capability,
        position: Vec3,
        velocity: Vec3,
    ) -> Option<LinkResolution> {
        self.links
            .resolve_destination(source, team, capability, position, velocity)
    }

    fn fail_message(&self, source: LinkFaceId) -> Option<&str> {
        self.links.fail_message(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_portal_face_matches_link_normal() {
        let mut world = StaticWorld::new();
        let (link, obstacle) = world
            .add_touch_portal(Vec3::new(30.0, 0.0, 5.0), -Vec3::X, 4.0, 5.0)
            .unwrap();

        let obstacle = world.obstacle(obstacle).unwrap();
        assert_eq!(obstacle.link, Some(link));
        let normal = obstacle.fixed_normal().unwrap();
        assert!((normal + Vec3::X).length() < 1e-5, "normal={normal:?}");
        assert!(world.links.face(link).unwrap().touch);
    }

    #[test]
    fn test_driver_face_attaches_driver() {
        let mut world = StaticWorld::new();
        let (obstacle, driver) = world
            .add_driver_face(
                &[
                    Vec3::new(-5.0, -5.0, 0.0),
                    Vec3::new(5.0, -5.0, 0.0),
                    Vec3::new(5.0, 5.0, 0.0),
                    Vec3::new(-5.0, 5.0, 0.0),
                ],
                PhysicsDriver::linear(Vec3::X),
            )
            .unwrap();

        assert_eq!(world.obstacle(obstacle).unwrap().physics_driver(), Some(driver));
        assert_eq!(world.driver(driver).unwrap().linear_velocity, Vec3::X);
    }
}
