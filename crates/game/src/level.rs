//! Level construction and spawn points.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tread_physics::{
    LinkBehavior, LinkTarget, PhysicsDriver, Pose, StaticWorld, Team, WorldError,
};

/// A game level: static world geometry plus spawn points.
#[derive(Debug, Clone)]
pub struct Level {
    /// Level identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Obstacles, physics drivers and teleporter links.
    pub world: StaticWorld,

    /// Tank spawn points.
    pub spawn_points: Vec<SpawnPoint>,
}

/// A place tanks enter the level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Bottom-center of the tank.
    pub position: Vec3,

    /// Initial heading (radians, counter-clockwise from +X).
    pub azimuth: f32,

    /// Restrict the spawn to one team.
    pub team: Option<Team>,
}

impl SpawnPoint {
    pub fn new(position: Vec3, azimuth: f32) -> Self {
        Self {
            position,
            azimuth,
            team: None,
        }
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.azimuth)
    }

    fn admits(&self, team: Team) -> bool {
        self.team.map_or(true, |t| t == team)
    }
}

impl Level {
    /// Create an empty level.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            world: StaticWorld::new(),
            spawn_points: Vec::new(),
        }
    }

    /// Create a small walled arena exercising every kind of world feature.
    pub fn test_arena() -> Result<Self, WorldError> {
        let mut level = Self::new("test_arena", "Test Arena");
        let world = &mut level.world;

        // Boundary walls
        let arena_size = 50.0;
        let wall_height = 10.0;
        for normal in [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y] {
            world
                .obstacles
                .add_wall(-normal * arena_size, normal, arena_size, wall_height)?;
        }

        // Central block and some cover
        world.obstacles.add_box(Vec3::ZERO, 0.0, Vec2::new(2.0, 2.0), 4.0);
        world.obstacles.add_box(Vec3::new(-15.0, 10.0, 0.0), 0.4, Vec2::new(1.5, 1.5), 2.0);
        world.obstacles.add_box(Vec3::new(15.0, -10.0, 0.0), -0.4, Vec2::new(1.5, 1.5), 2.0);

        // A ledge low enough to drive up
        world.obstacles.add_box(Vec3::new(0.0, -30.0, 0.0), 0.0, Vec2::new(6.0, 4.0), 0.3);

        // A pyramid to slide off
        world.obstacles.add_pyramid(Vec3::new(30.0, -30.0, 0.0), 0.0, Vec2::new(5.0, 5.0), 6.0, false)?;

        // Conveyor pad pushing east
        world.add_driver_face(
            &square(Vec3::new(-30.0, -30.0, 0.0), 5.0),
            PhysicsDriver::linear(Vec3::new(4.0, 0.0, 0.0)),
        )?;

        // Lava pit raised a little so it can be stood on
        world.add_driver_face(
            &square(Vec3::new(35.0, 35.0, 0.5), 4.0),
            PhysicsDriver::death("fell into the lava"),
        )?;

        // Teleporter pair across the north side
        let west = world
            .links
            .add_face(Vec3::new(-30.0, 30.0, 5.0), Vec3::X, 4.0, 5.0)?;
        let east = world
            .links
            .add_face(Vec3::new(30.0, 30.0, 5.0), -Vec3::X, 4.0, 5.0)?;
        world.links.link(
            west,
            LinkTarget::to(east).with_behavior(LinkBehavior {
                rebound: true,
                ..Default::default()
            }),
        )?;
        world.links.link(east, LinkTarget::to(west))?;

        level.spawn_points = vec![
            SpawnPoint::new(Vec3::new(-20.0, 0.0, 0.0), 0.0),
            SpawnPoint::new(Vec3::new(20.0, 0.0, 0.0), PI),
            SpawnPoint::new(Vec3::new(0.0, 20.0, 0.0), -FRAC_PI_2),
            SpawnPoint::new(Vec3::new(0.0, -15.0, 0.0), FRAC_PI_2),
        ];

        log::debug!(
            "built {} with {} obstacles and {} link faces",
            level.name,
            level.world.obstacles.len(),
            level.world.links.len()
        );
        Ok(level)
    }

    /// Pick a spawn point for `team`, rotating through the admitted ones.
    pub fn spawn_for(&self, team: Team, index: usize) -> Option<&SpawnPoint> {
        let count = self.spawn_count(team);
        if count == 0 {
            return None;
        }
        self.spawn_points
            .iter()
            .filter(|s| s.admits(team))
            .nth(index % count)
    }

    /// Number of spawn points open to `team`.
    pub fn spawn_count(&self, team: Team) -> usize {
        self.spawn_points.iter().filter(|s| s.admits(team)).count()
    }
}

/// Counter-clockwise square seen from above.
fn square(center: Vec3, half: f32) -> [Vec3; 4] {
    [
        center + Vec3::new(-half, -half, 0.0),
        center + Vec3::new(half, -half, 0.0),
        center + Vec3::new(half, half, 0.0),
        center + Vec3::new(-half, half, 0.0),
    ]
}
