//! Actor state, control input and per-tick reports.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{ObstacleId, Pose};
use crate::drivers::DriverId;
use crate::links::{LinkFaceId, Plane};

/// Discrete contact classification of a tank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[default]
    Dead,
    Exploding,
    OnGround,
    OnBuilding,
    InBuilding,
    InAir,
}

impl Location {
    #[inline]
    pub fn is_alive(self) -> bool {
        !matches!(self, Location::Dead | Location::Exploding)
    }

    /// Resting on the ground or on top of an obstacle.
    #[inline]
    pub fn is_grounded(self) -> bool {
        matches!(self, Location::OnGround | Location::OnBuilding)
    }
}

/// The special ability a tank currently carries. One at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[default]
    None,
    /// Air control, lighter gravity and air jumps.
    Wings,
    /// Lowers the ground limit so the tank sinks below the surface.
    Burrow,
    /// Portals toggle a zoned state instead of teleporting.
    PhantomZone,
    /// Drive through ordinary solids.
    Oscillation,
    /// Own acceleration and traction limits.
    Momentum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[default]
    Rogue,
    Red,
    Green,
    Blue,
    Purple,
    Observer,
}

/// Status bits kept alongside the location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags(pub u16);

impl StatusFlags {
    /// Held still; input is ignored.
    pub const PAUSED: u16 = 1 << 0;

    /// Zoned by a portal while carrying the phantom-zone capability.
    pub const PHANTOM_ZONED: u16 = 1 << 1;

    /// Straddling a portal face.
    pub const CROSSING_WALL: u16 = 1 << 2;

    /// Airborne and moving down.
    pub const FALLING: u16 = 1 << 3;

    #[inline]
    pub fn has(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    #[inline]
    pub fn toggle(&mut self, flag: u16) -> bool {
        self.0 ^= flag;
        self.has(flag)
    }
}

/// Control input for a single tick, already clamped upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Signed forward speed (units/second).
    pub desired_speed: f32,
    /// Signed turn rate (radians/second, counter-clockwise).
    pub desired_angular_velocity: f32,
    pub jump: bool,
}

impl ControlInput {
    pub fn new(desired_speed: f32, desired_angular_velocity: f32) -> Self {
        Self {
            desired_speed,
            desired_angular_velocity,
            jump: false,
        }
    }
}

/// When and through which link the tank last teleported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeleportRecord {
    pub source: LinkFaceId,
    pub dest: LinkFaceId,
    /// Actor clock at the teleport (seconds).
    pub time: f32,
}

/// Complete motion state for one tank.
///
/// The location is only changed by the controller (per-tick
/// classification) and by the explicit lifecycle calls below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    /// Bottom-center of the tank box.
    pub position: Vec3,
    pub azimuth: f32,
    pub velocity: Vec3,
    pub angular_velocity: f32,

    location: Location,

    pub team: Team,
    pub capability: Capability,
    pub status: StatusFlags,

    /// Driver of the obstacle the tank last touched.
    pub physics_driver: Option<DriverId>,
    /// Informational only. Refreshed every tick.
    pub last_obstacle: Option<ObstacleId>,
    /// Set while straddling a portal face.
    pub crossing_plane: Option<Plane>,
    /// Portal face touched last tick. A face only triggers when first touched.
    pub touching_link: Option<LinkFaceId>,
    /// Death driver touched this tick, if any.
    pub death_driver: Option<DriverId>,

    pub last_teleport: Option<TeleportRecord>,

    /// Time spent exploding (seconds).
    pub explode_elapsed: f32,
    /// Air jumps left (wings).
    pub flaps_remaining: u32,
    /// Seconds simulated since spawn.
    pub clock: f32,
}

impl Default for ActorState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            azimuth: 0.0,
            velocity: Vec3::ZERO,
            angular_velocity: 0.0,
            location: Location::Dead,
            team: Team::Rogue,
            capability: Capability::None,
            status: StatusFlags::default(),
            physics_driver: None,
            last_obstacle: None,
            crossing_plane: None,
            touching_link: None,
            death_driver: None,
            last_teleport: None,
            explode_elapsed: 0.0,
            flaps_remaining: 0,
            clock: 0.0,
        }
    }
}

impl ActorState {
    /// A dead tank on `team`, waiting to be spawned.
    pub fn new(team: Team) -> Self {
        Self {
            team,
            ..Default::default()
        }
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.azimuth)
    }

    pub(crate) fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.azimuth = pose.azimuth;
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.location.is_alive()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.status.has(StatusFlags::PAUSED)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.status.set(StatusFlags::PAUSED, paused);
    }

    /// Phased tanks pass through ordinary solids.
    pub fn is_phased(&self) -> bool {
        !self.is_alive()
            || self.capability == Capability::Oscillation
            || self.status.has(StatusFlags::PHANTOM_ZONED)
    }

    /// Place the tank at `pose`, alive and at rest.
    pub(crate) fn respawn(&mut self, pose: Pose, location: Location) {
        self.set_pose(pose);
        self.velocity = Vec3::ZERO;
        self.angular_velocity = 0.0;
        self.location = location;
        self.status = StatusFlags::default();
        self.physics_driver = None;
        self.last_obstacle = None;
        self.crossing_plane = None;
        self.touching_link = None;
        self.death_driver = None;
        self.last_teleport = None;
        self.explode_elapsed = 0.0;
        self.flaps_remaining = 0;
        self.clock = 0.0;
    }

    /// Start exploding. Only live tanks explode; returns whether it did.
    pub fn explode(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.location = Location::Exploding;
        self.explode_elapsed = 0.0;
        self.angular_velocity = 0.0;
        self.status.set(StatusFlags::FALLING, false);
        self.status.set(StatusFlags::CROSSING_WALL, false);
        self.crossing_plane = None;
        true
    }

    pub fn kill(&mut self) {
        self.location = Location::Dead;
        self.velocity = Vec3::ZERO;
        self.angular_velocity = 0.0;
        self.physics_driver = None;
        self.crossing_plane = None;
    }

    pub fn horizontal_speed(&self) -> f32 {
        self.velocity.truncate().length()
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        MotionSnapshot {
            position: self.position,
            azimuth: self.azimuth,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
            location: self.location,
            physics_driver: self.physics_driver,
            status: self.status,
            last_teleport: self.last_teleport,
        }
    }
}

/// Per-tick state published to renderers, network and audio layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSnapshot {
    pub position: Vec3,
    pub azimuth: f32,
    pub velocity: Vec3,
    pub angular_velocity: f32,
    pub location: Location,
    pub physics_driver: Option<DriverId>,
    pub status: StatusFlags,
    pub last_teleport: Option<TeleportRecord>,
}

/// Which pass-through sound a teleport should play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeleportCue {
    Silent,
    Default,
    Custom(String),
}

/// Something noteworthy that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionEvent {
    /// Stepped up onto a low ledge.
    Bumped { obstacle: ObstacleId, height: f32 },
    /// Touched down after being airborne.
    Landed { speed: f32 },
    /// Launched upward by a driver.
    Bounced { driver: DriverId },
    /// Sank below the surface.
    Burrowed,
    /// Started the tick inside an obstacle.
    Stuck { obstacle: ObstacleId },
    ExplosionFinished,
    Teleported {
        source: LinkFaceId,
        dest: LinkFaceId,
        cue: TeleportCue,
        message: Option<String>,
    },
    TeleportBlocked { source: LinkFaceId, rebound: bool },
    TeleportRejected {
        source: LinkFaceId,
        message: Option<String>,
    },
    PhantomToggled { zoned: bool },
    DeathDriver {
        driver: DriverId,
        message: Option<String>,
    },
}

/// Events produced by one tick, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub events: Vec<MotionEvent>,
}

impl TickReport {
    pub fn push(&mut self, event: MotionEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MotionEvent> {
        self.events.iter()
    }

    /// The teleport applied this tick, if any.
    pub fn teleport(&self) -> Option<(LinkFaceId, LinkFaceId)> {
        self.events.iter().find_map(|event| match event {
            MotionEvent::Teleported { source, dest, .. } => Some((*source, *dest)),
            _ => None,
        })
    }

    pub fn bumped(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, MotionEvent::Bumped { .. }))
    }

    /// Death driver touched this tick, if any.
    pub fn death_driver(&self) -> Option<DriverId> {
        self.events.iter().find_map(|event| match event {
            MotionEvent::DeathDriver { driver, .. } => Some(*driver),
            _ => None,
        })
    }
}
