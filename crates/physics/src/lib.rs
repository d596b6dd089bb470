//! Tread Physics Engine
//!
//! A deterministic tank motion engine for lockstep and server-verified play.
//! Each tick advances one actor through a world of static obstacles, teleport
//! links and physics-driver regions, producing a pose that never ends up
//! inside geometry that should have stopped it.
//!
//! # Architecture
//!
//! The engine is split into the motion core and the world collaborators it
//! queries:
//!
//! - **Collision**: obstacle arena and the blocking-obstacle query
//! - **Drivers**: velocity-field descriptors keyed by driver id
//! - **Links**: portal faces and the pose remap between them
//! - **Movement**: velocity composition, contact resolution, bumps,
//!   teleports and the location state machine
//!
//! # Design Principles
//!
//! 1. **Determinism**: Same inputs always produce same outputs across platforms
//! 2. **Bounded work**: every tick finishes within fixed iteration budgets
//! 3. **Read-only world**: a tick mutates only the actor it advances
//! 4. **Handles, not pointers**: obstacles, drivers and links are arena ids

pub mod collision;
pub mod drivers;
pub mod error;
pub mod links;
pub mod movement;
pub mod world;

// Re-export commonly used types
pub use collision::{
    Contact, Obstacle, ObstacleId, ObstacleKind, ObstacleQuery, ObstacleShape, ObstacleWorld,
    Pose, TankDimensions,
};
pub use drivers::{DriverId, DriverRegistry, DriverTable, PhysicsDriver};
pub use error::{ConfigError, WorldError};
pub use links::{
    LinkBehavior, LinkFace, LinkFaceId, LinkResolution, LinkResolver, LinkTable, LinkTarget,
    LinkTransform, Plane,
};
pub use movement::{
    ActorState, Capability, ControlInput, Location, MotionConfig, MotionEvent, MotionSnapshot,
    StatusFlags, TankController, Team, TeleportCue, TeleportRecord, TickReport,
};
pub use world::{StaticWorld, World};
