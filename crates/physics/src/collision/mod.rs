//! Static obstacle geometry and the blocking-obstacle query.
//!
//! # Key Types
//!
//! - [`ObstacleWorld`]: The obstacle arena containing all level geometry
//! - [`ObstacleQuery`]: What the motion core asks of the world
//! - [`Obstacle`]: Tagged shape plus driver and portal attachments
//!
//! # Query Semantics
//!
//! A blocking query tests the tank box at its end pose and returns:
//! - The single most relevant overlapping obstacle (expelling ones first)
//! - Whether that contact should push the tank out
//!
//! Shapes that merely touch (penetration under [`CONTACT_SLOP`]) do not block.

mod obstacle;
mod query;
mod world;

pub use obstacle::{polygon_normal, Obstacle, ObstacleId, ObstacleKind, ObstacleShape};
pub use query::{Contact, ObstacleQuery, Pose, TankDimensions};
pub use world::{ObstacleWorld, CONTACT_SLOP, DEFAULT_BURROW_DEPTH};
