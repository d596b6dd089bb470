//! Tank motion.
//!
//! Each tick runs through the same pipeline:
//!
//! - **Compose**: turn control input, momentum, gravity and any physics
//!   driver underneath into a candidate velocity
//! - **Resolve**: sweep the tank along that velocity, searching for the time
//!   of impact when blocked and sliding along or stepping onto what it hit
//! - **Teleport**: carry the tank through a link face it crossed or touched
//! - **Classify**: settle the tank's location for the next tick
//!
//! # Design
//!
//! Motion is driven by the [`TankController`], which owns only configuration
//! and advances a [`ActorState`] against a read-only [`World`](crate::World).
//!
//! All motion is deterministic: the same inputs always produce the same
//! outputs, making it suitable for lockstep multiplayer.

mod compose;
mod config;
mod controller;
mod resolve;
mod state;
mod teleport;

pub use compose::{compose_velocity, slide_blend, Candidate};
pub use config::MotionConfig;
pub use controller::TankController;
pub use resolve::{advance, find_support, resolve_motion, Bump, Impact, Motion, Resolution};
pub use state::{
    ActorState, Capability, ControlInput, Location, MotionEvent, MotionSnapshot, StatusFlags,
    Team, TeleportCue, TeleportRecord, TickReport,
};
pub use teleport::{handle_teleport, Passage, TeleportOutcome};
