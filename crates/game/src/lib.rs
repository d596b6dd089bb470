//! Tread Game Logic
//!
//! This crate contains the tank simulation built on the motion core:
//!
//! - Key-state input and its conversion to motion commands
//! - Tanks with an explode / die / respawn lifecycle
//! - Levels with spawn points
//! - A fixed-tick simulation that splits long frames into capped sub-ticks
//!
//! # Architecture
//!
//! The game uses a deterministic simulation suitable for lockstep multiplayer.
//! All state updates are driven by tank input and a fixed timestep.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Game Simulation                         │
//! │  ┌─────────┐    ┌──────────┐    ┌────────────────────────┐  │
//! │  │ Input   │───►│ Motion   │───►│ Game State             │  │
//! │  │ Keys    │    │ (resolve,│    │ (tanks, lifecycle,     │  │
//! │  └─────────┘    │ teleport)│    │  level)                │  │
//! │                 └──────────┘    └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod input;
pub mod level;
pub mod simulation;
pub mod tank;

// Re-export main types
pub use input::TankInput;
pub use level::{Level, SpawnPoint};
pub use simulation::{Simulation, SimulationConfig, TankReport};
pub use tank::{EntityId, Tank};

// Re-export physics types for convenience
pub use tread_physics::{
    ActorState, ControlInput, Location, MotionConfig, MotionEvent, MotionSnapshot,
    StaticWorld, TankController, Team,
};
