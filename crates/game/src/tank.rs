//! Tank entity and lifecycle.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tread_physics::{ActorState, Location, MotionSnapshot, Team};

/// Unique identifier for entities.
pub type EntityId = u32;

/// A tank in the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    /// Unique tank ID.
    pub id: EntityId,

    /// Callsign.
    pub name: String,

    /// Motion state.
    pub state: ActorState,

    /// Seconds left before a dead tank respawns.
    pub respawn_timer: f32,

    /// Deaths this session.
    pub deaths: u32,

    /// Teleports taken this session.
    pub teleports: u32,
}

impl Tank {
    /// Create a new tank. It starts dead; the simulation spawns it.
    pub fn new(id: EntityId, name: String, team: Team) -> Self {
        Self {
            id,
            name,
            state: ActorState::new(team),
            respawn_timer: 0.0,
            deaths: 0,
            teleports: 0,
        }
    }

    /// Get the tank's current position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.state.location()
    }

    /// Check if the tank is alive.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    /// Blow the tank up. Returns false if it was not alive.
    pub fn explode(&mut self) -> bool {
        self.state.explode()
    }

    /// Record a finished explosion and start the respawn countdown.
    pub fn on_death(&mut self, respawn_delay: f32) {
        self.deaths += 1;
        self.respawn_timer = respawn_delay;
    }

    /// Count the respawn timer down. Returns true once the tank may respawn.
    pub fn tick_respawn(&mut self, dt: f32) -> bool {
        if self.state.location() != Location::Dead {
            return false;
        }
        self.respawn_timer = (self.respawn_timer - dt).max(0.0);
        self.respawn_timer == 0.0
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tank_creation() {
        let tank = Tank::new(1, "Test".to_string(), Team::Red);
        assert!(!tank.is_alive(), "waits for its first spawn");
        assert_eq!(tank.location(), Location::Dead);
        assert_eq!(tank.state.team, Team::Red);
    }

    #[test]
    fn test_dead_tank_does_not_explode() {
        let mut tank = Tank::new(1, "Test".to_string(), Team::Rogue);
        assert!(!tank.explode());
    }

    #[test]
    fn test_respawn_countdown() {
        let mut tank = Tank::new(1, "Test".to_string(), Team::Rogue);
        tank.on_death(1.0);
        assert_eq!(tank.deaths, 1);

        assert!(!tank.tick_respawn(0.6));
        assert!(tank.tick_respawn(0.6));
    }
}
