//! Teleport links (portals).
//!
//! A link connects a source face to one or more destination faces. Crossing
//! the source front sends the tank out of the destination front with its
//! offset, velocity and heading remapped by a [`LinkTransform`].
//!
//! Tangible (touch) faces are triggered by the contact resolver when the
//! tank touches the obstacle carrying them; every other source face is
//! triggered when the tank center crosses its plane.

mod table;
mod transform;

use glam::Vec3;

use crate::collision::{Pose, TankDimensions};
use crate::movement::{Capability, Team};

pub use table::{LinkBehavior, LinkTable, LinkTarget};
pub use transform::{LinkFace, LinkFaceId, LinkTransform, Plane};

/// A destination the resolver accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkResolution {
    pub source: LinkFaceId,
    pub dest: LinkFaceId,
    pub transform: LinkTransform,
    pub behavior: LinkBehavior,
    /// Plane of the source face, used for rebounds and touch entries.
    pub source_plane: Plane,
}

/// Read-only access to the world's teleport links.
pub trait LinkResolver {
    /// First non-touch source face whose front the tank center crosses
    /// moving from `from` to `to`.
    fn crossed_source(&self, from: Pose, to: Pose, dims: TankDimensions) -> Option<LinkFaceId>;

    /// Plane of a portal face the tank box currently straddles.
    fn crossing_plane(&self, pose: Pose, dims: TankDimensions) -> Option<Plane>;

    /// Pick a destination for a tank entering `source`. `None` when the
    /// link turns the tank away.
    fn resolve_destination(
        &self,
        source: LinkFaceId,
        team: Team,
        capability: Capability,
        position: Vec3,
        velocity: Vec3,
    ) -> Option<LinkResolution>;

    /// Notification for tanks turned away by `source`.
    fn fail_message(&self, _source: LinkFaceId) -> Option<&str> {
        None
    }
}
