//! Link table: portal faces and the targets each source face leads to.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::transform::{LinkFace, LinkFaceId, LinkTransform, Plane};
use super::{LinkResolution, LinkResolver};
use crate::collision::{Pose, TankDimensions};
use crate::error::WorldError;
use crate::movement::{Capability, Team};

/// Per-link behavior flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkBehavior {
    /// Bounce off a blocked destination instead of stopping.
    pub rebound: bool,
    /// Play no sound on pass-through.
    pub silent: bool,
    pub pass_message: Option<String>,
    pub pass_sound: Option<String>,
    /// Message for tanks the link turns away.
    pub fail_message: Option<String>,
}

/// One destination reachable from a source face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub dest: LinkFaceId,
    /// Only tanks of this team may pass.
    pub team: Option<Team>,
    /// Tanks carrying any of these may not pass.
    pub denied: Vec<Capability>,
    pub behavior: LinkBehavior,
}

impl LinkTarget {
    pub fn to(dest: LinkFaceId) -> Self {
        Self {
            dest,
            team: None,
            denied: Vec::new(),
            behavior: LinkBehavior::default(),
        }
    }

    pub fn with_behavior(mut self, behavior: LinkBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn for_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    pub fn denying(mut self, capability: Capability) -> Self {
        self.denied.push(capability);
        self
    }

    fn admits(&self, team: Team, capability: Capability) -> bool {
        self.team.map_or(true, |t| t == team) && !self.denied.contains(&capability)
    }
}

/// Arena of portal faces and their outgoing targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkTable {
    faces: Vec<LinkFace>,
    /// Parallel to `faces`.
    targets: Vec<Vec<LinkTarget>>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertical portal face.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the face rectangle
    /// * `normal` - Front direction; tanks enter moving against it
    /// * `half_width` - Half the horizontal extent
    /// * `half_height` - Half the vertical extent
    pub fn add_face(
        &mut self,
        center: Vec3,
        normal: Vec3,
        half_width: f32,
        half_height: f32,
    ) -> Result<LinkFaceId, WorldError> {
        let normal = Vec3::new(normal.x, normal.y, 0.0).normalize_or_zero();
        if normal == Vec3::ZERO {
            return Err(WorldError::Degenerate("link face normal must have a horizontal part"));
        }
        if half_width <= 0.0 || half_height <= 0.0 {
            return Err(WorldError::Degenerate("link face must have positive size"));
        }

        let id = LinkFaceId(self.faces.len() as u32);
        self.faces.push(LinkFace {
            id,
            center,
            normal,
            up: Vec3::Z,
            half_width,
            half_height,
            touch: false,
        });
        self.targets.push(Vec::new());
        Ok(id)
    }

    /// Make a face teleport on touch rather than on plane crossing.
    pub fn set_touch(&mut self, id: LinkFaceId, touch: bool) -> Result<(), WorldError> {
        self.faces
            .get_mut(id.0 as usize)
            .ok_or(WorldError::UnknownLinkFace(id))?
            .touch = touch;
        Ok(())
    }

    /// Add a target to `source`. Targets are tried in insertion order.
    pub fn link(&mut self, source: LinkFaceId, target: LinkTarget) -> Result<(), WorldError> {
        if self.face(target.dest).is_none() {
            return Err(WorldError::UnknownLinkFace(target.dest));
        }
        self.targets
            .get_mut(source.0 as usize)
            .ok_or(WorldError::UnknownLinkFace(source))?
            .push(target);
        Ok(())
    }

    pub fn face(&self, id: LinkFaceId) -> Option<&LinkFace> {
        self.faces.get(id.0 as usize)
    }

    pub fn faces(&self) -> impl Iterator<Item = &LinkFace> {
        self.faces.iter()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    fn is_source(&self, id: LinkFaceId) -> bool {
        self.targets
            .get(id.0 as usize)
            .is_some_and(|targets| !targets.is_empty())
    }
}

impl LinkResolver for LinkTable {
    fn crossed_source(&self, from: Pose, to: Pose, dims: TankDimensions) -> Option<LinkFaceId> {
        let start = from.center(dims);
        let end = to.center(dims);
        let mut best: Option<(f32, LinkFaceId)> = None;

        for face in self.faces.iter().filter(|f| !f.touch && self.is_source(f.id)) {
            let plane = face.plane();
            let d0 = plane.signed_distance(start);
            let d1 = plane.signed_distance(end);
            if d0 < 0.0 || d1 >= 0.0 {
                continue;
            }

            let t = d0 / (d0 - d1);
            let hit = start.lerp(end, t);
            if !face.covers(hit, Vec3::ZERO) {
                continue;
            }
            if best.map_or(true, |(best_t, _)| t < best_t) {
                best = Some((t, face.id));
            }
        }

        best.map(|(_, id)| id)
    }

    fn crossing_plane(&self, pose: Pose, dims: TankDimensions) -> Option<Plane> {
        let half = dims.half_extents();
        let margin = Vec3::new(half.x.max(half.y), half.z, 0.0);
        let center = pose.center(dims);

        self.faces
            .iter()
            .filter(|face| !face.touch && face.covers(center, margin))
            .find_map(|face| {
                let plane = face.plane();
                let corners = dims.corners(pose);
                let front = corners.iter().any(|c| plane.signed_distance(*c) > 0.0);
                let back = corners.iter().any(|c| plane.signed_distance(*c) < 0.0);
                (front && back).then_some(plane)
            })
    }

    fn resolve_destination(
        &self,
        source: LinkFaceId,
        team: Team,
        capability: Capability,
        _position: Vec3,
        velocity: Vec3,
    ) -> Option<LinkResolution> {
        let face = self.face(source)?;
        if velocity.dot(face.normal) >= 0.0 {
            return None;
        }

        let target = self
            .targets
            .get(source.0 as usize)?
            .iter()
            .find(|target| target.admits(team, capability))?;
        let dest = self.face(target.dest)?;

        Some(LinkResolution {
            source,
            dest: dest.id,
            transform: LinkTransform::between(face, dest),
            behavior: target.behavior.clone(),
            source_plane: face.plane(),
        })
    }

    fn fail_message(&self, source: LinkFaceId) -> Option<&str> {
        self.targets
            .get(source.0 as usize)?
            .iter()
            .find_map(|target| target.behavior.fail_message.as_deref())
    }
}
