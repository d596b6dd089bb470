//! Portal faces and the remap between a source and a destination face.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Stable handle into the link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkFaceId(pub u32);

/// An oriented plane: points `p` with `normal.dot(p) == distance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn through(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            distance: normal.dot(point),
        }
    }

    /// Positive in front of the plane.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }

    /// Reflect a vector about this plane: `v - 2N(N·v)`.
    #[inline]
    pub fn reflect(&self, v: Vec3) -> Vec3 {
        v - 2.0 * self.normal * self.normal.dot(v)
    }

    /// Mirror a point to the other side of the plane.
    #[inline]
    pub fn mirror_point(&self, point: Vec3) -> Vec3 {
        point - 2.0 * self.normal * self.signed_distance(point)
    }
}

/// A rectangular portal face.
///
/// Tanks enter through the front (the side `normal` points to) and leave a
/// destination face through its front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkFace {
    pub id: LinkFaceId,
    pub center: Vec3,
    /// Unit front normal.
    pub normal: Vec3,
    /// Unit up direction in the face plane.
    pub up: Vec3,
    pub half_width: f32,
    pub half_height: f32,
    /// Tangible faces teleport on touch; the rest on plane crossing.
    pub touch: bool,
}

impl LinkFace {
    /// Unit right direction in the face plane.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.up.cross(self.normal)
    }

    pub fn plane(&self) -> Plane {
        Plane::through(self.center, self.normal)
    }

    /// Components of `point - center` along (right, up, normal).
    pub fn local(&self, point: Vec3) -> Vec3 {
        let offset = point - self.center;
        Vec3::new(
            offset.dot(self.right()),
            offset.dot(self.up),
            offset.dot(self.normal),
        )
    }

    /// Whether `point` projects inside the face rectangle grown by `margin`.
    pub fn covers(&self, point: Vec3, margin: Vec3) -> bool {
        let local = self.local(point);
        local.x.abs() <= self.half_width + margin.x && local.y.abs() <= self.half_height + margin.y
    }

    /// Corners of the face rectangle, counter-clockwise seen from the front.
    pub fn corners(&self) -> [Vec3; 4] {
        let right = self.right() * self.half_width;
        let up = self.up * self.half_height;
        [
            self.center - right - up,
            self.center + right - up,
            self.center + right + up,
            self.center - right + up,
        ]
    }
}

/// Orthonormal frame of a portal face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct FaceFrame {
    center: Vec3,
    right: Vec3,
    up: Vec3,
    normal: Vec3,
}

impl From<&LinkFace> for FaceFrame {
    fn from(face: &LinkFace) -> Self {
        Self {
            center: face.center,
            right: face.right(),
            up: face.up,
            normal: face.normal,
        }
    }
}

/// Rigid remap from a source face to a destination face.
///
/// A tank entering the source front moving against its normal leaves the
/// destination front moving along the destination normal. The remap is a
/// half turn about the face up axis, so it preserves handedness and the
/// B→A transform exactly undoes A→B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkTransform {
    source: FaceFrame,
    dest: FaceFrame,
}

impl LinkTransform {
    pub fn between(source: &LinkFace, dest: &LinkFace) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// The transform for travelling back through the link.
    pub fn inverse(&self) -> Self {
        Self {
            source: self.dest,
            dest: self.source,
        }
    }

    pub fn apply_direction(&self, v: Vec3) -> Vec3 {
        let right = v.dot(self.source.right);
        let up = v.dot(self.source.up);
        let normal = v.dot(self.source.normal);
        -right * self.dest.right + up * self.dest.up - normal * self.dest.normal
    }

    pub fn apply_point(&self, point: Vec3) -> Vec3 {
        self.dest.center + self.apply_direction(point - self.source.center)
    }

    /// Remap a heading. Headings that end up vertical keep their azimuth.
    pub fn apply_azimuth(&self, azimuth: f32) -> f32 {
        let (sin, cos) = azimuth.sin_cos();
        let heading = self.apply_direction(Vec3::new(cos, sin, 0.0));
        if heading.truncate().length_squared() > 1e-12 {
            heading.y.atan2(heading.x)
        } else {
            azimuth
        }
    }
}
