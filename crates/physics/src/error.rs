//! Errors raised while building worlds or loading configuration.
//!
//! The per-tick motion update never fails; these only cover setup.

use thiserror::Error;

use crate::collision::ObstacleId;
use crate::links::LinkFaceId;

/// Error building or editing world geometry.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    #[error("face needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),

    #[error("convex hull could not be built for obstacle")]
    HullFailed,

    #[error("unknown obstacle {0:?}")]
    UnknownObstacle(ObstacleId),

    #[error("unknown link face {0:?}")]
    UnknownLinkFace(LinkFaceId),
}

/// Error loading or validating a motion configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
