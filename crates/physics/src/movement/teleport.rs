//! Portal traversal.
//!
//! Runs after contact resolution. At most one teleport applies per tick;
//! a touched tangible face wins over a crossed plane.

use glam::Vec3;

use super::config::MotionConfig;
use super::state::{
    ActorState, Capability, Location, MotionEvent, StatusFlags, TeleportCue, TeleportRecord,
    TickReport,
};
use crate::collision::Pose;
use crate::links::{LinkBehavior, LinkFaceId};
use crate::world::World;

/// What the teleport handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportOutcome {
    /// No portal was entered.
    None,
    /// Phantom-zone toggle instead of a jump.
    Zoned,
    /// The link turned the tank away.
    Rejected,
    /// Destination was blocked; the tank was put back.
    Blocked,
    Teleported,
}

/// The tick's movement as seen by the teleport handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Passage {
    /// Pose at the start of the tick.
    pub previous: Pose,
    pub previous_location: Location,
    /// Composed velocity before contact resolution.
    pub entry_velocity: Vec3,
    /// Tangible portal face touched during resolution.
    pub touched: Option<LinkFaceId>,
}

/// Detect a portal entry and apply it to `state`, which already holds the
/// resolved pose for this tick.
pub fn handle_teleport<W: World + ?Sized>(
    state: &mut ActorState,
    passage: &Passage,
    world: &W,
    config: &MotionConfig,
    report: &mut TickReport,
) -> TeleportOutcome {
    let dims = config.dims();
    // Pressing on the same face again is not a new entry.
    let touched = passage.touched.filter(|face| state.touching_link != Some(*face));
    state.touching_link = passage.touched;
    let Some(source) =
        touched.or_else(|| world.crossed_source(passage.previous, state.pose(), dims))
    else {
        return TeleportOutcome::None;
    };

    if state.capability == Capability::PhantomZone {
        let zoned = state.status.toggle(StatusFlags::PHANTOM_ZONED);
        log::debug!("phantom zone toggled to {zoned} at link {source:?}");
        report.push(MotionEvent::PhantomToggled { zoned });
        return TeleportOutcome::Zoned;
    }

    let Some(link) = world.resolve_destination(
        source,
        state.team,
        state.capability,
        state.position,
        passage.entry_velocity,
    ) else {
        report.push(MotionEvent::TeleportRejected {
            source,
            message: world.fail_message(source).map(str::to_owned),
        });
        return TeleportOutcome::Rejected;
    };

    // Touch entries stop in front of the face; mirror them to the far side
    // so they leave in front of the destination.
    let entry = if touched.is_some() {
        link.source_plane.mirror_point(state.position)
    } else {
        state.position
    };

    let mut dest = Pose::new(
        link.transform.apply_point(entry),
        link.transform.apply_azimuth(state.azimuth),
    );
    let velocity = link.transform.apply_direction(passage.entry_velocity);

    let ground_limit = world.ground_limit(state.capability);
    let phased = state.is_phased();
    let clear = |pose: Pose| {
        world
            .blocking_obstacle(pose, pose, dims, phased)
            .map_or(true, |contact| !contact.expel)
    };

    if !clear(dest) {
        dest.position.z += config.teleport_nudge;
    }

    if !clear(dest) || dest.position.z < ground_limit - config.ground_epsilon {
        let rebound = link.behavior.rebound;
        log::debug!("teleport {source:?} -> {:?} blocked (rebound: {rebound})", link.dest);

        state.set_pose(passage.previous);
        state.set_location(passage.previous_location);
        state.touching_link = None;
        if rebound {
            state.velocity = link.source_plane.reflect(passage.entry_velocity);
        } else {
            state.velocity.x = 0.0;
            state.velocity.y = 0.0;
        }
        report.push(MotionEvent::TeleportBlocked { source, rebound });
        return TeleportOutcome::Blocked;
    }

    log::debug!("teleport {source:?} -> {:?} at {:?}", link.dest, dest.position);
    state.set_pose(dest);
    state.velocity = velocity;
    let location = if dest.position.z == ground_limit && velocity.z == 0.0 {
        Location::OnGround
    } else {
        Location::InAir
    };
    state.set_location(location);
    state.last_obstacle = None;
    state.physics_driver = None;
    state.death_driver = None;
    state.touching_link = None;
    state.last_teleport = Some(TeleportRecord {
        source,
        dest: link.dest,
        time: state.clock,
    });

    report.push(MotionEvent::Teleported {
        source,
        dest: link.dest,
        cue: cue(&link.behavior),
        message: link.behavior.pass_message.clone(),
    });
    TeleportOutcome::Teleported
}

fn cue(behavior: &LinkBehavior) -> TeleportCue {
    match &behavior.pass_sound {
        _ if behavior.silent => TeleportCue::Silent,
        Some(sound) => TeleportCue::Custom(sound.clone()),
        None => TeleportCue::Default,
    }
}
