//! Iterative contact resolution.
//!
//! Advances the tank along its candidate velocity in up to `max_steps`
//! sub-steps. Each blocked sub-step either bumps the tank up a low ledge or
//! bisects for the time of impact, cancels the velocity going into the
//! contact normal and carries on with the rest of the tick.

use glam::Vec3;

use super::config::MotionConfig;
use super::state::Location;
use crate::collision::{Contact, ObstacleId, ObstacleQuery, Pose, TankDimensions};
use crate::links::LinkFaceId;

/// The tank's composed motion for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub start: Pose,
    pub velocity: Vec3,
    pub angular_velocity: f32,
    pub dt: f32,
    /// Location before the tick.
    pub location: Location,
    pub phased: bool,
    pub ground_limit: f32,
}

/// A step up onto a ledge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bump {
    pub obstacle: ObstacleId,
    pub height: f32,
}

/// Outcome of resolving one tick of motion.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub pose: Pose,
    pub velocity: Vec3,
    pub angular_velocity: f32,
    pub location: Location,
    pub last_obstacle: Option<ObstacleId>,
    /// Tangible portal face touched during the tick.
    pub touched_link: Option<LinkFaceId>,
    pub bump: Option<Bump>,
    /// Obstacle the tank started the tick inside of.
    pub stuck: Option<ObstacleId>,
    /// Outer steps used.
    pub steps: u32,
}

/// Result of a time-of-impact search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    /// Latest time found free of expelling contacts.
    pub free_time: f32,
    pub free_pose: Pose,
    /// Contact at the earliest blocked time found.
    pub contact: Contact,
    pub hit_pose: Pose,
}

/// Integrate a pose, clamping falling tanks at the ground limit.
pub fn advance(pose: Pose, velocity: Vec3, angular_velocity: f32, t: f32, ground_limit: f32) -> Pose {
    let mut position = pose.position + velocity * t;
    if velocity.z < 0.0 && position.z < ground_limit {
        position.z = ground_limit.min(pose.position.z);
    }
    Pose::new(position, pose.azimuth + angular_velocity * t)
}

/// Resolve one tick of motion against the world.
pub fn resolve_motion<Q: ObstacleQuery + ?Sized>(
    world: &Q,
    motion: &Motion,
    config: &MotionConfig,
) -> Resolution {
    let mut sweep = Sweep {
        world,
        dims: config.dims(),
        phased: motion.phased,
        ground_limit: motion.ground_limit,
        config,
        skip: None,
    };
    let alive = motion.location.is_alive();
    let start = motion.start;

    let mut resolution = Resolution {
        pose: start,
        velocity: motion.velocity,
        angular_velocity: motion.angular_velocity,
        location: motion.location,
        last_obstacle: None,
        touched_link: None,
        bump: None,
        stuck: None,
        steps: 0,
    };

    // Already inside something solid: let the tank drive out of it, while
    // everything else still blocks.
    if let Some(contact) = sweep.blocked(start, start) {
        log::debug!("tank starts inside obstacle {:?}", contact.obstacle);
        resolution.stuck = Some(contact.obstacle);
        resolution.last_obstacle = Some(contact.obstacle);
        sweep.skip = Some(contact.obstacle);
    }

    let mut pose = start;
    let mut safe = start;
    let mut velocity = motion.velocity;
    let mut angular_velocity = motion.angular_velocity;
    let mut remaining = motion.dt;
    let mut standing = false;
    let mut backed_off = false;

    for step in 0..config.max_steps {
        resolution.steps = step + 1;

        let next = sweep.advance(pose, velocity, angular_velocity, remaining);
        let Some(contact) = sweep.blocked(pose, next) else {
            pose = next;
            safe = next;
            break;
        };
        sweep.record(&mut resolution, contact.obstacle);

        if alive && !motion.phased && motion.location != Location::InAir && sweep.skip.is_none() {
            if let Some((bumped, height)) =
                sweep.try_bump(pose, velocity, angular_velocity, remaining, contact.obstacle)
            {
                log::debug!("bumped {height:.3} onto obstacle {:?}", contact.obstacle);
                pose = bumped;
                safe = bumped;
                velocity.z = 0.0;
                standing = true;
                resolution.bump = Some(Bump {
                    obstacle: contact.obstacle,
                    height,
                });
                break;
            }
        }

        let impact = sweep.time_of_impact(pose, velocity, angular_velocity, remaining, contact);
        pose = impact.free_pose;
        if impact.free_time > 0.0 {
            safe = pose;
        }
        remaining -= impact.free_time;
        sweep.record(&mut resolution, impact.contact.obstacle);

        let normal = world
            .surface_normal(impact.contact.obstacle, impact.hit_pose, sweep.dims)
            .filter(|n| n.is_finite() && n.length_squared() > 1e-12);
        let Some(normal) = normal else {
            // No usable normal; stop rather than guess.
            velocity = Vec3::ZERO;
            angular_velocity = 0.0;
            continue;
        };

        if pose.position.z > sweep.ground_limit && normal.z > config.normal_threshold {
            standing = alive;
            velocity.z = 0.0;
        } else {
            let mut magnitude = normal.x * velocity.x + normal.y * velocity.y;

            if normal.z.abs() > f32::EPSILON {
                if velocity.z < 0.0 && velocity.z - (magnitude + normal.z) * normal.z > 0.0 {
                    velocity.z = 0.0;
                }
                let horizontal = normal.x * normal.x + normal.y * normal.y;
                if horizontal > f32::EPSILON {
                    magnitude /= horizontal;
                }
            }

            if magnitude < 0.0 {
                velocity.x -= magnitude * normal.x;
                velocity.y -= magnitude * normal.y;
                if !backed_off {
                    pose.position.x -= config.tiny_distance * magnitude * normal.x;
                    pose.position.y -= config.tiny_distance * magnitude * normal.y;
                    backed_off = true;
                }
            }

            if magnitude > config.jam_threshold {
                angular_velocity = 0.0;
            }
        }

        if remaining <= 0.0 {
            break;
        }
    }

    // Best effort: never finish inside something that expels.
    if sweep.blocked(pose, pose).is_some() {
        pose = safe;
    }

    if alive && !standing && velocity.z <= 0.0 && sweep.skip.is_none() {
        if let Some(support) = sweep.support(pose) {
            resolution.last_obstacle = Some(support);
            standing = pose.position.z > sweep.ground_limit;
        }
    }

    if pose.position.z <= sweep.ground_limit && velocity.z < 0.0 {
        velocity.z = 0.0;
    }

    resolution.location = if !alive {
        motion.location
    } else if resolution.stuck.is_some() {
        Location::InBuilding
    } else if world
        .blocking_obstacle(pose, pose, sweep.dims, motion.phased)
        .is_some_and(|c| !c.expel)
    {
        Location::InBuilding
    } else if standing {
        Location::OnBuilding
    } else if pose.position.z <= sweep.ground_limit {
        Location::OnGround
    } else {
        Location::InAir
    };

    resolution.pose = pose;
    resolution.velocity = velocity;
    resolution.angular_velocity = angular_velocity;
    resolution
}

/// Shared parameters of the queries made during one resolution.
struct Sweep<'a, Q: ?Sized> {
    world: &'a Q,
    dims: TankDimensions,
    phased: bool,
    ground_limit: f32,
    config: &'a MotionConfig,
    /// Obstacle the tank started inside, ignored while it drives out.
    skip: Option<ObstacleId>,
}

impl<Q: ObstacleQuery + ?Sized> Sweep<'_, Q> {
    #[inline]
    fn advance(&self, pose: Pose, velocity: Vec3, angular_velocity: f32, t: f32) -> Pose {
        advance(pose, velocity, angular_velocity, t, self.ground_limit)
    }

    /// Expelling contact at `to`, if any.
    fn blocked(&self, from: Pose, to: Pose) -> Option<Contact> {
        let contact = match self.skip {
            Some(skip) => self
                .world
                .blocking_obstacle_except(from, to, self.dims, self.phased, skip),
            None => self.world.blocking_obstacle(from, to, self.dims, self.phased),
        };
        contact.filter(|contact| contact.expel)
    }

    fn record(&self, resolution: &mut Resolution, obstacle: ObstacleId) {
        resolution.last_obstacle = Some(obstacle);
        if resolution.touched_link.is_none() {
            resolution.touched_link = self.world.obstacle(obstacle).and_then(|o| o.link);
        }
    }

    /// Bisect `[0, t]` for the latest time the tank is free. `contact` is
    /// the expelling contact already found at `t`.
    fn time_of_impact(
        &self,
        from: Pose,
        velocity: Vec3,
        angular_velocity: f32,
        t: f32,
        contact: Contact,
    ) -> Impact {
        let mut free_time = 0.0;
        let mut hit_time = t;
        let mut contact = contact;
        let mut search_step = 0.5 * t;
        let mut searches = 0;

        while search_step > self.config.min_search_step && searches < self.config.max_search_steps {
            let probe_time = free_time + search_step;
            let probe = self.advance(from, velocity, angular_velocity, probe_time);
            match self.blocked(from, probe) {
                Some(found) => {
                    hit_time = probe_time;
                    contact = found;
                }
                None => free_time = probe_time,
            }
            search_step *= 0.5;
            searches += 1;
        }

        Impact {
            free_time,
            free_pose: self.advance(from, velocity, angular_velocity, free_time),
            contact,
            hit_pose: self.advance(from, velocity, angular_velocity, hit_time),
        }
    }

    /// Try to lift the tank onto the flat top of `obstacle`.
    ///
    /// The probe takes `bump_speed_factor` of the step's horizontal travel;
    /// a single retry scales it by `bump_retry_scale`. Both factors are
    /// tuned by feel.
    fn try_bump(
        &self,
        from: Pose,
        velocity: Vec3,
        angular_velocity: f32,
        t: f32,
        obstacle: ObstacleId,
    ) -> Option<(Pose, f32)> {
        let obstacle = self.world.obstacle(obstacle)?;
        if !obstacle.is_flat_top() {
            return None;
        }

        let top = obstacle.top();
        let height = top - from.position.z;
        if height <= 0.0 || height >= self.config.max_bump_height {
            return None;
        }

        let mut factor = self.config.bump_speed_factor;
        for _ in 0..2 {
            let travel = velocity.truncate() * (t * factor);
            let probe = Pose::new(
                Vec3::new(from.position.x + travel.x, from.position.y + travel.y, top),
                from.azimuth + angular_velocity * t * factor,
            );
            let clear = self
                .world
                .blocking_obstacle(from, probe, self.dims, false)
                .map_or(true, |contact| !contact.expel);
            if clear {
                return Some((probe, height));
            }
            factor *= self.config.bump_retry_scale;
        }

        None
    }

    fn support(&self, pose: Pose) -> Option<ObstacleId> {
        find_support(self.world, pose, self.phased, self.config)
    }
}

/// Obstacle holding the tank up, if one is within `support_probe` below.
pub fn find_support<Q: ObstacleQuery + ?Sized>(
    world: &Q,
    pose: Pose,
    phased: bool,
    config: &MotionConfig,
) -> Option<ObstacleId> {
    let dims = config.dims();
    let below = Pose::new(pose.position - Vec3::Z * config.support_probe, pose.azimuth);
    let contact = world
        .blocking_obstacle(pose, below, dims, phased)
        .filter(|contact| contact.expel)?;
    let normal = world.surface_normal(contact.obstacle, below, dims)?;
    (normal.z > config.normal_threshold).then_some(contact.obstacle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ObstacleWorld;
    use glam::Vec2;

    fn motion(start: Vec3, velocity: Vec3, dt: f32) -> Motion {
        Motion {
            start: Pose::new(start, 0.0),
            velocity,
            angular_velocity: 0.0,
            dt,
            location: Location::OnGround,
            phased: false,
            ground_limit: 0.0,
        }
    }

    fn sweep<'a>(world: &'a ObstacleWorld, config: &'a MotionConfig) -> Sweep<'a, ObstacleWorld> {
        Sweep {
            world,
            dims: config.dims(),
            phased: false,
            ground_limit: 0.0,
            config,
            skip: None,
        }
    }

    /// A wall at x=50 facing the origin.
    fn walled() -> ObstacleWorld {
        let mut world = ObstacleWorld::new();
        world
            .add_wall(Vec3::new(50.0, 0.0, 0.0), -Vec3::X, 50.0, 10.0)
            .unwrap();
        world
    }

    #[test]
    fn test_free_motion_is_accepted() {
        let world = walled();
        let config = MotionConfig::default();
        let result = resolve_motion(&world, &motion(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.5), &config);
        assert!((result.pose.position.x - 2.5).abs() < 1e-6);
        assert_eq!(result.location, Location::OnGround);
        assert_eq!(result.steps, 1);
        assert!(result.last_obstacle.is_none());
    }

    #[test]
    fn test_ground_clamp() {
        let world = ObstacleWorld::new();
        let config = MotionConfig::default();
        let mut falling = motion(Vec3::new(0.0, 0.0, 0.3), Vec3::new(1.0, 0.0, -10.0), 0.1);
        falling.location = Location::InAir;

        let result = resolve_motion(&world, &falling, &config);
        assert_eq!(result.pose.position.z, 0.0);
        assert_eq!(result.location, Location::OnGround);
        assert_eq!(result.velocity.z, 0.0);
    }

    #[test]
    fn test_dead_end_wall_stops_at_epsilon() {
        let world = walled();
        let config = MotionConfig::default();
        // Front starts 0.5 from the wall; the step would go 2.5 past it
        let start = Vec3::new(46.5, 0.0, 0.0);
        let result = resolve_motion(&world, &motion(start, Vec3::new(5.0, 0.0, 0.0), 0.6), &config);

        let front = result.pose.position.x + config.tank_length * 0.5;
        assert!(front <= 50.0, "front={front}");
        assert!(front > 49.9, "stopped short: front={front}");
        assert!(result.velocity.dot(-Vec3::X) <= 1e-6);
        assert!(result.velocity.x.abs() < 1e-5, "v={:?}", result.velocity);
        assert!(world
            .blocking_obstacle(result.pose, result.pose, config.dims(), false)
            .is_none());
    }

    #[test]
    fn test_wall_slide_keeps_tangent() {
        let world = walled();
        let config = MotionConfig::default();
        let start = Vec3::new(46.5, 0.0, 0.0);
        let result = resolve_motion(&world, &motion(start, Vec3::new(5.0, 5.0, 0.0), 0.6), &config);

        assert!(result.velocity.x.abs() < 1e-5);
        assert!((result.velocity.y - 5.0).abs() < 1e-5);
        assert!(result.pose.position.y > 2.0, "slid along the wall");
    }

    #[test]
    fn test_bisection_within_budget() {
        let mut world = ObstacleWorld::new();
        // Box face at x = 3 + 4.321: the tank front reaches it at t = 0.4321
        world.add_box(Vec3::new(9.321, 0.0, 0.0), 0.0, Vec2::new(2.0, 20.0), 10.0);
        let config = MotionConfig::default();
        let sweep = sweep(&world, &config);

        let from = Pose::new(Vec3::ZERO, 0.0);
        let velocity = Vec3::new(10.0, 0.0, 0.0);
        let end = sweep.advance(from, velocity, 0.0, 1.0);
        let contact = sweep.blocked(from, end).unwrap();

        let impact = sweep.time_of_impact(from, velocity, 0.0, 1.0, contact);
        assert!(impact.free_time <= 0.4321 + 1e-4);
        assert!(0.4321 - impact.free_time < 1.0 / 128.0 + 1e-4, "t={}", impact.free_time);
    }

    #[test]
    fn test_bisection_converges_with_finer_budget() {
        let mut world = ObstacleWorld::new();
        world.add_box(Vec3::new(9.321, 0.0, 0.0), 0.0, Vec2::new(2.0, 20.0), 10.0);
        let config = MotionConfig {
            max_search_steps: 20,
            min_search_step: 1e-9,
            ..Default::default()
        };
        let sweep = sweep(&world, &config);

        let from = Pose::new(Vec3::ZERO, 0.0);
        let velocity = Vec3::new(10.0, 0.0, 0.0);
        let end = sweep.advance(from, velocity, 0.0, 1.0);
        let contact = sweep.blocked(from, end).unwrap();

        let impact = sweep.time_of_impact(from, velocity, 0.0, 1.0, contact);
        assert!((impact.free_time - 0.4321).abs() < 1e-4, "t={}", impact.free_time);
        assert_eq!(impact.contact.obstacle, ObstacleId(0));
    }

    #[test]
    fn test_step_up_onto_low_ledge() {
        let mut world = ObstacleWorld::new();
        // Ledge from x=5 to x=25, height 0.3
        let ledge = world.add_box(Vec3::new(15.0, 0.0, 0.0), 0.0, Vec2::new(10.0, 10.0), 0.3);
        let config = MotionConfig {
            max_bump_height: 0.5,
            ..Default::default()
        };

        let start = Vec3::new(1.5, 0.0, 0.0);
        let result = resolve_motion(&world, &motion(start, Vec3::new(5.0, 0.0, 0.0), 0.2), &config);

        assert_eq!(result.location, Location::OnBuilding);
        assert!((result.pose.position.z - 0.3).abs() < 1e-5);
        assert!((result.pose.position.x - 2.5).abs() < 1e-5, "horizontal motion kept");
        assert_eq!(result.velocity.x, 5.0);
        assert_eq!(result.bump, Some(Bump { obstacle: ledge, height: 0.3 }));
    }

    #[test]
    fn test_no_bump_when_too_high_or_airborne() {
        let mut world = ObstacleWorld::new();
        world.add_box(Vec3::new(15.0, 0.0, 0.0), 0.0, Vec2::new(10.0, 10.0), 0.6);
        let config = MotionConfig {
            max_bump_height: 0.5,
            ..Default::default()
        };

        let start = Vec3::new(1.5, 0.0, 0.0);
        let result = resolve_motion(&world, &motion(start, Vec3::new(5.0, 0.0, 0.0), 0.2), &config);
        assert!(result.bump.is_none());
        assert!(result.pose.position.x + 3.0 <= 5.0);
    }

    /// The probe distances are tuned, not derived; this pins the
    /// shortened retry when the full-length probe hits an overhang.
    #[test]
    fn test_bump_retries_with_shorter_step() {
        let mut world = ObstacleWorld::new();
        // Ledge from x=10 to x=12, overhang from x=10.2 starting at z=2.2
        let ledge = world.add_box(Vec3::new(11.0, 0.0, 0.0), 0.0, Vec2::new(1.0, 10.0), 0.3);
        world.add_box(Vec3::new(15.2, 0.0, 2.2), 0.0, Vec2::new(5.0, 10.0), 3.0);
        let config = MotionConfig {
            max_bump_height: 0.5,
            ..Default::default()
        };

        let start = Vec3::new(6.5, 0.0, 0.0);
        let result = resolve_motion(&world, &motion(start, Vec3::new(10.0, 0.0, 0.0), 0.1), &config);

        assert_eq!(result.bump, Some(Bump { obstacle: ledge, height: 0.3 }));
        let travelled = result.pose.position.x - start.x;
        let expected = 1.0 * config.bump_retry_scale;
        assert!((travelled - expected).abs() < 1e-5, "travelled={travelled}");
        assert!((result.pose.position.z - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_landing_on_top() {
        let mut world = ObstacleWorld::new();
        let block = world.add_box(Vec3::ZERO, 0.0, Vec2::new(10.0, 10.0), 3.0);
        let config = MotionConfig::default();

        let mut falling = motion(Vec3::new(0.0, 0.0, 3.5), Vec3::new(2.0, 0.0, -10.0), 0.1);
        falling.location = Location::InAir;
        let result = resolve_motion(&world, &falling, &config);

        assert_eq!(result.location, Location::OnBuilding);
        assert_eq!(result.velocity.z, 0.0);
        assert_eq!(result.last_obstacle, Some(block));
        assert!(result.pose.position.z > 2.999 && result.pose.position.z < 3.05);
        assert!(result.pose.position.x > 0.15, "kept moving after landing");
    }

    #[test]
    fn test_phased_passes_solids_but_not_walls() {
        let mut world = walled();
        world.add_box(Vec3::new(20.0, 0.0, 0.0), 0.0, Vec2::new(2.0, 2.0), 3.0);
        let config = MotionConfig::default();

        let mut ghost = motion(Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0), 0.5);
        ghost.phased = true;
        let result = resolve_motion(&world, &ghost, &config);
        assert!((result.pose.position.x - 20.0).abs() < 1e-5);
        assert_eq!(result.location, Location::InBuilding);

        let mut ghost = motion(Vec3::new(40.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0), 0.5);
        ghost.phased = true;
        let result = resolve_motion(&world, &ghost, &config);
        assert!(result.pose.position.x + 3.0 <= 50.0, "walls still expel");
    }

    #[test]
    fn test_stuck_start_drives_out() {
        let mut world = ObstacleWorld::new();
        let block = world.add_box(Vec3::ZERO, 0.0, Vec2::new(2.0, 2.0), 3.0);
        let config = MotionConfig::default();

        let result = resolve_motion(&world, &motion(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.1), &config);
        assert_eq!(result.stuck, Some(block));
        assert_eq!(result.location, Location::InBuilding);
        assert!((result.pose.position.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stuck_start_still_stops_at_other_walls() {
        let mut world = ObstacleWorld::new();
        // Box from x=-2..2, wall front at x=5 facing back at it
        let block = world.add_box(Vec3::ZERO, 0.0, Vec2::new(2.0, 10.0), 4.0);
        let wall = world
            .add_wall(Vec3::new(5.0, 0.0, 0.0), -Vec3::X, 20.0, 10.0)
            .unwrap();
        let config = MotionConfig::default();
        let dims = config.dims();

        let mut pose = Pose::new(Vec3::new(1.0, 0.0, 0.0), 0.0);
        let mut location = Location::OnGround;
        let mut hit_wall = false;
        for _ in 0..30 {
            let mut step = motion(pose.position, Vec3::new(25.0, 0.0, 0.0), 1.0 / 30.0);
            step.location = location;
            let result = resolve_motion(&world, &step, &config);
            hit_wall |= result.last_obstacle == Some(wall);
            pose = result.pose;
            location = result.location;

            let front = pose.position.x + config.tank_length * 0.5;
            assert!(front <= 5.0 + 1e-3, "drove through the wall: front={front}");
            assert!(world
                .blocking_obstacle_except(pose, pose, dims, false, block)
                .is_none());
        }

        assert!(hit_wall);
        assert!(pose.position.x > 1.9, "still drove out toward the wall");
    }

    #[test]
    fn test_jam_stops_turning() {
        let world = walled();
        let config = MotionConfig::default();
        // Nose touching the wall, turning into it without driving
        let mut turning = motion(Vec3::new(46.99, 0.0, 0.0), Vec3::ZERO, 0.1);
        turning.start.azimuth = 0.0;
        turning.angular_velocity = 1.0;

        let result = resolve_motion(&world, &turning, &config);
        assert_eq!(result.angular_velocity, 0.0);
        assert!(world
            .blocking_obstacle(result.pose, result.pose, config.dims(), false)
            .is_none());
    }
}
