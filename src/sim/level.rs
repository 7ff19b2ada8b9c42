//! Level bodies in the physics world
//!
//! Turns a generated `Track` into fixed boundary colliders plus the
//! kinematic bodies of each obstacle, and pushes obstacle poses into the
//! world every tick.

use glam::Quat;

use super::obstacle::{ObstacleController, ObstacleFrame};
use super::physics::{BodyHandle, CuboidDesc, CuboidKind, PhysicsWorld};
use super::track::{SLICK_MATERIAL, Track, boundary_colliders};

/// One obstacle and the bodies it drives
#[derive(Debug, Clone)]
pub struct PlacedObstacle {
    pub controller: ObstacleController,
    pub bodies: Vec<BodyHandle>,
    /// Last sampled frame (for rendering)
    pub frame: Option<ObstacleFrame>,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub track: Track,
    pub obstacles: Vec<PlacedObstacle>,
    static_bodies: Vec<BodyHandle>,
}

impl Level {
    /// Create every collider for `track`
    pub fn build<W: PhysicsWorld + ?Sized>(world: &mut W, track: Track) -> Self {
        let static_bodies = boundary_colliders(track.obstacle_count())
            .into_iter()
            .map(|cuboid| {
                world.create_cuboid(CuboidDesc {
                    kind: CuboidKind::Fixed,
                    half_extents: cuboid.half_extents,
                    translation: cuboid.center,
                    rotation: Quat::IDENTITY,
                    material: cuboid.material,
                })
            })
            .collect();

        let obstacles = track
            .obstacles
            .iter()
            .map(|placement| {
                let controller = ObstacleController::from_placement(placement);
                let bodies = controller
                    .shapes()
                    .into_iter()
                    .map(|shape| {
                        world.create_cuboid(CuboidDesc {
                            kind: CuboidKind::Kinematic,
                            half_extents: shape.half_extents,
                            translation: shape.initial.translation,
                            rotation: shape.initial.rotation,
                            material: SLICK_MATERIAL,
                        })
                    })
                    .collect();
                PlacedObstacle {
                    controller,
                    bodies,
                    frame: None,
                }
            })
            .collect();

        Self {
            track,
            obstacles,
            static_bodies,
        }
    }

    /// Remove every body this level created
    pub fn destroy<W: PhysicsWorld + ?Sized>(self, world: &mut W) {
        let bodies = self
            .static_bodies
            .into_iter()
            .chain(self.obstacles.into_iter().flat_map(|o| o.bodies));
        for body in bodies {
            world.remove_body(body);
        }
    }

    /// Sample every obstacle at `t` and queue the poses as next-step targets
    pub fn drive<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, t: f32) {
        for obstacle in &mut self.obstacles {
            let frame = obstacle.controller.sample(t);
            for (body, pose) in obstacle.bodies.iter().zip(&frame.poses) {
                world.set_next_kinematic_translation(*body, pose.translation);
                world.set_next_kinematic_rotation(*body, pose.rotation);
            }
            obstacle.frame = Some(frame);
        }
    }

    pub fn body_count(&self) -> usize {
        self.static_bodies.len() + self.obstacles.iter().map(|o| o.bodies.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::obstacle::{GATE_LANES, RETRACTED_HEIGHT, gate_open_lane};
    use crate::sim::track::{Archetype, TrackSpec, generate_track};
    use crate::sim::rapier_world::RapierWorld;

    #[test]
    fn test_build_and_destroy() {
        let mut world = RapierWorld::new();
        let track = generate_track(&TrackSpec::new(3, 5).with_palette(vec![Archetype::LaserGate]));
        let level = Level::build(&mut world, track);

        // 5 floors + long floor + 10 walls + end cap, 7 beams per gate
        assert_eq!(level.body_count(), 17 + 3 * GATE_LANES.len());
        assert_eq!(world.body_count(), level.body_count());

        level.destroy(&mut world);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_drive_moves_kinematic_bodies() {
        use crate::sim::physics::PhysicsWorld;

        let mut world = RapierWorld::new();
        let track = generate_track(&TrackSpec::new(1, 5).with_palette(vec![Archetype::LaserGate]));
        let mut level = Level::build(&mut world, track);

        let t = 6.0;
        level.drive(&mut world, t);
        world.step(1.0 / 120.0);

        let open = gate_open_lane(t);
        let beam = level.obstacles[0].bodies[open];
        let (translation, _) = world.pose(beam).unwrap();
        assert!((translation.y - RETRACTED_HEIGHT).abs() < 1e-4);
        assert!(level.obstacles[0].frame.is_some());
    }
}
