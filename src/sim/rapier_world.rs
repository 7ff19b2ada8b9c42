//! Rapier-backed physics world
//!
//! Wraps a `rapier3d` pipeline behind `PhysicsWorld`. The simulation keeps
//! speaking glam; conversion to nalgebra happens at this boundary only.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use super::physics::{BallDesc, BodyHandle, CuboidDesc, CuboidKind, PhysicsWorld, RayHit};

/// Gravity (m/s²)
pub const GRAVITY: f32 = -9.81;

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(q: &UnitQuaternion<Real>) -> Quat {
    let c = &q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

fn isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(Translation3::from(to_vector(translation)), to_rotation(rotation))
}

/// `PhysicsWorld` on top of a Rapier pipeline
pub struct RapierWorld {
    gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    /// Our handles to Rapier's, and back (ray hits report colliders)
    handles: HashMap<BodyHandle, RigidBodyHandle>,
    owners: HashMap<RigidBodyHandle, BodyHandle>,
    next_id: u32,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, GRAVITY, 0.0],
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            handles: HashMap::new(),
            owners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Number of bodies currently alive
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Current pose of any body
    pub fn pose(&self, body: BodyHandle) -> Option<(Vec3, Quat)> {
        self.body(body)
            .map(|rb| (from_vector(rb.translation()), from_rotation(rb.rotation())))
    }

    fn insert(&mut self, rb: RigidBody, collider: Collider) -> BodyHandle {
        let rb_handle = self.bodies.insert(rb);
        self.colliders
            .insert_with_parent(collider, rb_handle, &mut self.bodies);

        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        self.handles.insert(handle, rb_handle);
        self.owners.insert(rb_handle, handle);
        handle
    }

    fn body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.handles.get(&body).and_then(|h| self.bodies.get(*h))
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let rb = self.handles.get(&body).and_then(|h| self.bodies.get_mut(*h));
        if rb.is_none() {
            log::warn!("No body {:?}", body);
        }
        rb
    }

    fn kinematic_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        match self.body_mut(body) {
            Some(rb) if rb.is_kinematic() => Some(rb),
            _ => {
                log::warn!("Kinematic target sent to non-kinematic body {:?}", body);
                None
            }
        }
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_ball(&mut self, desc: BallDesc) -> BodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(to_vector(desc.position))
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .can_sleep(false)
            .build();
        let collider = ColliderBuilder::ball(desc.radius)
            .restitution(desc.material.restitution)
            .friction(desc.material.friction)
            .build();
        self.insert(rb, collider)
    }

    fn create_cuboid(&mut self, desc: CuboidDesc) -> BodyHandle {
        let builder = match desc.kind {
            CuboidKind::Fixed => RigidBodyBuilder::fixed(),
            CuboidKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
        };
        let rb = builder.pose(isometry(desc.translation, desc.rotation)).build();
        let h = desc.half_extents;
        let collider = ColliderBuilder::cuboid(h.x, h.y, h.z)
            .restitution(desc.material.restitution)
            .friction(desc.material.friction)
            .build();
        self.insert(rb, collider)
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(rb_handle) = self.handles.remove(&body) else {
            return;
        };
        self.owners.remove(&rb_handle);
        self.bodies.remove(
            rb_handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
        if let Some(rb) = self.body_mut(body) {
            rb.apply_impulse(to_vector(impulse), true);
        }
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(rb) = self.body_mut(body) {
            rb.apply_torque_impulse(to_vector(torque), true);
        }
    }

    fn set_translation(&mut self, body: BodyHandle, translation: Vec3) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_translation(to_vector(translation), true);
        }
    }

    fn set_linvel(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_linvel(to_vector(velocity), true);
        }
    }

    fn set_angvel(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_angvel(to_vector(velocity), true);
        }
    }

    fn set_next_kinematic_translation(&mut self, body: BodyHandle, translation: Vec3) {
        if let Some(rb) = self.kinematic_mut(body) {
            rb.set_next_kinematic_translation(to_vector(translation));
            rb.wake_up(true);
        }
    }

    fn set_next_kinematic_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        if let Some(rb) = self.kinematic_mut(body) {
            rb.set_next_kinematic_rotation(to_rotation(rotation));
            rb.wake_up(true);
        }
    }

    fn cast_ray(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_toi: f32,
        solid: bool,
        exclude: Option<BodyHandle>,
    ) -> Option<RayHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let filter = match exclude.and_then(|b| self.handles.get(&b)) {
            Some(rb_handle) => QueryFilter::default().exclude_rigid_body(*rb_handle),
            None => QueryFilter::default(),
        };
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );

        let ray = Ray::new(point![origin.x, origin.y, origin.z], to_vector(dir));
        let (collider, toi) = query.cast_ray(&ray, max_toi, solid)?;
        let parent = self.colliders.get(collider)?.parent()?;
        let body = *self.owners.get(&parent)?;
        Some(RayHit { body, toi })
    }

    fn translation(&self, body: BodyHandle) -> Vec3 {
        self.body(body)
            .map(|rb| from_vector(rb.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn linvel(&self, body: BodyHandle) -> Vec3 {
        self.body(body)
            .map(|rb| from_vector(rb.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    fn angvel(&self, body: BodyHandle) -> Vec3 {
        self.body(body)
            .map(|rb| from_vector(rb.angvel()))
            .unwrap_or(Vec3::ZERO)
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            &(),
            &(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::Material;

    fn floor(world: &mut RapierWorld) -> BodyHandle {
        world.create_cuboid(CuboidDesc {
            kind: CuboidKind::Fixed,
            half_extents: Vec3::new(2.0, 0.1, 20.0),
            translation: Vec3::new(0.0, -0.1, 0.0),
            rotation: Quat::IDENTITY,
            material: Material {
                restitution: 0.2,
                friction: 1.0,
            },
        })
    }

    fn settle(world: &mut RapierWorld, steps: usize) {
        for _ in 0..steps {
            world.step(1.0 / 120.0);
        }
    }

    #[test]
    fn test_quat_conversion() {
        let q = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3);
        let back = from_rotation(&to_rotation(q));
        assert!(back.angle_between(q) < 1e-5);
    }

    #[test]
    fn test_ball_comes_to_rest_on_floor() {
        let mut world = RapierWorld::new();
        floor(&mut world);
        let ball = world.create_ball(BallDesc::default());

        settle(&mut world, 240);

        let pos = world.translation(ball);
        assert!((pos.y - 0.3).abs() < 0.02, "ball at {pos:?}");
        assert!(world.linvel(ball).length() < 0.1);
    }

    #[test]
    fn test_ball_falls_without_floor() {
        let mut world = RapierWorld::new();
        let ball = world.create_ball(BallDesc::default());
        settle(&mut world, 120);
        assert!(world.translation(ball).y < -2.0);
    }

    #[test]
    fn test_torque_rolls_the_ball() {
        let mut world = RapierWorld::new();
        floor(&mut world);
        let ball = world.create_ball(BallDesc::default());
        settle(&mut world, 120);

        // Spin around -X: a rolling ball then moves toward -Z
        for _ in 0..60 {
            world.apply_torque_impulse(ball, Vec3::new(-0.2 / 120.0, 0.0, 0.0));
            world.step(1.0 / 120.0);
        }
        assert!(world.linvel(ball).z < 0.0);
    }

    #[test]
    fn test_ground_ray() {
        let mut world = RapierWorld::new();
        let ground = floor(&mut world);
        let ball = world.create_ball(BallDesc::default());
        settle(&mut world, 240);

        let origin = world.translation(ball) - Vec3::Y * 0.31;
        let hit = world
            .cast_ray(origin, Vec3::NEG_Y, 10.0, true, Some(ball))
            .unwrap();
        assert_eq!(hit.body, ground);
        assert!(hit.toi < 0.15);

        // From above, the ball itself is skipped
        let hit = world
            .cast_ray(Vec3::new(0.0, 3.0, 0.0), Vec3::NEG_Y, 10.0, true, Some(ball))
            .unwrap();
        assert_eq!(hit.body, ground);
        assert!((hit.toi - 3.0).abs() < 1e-3);

        let hit = world
            .cast_ray(Vec3::new(0.0, 3.0, 0.0), Vec3::NEG_Y, 10.0, true, None)
            .unwrap();
        assert_eq!(hit.body, ball);

        assert!(
            world
                .cast_ray(Vec3::new(5.0, 3.0, 0.0), Vec3::NEG_Y, 10.0, true, Some(ball))
                .is_none()
        );
    }

    #[test]
    fn test_kinematic_targets_apply_on_step() {
        let mut world = RapierWorld::new();
        let bar = world.create_cuboid(CuboidDesc {
            kind: CuboidKind::Kinematic,
            half_extents: Vec3::new(1.75, 0.15, 0.15),
            translation: Vec3::new(0.0, 0.3, -4.0),
            rotation: Quat::IDENTITY,
            material: Material {
                restitution: 0.2,
                friction: 0.0,
            },
        });

        world.set_next_kinematic_translation(bar, Vec3::new(0.0, 1.0, -4.0));
        world.set_next_kinematic_rotation(bar, Quat::from_rotation_y(0.5));
        assert!((world.pose(bar).unwrap().0.y - 0.3).abs() < 1e-6);

        world.step(1.0 / 120.0);
        let (pos, rot) = world.pose(bar).unwrap();
        assert!((pos.y - 1.0).abs() < 1e-5);
        assert!(rot.angle_between(Quat::from_rotation_y(0.5)) < 1e-4);
    }

    #[test]
    fn test_remove_body() {
        let mut world = RapierWorld::new();
        let ground = floor(&mut world);
        let ball = world.create_ball(BallDesc::default());
        assert_eq!(world.body_count(), 2);
        world.remove_body(ground);
        assert_eq!(world.body_count(), 1);
        world.remove_body(ball);
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.translation(ball), Vec3::ZERO);
    }
}
