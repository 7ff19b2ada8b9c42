//! Physics engine boundary
//!
//! The simulation never integrates bodies itself. It talks to whatever
//! engine backs it through `PhysicsWorld`: impulses and teleports for the
//! player ball, next-step targets for kinematic obstacles, and a ray query
//! for the grounded check. `RapierWorld` (see `rapier_world.rs`) backs it
//! with `rapier3d`.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque handle to a body owned by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Material response shared by every collider in the level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
}

/// Creation parameters for the dynamic player ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallDesc {
    pub position: Vec3,
    pub radius: f32,
    pub material: Material,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for BallDesc {
    fn default() -> Self {
        Self {
            position: crate::consts::SPAWN_POSITION,
            radius: crate::consts::BALL_RADIUS,
            material: Material {
                restitution: 0.2,
                friction: 1.0,
            },
            linear_damping: 0.5,
            angular_damping: 0.5,
        }
    }
}

/// How a cuboid body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CuboidKind {
    /// Never moves
    Fixed,
    /// Moved by pose commands, pushes the ball but ignores forces
    Kinematic,
}

/// Creation parameters for a cuboid collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuboidDesc {
    pub kind: CuboidKind,
    pub half_extents: Vec3,
    pub translation: Vec3,
    pub rotation: Quat,
    pub material: Material,
}

/// Closest ray intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    /// Distance along the (unit) ray direction
    pub toi: f32,
}

/// Commands the simulation issues to the physics engine
pub trait PhysicsWorld {
    fn create_ball(&mut self, desc: BallDesc) -> BodyHandle;
    fn create_cuboid(&mut self, desc: CuboidDesc) -> BodyHandle;
    fn remove_body(&mut self, body: BodyHandle);

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3);
    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3);

    fn set_translation(&mut self, body: BodyHandle, translation: Vec3);
    fn set_linvel(&mut self, body: BodyHandle, velocity: Vec3);
    fn set_angvel(&mut self, body: BodyHandle, velocity: Vec3);

    /// Kinematic target reached at the end of the next step
    fn set_next_kinematic_translation(&mut self, body: BodyHandle, translation: Vec3);
    fn set_next_kinematic_rotation(&mut self, body: BodyHandle, rotation: Quat);

    /// Cast a ray, ignoring `exclude`. With `solid`, an origin inside a
    /// collider hits at `toi == 0`.
    fn cast_ray(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_toi: f32,
        solid: bool,
        exclude: Option<BodyHandle>,
    ) -> Option<RayHit>;

    fn translation(&self, body: BodyHandle) -> Vec3;
    fn linvel(&self, body: BodyHandle) -> Vec3;
    fn angvel(&self, body: BodyHandle) -> Vec3;

    /// Advance integration and resolve contacts
    fn step(&mut self, dt: f32);
}
