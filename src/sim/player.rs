//! Player ball locomotion
//!
//! The ball is a dynamic body owned by the physics world. The controller
//! only issues impulses, torque impulses and teleports, and reads back the
//! translation.

use glam::Vec3;

use super::input::ControlVector;
use super::physics::{BallDesc, BodyHandle, PhysicsWorld};
use crate::consts::*;

/// Impulse and torque impulse for one tick of held controls
pub fn movement_impulses(controls: &ControlVector, multiplier: f32, dt: f32) -> (Vec3, Vec3) {
    let impulse_strength = IMPULSE_STRENGTH * dt * multiplier;
    let torque_strength = TORQUE_STRENGTH * dt * multiplier;

    let mut impulse = Vec3::ZERO;
    let mut torque = Vec3::ZERO;

    // Rolling toward -Z spins about -X; rolling toward +X spins about -Z
    impulse.z -= impulse_strength * controls.forward;
    torque.x -= torque_strength * controls.forward;

    impulse.x += impulse_strength * controls.rightward;
    torque.z -= torque_strength * controls.rightward;

    impulse.z += impulse_strength * controls.backward;
    torque.x += torque_strength * controls.backward;

    impulse.x -= impulse_strength * controls.leftward;
    torque.z += torque_strength * controls.leftward;

    (impulse, torque)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerController {
    body: BodyHandle,
}

impl PlayerController {
    /// Create the ball at the spawn point
    pub fn spawn<W: PhysicsWorld + ?Sized>(world: &mut W) -> Self {
        let body = world.create_ball(BallDesc::default());
        log::debug!("Spawned player body {:?}", body);
        Self { body }
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn position<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Vec3 {
        world.translation(self.body)
    }

    /// Push the ball with this tick's controls
    pub fn apply_controls<W: PhysicsWorld + ?Sized>(
        &self,
        world: &mut W,
        controls: &ControlVector,
        multiplier: f32,
        dt: f32,
    ) {
        let (impulse, torque) = movement_impulses(controls, multiplier, dt);
        world.apply_impulse(self.body, impulse);
        world.apply_torque_impulse(self.body, torque);
    }

    /// Distance from just under the ball to the nearest surface below
    pub fn ground_distance<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Option<f32> {
        let origin = world.translation(self.body) - Vec3::Y * GROUND_RAY_OFFSET;
        world
            .cast_ray(origin, Vec3::NEG_Y, GROUND_RAY_MAX_TOI, true, Some(self.body))
            .map(|hit| hit.toi)
    }

    pub fn is_grounded<W: PhysicsWorld + ?Sized>(&self, world: &W) -> bool {
        self.ground_distance(world)
            .is_some_and(|toi| toi < GROUNDED_TOI)
    }

    /// Jump if standing on something. Returns true if the impulse was applied.
    pub fn try_jump<W: PhysicsWorld + ?Sized>(&self, world: &mut W) -> bool {
        if !self.is_grounded(world) {
            log::trace!("Jump ignored, not grounded");
            return false;
        }
        world.apply_impulse(self.body, Vec3::Y * JUMP_IMPULSE);
        log::debug!("Jump");
        true
    }

    /// Back to the spawn point, at rest
    pub fn reset<W: PhysicsWorld + ?Sized>(&self, world: &mut W) {
        world.set_translation(self.body, SPAWN_POSITION);
        world.set_linvel(self.body, Vec3::ZERO);
        world.set_angvel(self.body, Vec3::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{CuboidDesc, RayHit};
    use glam::Quat;

    /// Records commands and answers ray casts with a fixed result
    #[derive(Debug, Default)]
    struct RecordingWorld {
        pub position: Vec3,
        pub ray_toi: Option<f32>,
        pub impulses: Vec<Vec3>,
        pub torques: Vec<Vec3>,
        pub teleports: Vec<Vec3>,
    }

    impl PhysicsWorld for RecordingWorld {
        fn create_ball(&mut self, desc: BallDesc) -> BodyHandle {
            self.position = desc.position;
            BodyHandle(0)
        }
        fn create_cuboid(&mut self, _desc: CuboidDesc) -> BodyHandle {
            BodyHandle(1)
        }
        fn remove_body(&mut self, _body: BodyHandle) {}
        fn apply_impulse(&mut self, _body: BodyHandle, impulse: Vec3) {
            self.impulses.push(impulse);
        }
        fn apply_torque_impulse(&mut self, _body: BodyHandle, torque: Vec3) {
            self.torques.push(torque);
        }
        fn set_translation(&mut self, _body: BodyHandle, translation: Vec3) {
            self.position = translation;
            self.teleports.push(translation);
        }
        fn set_linvel(&mut self, _body: BodyHandle, _velocity: Vec3) {}
        fn set_angvel(&mut self, _body: BodyHandle, _velocity: Vec3) {}
        fn set_next_kinematic_translation(&mut self, _body: BodyHandle, _translation: Vec3) {}
        fn set_next_kinematic_rotation(&mut self, _body: BodyHandle, _rotation: Quat) {}
        fn cast_ray(
            &self,
            _origin: Vec3,
            _dir: Vec3,
            _max_toi: f32,
            _solid: bool,
            _exclude: Option<BodyHandle>,
        ) -> Option<RayHit> {
            self.ray_toi.map(|toi| RayHit {
                body: BodyHandle(1),
                toi,
            })
        }
        fn translation(&self, _body: BodyHandle) -> Vec3 {
            self.position
        }
        fn linvel(&self, _body: BodyHandle) -> Vec3 {
            Vec3::ZERO
        }
        fn angvel(&self, _body: BodyHandle) -> Vec3 {
            Vec3::ZERO
        }
        fn step(&mut self, _dt: f32) {}
    }

    #[test]
    fn test_forward_impulse_and_torque() {
        let controls = ControlVector {
            forward: 1.0,
            ..Default::default()
        };
        let (impulse, torque) = movement_impulses(&controls, 1.0, 0.5);
        assert!((impulse - Vec3::new(0.0, 0.0, -0.3)).length() < 1e-6);
        assert!((torque - Vec3::new(-0.1, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_directions() {
        let dir = |c: ControlVector| movement_impulses(&c, 1.0, 1.0);

        let (i, t) = dir(ControlVector { rightward: 1.0, ..Default::default() });
        assert!(i.x > 0.0 && t.z < 0.0);
        let (i, t) = dir(ControlVector { backward: 1.0, ..Default::default() });
        assert!(i.z > 0.0 && t.x > 0.0);
        let (i, t) = dir(ControlVector { leftward: 1.0, ..Default::default() });
        assert!(i.x < 0.0 && t.z > 0.0);

        // Opposing inputs cancel
        let (i, t) = dir(ControlVector {
            forward: 1.0,
            backward: 1.0,
            ..Default::default()
        });
        assert!(i.length() < 1e-6 && t.length() < 1e-6);
    }

    #[test]
    fn test_analog_and_multiplier_scale() {
        let half = ControlVector {
            forward: 0.5,
            ..Default::default()
        };
        let (base, _) = movement_impulses(&half, 1.0, 1.0);
        let (boosted, _) = movement_impulses(&half, 2.0, 1.0);
        assert!((base.z + 0.3).abs() < 1e-6);
        assert!((boosted.z - 2.0 * base.z).abs() < 1e-6);
    }

    #[test]
    fn test_jump_requires_ground() {
        let mut world = RecordingWorld::default();
        let player = PlayerController::spawn(&mut world);

        world.ray_toi = Some(0.149);
        assert!(player.try_jump(&mut world));
        assert_eq!(world.impulses, vec![Vec3::new(0.0, 0.5, 0.0)]);

        world.ray_toi = Some(0.15);
        assert!(!player.try_jump(&mut world));
        world.ray_toi = None;
        assert!(!player.try_jump(&mut world));
        assert_eq!(world.impulses.len(), 1);
        assert!(world.torques.is_empty());
    }

    #[test]
    fn test_reset_teleports_to_spawn() {
        let mut world = RecordingWorld::default();
        let player = PlayerController::spawn(&mut world);
        world.position = Vec3::new(1.0, -5.0, -20.0);
        player.reset(&mut world);
        assert_eq!(player.position(&world), SPAWN_POSITION);
        assert_eq!(world.teleports, vec![SPAWN_POSITION]);
    }
}
