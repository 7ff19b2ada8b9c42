//! Kinematic obstacle controllers
//!
//! Every obstacle is a pure function of elapsed time and the constants its
//! placement was generated with. Controllers never hold mutable state: the
//! same `t` always produces the same poses.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::track::{ObstacleParams, ObstaclePlacement};

/// Limbo bar rest height above the slot floor
pub const LIMBO_BASE_HEIGHT: f32 = 1.15;
/// Axe swing amplitude along X
pub const AXE_AMPLITUDE: f32 = 1.25;
pub const AXE_HEIGHT: f32 = 0.75;
pub const SPINNER_HEIGHT: f32 = 0.3;

/// Laser gate beam lanes along X
pub const GATE_LANES: [f32; 7] = [-1.8, -1.2, -0.6, 0.0, 0.6, 1.2, 1.8];
/// Seconds each gate lane stays open
pub const GATE_CYCLE_SECS: f32 = 2.5;
/// Seconds per laser wall on/off half-cycle
pub const WALL_CYCLE_SECS: f32 = 3.0;
/// Height of an active beam or wall
pub const LASER_HEIGHT: f32 = 1.0;
/// Height a retracted beam or wall is parked at, far out of collision range
pub const RETRACTED_HEIGHT: f32 = -100.0;

/// Emissive levels for the derived intensity signal
pub const OBSTACLE_GLOW: f32 = 1.2;
pub const GATE_GLOW_CLOSED: f32 = 2.0;
pub const GATE_GLOW_OPEN: f32 = 0.5;
pub const WALL_GLOW_ACTIVE: f32 = 3.0;
pub const WALL_GLOW_INACTIVE: f32 = 0.5;

/// Full dimensions of each kinematic body
const BAR_SIZE: Vec3 = Vec3::new(3.5, 0.3, 0.3);
const AXE_SIZE: Vec3 = Vec3::new(1.5, 1.5, 0.3);
const BEAM_SIZE: Vec3 = Vec3::new(0.15, 2.0, 0.15);
const WALL_SIZE: Vec3 = Vec3::new(3.5, 2.5, 0.3);

/// Authoritative pose for one kinematic body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicPose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl KinematicPose {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Collider shape of one kinematic body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicShape {
    pub half_extents: Vec3,
    /// Pose the body is created with
    pub initial: KinematicPose,
}

/// Sampled state of an obstacle at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleFrame {
    /// One pose per body, in `shapes()` order
    pub poses: Vec<KinematicPose>,
    /// Emissive intensity per body
    pub intensities: Vec<f32>,
    /// Whether the obstacle fully blocks the corridor right now
    pub blocking: bool,
}

/// Time-driven controller for one placed obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleController {
    Spinner { origin: Vec3, speed: f32 },
    Limbo { origin: Vec3, phase_offset: f32 },
    Axe { origin: Vec3, phase_offset: f32 },
    LaserGate { origin: Vec3 },
    LaserWall { origin: Vec3 },
}

impl ObstacleController {
    pub fn from_placement(placement: &ObstaclePlacement) -> Self {
        let origin = placement.base_position;
        match placement.params {
            ObstacleParams::Spinner { speed } => ObstacleController::Spinner { origin, speed },
            ObstacleParams::Limbo { phase_offset } => {
                ObstacleController::Limbo { origin, phase_offset }
            }
            ObstacleParams::Axe { phase_offset } => ObstacleController::Axe { origin, phase_offset },
            ObstacleParams::LaserGate => ObstacleController::LaserGate { origin },
            ObstacleParams::LaserWall => ObstacleController::LaserWall { origin },
        }
    }

    /// Bodies this obstacle needs in the physics world
    pub fn shapes(&self) -> Vec<KinematicShape> {
        match *self {
            ObstacleController::Spinner { origin, .. }
            | ObstacleController::Limbo { origin, .. } => vec![KinematicShape {
                half_extents: BAR_SIZE / 2.0,
                initial: KinematicPose::at(origin + Vec3::Y * SPINNER_HEIGHT),
            }],
            ObstacleController::Axe { origin, .. } => vec![KinematicShape {
                half_extents: AXE_SIZE / 2.0,
                initial: KinematicPose::at(origin + Vec3::Y * SPINNER_HEIGHT),
            }],
            ObstacleController::LaserGate { origin } => GATE_LANES
                .iter()
                .map(|&x| KinematicShape {
                    half_extents: BEAM_SIZE / 2.0,
                    initial: KinematicPose::at(origin + Vec3::new(x, LASER_HEIGHT, 0.0)),
                })
                .collect(),
            ObstacleController::LaserWall { origin } => vec![KinematicShape {
                half_extents: WALL_SIZE / 2.0,
                initial: KinematicPose::at(origin + Vec3::Y * LASER_HEIGHT),
            }],
        }
    }

    /// Sample poses and glow at elapsed time `t` (seconds)
    pub fn sample(&self, t: f32) -> ObstacleFrame {
        match *self {
            ObstacleController::Spinner { origin, speed } => ObstacleFrame {
                poses: vec![KinematicPose {
                    translation: origin + Vec3::Y * SPINNER_HEIGHT,
                    rotation: Quat::from_rotation_y(spinner_angle(t, speed)),
                }],
                intensities: vec![OBSTACLE_GLOW],
                blocking: false,
            },
            ObstacleController::Limbo { origin, phase_offset } => ObstacleFrame {
                poses: vec![KinematicPose::at(Vec3::new(
                    origin.x,
                    origin.y + limbo_height(t, phase_offset),
                    origin.z,
                ))],
                intensities: vec![OBSTACLE_GLOW],
                blocking: false,
            },
            ObstacleController::Axe { origin, phase_offset } => ObstacleFrame {
                poses: vec![KinematicPose::at(Vec3::new(
                    origin.x + axe_offset(t, phase_offset),
                    origin.y + AXE_HEIGHT,
                    origin.z,
                ))],
                intensities: vec![OBSTACLE_GLOW],
                blocking: false,
            },
            ObstacleController::LaserGate { origin } => {
                let open = gate_open_lane(t);
                let (poses, intensities) = GATE_LANES
                    .iter()
                    .enumerate()
                    .map(|(lane, &x)| {
                        let closed = lane != open;
                        let y = if closed { LASER_HEIGHT } else { RETRACTED_HEIGHT };
                        let glow = if closed { GATE_GLOW_CLOSED } else { GATE_GLOW_OPEN };
                        (KinematicPose::at(origin + Vec3::new(x, y, 0.0)), glow)
                    })
                    .unzip();
                ObstacleFrame {
                    poses,
                    intensities,
                    blocking: false,
                }
            }
            ObstacleController::LaserWall { origin } => {
                let active = wall_active(t);
                let (y, glow) = if active {
                    (LASER_HEIGHT, WALL_GLOW_ACTIVE)
                } else {
                    (RETRACTED_HEIGHT, WALL_GLOW_INACTIVE)
                };
                ObstacleFrame {
                    poses: vec![KinematicPose::at(origin + Vec3::Y * y)],
                    intensities: vec![glow],
                    blocking: active,
                }
            }
        }
    }
}

/// Spinner yaw at time `t`, wrapped into [0, 2π)
#[inline]
pub fn spinner_angle(t: f32, speed: f32) -> f32 {
    crate::wrap_angle(t * speed)
}

/// Limbo bar height above its slot
#[inline]
pub fn limbo_height(t: f32, phase_offset: f32) -> f32 {
    (t + phase_offset).sin() + LIMBO_BASE_HEIGHT
}

/// Axe X offset from the corridor center
#[inline]
pub fn axe_offset(t: f32, phase_offset: f32) -> f32 {
    (t + phase_offset).sin() * AXE_AMPLITUDE
}

/// The single open gate lane at time `t`
#[inline]
pub fn gate_open_lane(t: f32) -> usize {
    cycle_index(t, GATE_CYCLE_SECS, GATE_LANES.len())
}

/// Whether the laser wall blocks at time `t`
#[inline]
pub fn wall_active(t: f32) -> bool {
    cycle_index(t, WALL_CYCLE_SECS, 2) == 0
}

/// `floor(t / period) mod n`, clamped to 0 before the clock starts
fn cycle_index(t: f32, period: f32, n: usize) -> usize {
    let cycles = (t / period).floor();
    if cycles <= 0.0 {
        return 0;
    }
    (cycles as u64 % n as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::slot_position;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, TAU};

    fn placement(params: ObstacleParams) -> ObstaclePlacement {
        ObstaclePlacement::new(2, params)
    }

    #[test]
    fn test_gate_cycle() {
        assert_eq!(gate_open_lane(0.0), 0);
        assert_eq!(gate_open_lane(2.49), 0);
        assert_eq!(gate_open_lane(2.5), 1);
        assert_eq!(gate_open_lane(16.0), 6);
        assert_eq!(gate_open_lane(17.5), 0);
    }

    #[test]
    fn test_wall_cycle() {
        assert!(wall_active(0.0));
        assert!(wall_active(2.99));
        assert!(!wall_active(3.0));
        assert!(!wall_active(5.9));
        assert!(wall_active(6.0));
    }

    #[test]
    fn test_gate_frame_retracts_open_lane() {
        let gate = ObstacleController::from_placement(&placement(ObstacleParams::LaserGate));
        let frame = gate.sample(7.6); // lane 3 open
        let origin = slot_position(2);

        assert_eq!(frame.poses.len(), 7);
        for (lane, pose) in frame.poses.iter().enumerate() {
            assert_eq!(pose.translation.x, GATE_LANES[lane]);
            assert_eq!(pose.translation.z, origin.z);
            if lane == 3 {
                assert_eq!(pose.translation.y, RETRACTED_HEIGHT);
                assert_eq!(frame.intensities[lane], GATE_GLOW_OPEN);
            } else {
                assert_eq!(pose.translation.y, LASER_HEIGHT);
                assert_eq!(frame.intensities[lane], GATE_GLOW_CLOSED);
            }
        }
        assert!(!frame.blocking);
    }

    #[test]
    fn test_wall_frame() {
        let wall = ObstacleController::from_placement(&placement(ObstacleParams::LaserWall));
        let on = wall.sample(1.0);
        assert!(on.blocking);
        assert_eq!(on.poses[0].translation.y, LASER_HEIGHT);
        assert_eq!(on.intensities[0], WALL_GLOW_ACTIVE);

        let off = wall.sample(4.0);
        assert!(!off.blocking);
        assert_eq!(off.poses[0].translation.y, RETRACTED_HEIGHT);
    }

    #[test]
    fn test_limbo_and_axe_motion() {
        let limbo = ObstacleController::from_placement(&placement(ObstacleParams::Limbo {
            phase_offset: FRAC_PI_2,
        }));
        let y = limbo.sample(0.0).poses[0].translation.y;
        assert!((y - (1.0 + LIMBO_BASE_HEIGHT)).abs() < 1e-5);

        let axe = ObstacleController::from_placement(&placement(ObstacleParams::Axe {
            phase_offset: 0.0,
        }));
        let pose = axe.sample(FRAC_PI_2).poses[0];
        assert!((pose.translation.x - AXE_AMPLITUDE).abs() < 1e-5);
        assert_eq!(pose.translation.y, AXE_HEIGHT);
    }

    #[test]
    fn test_shapes_match_frames() {
        for params in [
            ObstacleParams::Spinner { speed: 0.5 },
            ObstacleParams::Limbo { phase_offset: 1.0 },
            ObstacleParams::Axe { phase_offset: 1.0 },
            ObstacleParams::LaserGate,
            ObstacleParams::LaserWall,
        ] {
            let controller = ObstacleController::from_placement(&placement(params));
            let frame = controller.sample(3.3);
            assert_eq!(controller.shapes().len(), frame.poses.len());
            assert_eq!(frame.poses.len(), frame.intensities.len());
        }
    }

    proptest! {
        #[test]
        fn prop_spinner_angle(t in 0.0f32..500.0, magnitude in 0.2f32..1.2, flip in any::<bool>()) {
            let speed = if flip { -magnitude } else { magnitude };
            let angle = spinner_angle(t, speed);
            prop_assert!((0.0..TAU).contains(&angle));

            let expected = (t * speed).rem_euclid(TAU);
            let diff = (angle - expected).abs();
            prop_assert!(diff < 1e-3 || (TAU - diff) < 1e-3);
        }

        #[test]
        fn prop_exactly_one_lane_open(t in 0.0f32..1000.0) {
            let gate = ObstacleController::LaserGate { origin: Vec3::ZERO };
            let frame = gate.sample(t);
            let open: Vec<usize> = frame
                .poses
                .iter()
                .enumerate()
                .filter(|(_, p)| p.translation.y == RETRACTED_HEIGHT)
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(open, vec![((t / 2.5).floor() as usize) % 7]);
        }

        #[test]
        fn prop_wall_matches_formula(t in 0.0f32..1000.0) {
            prop_assert_eq!(wall_active(t), ((t / 3.0).floor() as u64) % 2 == 0);
        }

        #[test]
        fn prop_limbo_stays_in_band(t in 0.0f32..1000.0, phase in 0.0f32..TAU) {
            let y = limbo_height(t, phase);
            prop_assert!((LIMBO_BASE_HEIGHT - 1.0..=LIMBO_BASE_HEIGHT + 1.0).contains(&y));
        }
    }
}
