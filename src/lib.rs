//! Outrun Race - A ball-rolling obstacle-course racer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track generation, obstacles, player, run phase)
//! - `settings`: Player-tunable configuration, persisted on web

pub mod settings;
pub mod sim;

pub use settings::{CameraProfile, Settings, SettingsError};

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Simulation ticks per second
    pub const TICK_RATE: f64 = 120.0;
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = (1.0 / TICK_RATE) as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Length of one corridor slot along -Z
    pub const SLOT_LENGTH: f32 = 4.0;
    /// Half width of the corridor (walls sit at +/- this X)
    pub const HALF_TRACK_WIDTH: f32 = 2.0;
    /// Default number of obstacle slots
    pub const DEFAULT_OBSTACLE_COUNT: u32 = 10;
    /// Upper bound on obstacle slots
    pub const MAX_OBSTACLE_COUNT: u32 = 200;

    /// Player ball
    pub const BALL_RADIUS: f32 = 0.3;
    pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    /// Below this height the ball has fallen off the track
    pub const FALL_THRESHOLD_Y: f32 = -4.0;

    /// Base impulse per second of held input
    pub const IMPULSE_STRENGTH: f32 = 0.6;
    /// Base torque impulse per second of held input
    pub const TORQUE_STRENGTH: f32 = 0.2;
    /// Upward impulse applied by a grounded jump
    pub const JUMP_IMPULSE: f32 = 0.5;

    /// Ground ray starts this far below the ball center
    pub const GROUND_RAY_OFFSET: f32 = 0.31;
    pub const GROUND_RAY_MAX_TOI: f32 = 10.0;
    /// Ray hits closer than this count as grounded
    pub const GROUNDED_TOI: f32 = 0.15;

    /// Throttle on the mobile jump pulse (ms)
    pub const MOBILE_JUMP_COOLDOWN_MS: f64 = 300.0;
    /// Debounce on the on-screen jump button (ms)
    pub const JUMP_BUTTON_DEBOUNCE_MS: f64 = 200.0;
    /// Analog input above this counts as "the player moved"
    pub const START_DEADZONE: f32 = 0.1;

    /// Camera follow stiffness
    pub const CAMERA_SMOOTHING: f32 = 5.0;
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    // rem_euclid can round up to TAU for tiny negative inputs
    if wrapped >= std::f32::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

/// Format an elapsed time in ms the way the HUD shows it ("12.34")
pub fn format_elapsed(ms: f64) -> String {
    format!("{:.2}", ms.max(0.0) / 1000.0)
}
