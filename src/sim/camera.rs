//! Third-person follow camera
//!
//! The camera trails the ball from behind and above, easing toward its
//! goal with an exponential-ish lerp each tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::CAMERA_SMOOTHING;

/// Viewports at or below this width use the touch framing
pub const MOBILE_MAX_WIDTH: f32 = 768.0;

/// Which framing the camera uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewportKind {
    #[default]
    Desktop,
    /// Phones and tablets: pulled further back and higher
    Touch,
}

impl ViewportKind {
    pub fn detect(width: f32, has_touch: bool) -> Self {
        if width <= MOBILE_MAX_WIDTH || has_touch {
            ViewportKind::Touch
        } else {
            ViewportKind::Desktop
        }
    }

    /// Camera position relative to the ball
    pub fn offset(&self) -> Vec3 {
        match self {
            ViewportKind::Desktop => Vec3::new(0.0, 0.65, 2.25),
            ViewportKind::Touch => Vec3::new(0.0, 1.2, 3.5),
        }
    }
}

/// Look point above the ball center
pub const TARGET_LIFT: Vec3 = Vec3::new(0.0, 0.25, 0.0);
/// Where the camera starts before its first update
pub const INITIAL_POSITION: Vec3 = Vec3::new(10.0, 10.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowCamera {
    pub viewport: ViewportKind,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self::new(ViewportKind::Desktop)
    }
}

impl FollowCamera {
    pub fn new(viewport: ViewportKind) -> Self {
        Self {
            viewport,
            position: INITIAL_POSITION,
            target: Vec3::ZERO,
        }
    }

    /// Ease toward the ball at `body`
    pub fn update(&mut self, body: Vec3, dt: f32) {
        // Long frames would overshoot past the goal
        let t = (CAMERA_SMOOTHING * dt).clamp(0.0, 1.0);
        self.position = self.position.lerp(body + self.viewport.offset(), t);
        self.target = self.target.lerp(body + TARGET_LIFT, t);
    }
}
