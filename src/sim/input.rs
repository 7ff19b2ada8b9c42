//! Input sources and per-tick merging
//!
//! Two producers feed the player: a keyboard map of boolean flags and an
//! analog source (device tilt on phones) that reports a 0..1 magnitude per
//! direction. The simulation never sees raw events, only these values.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Named keyboard flags, held state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardState {
    pub forward: bool,
    pub backward: bool,
    pub leftward: bool,
    pub rightward: bool,
    pub jump: bool,
}

impl KeyboardState {
    pub fn any_pressed(&self) -> bool {
        self.forward || self.backward || self.leftward || self.rightward || self.jump
    }

    /// Update the flag bound to `code`. Returns false for unbound keys.
    pub fn set_key(&mut self, code: &str, pressed: bool) -> bool {
        let Some(action) = KeyAction::from_code(code) else {
            return false;
        };
        match action {
            KeyAction::Forward => self.forward = pressed,
            KeyAction::Backward => self.backward = pressed,
            KeyAction::Leftward => self.leftward = pressed,
            KeyAction::Rightward => self.rightward = pressed,
            KeyAction::Jump => self.jump = pressed,
        }
        true
    }
}

/// Keyboard bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Forward,
    Backward,
    Leftward,
    Rightward,
    Jump,
}

impl KeyAction {
    /// Map a `KeyboardEvent.code` to an action
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ArrowUp" | "KeyW" => Some(KeyAction::Forward),
            "ArrowDown" | "KeyS" => Some(KeyAction::Backward),
            "ArrowLeft" | "KeyA" => Some(KeyAction::Leftward),
            "ArrowRight" | "KeyD" => Some(KeyAction::Rightward),
            "Space" => Some(KeyAction::Jump),
            _ => None,
        }
    }
}

/// Analog movement magnitudes, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalogControls {
    pub forward: f32,
    pub backward: f32,
    pub leftward: f32,
    pub rightward: f32,
}

impl AnalogControls {
    /// Clamp every axis into [0, 1]; NaN reads as released
    pub fn sanitized(self) -> Self {
        let clean = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            forward: clean(self.forward),
            backward: clean(self.backward),
            leftward: clean(self.leftward),
            rightward: clean(self.rightward),
        }
    }

    /// True when any axis is past the start deadzone
    pub fn exceeds(&self, deadzone: f32) -> bool {
        self.forward > deadzone
            || self.backward > deadzone
            || self.leftward > deadzone
            || self.rightward > deadzone
    }
}

/// Merged per-tick control values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlVector {
    pub forward: f32,
    pub backward: f32,
    pub leftward: f32,
    pub rightward: f32,
}

impl ControlVector {
    /// Per axis, whichever source is engaged harder wins
    pub fn merge(keys: &KeyboardState, analog: &AnalogControls) -> Self {
        let analog = analog.sanitized();
        let axis = |pressed: bool, value: f32| if pressed { 1.0 } else { value };
        Self {
            forward: axis(keys.forward, analog.forward),
            backward: axis(keys.backward, analog.backward),
            leftward: axis(keys.leftward, analog.leftward),
            rightward: axis(keys.rightward, analog.rightward),
        }
    }
}

/// Tilt → analog mapping for device orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltMapping {
    /// Degrees of tilt ignored around the calibrated rest pose
    pub threshold_deg: f32,
    /// Degrees of tilt that reach full speed
    pub max_tilt_deg: f32,
}

impl Default for TiltMapping {
    fn default() -> Self {
        Self {
            threshold_deg: 5.0,
            max_tilt_deg: 30.0,
        }
    }
}

/// Device orientation reader: the first reading becomes the rest pose
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gyroscope {
    pub mapping: TiltMapping,
    /// Rest `(beta, gamma)` in degrees
    calibration: Option<(f32, f32)>,
}

impl Gyroscope {
    pub fn new(mapping: TiltMapping) -> Self {
        Self {
            mapping,
            calibration: None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Forget the rest pose; the next reading recalibrates
    pub fn recalibrate(&mut self) {
        self.calibration = None;
    }

    /// Feed a reading (beta: front/back, gamma: left/right, degrees).
    /// The calibrating reading produces no output.
    pub fn read(&mut self, beta: f32, gamma: f32) -> Option<AnalogControls> {
        let Some((rest_beta, rest_gamma)) = self.calibration else {
            self.calibration = Some((beta, gamma));
            return None;
        };

        let beta = beta - rest_beta;
        let gamma = gamma - rest_gamma;
        let scale = |tilt: f32| (tilt.abs() / self.mapping.max_tilt_deg).min(1.0);
        let threshold = self.mapping.threshold_deg;

        let mut controls = AnalogControls::default();
        if beta < -threshold {
            controls.forward = scale(beta);
        } else if beta > threshold {
            controls.backward = scale(beta);
        }
        if gamma < -threshold {
            controls.leftward = scale(gamma);
        } else if gamma > threshold {
            controls.rightward = scale(gamma);
        }
        Some(controls)
    }
}

/// On-screen jump button debounce
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JumpButton {
    last_press_ms: Option<f64>,
}

impl JumpButton {
    /// Register a tap at `now_ms`; returns true when it should emit a pulse
    pub fn press(&mut self, now_ms: f64) -> bool {
        if let Some(last) = self.last_press_ms
            && now_ms - last < JUMP_BUTTON_DEBOUNCE_MS
        {
            return false;
        }
        self.last_press_ms = Some(now_ms);
        true
    }
}

/// Rising-edge detector for a held flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTrigger {
    was_down: bool,
}

impl EdgeTrigger {
    /// True only on the tick the flag goes from released to pressed
    pub fn rising(&mut self, down: bool) -> bool {
        let edge = down && !self.was_down;
        self.was_down = down;
        edge
    }
}

/// Throttle that lets a pulse through at most once per cooldown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    pub period_ms: f64,
    last_ms: Option<f64>,
}

impl Cooldown {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    /// Consume the cooldown if it has elapsed
    pub fn try_fire(&mut self, now_ms: f64) -> bool {
        if self.last_ms.is_some_and(|last| now_ms - last <= self.period_ms) {
            return false;
        }
        self.last_ms = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_bindings() {
        let mut keys = KeyboardState::default();
        assert!(keys.set_key("KeyW", true));
        assert!(keys.set_key("ArrowLeft", true));
        assert!(!keys.set_key("KeyQ", true));
        assert!(keys.forward && keys.leftward);
        assert!(!keys.jump);

        keys.set_key("Space", true);
        assert!(keys.jump);
        keys.set_key("KeyW", false);
        assert!(!keys.forward);
    }

    #[test]
    fn test_keyboard_wins_at_full_speed() {
        let keys = KeyboardState {
            forward: true,
            ..Default::default()
        };
        let analog = AnalogControls {
            forward: 0.4,
            leftward: 0.7,
            ..Default::default()
        };
        let merged = ControlVector::merge(&keys, &analog);
        assert_eq!(merged.forward, 1.0);
        assert_eq!(merged.leftward, 0.7);
        assert_eq!(merged.backward, 0.0);
    }

    #[test]
    fn test_gyroscope_calibrates_then_maps() {
        let mut gyro = Gyroscope::default();
        assert_eq!(gyro.read(10.0, -3.0), None);
        assert!(gyro.is_calibrated());

        // Inside the threshold
        let still = gyro.read(13.0, 0.0).unwrap();
        assert_eq!(still, AnalogControls::default());

        // 15° forward, 45° right (clamped)
        let tilted = gyro.read(-5.0, 42.0).unwrap();
        assert!((tilted.forward - 0.5).abs() < 1e-6);
        assert_eq!(tilted.rightward, 1.0);
        assert_eq!(tilted.backward, 0.0);
        assert_eq!(tilted.leftward, 0.0);

        gyro.recalibrate();
        assert!(!gyro.is_calibrated());
        assert_eq!(gyro.read(-5.0, 42.0), None);
    }

    #[test]
    fn test_jump_button_debounce() {
        let mut button = JumpButton::default();
        assert!(button.press(1000.0));
        assert!(!button.press(1150.0));
        assert!(button.press(1200.0));
    }

    #[test]
    fn test_edge_trigger() {
        let mut edge = EdgeTrigger::default();
        assert!(edge.rising(true));
        assert!(!edge.rising(true));
        assert!(!edge.rising(false));
        assert!(edge.rising(true));
    }

    #[test]
    fn test_cooldown() {
        let mut cooldown = Cooldown::new(300.0);
        assert!(cooldown.try_fire(0.0));
        assert!(!cooldown.try_fire(250.0));
        assert!(!cooldown.try_fire(300.0));
        assert!(cooldown.try_fire(301.0));
        cooldown.reset();
        assert!(cooldown.try_fire(302.0));
    }

    proptest! {
        #[test]
        fn prop_merge_is_max_and_bounded(
            keys in any::<[bool; 4]>(),
            analog in proptest::array::uniform4(-1.0f32..2.0),
        ) {
            let keyboard = KeyboardState {
                forward: keys[0],
                backward: keys[1],
                leftward: keys[2],
                rightward: keys[3],
                jump: false,
            };
            let source = AnalogControls {
                forward: analog[0],
                backward: analog[1],
                leftward: analog[2],
                rightward: analog[3],
            };
            let merged = ControlVector::merge(&keyboard, &source);
            let values = [merged.forward, merged.backward, merged.leftward, merged.rightward];
            for i in 0..4 {
                let flag = if keys[i] { 1.0 } else { 0.0 };
                prop_assert_eq!(values[i], f32::max(flag, analog[i].clamp(0.0, 1.0)));
                prop_assert!((0.0..=1.0).contains(&values[i]));
            }
        }
    }
}
