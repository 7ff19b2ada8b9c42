//! Game settings and preferences
//!
//! Persisted in LocalStorage on web. Loading never fails outright: a bad
//! stored blob is logged and replaced by defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_OBSTACLE_COUNT, MAX_OBSTACLE_COUNT, START_DEADZONE};
use crate::sim::camera::ViewportKind;
use crate::sim::input::TiltMapping;
use crate::sim::state::GameConfig;
use crate::sim::track::Archetype;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Obstacle count {0} is out of range (max 200)")]
    ObstacleCount(u32),
    #[error("Tilt threshold {threshold}° must be below the max tilt {max_tilt}°")]
    Tilt { threshold: f32, max_tilt: f32 },
    #[error("Start deadzone {0} must be within [0, 1)")]
    Deadzone(f32),
    #[error("Empty obstacle palette")]
    EmptyPalette,
}

/// Camera framing preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CameraProfile {
    /// Pick from the viewport width and touch support
    #[default]
    Auto,
    Desktop,
    Touch,
}

impl CameraProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraProfile::Auto => "Auto",
            CameraProfile::Desktop => "Desktop",
            CameraProfile::Touch => "Touch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(CameraProfile::Auto),
            "desktop" => Some(CameraProfile::Desktop),
            "touch" | "mobile" => Some(CameraProfile::Touch),
            _ => None,
        }
    }

    pub fn resolve(&self, width: f32, has_touch: bool) -> ViewportKind {
        match self {
            CameraProfile::Auto => ViewportKind::detect(width, has_touch),
            CameraProfile::Desktop => ViewportKind::Desktop,
            CameraProfile::Touch => ViewportKind::Touch,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Level ===
    /// Obstacle slots between the start and end blocks
    pub obstacle_count: u32,
    /// Archetypes the generator may pick from
    pub palette: Vec<Archetype>,

    // === Controls ===
    pub camera: CameraProfile,
    /// Tilt (degrees) ignored around the calibrated pose
    pub tilt_threshold_deg: f32,
    /// Tilt (degrees) that maps to full speed
    pub max_tilt_deg: f32,
    /// Analog input needed to start the clock
    pub start_deadzone: f32,

    // === HUD ===
    pub show_fps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let tilt = TiltMapping::default();
        Self {
            obstacle_count: DEFAULT_OBSTACLE_COUNT,
            palette: Archetype::ALL.to_vec(),

            camera: CameraProfile::Auto,
            tilt_threshold_deg: tilt.threshold_deg,
            max_tilt_deg: tilt.max_tilt_deg,
            start_deadzone: START_DEADZONE,

            show_fps: false,
        }
    }
}

impl Settings {
    /// Parse and validate a stored JSON blob
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.obstacle_count > MAX_OBSTACLE_COUNT {
            return Err(SettingsError::ObstacleCount(self.obstacle_count));
        }
        if self.palette.is_empty() {
            return Err(SettingsError::EmptyPalette);
        }
        let tilt_ok = self.tilt_threshold_deg.is_finite()
            && self.max_tilt_deg.is_finite()
            && self.tilt_threshold_deg >= 0.0
            && self.tilt_threshold_deg < self.max_tilt_deg;
        if !tilt_ok {
            return Err(SettingsError::Tilt {
                threshold: self.tilt_threshold_deg,
                max_tilt: self.max_tilt_deg,
            });
        }
        if !(0.0..1.0).contains(&self.start_deadzone) {
            return Err(SettingsError::Deadzone(self.start_deadzone));
        }
        Ok(())
    }

    pub fn tilt_mapping(&self) -> TiltMapping {
        TiltMapping {
            threshold_deg: self.tilt_threshold_deg,
            max_tilt_deg: self.max_tilt_deg,
        }
    }

    /// Simulation config for a viewport of `width` CSS pixels
    pub fn game_config(&self, width: f32, has_touch: bool) -> GameConfig {
        GameConfig {
            obstacle_count: self.obstacle_count,
            palette: self.palette.clone(),
            start_deadzone: self.start_deadzone,
            viewport: self.camera.resolve(width, has_touch),
            tilt: self.tilt_mapping(),
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "outrun_race_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY)
        {
            match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
                Err(e) => log::warn!("Discarding stored settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            match self.to_json() {
                Ok(json) => {
                    let _ = storage.set_item(Self::STORAGE_KEY, &json);
                    log::info!("Settings saved");
                }
                Err(e) => log::warn!("Settings not saved: {}", e),
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
