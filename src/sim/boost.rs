//! Transient speed boosts
//!
//! A boost scales movement impulses and torques until a deadline on the
//! simulation clock. Only one boost is active at a time; a new one replaces
//! both the multiplier and the pending reset.

use serde::{Deserialize, Serialize};

/// Boost request posted by a pickup or trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostEvent {
    pub multiplier: f32,
    pub duration_ms: u32,
}

impl BoostEvent {
    pub fn new(multiplier: f32, duration_ms: u32) -> Self {
        Self {
            multiplier,
            duration_ms,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.multiplier.is_finite() && self.multiplier > 0.0
    }
}

/// Active movement multiplier and when it lapses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBoost {
    multiplier: f32,
    expires_at_ms: Option<f64>,
}

impl Default for SpeedBoost {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            expires_at_ms: None,
        }
    }
}

impl SpeedBoost {
    #[inline]
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn expires_at_ms(&self) -> Option<f64> {
        self.expires_at_ms
    }

    pub fn is_active(&self) -> bool {
        self.expires_at_ms.is_some()
    }

    /// Start `event` at `now_ms`, replacing any boost in flight.
    /// Returns false if the event was rejected.
    pub fn apply(&mut self, event: BoostEvent, now_ms: f64) -> bool {
        if !event.is_valid() {
            log::warn!("Ignoring speed boost with multiplier {}", event.multiplier);
            return false;
        }
        if self.is_active() {
            log::debug!("Speed boost x{} preempted", self.multiplier);
        }
        self.multiplier = event.multiplier;
        self.expires_at_ms = Some(now_ms + f64::from(event.duration_ms));
        log::debug!(
            "Speed boost x{} for {}ms",
            event.multiplier,
            event.duration_ms
        );
        true
    }

    /// Drop back to 1 once the deadline has passed. Returns true on the
    /// call that expires the boost.
    pub fn expire(&mut self, now_ms: f64) -> bool {
        match self.expires_at_ms {
            Some(deadline) if now_ms >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }

    /// Clear immediately (restart)
    pub fn cancel(&mut self) {
        self.multiplier = 1.0;
        self.expires_at_ms = None;
    }
}
