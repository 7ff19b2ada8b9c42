//! Run phase state machine
//!
//! `GameStore` is the single place shared run state lives. Everything that
//! changes it goes through `dispatch` with a `GameAction`, and observers
//! read the phase, timestamps and the drained `GameEvent` queue.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boost::{BoostEvent, SpeedBoost};
use super::input::{AnalogControls, Cooldown};
use crate::consts::MOBILE_JUMP_COOLDOWN_MS;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunPhase {
    /// At the start line, waiting for the first input
    #[default]
    Ready,
    /// Clock running
    Playing,
    /// Crossed the finish; input frozen, physics still running
    Ended,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Ready => "ready",
            RunPhase::Playing => "playing",
            RunPhase::Ended => "ended",
        }
    }
}

/// Things observers may want to react to (HUD, audio, analytics)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { from: RunPhase, to: RunPhase },
    LevelGenerated { seed: u64, obstacle_count: u32 },
    BoostStarted { multiplier: f32, duration_ms: u32 },
    BoostExpired,
    Jumped,
}

/// Reducer actions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameAction {
    Start { now_ms: f64 },
    End { now_ms: f64 },
    Restart,
    SetMobileControls(AnalogControls),
    MobileJump { now_ms: f64 },
    Boost { event: BoostEvent, now_ms: f64 },
}

/// Shared run state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStore {
    phase: RunPhase,
    start_time_ms: Option<f64>,
    end_time_ms: Option<f64>,
    /// Latest analog reading from the touch/tilt producer
    analog: AnalogControls,
    /// Mobile jump waiting to be consumed by the player
    jump_pulse: bool,
    mobile_jump: Cooldown,
    boost: SpeedBoost,
    /// Seed of the level the current run uses
    level_seed: u64,
    /// Set by every restart until the player resets its body
    reset_pending: bool,
    #[serde(skip)]
    events: Vec<GameEvent>,
}

impl GameStore {
    pub fn new(level_seed: u64) -> Self {
        Self {
            phase: RunPhase::Ready,
            start_time_ms: None,
            end_time_ms: None,
            analog: AnalogControls::default(),
            jump_pulse: false,
            mobile_jump: Cooldown::new(MOBILE_JUMP_COOLDOWN_MS),
            boost: SpeedBoost::default(),
            level_seed,
            reset_pending: false,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn start_time_ms(&self) -> Option<f64> {
        self.start_time_ms
    }

    pub fn end_time_ms(&self) -> Option<f64> {
        self.end_time_ms
    }

    pub fn analog(&self) -> AnalogControls {
        self.analog
    }

    pub fn boost(&self) -> &SpeedBoost {
        &self.boost
    }

    pub fn level_seed(&self) -> u64 {
        self.level_seed
    }

    /// Run time as shown on the HUD
    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        match (self.phase, self.start_time_ms, self.end_time_ms) {
            (RunPhase::Playing, Some(start), _) => (now_ms - start).max(0.0),
            (RunPhase::Ended, Some(start), Some(end)) => end - start,
            _ => 0.0,
        }
    }

    /// Apply an action. Returns true if it changed anything.
    pub fn dispatch(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::Start { now_ms } => self.start(now_ms),
            GameAction::End { now_ms } => self.end(now_ms),
            GameAction::Restart => {
                self.restart();
                true
            }
            GameAction::SetMobileControls(controls) => {
                let controls = controls.sanitized();
                let changed = self.analog != controls;
                self.analog = controls;
                changed
            }
            GameAction::MobileJump { now_ms } => {
                if self.mobile_jump.try_fire(now_ms) {
                    self.jump_pulse = true;
                    true
                } else {
                    false
                }
            }
            GameAction::Boost { event, now_ms } => {
                let applied = self.boost.apply(event, now_ms);
                if applied {
                    self.events.push(GameEvent::BoostStarted {
                        multiplier: event.multiplier,
                        duration_ms: event.duration_ms,
                    });
                }
                applied
            }
        }
    }

    fn start(&mut self, now_ms: f64) -> bool {
        if self.phase != RunPhase::Ready {
            return false;
        }
        self.start_time_ms = Some(now_ms);
        self.end_time_ms = None;
        self.set_phase(RunPhase::Playing);
        true
    }

    fn end(&mut self, now_ms: f64) -> bool {
        if self.phase != RunPhase::Playing {
            return false;
        }
        self.end_time_ms = Some(now_ms);
        self.set_phase(RunPhase::Ended);
        log::info!("Run finished in {:.2}s", self.elapsed_ms(now_ms) / 1000.0);
        true
    }

    fn restart(&mut self) {
        if self.phase != RunPhase::Ready {
            self.level_seed = next_level_seed(self.level_seed);
        }
        self.start_time_ms = None;
        self.end_time_ms = None;
        self.jump_pulse = false;
        self.mobile_jump.reset();
        self.boost.cancel();
        self.reset_pending = true;
        self.set_phase(RunPhase::Ready);
    }

    fn set_phase(&mut self, to: RunPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        log::info!("Phase {} -> {}", from.as_str(), to.as_str());
        self.events.push(GameEvent::PhaseChanged { from, to });
    }

    /// Consume a pending mobile jump
    pub fn take_jump_pulse(&mut self) -> bool {
        std::mem::take(&mut self.jump_pulse)
    }

    /// Whether a mobile jump is waiting (does not consume it)
    pub fn has_jump_pulse(&self) -> bool {
        self.jump_pulse
    }

    /// Consume the body reset a restart requested
    pub fn take_reset(&mut self) -> bool {
        std::mem::take(&mut self.reset_pending)
    }

    /// Expire the boost if its deadline passed
    pub fn expire_boost(&mut self, now_ms: f64) {
        if self.boost.expire(now_ms) {
            log::debug!("Speed boost expired");
            self.events.push(GameEvent::BoostExpired);
        }
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Seed for the level after `seed`
pub fn next_level_seed(seed: u64) -> u64 {
    Pcg32::seed_from_u64(seed).next_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_only_from_ready() {
        let mut store = GameStore::new(1);
        assert!(store.dispatch(GameAction::Start { now_ms: 100.0 }));
        assert_eq!(store.phase(), RunPhase::Playing);
        assert_eq!(store.start_time_ms(), Some(100.0));

        assert!(!store.dispatch(GameAction::Start { now_ms: 500.0 }));
        assert_eq!(store.start_time_ms(), Some(100.0));
    }

    #[test]
    fn test_end_sets_end_time_once() {
        let mut store = GameStore::new(1);
        assert!(!store.dispatch(GameAction::End { now_ms: 50.0 }));
        assert_eq!(store.end_time_ms(), None);

        store.dispatch(GameAction::Start { now_ms: 0.0 });
        assert!(store.dispatch(GameAction::End { now_ms: 12_340.0 }));
        assert!(!store.dispatch(GameAction::End { now_ms: 20_000.0 }));
        assert_eq!(store.end_time_ms(), Some(12_340.0));
        assert_eq!(store.elapsed_ms(99_999.0), 12_340.0);
    }

    #[test]
    fn test_elapsed_by_phase() {
        let mut store = GameStore::new(1);
        assert_eq!(store.elapsed_ms(1000.0), 0.0);
        store.dispatch(GameAction::Start { now_ms: 1000.0 });
        assert_eq!(store.elapsed_ms(3500.0), 2500.0);
    }

    #[test]
    fn test_restart_is_idempotent() {
        let mut store = GameStore::new(7);
        store.dispatch(GameAction::Start { now_ms: 0.0 });
        store.dispatch(GameAction::Boost {
            event: BoostEvent::new(2.0, 1000),
            now_ms: 10.0,
        });

        store.dispatch(GameAction::Restart);
        let once = store.clone();
        store.dispatch(GameAction::Restart);

        assert_eq!(store.phase(), RunPhase::Ready);
        assert_eq!(store.start_time_ms(), None);
        assert_eq!(store.end_time_ms(), None);
        assert_eq!(store.boost().multiplier(), 1.0);
        assert_eq!(store.level_seed(), once.level_seed());
        assert_eq!(store.phase(), once.phase());
    }

    #[test]
    fn test_restart_rolls_new_level() {
        let mut store = GameStore::new(7);
        store.dispatch(GameAction::Restart);
        assert_eq!(store.level_seed(), 7);

        store.dispatch(GameAction::Start { now_ms: 0.0 });
        store.dispatch(GameAction::Restart);
        assert_eq!(store.level_seed(), next_level_seed(7));
        assert!(store.take_reset());
        assert!(!store.take_reset());
    }

    #[test]
    fn test_mobile_jump_throttled() {
        let mut store = GameStore::new(1);
        assert!(store.dispatch(GameAction::MobileJump { now_ms: 0.0 }));
        assert!(store.take_jump_pulse());
        assert!(!store.take_jump_pulse());

        assert!(!store.dispatch(GameAction::MobileJump { now_ms: 200.0 }));
        assert!(!store.has_jump_pulse());
        assert!(store.dispatch(GameAction::MobileJump { now_ms: 400.0 }));
        assert!(store.has_jump_pulse());
    }

    #[test]
    fn test_events_drain() {
        let mut store = GameStore::new(1);
        store.dispatch(GameAction::Start { now_ms: 0.0 });
        store.dispatch(GameAction::Boost {
            event: BoostEvent::new(2.0, 100),
            now_ms: 0.0,
        });
        store.expire_boost(100.0);

        let events = store.drain_events();
        assert_eq!(
            events,
            vec![
                GameEvent::PhaseChanged {
                    from: RunPhase::Ready,
                    to: RunPhase::Playing
                },
                GameEvent::BoostStarted {
                    multiplier: 2.0,
                    duration_ms: 100
                },
                GameEvent::BoostExpired,
            ]
        );
        assert!(store.drain_events().is_empty());
    }

    #[test]
    fn test_mobile_controls_sanitized() {
        let mut store = GameStore::new(1);
        store.dispatch(GameAction::SetMobileControls(AnalogControls {
            forward: 3.0,
            leftward: f32::NAN,
            ..Default::default()
        }));
        assert_eq!(store.analog().forward, 1.0);
        assert_eq!(store.analog().leftward, 0.0);
    }
}
