//! Game state
//!
//! Owns the physics world, the current level, the player body and the run
//! store. Everything the tick needs between frames lives here.

use serde::{Deserialize, Serialize};

use super::camera::{FollowCamera, ViewportKind};
use super::input::{EdgeTrigger, TiltMapping};
use super::level::Level;
use super::phase::{GameAction, GameEvent, GameStore, RunPhase};
use super::physics::PhysicsWorld;
use super::player::PlayerController;
use super::track::{Archetype, TrackCache, TrackSpec};
use super::rapier_world::RapierWorld;
use crate::consts::*;

/// Level and control tuning a state is created with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub obstacle_count: u32,
    pub palette: Vec<Archetype>,
    pub start_deadzone: f32,
    pub viewport: ViewportKind,
    pub tilt: TiltMapping,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            obstacle_count: DEFAULT_OBSTACLE_COUNT,
            palette: Archetype::ALL.to_vec(),
            start_deadzone: START_DEADZONE,
            viewport: ViewportKind::Desktop,
            tilt: TiltMapping::default(),
        }
    }
}

fn clamp_obstacle_count(count: u32) -> u32 {
    if count > MAX_OBSTACLE_COUNT {
        log::warn!("Obstacle count {} clamped to {}", count, MAX_OBSTACLE_COUNT);
    }
    count.min(MAX_OBSTACLE_COUNT)
}

/// Complete game state
pub struct GameState<W: PhysicsWorld = RapierWorld> {
    pub config: GameConfig,
    pub world: W,
    pub store: GameStore,
    pub tracks: TrackCache,
    pub level: Level,
    pub player: PlayerController,
    pub camera: FollowCamera,
    /// Keyboard jump is edge-triggered
    pub(crate) jump_key: EdgeTrigger,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl GameState<RapierWorld> {
    /// New state on a fresh Rapier world
    pub fn new(seed: u64) -> Self {
        Self::with_world(RapierWorld::new(), GameConfig::default(), seed)
    }
}

impl<W: PhysicsWorld> GameState<W> {
    pub fn with_world(mut world: W, mut config: GameConfig, seed: u64) -> Self {
        config.obstacle_count = clamp_obstacle_count(config.obstacle_count);
        let mut store = GameStore::new(seed);
        let mut tracks = TrackCache::new();

        let spec = Self::track_spec(&config, seed);
        let (track, _) = tracks.get_or_generate(&spec);
        let level = Level::build(&mut world, track.clone());
        store.push_event(GameEvent::LevelGenerated {
            seed,
            obstacle_count: config.obstacle_count,
        });

        let player = PlayerController::spawn(&mut world);
        let camera = FollowCamera::new(config.viewport);

        Self {
            config,
            world,
            store,
            tracks,
            level,
            player,
            camera,
            jump_key: EdgeTrigger::default(),
            time_ticks: 0,
        }
    }

    fn track_spec(config: &GameConfig, seed: u64) -> TrackSpec {
        TrackSpec::new(config.obstacle_count, seed).with_palette(config.palette.clone())
    }

    /// Simulation clock in milliseconds
    pub fn now_ms(&self) -> f64 {
        self.time_ticks as f64 * 1000.0 / TICK_RATE
    }

    /// Simulation clock in seconds (drives the obstacles)
    pub fn time_secs(&self) -> f32 {
        (self.time_ticks as f64 / TICK_RATE) as f32
    }

    pub fn phase(&self) -> RunPhase {
        self.store.phase()
    }

    /// Run time for the HUD
    pub fn elapsed_ms(&self) -> f64 {
        self.store.elapsed_ms(self.now_ms())
    }

    pub fn dispatch(&mut self, action: GameAction) -> bool {
        let changed = self.store.dispatch(action);
        self.sync_with_store();
        changed
    }

    /// Explicit restart (restart button, fall)
    pub fn restart(&mut self) {
        self.dispatch(GameAction::Restart);
    }

    /// Change the obstacle count; the level is rebuilt if the key changed
    pub fn set_obstacle_count(&mut self, obstacle_count: u32) {
        self.config.obstacle_count = clamp_obstacle_count(obstacle_count);
        self.sync_with_store();
    }

    /// Carry out what the store asked for: rebuild the level when its key
    /// changed, put the ball back on a restart
    pub(crate) fn sync_with_store(&mut self) {
        let spec = Self::track_spec(&self.config, self.store.level_seed());
        let (track, generated) = self.tracks.get_or_generate(&spec);
        if generated {
            let track = track.clone();
            let old = std::mem::replace(&mut self.level, Level::build(&mut self.world, track));
            old.destroy(&mut self.world);
            self.store.push_event(GameEvent::LevelGenerated {
                seed: spec.seed,
                obstacle_count: spec.obstacle_count,
            });
        }

        if self.store.take_reset() {
            self.player.reset(&mut self.world);
        }
    }
}
