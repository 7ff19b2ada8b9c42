//! Fixed timestep simulation tick
//!
//! Order within a tick: obstacles queue their kinematic targets, the player
//! reads input and applies forces, the physics world steps, then the ball
//! position feeds the camera and the finish/fall checks.

use super::input::{ControlVector, KeyboardState};
use super::phase::{GameAction, GameEvent, RunPhase};
use super::physics::PhysicsWorld;
use super::state::GameState;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Held keyboard flags
    pub keys: KeyboardState,
}

/// Advance the game state by one fixed timestep
pub fn tick<W: PhysicsWorld>(state: &mut GameState<W>, input: &TickInput, dt: f32) {
    // Restart or settings changes that arrived between ticks
    state.sync_with_store();

    let now = state.now_ms();
    state.store.expire_boost(now);

    // First input starts the clock
    if state.store.phase() == RunPhase::Ready {
        let analog = state.store.analog();
        let moved = input.keys.any_pressed()
            || analog.exceeds(state.config.start_deadzone)
            || state.store.has_jump_pulse();
        if moved {
            state.store.dispatch(GameAction::Start { now_ms: now });
        }
    }

    // Obstacles
    let t = state.time_secs();
    state.level.drive(&mut state.world, t);

    // Player
    let phase = state.store.phase();
    let mobile_jump = state.store.take_jump_pulse();
    let key_jump = state.jump_key.rising(input.keys.jump);

    // Jump and movement are frozen once the run has ended
    let wants_jump = phase != RunPhase::Ended && (key_jump || mobile_jump);
    if wants_jump && state.player.try_jump(&mut state.world) {
        state.store.push_event(GameEvent::Jumped);
    }

    if phase != RunPhase::Ended {
        let controls = ControlVector::merge(&input.keys, &state.store.analog());
        let multiplier = state.store.boost().multiplier();
        state
            .player
            .apply_controls(&mut state.world, &controls, multiplier, dt);
    }

    state.world.step(dt);
    state.time_ticks += 1;

    // Camera and phase checks
    let position = state.player.position(&state.world);
    state.camera.update(position, dt);

    if position.z < state.level.track.finish_z() {
        state.store.dispatch(GameAction::End {
            now_ms: state.now_ms(),
        });
    }

    if position.y < FALL_THRESHOLD_Y {
        log::info!("Fell off the track at z={:.1}", position.z);
        state.store.dispatch(GameAction::Restart);
    }

    state.sync_with_store();
}
