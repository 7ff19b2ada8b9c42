//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Physics reached only through `PhysicsWorld`
//! - No rendering or platform dependencies

pub mod boost;
pub mod camera;
pub mod input;
pub mod level;
pub mod obstacle;
pub mod phase;
pub mod physics;
pub mod player;
pub mod rapier_world;
pub mod state;
pub mod tick;
pub mod track;

pub use boost::{BoostEvent, SpeedBoost};
pub use camera::{FollowCamera, ViewportKind};
pub use input::{AnalogControls, ControlVector, Gyroscope, JumpButton, KeyAction, KeyboardState, TiltMapping};
pub use level::Level;
pub use obstacle::{ObstacleController, ObstacleFrame};
pub use phase::{GameAction, GameEvent, GameStore, RunPhase};
pub use physics::{BallDesc, BodyHandle, CuboidDesc, CuboidKind, Material, PhysicsWorld, RayHit};
pub use player::PlayerController;
pub use rapier_world::RapierWorld;
pub use state::{GameConfig, GameState};
pub use tick::{TickInput, tick};
pub use track::{Archetype, Track, TrackCache, TrackSpec, generate_track};
