//! Procedural track generation
//!
//! A track is a start block, `count` obstacle slots and an end block laid
//! out along -Z. Archetypes and every per-obstacle random constant are drawn
//! from a single seeded stream, so a `(count, palette, seed)` key always
//! rebuilds the same level.

use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::physics::Material;
use crate::consts::*;

/// Obstacle behavior types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Spinner,
    Axe,
    Limbo,
    LaserGate,
    LaserWall,
}

impl Archetype {
    /// The full palette, in the order the level builder lists it
    pub const ALL: [Archetype; 5] = [
        Archetype::Spinner,
        Archetype::Axe,
        Archetype::Limbo,
        Archetype::LaserGate,
        Archetype::LaserWall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Spinner => "spinner",
            Archetype::Axe => "axe",
            Archetype::Limbo => "limbo",
            Archetype::LaserGate => "laser_gate",
            Archetype::LaserWall => "laser_wall",
        }
    }
}

/// Random constants drawn once per obstacle at generation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleParams {
    /// Signed angular speed, magnitude in [0.2, 1.2)
    Spinner { speed: f32 },
    /// Phase offset in [0, 2π)
    Axe { phase_offset: f32 },
    /// Phase offset in [0, 2π)
    Limbo { phase_offset: f32 },
    LaserGate,
    LaserWall,
}

impl ObstacleParams {
    /// Draw the per-instance constants for an archetype
    pub fn sample(archetype: Archetype, rng: &mut impl Rng) -> Self {
        use std::f32::consts::TAU;

        match archetype {
            Archetype::Spinner => {
                let magnitude = rng.random_range(0.2..1.2);
                let sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
                ObstacleParams::Spinner {
                    speed: magnitude * sign,
                }
            }
            Archetype::Axe => ObstacleParams::Axe {
                phase_offset: rng.random_range(0.0..TAU),
            },
            Archetype::Limbo => ObstacleParams::Limbo {
                phase_offset: rng.random_range(0.0..TAU),
            },
            Archetype::LaserGate => ObstacleParams::LaserGate,
            Archetype::LaserWall => ObstacleParams::LaserWall,
        }
    }

    pub fn archetype(&self) -> Archetype {
        match self {
            ObstacleParams::Spinner { .. } => Archetype::Spinner,
            ObstacleParams::Axe { .. } => Archetype::Axe,
            ObstacleParams::Limbo { .. } => Archetype::Limbo,
            ObstacleParams::LaserGate => Archetype::LaserGate,
            ObstacleParams::LaserWall => Archetype::LaserWall,
        }
    }
}

/// One obstacle in its slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    pub archetype: Archetype,
    /// 0-based slot along the track (start block excluded)
    pub index: u32,
    pub base_position: Vec3,
    pub params: ObstacleParams,
}

impl ObstaclePlacement {
    pub fn new(index: u32, params: ObstacleParams) -> Self {
        Self {
            archetype: params.archetype(),
            index,
            base_position: slot_position(index),
            params,
        }
    }
}

/// Generation key; changing any field regenerates the level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSpec {
    pub obstacle_count: u32,
    pub seed: u64,
    pub palette: Vec<Archetype>,
}

impl TrackSpec {
    pub fn new(obstacle_count: u32, seed: u64) -> Self {
        Self {
            obstacle_count,
            seed,
            palette: Archetype::ALL.to_vec(),
        }
    }

    pub fn with_palette(mut self, palette: Vec<Archetype>) -> Self {
        self.palette = palette;
        self
    }
}

/// A generated level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub spec: TrackSpec,
    pub obstacles: Vec<ObstaclePlacement>,
}

impl Track {
    /// Number of slots the corridor is sized for (independent of the palette)
    pub fn obstacle_count(&self) -> u32 {
        self.spec.obstacle_count
    }

    /// Total corridor length: start block + obstacles + end block
    pub fn length(&self) -> f32 {
        track_length(self.spec.obstacle_count)
    }

    /// Z of the end block center
    pub fn end_block_z(&self) -> f32 {
        -(self.spec.obstacle_count as f32 + 1.0) * SLOT_LENGTH
    }

    /// Crossing below this Z counts as finishing
    pub fn finish_z(&self) -> f32 {
        finish_line_z(self.spec.obstacle_count)
    }
}

/// Center of obstacle slot `index`
#[inline]
pub fn slot_position(index: u32) -> Vec3 {
    Vec3::new(0.0, 0.0, -((index + 1) as f32) * SLOT_LENGTH)
}

/// Corridor length for `count` obstacle slots
#[inline]
pub fn track_length(count: u32) -> f32 {
    (count as f32 + 2.0) * SLOT_LENGTH
}

/// Finish threshold on Z for `count` obstacle slots
#[inline]
pub fn finish_line_z(count: u32) -> f32 {
    -(count as f32 * SLOT_LENGTH + 2.0)
}

/// Generate a track from its spec
///
/// Each slot is sampled uniformly with replacement from the palette. An empty
/// palette yields no obstacles.
pub fn generate_track(spec: &TrackSpec) -> Track {
    let mut rng = Pcg32::seed_from_u64(spec.seed);

    let obstacles = if spec.palette.is_empty() {
        log::warn!(
            "Empty obstacle palette, generating {} empty slots",
            spec.obstacle_count
        );
        Vec::new()
    } else {
        (0..spec.obstacle_count)
            .map(|index| {
                let archetype = spec.palette[rng.random_range(0..spec.palette.len())];
                ObstaclePlacement::new(index, ObstacleParams::sample(archetype, &mut rng))
            })
            .collect()
    };

    log::info!(
        "Generated track: seed={}, slots={}, obstacles={}, length={}",
        spec.seed,
        spec.obstacle_count,
        obstacles.len(),
        track_length(spec.obstacle_count)
    );

    Track {
        spec: spec.clone(),
        obstacles,
    }
}

/// Memoized generator: regenerates only when the track key changes
#[derive(Debug, Clone, Default)]
pub struct TrackCache {
    current: Option<Track>,
    generations: u32,
}

impl TrackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached track for `spec`, generating it if the key changed.
    /// The flag is true when a new track was generated.
    pub fn get_or_generate(&mut self, spec: &TrackSpec) -> (&Track, bool) {
        let stale = self.current.as_ref().is_none_or(|t| t.spec != *spec);
        if stale {
            self.current = Some(generate_track(spec));
            self.generations += 1;
        }
        let track = self
            .current
            .get_or_insert_with(|| generate_track(spec));
        (track, stale)
    }

    /// How many times the cache has (re)generated
    pub fn generations(&self) -> u32 {
        self.generations
    }
}

/// Static collider description: a fixed cuboid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticCuboid {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub material: Material,
}

/// Block floors: engine defaults
pub const BLOCK_FLOOR_MATERIAL: Material = Material {
    restitution: 0.0,
    friction: 0.5,
};
/// The long floor under the whole run grips the ball
pub const RUN_FLOOR_MATERIAL: Material = Material {
    restitution: 0.2,
    friction: 1.0,
};
/// Walls, end cap and obstacles are slick
pub const SLICK_MATERIAL: Material = Material {
    restitution: 0.2,
    friction: 0.0,
};

/// Fixed colliders for a corridor of `count` obstacle slots
///
/// Depends on `count` alone: one floor per block, a long floor under the
/// whole run, wall segments every slot on both sides and an end cap.
pub fn boundary_colliders(count: u32) -> Vec<StaticCuboid> {
    let blocks = u64::from(count) + 2;
    let mut colliders = Vec::with_capacity(blocks as usize * 3 + 2);

    // Per-block floors (start, slots, end)
    for block in 0..blocks {
        colliders.push(StaticCuboid {
            center: Vec3::new(0.0, -0.1, -(block as f32) * SLOT_LENGTH),
            half_extents: Vec3::new(HALF_TRACK_WIDTH, 0.1, SLOT_LENGTH / 2.0),
            material: BLOCK_FLOOR_MATERIAL,
        });
    }

    let length = blocks as f32;
    colliders.push(StaticCuboid {
        center: Vec3::new(0.0, -0.1, -(length * 2.0) + 2.0),
        half_extents: Vec3::new(HALF_TRACK_WIDTH, 0.1, 2.0 * length),
        material: RUN_FLOOR_MATERIAL,
    });

    for segment in 0..blocks {
        let z = -(segment as f32) * SLOT_LENGTH;
        for x in [-HALF_TRACK_WIDTH, HALF_TRACK_WIDTH] {
            colliders.push(StaticCuboid {
                center: Vec3::new(x, 0.75, z),
                half_extents: Vec3::new(0.1, 0.75, SLOT_LENGTH / 2.0),
                material: SLICK_MATERIAL,
            });
        }
    }

    // End cap
    colliders.push(StaticCuboid {
        center: Vec3::new(0.0, 0.75, -(length * SLOT_LENGTH) + 2.0),
        half_extents: Vec3::new(HALF_TRACK_WIDTH, 0.75, 0.1),
        material: SLICK_MATERIAL,
    });

    colliders
}
