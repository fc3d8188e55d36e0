//! Host capability advice.
//!
//! Turns a memory hint into a tile size and supplies the hard pixel ceiling.
//! The scheduler treats the resulting [`Limits`] as plain configuration.

use noiseconfig::NoiseConfig;

pub const DEFAULT_MAX_PIXELS: u64 = noiseconfig::DEFAULT_MAX_PIXELS;
/// Assumed host memory when the host does not report any.
pub const DEFAULT_MEMORY_GB: f32 = 4.0;
pub const MIN_SIDE: u32 = 4000;
pub const MAX_SIDE: u32 = 24000;
pub const DEFAULT_SIDE: u32 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostHints {
    pub memory_gb: Option<f32>,
}

impl HostHints {
    pub fn memory_gb(&self) -> f32 {
        self.memory_gb.unwrap_or(DEFAULT_MEMORY_GB)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub tile_size: u32,
    pub max_pixels: u64,
}

impl Limits {
    pub fn advise(base_tile: u32, hints: HostHints, max_pixels: u64) -> Self {
        Self {
            tile_size: pick_tile(base_tile, hints.memory_gb()),
            max_pixels,
        }
    }

    pub fn from_config(config: &NoiseConfig) -> Self {
        Self::advise(
            config.run.tile_size,
            HostHints {
                memory_gb: config.limits.memory_gb,
            },
            config.limits.max_pixels,
        )
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tile_size: noiseconfig::DEFAULT_TILE_SIZE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Scales `base` down on hosts with less memory.
pub fn pick_tile(base: u32, memory_gb: f32) -> u32 {
    if memory_gb >= 16.0 {
        base
    } else if memory_gb >= 8.0 {
        ((u64::from(base) * 3 / 4) as u32).max(16)
    } else {
        (base / 2).max(8)
    }
}

/// Clamps a requested canvas side into `[MIN_SIDE, MAX_SIDE]`.
pub fn clamp_side(requested: Option<u32>) -> u32 {
    requested.map_or(DEFAULT_SIDE, |side| side.clamp(MIN_SIDE, MAX_SIDE))
}
