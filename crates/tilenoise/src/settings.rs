use anyhow::{Context, Result};
use noiseconfig::{BackendChoice, NoiseConfig};
use scheduler::{clamp_side, Frame, Limits, RunRequest, DEFAULT_SIDE};

use crate::cli::Args;

/// Everything a run needs, after defaults, the config file and flags have
/// been layered.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: NoiseConfig,
    pub frame: Frame,
    pub limits: Limits,
    pub budget: u64,
    pub backend: BackendChoice,
    pub seed: u64,
}

impl Settings {
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => NoiseConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => NoiseConfig::default(),
        };
        apply_overrides(&mut config, args);
        config
            .validate()
            .context("configuration is invalid after applying command-line flags")?;

        let (width, height) = frame_size(&config);
        let frame = Frame::new(width, height).context("invalid frame size")?;
        let limits = Limits::from_config(&config);
        let seed = config.run.seed.unwrap_or_else(rand::random);

        Ok(Self {
            frame,
            limits,
            budget: config.run.cycles.unwrap_or(u64::MAX),
            backend: config.run.backend,
            seed,
            config,
        })
    }

    pub fn request(&self) -> RunRequest {
        RunRequest::new(self.frame, self.limits.tile_size, self.budget)
    }
}

fn apply_overrides(config: &mut NoiseConfig, args: &Args) {
    if let Some((width, height)) = args.size {
        config.frame.width = Some(width);
        config.frame.height = Some(height);
    }
    if args.no_clamp {
        config.frame.clamp = false;
    }
    if let Some(tile) = args.tile {
        config.run.tile_size = tile;
    }
    if let Some(cycles) = args.cycles {
        config.run.cycles = Some(cycles);
    }
    if let Some(backend) = args.backend {
        config.run.backend = backend;
    }
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(memory_gb) = args.memory_gb {
        config.limits.memory_gb = Some(memory_gb);
    }
    if let Some(max_pixels) = args.max_pixels {
        config.limits.max_pixels = max_pixels;
    }
}

/// A missing height mirrors the width.
fn frame_size(config: &NoiseConfig) -> (u32, u32) {
    let width = config.frame.width;
    let height = config.frame.height.or(width);
    if config.frame.clamp {
        (clamp_side(width), clamp_side(height))
    } else {
        (
            width.unwrap_or(DEFAULT_SIDE),
            height.unwrap_or(DEFAULT_SIDE),
        )
    }
}
