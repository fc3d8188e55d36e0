use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TILE_SIZE: u32 = 256;
pub const DEFAULT_MAX_PIXELS: u64 = 400_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Synthesis backend requested by the user.
///
/// `Auto` defers the decision to the host, which probes for a GPU adapter and
/// falls back to the scalar path when none is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Scalar,
    Parallel,
    Auto,
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("backend must not be empty".to_string());
        }

        let normalized = trimmed.to_ascii_lowercase();
        match normalized.as_str() {
            "scalar" | "cpu" => Ok(Self::Scalar),
            "parallel" | "gpu" | "shader" => Ok(Self::Parallel),
            "auto" | "default" => Ok(Self::Auto),
            _ => Err(format!(
                "unknown backend '{trimmed}'; expected scalar, parallel, or auto"
            )),
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Parallel => f.write_str("parallel"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl<'de> Deserialize<'de> for BackendChoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoiseConfig {
    pub version: u32,
    #[serde(default)]
    pub frame: FrameSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub cadence: CadenceSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameSection {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Clamp requested sides into the range browsers and drivers cope with.
    #[serde(default = "default_clamp")]
    pub clamp: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunSection {
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Tile budget; absent means the whole frame.
    #[serde(default)]
    pub cycles: Option<u64>,
    #[serde(default)]
    pub backend: BackendChoice,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsSection {
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
    /// Host memory hint in GiB, used to scale the tile size down.
    #[serde(default)]
    pub memory_gb: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CadenceSection {
    #[serde(default)]
    pub scalar: CadenceOverride,
    #[serde(default)]
    pub parallel: CadenceOverride,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CadenceOverride {
    #[serde(default)]
    pub report_every: Option<u64>,
    #[serde(default)]
    pub yield_every: Option<u64>,
}

fn default_clamp() -> bool {
    true
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

impl Default for FrameSection {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            clamp: default_clamp(),
        }
    }
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            cycles: None,
            backend: BackendChoice::default(),
            seed: None,
        }
    }
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_pixels: default_max_pixels(),
            memory_gb: None,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            version: 1,
            frame: FrameSection::default(),
            run: RunSection::default(),
            limits: LimitsSection::default(),
            cadence: CadenceSection::default(),
        }
    }
}

impl NoiseConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: NoiseConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.frame.width == Some(0) || self.frame.height == Some(0) {
            return Err(ConfigError::Invalid(
                "frame width and height must be greater than zero".into(),
            ));
        }

        if self.run.tile_size == 0 {
            return Err(ConfigError::Invalid(
                "run.tile_size must be greater than zero".into(),
            ));
        }

        if self.limits.max_pixels == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_pixels must be greater than zero".into(),
            ));
        }

        if let Some(memory) = self.limits.memory_gb {
            if !memory.is_finite() || memory <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "limits.memory_gb must be a positive number, got {memory}"
                )));
            }
        }

        for (name, cadence) in [
            ("scalar", &self.cadence.scalar),
            ("parallel", &self.cadence.parallel),
        ] {
            if cadence.report_every == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "cadence.{name}.report_every must be greater than zero"
                )));
            }
            if cadence.yield_every == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "cadence.{name}.yield_every must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}
