use std::path::PathBuf;

use clap::Parser;
use noiseconfig::BackendChoice;

#[derive(Parser, Debug, Default)]
#[command(
    name = "tilenoise",
    author,
    version,
    about = "Fills a frame with per-pixel noise, one tile at a time"
)]
pub struct Args {
    /// TOML configuration file; command-line flags override its values.
    #[arg(long, value_name = "PATH", env = "TILENOISE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Frame size (e.g. `8000x8000`). A single number gives a square frame.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_frame_size)]
    pub size: Option<(u32, u32)>,

    /// Base tile side in pixels, before the memory-based adjustment.
    #[arg(long, value_name = "PIXELS")]
    pub tile: Option<u32>,

    /// Maximum number of tiles to render (default: the whole frame).
    #[arg(long, value_name = "TILES")]
    pub cycles: Option<u64>,

    /// Synthesis backend: `scalar`, `parallel`, or `auto`.
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<BackendChoice>,

    /// Seed for the per-tile seed generator (default: random).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Host memory hint in gigabytes; smaller hosts get smaller tiles.
    #[arg(long, value_name = "GB")]
    pub memory_gb: Option<f32>,

    /// Refuse frames with more pixels than this.
    #[arg(long, value_name = "PIXELS")]
    pub max_pixels: Option<u64>,

    /// Keep the requested frame size instead of clamping each side to 4000-24000.
    #[arg(long)]
    pub no_clamp: bool,

    /// Log throttled percentage lines instead of raw tile counts.
    #[arg(long)]
    pub percent: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn parse_frame_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = match trimmed.split_once(['x', 'X', '×']) {
        Some((width, height)) => (width.trim(), height.trim()),
        None => (trimmed, trimmed),
    };

    let width: u32 = width
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'; expected WxH, e.g. 8000x8000"))?;
    let height: u32 = height
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'; expected WxH, e.g. 8000x8000"))?;

    if width == 0 || height == 0 {
        return Err("frame dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_backend(value: &str) -> Result<BackendChoice, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_accepts_pairs_and_squares() {
        assert_eq!(parse_frame_size("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_frame_size(" 640 X 480 "), Ok((640, 480)));
        assert_eq!(parse_frame_size("300×200"), Ok((300, 200)));
        assert_eq!(parse_frame_size("512"), Ok((512, 512)));
    }

    #[test]
    fn size_rejects_garbage_and_zero() {
        assert!(parse_frame_size("wide").is_err());
        assert!(parse_frame_size("10x").is_err());
        assert!(parse_frame_size("0x10").is_err());
    }

    #[test]
    fn backend_aliases_parse() {
        assert_eq!(parse_backend("GPU"), Ok(BackendChoice::Parallel));
        assert_eq!(parse_backend("cpu"), Ok(BackendChoice::Scalar));
        assert!(parse_backend("quantum").is_err());
    }

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from([
            "tilenoise",
            "--size",
            "64x32",
            "--tile",
            "16",
            "--cycles",
            "3",
            "--backend",
            "scalar",
            "--no-clamp",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.size, Some((64, 32)));
        assert_eq!(args.tile, Some(16));
        assert_eq!(args.cycles, Some(3));
        assert_eq!(args.backend, Some(BackendChoice::Scalar));
        assert!(args.no_clamp);
        assert!(args.json);
        assert!(!args.percent);
    }
}
