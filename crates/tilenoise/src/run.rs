use anyhow::{Context, Result};
use noiseconfig::BackendChoice;
use renderer::{ParallelBackend, ParallelOptions};
use scheduler::{
    tile_count, Backend, Canvas, CooperativeScheduler, LogProgress, PercentProgress,
    ProgressSink, RunState, ScalarBackend,
};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::settings::Settings;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let settings = Settings::resolve(&args)?;
    let request = settings.request();
    let frame = settings.frame;
    tracing::info!(
        width = frame.width(),
        height = frame.height(),
        tile_size = request.tile_size,
        backend = %settings.backend,
        seed = settings.seed,
        "starting tiled synthesis"
    );

    frame
        .check_limit(settings.limits.max_pixels)
        .context("refusing to allocate the frame")?;

    let mut backend = select_backend(settings.backend, request.tile_size)?;
    let mut scheduler = CooperativeScheduler::from_config(&settings.config, settings.seed);
    let cancel = scheduler.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to install Ctrl-C handler")?;
    let mut canvas = Canvas::new(frame.width(), frame.height());

    let mut progress: Box<dyn ProgressSink> = if args.percent {
        let total = tile_count(frame.width(), frame.height(), request.tile_size)
            .min(request.budget);
        Box::new(PercentProgress::new(total, |line: &str| {
            tracing::info!("{line}")
        }))
    } else {
        Box::new(LogProgress)
    };

    let report = scheduler
        .run_blocking(request, &mut backend, &mut canvas, &mut *progress)
        .context("tiled synthesis failed")?;

    if report.state == RunState::Aborted {
        tracing::warn!(completed = report.completed, "run interrupted");
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode run report")?
        );
    }

    Ok(())
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn select_backend(choice: BackendChoice, tile_size: u32) -> Result<Box<dyn Backend>> {
    match choice {
        BackendChoice::Scalar => Ok(Box::new(ScalarBackend::new())),
        BackendChoice::Parallel => {
            let backend = ParallelBackend::new(ParallelOptions::new(tile_size))
                .context("parallel backend requested but could not be initialised")?;
            Ok(Box::new(backend))
        }
        BackendChoice::Auto => {
            if !renderer::gpu_available() {
                tracing::warn!("no GPU adapter found; using the scalar backend");
                return Ok(Box::new(ScalarBackend::new()));
            }
            match ParallelBackend::new(ParallelOptions::new(tile_size)) {
                Ok(backend) => Ok(Box::new(backend)),
                Err(err) => {
                    tracing::warn!(%err, "parallel backend unavailable; using the scalar backend");
                    Ok(Box::new(ScalarBackend::new()))
                }
            }
        }
    }
}
