//! Cooperative tile scheduling.
//!
//! A run is split into slices. [`TileJob::step`] renders tiles until the next
//! yield point and hands control back with [`Step::Yield`]; whoever drives the
//! job lets other host work run for one tick and calls `step` again. The async
//! [`CooperativeScheduler::run`] does exactly that with [`yield_now`], so an
//! executor shared with other tasks interleaves them at every yield point.
//!
//! ```text
//!   start() ──▶ Idle ──step()──▶ Running ──step()──▶ Completed
//!                                   │  ▲
//!                        Step::Yield│  │resume (cancel token checked)
//!                                   ▼  │
//!                                 host tick ──────▶ Aborted
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use noiseconfig::{CadenceOverride, NoiseConfig};
use rand::prelude::*;
use serde::Serialize;

use crate::backend::{Backend, BackendKind, Origin, PixelBuffer, Seed, CHANNELS};
use crate::capability::Limits;
use crate::error::SchedulerError;
use crate::geometry::{tile_count, Frame, Regions, Tile};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::surface::DrawingSurface;

/// How often a run reports progress and yields, counted in completed tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub report_every: u64,
    pub yield_every: u64,
}

impl Cadence {
    pub const SCALAR: Cadence = Cadence {
        report_every: 1000,
        yield_every: 1500,
    };
    pub const PARALLEL: Cadence = Cadence {
        report_every: 2000,
        yield_every: 2000,
    };

    pub fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Scalar => Self::SCALAR,
            BackendKind::Parallel => Self::PARALLEL,
        }
    }

    pub fn with_override(self, overrides: &CadenceOverride) -> Self {
        Self {
            report_every: overrides.report_every.unwrap_or(self.report_every),
            yield_every: overrides.yield_every.unwrap_or(self.yield_every),
        }
    }
}

/// Shared flag the host flips to stop a run at its next yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BudgetExhausted,
    FrameExhausted,
    Cancelled,
    /// A tile failed to render or write; the error went to the caller.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub backend: BackendKind,
    pub completed: u64,
    pub total_tiles: u64,
    pub yields: u64,
    pub state: RunState,
    pub reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub frame: Frame,
    pub tile_size: u32,
    /// Maximum number of tiles to complete.
    pub budget: u64,
}

impl RunRequest {
    pub fn new(frame: Frame, tile_size: u32, budget: u64) -> Self {
        Self {
            frame,
            tile_size,
            budget,
        }
    }

    pub fn whole_frame(frame: Frame, tile_size: u32) -> Self {
        Self::new(frame, tile_size, u64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A yield point was reached; call `step` again after one host tick.
    Yield,
    Done(RunReport),
}

pub struct CooperativeScheduler {
    limits: Limits,
    scalar: Cadence,
    parallel: Cadence,
    cancel: CancelToken,
    rng: StdRng,
}

impl CooperativeScheduler {
    pub fn new(limits: Limits, seed: u64) -> Self {
        Self {
            limits,
            scalar: Cadence::SCALAR,
            parallel: Cadence::PARALLEL,
            cancel: CancelToken::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &NoiseConfig, seed: u64) -> Self {
        Self::new(Limits::from_config(config), seed)
            .with_cadence(
                BackendKind::Scalar,
                Cadence::SCALAR.with_override(&config.cadence.scalar),
            )
            .with_cadence(
                BackendKind::Parallel,
                Cadence::PARALLEL.with_override(&config.cadence.parallel),
            )
    }

    pub fn with_cadence(mut self, kind: BackendKind, cadence: Cadence) -> Self {
        match kind {
            BackendKind::Scalar => self.scalar = cadence,
            BackendKind::Parallel => self.parallel = cadence,
        }
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cadence(&self, kind: BackendKind) -> Cadence {
        match kind {
            BackendKind::Scalar => self.scalar,
            BackendKind::Parallel => self.parallel,
        }
    }

    /// Validates the request and prepares a job. Nothing is rendered or
    /// written until the first [`TileJob::step`].
    pub fn start<B, S>(
        &self,
        request: RunRequest,
        backend: &B,
        surface: &S,
    ) -> Result<TileJob, SchedulerError>
    where
        B: Backend + ?Sized,
        S: DrawingSurface + ?Sized,
    {
        let frame = request.frame;
        frame.check_limit(self.limits.max_pixels)?;
        let regions = frame.regions(request.tile_size)?;

        let (surface_width, surface_height) = surface.dimensions();
        if (surface_width, surface_height) != (frame.width(), frame.height()) {
            return Err(SchedulerError::SurfaceMismatch {
                width: frame.width(),
                height: frame.height(),
                surface_width,
                surface_height,
            });
        }

        let kind = backend.kind();
        let cadence = self.cadence(kind);
        if cadence.report_every == 0 {
            return Err(SchedulerError::InvalidDimension {
                name: "report_every",
            });
        }
        if cadence.yield_every == 0 {
            return Err(SchedulerError::InvalidDimension {
                name: "yield_every",
            });
        }

        let total_tiles = tile_count(frame.width(), frame.height(), request.tile_size);
        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            tile_size = request.tile_size,
            budget = request.budget,
            total_tiles,
            backend = %kind,
            origin = ?backend.origin(),
            "prepared tiled synthesis run"
        );

        Ok(TileJob {
            backend: kind,
            origin: backend.origin(),
            frame,
            regions,
            budget: request.budget,
            total_tiles,
            completed: 0,
            yields: 0,
            cadence,
            cancel: self.cancel.clone(),
            state: RunState::Idle,
            reason: None,
        })
    }

    /// Runs a whole request, suspending for one executor tick at every
    /// yield point.
    pub async fn run<B, S, P>(
        &mut self,
        request: RunRequest,
        backend: &mut B,
        surface: &mut S,
        progress: &mut P,
    ) -> Result<RunReport, SchedulerError>
    where
        B: Backend + ?Sized,
        S: DrawingSurface + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let mut job = self.start(request, &*backend, &*surface)?;
        loop {
            match job.step(&mut self.rng, &mut *backend, &mut *surface, &mut *progress)? {
                Step::Yield => yield_now().await,
                Step::Done(report) => return Ok(report),
            }
        }
    }

    /// Drives [`run`](Self::run) on the calling thread.
    pub fn run_blocking<B, S, P>(
        &mut self,
        request: RunRequest,
        backend: &mut B,
        surface: &mut S,
        progress: &mut P,
    ) -> Result<RunReport, SchedulerError>
    where
        B: Backend + ?Sized,
        S: DrawingSurface + ?Sized,
        P: ProgressSink + ?Sized,
    {
        pollster::block_on(self.run(request, backend, surface, progress))
    }

    /// Generator the seeds are drawn from, for hosts driving
    /// [`TileJob::step`] themselves.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

pub struct TileJob {
    backend: BackendKind,
    origin: Origin,
    frame: Frame,
    regions: Regions,
    budget: u64,
    total_tiles: u64,
    completed: u64,
    yields: u64,
    cadence: Cadence,
    cancel: CancelToken,
    state: RunState,
    reason: Option<StopReason>,
}

impl TileJob {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn total_tiles(&self) -> u64 {
        self.total_tiles
    }

    /// Renders tiles until the next yield point or the end of the run.
    ///
    /// The cancel token is checked on entry, i.e. every time the job resumes.
    /// Once finished, further calls return the same report without emitting
    /// it again. An error aborts the job with [`StopReason::Failed`]; tiles
    /// already written stay written.
    pub fn step<R, B, S, P>(
        &mut self,
        rng: &mut R,
        backend: &mut B,
        surface: &mut S,
        progress: &mut P,
    ) -> Result<Step, SchedulerError>
    where
        R: Rng + ?Sized,
        B: Backend + ?Sized,
        S: DrawingSurface + ?Sized,
        P: ProgressSink + ?Sized,
    {
        match self.state {
            RunState::Completed | RunState::Aborted => {
                let reason = self.reason.unwrap_or(StopReason::Failed);
                return Ok(Step::Done(self.report(reason)));
            }
            RunState::Idle => self.state = RunState::Running,
            RunState::Running => {}
        }

        if self.cancel.is_cancelled() {
            tracing::debug!(completed = self.completed, "run cancelled at yield point");
            return Ok(Step::Done(self.finish(
                RunState::Aborted,
                StopReason::Cancelled,
                progress,
            )));
        }

        while self.completed < self.budget {
            let Some(tile) = self.regions.next() else {
                break;
            };

            if let Err(err) = self.render_tile(tile, rng, backend, surface) {
                self.state = RunState::Aborted;
                self.reason = Some(StopReason::Failed);
                return Err(err);
            }

            self.completed += 1;
            if self.completed % self.cadence.report_every == 0 {
                progress.report(&ProgressEvent::Tiles {
                    backend: self.backend,
                    completed: self.completed,
                });
            }
            if self.completed % self.cadence.yield_every == 0 {
                self.yields += 1;
                return Ok(Step::Yield);
            }
        }

        let reason = if self.completed == self.total_tiles {
            StopReason::FrameExhausted
        } else {
            StopReason::BudgetExhausted
        };
        Ok(Step::Done(self.finish(RunState::Completed, reason, progress)))
    }

    fn render_tile<R, B, S>(
        &self,
        tile: Tile,
        rng: &mut R,
        backend: &mut B,
        surface: &mut S,
    ) -> Result<(), SchedulerError>
    where
        R: Rng + ?Sized,
        B: Backend + ?Sized,
        S: DrawingSurface + ?Sized,
    {
        let mut pixels = backend.render_region(tile, Seed::draw(rng))?;
        check_extent(&pixels, tile)?;

        let y = match self.origin {
            Origin::TopLeft => tile.y,
            Origin::BottomLeft => {
                pixels.flip_rows();
                self.frame.height() - tile.y - tile.h
            }
        };
        surface.put_pixels(tile.x, y, &pixels)
    }

    fn finish<P>(&mut self, state: RunState, reason: StopReason, progress: &mut P) -> RunReport
    where
        P: ProgressSink + ?Sized,
    {
        self.state = state;
        self.reason = Some(reason);
        let report = self.report(reason);
        progress.report(&ProgressEvent::Finished(report.clone()));
        report
    }

    fn report(&self, reason: StopReason) -> RunReport {
        RunReport {
            backend: self.backend,
            completed: self.completed,
            total_tiles: self.total_tiles,
            yields: self.yields,
            state: self.state,
            reason,
        }
    }
}

fn check_extent(pixels: &PixelBuffer, tile: Tile) -> Result<(), SchedulerError> {
    if pixels.width() != tile.w || pixels.height() != tile.h {
        return Err(SchedulerError::BufferMismatch {
            width: tile.w,
            height: tile.h,
            expected: tile.w as usize * tile.h as usize * CHANNELS,
            actual: pixels.data().len(),
        });
    }
    Ok(())
}

/// Suspends the current task for exactly one poll of its executor.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
