//! Tiled noise synthesis scheduler.
//!
//! A frame is cut into tiles by [`Regions`], each tile is rendered by a
//! [`Backend`] and written to a [`DrawingSurface`], and the whole run is
//! sliced so the host gets control back at fixed intervals:
//!
//! ```text
//!   NoiseConfig ──▶ Limits (capability) ──▶ CooperativeScheduler::start
//!                                                   │ TileJob
//!                                                   ▼
//!     Regions ──tile──▶ Backend::render_region ──PixelBuffer──▶ DrawingSurface
//!                                                   │
//!                              every N tiles ──▶ ProgressSink / yield to host
//! ```
//!
//! Only one tile's pixels are alive at a time, whatever the frame size.

mod backend;
mod capability;
mod error;
mod geometry;
mod progress;
mod run;
mod surface;

pub use backend::{Backend, BackendKind, Origin, PixelBuffer, ScalarBackend, Seed, CHANNELS};
pub use capability::{
    clamp_side, pick_tile, HostHints, Limits, DEFAULT_MAX_PIXELS, DEFAULT_MEMORY_GB,
    DEFAULT_SIDE, MAX_SIDE, MIN_SIDE,
};
pub use error::SchedulerError;
pub use geometry::{tile_count, Frame, Regions, Tile};
pub use progress::{LogProgress, PercentProgress, ProgressEvent, ProgressSink};
pub use run::{
    yield_now, Cadence, CancelToken, CooperativeScheduler, RunReport, RunRequest, RunState, Step,
    StopReason, TileJob, YieldNow,
};
pub use surface::{Canvas, DrawingSurface};
