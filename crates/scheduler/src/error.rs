/// Failures surfaced by the tile scheduler and its backends.
///
/// Every variant is fatal for the current run; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("{name} must be a positive integer")]
    InvalidDimension { name: &'static str },
    #[error("frame {width}x{height} has {pixels} pixels, above the limit of {max_pixels}")]
    FrameTooLarge {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("tile render failed: {0}")]
    RenderFailed(String),
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("surface is {surface_width}x{surface_height} but the frame is {width}x{height}")]
    SurfaceMismatch {
        width: u32,
        height: u32,
        surface_width: u32,
        surface_height: u32,
    },
    #[error("{width}x{height} write at ({x}, {y}) falls outside the {surface_width}x{surface_height} surface")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        surface_width: u32,
        surface_height: u32,
    },
}

impl SchedulerError {
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }
}
