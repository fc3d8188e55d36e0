use std::fmt;

use rand::prelude::*;
use serde::Serialize;

use crate::error::SchedulerError;
use crate::geometry::Tile;

pub const CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Scalar,
    Parallel,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Scalar => f.write_str("scalar"),
            BackendKind::Parallel => f.write_str("parallel"),
        }
    }
}

/// Where row zero of a backend's pixel buffers sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    TopLeft,
    /// GL-style: tile `y` counts up from the bottom edge and buffers hold the
    /// bottom row first.
    BottomLeft,
}

/// Per-call variation handed to a backend; carries no meaning beyond that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub a: f32,
    pub b: f32,
}

impl Seed {
    pub const RANGE: f32 = 1000.0;

    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            a: rng.gen_range(0.0..Self::RANGE),
            b: rng.gen_range(0.0..Self::RANGE),
        }
    }

    pub fn to_bits(self) -> u64 {
        (u64::from(self.a.to_bits()) << 32) | u64::from(self.b.to_bits())
    }
}

/// Row-major RGBA8 pixels for exactly one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SchedulerError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(SchedulerError::BufferMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Opaque black buffer.
    pub fn opaque(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * CHANNELS];
        for pixel in data.chunks_exact_mut(CHANNELS) {
            pixel[3] = u8::MAX;
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.row_bytes().max(1))
    }

    pub fn is_opaque(&self) -> bool {
        self.data
            .chunks_exact(CHANNELS)
            .all(|pixel| pixel[3] == u8::MAX)
    }

    pub fn flip_rows(&mut self) {
        let row_bytes = self.row_bytes();
        let rows = self.height as usize;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (head, tail) = self.data.split_at_mut(bottom * row_bytes);
            head[top * row_bytes..(top + 1) * row_bytes].swap_with_slice(&mut tail[..row_bytes]);
        }
    }
}

/// Pixel synthesis strategy driven by the scheduler one tile at a time.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn origin(&self) -> Origin {
        Origin::TopLeft
    }

    fn render_region(&mut self, tile: Tile, seed: Seed) -> Result<PixelBuffer, SchedulerError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn origin(&self) -> Origin {
        (**self).origin()
    }

    fn render_region(&mut self, tile: Tile, seed: Seed) -> Result<PixelBuffer, SchedulerError> {
        (**self).render_region(tile, seed)
    }
}

/// Fills every channel byte on the CPU from a generator seeded per tile.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarBackend;

impl ScalarBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for ScalarBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Scalar
    }

    fn render_region(&mut self, tile: Tile, seed: Seed) -> Result<PixelBuffer, SchedulerError> {
        let mut rng = StdRng::seed_from_u64(seed.to_bits());
        let mut data = vec![0u8; tile.w as usize * tile.h as usize * CHANNELS];
        for pixel in data.chunks_exact_mut(CHANNELS) {
            pixel[0] = rng.gen();
            pixel[1] = rng.gen();
            pixel[2] = rng.gen();
            pixel[3] = u8::MAX;
        }
        PixelBuffer::from_rgba(tile.w, tile.h, data)
    }
}
