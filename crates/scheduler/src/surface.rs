use image::RgbaImage;

use crate::backend::{PixelBuffer, CHANNELS};
use crate::error::SchedulerError;

/// Destination the scheduler writes finished tiles into. Origin is top-left.
pub trait DrawingSurface {
    fn dimensions(&self) -> (u32, u32);

    fn put_pixels(&mut self, x: u32, y: u32, pixels: &PixelBuffer) -> Result<(), SchedulerError>;
}

/// In-memory RGBA surface. Starts fully transparent, so any write is visible
/// as a non-zero alpha.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|pixel| pixel.0[3] == 0)
    }
}

impl DrawingSurface for Canvas {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn put_pixels(&mut self, x: u32, y: u32, pixels: &PixelBuffer) -> Result<(), SchedulerError> {
        let (surface_width, surface_height) = self.image.dimensions();
        let fits = u64::from(x) + u64::from(pixels.width()) <= u64::from(surface_width)
            && u64::from(y) + u64::from(pixels.height()) <= u64::from(surface_height);
        if !fits {
            return Err(SchedulerError::OutOfBounds {
                x,
                y,
                width: pixels.width(),
                height: pixels.height(),
                surface_width,
                surface_height,
            });
        }

        let stride = surface_width as usize * CHANNELS;
        let offset = x as usize * CHANNELS;
        let raw: &mut [u8] = &mut self.image;
        for (row_index, row) in pixels.rows().enumerate() {
            let start = (y as usize + row_index) * stride + offset;
            raw[start..start + row.len()].copy_from_slice(row);
        }
        Ok(())
    }
}
