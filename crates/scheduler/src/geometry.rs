//! Frame and tile geometry.
//!
//! [`Regions`] walks a frame row-major in `tile_size` steps and clips the last
//! tile of every row and column to the frame edge. It holds no state beyond
//! its cursor, so a clone taken before iteration replays the same sequence.

use crate::error::SchedulerError;

/// Pixel dimensions of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Result<Self, SchedulerError> {
        if width == 0 {
            return Err(SchedulerError::InvalidDimension { name: "width" });
        }
        if height == 0 {
            return Err(SchedulerError::InvalidDimension { name: "height" });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn check_limit(&self, max_pixels: u64) -> Result<(), SchedulerError> {
        let pixels = self.pixel_count();
        if pixels > max_pixels {
            return Err(SchedulerError::FrameTooLarge {
                width: self.width,
                height: self.height,
                pixels,
                max_pixels,
            });
        }
        Ok(())
    }

    pub fn regions(&self, tile_size: u32) -> Result<Regions, SchedulerError> {
        Regions::new(self.width, self.height, tile_size)
    }
}

/// Rectangle of the frame rendered as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Tile {
    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
}

/// Number of tiles [`Regions`] yields for the given geometry.
pub fn tile_count(width: u32, height: u32, tile_size: u32) -> u64 {
    if width == 0 || height == 0 || tile_size == 0 {
        return 0;
    }
    u64::from(height.div_ceil(tile_size)) * u64::from(width.div_ceil(tile_size))
}

#[derive(Debug, Clone)]
pub struct Regions {
    width: u32,
    height: u32,
    tile_size: u32,
    x: u32,
    y: u32,
    remaining: u64,
}

impl Regions {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<Self, SchedulerError> {
        if width == 0 {
            return Err(SchedulerError::InvalidDimension { name: "width" });
        }
        if height == 0 {
            return Err(SchedulerError::InvalidDimension { name: "height" });
        }
        if tile_size == 0 {
            return Err(SchedulerError::InvalidDimension { name: "tile_size" });
        }
        Ok(Self {
            width,
            height,
            tile_size,
            x: 0,
            y: 0,
            remaining: tile_count(width, height, tile_size),
        })
    }

    /// Fresh iterator over the same geometry, regardless of this cursor.
    pub fn restart(&self) -> Self {
        Self {
            x: 0,
            y: 0,
            remaining: tile_count(self.width, self.height, self.tile_size),
            ..*self
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }
}

impl Iterator for Regions {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.remaining == 0 {
            return None;
        }

        let tile = Tile {
            x: self.x,
            y: self.y,
            w: self.tile_size.min(self.width - self.x),
            h: self.tile_size.min(self.height - self.y),
        };

        // Step with the clipped extent so a cursor never passes u32::MAX.
        if self.width - self.x > self.tile_size {
            self.x += self.tile_size;
        } else {
            self.x = 0;
            self.y += tile.h;
        }
        self.remaining -= 1;
        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Regions {}

impl std::iter::FusedIterator for Regions {}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(width: u32, height: u32, tile_size: u32) -> Vec<u8> {
        let mut hits = vec![0u8; (width * height) as usize];
        for tile in Regions::new(width, height, tile_size).unwrap() {
            assert!(tile.right() <= width && tile.bottom() <= height);
            for y in tile.y..tile.bottom() {
                for x in tile.x..tile.right() {
                    hits[(y * width + x) as usize] += 1;
                }
            }
        }
        hits
    }

    #[test]
    fn tiles_cover_frame_exactly_once() {
        for (w, h, t) in [(256, 256, 64), (100, 37, 64), (1, 1, 1), (7, 13, 3), (5, 5, 9)] {
            let hits = coverage(w, h, t);
            assert!(
                hits.iter().all(|&count| count == 1),
                "{w}x{h} tile {t} has gaps or overlaps"
            );
            let area: u64 = Regions::new(w, h, t).unwrap().map(|tile| tile.area()).sum();
            assert_eq!(area, Frame::new(w, h).unwrap().pixel_count());
        }
    }

    #[test]
    fn sequence_length_matches_ceil_product() {
        for (w, h, t) in [(256, 256, 64), (100, 37, 64), (7, 13, 3), (1000, 1, 7)] {
            let regions = Regions::new(w, h, t).unwrap();
            let expected = tile_count(w, h, t);
            assert_eq!(regions.len() as u64, expected);
            assert_eq!(regions.count() as u64, expected);
        }
        assert_eq!(tile_count(256, 256, 64), 16);
        assert_eq!(tile_count(100, 100, 64), 4);
    }

    #[test]
    fn order_is_row_major() {
        let tiles: Vec<_> = Regions::new(4, 4, 2).unwrap().collect();
        let origins: Vec<_> = tiles.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(origins, vec![(0, 0), (2, 0), (0, 2), (2, 2)]);
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let tiles: Vec<_> = Regions::new(100, 100, 64).unwrap().collect();
        assert_eq!(
            tiles,
            vec![
                Tile { x: 0, y: 0, w: 64, h: 64 },
                Tile { x: 64, y: 0, w: 36, h: 64 },
                Tile { x: 0, y: 64, w: 64, h: 36 },
                Tile { x: 64, y: 64, w: 36, h: 36 },
            ]
        );
    }

    #[test]
    fn restart_replays_identical_sequence() {
        let mut regions = Regions::new(130, 70, 32).unwrap();
        let snapshot = regions.clone();
        let first: Vec<_> = regions.by_ref().take(3).collect();
        let replay: Vec<_> = regions.restart().collect();
        let again: Vec<_> = snapshot.collect();
        assert_eq!(replay, again);
        assert_eq!(&replay[..3], &first[..]);
        assert_eq!(regions.len(), replay.len() - 3);
    }

    #[test]
    fn large_frames_do_not_overflow_cursor() {
        let regions = Regions::new(u32::MAX, 1, u32::MAX / 2 + 1).unwrap();
        let tiles: Vec<_> = regions.collect();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[1].right(), u32::MAX);
    }

    #[test]
    fn zero_arguments_are_rejected() {
        assert!(matches!(
            Regions::new(0, 10, 4),
            Err(SchedulerError::InvalidDimension { name: "width" })
        ));
        assert!(matches!(
            Regions::new(10, 0, 4),
            Err(SchedulerError::InvalidDimension { name: "height" })
        ));
        assert!(matches!(
            Regions::new(10, 10, 0),
            Err(SchedulerError::InvalidDimension { name: "tile_size" })
        ));
        assert!(Frame::new(0, 1).is_err());
    }

    #[test]
    fn frame_limit_is_inclusive() {
        let frame = Frame::new(20000, 20000).unwrap();
        assert!(frame.check_limit(400_000_000).is_ok());
        assert!(matches!(
            frame.check_limit(399_999_999),
            Err(SchedulerError::FrameTooLarge { pixels: 400_000_000, .. })
        ));
    }
}
