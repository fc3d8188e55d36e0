use bytemuck::{Pod, Zeroable};
use scheduler::{Seed, Tile};

/// Host copy of the `NoiseParams` block in the fragment shader.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NoiseUniforms {
    pub seed: [f32; 2],
    pub origin: [f32; 2],
    pub extent: [f32; 2],
    pub padding: [f32; 2],
}

unsafe impl Zeroable for NoiseUniforms {}
unsafe impl Pod for NoiseUniforms {}

impl NoiseUniforms {
    pub fn new(tile: Tile, seed: Seed) -> Self {
        Self {
            seed: [seed.a, seed.b],
            origin: [tile.x as f32, tile.y as f32],
            extent: [tile.w as f32, tile.h as f32],
            padding: [0.0; 2],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_std140_block() {
        assert_eq!(std::mem::size_of::<NoiseUniforms>(), 32);
        assert_eq!(std::mem::align_of::<NoiseUniforms>(), 16);
    }

    #[test]
    fn fields_come_from_tile_and_seed() {
        let uniforms = NoiseUniforms::new(
            Tile {
                x: 64,
                y: 128,
                w: 32,
                h: 16,
            },
            Seed { a: 1.5, b: 2.5 },
        );
        assert_eq!(uniforms.seed, [1.5, 2.5]);
        assert_eq!(uniforms.origin, [64.0, 128.0]);
        assert_eq!(uniforms.extent, [32.0, 16.0]);
        assert_eq!(uniforms.as_bytes().len(), 32);
    }
}
