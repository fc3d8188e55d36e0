use anyhow::{anyhow, Result};

/// Linear RGBA8, so shader outputs land in the buffer unconverted.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BYTES_PER_PIXEL: u32 = 4;

/// One tile-sized render target plus the mappable buffer its pixels are
/// copied into.
pub(crate) struct TileTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
    side: u32,
}

impl TileTarget {
    pub fn new(device: &wgpu::Device, side: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile target"),
            size: wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bytes_per_row = padded_row_bytes(side);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tile readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(side),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            texture,
            view,
            readback,
            padded_bytes_per_row,
            side,
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Records a copy of the top-left `width` x `height` texels into the
    /// readback buffer.
    pub fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder, width: u32, height: u32) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Maps the readback buffer and returns tightly packed rows, bottom row
    /// first.
    pub fn read_bottom_up(&self, device: &wgpu::Device, width: u32, height: u32) -> Result<Vec<u8>> {
        let used = u64::from(self.padded_bytes_per_row) * u64::from(height);
        let slice = self.readback.slice(..used);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("wgpu poll failed: {err:?}"))?;
        rx.recv()
            .map_err(|_| anyhow!("readback channel closed"))?
            .map_err(|err| anyhow!("readback map failed: {err:?}"))?;

        let mapped = slice.get_mapped_range();
        let out = unpad_rows_reversed(
            &mapped,
            self.padded_bytes_per_row as usize,
            (width * BYTES_PER_PIXEL) as usize,
            height as usize,
        );
        drop(mapped);
        self.readback.unmap();
        Ok(out)
    }
}

fn padded_row_bytes(width: u32) -> u32 {
    align_to(width * BYTES_PER_PIXEL, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn unpad_rows_reversed(padded: &[u8], padded_row: usize, row: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(row * height);
    for index in (0..height).rev() {
        let start = index * padded_row;
        out.extend_from_slice(&padded[start..start + row]);
    }
    out
}
