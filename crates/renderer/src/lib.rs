//! GPU tile backend for the noise scheduler.
//!
//! [`ParallelBackend`] renders each tile with a fragment shader into a
//! tile-sized offscreen texture and reads the pixels back:
//!
//! ```text
//!   Tile + Seed ──▶ NoiseUniforms ──▶ render pass (viewport = tile extent)
//!                                           │
//!                                           ▼
//!                    copy_texture_to_buffer ──▶ map readback ──▶ PixelBuffer
//! ```
//!
//! The backend speaks GL conventions: tiles are addressed from the bottom-left
//! corner of the frame and the returned rows run bottom to top. The scheduler
//! flips them back when writing to the surface.

mod compile;
mod gpu;
mod types;

use anyhow::Result;
use scheduler::{Backend, BackendKind, Origin, PixelBuffer, SchedulerError, Seed, Tile};

use gpu::{GpuContext, NoisePipeline, NoiseUniforms, TileTarget};

pub use types::{AdapterProfile, GpuPowerPreference, ParallelOptions};

/// Returns true when wgpu can find an adapter on this host.
pub fn gpu_available() -> bool {
    gpu::probe_adapter(GpuPowerPreference::default()).is_some()
}

pub struct ParallelBackend {
    context: GpuContext,
    pipeline: NoisePipeline,
    target: TileTarget,
}

impl ParallelBackend {
    /// Acquires a device and compiles the noise pipeline.
    ///
    /// Any failure on the way, including a missing adapter or a shader that
    /// does not compile, is reported as [`SchedulerError::BackendUnavailable`].
    pub fn new(options: ParallelOptions) -> Result<Self, SchedulerError> {
        if options.tile_size == 0 {
            return Err(SchedulerError::InvalidDimension { name: "tile_size" });
        }
        Self::init(options).map_err(|err| SchedulerError::backend_unavailable(format!("{err:#}")))
    }

    fn init(options: ParallelOptions) -> Result<Self> {
        let context = GpuContext::new(options.power, options.tile_size)?;
        let pipeline = NoisePipeline::new(&context.device)?;
        let target = TileTarget::new(&context.device, options.tile_size);
        tracing::info!(
            adapter = %context.adapter_profile.name,
            tile_size = options.tile_size,
            "parallel backend ready"
        );
        Ok(Self {
            context,
            pipeline,
            target,
        })
    }

    pub fn adapter(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    fn draw(&self, tile: Tile, seed: Seed) -> Result<Vec<u8>> {
        let device = &self.context.device;
        let queue = &self.context.queue;
        queue.write_buffer(
            &self.pipeline.uniform_buffer,
            0,
            NoiseUniforms::new(tile, seed).as_bytes(),
        );

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tile encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tile pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_viewport(0.0, 0.0, tile.w as f32, tile.h as f32, 0.0, 1.0);
            pass.set_scissor_rect(0, 0, tile.w, tile.h);
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.pipeline.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.target.encode_copy(&mut encoder, tile.w, tile.h);
        queue.submit(Some(encoder.finish()));
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("{err}");
        }

        self.target.read_bottom_up(device, tile.w, tile.h)
    }
}

impl Backend for ParallelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Parallel
    }

    fn origin(&self) -> Origin {
        Origin::BottomLeft
    }

    fn render_region(&mut self, tile: Tile, seed: Seed) -> Result<PixelBuffer, SchedulerError> {
        let side = self.target.side();
        if tile.w > side || tile.h > side {
            return Err(SchedulerError::render_failed(format!(
                "{}x{} tile does not fit the {side}x{side} render target",
                tile.w, tile.h
            )));
        }
        let data = self
            .draw(tile, seed)
            .map_err(|err| SchedulerError::render_failed(format!("{err:#}")))?;
        PixelBuffer::from_rgba(tile.w, tile.h, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler::{
        Canvas, CooperativeScheduler, Frame, Limits, ProgressEvent, RunRequest, RunState,
    };

    fn backend(tile_size: u32) -> Option<ParallelBackend> {
        if !gpu_available() {
            eprintln!("skipping: no GPU adapter");
            return None;
        }
        Some(ParallelBackend::new(ParallelOptions::new(tile_size)).expect("parallel backend"))
    }

    #[test]
    fn zero_tile_size_is_rejected_before_touching_the_gpu() {
        let err = ParallelBackend::new(ParallelOptions::new(0))
            .err()
            .expect("zero tile must fail");
        assert!(matches!(
            err,
            SchedulerError::InvalidDimension { name: "tile_size" }
        ));
    }

    #[test]
    fn tiles_are_opaque_and_sized() {
        let Some(mut backend) = backend(32) else {
            return;
        };
        let tile = Tile {
            x: 0,
            y: 0,
            w: 32,
            h: 20,
        };
        let buffer = backend
            .render_region(tile, Seed { a: 1.0, b: 2.0 })
            .unwrap();
        assert_eq!((buffer.width(), buffer.height()), (32, 20));
        assert!(buffer.is_opaque());
        assert!(backend.adapter().max_texture_dimension >= 32);
    }

    #[test]
    fn same_tile_and_seed_render_identically() {
        let Some(mut backend) = backend(16) else {
            return;
        };
        let tile = Tile {
            x: 48,
            y: 16,
            w: 16,
            h: 16,
        };
        let seed = Seed { a: 7.0, b: 11.0 };
        let first = backend.render_region(tile, seed).unwrap();
        let second = backend.render_region(tile, seed).unwrap();
        assert_eq!(first.data(), second.data());
    }

    #[test]
    fn oversized_tiles_fail_without_rendering() {
        let Some(mut backend) = backend(16) else {
            return;
        };
        let err = backend
            .render_region(
                Tile {
                    x: 0,
                    y: 0,
                    w: 17,
                    h: 16,
                },
                Seed { a: 0.0, b: 0.0 },
            )
            .unwrap_err();
        assert!(matches!(err, SchedulerError::RenderFailed(_)));
    }

    #[test]
    fn scheduler_fills_the_frame() {
        let Some(mut backend) = backend(32) else {
            return;
        };
        let frame = Frame::new(80, 48).unwrap();
        let mut scheduler = CooperativeScheduler::new(
            Limits {
                tile_size: 32,
                ..Limits::default()
            },
            3,
        );
        let mut canvas = Canvas::new(80, 48);
        let mut events = Vec::new();
        let report = scheduler
            .run_blocking(
                RunRequest::whole_frame(frame, 32),
                &mut backend,
                &mut canvas,
                &mut |event: &ProgressEvent| events.push(event.clone()),
            )
            .unwrap();
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.completed, 6);
        assert!(canvas.image().pixels().all(|pixel| pixel.0[3] == u8::MAX));
        assert_eq!(events.len(), 1);
    }
}
