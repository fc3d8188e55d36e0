//! Headless wgpu plumbing for the parallel backend.
//!
//! - `context` acquires the adapter and device without any surface.
//! - `pipeline` compiles the noise shaders into one render pipeline and owns
//!   the uniform buffer it reads.
//! - `uniforms` mirrors the shader's uniform block.
//! - `target` owns the tile-sized render target and the readback buffer.
//!
//! All GPU memory is allocated once at start-up and sized by the tile, so a
//! frame of any size renders in constant device memory.

mod context;
mod pipeline;
mod target;
mod uniforms;

pub(crate) use context::{probe_adapter, GpuContext};
pub(crate) use pipeline::NoisePipeline;
pub(crate) use target::TileTarget;
pub(crate) use uniforms::NoiseUniforms;
