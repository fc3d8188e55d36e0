/// Adapter selection hint forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer the integrated GPU when one exists.
    Low,
    /// Prefer the discrete GPU.
    #[default]
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Options for [`crate::ParallelBackend::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelOptions {
    /// Largest tile side the backend will be asked to render. The render
    /// target and the readback buffer are sized from it once, up front.
    pub tile_size: u32,
    pub power: GpuPowerPreference,
}

impl ParallelOptions {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            power: GpuPowerPreference::default(),
        }
    }
}

/// Summary of the adapter that ended up driving the backend.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// True for CPU rasterizers such as llvmpipe or WARP.
    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_high_performance() {
        let options = ParallelOptions::new(256);
        assert_eq!(options.tile_size, 256);
        assert_eq!(options.power, GpuPowerPreference::High);
        assert_eq!(
            GpuPowerPreference::Low.to_wgpu(),
            wgpu::PowerPreference::LowPower
        );
    }
}
