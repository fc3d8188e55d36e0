use anyhow::{Context as AnyhowContext, Result};

use crate::types::{AdapterProfile, GpuPowerPreference};

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    /// Opens a device able to hold a `tile_size` x `tile_size` render target.
    pub(crate) fn new(gpu_power: GpuPowerPreference, tile_size: u32) -> Result<Self> {
        let instance = create_instance();
        let adapter = request_adapter(&instance, gpu_power)?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter_info, &limits);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if tile_size > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested tile is {tile_size}x{tile_size}"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tilenoise device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::error!(%err, "uncaptured GPU error");
        }));

        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_profile,
        })
    }
}

/// Looks for an adapter without opening a device.
pub(crate) fn probe_adapter(gpu_power: GpuPowerPreference) -> Option<AdapterProfile> {
    let instance = create_instance();
    match request_adapter(&instance, gpu_power) {
        Ok(adapter) => Some(AdapterProfile::from_wgpu(
            &adapter.get_info(),
            &adapter.limits(),
        )),
        Err(err) => {
            tracing::debug!(error = %err, "no GPU adapter");
            None
        }
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_adapter(instance: &wgpu::Instance, gpu_power: GpuPowerPreference) -> Result<wgpu::Adapter> {
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: gpu_power.to_wgpu(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .context("failed to find a suitable GPU adapter")
}
