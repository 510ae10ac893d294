//! wgpu device bootstrap.
//!
//! The pipeline itself never enumerates adapters; it is handed a
//! [`GpuContext`] created here.

use crate::error::GpuError;

/// Environment variable selecting the adapter power preference (`low` or `high`).
pub const POWER_PREFERENCE_ENV: &str = "HISTEQ_POWER_PREFERENCE";

/// A device, its queue, and the identity of the adapter behind them.
#[derive(Clone)]
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    fn new(device: wgpu::Device, queue: wgpu::Queue, adapter_info: wgpu::AdapterInfo) -> Self {
        Self {
            device,
            queue,
            adapter_info,
        }
    }

    /// Request an adapter and a device with the adapter's full limits.
    pub async fn create(power_preference: wgpu::PowerPreference) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let adapter_info = adapter.get_info();

        // Large images need storage bindings beyond the 128 MiB default.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("histeq_device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await?;

        tracing::debug!(adapter = %describe(&adapter_info), "GPU device created");
        Ok(Self::new(device, queue, adapter_info))
    }

    /// Blocking [`create`](Self::create) using the preference from the environment.
    pub fn create_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::create(power_preference_from_env()))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Human-readable adapter identity, e.g. `NVIDIA GeForce RTX 3080 (DiscreteGpu, Vulkan)`.
    pub fn describe(&self) -> String {
        describe(&self.adapter_info)
    }

    /// Largest storage buffer binding the device accepts, in bytes.
    pub fn max_storage_binding(&self) -> u64 {
        u64::from(self.device.limits().max_storage_buffer_binding_size)
    }
}

fn describe(info: &wgpu::AdapterInfo) -> String {
    format!("{} ({:?}, {:?})", info.name, info.device_type, info.backend)
}

/// Read [`POWER_PREFERENCE_ENV`]; anything but `low` means high performance.
pub fn power_preference_from_env() -> wgpu::PowerPreference {
    parse_power_preference(std::env::var(POWER_PREFERENCE_ENV).ok().as_deref())
}

fn parse_power_preference(value: Option<&str>) -> wgpu::PowerPreference {
    match value.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("low") => wgpu::PowerPreference::LowPower,
        _ => wgpu::PowerPreference::HighPerformance,
    }
}
