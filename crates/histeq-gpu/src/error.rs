use histeq_core::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("kernel `{kernel}` failed to build:\n{log}")]
    ShaderBuild { kernel: &'static str, log: String },
    #[error("GPU validation error during {operation}: {message}")]
    Validation {
        operation: &'static str,
        message: String,
    },
    #[error("GPU out of memory during {operation}: {message}")]
    OutOfMemory {
        operation: &'static str,
        message: String,
    },
    #[error("buffer `{label}` needs {bytes} bytes but the device allows {limit}")]
    BufferTooLarge {
        label: &'static str,
        bytes: u64,
        limit: u64,
    },
    #[error("failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("readback callback dropped before the buffer was mapped")]
    ReadbackAborted,
}
