//! Device buffer management for the equalization pipeline.

use histeq_core::{BufferLayout, ColorMode};
use wgpu::util::DeviceExt;

use crate::context::GpuContext;
use crate::error::GpuError;

/// Smallest allocation; storage bindings reject zero-sized buffers.
const MIN_BUFFER_BYTES: u64 = 16;

/// A device storage buffer of `u32` elements.
///
/// The underlying allocation is destroyed when the handle drops, so every
/// exit path of a run releases its memory.
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    len: u32,
    label: &'static str,
}

impl DeviceBuffer {
    /// Allocate a zeroed storage buffer holding `len` elements.
    pub fn storage(context: &GpuContext, label: &'static str, len: u32) -> Result<Self, GpuError> {
        let bytes = (u64::from(len) * 4).max(MIN_BUFFER_BYTES);
        let limit = context.max_storage_binding();
        if bytes > limit {
            return Err(GpuError::BufferTooLarge {
                label,
                bytes,
                limit,
            });
        }
        let buffer = context.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self { buffer, len, label })
    }

    /// Create a uniform buffer initialized with `value`.
    pub fn uniform<T: bytemuck::Pod>(context: &GpuContext, label: &'static str, value: &T) -> Self {
        let buffer = context
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        Self {
            buffer,
            len: (std::mem::size_of::<T>() / 4) as u32,
            label,
        }
    }

    /// Host → device transfer of `data` at offset 0.
    pub fn write(&self, queue: &wgpu::Queue, data: &[u32]) {
        debug_assert!(data.len() <= self.len as usize, "write overruns {}", self.label);
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
    }

    /// Record a copy of the first `len` elements of `source` into the start of this buffer.
    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, source: &DeviceBuffer, len: u32) {
        debug_assert!(len <= self.len && len <= source.len);
        if len > 0 {
            encoder.copy_buffer_to_buffer(&source.buffer, 0, &self.buffer, 0, u64::from(len) * 4);
        }
    }

    /// Record a zero fill of the whole buffer.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(&self.buffer, 0, None);
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of meaningful elements (the allocation may be padded).
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Allocated size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.buffer.size()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

/// Uniform block shared by every kernel of a run. Matches `struct Params` in the shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DispatchParams {
    pub count: u32,
    pub levels: u32,
    pub channels: u32,
    pub max_level: u32,
}

impl From<&BufferLayout> for DispatchParams {
    fn from(layout: &BufferLayout) -> Self {
        Self {
            count: layout.pixel_count,
            levels: layout.levels(),
            channels: layout.channels,
            max_level: layout.max_level(),
        }
    }
}

/// Every device buffer one pipeline run touches, sized for a single layout.
pub struct PipelineBuffers {
    layout: BufferLayout,
    pub(crate) params: DeviceBuffer,
    /// Interleaved input samples.
    pub(crate) source: DeviceBuffer,
    /// Planar luma/chroma samples (color mode only).
    pub(crate) planar: Option<DeviceBuffer>,
    /// Lookup output: equalized samples (grayscale) or equalized luma (color).
    pub(crate) mapped: DeviceBuffer,
    /// Interleaved output of the inverse conversion (color mode only).
    pub(crate) output: Option<DeviceBuffer>,
    pub(crate) bins: DeviceBuffer,
    pub(crate) cdf: DeviceBuffer,
}

impl PipelineBuffers {
    /// Allocate buffers for `layout`.
    pub fn allocate(context: &GpuContext, layout: BufferLayout) -> Result<Self, GpuError> {
        let samples = layout.sample_count();
        let pixels = layout.pixel_count;
        let levels = layout.levels();
        let params = DeviceBuffer::uniform(context, "histeq_params", &DispatchParams::from(&layout));
        let source = DeviceBuffer::storage(context, "histeq_source", samples)?;
        let (planar, output) = match layout.mode {
            ColorMode::Grayscale => (None, None),
            ColorMode::Color => (
                Some(DeviceBuffer::storage(context, "histeq_planar", samples)?),
                Some(DeviceBuffer::storage(context, "histeq_output", samples)?),
            ),
        };
        let mapped = DeviceBuffer::storage(context, "histeq_mapped", pixels)?;
        let bins = DeviceBuffer::storage(context, "histeq_histogram", levels)?;
        let cdf = DeviceBuffer::storage(context, "histeq_cdf", levels)?;

        tracing::debug!(%layout, "allocated pipeline buffers");
        Ok(Self {
            layout,
            params,
            source,
            planar,
            mapped,
            output,
            bins,
            cdf,
        })
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    /// The buffer whose first `pixel_count` elements are histogrammed and mapped.
    pub(crate) fn lightness(&self) -> &DeviceBuffer {
        self.planar.as_ref().unwrap_or(&self.source)
    }

    /// The buffer holding the final interleaved samples.
    pub(crate) fn result(&self) -> &DeviceBuffer {
        self.output.as_ref().unwrap_or(&self.mapped)
    }

    /// Histogram bins buffer.
    pub fn histogram_buffer(&self) -> &DeviceBuffer {
        &self.bins
    }

    /// Normalized CDF buffer.
    pub fn cdf_buffer(&self) -> &DeviceBuffer {
        &self.cdf
    }
}
