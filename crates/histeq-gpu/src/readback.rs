//! Blocking device → host transfers.

use std::sync::mpsc;

use crate::buffers::DeviceBuffer;
use crate::context::GpuContext;
use crate::error::GpuError;

/// Append a copy of `source` to `encoder`, submit it, and block until the
/// staged contents are readable. Returns `source.len()` elements.
///
/// Because the queue is in-order, this waits for every previously recorded
/// command in `encoder` as well.
pub fn download(
    context: &GpuContext,
    mut encoder: wgpu::CommandEncoder,
    source: &DeviceBuffer,
) -> Result<Vec<u32>, GpuError> {
    let device = context.device();
    let size = source.byte_size();
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("histeq_readback_staging"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    encoder.copy_buffer_to_buffer(source.raw(), 0, &staging, 0, size);
    context.queue().submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::PollType::wait_indefinitely())?;
    receiver.recv().map_err(|_| GpuError::ReadbackAborted)??;

    let data = slice.get_mapped_range();
    let mut values: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    values.truncate(source.len() as usize);
    tracing::trace!(buffer = source.label(), elements = values.len(), "downloaded");
    Ok(values)
}

/// Read `source` on its own, outside any pipeline encoder.
pub fn read_buffer(context: &GpuContext, source: &DeviceBuffer) -> Result<Vec<u32>, GpuError> {
    let encoder = context
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("histeq_read_buffer_encoder"),
        });
    download(context, encoder, source)
}
