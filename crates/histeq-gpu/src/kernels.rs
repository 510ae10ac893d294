//! Compute kernels: shader compilation, bind group layouts, and dispatch.

use std::num::NonZeroU64;

use crate::error::GpuError;

/// Invocations per workgroup in every kernel.
pub const WORKGROUP_SIZE: u32 = 256;

/// Per-dimension workgroup count limit guaranteed by wgpu's default limits.
const MAX_GROUPS_PER_DIMENSION: u32 = 65535;

/// Workgroup grid covering `invocations` threads of [`WORKGROUP_SIZE`].
///
/// Grids that would exceed the per-dimension limit spill into `y`; shaders
/// flatten `(x, y)` back into a linear index and ignore the overhang.
pub fn dispatch_grid(invocations: u32) -> [u32; 3] {
    let groups = invocations.div_ceil(WORKGROUP_SIZE).max(1);
    if groups <= MAX_GROUPS_PER_DIMENSION {
        [groups, 1, 1]
    } else {
        [
            MAX_GROUPS_PER_DIMENSION,
            groups.div_ceil(MAX_GROUPS_PER_DIMENSION),
            1,
        ]
    }
}

/// A compiled compute pipeline and its bind group layout.
pub struct Kernel {
    name: &'static str,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl Kernel {
    /// Record one dispatch. `buffers` are bound to bindings `0..n` in order.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &[&wgpu::Buffer],
        grid: [u32; 3],
    ) {
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("histeq_{}_bg", self.name)),
            layout: &self.layout,
            entries: &entries,
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&format!("histeq_{}_pass", self.name)),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid[0], grid[1], grid[2]);
    }
}

/// Every kernel the pipeline dispatches.
pub struct Kernels {
    pub forward_convert: Kernel,
    pub inverse_convert: Kernel,
    /// Workgroup-privatized histogram; only valid for 256 levels.
    pub histogram_local: Kernel,
    pub histogram_global: Kernel,
    pub normalize_cdf: Kernel,
    pub lookup: Kernel,
}

impl Kernels {
    /// Compile all shaders. With `diagnostics`, compiler messages are logged even on success.
    pub fn new(device: &wgpu::Device, diagnostics: bool) -> Result<Self, GpuError> {
        let convert_entries = [storage_ro_entry(0), storage_rw_entry(1), uniform_entry(2)];

        let forward_convert = build_kernel(
            device,
            "forward_convert",
            include_str!("../shaders/forward_convert.wgsl"),
            &["forward_convert"],
            &convert_entries,
            diagnostics,
        )?
        .remove(0);

        let inverse_convert = build_kernel(
            device,
            "inverse_convert",
            include_str!("../shaders/inverse_convert.wgsl"),
            &["inverse_convert"],
            &convert_entries,
            diagnostics,
        )?
        .remove(0);

        let mut histogram = build_kernel(
            device,
            "histogram",
            include_str!("../shaders/histogram.wgsl"),
            &["histogram_local", "histogram_global"],
            &convert_entries,
            diagnostics,
        )?;
        let histogram_global = histogram.remove(1);
        let histogram_local = histogram.remove(0);

        let normalize_cdf = build_kernel(
            device,
            "cdf",
            include_str!("../shaders/cdf.wgsl"),
            &["normalize_cdf"],
            &convert_entries,
            diagnostics,
        )?
        .remove(0);

        let lookup = build_kernel(
            device,
            "lookup",
            include_str!("../shaders/lookup.wgsl"),
            &["lookup"],
            &[
                storage_ro_entry(0),
                storage_ro_entry(1),
                storage_rw_entry(2),
                uniform_entry(3),
            ],
            diagnostics,
        )?
        .remove(0);

        Ok(Self {
            forward_convert,
            inverse_convert,
            histogram_local,
            histogram_global,
            normalize_cdf,
            lookup,
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn storage_ro_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(4),
        },
        count: None,
    }
}

fn storage_rw_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(4),
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(16),
        },
        count: None,
    }
}

/// Compile `wgsl_source` and build one pipeline per entry point, sharing a layout.
fn build_kernel(
    device: &wgpu::Device,
    name: &'static str,
    wgsl_source: &str,
    entry_points: &[&'static str],
    layout_entries: &[wgpu::BindGroupLayoutEntry],
    diagnostics: bool,
) -> Result<Vec<Kernel>, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("histeq_{name}_shader")),
        source: wgpu::ShaderSource::Wgsl(wgsl_source.into()),
    });
    let info = pollster::block_on(shader.get_compilation_info());

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("histeq_{name}_layout")),
        entries: layout_entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("histeq_{name}_pipeline_layout")),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let kernels = entry_points
        .iter()
        .map(|&entry_point| Kernel {
            name: entry_point,
            pipeline: device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&format!("histeq_{entry_point}_pipeline")),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            }),
            layout: bind_group_layout.clone(),
        })
        .collect();

    let error = pollster::block_on(device.pop_error_scope());
    let log = format_compilation_log(&info);

    if let Some(error) = error {
        let log = if log.is_empty() {
            error.to_string()
        } else {
            format!("{log}\n{error}")
        };
        return Err(GpuError::ShaderBuild { kernel: name, log });
    }
    if !log.is_empty() {
        tracing::warn!(kernel = name, "shader compiled with messages:\n{log}");
    } else if diagnostics {
        tracing::info!(kernel = name, entry_points = ?entry_points, "shader built cleanly");
    }
    Ok(kernels)
}

fn format_compilation_log(info: &wgpu::CompilationInfo) -> String {
    info.messages
        .iter()
        .map(|msg| match &msg.location {
            Some(loc) => format!(
                "{:?} at {}:{}: {}",
                msg.message_type, loc.line_number, loc.line_position, msg.message
            ),
            None => format!("{:?}: {}", msg.message_type, msg.message),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_grid_small() {
        assert_eq!(dispatch_grid(0), [1, 1, 1]);
        assert_eq!(dispatch_grid(1), [1, 1, 1]);
        assert_eq!(dispatch_grid(256), [1, 1, 1]);
        assert_eq!(dispatch_grid(257), [2, 1, 1]);
    }

    #[test]
    fn test_dispatch_grid_spills_into_y() {
        let invocations = 65535 * 256 + 1;
        let [x, y, z] = dispatch_grid(invocations);
        assert_eq!((x, y, z), (65535, 2, 1));
        assert!(u64::from(x) * u64::from(y) * 256 >= u64::from(invocations));
    }

    #[test]
    fn test_dispatch_grid_covers_large_images() {
        // 8K RGB pixel count.
        let invocations = 7680 * 4320;
        let [x, y, _] = dispatch_grid(invocations);
        assert!(x <= 65535 && y <= 65535);
        assert!(u64::from(x) * u64::from(y) * 256 >= u64::from(invocations));
    }
}
