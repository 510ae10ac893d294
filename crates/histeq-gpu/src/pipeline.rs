//! Top-level GPU equalization pipeline that orchestrates all compute passes.

use std::fmt;

use histeq_core::{Cdf, ColorMode, EqualizeConfig, Histogram, Image, Samples};

use crate::buffers::PipelineBuffers;
use crate::context::GpuContext;
use crate::error::GpuError;
use crate::kernels::{Kernels, dispatch_grid};
use crate::readback;

/// One host-issued operation on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Host → device transfer of the input samples.
    Upload,
    /// Interleaved RGB(A) → planar luma/chroma.
    ForwardConvert,
    Histogram,
    /// Prefix sum and rescale of the histogram.
    Cdf,
    /// Per-sample CDF lookup.
    Lookup,
    /// Copy the equalized luma back over the planar luma plane.
    Recombine,
    /// Planar luma/chroma → interleaved RGB(A).
    InverseConvert,
    /// Blocking device → host transfer of the result.
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::ForwardConvert => "forward-convert",
            Self::Histogram => "histogram",
            Self::Cdf => "cdf",
            Self::Lookup => "lookup",
            Self::Recombine => "recombine",
            Self::InverseConvert => "inverse-convert",
            Self::Download => "download",
        };
        f.write_str(name)
    }
}

const GRAYSCALE_PLAN: [Stage; 5] = [
    Stage::Upload,
    Stage::Histogram,
    Stage::Cdf,
    Stage::Lookup,
    Stage::Download,
];

const COLOR_PLAN: [Stage; 8] = [
    Stage::Upload,
    Stage::ForwardConvert,
    Stage::Histogram,
    Stage::Cdf,
    Stage::Lookup,
    Stage::Recombine,
    Stage::InverseConvert,
    Stage::Download,
];

/// The fixed stage sequence for `mode`. Depends on nothing else.
pub fn plan(mode: ColorMode) -> &'static [Stage] {
    match mode {
        ColorMode::Grayscale => &GRAYSCALE_PLAN,
        ColorMode::Color => &COLOR_PLAN,
    }
}

/// Output of one device run.
#[derive(Debug, Clone)]
pub struct DeviceRun {
    pub image: Image,
    /// Stages issued, in submission order.
    pub stages: Vec<Stage>,
    /// Histogram read back from the device (diagnostics only).
    pub histogram: Option<Histogram>,
    /// CDF read back from the device (diagnostics only).
    pub cdf: Option<Cdf>,
}

/// Orchestrates the device pipeline: upload → (convert) → histogram → CDF →
/// lookup → (recombine → inverse convert) → download.
pub struct Equalizer {
    context: GpuContext,
    kernels: Kernels,
    config: EqualizeConfig,
}

impl Equalizer {
    /// Compile all kernels for `context`.
    pub fn new(context: GpuContext, config: EqualizeConfig) -> Result<Self, GpuError> {
        let kernels = with_error_scope(context.device(), "kernel build", || {
            Kernels::new(context.device(), config.diagnostics)
        })?;
        tracing::debug!(adapter = %context.describe(), ?config, "equalizer ready");
        Ok(Self {
            context,
            kernels,
            config,
        })
    }

    /// Allocate buffers sized for `image` under this equalizer's configuration.
    pub fn allocate(&self, image: &Image) -> Result<PipelineBuffers, GpuError> {
        let layout = self.config.layout_for(image)?;
        PipelineBuffers::allocate(&self.context, layout)
    }

    /// Equalize `image` with freshly allocated buffers, released on return.
    pub fn run(&self, image: &Image) -> Result<DeviceRun, GpuError> {
        let buffers = self.allocate(image)?;
        self.run_with(&buffers, image)
    }

    /// Equalize `image` using caller-owned buffers.
    ///
    /// The buffers must have been allocated for exactly this image layout;
    /// anything else is rejected before a command is recorded.
    pub fn run_with(&self, buffers: &PipelineBuffers, image: &Image) -> Result<DeviceRun, GpuError> {
        let layout = self.config.layout_for(image)?;
        buffers.layout().ensure_matches(&layout)?;

        let (samples, stages) = with_error_scope(self.context.device(), "equalize", || {
            self.issue(buffers, image)
        })?;

        let (histogram, cdf) = if self.config.diagnostics {
            let histogram = Histogram {
                bins: readback::read_buffer(&self.context, buffers.histogram_buffer())?,
            };
            let cdf = Cdf {
                values: readback::read_buffer(&self.context, buffers.cdf_buffer())?,
            };
            (Some(histogram), Some(cdf))
        } else {
            (None, None)
        };

        let image = image.with_samples(Samples::from_u32(layout.bit_depth, &samples))?;
        tracing::info!(%layout, stages = stages.len(), "equalization complete");
        Ok(DeviceRun {
            image,
            stages,
            histogram,
            cdf,
        })
    }

    /// Record and submit every stage of the plan; returns the downloaded samples.
    fn issue(&self, buffers: &PipelineBuffers, image: &Image) -> Result<(Vec<u32>, Vec<Stage>), GpuError> {
        let device = self.context.device();
        let queue = self.context.queue();
        let layout = *buffers.layout();
        let pixels = layout.pixel_count;
        let grid = dispatch_grid(pixels);
        let params = buffers.params.raw();

        let mut encoder = Some(device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("histeq_equalize_encoder"),
        }));
        let mut samples = Vec::new();
        let mut issued = Vec::with_capacity(plan(layout.mode).len());

        for &stage in plan(layout.mode) {
            tracing::debug!(%stage, "issuing");
            let Some(enc) = encoder.as_mut() else {
                break;
            };
            match stage {
                Stage::Upload => buffers.source.write(queue, &image.samples().to_u32()),
                Stage::ForwardConvert => {
                    if let Some(planar) = &buffers.planar {
                        self.kernels.forward_convert.dispatch(
                            device,
                            enc,
                            &[buffers.source.raw(), planar.raw(), params],
                            grid,
                        );
                    }
                }
                Stage::Histogram => {
                    buffers.bins.clear(enc);
                    let kernel = if layout.levels() == 256 {
                        &self.kernels.histogram_local
                    } else {
                        &self.kernels.histogram_global
                    };
                    kernel.dispatch(
                        device,
                        enc,
                        &[buffers.lightness().raw(), buffers.bins.raw(), params],
                        grid,
                    );
                }
                Stage::Cdf => self.kernels.normalize_cdf.dispatch(
                    device,
                    enc,
                    &[buffers.bins.raw(), buffers.cdf.raw(), params],
                    [1, 1, 1],
                ),
                Stage::Lookup => self.kernels.lookup.dispatch(
                    device,
                    enc,
                    &[
                        buffers.lightness().raw(),
                        buffers.cdf.raw(),
                        buffers.mapped.raw(),
                        params,
                    ],
                    grid,
                ),
                Stage::Recombine => {
                    if let Some(planar) = &buffers.planar {
                        planar.copy_from(enc, &buffers.mapped, pixels);
                    }
                }
                Stage::InverseConvert => {
                    if let (Some(planar), Some(output)) = (&buffers.planar, &buffers.output) {
                        self.kernels.inverse_convert.dispatch(
                            device,
                            enc,
                            &[planar.raw(), output.raw(), params],
                            grid,
                        );
                    }
                }
                Stage::Download => {
                    if let Some(enc) = encoder.take() {
                        samples = readback::download(&self.context, enc, buffers.result())?;
                    }
                }
            }
            issued.push(stage);
        }
        Ok((samples, issued))
    }
}

/// Run `f` inside validation and out-of-memory error scopes, turning any
/// captured device error into a [`GpuError`].
fn with_error_scope<T>(
    device: &wgpu::Device,
    operation: &'static str,
    f: impl FnOnce() -> Result<T, GpuError>,
) -> Result<T, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    if let Some(error) = validation {
        return Err(GpuError::Validation {
            operation,
            message: error.to_string(),
        });
    }
    if let Some(error) = out_of_memory {
        return Err(GpuError::OutOfMemory {
            operation,
            message: error.to_string(),
        });
    }
    result
}
