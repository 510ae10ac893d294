//! histeq GPU — wgpu compute pipeline for histogram equalization.
//!
//! This crate owns all device resources. It is handed a [`GpuContext`] and
//! exposes [`Equalizer`], which drives the conversion, histogram, CDF and
//! lookup kernels in dependency order.

pub mod buffers;
pub mod context;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod readback;

pub use buffers::{DeviceBuffer, DispatchParams, PipelineBuffers};
pub use context::GpuContext;
pub use error::GpuError;
pub use pipeline::{DeviceRun, Equalizer, Stage, plan};
