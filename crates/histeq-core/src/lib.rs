//! histeq core — image model and host implementation of histogram equalization.
//!
//! This crate contains the data model, configuration, and the reference
//! implementation of every pipeline stage. No GPU dependencies.

pub mod cdf;
pub mod color;
pub mod config;
pub mod equalize;
pub mod error;
pub mod histogram;
pub mod image;
pub mod layout;

// Re-exports for convenience.
pub use cdf::Cdf;
pub use config::EqualizeConfig;
pub use equalize::{Equalized, equalize};
pub use error::ConfigError;
pub use histogram::Histogram;
pub use image::{BitDepth, Image, Samples};
pub use layout::{BufferLayout, ColorMode};
