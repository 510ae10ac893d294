use std::path::PathBuf;

use histeq_core::ConfigError;
use histeq_gpu::GpuError;

use crate::image_io::ImageIoError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageIoError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("failed to write diagnostics to {path}: {source}")]
    Dump {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write to stdout: {0}")]
    Stdout(#[from] std::io::Error),
    #[error("failed to serialize diagnostics: {0}")]
    Json(#[from] serde_json::Error),
}
