//! Image loading and saving via the `image` crate.

use std::path::Path;

use histeq_core::{BitDepth, ColorMode, Image, Samples};

/// Load an image from disk as the channel layout and bit depth the run needs.
///
/// Grayscale mode converts to luma; color mode keeps alpha when the source has it.
pub fn load(path: &Path, mode: ColorMode, depth: BitDepth) -> Result<Image, ImageIoError> {
    let img = image::open(path).map_err(ImageIoError::Decode)?;
    let (width, height) = (img.width(), img.height());
    let has_alpha = img.color().has_alpha();

    let (channels, samples) = match (mode, depth) {
        (ColorMode::Grayscale, BitDepth::U8) => (1, Samples::U8(img.to_luma8().into_raw())),
        (ColorMode::Grayscale, BitDepth::U16) => (1, Samples::U16(img.to_luma16().into_raw())),
        (ColorMode::Color, BitDepth::U8) if has_alpha => {
            (4, Samples::U8(img.to_rgba8().into_raw()))
        }
        (ColorMode::Color, BitDepth::U8) => (3, Samples::U8(img.to_rgb8().into_raw())),
        (ColorMode::Color, BitDepth::U16) if has_alpha => {
            (4, Samples::U16(img.to_rgba16().into_raw()))
        }
        (ColorMode::Color, BitDepth::U16) => (3, Samples::U16(img.to_rgb16().into_raw())),
    };

    tracing::debug!(
        path = %path.display(),
        width,
        height,
        channels,
        source = ?img.color(),
        "loaded image"
    );
    Image::new(width, height, channels, samples)
        .map_err(|_| ImageIoError::BufferLayout { width, height })
}

/// Encode `image` to `path`; the format follows the file extension.
///
/// Multi-slice images are written as slices stacked vertically.
pub fn save(image: &Image, path: &Path) -> Result<(), ImageIoError> {
    let width = image.width();
    let height = image.height() * image.depth();
    match (image.samples(), image.channels()) {
        (Samples::U8(data), 1) => save_buffer::<image::Luma<u8>>(path, width, height, data.clone()),
        (Samples::U8(data), 3) => save_buffer::<image::Rgb<u8>>(path, width, height, data.clone()),
        (Samples::U8(data), 4) => save_buffer::<image::Rgba<u8>>(path, width, height, data.clone()),
        (Samples::U16(data), 1) => save_buffer::<image::Luma<u16>>(path, width, height, data.clone()),
        (Samples::U16(data), 3) => save_buffer::<image::Rgb<u16>>(path, width, height, data.clone()),
        (Samples::U16(data), 4) => save_buffer::<image::Rgba<u16>>(path, width, height, data.clone()),
        (_, channels) => Err(ImageIoError::UnsupportedChannels(channels)),
    }
}

fn save_buffer<P>(path: &Path, width: u32, height: u32, data: Vec<P::Subpixel>) -> Result<(), ImageIoError>
where
    P: image::Pixel + image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    let buffer = image::ImageBuffer::<P, Vec<P::Subpixel>>::from_raw(width, height, data)
        .ok_or(ImageIoError::BufferLayout { width, height })?;
    buffer.save(path).map_err(ImageIoError::Encode)?;
    tracing::debug!(path = %path.display(), width, height, "saved image");
    Ok(())
}

/// Errors that can occur while loading or saving images.
#[derive(Debug, thiserror::Error)]
pub enum ImageIoError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("sample buffer does not fit a {width}x{height} image")]
    BufferLayout { width: u32, height: u32 },
    #[error("cannot encode {0}-channel images")]
    UnsupportedChannels(u32),
}
