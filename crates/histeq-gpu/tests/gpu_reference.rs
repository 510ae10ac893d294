//! GPU integration tests against the host reference. Requires a wgpu adapter;
//! tests return early when none is available.
//!
//! Run with: `cargo test -p histeq-gpu`

use std::sync::{Mutex, OnceLock};

use histeq_core::{
    BitDepth, BufferLayout, ColorMode, ConfigError, EqualizeConfig, Image, Samples, equalize,
};
use histeq_gpu::{Equalizer, GpuContext, GpuError, PipelineBuffers, Stage};

fn gpu_test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn test_context() -> Option<GpuContext> {
    match GpuContext::create_blocking() {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

fn equalizer(context: &GpuContext, mode: ColorMode, bit_depth: BitDepth) -> Equalizer {
    let config = EqualizeConfig {
        mode,
        bit_depth,
        diagnostics: true,
    };
    Equalizer::new(context.clone(), config).expect("kernels should build")
}

/// Deterministic pseudo-random samples in `[0, max]`.
fn noise(len: usize, max: u32, seed: u32) -> Vec<u32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) % (max + 1)
        })
        .collect()
}

fn image_from(width: u32, height: u32, channels: u32, depth: BitDepth, values: &[u32]) -> Image {
    Image::new(width, height, channels, Samples::from_u32(depth, values)).unwrap()
}

#[test]
fn test_four_level_regression_fixture() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Grayscale, BitDepth::U8);

    let image = image_from(2, 2, 1, BitDepth::U8, &[0, 85, 170, 255]);
    let run = eq.run(&image).unwrap();

    let histogram = run.histogram.expect("diagnostics enabled");
    let occupied: Vec<_> = histogram.occupied().collect();
    assert_eq!(occupied, vec![(0, 1), (85, 1), (170, 1), (255, 1)]);

    let cdf = run.cdf.expect("diagnostics enabled");
    assert_eq!(
        [cdf.values[0], cdf.values[85], cdf.values[170], cdf.values[255]],
        [0, 85, 170, 255]
    );
    assert_eq!(run.image.samples(), &Samples::U8(vec![0, 85, 170, 255]));
}

#[test]
fn test_grayscale_runs_are_deterministic() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Grayscale, BitDepth::U8);

    let image = image_from(4, 1, 1, BitDepth::U8, &[10, 10, 200, 200]);
    let first = eq.run(&image).unwrap();
    let second = eq.run(&image).unwrap();
    assert_eq!(first.image, second.image);
    assert_eq!(first.image.samples(), &Samples::U8(vec![85, 85, 255, 255]));
}

#[test]
fn test_uniform_image_single_bin_and_step_cdf() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Grayscale, BitDepth::U8);

    let image = image_from(64, 64, 1, BitDepth::U8, &vec![90; 64 * 64]);
    let run = eq.run(&image).unwrap();

    let histogram = run.histogram.unwrap();
    let occupied: Vec<_> = histogram.occupied().collect();
    assert_eq!(occupied, vec![(90, 4096)]);

    let cdf = run.cdf.unwrap();
    assert!(cdf.values[..90].iter().all(|&v| v == 0));
    assert!(cdf.values[90..].iter().all(|&v| v == 255));
    assert_eq!(run.image.samples(), &Samples::U8(vec![255; 4096]));
}

#[test]
fn test_grayscale_8_bit_matches_host_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Grayscale, BitDepth::U8);

    let (w, h) = (301, 197);
    let values: Vec<u32> = noise((w * h) as usize, 255, 7)
        .into_iter()
        .map(|v| v / 3 + 40)
        .collect();
    let image = image_from(w, h, 1, BitDepth::U8, &values);

    let run = eq.run(&image).unwrap();
    let reference = equalize(&image, ColorMode::Grayscale).unwrap();

    let histogram = run.histogram.unwrap();
    assert_eq!(histogram.total(), u64::from(w * h));
    assert_eq!(histogram, reference.histogram);
    assert_eq!(run.cdf.unwrap(), reference.cdf);
    assert_eq!(run.image, reference.image);
    assert_eq!(run.stages.len(), 5);
}

#[test]
fn test_grayscale_16_bit_matches_host_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Grayscale, BitDepth::U16);

    let (w, h) = (128, 96);
    let image = image_from(w, h, 1, BitDepth::U16, &noise((w * h) as usize, 65535, 11));

    let run = eq.run(&image).unwrap();
    let reference = equalize(&image, ColorMode::Grayscale).unwrap();

    let histogram = run.histogram.unwrap();
    let cdf = run.cdf.unwrap();
    assert_eq!(histogram.levels(), 65536);
    assert_eq!(cdf.levels(), 65536);
    assert!(cdf.is_monotonic());
    assert_eq!(cdf.values.last(), Some(&65535));
    assert_eq!(cdf, reference.cdf);
    assert_eq!(run.image, reference.image);
}

#[test]
fn test_color_matches_host_reference() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };

    for channels in [3, 4] {
        let eq = equalizer(&context, ColorMode::Color, BitDepth::U8);
        let (w, h) = (97, 61);
        let values = noise((w * h * channels) as usize, 200, 3 + channels);
        let image = image_from(w, h, channels, BitDepth::U8, &values);

        let run = eq.run(&image).unwrap();
        let reference = equalize(&image, ColorMode::Color).unwrap();

        assert_eq!(run.histogram.unwrap().total(), u64::from(w * h));
        assert_eq!(run.image, reference.image, "{channels} channels");
        assert_eq!(run.stages.len(), 8);
    }
}

#[test]
fn test_color_gray_ramp_roundtrips_exactly() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Color, BitDepth::U8);

    // An evenly spread ramp maps onto itself, so the output exposes the
    // forward/inverse conversion alone.
    let rgba = [0, 0, 0, 9, 85, 85, 85, 99, 170, 170, 170, 199, 255, 255, 255, 255];
    let image = image_from(2, 2, 4, BitDepth::U8, &rgba);
    let run = eq.run(&image).unwrap();
    assert_eq!(run.image, image);
}

#[test]
fn test_single_color_pixel_with_chroma_roundtrips_exactly() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };

    // One pixel gives the identity CDF, so only the conversion kernels act.
    let cases: [(BitDepth, u32, &[u32]); 3] = [
        (BitDepth::U16, 3, &[65535, 3, 40000]),
        (BitDepth::U16, 4, &[0, 65535, 1, 12345]),
        (BitDepth::U8, 3, &[255, 0, 128]),
    ];
    for (depth, channels, values) in cases {
        let eq = equalizer(&context, ColorMode::Color, depth);
        let image = image_from(1, 1, channels, depth, values);
        let run = eq.run(&image).unwrap();
        assert_eq!(run.image, image, "{depth} {values:?}");
        assert_eq!(run.image, equalize(&image, ColorMode::Color).unwrap().image);
    }
}

#[test]
fn test_color_stage_sequence() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Color, BitDepth::U8);

    let image = image_from(1, 1, 3, BitDepth::U8, &[1, 2, 3]);
    let run = eq.run(&image).unwrap();
    assert_eq!(
        run.stages,
        vec![
            Stage::Upload,
            Stage::ForwardConvert,
            Stage::Histogram,
            Stage::Cdf,
            Stage::Lookup,
            Stage::Recombine,
            Stage::InverseConvert,
            Stage::Download,
        ]
    );
}

#[test]
fn test_empty_image_has_zero_histogram() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Grayscale, BitDepth::U8);

    let image = image_from(0, 0, 1, BitDepth::U8, &[]);
    let run = eq.run(&image).unwrap();
    assert_eq!(run.histogram.unwrap().total(), 0);
    assert!(run.image.samples().is_empty());
    assert_eq!(run.stages.len(), 5);
}

#[test]
fn test_8_bit_buffers_rejected_for_16_bit_image() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };

    let image8 = image_from(2, 2, 1, BitDepth::U8, &[1, 2, 3, 4]);
    let image16 = image_from(2, 2, 1, BitDepth::U16, &[1, 2, 3, 4]);
    let layout8 = BufferLayout::for_image(&image8, ColorMode::Grayscale).unwrap();
    let buffers = PipelineBuffers::allocate(&context, layout8).unwrap();
    assert_eq!(buffers.histogram_buffer().len(), 256);

    let eq16 = equalizer(&context, ColorMode::Grayscale, BitDepth::U16);
    let err = eq16.run_with(&buffers, &image16).unwrap_err();
    assert!(matches!(
        err,
        GpuError::Config(ConfigError::BufferLayoutMismatch { .. })
    ));

    let fresh = eq16.allocate(&image16).unwrap();
    assert_eq!(fresh.histogram_buffer().len(), 65536);
    assert!(eq16.run_with(&fresh, &image16).is_ok());
}

#[test]
fn test_channel_mismatch_is_rejected_before_device_work() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(context) = test_context() else { return };
    let eq = equalizer(&context, ColorMode::Color, BitDepth::U8);

    let gray = image_from(2, 1, 1, BitDepth::U8, &[1, 2]);
    assert!(matches!(
        eq.run(&gray),
        Err(GpuError::Config(ConfigError::UnsupportedChannels { .. }))
    ));
}
