//! Reversible RGB ↔ luma/chroma conversion (YCoCg-R lifting).
//!
//! The planar layout matches the device kernels: plane 0 holds luma, plane 1
//! `Co`, plane 2 `Cg` (both signed, stored as two's complement `u32`) and, for
//! RGBA input, plane 3 holds alpha untouched. Luma stays within the input's
//! sample range, so it can be histogrammed with the image's own level count.

/// Forward lifting step for one pixel. Returns `(luma, co, cg)`.
pub fn forward_pixel(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
    let co = r - b;
    let t = b + (co >> 1);
    let cg = g - t;
    let y = t + (cg >> 1);
    (y, co, cg)
}

/// Inverse lifting step. Channels are clamped to `[0, max_level]`.
pub fn inverse_pixel(y: i32, co: i32, cg: i32, max_level: u32) -> (u32, u32, u32) {
    let t = y - (cg >> 1);
    let g = cg + t;
    let b = t - (co >> 1);
    let r = b + co;
    let clamp = |v: i32| v.clamp(0, max_level as i32) as u32;
    (clamp(r), clamp(g), clamp(b))
}

/// Interleaved RGB(A) samples → planar luma/chroma(/alpha).
pub fn to_planar(interleaved: &[u32], channels: u32) -> Vec<u32> {
    let ch = channels as usize;
    let n = interleaved.len() / ch;
    let mut planar = vec![0u32; n * ch];
    for (i, px) in interleaved.chunks_exact(ch).enumerate() {
        let (y, co, cg) = forward_pixel(px[0] as i32, px[1] as i32, px[2] as i32);
        planar[i] = y as u32;
        planar[n + i] = co as u32;
        planar[2 * n + i] = cg as u32;
        if ch == 4 {
            planar[3 * n + i] = px[3];
        }
    }
    planar
}

/// Planar luma/chroma(/alpha) → interleaved RGB(A).
pub fn from_planar(planar: &[u32], channels: u32, max_level: u32) -> Vec<u32> {
    let ch = channels as usize;
    let n = planar.len() / ch;
    let mut interleaved = vec![0u32; n * ch];
    for (i, px) in interleaved.chunks_exact_mut(ch).enumerate() {
        let (r, g, b) = inverse_pixel(
            planar[i] as i32,
            planar[n + i] as i32,
            planar[2 * n + i] as i32,
            max_level,
        );
        px[0] = r;
        px[1] = g;
        px[2] = b;
        if ch == 4 {
            px[3] = planar[3 * n + i];
        }
    }
    interleaved
}
