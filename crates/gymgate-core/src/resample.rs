//! Grayscale crop and bilinear resize helpers shared by the detector
//! and encoder preprocessing paths.

/// Bilinear-resize a grayscale image to `out_w` × `out_h`.
///
/// Degenerate inputs (zero dimensions, short buffer) produce a black
/// output of the requested size rather than panicking.
pub(crate) fn resize_bilinear(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    out_w: usize,
    out_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; out_w * out_h];
    if src_w == 0 || src_h == 0 || src.len() < src_w * src_h || out_w == 0 || out_h == 0 {
        return out;
    }

    let x_ratio = src_w as f32 / out_w as f32;
    let y_ratio = src_h as f32 / out_h as f32;

    for oy in 0..out_h {
        let sy = (oy as f32 + 0.5) * y_ratio - 0.5;
        let sy = sy.clamp(0.0, (src_h - 1) as f32);
        let y0 = sy as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let dy = sy - y0 as f32;

        for ox in 0..out_w {
            let sx = (ox as f32 + 0.5) * x_ratio - 0.5;
            let sx = sx.clamp(0.0, (src_w - 1) as f32);
            let x0 = sx as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let dx = sx - x0 as f32;

            let tl = src[y0 * src_w + x0] as f32;
            let tr = src[y0 * src_w + x1] as f32;
            let bl = src[y1 * src_w + x0] as f32;
            let br = src[y1 * src_w + x1] as f32;

            let top = tl * (1.0 - dx) + tr * dx;
            let bot = bl * (1.0 - dx) + br * dx;
            let val = top * (1.0 - dy) + bot * dy;

            out[oy * out_w + ox] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// Extract a rectangular crop, clamping the rectangle to the image.
/// Returns the crop plus its actual (width, height).
pub(crate) fn crop(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    x: i64,
    y: i64,
    w: i64,
    h: i64,
) -> (Vec<u8>, usize, usize) {
    let x0 = x.clamp(0, src_w as i64) as usize;
    let y0 = y.clamp(0, src_h as i64) as usize;
    let x1 = (x + w).clamp(0, src_w as i64) as usize;
    let y1 = (y + h).clamp(0, src_h as i64) as usize;

    let cw = x1.saturating_sub(x0);
    let ch = y1.saturating_sub(y0);
    let mut out = Vec::with_capacity(cw * ch);
    for row in y0..y1 {
        out.extend_from_slice(&src[row * src_w + x0..row * src_w + x1]);
    }
    (out, cw, ch)
}
