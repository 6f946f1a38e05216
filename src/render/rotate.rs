//! Pixel-buffer rotation for item images.

use image::{Rgba, RgbaImage};

/// Side of the square canvas that can hold a `w` x `h` buffer at any
/// rotation angle without clipping its corners.
pub fn canvas_side(width: u32, height: u32) -> u32 {
    let w = width as f64;
    let h = height as f64;
    (w * w + h * h).sqrt().ceil() as u32
}

/// Rotate `source` by `degrees` around its center into a fresh square
/// canvas of side [`canvas_side`]. The source is only read. Pixels outside
/// the rotated source are fully transparent; interior samples are bilinear.
pub fn rotate_buffer(source: &RgbaImage, degrees: f64) -> RgbaImage {
    let (width, height) = source.dimensions();
    let side = canvas_side(width, height);
    let mut canvas = RgbaImage::new(side, side);
    if width == 0 || height == 0 {
        return canvas;
    }

    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    let src_cx = (width as f64 - 1.0) / 2.0;
    let src_cy = (height as f64 - 1.0) / 2.0;
    let dst_c = (side as f64 - 1.0) / 2.0;

    for y in 0..side {
        for x in 0..side {
            // Inverse mapping: rotate the destination pixel back into
            // source space and sample there.
            let dx = x as f64 - dst_c;
            let dy = y as f64 - dst_c;
            let sx = src_cx + dx * cos + dy * sin;
            let sy = src_cy - dx * sin + dy * cos;
            let pixel = sample_bilinear(source, sx, sy);
            canvas.put_pixel(x, y, pixel);
        }
    }

    canvas
}

fn sample_bilinear(source: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (width, height) = source.dimensions();
    if x < -1.0 || y < -1.0 || x > width as f64 || y > height as f64 {
        return Rgba([0, 0, 0, 0]);
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let fetch = |ix: i64, iy: i64| -> [f64; 4] {
        if ix < 0 || iy < 0 || ix >= width as i64 || iy >= height as i64 {
            return [0.0; 4];
        }
        let p = source.get_pixel(ix as u32, iy as u32).0;
        [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
    };

    let p00 = fetch(x0 as i64, y0 as i64);
    let p10 = fetch(x0 as i64 + 1, y0 as i64);
    let p01 = fetch(x0 as i64, y0 as i64 + 1);
    let p11 = fetch(x0 as i64 + 1, y0 as i64 + 1);

    let mut out = [0u8; 4];
    for channel in 0..4 {
        let top = p00[channel] * (1.0 - fx) + p10[channel] * fx;
        let bottom = p01[channel] * (1.0 - fx) + p11[channel] * fx;
        out[channel] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_image() -> RgbaImage {
        // 3x3, all blue except a red marker at (0, 0).
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img
    }

    #[test]
    fn test_canvas_side_holds_any_rotation() {
        assert_eq!(canvas_side(3, 3), 5); // ceil(4.24)
        assert_eq!(canvas_side(4, 3), 5);
        assert_eq!(canvas_side(100, 100), 142); // ceil(141.42)
        let side = canvas_side(640, 480);
        assert!(side as f64 >= (640.0f64.powi(2) + 480.0f64.powi(2)).sqrt());
    }

    #[test]
    fn test_zero_rotation_centers_source() {
        let src = marker_image();
        let out = rotate_buffer(&src, 0.0);
        assert_eq!(out.dimensions(), (5, 5));
        // Source center (1,1) lands at canvas center (2,2).
        assert_eq!(out.get_pixel(2, 2), &Rgba([0, 0, 255, 255]));
        // Marker at (0,0) lands one pixel up-left of center.
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        // Corners are transparent.
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_180_degrees_mirrors_marker() {
        let src = marker_image();
        let out = rotate_buffer(&src, 180.0);
        // The (0,0) marker lands at the mirrored position (3,3).
        assert_eq!(out.get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_source_is_untouched() {
        let src = marker_image();
        let before = src.clone();
        let _ = rotate_buffer(&src, 45.0);
        assert_eq!(src, before);
    }

    #[test]
    fn test_45_degrees_keeps_all_content_on_canvas() {
        // An opaque square rotated 45 degrees must not lose opacity mass
        // off the canvas edges (no corner clipping).
        let src = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let out = rotate_buffer(&src, 45.0);
        let opaque_in: f64 = src.pixels().map(|p| p.0[3] as f64).sum();
        let opaque_out: f64 = out.pixels().map(|p| p.0[3] as f64).sum();
        // Bilinear edges smear a little; the totals stay close.
        assert!((opaque_out - opaque_in).abs() / opaque_in < 0.1);
    }
}
