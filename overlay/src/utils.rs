//! Common utility functions for bubble rendering

use tiny_skia::Color;

/// Convert [u8; 4] RGBA array to tiny_skia Color
#[inline]
pub fn color_from_rgba(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// Undo premultiplied alpha in place, for formats that expect straight alpha (PNG)
pub fn demultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_rgba() {
        let color = color_from_rgba([255, 0, 0, 255]);
        assert_eq!(color.red(), 1.0);
        assert_eq!(color.green(), 0.0);
        assert_eq!(color.alpha(), 1.0);
    }

    #[test]
    fn test_demultiply() {
        let mut pixels = vec![64, 32, 0, 128, 0, 0, 0, 0, 10, 20, 30, 255];
        demultiply(&mut pixels);
        assert_eq!(pixels, vec![128, 64, 0, 128, 0, 0, 0, 0, 10, 20, 30, 255]);
    }
}
