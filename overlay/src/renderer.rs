//! Software renderer using tiny-skia and cosmic-text
//!
//! Draws the bubble body, its tail and the wrapped text into an RGBA pixel
//! buffer. All rendering is done on the CPU; pixels are premultiplied, as
//! tiny-skia stores them.
#![allow(clippy::too_many_arguments)]
use std::collections::HashMap;

use cosmic_text::{
    Attrs, Buffer, Color as CosmicColor, Family, FontSystem, LayoutGlyph, Metrics, Shaping,
    SwashCache, Wrap,
};
use pixie_types::{BubbleAppearance, Side};
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, PixmapMut, Stroke, Transform,
};

use crate::utils::color_from_rgba;

/// Maximum entries in the text shaping cache (LRU eviction when exceeded)
const TEXT_CACHE_MAX_ENTRIES: usize = 512;

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Font family requested for bubble text; cosmic-text falls back when missing
const FONT_FAMILY: &str = "Noto Sans";

/// Cached result of text shaping
struct CachedText {
    /// Pre-shaped glyphs ready for rendering
    glyphs: Vec<LayoutGlyph>,
    /// LRU tracking: incremented on each access
    last_used: u64,
}

/// Key for text cache: (text content, font size rounded to tenths)
type TextCacheKey = (String, u32);

/// Break `text` into lines no wider than `max_width` using cosmic-text's
/// word wrapping. Explicit newlines are kept; an empty paragraph yields "".
pub fn wrap_lines(
    font_system: &mut FontSystem,
    text: &str,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let metrics = Metrics::new(font_size, font_size * LINE_HEIGHT_FACTOR);
    let mut buffer = Buffer::new(font_system, metrics);
    buffer.set_wrap(font_system, Wrap::WordOrGlyph);
    buffer.set_size(font_system, Some(max_width.max(1.0)), None);

    let attrs = Attrs::new().family(Family::Name(FONT_FAMILY));
    buffer.set_text(font_system, text, &attrs, Shaping::Advanced, None);
    buffer.shape_until_scroll(font_system, false);

    let mut lines = Vec::new();
    for run in buffer.layout_runs() {
        let line = match (run.glyphs.first(), run.glyphs.last()) {
            (Some(first), Some(last)) => {
                let start = first.start.min(last.start);
                let end = first.end.max(last.end);
                run.text.get(start..end).unwrap_or_default().trim_end()
            }
            _ => "",
        };
        lines.push(line.to_string());
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ─────────────────────────────────────────────────────────────────────────────
// Bubble Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Where the parts of a bubble go inside its window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleShape {
    /// Rounded body as (x, y, w, h)
    pub body: (f32, f32, f32, f32),
    /// Tail triangle: tip first, then the two base corners on the body edge
    pub tail: [(f32, f32); 3],
    /// Top-left of the first text line
    pub text_origin: (f32, f32),
}

/// Lay out a bubble in a `width` x `height` window sitting on `side` of its
/// anchor. The tail points back at the anchor and is carved out of the
/// padding on that edge, so text laid out for `width - 2 * padding` still fits.
pub fn bubble_shape(width: f32, height: f32, side: Side, tail_size: f32, padding: f32) -> BubbleShape {
    let t = tail_size
        .clamp(0.0, padding.max(0.0))
        .min(width / 4.0)
        .min(height / 4.0);
    // Padding left on the tail's axis once the tail strip is taken
    let inset = padding - t / 2.0;

    let body = match side {
        Side::Right => (t, 0.0, width - t, height),
        Side::Left => (0.0, 0.0, width - t, height),
        Side::Below => (0.0, t, width, height - t),
        Side::Above => (0.0, 0.0, width, height - t),
    };
    let (bx, by, bw, bh) = body;
    let cx = bx + bw / 2.0;
    let cy = by + bh / 2.0;

    let tail = match side {
        Side::Right => [(0.0, cy), (bx, cy - t), (bx, cy + t)],
        Side::Left => [(width, cy), (bx + bw, cy - t), (bx + bw, cy + t)],
        Side::Below => [(cx, 0.0), (cx - t, by), (cx + t, by)],
        Side::Above => [(cx, height), (cx - t, by + bh), (cx + t, by + bh)],
    };

    let text_origin = match side {
        Side::Right => (bx + inset, padding),
        Side::Left => (inset, padding),
        Side::Below => (padding, by + inset),
        Side::Above => (padding, inset),
    };

    BubbleShape {
        body,
        tail,
        text_origin,
    }
}

/// Scale every premultiplied channel by `opacity`
pub fn apply_opacity(buffer: &mut [u8], opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity >= 1.0 {
        return;
    }
    for byte in buffer.iter_mut() {
        *byte = (*byte as f32 * opacity).round() as u8;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// A software renderer for bubble content
pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    /// Cache of shaped text to avoid re-shaping every frame
    text_cache: HashMap<TextCacheKey, CachedText>,
    /// Counter for LRU tracking
    cache_access_counter: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            text_cache: HashMap::with_capacity(64),
            cache_access_counter: 0,
        }
    }

    /// Evict least recently used entries if cache is too large
    fn evict_lru_if_needed(&mut self) {
        if self.text_cache.len() <= TEXT_CACHE_MAX_ENTRIES {
            return;
        }

        // Drop the oldest quarter
        let target_size = TEXT_CACHE_MAX_ENTRIES * 3 / 4;
        let mut entries: Vec<_> = self
            .text_cache
            .iter()
            .map(|(k, v)| (k.clone(), v.last_used))
            .collect();
        entries.sort_by_key(|(_, last_used)| *last_used);

        for (key, _) in entries
            .into_iter()
            .take(self.text_cache.len() - target_size)
        {
            self.text_cache.remove(&key);
        }
    }

    /// Find cached entry by borrowed key (avoids String allocation on hit)
    fn find_cached(&mut self, text: &str, font_size_key: u32) -> Option<&mut CachedText> {
        self.text_cache
            .iter_mut()
            .find(|(k, _)| k.0 == text && k.1 == font_size_key)
            .map(|(_, v)| v)
    }

    /// Ensure text is cached, shaping if needed
    fn ensure_cached(&mut self, text: &str, font_size: f32) {
        let font_size_key = (font_size * 10.0).round() as u32;

        self.cache_access_counter += 1;
        let current_access = self.cache_access_counter;

        if let Some(cached) = self.find_cached(text, font_size_key) {
            cached.last_used = current_access;
            return;
        }

        // Cache miss - shape the text as a single unwrapped line
        let metrics = Metrics::new(font_size, font_size * LINE_HEIGHT_FACTOR);
        let mut text_buffer = Buffer::new(&mut self.font_system, metrics);

        let attrs = Attrs::new().family(Family::Name(FONT_FAMILY));
        text_buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        text_buffer.shape_until_scroll(&mut self.font_system, false);

        let glyphs: Vec<LayoutGlyph> = text_buffer
            .layout_runs()
            .flat_map(|run| run.glyphs.iter().cloned())
            .collect();

        self.text_cache.insert(
            (text.to_string(), font_size_key),
            CachedText {
                glyphs,
                last_used: current_access,
            },
        );
        self.evict_lru_if_needed();
    }

    /// Get cached glyphs for drawing. Must call ensure_cached first.
    fn get_cached_glyphs(&mut self, text: &str, font_size: f32) -> Vec<LayoutGlyph> {
        let font_size_key = (font_size * 10.0).round() as u32;
        self.find_cached(text, font_size_key)
            .map(|c| c.glyphs.clone())
            .unwrap_or_default()
    }

    /// Clear a pixel buffer with a color
    pub fn clear(&self, buffer: &mut [u8], width: u32, height: u32, color: Color) {
        if let Some(mut pixmap) = PixmapMut::from_bytes(buffer, width, height) {
            pixmap.fill(color);
        }
    }

    /// Draw a rounded rectangle (filled)
    pub fn fill_rounded_rect(
        &self,
        buffer: &mut [u8],
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radius: f32,
        color: Color,
    ) {
        let Some(mut pixmap) = PixmapMut::from_bytes(buffer, width, height) else {
            return;
        };
        let Some(path) = create_rounded_rect_path(x, y, w, h, radius) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    /// Draw a rounded rectangle outline
    pub fn stroke_rounded_rect(
        &self,
        buffer: &mut [u8],
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radius: f32,
        stroke_width: f32,
        color: Color,
    ) {
        let Some(mut pixmap) = PixmapMut::from_bytes(buffer, width, height) else {
            return;
        };
        let Some(path) = create_rounded_rect_path(x, y, w, h, radius) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        pixmap.stroke_path(&path, &paint, &round_stroke(stroke_width), Transform::identity(), None);
    }

    /// Draw the tail triangle: filled, with its two outer edges stroked
    pub fn draw_tail(
        &self,
        buffer: &mut [u8],
        width: u32,
        height: u32,
        tail: [(f32, f32); 3],
        fill: Color,
        border: Color,
        border_width: f32,
    ) {
        let Some(mut pixmap) = PixmapMut::from_bytes(buffer, width, height) else {
            return;
        };
        let [tip, a, b] = tail;

        let mut edges = PathBuilder::new();
        edges.move_to(a.0, a.1);
        edges.line_to(tip.0, tip.1);
        edges.line_to(b.0, b.1);

        let mut triangle = PathBuilder::new();
        triangle.move_to(tip.0, tip.1);
        triangle.line_to(a.0, a.1);
        triangle.line_to(b.0, b.1);
        triangle.close();

        let mut paint = Paint::default();
        paint.anti_alias = true;

        if let Some(path) = edges.finish() {
            paint.set_color(border);
            pixmap.stroke_path(&path, &paint, &round_stroke(border_width), Transform::identity(), None);
        }
        // Filling last hides the body border where the tail joins it
        if let Some(path) = triangle.finish() {
            paint.set_color(fill);
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    /// Draw text with its baseline at `y` (uses shaping cache)
    pub fn draw_text(
        &mut self,
        buffer: &mut [u8],
        buf_width: u32,
        buf_height: u32,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    ) {
        let Some(mut pixmap) = PixmapMut::from_bytes(buffer, buf_width, buf_height) else {
            return;
        };

        self.ensure_cached(text, font_size);
        // Cloned because swash_cache needs &mut self below
        let glyphs = self.get_cached_glyphs(text, font_size);

        let text_color = CosmicColor::rgba(
            (color.red() * 255.0) as u8,
            (color.green() * 255.0) as u8,
            (color.blue() * 255.0) as u8,
            (color.alpha() * 255.0) as u8,
        );

        for glyph in &glyphs {
            let physical_glyph = glyph.physical((x, y), 1.0);

            if let Some(image) = self
                .swash_cache
                .get_image(&mut self.font_system, physical_glyph.cache_key)
            {
                let glyph_x = physical_glyph.x + image.placement.left;
                let glyph_y = physical_glyph.y - image.placement.top;

                draw_glyph_to_pixmap(
                    &mut pixmap,
                    &image.data,
                    image.placement.width,
                    image.placement.height,
                    glyph_x,
                    glyph_y,
                    text_color,
                );
            }
        }
    }

    /// Draw a complete bubble: body, tail, and the already wrapped `lines`,
    /// then fade the whole buffer to `opacity`.
    pub fn draw_bubble(
        &mut self,
        buffer: &mut [u8],
        width: u32,
        height: u32,
        side: Side,
        style: &BubbleAppearance,
        padding: f32,
        lines: &[String],
        opacity: f32,
    ) {
        self.clear(buffer, width, height, Color::TRANSPARENT);
        if opacity <= 0.0 {
            return;
        }

        let shape = bubble_shape(width as f32, height as f32, side, style.tail_size, padding);
        let (bx, by, bw, bh) = shape.body;
        let background = color_from_rgba(style.background);
        let border = color_from_rgba(style.border);

        // Keep the stroke inside the window
        let half = style.border_width / 2.0;
        self.fill_rounded_rect(buffer, width, height, bx, by, bw, bh, style.corner_radius, background);
        self.stroke_rounded_rect(
            buffer,
            width,
            height,
            bx + half,
            by + half,
            bw - style.border_width,
            bh - style.border_width,
            style.corner_radius,
            style.border_width,
            border,
        );
        self.draw_tail(buffer, width, height, shape.tail, background, border, style.border_width);

        let text_color = color_from_rgba(style.text_color);
        let line_height = style.font_size * LINE_HEIGHT_FACTOR;
        let (tx, ty) = shape.text_origin;
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = ty + i as f32 * line_height + style.font_size;
            self.draw_text(buffer, width, height, line, tx, baseline, style.font_size, text_color);
        }

        apply_opacity(buffer, opacity);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Create a rounded rectangle path
fn create_rounded_rect_path(x: f32, y: f32, w: f32, h: f32, r: f32) -> Option<tiny_skia::Path> {
    let r = r.min(w / 2.0).min(h / 2.0);

    let mut pb = PathBuilder::new();

    pb.move_to(x + r, y);

    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);

    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);

    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);

    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);

    pb.close();
    pb.finish()
}

/// Draw a glyph image onto a pixmap with alpha blending
fn draw_glyph_to_pixmap(
    pixmap: &mut PixmapMut,
    glyph_data: &[u8],
    glyph_width: u32,
    glyph_height: u32,
    dest_x: i32,
    dest_y: i32,
    color: CosmicColor,
) {
    let pixmap_width = pixmap.width() as i32;
    let pixmap_height = pixmap.height() as i32;
    let data = pixmap.data_mut();

    for gy in 0..glyph_height as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= pixmap_height {
            continue;
        }

        for gx in 0..glyph_width as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= pixmap_width {
                continue;
            }

            let glyph_idx = (gy as u32 * glyph_width + gx as u32) as usize;
            let Some(&alpha) = glyph_data.get(glyph_idx) else {
                continue;
            };
            if alpha == 0 {
                continue;
            }

            let pixel_idx = ((py as u32 * pixmap_width as u32 + px as u32) * 4) as usize;
            if pixel_idx + 3 >= data.len() {
                continue;
            }

            let src_a = (alpha as u32 * color.a() as u32) / 255;
            let inv_a = 255 - src_a;

            data[pixel_idx] =
                ((color.r() as u32 * src_a + data[pixel_idx] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 1] =
                ((color.g() as u32 * src_a + data[pixel_idx + 1] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 2] =
                ((color.b() as u32 * src_a + data[pixel_idx + 2] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 3] = (src_a + (data[pixel_idx + 3] as u32 * inv_a) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 240.0;
    const H: f32 = 42.0;

    fn inside(point: (f32, f32)) -> bool {
        (0.0..=W).contains(&point.0) && (0.0..=H).contains(&point.1)
    }

    #[test]
    fn tail_tip_touches_the_anchor_facing_edge() {
        let right = bubble_shape(W, H, Side::Right, 10.0, 12.0);
        assert_eq!(right.tail[0].0, 0.0);

        let left = bubble_shape(W, H, Side::Left, 10.0, 12.0);
        assert_eq!(left.tail[0].0, W);

        let below = bubble_shape(W, H, Side::Below, 10.0, 12.0);
        assert_eq!(below.tail[0].1, 0.0);

        let above = bubble_shape(W, H, Side::Above, 10.0, 12.0);
        assert_eq!(above.tail[0].1, H);
    }

    #[test]
    fn tail_base_sits_on_the_body_edge() {
        let shape = bubble_shape(W, H, Side::Right, 10.0, 12.0);
        let (bx, _, _, _) = shape.body;
        assert_eq!(shape.tail[1].0, bx);
        assert_eq!(shape.tail[2].0, bx);

        let shape = bubble_shape(W, H, Side::Above, 10.0, 12.0);
        let (_, by, _, bh) = shape.body;
        assert_eq!(shape.tail[1].1, by + bh);
        assert_eq!(shape.tail[2].1, by + bh);
    }

    #[test]
    fn shape_stays_inside_the_window() {
        for side in [Side::Right, Side::Left, Side::Above, Side::Below] {
            let shape = bubble_shape(W, H, side, 10.0, 12.0);
            let (bx, by, bw, bh) = shape.body;
            assert!(inside((bx, by)) && inside((bx + bw, by + bh)), "{side:?}");
            assert!(shape.tail.iter().all(|&p| inside(p)), "{side:?}");
        }
    }

    #[test]
    fn text_keeps_symmetric_margins_inside_body() {
        let padding = 12.0;
        let content = W - 2.0 * padding;

        let shape = bubble_shape(W, H, Side::Right, 10.0, padding);
        let (bx, _, bw, _) = shape.body;
        let left_margin = shape.text_origin.0 - bx;
        let right_margin = (bx + bw) - (shape.text_origin.0 + content);
        assert_eq!(left_margin, right_margin);
        assert!(left_margin > 0.0);
    }

    #[test]
    fn oversized_tail_is_clamped_to_padding() {
        let shape = bubble_shape(W, H, Side::Below, 40.0, 6.0);
        assert_eq!(shape.body.1, 6.0);
    }

    #[test]
    fn drawn_lines_are_shaped_once_and_reused() {
        let mut renderer = Renderer::new();
        let (w, h) = (240u32, 66u32);
        let mut buffer = vec![0u8; (w * h * 4) as usize];
        let lines = vec!["Hi! I'm".to_string(), String::new(), "Pixie!".to_string()];

        for _ in 0..3 {
            renderer.draw_bubble(
                &mut buffer,
                w,
                h,
                Side::Right,
                &BubbleAppearance::default(),
                12.0,
                &lines,
                0.95,
            );
        }
        // Empty lines are skipped; the rest share one cache entry per text
        assert_eq!(renderer.text_cache.len(), 2);
    }

    #[test]
    fn opacity_scales_premultiplied_channels() {
        let mut pixels = vec![200, 100, 50, 200];
        apply_opacity(&mut pixels, 0.5);
        assert_eq!(pixels, vec![100, 50, 25, 100]);

        let mut untouched = vec![10, 20, 30, 40];
        apply_opacity(&mut untouched, 1.0);
        assert_eq!(untouched, vec![10, 20, 30, 40]);
    }
}
