//! Pixel-buffer bubble surface
//!
//! `PixmapSurface` is the `BubbleSurface` every host uses: it keeps the
//! bubble's geometry and text, re-renders into an RGBA buffer when something
//! visible changed, and hands finished frames to an optional native window.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use pixie_core::{BubbleState, BubbleSurface, Rect};
use pixie_types::{BubbleAppearance, Side};
use thiserror::Error;

use crate::renderer::Renderer;
use crate::utils::demultiply;

/// A native window that displays frames rendered by `PixmapSurface`
pub trait BubbleWindow {
    /// Move/resize to `rect` (absolute screen pixels)
    fn set_geometry(&mut self, rect: Rect);

    /// Show a premultiplied RGBA frame sized like the last geometry
    fn present(&mut self, pixels: &[u8]);

    fn set_visible(&mut self, visible: bool);

    /// Process pending window events. Returns false once the window is gone.
    fn poll_events(&mut self) -> bool {
        true
    }
}

/// Errors writing a frame snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("nothing has been rendered yet")]
    Empty,

    #[error("failed to write snapshot")]
    Io(#[from] std::io::Error),

    #[error("failed to encode PNG")]
    Encode(#[from] png::EncodingError),
}

pub struct PixmapSurface {
    renderer: Renderer,
    appearance: BubbleAppearance,
    padding: f32,
    rect: Rect,
    side: Side,
    opacity: f32,
    lines: Vec<String>,
    visible_text: String,
    shown: bool,
    dirty: bool,
    pixels: Vec<u8>,
    frames: u64,
    window: Option<Box<dyn BubbleWindow>>,
}

impl PixmapSurface {
    pub fn new(appearance: BubbleAppearance, padding: u32) -> Self {
        Self {
            renderer: Renderer::new(),
            appearance,
            padding: padding as f32,
            rect: Rect::default(),
            side: Side::default(),
            opacity: 0.0,
            lines: Vec::new(),
            visible_text: String::new(),
            shown: false,
            dirty: false,
            pixels: Vec::new(),
            frames: 0,
            window: None,
        }
    }

    /// Forward frames and geometry to a native window
    pub fn with_window(mut self, window: impl BubbleWindow + 'static) -> Self {
        self.window = Some(Box::new(window));
        self
    }

    /// Re-render if anything visible changed. Returns true if a new frame
    /// was produced.
    pub fn flush(&mut self) -> bool {
        if !self.dirty || !self.shown {
            return false;
        }
        self.dirty = false;

        let (width, height) = (self.rect.width, self.rect.height);
        if width == 0 || height == 0 {
            return false;
        }
        self.pixels.resize((width * height * 4) as usize, 0);

        self.renderer.draw_bubble(
            &mut self.pixels,
            width,
            height,
            self.side,
            &self.appearance,
            self.padding,
            &self.lines,
            self.opacity,
        );
        self.frames += 1;

        if let Some(window) = self.window.as_mut() {
            window.present(&self.pixels);
        }
        true
    }

    /// Pump the native window's events. Returns false once it is gone.
    pub fn poll_window(&mut self) -> bool {
        self.window.as_mut().is_none_or(|w| w.poll_events())
    }

    /// Write the last rendered frame as a PNG
    pub fn write_png(&self, path: &Path) -> Result<(), SnapshotError> {
        if self.frames == 0 || self.pixels.is_empty() {
            return Err(SnapshotError::Empty);
        }

        let mut straight = self.pixels.clone();
        demultiply(&mut straight);

        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), self.rect.width, self.rect.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&straight)?;
        Ok(())
    }

    /// Premultiplied RGBA of the last frame
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.rect.width || y >= self.rect.height {
            return None;
        }
        let idx = ((y * self.rect.width + x) * 4) as usize;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn visible_text(&self) -> &str {
        &self.visible_text
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}

impl BubbleSurface for PixmapSurface {
    fn set_rect(&mut self, rect: Rect) {
        if rect == self.rect {
            return;
        }
        // A pure move needs no redraw
        if rect.size() != self.rect.size() {
            self.dirty = true;
        }
        self.rect = rect;
        if let Some(window) = self.window.as_mut() {
            window.set_geometry(rect);
        }
    }

    fn set_side(&mut self, side: Side) {
        if side != self.side {
            self.side = side;
            self.dirty = true;
        }
    }

    fn set_opacity(&mut self, opacity: f32) {
        if opacity != self.opacity {
            self.opacity = opacity;
            self.dirty = true;
        }
    }

    fn render_text(&mut self, visible: &str, lines: &[String]) {
        self.visible_text.clear();
        self.visible_text.push_str(visible);
        self.lines = lines.to_vec();
        self.dirty = true;
    }

    fn show(&mut self) {
        if !self.shown {
            self.shown = true;
            self.dirty = true;
            if let Some(window) = self.window.as_mut() {
                window.set_geometry(self.rect);
                window.set_visible(true);
            }
        }
    }

    fn hide(&mut self) {
        if self.shown {
            self.shown = false;
            if let Some(window) = self.window.as_mut() {
                window.set_visible(false);
            }
        }
    }

    fn on_state(&mut self, state: BubbleState) {
        tracing::trace!(state = ?state, frames = self.frames, "Surface saw state change");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum WindowCall {
        Geometry(Rect),
        Present(usize),
        Visible(bool),
    }

    #[derive(Clone, Default)]
    struct RecordingWindow(Rc<RefCell<Vec<WindowCall>>>);

    impl BubbleWindow for RecordingWindow {
        fn set_geometry(&mut self, rect: Rect) {
            self.0.borrow_mut().push(WindowCall::Geometry(rect));
        }
        fn present(&mut self, pixels: &[u8]) {
            self.0.borrow_mut().push(WindowCall::Present(pixels.len()));
        }
        fn set_visible(&mut self, visible: bool) {
            self.0.borrow_mut().push(WindowCall::Visible(visible));
        }
    }

    const RECT: Rect = Rect::new(162, 104, 240, 42);

    fn shown_surface(opacity: f32) -> PixmapSurface {
        let mut surface = PixmapSurface::new(BubbleAppearance::default(), 12);
        surface.set_rect(RECT);
        surface.set_opacity(opacity);
        surface.render_text("", &[]);
        surface.show();
        surface
    }

    #[test]
    fn nothing_renders_until_shown() {
        let mut surface = PixmapSurface::new(BubbleAppearance::default(), 12);
        surface.set_rect(RECT);
        surface.set_opacity(0.95);
        assert!(!surface.flush());
        assert_eq!(surface.frames_rendered(), 0);
    }

    #[test]
    fn body_is_painted_at_full_opacity() {
        let mut surface = shown_surface(0.95);
        assert!(surface.flush());
        assert_eq!(surface.pixels().len(), 240 * 42 * 4);

        let center = surface.pixel_at(120, 21).unwrap();
        assert!(center[3] > 200, "{center:?}");
        // Corners outside the rounded body stay clear
        assert_eq!(surface.pixel_at(239, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn zero_opacity_is_fully_transparent() {
        let mut surface = shown_surface(0.0);
        assert!(surface.flush());
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn flush_only_renders_changes() {
        let mut surface = shown_surface(0.5);
        assert!(surface.flush());
        assert!(!surface.flush());

        surface.set_opacity(0.6);
        assert!(surface.flush());
        assert_eq!(surface.frames_rendered(), 2);
    }

    #[test]
    fn moving_forwards_geometry_without_redraw() {
        let window = RecordingWindow::default();
        let calls = window.0.clone();
        let mut surface = PixmapSurface::new(BubbleAppearance::default(), 12).with_window(window);
        surface.set_rect(RECT);
        surface.set_opacity(0.9);
        surface.show();
        surface.flush();

        let moved = Rect::new(300, 300, 240, 42);
        surface.set_rect(moved);
        assert!(!surface.flush());
        assert_eq!(calls.borrow().last(), Some(&WindowCall::Geometry(moved)));
    }

    #[test]
    fn window_follows_show_and_hide() {
        let window = RecordingWindow::default();
        let calls = window.0.clone();
        let mut surface = PixmapSurface::new(BubbleAppearance::default(), 12).with_window(window);
        surface.set_rect(RECT);
        surface.set_opacity(0.9);
        surface.show();
        surface.flush();
        surface.hide();
        surface.hide();

        assert_eq!(
            *calls.borrow(),
            vec![
                WindowCall::Geometry(RECT),
                WindowCall::Geometry(RECT),
                WindowCall::Visible(true),
                WindowCall::Present(240 * 42 * 4),
                WindowCall::Visible(false),
            ]
        );
        assert!(!surface.flush());
    }

    #[test]
    fn side_change_triggers_redraw() {
        let mut surface = shown_surface(0.9);
        surface.flush();
        surface.set_side(Side::Left);
        assert!(surface.flush());
        assert_eq!(surface.side(), Side::Left);
    }

    #[test]
    fn snapshot_requires_a_frame() {
        let surface = PixmapSurface::new(BubbleAppearance::default(), 12);
        let path = std::env::temp_dir().join("pixie-empty-snapshot.png");
        assert!(matches!(surface.write_png(&path), Err(SnapshotError::Empty)));
    }

    #[test]
    fn snapshot_is_a_png() {
        let mut surface = shown_surface(0.95);
        surface.flush();

        let path = std::env::temp_dir().join(format!("pixie-snapshot-{}.png", std::process::id()));
        surface.write_png(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let _ = std::fs::remove_file(path);
    }
}
