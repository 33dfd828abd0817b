//! Text layout backed by cosmic-text shaping

use cosmic_text::FontSystem;
use pixie_core::TextLayout;

use crate::renderer::{LINE_HEIGHT_FACTOR, wrap_lines};

/// `TextLayout` that wraps with real font metrics.
///
/// Owns its own font system; build it once per bubble, loading system fonts
/// is not cheap.
pub struct CosmicLayout {
    font_system: FontSystem,
    font_size: f32,
}

impl CosmicLayout {
    pub fn new(font_size: f32) -> Self {
        Self {
            font_system: FontSystem::new(),
            font_size,
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }
}

impl TextLayout for CosmicLayout {
    fn wrap(&mut self, text: &str, max_width: f32) -> Vec<String> {
        wrap_lines(&mut self.font_system, text, self.font_size, max_width)
    }

    fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_height_follows_font_size() {
        let layout = CosmicLayout::new(20.0);
        assert_eq!(layout.line_height(), 24.0);
    }

    #[test]
    fn wrap_always_yields_a_line() {
        let mut layout = CosmicLayout::new(14.0);
        assert_eq!(layout.wrap("", 200.0), vec![String::new()]);
    }
}
