//! Shared configuration types for Pixie
//!
//! This crate contains serializable configuration types that are shared between
//! the bubble controller (pixie-core) and the rendering layer (pixie-overlay).

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Color Type
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color as [r, g, b, a] bytes
pub type Color = [u8; 4];

/// Default bubble colors
pub mod bubble_colors {
    use super::Color;

    pub const BACKGROUND: Color = [255, 255, 255, 245];
    pub const BORDER: Color = [124, 92, 214, 255]; // Pixie purple
    pub const TEXT: Color = [33, 33, 40, 255];
}

// ─────────────────────────────────────────────────────────────────────────────
// Placement
// ─────────────────────────────────────────────────────────────────────────────

/// Which side of the anchor the bubble prefers to sit on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Right,
    Left,
    Above,
    Below,
}

impl Side {
    /// The side directly across the anchor
    pub fn opposite(self) -> Self {
        match self {
            Side::Right => Side::Left,
            Side::Left => Side::Right,
            Side::Above => Side::Below,
            Side::Below => Side::Above,
        }
    }

    /// True for sides that place the bubble beside the anchor (not above/below)
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Right | Side::Left)
    }

    /// Parse a side from a config/CLI string (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "right" => Some(Side::Right),
            "left" => Some(Side::Left),
            "above" | "top" => Some(Side::Above),
            "below" | "bottom" => Some(Side::Below),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bubble Behaviour
// ─────────────────────────────────────────────────────────────────────────────

/// Timing and geometry options for a single `show()` call.
///
/// Every field has a serde default so partial config files load cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleOptions {
    /// Milliseconds the fully revealed bubble stays up before fading out
    #[serde(default = "default_auto_hide_ms")]
    pub auto_hide_ms: u64,
    /// Milliseconds between typing ticks
    #[serde(default = "default_typing_interval_ms")]
    pub typing_interval_ms: u64,
    /// Characters revealed per typing tick
    #[serde(default = "default_chars_per_tick")]
    pub chars_per_tick: u32,
    /// When false the whole text appears at once
    #[serde(default = "default_true")]
    pub typing_effect: bool,
    #[serde(default)]
    pub preferred_side: Side,
    /// Milliseconds between anchor position polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_fade_ms")]
    pub fade_in_ms: u64,
    #[serde(default = "default_fade_ms")]
    pub fade_out_ms: u64,
    #[serde(default = "default_fade_step_ms")]
    pub fade_step_ms: u64,
    /// Opacity reached when the fade-in completes (0.0 - 1.0)
    #[serde(default = "default_max_opacity")]
    pub max_opacity: f32,
    /// Fixed bubble width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Pixels between the anchor edge and the bubble
    #[serde(default = "default_gap")]
    pub gap: u32,
}

fn default_auto_hide_ms() -> u64 {
    4000
}
fn default_typing_interval_ms() -> u64 {
    30
}
fn default_chars_per_tick() -> u32 {
    1
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_fade_ms() -> u64 {
    200
}
fn default_fade_step_ms() -> u64 {
    20
}
fn default_max_opacity() -> f32 {
    0.95
}
fn default_width() -> u32 {
    240
}
fn default_padding() -> u32 {
    12
}
fn default_gap() -> u32 {
    12
}

impl Default for BubbleOptions {
    fn default() -> Self {
        Self {
            auto_hide_ms: default_auto_hide_ms(),
            typing_interval_ms: default_typing_interval_ms(),
            chars_per_tick: default_chars_per_tick(),
            typing_effect: true,
            preferred_side: Side::default(),
            poll_interval_ms: default_poll_interval_ms(),
            fade_in_ms: default_fade_ms(),
            fade_out_ms: default_fade_ms(),
            fade_step_ms: default_fade_step_ms(),
            max_opacity: default_max_opacity(),
            width: default_width(),
            padding: default_padding(),
            gap: default_gap(),
        }
    }
}

impl BubbleOptions {
    pub fn with_auto_hide_ms(mut self, ms: u64) -> Self {
        self.auto_hide_ms = ms;
        self
    }

    pub fn with_typing_interval_ms(mut self, ms: u64) -> Self {
        self.typing_interval_ms = ms;
        self
    }

    pub fn with_preferred_side(mut self, side: Side) -> Self {
        self.preferred_side = side;
        self
    }

    /// Copy with every interval raised to at least 1ms, counts to at least 1,
    /// and opacity inside 0.0..=1.0, so no timer can spin.
    pub fn normalized(&self) -> Self {
        Self {
            typing_interval_ms: self.typing_interval_ms.max(1),
            chars_per_tick: self.chars_per_tick.max(1),
            poll_interval_ms: self.poll_interval_ms.max(1),
            fade_step_ms: self.fade_step_ms.max(1),
            max_opacity: self.max_opacity.clamp(0.0, 1.0),
            padding: self.padding.min(self.width / 2),
            ..self.clone()
        }
    }

    /// Width available to text inside the padding
    pub fn content_width(&self) -> u32 {
        self.width.saturating_sub(self.padding * 2)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bubble Appearance
// ─────────────────────────────────────────────────────────────────────────────

/// Visual style of the bubble body and text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleAppearance {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_border")]
    pub border: Color,
    #[serde(default = "default_text_color")]
    pub text_color: Color,
    #[serde(default = "default_corner_radius")]
    pub corner_radius: f32,
    #[serde(default = "default_border_width")]
    pub border_width: f32,
    /// Length of the tail pointing at the anchor
    #[serde(default = "default_tail_size")]
    pub tail_size: f32,
}

fn default_font_size() -> f32 {
    14.0
}
fn default_background() -> Color {
    bubble_colors::BACKGROUND
}
fn default_border() -> Color {
    bubble_colors::BORDER
}
fn default_text_color() -> Color {
    bubble_colors::TEXT
}
fn default_corner_radius() -> f32 {
    10.0
}
fn default_border_width() -> f32 {
    1.5
}
fn default_tail_size() -> f32 {
    10.0
}

impl Default for BubbleAppearance {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            background: default_background(),
            border: default_border(),
            text_color: default_text_color(),
            corner_radius: default_corner_radius(),
            border_width: default_border_width(),
            tail_size: default_tail_size(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted Pixie configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixieConfig {
    #[serde(default)]
    pub bubble: BubbleOptions,
    #[serde(default)]
    pub appearance: BubbleAppearance,
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde Default Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: PixieConfig = toml::from_str("").unwrap();
        assert_eq!(config, PixieConfig::default());
        assert_eq!(config.bubble.auto_hide_ms, 4000);
        assert_eq!(config.bubble.typing_interval_ms, 30);
        assert_eq!(config.bubble.poll_interval_ms, 50);
        assert_eq!(config.bubble.preferred_side, Side::Right);
    }

    #[test]
    fn partial_bubble_section_keeps_other_defaults() {
        let config: PixieConfig = toml::from_str(
            r#"
            [bubble]
            auto_hide_ms = 5000
            preferred_side = "above"

            [appearance]
            font_size = 16.0
            "#,
        )
        .unwrap();

        assert_eq!(config.bubble.auto_hide_ms, 5000);
        assert_eq!(config.bubble.preferred_side, Side::Above);
        assert_eq!(config.bubble.typing_interval_ms, 30);
        assert_eq!(config.appearance.font_size, 16.0);
        assert_eq!(config.appearance.background, bubble_colors::BACKGROUND);
    }

    #[test]
    fn config_survives_toml_round_trip() {
        let mut config = PixieConfig::default();
        config.bubble.preferred_side = Side::Below;
        config.appearance.text_color = [1, 2, 3, 4];

        let text = toml::to_string(&config).unwrap();
        let parsed: PixieConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn opposite_sides_pair_up() {
        for side in [Side::Right, Side::Left, Side::Above, Side::Below] {
            assert_eq!(side.opposite().opposite(), side);
            assert_ne!(side.opposite(), side);
            assert_eq!(side.opposite().is_horizontal(), side.is_horizontal());
        }
    }

    #[test]
    fn side_names_parse() {
        assert_eq!(Side::from_name("Right"), Some(Side::Right));
        assert_eq!(Side::from_name("top"), Some(Side::Above));
        assert_eq!(Side::from_name("BELOW"), Some(Side::Below));
        assert_eq!(Side::from_name("diagonal"), None);
    }

    #[test]
    fn normalized_options_never_have_zero_intervals() {
        let options = BubbleOptions {
            typing_interval_ms: 0,
            chars_per_tick: 0,
            poll_interval_ms: 0,
            fade_step_ms: 0,
            max_opacity: 3.0,
            ..BubbleOptions::default()
        }
        .normalized();

        assert_eq!(options.typing_interval_ms, 1);
        assert_eq!(options.chars_per_tick, 1);
        assert_eq!(options.poll_interval_ms, 1);
        assert_eq!(options.fade_step_ms, 1);
        assert_eq!(options.max_opacity, 1.0);
    }

    #[test]
    fn content_width_excludes_padding() {
        let options = BubbleOptions::default();
        assert_eq!(options.content_width(), 240 - 24);
    }
}
