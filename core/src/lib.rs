pub mod bubble;
pub mod context;
pub mod geometry;

// Re-exports for convenience
pub use bubble::{
    Anchor, BubbleRegistry, BubbleState, BubbleSurface, Clock, Dismissal, FixedScreen,
    FollowingOverlay, ManualClock, MonospaceLayout, ScreenBounds, SystemClock, TextLayout,
};
pub use context::{ConfigError, PixieConfigExt};
pub use geometry::{Placement, Rect, Size};
pub use pixie_types::{BubbleAppearance, BubbleOptions, PixieConfig, Side};
