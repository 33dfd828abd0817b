//! Speech bubble that follows a movable anchor
//!
//! This module provides:
//! - **FollowingOverlay**: one bubble's lifecycle (fade in, typing reveal,
//!   auto-hide) while it stays glued to its anchor
//! - **Collaborators**: the traits the host implements (anchor, screen
//!   query, text layout, surface, clock)
//! - **Registry**: independent bubbles keyed by anchor identity
//!
//! # Lifecycle
//!
//! ```text
//! Hidden ──show()──▶ FadingIn ──fade done──▶ Typing ──all chars──▶ Visible
//!                        │                      │                     │
//!                        └──────── hide() ──────┴── hide()/deadline ──┘
//!                                               ▼
//!                                          FadingOut ──fade done──▶ Hidden
//!
//! any state ──anchor dead / no placement──▶ Hidden (skips FadingOut)
//! ```
//!
//! Everything runs on the host's thread. The host calls
//! [`FollowingOverlay::tick`] from its loop and may sleep until
//! [`FollowingOverlay::next_deadline`].

mod collaborators;
mod layout;
mod overlay;
mod registry;
pub mod timers;


pub use collaborators::{
    Anchor, BubbleSurface, Clock, FixedScreen, ManualClock, ScreenBounds, SystemClock, TextLayout,
};
pub use layout::MonospaceLayout;
pub use overlay::FollowingOverlay;
pub use registry::BubbleRegistry;

/// Lifecycle stage of the bubble
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BubbleState {
    #[default]
    Hidden,
    FadingIn,
    Typing,
    Visible,
    FadingOut,
}

impl BubbleState {
    /// Bubble is on screen and not on its way out
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            BubbleState::FadingIn | BubbleState::Typing | BubbleState::Visible
        )
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dismissal {
    /// `hide()` was called
    Requested,
    /// The auto-hide deadline passed and the fade-out finished
    TimedOut,
    /// The anchor reported itself dead
    AnchorUnavailable,
    /// No on-screen rectangle fits next to the anchor
    PlacementImpossible,
}
