//! Pixie Overlay Library
//!
//! Pixels and OS windows for the following speech bubble.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    spawn                            │
//! │        host thread + BubbleCommand channel          │
//! ├─────────────────────────────────────────────────────┤
//! │          pixie-core FollowingOverlay                │
//! │     (state machine, timers, placement)              │
//! ├──────────────────────────┬──────────────────────────┤
//! │         surface          │         layout           │
//! │      PixmapSurface       │      CosmicLayout        │
//! ├──────────────────────────┴──────────────────────────┤
//! │                    renderer                         │
//! │            tiny-skia + cosmic-text                  │
//! ├─────────────────────────────────────────────────────┤
//! │                    platform/                        │
//! │      monitors, MonitorBounds, x11 window            │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod layout;
pub mod logging;
pub mod platform;
pub mod renderer;
pub mod spawn;
pub mod surface;
pub mod utils;

// Re-export commonly used types
pub use layout::CosmicLayout;
pub use platform::{MonitorBounds, MonitorInfo, PlatformError, get_all_monitors};
pub use renderer::Renderer;
pub use spawn::{BubbleCommand, BubbleHandle, HostedBubble, spawn_bubble};
pub use surface::{BubbleWindow, PixmapSurface, SnapshotError};

#[cfg(all(unix, not(target_os = "macos")))]
pub use platform::x11::X11BubbleWindow;

// Re-export tiny_skia Color for external use
pub use tiny_skia::Color;
