//! Interfaces the bubble consumes from the host application
//!
//! The bubble only ever reads from the anchor and the screen query; the
//! surface is the one thing it owns and drives.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixie_types::Side;

use super::BubbleState;
use crate::geometry::Rect;

/// The movable surface the bubble follows (the pet window).
pub trait Anchor {
    /// Current on-screen rectangle
    fn rect(&self) -> Rect;

    /// False once the underlying surface is gone
    fn is_alive(&self) -> bool;
}

impl<T: Anchor + ?Sized> Anchor for Rc<T> {
    fn rect(&self) -> Rect {
        (**self).rect()
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

impl<T: Anchor + ?Sized> Anchor for Arc<T> {
    fn rect(&self) -> Rect {
        (**self).rect()
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

/// Resolves the usable display area around a rectangle.
pub trait ScreenBounds {
    /// Bounds of the display containing `rect`, or `None` if there is no display
    fn screen_bounds_for(&self, rect: Rect) -> Option<Rect>;
}

/// A single fixed screen, for headless hosts and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScreen(pub Rect);

impl ScreenBounds for FixedScreen {
    fn screen_bounds_for(&self, _rect: Rect) -> Option<Rect> {
        Some(self.0)
    }
}

/// Word-wraps text for the bubble. Glyph rendering is not its concern.
pub trait TextLayout {
    /// Break `text` into display lines no wider than `max_width` pixels
    fn wrap(&mut self, text: &str, max_width: f32) -> Vec<String>;

    /// Height of one wrapped line in pixels
    fn line_height(&self) -> f32;
}

/// The bubble's own window/surface.
///
/// Every call is cosmetic; implementations swallow their own failures.
pub trait BubbleSurface {
    /// Move/resize the bubble
    fn set_rect(&mut self, rect: Rect);

    /// Side of the anchor the bubble sits on (tail direction)
    fn set_side(&mut self, _side: Side) {}

    /// Overall opacity, 0.0 - 1.0
    fn set_opacity(&mut self, opacity: f32);

    /// Draw the revealed text. `lines` is `visible` already wrapped.
    fn render_text(&mut self, visible: &str, lines: &[String]);

    fn show(&mut self);

    fn hide(&mut self);

    /// Lifecycle notification, called after every state change
    fn on_state(&mut self, _state: BubbleState) {}
}

/// Time source for the timer queue
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, at: Instant) {
        self.now.set(at);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
