//! Independent bubbles keyed by anchor
//!
//! Each entry is a full `FollowingOverlay`; showing or hiding one never
//! touches another.

use std::hash::Hash;
use std::time::Instant;

use hashbrown::HashMap;
use pixie_types::BubbleOptions;
use tracing::debug;

use super::{BubbleSurface, FollowingOverlay};

pub struct BubbleRegistry<K, S: BubbleSurface> {
    bubbles: HashMap<K, FollowingOverlay<S>>,
}

impl<K: Eq + Hash + std::fmt::Debug, S: BubbleSurface> BubbleRegistry<K, S> {
    pub fn new() -> Self {
        Self {
            bubbles: HashMap::new(),
        }
    }

    /// Register a bubble for `key`, returning the one it replaced
    pub fn insert(&mut self, key: K, bubble: FollowingOverlay<S>) -> Option<FollowingOverlay<S>> {
        self.bubbles.insert(key, bubble)
    }

    /// Drop the bubble for `key`, hiding it first
    pub fn remove(&mut self, key: &K) -> Option<FollowingOverlay<S>> {
        let mut bubble = self.bubbles.remove(key)?;
        bubble.hide();
        debug!(key = ?key, "Bubble removed");
        Some(bubble)
    }

    pub fn get(&self, key: &K) -> Option<&FollowingOverlay<S>> {
        self.bubbles.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut FollowingOverlay<S>> {
        self.bubbles.get_mut(key)
    }

    /// Show text on one bubble. Returns false if `key` is unknown.
    pub fn show(&mut self, key: &K, text: &str, options: &BubbleOptions) -> bool {
        match self.bubbles.get_mut(key) {
            Some(bubble) => {
                bubble.show(text, options);
                true
            }
            None => {
                debug!(key = ?key, "No bubble registered");
                false
            }
        }
    }

    pub fn hide(&mut self, key: &K) {
        if let Some(bubble) = self.bubbles.get_mut(key) {
            bubble.hide();
        }
    }

    pub fn hide_all(&mut self) {
        for bubble in self.bubbles.values_mut() {
            bubble.hide();
        }
    }

    /// Drive every bubble's timers
    pub fn tick_all(&mut self) {
        for bubble in self.bubbles.values_mut() {
            bubble.tick();
        }
    }

    pub fn is_visible(&self, key: &K) -> bool {
        self.bubbles.get(key).is_some_and(FollowingOverlay::is_visible)
    }

    pub fn visible_count(&self) -> usize {
        self.bubbles.values().filter(|b| b.is_visible()).count()
    }

    /// Earliest deadline across all bubbles
    pub fn next_deadline(&self) -> Option<Instant> {
        self.bubbles
            .values()
            .filter_map(FollowingOverlay::next_deadline)
            .min()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }
}

impl<K: Eq + Hash + std::fmt::Debug, S: BubbleSurface> Default for BubbleRegistry<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bubble::{BubbleState, FixedScreen, ManualClock, MonospaceLayout};
    use crate::geometry::Rect;

    #[derive(Default)]
    struct NullSurface;

    impl BubbleSurface for NullSurface {
        fn set_rect(&mut self, _rect: Rect) {}
        fn set_opacity(&mut self, _opacity: f32) {}
        fn render_text(&mut self, _visible: &str, _lines: &[String]) {}
        fn show(&mut self) {}
        fn hide(&mut self) {}
    }

    struct Pet(Rect);

    impl crate::bubble::Anchor for Pet {
        fn rect(&self) -> Rect {
            self.0
        }
        fn is_alive(&self) -> bool {
            true
        }
    }

    fn bubble(x: i32, clock: &ManualClock) -> FollowingOverlay<NullSurface> {
        FollowingOverlay::new(
            Pet(Rect::new(x, 100, 50, 50)),
            FixedScreen(Rect::new(0, 0, 1920, 1080)),
            MonospaceLayout::default(),
            NullSurface,
        )
        .with_clock(clock.clone())
    }

    fn registry(clock: &ManualClock) -> BubbleRegistry<&'static str, NullSurface> {
        let mut registry = BubbleRegistry::new();
        registry.insert("cat", bubble(100, clock));
        registry.insert("dog", bubble(600, clock));
        registry
    }

    #[test]
    fn bubbles_are_independent() {
        let clock = ManualClock::new();
        let mut registry = registry(&clock);

        assert!(registry.show(&"cat", "meow", &BubbleOptions::default()));
        assert!(registry.is_visible(&"cat"));
        assert!(!registry.is_visible(&"dog"));

        registry.show(&"dog", "woof", &BubbleOptions::default());
        registry.hide(&"cat");
        assert!(!registry.is_visible(&"cat"));
        assert!(registry.is_visible(&"dog"));
        assert_eq!(registry.visible_count(), 1);
    }

    #[test]
    fn unknown_key_is_reported() {
        let clock = ManualClock::new();
        let mut registry = registry(&clock);
        assert!(!registry.show(&"fish", "blub", &BubbleOptions::default()));
        assert_eq!(registry.visible_count(), 0);
    }

    #[test]
    fn tick_all_drives_every_bubble() {
        let clock = ManualClock::new();
        let mut registry = registry(&clock);
        registry.show(&"cat", "meow", &BubbleOptions::default());
        registry.show(&"dog", "woof", &BubbleOptions::default());

        clock.advance(Duration::from_millis(200));
        registry.tick_all();

        for key in ["cat", "dog"] {
            assert_eq!(
                registry.get(&key).map(|b| b.state()),
                Some(BubbleState::Typing)
            );
        }
    }

    #[test]
    fn next_deadline_is_earliest_across_bubbles() {
        let clock = ManualClock::new();
        let mut registry = registry(&clock);
        assert_eq!(registry.next_deadline(), None);

        registry.show(&"cat", "meow", &BubbleOptions::default());
        let cat = registry.get(&"cat").and_then(|b| b.next_deadline());
        assert_eq!(registry.next_deadline(), cat);
    }

    #[test]
    fn hide_all_and_remove() {
        let clock = ManualClock::new();
        let mut registry = registry(&clock);
        registry.show(&"cat", "meow", &BubbleOptions::default());
        registry.show(&"dog", "woof", &BubbleOptions::default());

        registry.hide_all();
        assert_eq!(registry.visible_count(), 0);

        assert!(registry.remove(&"cat").is_some());
        assert!(registry.remove(&"cat").is_none());
        assert_eq!(registry.len(), 1);
    }
}
