//! The following speech bubble
//!
//! One `FollowingOverlay` owns one bubble surface and at most one live
//! session. Starting a new session supersedes the old one: its timers are
//! dropped and the generation counter moves on, so anything still carrying
//! the old generation is ignored when it fires.

use std::time::{Duration, Instant};

use pixie_types::{BubbleOptions, Side};
use tracing::{debug, trace};

use super::timers::{Timer, TimerId, TimerKind, TimerQueue, next_without_catch_up};
use super::{
    Anchor, BubbleState, BubbleSurface, Clock, Dismissal, ScreenBounds, SystemClock, TextLayout,
};
use crate::geometry::{self, Placement, Rect, Size};

#[inline]
fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Fraction of `total_ms` covered by `elapsed`, saturating at 1.0
fn progress(elapsed: Duration, total_ms: u64) -> f32 {
    let elapsed_ms = elapsed.as_millis() as u64;
    if elapsed_ms >= total_ms {
        1.0
    } else {
        elapsed_ms as f32 / total_ms as f32
    }
}

/// Runtime state of the bubble currently on screen
struct Session {
    text: String,
    char_count: usize,
    visible_chars: usize,
    options: BubbleOptions,
    size: Size,
    rect: Rect,
    side: Side,
    anchor_last_rect: Rect,
    opacity: f32,
    /// Opacity when the fade-out started
    fade_from: f32,
    created_at: Instant,
    /// When the current state was entered
    phase_started: Instant,
    auto_hide_at: Option<Instant>,
    phase_timer: Option<TimerId>,
    track_timer: Option<TimerId>,
}

impl Session {
    fn visible_text(&self) -> &str {
        let end = self
            .text
            .char_indices()
            .nth(self.visible_chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[..end]
    }
}

fn render_visible<S: BubbleSurface>(layout: &mut dyn TextLayout, surface: &mut S, session: &Session) {
    let visible = session.visible_text();
    let lines = layout.wrap(visible, session.options.content_width() as f32);
    surface.render_text(visible, &lines);
}

/// A speech bubble that stays next to a movable anchor.
pub struct FollowingOverlay<S: BubbleSurface> {
    anchor: Box<dyn Anchor>,
    screens: Box<dyn ScreenBounds>,
    layout: Box<dyn TextLayout>,
    clock: Box<dyn Clock>,
    surface: S,
    timers: TimerQueue,
    state: BubbleState,
    generation: u64,
    session: Option<Session>,
    last_dismissal: Option<Dismissal>,
}

impl<S: BubbleSurface> FollowingOverlay<S> {
    pub fn new(
        anchor: impl Anchor + 'static,
        screens: impl ScreenBounds + 'static,
        layout: impl TextLayout + 'static,
        surface: S,
    ) -> Self {
        Self {
            anchor: Box::new(anchor),
            screens: Box::new(screens),
            layout: Box::new(layout),
            clock: Box::new(SystemClock),
            surface,
            timers: TimerQueue::new(),
            state: BubbleState::Hidden,
            generation: 0,
            session: None,
            last_dismissal: None,
        }
    }

    /// Replace the time source (tests, simulations)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Caller Interface
    // ─────────────────────────────────────────────────────────────────────────

    /// Show `text` next to the anchor, replacing any bubble already up.
    ///
    /// Empty text is ignored and leaves the current bubble alone. A dead
    /// anchor or an impossible placement leaves the bubble hidden.
    pub fn show(&mut self, text: &str, options: &BubbleOptions) {
        if text.is_empty() {
            debug!("Ignoring bubble with empty text");
            return;
        }

        self.timers.clear();
        self.session = None;
        self.generation += 1;

        if !self.anchor.is_alive() {
            self.finish(Dismissal::AnchorUnavailable);
            return;
        }

        let options = options.normalized();
        let now = self.clock.now();
        let anchor_rect = self.anchor.rect();
        let size = self.bubble_size(text, &options);

        let Some(placement) =
            self.place(anchor_rect, size, options.preferred_side, options.gap)
        else {
            self.finish(Dismissal::PlacementImpossible);
            return;
        };

        let char_count = text.chars().count();
        self.session = Some(Session {
            text: text.to_string(),
            char_count,
            visible_chars: 0,
            options,
            size,
            rect: placement.rect,
            side: placement.side,
            anchor_last_rect: anchor_rect,
            opacity: 0.0,
            fade_from: 0.0,
            created_at: now,
            phase_started: now,
            auto_hide_at: None,
            phase_timer: None,
            track_timer: None,
        });

        self.surface.set_rect(placement.rect);
        self.surface.set_side(placement.side);
        self.surface.set_opacity(0.0);
        self.surface.render_text("", &[]);
        self.surface.show();

        debug!(
            generation = self.generation,
            chars = char_count,
            rect = ?placement.rect,
            side = ?placement.side,
            "Bubble shown"
        );

        // The old session's state must not leak into the new one's transitions
        self.state = BubbleState::Hidden;
        self.start_tracking(now);
        self.enter(BubbleState::FadingIn, now);
    }

    /// Dismiss the bubble now. Idempotent.
    ///
    /// Passes through `FadingOut` and lands in `Hidden` before returning;
    /// no timer survives the call.
    pub fn hide(&mut self) {
        if self.state == BubbleState::Hidden {
            return;
        }
        if self.state != BubbleState::FadingOut {
            self.state = BubbleState::FadingOut;
            self.surface.on_state(BubbleState::FadingOut);
        }
        self.finish(Dismissal::Requested);
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Host Loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Fire every timer that is due. Call this from the host's loop.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        while let Some(timer) = self.timers.pop_due(now) {
            self.fire(timer, now);
        }
    }

    /// Earliest time `tick()` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> BubbleState {
        self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Text revealed so far ("" when hidden)
    pub fn visible_text(&self) -> &str {
        self.session.as_ref().map_or("", Session::visible_text)
    }

    /// Characters revealed so far
    pub fn visible_chars(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.visible_chars)
    }

    /// Current bubble rectangle, if a session is live
    pub fn rect(&self) -> Option<Rect> {
        self.session.as_ref().map(|s| s.rect)
    }

    pub fn side(&self) -> Option<Side> {
        self.session.as_ref().map(|s| s.side)
    }

    pub fn opacity(&self) -> f32 {
        self.session.as_ref().map_or(0.0, |s| s.opacity)
    }

    pub fn shown_at(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.created_at)
    }

    pub fn auto_hide_at(&self) -> Option<Instant> {
        self.session.as_ref().and_then(|s| s.auto_hide_at)
    }

    /// True while the anchor poll is scheduled
    pub fn is_tracking(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.track_timer)
            .is_some_and(|id| self.timers.contains(id))
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Identifier of the current (or last) session
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_dismissal(&self) -> Option<Dismissal> {
        self.last_dismissal
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Bubble size for the fully revealed text, fixed for the whole session
    fn bubble_size(&mut self, text: &str, options: &BubbleOptions) -> Size {
        let lines = self.layout.wrap(text, options.content_width() as f32);
        let text_height = (lines.len().max(1) as f32 * self.layout.line_height()).ceil() as u32;
        Size::new(options.width, text_height + options.padding * 2)
    }

    fn place(&self, anchor_rect: Rect, size: Size, side: Side, gap: u32) -> Option<Placement> {
        let screen = self.screens.screen_bounds_for(anchor_rect)?;
        geometry::place(anchor_rect, size, side, gap, screen)
    }

    fn start_tracking(&mut self, now: Instant) {
        let generation = self.generation;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let due = now + ms(session.options.poll_interval_ms);
        session.track_timer = Some(self.timers.schedule(TimerKind::Track, due, generation));
    }

    /// Switch state, cancelling the previous state's timer first
    fn enter(&mut self, state: BubbleState, at: Instant) {
        let generation = self.generation;
        let leaving_typing = self.state == BubbleState::Typing && state != BubbleState::Typing;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Some(id) = session.phase_timer.take() {
            self.timers.cancel(id);
        }
        if leaving_typing {
            session.visible_chars = session.char_count;
        }
        session.phase_started = at;
        self.state = state;
        self.surface.on_state(state);
        debug!(generation, state = ?state, "Bubble state changed");

        let mut next = None;
        let mut timed_out = false;

        match state {
            BubbleState::FadingIn => {
                if session.options.fade_in_ms == 0 {
                    session.opacity = session.options.max_opacity;
                    self.surface.set_opacity(session.opacity);
                    next = Some(BubbleState::Typing);
                } else {
                    let due = at + ms(session.options.fade_step_ms);
                    session.phase_timer =
                        Some(self.timers.schedule(TimerKind::Fade, due, generation));
                }
            }
            BubbleState::Typing => {
                if session.options.typing_effect {
                    let due = at + ms(session.options.typing_interval_ms);
                    session.phase_timer =
                        Some(self.timers.schedule(TimerKind::Type, due, generation));
                } else {
                    session.visible_chars = session.char_count;
                    render_visible(self.layout.as_mut(), &mut self.surface, session);
                    next = Some(BubbleState::Visible);
                }
            }
            BubbleState::Visible => {
                let deadline = at + ms(session.options.auto_hide_ms);
                session.auto_hide_at = Some(deadline);
                session.phase_timer =
                    Some(self.timers.schedule(TimerKind::Deadline, deadline, generation));
            }
            BubbleState::FadingOut => {
                if let Some(id) = session.track_timer.take() {
                    self.timers.cancel(id);
                }
                session.fade_from = session.opacity;
                if session.options.fade_out_ms == 0 {
                    timed_out = true;
                } else {
                    let due = at + ms(session.options.fade_step_ms);
                    session.phase_timer =
                        Some(self.timers.schedule(TimerKind::Fade, due, generation));
                }
            }
            BubbleState::Hidden => {}
        }

        if timed_out {
            self.finish(Dismissal::TimedOut);
        } else if let Some(next) = next {
            self.enter(next, at);
        }
    }

    /// End the session: drop timers and hide the surface
    fn finish(&mut self, reason: Dismissal) {
        self.timers.clear();
        self.session = None;
        self.generation += 1;
        self.last_dismissal = Some(reason);

        if self.state != BubbleState::Hidden {
            self.state = BubbleState::Hidden;
            self.surface.set_opacity(0.0);
            self.surface.hide();
            self.surface.on_state(BubbleState::Hidden);
        }

        debug!(generation = self.generation, reason = ?reason, "Bubble dismissed");
    }

    fn fire(&mut self, timer: Timer, now: Instant) {
        if timer.generation != self.generation || self.session.is_none() {
            trace!(
                timer_generation = timer.generation,
                generation = self.generation,
                "Ignoring stale bubble timer"
            );
            return;
        }

        match timer.kind {
            TimerKind::Track => self.on_track(timer, now),
            TimerKind::Fade => self.on_fade(timer),
            TimerKind::Type => self.on_type(timer),
            TimerKind::Deadline => self.on_deadline(timer),
        }
    }

    fn on_track(&mut self, timer: Timer, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            session.track_timer = None;
        }
        if !self.state.is_visible() {
            return;
        }

        if !self.anchor.is_alive() {
            self.finish(Dismissal::AnchorUnavailable);
            return;
        }

        let rect = self.anchor.rect();
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let (size, side, gap, last) = (
            session.size,
            session.options.preferred_side,
            session.options.gap,
            session.anchor_last_rect,
        );
        let poll = ms(session.options.poll_interval_ms);

        if rect != last {
            let Some(placement) = self.place(rect, size, side, gap) else {
                self.finish(Dismissal::PlacementImpossible);
                return;
            };
            let Some(session) = self.session.as_mut() else {
                return;
            };
            session.anchor_last_rect = rect;
            if placement.rect != session.rect {
                session.rect = placement.rect;
                self.surface.set_rect(placement.rect);
            }
            if placement.side != session.side {
                session.side = placement.side;
                self.surface.set_side(placement.side);
            }
            trace!(anchor = ?rect, bubble = ?placement.rect, "Bubble followed anchor");
        }

        let due = next_without_catch_up(timer.due, poll, now);
        let id = self.timers.schedule(TimerKind::Track, due, self.generation);
        if let Some(session) = self.session.as_mut() {
            session.track_timer = Some(id);
        }
    }

    fn on_fade(&mut self, timer: Timer) {
        let at = timer.due;
        let generation = self.generation;
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.phase_timer = None;
        let elapsed = at.saturating_duration_since(session.phase_started);

        let done = match state {
            BubbleState::FadingIn => {
                let p = progress(elapsed, session.options.fade_in_ms);
                session.opacity = session.options.max_opacity * p;
                p >= 1.0
            }
            BubbleState::FadingOut => {
                let p = progress(elapsed, session.options.fade_out_ms);
                session.opacity = session.fade_from * (1.0 - p);
                p >= 1.0
            }
            _ => return,
        };
        self.surface.set_opacity(session.opacity);

        if !done {
            let due = at + ms(session.options.fade_step_ms);
            session.phase_timer = Some(self.timers.schedule(TimerKind::Fade, due, generation));
        } else if state == BubbleState::FadingIn {
            self.enter(BubbleState::Typing, at);
        } else {
            self.finish(Dismissal::TimedOut);
        }
    }

    fn on_type(&mut self, timer: Timer) {
        let at = timer.due;
        let generation = self.generation;
        if self.state != BubbleState::Typing {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.phase_timer = None;

        let step = session.options.chars_per_tick as usize;
        session.visible_chars = (session.visible_chars + step).min(session.char_count);
        render_visible(self.layout.as_mut(), &mut self.surface, session);

        if session.visible_chars < session.char_count {
            let due = at + ms(session.options.typing_interval_ms);
            session.phase_timer = Some(self.timers.schedule(TimerKind::Type, due, generation));
        } else {
            self.enter(BubbleState::Visible, at);
        }
    }

    fn on_deadline(&mut self, timer: Timer) {
        if self.state == BubbleState::Visible {
            self.enter(BubbleState::FadingOut, timer.due);
        }
    }
}
