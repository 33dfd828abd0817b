//! Bubble host thread
//!
//! # Threading Model
//!
//! A `FollowingOverlay` is single-threaded (its anchor and layout are not
//! `Send`), and X11 resources are best used from the thread that made them.
//! The bubble is therefore created INSIDE the spawned thread via a factory
//! function and only reached through a command channel.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pixie_core::FollowingOverlay;
use pixie_types::BubbleOptions;
use tokio::sync::mpsc::{self, Sender, error::TryRecvError};
use tokio::sync::oneshot;

use crate::platform::PlatformError;
use crate::surface::PixmapSurface;

/// Longest the loop sleeps while idle, also the command latency bound
const MAX_SLEEP: Duration = Duration::from_millis(16);
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// The bubble every host thread drives
pub type HostedBubble = FollowingOverlay<PixmapSurface>;

/// Commands accepted by the host thread
#[derive(Debug)]
pub enum BubbleCommand {
    Show { text: String, options: BubbleOptions },
    Hide,
    IsVisible(oneshot::Sender<bool>),
    Shutdown,
}

/// Handle to a running bubble thread
pub struct BubbleHandle {
    pub tx: Sender<BubbleCommand>,
    pub handle: JoinHandle<()>,
}

impl BubbleHandle {
    /// Queue a message. Must not be called from inside an async runtime.
    pub fn show(&self, text: impl Into<String>, options: BubbleOptions) -> bool {
        self.tx
            .blocking_send(BubbleCommand::Show {
                text: text.into(),
                options,
            })
            .is_ok()
    }

    pub fn hide(&self) -> bool {
        self.tx.blocking_send(BubbleCommand::Hide).is_ok()
    }

    /// Ask the thread whether the bubble is up. False if the thread is gone.
    pub fn is_visible(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.blocking_send(BubbleCommand::IsVisible(reply_tx)).is_err() {
            return false;
        }
        reply_rx.blocking_recv().unwrap_or(false)
    }

    /// Stop the thread and wait for it
    pub fn shutdown(self) {
        let _ = self.tx.blocking_send(BubbleCommand::Shutdown);
        if self.handle.join().is_err() {
            tracing::error!("Bubble thread panicked");
        }
    }
}

/// How long the loop may sleep before the next timer is due
pub fn sleep_until(next_deadline: Option<Instant>, now: Instant) -> Duration {
    match next_deadline {
        Some(due) => due.saturating_duration_since(now).clamp(MIN_SLEEP, MAX_SLEEP),
        None => MAX_SLEEP,
    }
}

/// Spawn a bubble using a factory function that creates it inside the thread.
///
/// Returns `Err` if creation fails (confirmed via channel from the spawned
/// thread). The loop drains commands, fires due timers, renders, and sleeps
/// until the next deadline.
pub fn spawn_bubble<F>(create_bubble: F) -> Result<BubbleHandle, PlatformError>
where
    F: FnOnce() -> Result<HostedBubble, PlatformError> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<BubbleCommand>(32);

    // Creation result comes back from the spawned thread
    let (confirm_tx, confirm_rx) = std::sync::mpsc::channel::<Result<(), PlatformError>>();

    let handle = thread::spawn(move || {
        let mut bubble = match create_bubble() {
            Ok(b) => {
                let _ = confirm_tx.send(Ok(()));
                b
            }
            Err(e) => {
                let _ = confirm_tx.send(Err(e));
                return;
            }
        };

        tracing::debug!("Bubble thread started");

        loop {
            loop {
                match rx.try_recv() {
                    Ok(BubbleCommand::Show { text, options }) => bubble.show(&text, &options),
                    Ok(BubbleCommand::Hide) => bubble.hide(),
                    Ok(BubbleCommand::IsVisible(reply)) => {
                        let _ = reply.send(bubble.is_visible());
                    }
                    Ok(BubbleCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                        bubble.hide();
                        tracing::debug!("Bubble thread stopping");
                        return;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            bubble.tick();

            let surface = bubble.surface_mut();
            surface.flush();
            if !surface.poll_window() {
                tracing::warn!("Bubble window closed; stopping thread");
                bubble.hide();
                break;
            }

            thread::sleep(sleep_until(bubble.next_deadline(), Instant::now()));
        }
    });

    match confirm_rx.recv() {
        Ok(Ok(())) => Ok(BubbleHandle { tx, handle }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PlatformError::Other(
            "Bubble thread exited before confirming creation".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use pixie_core::{Anchor, MonospaceLayout, Rect};
    use pixie_types::BubbleAppearance;

    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::platform::MonitorBounds;
    use crate::surface::BubbleWindow;

    struct StillPet;

    impl Anchor for StillPet {
        fn rect(&self) -> Rect {
            Rect::new(100, 100, 64, 64)
        }
        fn is_alive(&self) -> bool {
            true
        }
    }

    fn headless() -> Result<HostedBubble, PlatformError> {
        Ok(FollowingOverlay::new(
            StillPet,
            MonitorBounds::single(1000, 800),
            MonospaceLayout::default(),
            PixmapSurface::new(BubbleAppearance::default(), 12),
        ))
    }

    #[test]
    fn test_command_round_trip() {
        let bubble = spawn_bubble(headless).unwrap();
        assert!(!bubble.is_visible());

        assert!(bubble.show("Hello from the thread", BubbleOptions::default()));
        assert!(bubble.is_visible());

        assert!(bubble.hide());
        assert!(!bubble.is_visible());

        bubble.shutdown();
    }

    #[test]
    fn test_bubble_times_out_on_its_own() {
        let bubble = spawn_bubble(headless).unwrap();
        let options = BubbleOptions {
            auto_hide_ms: 10,
            fade_in_ms: 0,
            fade_out_ms: 0,
            typing_effect: false,
            ..BubbleOptions::default()
        };
        bubble.show("brief", options);

        let deadline = Instant::now() + Duration::from_secs(5);
        while bubble.is_visible() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!bubble.is_visible());
        bubble.shutdown();
    }

    /// Window that reports itself closed as soon as it has been shown
    struct ClosingWindow {
        visible: bool,
        calls: Arc<Mutex<Vec<bool>>>,
    }

    impl BubbleWindow for ClosingWindow {
        fn set_geometry(&mut self, _rect: Rect) {}
        fn present(&mut self, _pixels: &[u8]) {}
        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
            self.calls.lock().unwrap().push(visible);
        }
        fn poll_events(&mut self) -> bool {
            !self.visible
        }
    }

    #[test]
    fn test_closed_window_hides_bubble_before_exit() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let window_calls = calls.clone();
        let bubble = spawn_bubble(move || {
            let window = ClosingWindow {
                visible: false,
                calls: window_calls,
            };
            Ok(FollowingOverlay::new(
                StillPet,
                MonitorBounds::single(1000, 800),
                MonospaceLayout::default(),
                PixmapSurface::new(BubbleAppearance::default(), 12).with_window(window),
            ))
        })
        .unwrap();

        assert!(bubble.show("closing soon", BubbleOptions::default()));
        let BubbleHandle { tx, handle } = bubble;
        handle.join().unwrap();
        drop(tx);

        assert_eq!(*calls.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_factory_failure_is_reported() {
        let result = spawn_bubble(|| Err(PlatformError::ConnectionFailed("no display".into())));
        assert!(matches!(result, Err(PlatformError::ConnectionFailed(_))));
    }

    #[test]
    fn test_sleep_is_bounded() {
        let now = Instant::now();
        assert_eq!(sleep_until(None, now), MAX_SLEEP);
        assert_eq!(sleep_until(Some(now), now), MIN_SLEEP);
        assert_eq!(
            sleep_until(Some(now + Duration::from_millis(5)), now),
            Duration::from_millis(5)
        );
        assert_eq!(
            sleep_until(Some(now + Duration::from_secs(2)), now),
            MAX_SLEEP
        );
    }
}
