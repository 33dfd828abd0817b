//! Speech bubble demo
//!
//! Shows a bubble next to a scripted "pet" that gets dragged across the
//! screen. Headless by default: the bubble runs on a manual clock and every
//! rendered frame can be written out as PNG. With `--x11` the bubble is shown
//! in a real window on a background thread.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use pixie_core::{
    Anchor, BubbleState, Clock, FollowingOverlay, ManualClock, PixieConfigExt, Rect,
};
use pixie_overlay::{CosmicLayout, MonitorBounds, PixmapSurface, PlatformError, SnapshotError};
use pixie_types::{BubbleOptions, PixieConfig, Side};
use thiserror::Error;

/// Simulated time per headless step
const STEP: Duration = Duration::from_millis(10);
/// Give up on a bubble that never hides
const MAX_SIMULATED: Duration = Duration::from_secs(120);

#[derive(Parser, Debug)]
#[command(
    name = "pixie-bubble",
    version,
    about = "Show a speech bubble that follows a dragged pet"
)]
struct Args {
    /// Message to show
    #[arg(long, default_value = "Hi! I'm Pixie! 🐱✨")]
    text: String,

    /// Preferred side of the pet: right, left, above, below
    #[arg(long, value_parser = parse_side)]
    side: Option<Side>,

    #[arg(long)]
    auto_hide_ms: Option<u64>,

    #[arg(long)]
    typing_interval_ms: Option<u64>,

    /// Write every rendered frame here as PNG (headless only)
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Show the bubble in a real X11 window
    #[arg(long)]
    x11: bool,

    /// Headless screen size, WxH
    #[arg(long, default_value = "1280x720", value_parser = parse_screen)]
    screen: (u32, u32),
}

fn parse_side(s: &str) -> Result<Side, String> {
    Side::from_name(s).ok_or_else(|| format!("unknown side '{s}' (right, left, above, below)"))
}

fn parse_screen(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if w == 0 || h == 0 {
        return Err("screen size must be non-zero".to_string());
    }
    Ok((w, h))
}

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("failed to create frames directory")]
    FramesDir(#[source] std::io::Error),

    #[error("{0}")]
    Unsupported(&'static str),
}

fn main() -> ExitCode {
    let _log_guard = pixie_overlay::logging::init();
    let args = Args::parse();

    let config = PixieConfig::load();
    let mut options = config.bubble.clone();
    if let Some(side) = args.side {
        options.preferred_side = side;
    }
    if let Some(ms) = args.auto_hide_ms {
        options.auto_hide_ms = ms;
    }
    if let Some(ms) = args.typing_interval_ms {
        options.typing_interval_ms = ms;
    }

    let result = if args.x11 {
        run_x11(&args.text, options, &config)
    } else {
        run_headless(&args, options, &config)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Demo failed");
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Headless
// ─────────────────────────────────────────────────────────────────────────────

/// Pet whose position the script sets directly
struct DraggedPet {
    rect: Cell<Rect>,
}

impl Anchor for DraggedPet {
    fn rect(&self) -> Rect {
        self.rect.get()
    }

    fn is_alive(&self) -> bool {
        true
    }
}

/// Pet position `elapsed` into the script: sit still, then get dragged to
/// the right edge so the bubble has to flip sides.
fn scripted_position(start: Rect, screen_width: u32, elapsed: Duration) -> Rect {
    let ms = elapsed.as_millis() as i32;
    let dragged = (ms - 300).clamp(0, 1200);
    let max_x = screen_width as i32 - start.width as i32;
    Rect::new((start.x + dragged).min(max_x), start.y, start.width, start.height)
}

fn run_headless(args: &Args, options: BubbleOptions, config: &PixieConfig) -> Result<(), DemoError> {
    let (screen_w, screen_h) = args.screen;
    if let Some(dir) = &args.frames_dir {
        std::fs::create_dir_all(dir).map_err(DemoError::FramesDir)?;
    }

    let start = Rect::new(screen_w as i32 / 3, screen_h as i32 / 2 - 32, 64, 64);
    let pet = Rc::new(DraggedPet {
        rect: Cell::new(start),
    });
    let clock = ManualClock::new();
    let t0 = clock.now();

    let mut bubble = FollowingOverlay::new(
        pet.clone(),
        MonitorBounds::single(screen_w, screen_h),
        CosmicLayout::new(config.appearance.font_size),
        PixmapSurface::new(config.appearance.clone(), options.padding),
    )
    .with_clock(clock.clone());

    bubble.show(&args.text, &options);
    if !bubble.is_visible() {
        tracing::warn!(dismissal = ?bubble.last_dismissal(), "Bubble could not be shown");
        return Ok(());
    }

    let mut written = 0usize;
    let mut last_state = bubble.state();
    while bubble.state() != BubbleState::Hidden {
        clock.advance(STEP);
        let elapsed = clock.now().saturating_duration_since(t0);
        if elapsed > MAX_SIMULATED {
            tracing::warn!("Bubble still up after the time limit; hiding it");
            bubble.hide();
            break;
        }

        pet.rect.set(scripted_position(start, screen_w, elapsed));
        bubble.tick();

        if bubble.state() != last_state {
            last_state = bubble.state();
            tracing::info!(
                at_ms = elapsed.as_millis() as u64,
                state = ?last_state,
                side = ?bubble.side(),
                "Bubble state"
            );
        }

        if bubble.surface_mut().flush()
            && let Some(dir) = &args.frames_dir
        {
            write_frame(bubble.surface(), dir, written)?;
            written += 1;
        }
    }

    tracing::info!(
        frames = bubble.surface().frames_rendered(),
        written,
        dismissal = ?bubble.last_dismissal(),
        "Headless run finished"
    );
    Ok(())
}

fn write_frame(surface: &PixmapSurface, dir: &Path, index: usize) -> Result<(), DemoError> {
    let path = dir.join(format!("frame_{index:05}.png"));
    surface.write_png(&path)?;
    tracing::debug!(path = %path.display(), "Wrote frame");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// X11
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(unix, not(target_os = "macos")))]
fn run_x11(text: &str, options: BubbleOptions, config: &PixieConfig) -> Result<(), DemoError> {
    use std::time::Instant;

    use pixie_overlay::{X11BubbleWindow, spawn_bubble};

    /// Pet that sways left and right around its starting point
    struct SwayingPet {
        origin: Rect,
        started: Instant,
    }

    impl Anchor for SwayingPet {
        fn rect(&self) -> Rect {
            let t = self.started.elapsed().as_secs_f32();
            let dx = ((t * 0.8).sin() * 200.0) as i32;
            Rect::new(self.origin.x + dx, self.origin.y, self.origin.width, self.origin.height)
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    let appearance = config.appearance.clone();
    let padding = options.padding;
    let bubble = spawn_bubble(move || {
        let screens = MonitorBounds::detect();
        let origin = screens
            .monitors()
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| screens.monitors().first())
            .map(|m| Rect::new(m.x + m.width as i32 / 3, m.y + m.height as i32 / 2, 64, 64))
            .ok_or_else(|| PlatformError::Other("no monitors found".to_string()))?;

        let window = X11BubbleWindow::new(Rect::new(origin.x, origin.y, 1, 1))?;
        Ok(FollowingOverlay::new(
            SwayingPet {
                origin,
                started: Instant::now(),
            },
            screens,
            CosmicLayout::new(appearance.font_size),
            PixmapSurface::new(appearance, padding).with_window(window),
        ))
    })?;

    bubble.show(text, options);
    while bubble.is_visible() {
        std::thread::sleep(Duration::from_millis(50));
    }
    tracing::info!("Bubble hidden; exiting");
    bubble.shutdown();
    Ok(())
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn run_x11(_text: &str, _options: BubbleOptions, _config: &PixieConfig) -> Result<(), DemoError> {
    Err(DemoError::Unsupported("--x11 is only available on Linux"))
}
