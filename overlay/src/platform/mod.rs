//! Platform glue for bubble windows
//!
//! Monitor geometry is platform-neutral and lives here; the native window
//! backend (X11 on Linux) sits in its own module behind `cfg`.

use pixie_core::{Rect, ScreenBounds};
use thiserror::Error;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod x11;

/// Information about a connected monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Unique identifier for this monitor (platform-specific)
    pub id: String,
    /// Human-readable name/description
    pub name: String,
    /// X position of the monitor in virtual screen space
    pub x: i32,
    /// Y position of the monitor in virtual screen space
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl MonitorInfo {
    /// Check if a point is within this monitor's bounds
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }

    /// Check if a rectangle overlaps with this monitor
    pub fn overlaps(&self, x: i32, y: i32, width: u32, height: u32) -> bool {
        let rect_right = x + width as i32;
        let rect_bottom = y + height as i32;
        let mon_right = self.x + self.width as i32;
        let mon_bottom = self.y + self.height as i32;

        x < mon_right && rect_right > self.x && y < mon_bottom && rect_bottom > self.y
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Find the monitor that contains the center of the given rectangle.
/// Falls back to the monitor with the most overlap, then primary, then first.
pub fn find_monitor_at(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    monitors: &[MonitorInfo],
) -> Option<&MonitorInfo> {
    if monitors.is_empty() {
        return None;
    }

    let center_x = x + (width as i32 / 2);
    let center_y = y + (height as i32 / 2);

    if let Some(m) = monitors.iter().find(|m| m.contains(center_x, center_y)) {
        return Some(m);
    }

    // Most overlap wins
    let mut best_monitor = None;
    let mut best_overlap = 0i64;

    for m in monitors {
        if m.overlaps(x, y, width, height) {
            let overlap_x = (x + width as i32).min(m.x + m.width as i32) - x.max(m.x);
            let overlap_y = (y + height as i32).min(m.y + m.height as i32) - y.max(m.y);
            let overlap_area = (overlap_x.max(0) as i64) * (overlap_y.max(0) as i64);

            if overlap_area > best_overlap {
                best_overlap = overlap_area;
                best_monitor = Some(m);
            }
        }
    }

    if best_monitor.is_some() {
        return best_monitor;
    }

    monitors.iter().find(|m| m.is_primary).or(monitors.first())
}

// ─────────────────────────────────────────────────────────────────────────────
// Screen Bounds Over A Monitor List
// ─────────────────────────────────────────────────────────────────────────────

/// `ScreenBounds` backed by a snapshot of the connected monitors.
///
/// The bubble is kept on the monitor that holds the anchor, not on the whole
/// virtual screen, so it never straddles two displays.
#[derive(Debug, Clone, Default)]
pub struct MonitorBounds {
    monitors: Vec<MonitorInfo>,
}

impl MonitorBounds {
    pub fn new(monitors: Vec<MonitorInfo>) -> Self {
        Self { monitors }
    }

    /// A single monitor at the origin (headless hosts)
    pub fn single(width: u32, height: u32) -> Self {
        Self::new(vec![MonitorInfo {
            id: "headless".to_string(),
            name: "Headless".to_string(),
            x: 0,
            y: 0,
            width,
            height,
            is_primary: true,
        }])
    }

    /// Snapshot the monitors the display server reports
    pub fn detect() -> Self {
        let monitors = get_all_monitors();
        if monitors.is_empty() {
            tracing::warn!("No monitors reported; bubbles cannot be placed");
        } else {
            tracing::debug!(count = monitors.len(), "Detected monitors");
        }
        Self::new(monitors)
    }

    pub fn monitors(&self) -> &[MonitorInfo] {
        &self.monitors
    }
}

impl ScreenBounds for MonitorBounds {
    fn screen_bounds_for(&self, rect: Rect) -> Option<Rect> {
        find_monitor_at(rect.x, rect.y, rect.width, rect.height, &self.monitors)
            .map(MonitorInfo::rect)
    }
}

/// Get all connected monitors without requiring a window.
#[cfg(all(unix, not(target_os = "macos")))]
pub fn get_all_monitors() -> Vec<MonitorInfo> {
    x11::get_all_monitors()
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
pub fn get_all_monitors() -> Vec<MonitorInfo> {
    Vec::new()
}

/// Errors that can occur in platform operations
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("buffer error: {0}")]
    BufferError(String),

    #[error("platform error: {0}")]
    Other(String),
}
