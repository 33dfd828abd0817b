//! Screen-space geometry for bubble placement
//!
//! All coordinates are absolute virtual-screen pixels, the same space the
//! anchor reports its rectangle in.

use pixie_types::Side;

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin(x: i32, y: i32, size: Size) -> Self {
        Self::new(x, y, size.width, size.height)
    }

    /// Right edge. Edges are i64 so rectangles near the i32 limits never overflow.
    #[inline]
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    #[inline]
    pub fn center_x(&self) -> i64 {
        self.x as i64 + (self.width / 2) as i64
    }

    #[inline]
    pub fn center_y(&self) -> i64 {
        self.y as i64 + (self.height / 2) as i64
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// True if `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True if the two rectangles share any area
    pub fn intersects(&self, other: &Rect) -> bool {
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }
}

/// Where the bubble ended up relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rect: Rect,
    /// Side the bubble actually sits on (differs from the preferred side after a flip)
    pub side: Side,
    /// True when neither side fit and the rectangle was clamped
    pub clamped: bool,
}

/// Origin of a `size` rectangle sitting `gap` pixels off `side` of
/// `anchor`, centered along the anchor's other axis.
fn origin_beside(anchor: Rect, size: Size, side: Side, gap: u32) -> (i64, i64) {
    let gap = gap as i64;
    let w = size.width as i64;
    let h = size.height as i64;

    match side {
        Side::Right => (anchor.right() + gap, anchor.center_y() - h / 2),
        Side::Left => (anchor.x as i64 - gap - w, anchor.center_y() - h / 2),
        Side::Above => (anchor.center_x() - w / 2, anchor.y as i64 - gap - h),
        Side::Below => (anchor.center_x() - w / 2, anchor.bottom() + gap),
    }
}

/// Rectangle of `size` sitting `gap` pixels off `side` of `anchor`.
///
/// `None` when that origin falls outside the i32 coordinate space.
pub fn beside(anchor: Rect, size: Size, side: Side, gap: u32) -> Option<Rect> {
    let (x, y) = origin_beside(anchor, size, side, gap);
    Some(Rect::from_origin(
        i32::try_from(x).ok()?,
        i32::try_from(y).ok()?,
        size,
    ))
}

/// Place a bubble next to `anchor` inside `screen`.
///
/// Tries the preferred side, then the opposite side, then clamps the
/// preferred-side rectangle onto the screen. Returns `None` when no
/// on-screen placement exists: the anchor is entirely off `screen`, or the
/// bubble is larger than the screen.
pub fn place(anchor: Rect, size: Size, preferred: Side, gap: u32, screen: Rect) -> Option<Placement> {
    if !screen.intersects(&anchor) {
        return None;
    }
    if size.width > screen.width || size.height > screen.height {
        return None;
    }

    for side in [preferred, preferred.opposite()] {
        if let Some(rect) = beside(anchor, size, side, gap)
            && screen.contains_rect(&rect)
        {
            return Some(Placement {
                rect,
                side,
                clamped: false,
            });
        }
    }

    // Neither side fits: clamp each axis of the preferred origin
    let (x, y) = origin_beside(anchor, size, preferred, gap);
    let max_x = screen.right() - size.width as i64;
    let max_y = screen.bottom() - size.height as i64;
    let rect = Rect::from_origin(
        i32::try_from(x.clamp(screen.x as i64, max_x)).ok()?,
        i32::try_from(y.clamp(screen.y as i64, max_y)).ok()?,
        size,
    );
    Some(Placement {
        rect,
        side: preferred,
        clamped: true,
    })
}
