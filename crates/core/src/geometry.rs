//! Screen geometry for floating overlays.
//!
//! Kept free of any UI framework so placement is reproducible in tests: the
//! result depends only on the anchor, the overlay size and the viewport.

use serde::{Deserialize, Serialize};

/// Framework-agnostic point in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Framework-agnostic size in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Offset from the anchor and minimum distance to the viewport edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuPlacement {
    pub offset: f32,
    pub margin: f32,
}

impl Default for MenuPlacement {
    fn default() -> Self {
        Self { offset: 4.0, margin: 8.0 }
    }
}

/// Compute the top-left corner of a menu opened at `anchor`.
///
/// The menu opens below and to the right of the anchor. On an axis where it
/// would overflow, it flips to the other side of the anchor; the result is
/// then clamped into the viewport. A menu larger than the viewport is pinned
/// to the margin.
pub fn place_menu(anchor: Point, menu: Size, viewport: Size, placement: MenuPlacement) -> Point {
    Point {
        x: place_axis(anchor.x, menu.width, viewport.width, placement),
        y: place_axis(anchor.y, menu.height, viewport.height, placement),
    }
}

fn place_axis(anchor: f32, extent: f32, viewport: f32, placement: MenuPlacement) -> f32 {
    let MenuPlacement { offset, margin } = placement;
    let mut pos = anchor + offset;
    if pos + extent > viewport - margin {
        pos = (anchor - extent - offset).max(margin);
    }
    pos.min(viewport - extent - margin).max(margin).round()
}
