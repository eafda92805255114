//! Resting rects for the floating preview and the PiP container.

use crate::config::Screen;
use crate::corner::Corner;
use crate::geometry::{Point, Rect, Size, lerp};
use crate::slots::{Orientation, Role};

const NAV_BAR: f32 = 44.0 + 8.0;
const PREVIEW_SIDE_INSET: f32 = 20.0;
const PREVIEW_COLLAPSED_INSET: f32 = 16.0;
const PREVIEW_SIDE: f32 = 150.0;
const PREVIEW_COLLAPSED_SIDE: f32 = 300.0;
const PIP_BOUNDS: Size = Size::new(240.0, 240.0);
const PIP_SIDE_INSET: f32 = 8.0;

/// Metadata of the slot shown as the floating preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSource {
    pub role: Role,
    pub orientation: Orientation,
    pub aspect_ratio: f32,
}

#[derive(Debug, Clone, Copy)]
struct Insets {
    top: f32,
    bottom: f32,
    left: f32,
    right: f32,
}

fn place(screen: Size, size: Size, insets: Insets, corner: Corner) -> Rect {
    let x = if corner.is_left() {
        insets.left
    } else {
        screen.width - size.width - insets.right
    };
    let y = if corner.is_top() {
        insets.top
    } else {
        screen.height - insets.bottom - size.height
    };
    Rect {
        origin: Point::new(x, y),
        size,
    }
}

/// Width/height the preview is shown at. Self-view is always portrait 3:4;
/// remote video snaps to 3:4 or 4:3 and follows the sender's rotation.
pub fn preview_aspect(source: &PreviewSource) -> f32 {
    match source.role {
        Role::Outgoing => 3.0 / 4.0,
        Role::Incoming => {
            let aspect = if source.aspect_ratio < 1.0 { 3.0 / 4.0 } else { 4.0 / 3.0 };
            if source.orientation.is_sideways() { 1.0 / aspect } else { aspect }
        }
    }
}

pub fn preview_rect(
    screen: &Screen,
    corner: Corner,
    pip_fraction: f32,
    chrome_hidden: bool,
    source: Option<&PreviewSource>,
) -> Rect {
    let insets = if chrome_hidden {
        Insets {
            top: screen.safe_top,
            bottom: screen.safe_bottom.max(20.0),
            left: PREVIEW_SIDE_INSET,
            right: PREVIEW_SIDE_INSET,
        }
    } else {
        Insets {
            top: screen.safe_top + NAV_BAR,
            bottom: screen.buttons_height + 22.0,
            left: PREVIEW_SIDE_INSET,
            right: PREVIEW_SIDE_INSET,
        }
    };
    let expanded = 1.0 - pip_fraction;
    let insets = Insets {
        top: lerp(PREVIEW_COLLAPSED_INSET, insets.top, expanded),
        bottom: lerp(PREVIEW_COLLAPSED_INSET, insets.bottom, expanded),
        left: lerp(PREVIEW_COLLAPSED_INSET, insets.left, expanded),
        right: lerp(PREVIEW_COLLAPSED_INSET, insets.right, expanded),
    };

    let side = lerp(PREVIEW_COLLAPSED_SIDE, PREVIEW_SIDE, expanded);
    let bounds = Size::new(side, side);
    let size = match source {
        Some(src) => Size::new(preview_aspect(src) * 10_000.0, 10_000.0).fitted(bounds),
        None => Size::new(30.0, 45.0).fitted(screen.size().fitted(bounds)),
    };
    place(screen.size(), size, insets, corner)
}

pub fn pip_container_rect(screen: &Screen, corner: Corner) -> Rect {
    let size = screen.size().fitted(PIP_BOUNDS);
    let insets = Insets {
        top: screen.safe_top + NAV_BAR,
        bottom: screen.safe_bottom + NAV_BAR,
        left: PIP_SIDE_INSET,
        right: PIP_SIDE_INSET,
    };
    place(screen.size(), size, insets, corner)
}
