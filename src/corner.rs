//! Resting-corner prediction from release position and fling velocity.
//!
//! A flick can only carry a view into one of the two corners that share an
//! edge with the current quadrant. Each neighbour sits along one axis
//! direction (0° right, 90° up, 180° left, 270° down, y-up angles). The
//! neighbour is chosen when the fling angle lies strictly inside the
//! tolerance band around that direction; a fling exactly on the band edge
//! keeps the current quadrant.

use serde::{Deserialize, Serialize};

use crate::config::Gestures;
use crate::geometry::{Point, Size, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn is_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    pub fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }

    pub fn from_sides(left: bool, top: bool) -> Corner {
        match (left, top) {
            (true, true) => Corner::TopLeft,
            (false, true) => Corner::TopRight,
            (true, false) => Corner::BottomLeft,
            (false, false) => Corner::BottomRight,
        }
    }

    /// The two edge-sharing corners, each with the y-up direction that
    /// reaches it.
    fn neighbours(self) -> [(f32, Corner); 2] {
        match self {
            Corner::TopLeft => [(0.0, Corner::TopRight), (270.0, Corner::BottomLeft)],
            Corner::TopRight => [(180.0, Corner::TopLeft), (270.0, Corner::BottomRight)],
            Corner::BottomLeft => [(90.0, Corner::TopLeft), (0.0, Corner::BottomRight)],
            Corner::BottomRight => [(90.0, Corner::TopRight), (180.0, Corner::BottomLeft)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlingThresholds {
    pub min_speed: f32,
    pub tolerance_deg: f32,
}

impl Default for FlingThresholds {
    fn default() -> Self {
        Self {
            min_speed: 500.0,
            tolerance_deg: 30.0,
        }
    }
}

impl From<&Gestures> for FlingThresholds {
    fn from(g: &Gestures) -> Self {
        Self {
            min_speed: g.fling_min_speed,
            tolerance_deg: g.fling_angle_tolerance,
        }
    }
}

/// Screen quadrant of a point; the midlines belong to the right/bottom halves.
pub fn quadrant_of(position: Point, screen: Size) -> Corner {
    Corner::from_sides(
        position.x < screen.width / 2.0,
        position.y < screen.height / 2.0,
    )
}

/// Direction of a screen-space velocity as a y-up angle in `[0, 360)`.
///
/// `velocity` is in screen points per second with +y pointing down, as
/// reported by the touch tracker. A y-up velocity must have `dy` negated
/// first.
pub fn fling_angle(velocity: Vector) -> f32 {
    let deg = (-velocity.dy).atan2(velocity.dx).to_degrees();
    if deg < 0.0 { deg + 360.0 } else { deg }
}

fn angular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Neighbour reached by a fling at `angle`, or the quadrant itself.
pub fn corner_for_angle(quadrant: Corner, angle: f32, tolerance_deg: f32) -> Corner {
    quadrant
        .neighbours()
        .into_iter()
        .find(|(dir, _)| angular_distance(angle, *dir) < tolerance_deg)
        .map(|(_, corner)| corner)
        .unwrap_or(quadrant)
}

pub fn predict_corner_with(quadrant: Corner, velocity: Vector, th: &FlingThresholds) -> Corner {
    if velocity.length_squared() < th.min_speed * th.min_speed {
        return quadrant;
    }
    corner_for_angle(quadrant, fling_angle(velocity), th.tolerance_deg)
}

/// Corner a preview released in `quadrant` settles at. `velocity` is in
/// screen space (+y down), so "straight down" is `(0, +v)`.
pub fn predict_corner(quadrant: Corner, velocity: Vector) -> Corner {
    predict_corner_with(quadrant, velocity, &FlingThresholds::default())
}

/// Quadrant of the release point, then fling redirection.
pub fn resting_corner(position: Point, velocity: Vector, screen: Size, th: &FlingThresholds) -> Corner {
    predict_corner_with(quadrant_of(position, screen), velocity, th)
}
