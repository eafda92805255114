//! Screen-space primitives. Origin is top-left, +y points down.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

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

/// Translation or velocity (px or px/s), same axes as [`Point`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f32,
    pub dy: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    pub fn length_squared(self) -> f32 {
        self.dx * self.dx + self.dy * self.dy
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }
}

impl Add<Vector> for Point {
    type Output = Point;

    fn add(self, v: Vector) -> Point {
        Point::new(self.x + v.dx, self.y + v.dy)
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, other: Point) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Largest size with this aspect ratio that fits inside `bounds`.
    pub fn fitted(self, bounds: Size) -> Size {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Size::default();
        }
        let scale = (bounds.width / self.width).min(bounds.height / self.height);
        Size::new(self.width * scale, self.height * scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x
            && p.x < self.origin.x + self.size.width
            && p.y >= self.origin.y
            && p.y < self.origin.y + self.size.height
    }
}

/// Linear blend: `t = 0` gives `from`, `t = 1` gives `to`.
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    (1.0 - t) * from + t * to
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitted_keeps_aspect() {
        let s = Size::new(390.0, 844.0).fitted(Size::new(240.0, 240.0));
        assert!((s.height - 240.0).abs() < 1e-3);
        assert!((s.width / s.height - 390.0 / 844.0).abs() < 1e-4);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(!r.contains(Point::new(30.0, 15.0)));
        assert_eq!(r.center(), Point::new(20.0, 20.0));
    }
}
