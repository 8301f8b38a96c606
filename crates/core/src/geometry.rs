//! Metric geometry primitives. All lengths are millimetres in fixture space:
//! x grows to the right, y grows upward from the fixture base, z grows from the
//! front face toward the back.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Overlap slack used by every span/bounds test. Products that touch within
/// this distance are treated as flush, not colliding.
pub const COLLISION_TOLERANCE_MM: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, o: Vector3) -> Vector3 { Vector3::new(self.x + o.x, self.y + o.y, self.z + o.z) }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, o: Vector3) -> Vector3 { Vector3::new(self.x - o.x, self.y - o.y, self.z - o.z) }
}

/// Width × height × depth box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dims3D {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Dims3D {
    pub const fn new(width: f64, height: f64, depth: f64) -> Self { Self { width, height, depth } }

    pub fn scaled(&self, s: f64) -> Self { Self::new(self.width * s, self.height * s, self.depth * s) }
}

/// Axis-aligned rectangle on the fixture front plane; `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self { Self { x, y, width, height } }

    pub fn right(&self) -> f64 { self.x + self.width }
    pub fn top(&self) -> f64 { self.y + self.height }

    /// True when this rectangle sits inside `[0, width] × [0, height]`, allowing `slack` mm.
    pub fn within(&self, width: f64, height: f64, slack: f64) -> bool {
        self.x >= -slack && self.y >= -slack && self.right() <= width + slack && self.top() <= height + slack
    }
}

/// Half-open horizontal interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub const fn new(start: f64, end: f64) -> Self { Self { start, end } }

    pub fn width(&self) -> f64 { self.end - self.start }

    /// Tolerant interval intersection: flush or near-flush spans never collide.
    pub fn collides(&self, other: &Span) -> bool {
        self.start < other.end - COLLISION_TOLERANCE_MM && self.end > other.start + COLLISION_TOLERANCE_MM
    }

    /// Length of the raw intersection, zero when disjoint.
    pub fn overlap(&self, other: &Span) -> f64 {
        (self.end.min(other.end) - self.start.max(other.start)).max(0.0)
    }
}

pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 { a + (b - a) * t }
