//! Vector math and shape overlap tests shared by the collision code.
//!
//! Positions and velocities are `geo` coordinates. Hit boxes live on the integer pixel grid,
//! so shapes use integer coordinates and integer radii.

use std::ops::Mul;

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Floating point 2D vector (position, velocity).
pub type Vec2 = Coord<f32>;

/// Integer 2D vector (pixel positions, radii).
pub type IVec2 = Coord<i32>;

/// Builds a [`Vec2`].
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Coord { x, y }
}

/// Builds an [`IVec2`].
pub fn ivec2(x: i32, y: i32) -> IVec2 {
    Coord { x, y }
}

/// Squared length of a vector.
pub fn length2(v: Vec2) -> f32 {
    v.x * v.x + v.y * v.y
}

/// Squared length of an integer vector.
pub fn ilength2(v: IVec2) -> i32 {
    v.x * v.x + v.y * v.y
}

/// Normalizes a vector and returns it together with its original length.
///
/// A zero vector has no direction; it is returned unchanged with length 0 so callers never
/// see NaN.
pub fn normalize(v: Vec2) -> (Vec2, f32) {
    let len = length2(v).sqrt();
    if len == 0.0 {
        (vec2(0.0, 0.0), 0.0)
    } else {
        (vec2(v.x / len, v.y / len), len)
    }
}

/// Truncates a vector onto the pixel grid (rounding towards zero).
pub fn to_pixel(v: Vec2) -> IVec2 {
    ivec2(v.x as i32, v.y as i32)
}

/// Converts a pixel vector back to floating point.
pub fn to_float(v: IVec2) -> Vec2 {
    vec2(v.x as f32, v.y as f32)
}

/// Unit direction for an angle in degrees. 0° points along +x, 90° along +y (down).
pub fn direction_from_angle(degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    vec2(rad.cos(), rad.sin())
}

/// Heading of a velocity in degrees in `[0, 360)`, using the same convention as
/// [`direction_from_angle`].
pub fn heading_degrees(v: Vec2) -> f32 {
    let (dir, _) = normalize(v);
    let heading = -dir.x.atan2(dir.y).to_degrees() + 90.0;
    fmod_positive(heading, 360.0)
}

/// Floating point modulo that always lands in `[0, modulus)`.
///
/// A zero modulus returns the value unchanged.
pub fn fmod_positive(value: f32, modulus: f32) -> f32 {
    if modulus == 0.0 {
        return value;
    }
    let r = value % modulus;
    if r < 0.0 { r + modulus } else { r }
}

/// 2x2 matrix used to compose velocity changes.
///
/// Serialized as a row-major `[[a, b], [c, d]]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat2(pub [[f32; 2]; 2]);

impl Mat2 {
    /// The identity transform.
    pub const IDENTITY: Self = Self([[1.0, 0.0], [0.0, 1.0]]);

    /// Rotation matrix from a cosine/sine pair.
    pub fn rotation(cos: f32, sin: f32) -> Self {
        Self([[cos, -sin], [sin, cos]])
    }

    /// Returns `true` if this matrix leaves every vector unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Mat2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let a = self.0;
        let b = rhs.0;
        Self([
            [
                a[0][0] * b[0][0] + a[0][1] * b[1][0],
                a[0][0] * b[0][1] + a[0][1] * b[1][1],
            ],
            [
                a[1][0] * b[0][0] + a[1][1] * b[1][0],
                a[1][0] * b[0][1] + a[1][1] * b[1][1],
            ],
        ])
    }
}

impl Mul<Vec2> for Mat2 {
    type Output = Vec2;

    fn mul(self, v: Vec2) -> Vec2 {
        let m = self.0;
        vec2(m[0][0] * v.x + m[0][1] * v.y, m[1][0] * v.x + m[1][1] * v.y)
    }
}

/// Geometric kind of a projectile hit box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Axis-aligned box with half extents `radius.x` / `radius.y`.
    #[default]
    Box,
    /// Circle with radius `radius.x`.
    Circle,
}

/// An integer hit box used by the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Hit box kind.
    pub kind: ShapeKind,
    /// Centre on the pixel grid.
    pub pos: IVec2,
    /// Half extents (box) or radius in `x` (circle).
    pub radius: IVec2,
}

impl Shape {
    /// Creates a new shape.
    pub fn new(kind: ShapeKind, pos: IVec2, radius: IVec2) -> Self {
        Self { kind, pos, radius }
    }

    /// Overlap test between two shapes. Touching counts as overlapping.
    ///
    /// The test is symmetric: `a.collides_with(&b) == b.collides_with(&a)`.
    pub fn collides_with(&self, other: &Shape) -> bool {
        match (self.kind, other.kind) {
            (ShapeKind::Box, ShapeKind::Box) => {
                (self.pos.x - other.pos.x).abs() <= self.radius.x + other.radius.x
                    && (self.pos.y - other.pos.y).abs() <= self.radius.y + other.radius.y
            }
            (ShapeKind::Circle, ShapeKind::Circle) => {
                let r = self.radius.x + other.radius.x;
                ilength2(self.pos - other.pos) <= r * r
            }
            (ShapeKind::Circle, ShapeKind::Box) => circle_box_overlap(self, other),
            (ShapeKind::Box, ShapeKind::Circle) => circle_box_overlap(other, self),
        }
    }
}

fn circle_box_overlap(circle: &Shape, rect: &Shape) -> bool {
    let nearest_x = circle
        .pos
        .x
        .clamp(rect.pos.x - rect.radius.x, rect.pos.x + rect.radius.x);
    let nearest_y = circle
        .pos
        .y
        .clamp(rect.pos.y - rect.radius.y, rect.pos.y + rect.radius.y);
    let d = ivec2(circle.pos.x - nearest_x, circle.pos.y - nearest_y);
    ilength2(d) <= circle.radius.x * circle.radius.x
}
