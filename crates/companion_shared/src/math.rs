//! Vector math shared between the engine and its collaborators.
//!
//! World coordinates are `f64` so companions stay put far from the origin.

use serde::{Deserialize, Serialize};

/// Below this length a direction is treated as zero.
const NORMALIZE_EPSILON: f64 = 1e-12;

/// 3D Vector - position, offset, direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component (vertical)
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a degenerate input.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len.is_finite() && len > NORMALIZE_EPSILON {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    /// Rotates around the vertical (Y) axis by `angle` radians.
    ///
    /// Positive angles turn +X towards -Z.
    #[must_use]
    pub fn rotate_around_y(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            cos * self.x + sin * self.z,
            self.y,
            -sin * self.x + cos * self.z,
        )
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
