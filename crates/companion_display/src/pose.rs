//! # Pose Calculator
//!
//! Where a companion floats relative to its owner's eyes.
//!
//! ```text
//!            eye ●
//!               / \  offset = -direction, y >= 0, |x|,|z| >= min
//!              /   \
//!   rotated 30°     ◆ companion (+ bob)
//! ```
//!
//! Pure and deterministic: the same `(eye_position, eye_direction, tick)`
//! always yields bit-identical output. The bob and spin are driven by the
//! per-actor tick counter, never by wall-clock time, so server jitter does
//! not show up as stutter.

use std::f64::consts::TAU;

use companion_shared::{Vec3, TEXTURE_NAMESPACE_SEPARATOR};

use crate::config::PoseConfig;

/// Target placement of a companion for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// World position.
    pub position: Vec3,
    /// Yaw in degrees, in `[0, 360)`.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

/// Computes companion poses from an actor's eye and a tick counter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseCalculator {
    side_angle: f64,
    min_horizontal_offset: f64,
    bob_amplitude: f64,
    bob_frequency: f64,
    spin_degrees: f64,
}

impl PoseCalculator {
    /// Creates a calculator from pose settings.
    #[must_use]
    pub fn new(config: &PoseConfig) -> Self {
        Self {
            side_angle: config.side_angle_degrees.to_radians(),
            min_horizontal_offset: config.min_horizontal_offset,
            bob_amplitude: config.bob_amplitude,
            bob_frequency: config.bob_frequency,
            spin_degrees: config.spin_degrees,
        }
    }

    /// Offset behind the eye, before the side rotation.
    ///
    /// The vertical component is never negative and each horizontal
    /// component is at least the configured minimum.
    #[must_use]
    pub fn base_offset(&self, eye_direction: Vec3) -> Vec3 {
        let mut offset = (-eye_direction).normalize_or_zero();
        offset.y = offset.y.abs();
        // Clear of the actor's head even when looking along an axis
        if offset.x.abs() < self.min_horizontal_offset {
            offset.x = self.min_horizontal_offset;
        }
        if offset.z.abs() < self.min_horizontal_offset {
            offset.z = self.min_horizontal_offset;
        }
        offset
    }

    /// Offset from the eye to the companion, before the bob.
    #[must_use]
    pub fn side_offset(&self, eye_direction: Vec3) -> Vec3 {
        self.base_offset(eye_direction).rotate_around_y(self.side_angle)
    }

    /// Vertical bob at `tick`.
    #[must_use]
    pub fn bob(&self, tick: u64) -> f64 {
        self.bob_amplitude * (phase(tick) * self.bob_frequency).sin()
    }

    /// Yaw at `tick`, wrapped into `[0, 360)`.
    #[must_use]
    pub fn yaw(&self, tick: u64) -> f32 {
        let yaw = (self.spin_degrees * phase(tick)).rem_euclid(360.0) as f32;
        // f32 rounding can land exactly on 360
        if yaw >= 360.0 {
            0.0
        } else {
            yaw
        }
    }

    /// Full pose at `tick`.
    #[must_use]
    pub fn compute(&self, eye_position: Vec3, eye_direction: Vec3, tick: u64) -> Pose {
        let mut position = eye_position + self.side_offset(eye_direction);
        position.y += self.bob(tick);

        Pose {
            position,
            yaw: self.yaw(tick),
            pitch: 0.0,
        }
    }

    /// Pose used when a companion is first spawned (tick 0 phase).
    #[must_use]
    pub fn spawn_pose(&self, eye_position: Vec3, eye_direction: Vec3) -> Pose {
        self.compute(eye_position, eye_direction, 0)
    }
}

impl Default for PoseCalculator {
    fn default() -> Self {
        Self::new(&PoseConfig::default())
    }
}

#[inline]
fn phase(tick: u64) -> f64 {
    tick as f64 / TAU
}

/// Pose with the default geometry.
#[must_use]
pub fn compute_pose(eye_position: Vec3, eye_direction: Vec3, tick: u64) -> Pose {
    PoseCalculator::default().compute(eye_position, eye_direction, tick)
}

/// Returns true if a pet with this texture must not be spun, i.e. the
/// texture is namespaced (`namespace:model`).
#[must_use]
pub fn rotation_suppressed(texture: &str) -> bool {
    texture.contains(TEXTURE_NAMESPACE_SEPARATOR)
}
