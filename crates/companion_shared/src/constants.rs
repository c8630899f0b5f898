//! # Tuning Constants
//!
//! Defaults for the companion pose and the per-actor tick cadence.
//! `companion_display::DisplayConfig` starts from these values and lets a
//! server override them from TOML.

// =============================================================================
// TICK CADENCE
// =============================================================================

/// Ticks between two invocations of an actor's task (every tick).
pub const DEFAULT_TICK_PERIOD: u32 = 1;

/// Ticks before the first invocation of a freshly started task.
pub const DEFAULT_INITIAL_DELAY: u32 = 1;

// =============================================================================
// POSE
// =============================================================================

/// Rotation of the companion offset around the vertical axis, in degrees.
///
/// Puts the companion beside the actor instead of directly behind them.
pub const SIDE_ANGLE_DEGREES: f64 = 30.0;

/// Minimum magnitude of each horizontal offset component, before rotation.
pub const MIN_HORIZONTAL_OFFSET: f64 = 0.5;

/// Height of the vertical bob.
pub const BOB_AMPLITUDE: f64 = 0.15;

/// Phase multiplier of the vertical bob.
pub const BOB_FREQUENCY: f64 = 0.5;

/// Yaw advance factor: yaw = `SPIN_DEGREES * tick / 2π` degrees.
pub const SPIN_DEGREES: f64 = 20.0;

/// Marker in a texture identifier that flags a directional, textured model.
///
/// Companions with such a texture are never spun.
pub const TEXTURE_NAMESPACE_SEPARATOR: char = ':';
