//! Idiom Chain - logic core of a chain-matching word puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (chain motion, insertion, matching, supply)
//! - `settings`: Data-driven session configuration

pub mod settings;
pub mod sim;

pub use settings::{ConfigError, SessionConfig};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz physics step)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Number of consecutive tokens that form a word
    pub const MATCH_WINDOW: usize = 4;

    /// Token defaults
    pub const TOKEN_DIAMETER: f32 = 1.0;
    /// Chain speed along the path (distance units per second)
    pub const CHAIN_SPEED: f32 = 1.0;

    /// Session defaults
    pub const IDIOMS_PER_LEVEL: usize = 10;
    pub const INITIAL_CHAIN_LENGTH: usize = 20;

    /// Spacing tolerance when checking the chain invariant
    pub const SPACING_EPSILON: f32 = 1e-3;
    /// Moves shorter than this do not spin a token
    pub const MIN_ROLL_DISTANCE: f32 = 1e-4;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Heading angle (radians) for a token sitting on a path with this tangent.
/// The token's "up" axis points across the path, so the heading is the tangent
/// angle rotated by -90°.
#[inline]
pub fn heading_from_tangent(tangent: Vec2) -> f32 {
    tangent.y.atan2(tangent.x) - std::f32::consts::FRAC_PI_2
}
