//! A single glyph-carrying chain element

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::MIN_ROLL_DISTANCE;

/// Stable token identity, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

/// A token riding the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub glyph: char,
    /// Physical size used for spacing and roll math
    pub diameter: f32,
    /// Distance along the path. Written only by the chain engine.
    pub distance: f32,
    /// Last world position written by motion
    pub position: Vec2,
    /// Motion vector handed to the physics collaborator
    pub vel: Vec2,
    /// Orientation across the path (radians)
    #[serde(default)]
    pub heading: f32,
    /// Accumulated spin, kept as a running angle so it never jumps
    #[serde(default)]
    pub roll_degrees: f32,
}

impl Token {
    pub fn new(id: TokenId, glyph: char, diameter: f32) -> Self {
        assert!(diameter > 0.0, "token diameter must be positive, got {diameter}");
        Self {
            id,
            glyph,
            diameter,
            distance: 0.0,
            position: Vec2::ZERO,
            vel: Vec2::ZERO,
            heading: 0.0,
            roll_degrees: 0.0,
        }
    }

    /// Builder-style distance setter
    pub fn at(mut self, distance: f32, position: Vec2) -> Self {
        self.distance = distance;
        self.position = position;
        self
    }

    /// Centre-to-centre spacing this token keeps from `other`
    #[inline]
    pub fn spacing_to(&self, other: &Token) -> f32 {
        (self.diameter + other.diameter) * 0.5
    }

    /// Spin the token by the distance it actually travelled this tick
    pub fn roll(&mut self, distance_moved: f32) {
        if distance_moved <= MIN_ROLL_DISTANCE {
            return;
        }
        let circumference = std::f32::consts::PI * self.diameter;
        let degrees = distance_moved / circumference * 360.0;
        self.roll_degrees -= degrees;
    }

    /// Stop all motion (session over)
    pub fn freeze(&mut self) {
        self.vel = Vec2::ZERO;
    }
}
