//! Path geometry the chain travels along
//!
//! The chain only ever talks to a path through [`PathProvider`]. Two reference
//! paths are provided for tests and the headless driver:
//! - [`PolylinePath`]: piecewise-linear, arc-length parameterized
//! - [`ArcPath`]: a circular arc in polar form
//!
//! Distances outside `[0, length]` extrapolate along the path ends so tokens
//! queued before the start (or pushed past the end) keep distinct positions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::polar_to_cartesian;

/// Unit of a scalar path coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathUnit {
    /// Arc length from the path origin
    Distance,
    /// Fraction of total length, 0..1
    Normalized,
}

/// A fixed path evaluated by distance
pub trait PathProvider {
    /// World position at `distance` along the path
    fn position(&self, distance: f32) -> Vec2;

    /// Unit tangent (direction of travel) at `distance`
    fn tangent(&self, distance: f32) -> Vec2;

    /// Total arc length
    fn length(&self) -> f32;

    /// Convert a coordinate between distance and normalized parameter
    fn convert_unit(&self, value: f32, from: PathUnit, to: PathUnit) -> f32 {
        let length = self.length();
        match (from, to) {
            (PathUnit::Distance, PathUnit::Normalized) => {
                if length > 0.0 {
                    value / length
                } else {
                    0.0
                }
            }
            (PathUnit::Normalized, PathUnit::Distance) => value * length,
            _ => value,
        }
    }

    /// Position for a coordinate given in either unit
    fn position_at(&self, value: f32, unit: PathUnit) -> Vec2 {
        self.position(self.convert_unit(value, unit, PathUnit::Distance))
    }
}

/// Piecewise-linear path through a list of points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolylinePath {
    points: Vec<Vec2>,
    /// Arc length at each point (cumulative[0] == 0)
    cumulative: Vec<f32>,
}

impl PolylinePath {
    /// Build a path through `points`. Zero-length segments are dropped.
    pub fn new(points: Vec<Vec2>) -> Self {
        let mut deduped: Vec<Vec2> = Vec::with_capacity(points.len());
        for p in points {
            if deduped.last().is_none_or(|last| last.distance(p) > f32::EPSILON) {
                deduped.push(p);
            }
        }
        assert!(deduped.len() >= 2, "a path needs at least two distinct points");

        let mut cumulative = Vec::with_capacity(deduped.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in deduped.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        Self {
            points: deduped,
            cumulative,
        }
    }

    /// Straight segment from `start` to `end`
    pub fn straight(start: Vec2, end: Vec2) -> Self {
        Self::new(vec![start, end])
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Segment index containing `distance` (end segments absorb overflow)
    fn segment_for(&self, distance: f32) -> usize {
        let idx = self.cumulative.partition_point(|&c| c <= distance);
        idx.saturating_sub(1).min(self.segment_count() - 1)
    }

    fn segment_dir(&self, seg: usize) -> Vec2 {
        (self.points[seg + 1] - self.points[seg]).normalize_or_zero()
    }

    /// Arc length of the path point nearest to `point`
    pub fn nearest_distance(&self, point: Vec2) -> f32 {
        let mut best = (f32::INFINITY, 0.0);
        for seg in 0..self.segment_count() {
            let a = self.points[seg];
            let ab = self.points[seg + 1] - a;
            let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
            let t = ((point - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
            let dist_sq = (a + ab * t).distance_squared(point);
            if dist_sq < best.0 {
                best = (dist_sq, self.cumulative[seg] + t * seg_len);
            }
        }
        best.1
    }
}

impl PathProvider for PolylinePath {
    fn position(&self, distance: f32) -> Vec2 {
        let seg = self.segment_for(distance);
        self.points[seg] + self.segment_dir(seg) * (distance - self.cumulative[seg])
    }

    fn tangent(&self, distance: f32) -> Vec2 {
        self.segment_dir(self.segment_for(distance))
    }

    fn length(&self) -> f32 {
        self.cumulative[self.cumulative.len() - 1]
    }
}

/// Circular arc path
///
/// In polar coordinates around `center`, the path starts at `theta_start` and
/// sweeps `sweep` radians (positive = counter-clockwise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcPath {
    pub center: Vec2,
    pub radius: f32,
    pub theta_start: f32,
    pub sweep: f32,
}

impl ArcPath {
    pub fn new(center: Vec2, radius: f32, theta_start: f32, sweep: f32) -> Self {
        assert!(radius > 0.0, "arc radius must be positive");
        Self {
            center,
            radius,
            theta_start,
            sweep,
        }
    }

    /// Angle reached after travelling `distance`
    #[inline]
    pub fn theta_at(&self, distance: f32) -> f32 {
        self.theta_start + self.sweep.signum() * distance / self.radius
    }
}

impl PathProvider for ArcPath {
    fn position(&self, distance: f32) -> Vec2 {
        self.center + polar_to_cartesian(self.radius, self.theta_at(distance))
    }

    fn tangent(&self, distance: f32) -> Vec2 {
        let theta = self.theta_at(distance);
        Vec2::new(-theta.sin(), theta.cos()) * self.sweep.signum()
    }

    fn length(&self) -> f32 {
        self.radius * self.sweep.abs()
    }
}
