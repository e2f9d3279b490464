//! Collision events and insertion side resolution
//!
//! The physics layer only tells us *which* chain token a projectile touched and
//! *where* the projectile was. Everything else (which side the new token goes,
//! and at what path distance) is decided here from that single snapshot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::token::{Token, TokenId};
use crate::settings::InsertPolicy;

/// Raised by the physics collaborator when a projectile overlaps a chain token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Chain token that was hit
    pub token_id: TokenId,
    /// Character carried by the projectile
    pub glyph: char,
    /// Projectile world position at contact
    pub position: Vec2,
}

/// Which side of the struck token the new token lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertSide {
    /// Toward the head (new token takes the struck token's index)
    Before,
    /// Toward the tail (new token goes right after the struck token)
    After,
}

/// Where a new token goes and at what path distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertPlan {
    pub side: InsertSide,
    pub index: usize,
    pub distance: f32,
}

/// Result of feeding a collision event to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Token inserted at `index`; `matched` words cleared by the cascade
    Inserted { index: usize, matched: usize },
    /// The struck token is no longer in the chain (removed by a prior cascade)
    NotFound,
    /// Session is not accepting insertions (spawning or finished)
    Ignored,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Nearest-neighbour side choice: go toward whichever chain neighbour of the
/// struck token the projectile is closer to. Missing neighbours count as
/// infinitely far; ties go after.
pub fn nearest_neighbor_side(chain: &[Token], struck: usize, incoming: Vec2) -> InsertSide {
    let dist_to_prev = struck
        .checked_sub(1)
        .map(|i| incoming.distance(chain[i].position))
        .unwrap_or(f32::INFINITY);
    let dist_to_next = chain
        .get(struck + 1)
        .map(|t| incoming.distance(t.position))
        .unwrap_or(f32::INFINITY);

    if dist_to_prev < dist_to_next {
        InsertSide::Before
    } else {
        InsertSide::After
    }
}

/// Legacy side choice: compare the world-space x coordinate of the projectile
/// with the struck token, oriented by the path's horizontal direction there.
/// Breaks down where the path runs vertically.
pub fn lateral_side(struck: &Token, tangent: Vec2, incoming: Vec2) -> InsertSide {
    let ahead = (incoming.x - struck.position.x) * tangent.x.signum();
    if ahead > 0.0 {
        InsertSide::Before
    } else {
        InsertSide::After
    }
}

/// Resolve the chain index and path distance for a new token of `diameter`
/// placed on `side` of `chain[struck]`.
///
/// Between two tokens the new one starts at the midpoint; at either end it is
/// pushed one diameter past the struck token. Motion opens the gap afterwards.
pub fn plan_insertion(chain: &[Token], struck: usize, side: InsertSide, diameter: f32) -> InsertPlan {
    let c = &chain[struck];
    match side {
        InsertSide::Before => {
            let distance = match struck.checked_sub(1) {
                Some(prev) => (chain[prev].distance + c.distance) * 0.5,
                None => c.distance + diameter,
            };
            InsertPlan {
                side,
                index: struck,
                distance,
            }
        }
        InsertSide::After => {
            let distance = match chain.get(struck + 1) {
                Some(next) => (c.distance + next.distance) * 0.5,
                None => c.distance - diameter,
            };
            InsertPlan {
                side,
                index: struck + 1,
                distance,
            }
        }
    }
}

/// Side choice for the configured policy
pub fn resolve_side(
    policy: InsertPolicy,
    chain: &[Token],
    struck: usize,
    incoming: Vec2,
    tangent: Vec2,
) -> InsertSide {
    match policy {
        InsertPolicy::NearestNeighbor => nearest_neighbor_side(chain, struck, incoming),
        InsertPolicy::Lateral => lateral_side(&chain[struck], tangent, incoming),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(glyphs: &str) -> Vec<Token> {
        // Head at x = 10, one unit apart, travelling +x
        glyphs
            .chars()
            .enumerate()
            .map(|(i, g)| {
                let d = 10.0 - i as f32;
                Token::new(TokenId(i as u32 + 1), g, 1.0).at(d, Vec2::new(d, 0.0))
            })
            .collect()
    }

    #[test]
    fn test_nearest_neighbor_both_neighbors() {
        let chain = row("ABC");
        // Closer to A (the previous neighbour of B)
        assert_eq!(nearest_neighbor_side(&chain, 1, Vec2::new(9.4, 0.5)), InsertSide::Before);
        // Closer to C
        assert_eq!(nearest_neighbor_side(&chain, 1, Vec2::new(8.6, 0.5)), InsertSide::After);
    }

    #[test]
    fn test_nearest_neighbor_missing_neighbors() {
        let chain = row("AB");
        // Head has no previous: always after unless next is also missing
        assert_eq!(nearest_neighbor_side(&chain, 0, Vec2::new(12.0, 0.0)), InsertSide::After);
        // Tail has no next: before
        assert_eq!(nearest_neighbor_side(&chain, 1, Vec2::new(5.0, 0.0)), InsertSide::Before);

        let single = row("A");
        assert_eq!(nearest_neighbor_side(&single, 0, Vec2::ZERO), InsertSide::After);
    }

    #[test]
    fn test_plan_insertion_midpoints_and_ends() {
        let chain = row("ABC");

        let plan = plan_insertion(&chain, 1, InsertSide::Before, 1.0);
        assert_eq!(plan.index, 1);
        assert!((plan.distance - 9.5).abs() < 1e-6);

        let plan = plan_insertion(&chain, 1, InsertSide::After, 1.0);
        assert_eq!(plan.index, 2);
        assert!((plan.distance - 8.5).abs() < 1e-6);

        let plan = plan_insertion(&chain, 0, InsertSide::Before, 2.0);
        assert_eq!(plan.index, 0);
        assert!((plan.distance - 12.0).abs() < 1e-6);

        let plan = plan_insertion(&chain, 2, InsertSide::After, 2.0);
        assert_eq!(plan.index, 3);
        assert!((plan.distance - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_lateral_side() {
        let chain = row("A");
        assert_eq!(lateral_side(&chain[0], Vec2::X, Vec2::new(10.5, 3.0)), InsertSide::Before);
        assert_eq!(lateral_side(&chain[0], Vec2::X, Vec2::new(9.5, 3.0)), InsertSide::After);
        // Path heading -x flips the meaning of "ahead"
        assert_eq!(lateral_side(&chain[0], -Vec2::X, Vec2::new(9.5, 3.0)), InsertSide::Before);
    }

    #[test]
    fn test_resolve_side_dispatch() {
        let chain = row("ABC");
        let incoming = Vec2::new(9.4, 0.5);
        assert_eq!(
            resolve_side(InsertPolicy::NearestNeighbor, &chain, 1, incoming, Vec2::X),
            InsertSide::Before
        );
        assert_eq!(
            resolve_side(InsertPolicy::Lateral, &chain, 1, incoming, Vec2::X),
            InsertSide::Before
        );
    }
}
