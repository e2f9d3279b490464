//! Chain motion and insertion
//!
//! The chain is an ordered list of tokens, head first. Each tick the head moves
//! forward at the chain speed and every follower is pulled up to sit exactly
//! half a diameter-sum behind the token in front of it, but never pulled
//! backward. Gaps opened by insertions therefore close by the rear waiting
//! while the front moves on.

use glam::Vec2;

use super::collision::{InsertPlan, plan_insertion, resolve_side};
use super::path::PathProvider;
use super::token::{Token, TokenId};
use crate::consts::SPACING_EPSILON;
use crate::heading_from_tangent;
use crate::settings::InsertPolicy;

/// Owns the ordered token sequence
#[derive(Debug, Clone)]
pub struct ChainEngine {
    tokens: Vec<Token>,
    /// Head speed (distance per second)
    speed: f32,
    next_id: u32,
}

impl ChainEngine {
    pub fn new(speed: f32) -> Self {
        Self {
            tokens: Vec::new(),
            speed,
            next_id: 1,
        }
    }

    /// Allocate a new token ID
    pub fn next_token_id(&mut self) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a token with a fresh ID. It is not part of the chain yet.
    pub fn make_token(&mut self, glyph: char, diameter: f32) -> Token {
        let id = self.next_token_id();
        Token::new(id, glyph, diameter)
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn head_distance(&self) -> Option<f32> {
        self.tokens.first().map(|t| t.distance)
    }

    pub fn index_of(&self, id: TokenId) -> Option<usize> {
        self.tokens.iter().position(|t| t.id == id)
    }

    /// The chain's characters, head first
    pub fn glyphs(&self) -> String {
        self.tokens.iter().map(|t| t.glyph).collect()
    }

    /// Characters of `len` tokens starting at `start`, if that many exist
    pub fn window(&self, start: usize, len: usize) -> Option<String> {
        let end = start.checked_add(len)?;
        self.tokens
            .get(start..end)
            .map(|w| w.iter().map(|t| t.glyph).collect())
    }

    /// Replace the whole chain (initial spawn). Positions are snapped onto the
    /// path and velocities cleared.
    pub fn install(&mut self, tokens: Vec<Token>, path: &dyn PathProvider) {
        self.tokens = tokens;
        for token in &mut self.tokens {
            token.position = path.position(token.distance);
            token.heading = heading_from_tangent(path.tangent(token.distance));
            token.vel = Vec2::ZERO;
        }
        debug_assert!(self.is_ordered(), "installed chain is out of order");
    }

    /// Where every token should be after `dt` seconds
    pub fn target_distances(&self, dt: f32) -> Vec<f32> {
        let mut targets = Vec::with_capacity(self.tokens.len());
        let Some(head) = self.tokens.first() else {
            return targets;
        };
        targets.push(head.distance + self.speed * dt);

        for pair in self.tokens.windows(2) {
            let (front, token) = (&pair[0], &pair[1]);
            let spacing = front.spacing_to(token);
            let follower = targets[targets.len() - 1] - spacing;
            // Never pulled back: a follower that is too close waits
            targets.push(follower.max(token.distance));
        }
        targets
    }

    /// Move the chain one fixed step
    ///
    /// Each token gets the velocity that closes its gap to the target in
    /// exactly one step; its distance and position jump to the target.
    pub fn advance(&mut self, path: &dyn PathProvider, dt: f32) {
        if self.tokens.is_empty() {
            return;
        }
        if dt <= 0.0 {
            log::debug!("Ignoring non-positive timestep {}", dt);
            return;
        }

        let targets = self.target_distances(dt);
        for (token, &target) in self.tokens.iter_mut().zip(&targets) {
            let new_pos = path.position(target);
            let movement = new_pos - token.position;
            token.vel = movement / dt;
            token.roll(movement.length());
            token.distance = target;
            token.position = new_pos;
            token.heading = heading_from_tangent(path.tangent(target));
        }

        debug_assert!(self.is_ordered(), "chain order broken by advance");
    }

    /// Insert `glyph` next to the token at `struck`, choosing the side by the
    /// nearest chain neighbour. Returns the new token's index, or `None` if
    /// `struck` is out of range.
    pub fn insert(
        &mut self,
        struck: usize,
        glyph: char,
        incoming: Vec2,
        diameter: f32,
        path: &dyn PathProvider,
    ) -> Option<usize> {
        self.insert_with_policy(InsertPolicy::NearestNeighbor, struck, glyph, incoming, diameter, path)
    }

    /// [`ChainEngine::insert`] with an explicit side policy
    pub fn insert_with_policy(
        &mut self,
        policy: InsertPolicy,
        struck: usize,
        glyph: char,
        incoming: Vec2,
        diameter: f32,
        path: &dyn PathProvider,
    ) -> Option<usize> {
        let plan = self.plan(policy, struck, incoming, diameter, path)?;

        let mut token = self.make_token(glyph, diameter);
        // Starts where the projectile was; the next advance pulls it onto the path
        token.distance = plan.distance;
        token.position = incoming;
        token.heading = heading_from_tangent(path.tangent(plan.distance));
        self.tokens.insert(plan.index, token);

        log::debug!(
            "Inserted '{}' {:?} token {} at index {} (distance {:.3})",
            glyph,
            plan.side,
            struck,
            plan.index,
            plan.distance
        );
        debug_assert!(self.is_ordered(), "insertion broke chain order");
        Some(plan.index)
    }

    /// Work out where an insertion would land without touching the chain
    pub fn plan(
        &self,
        policy: InsertPolicy,
        struck: usize,
        incoming: Vec2,
        diameter: f32,
        path: &dyn PathProvider,
    ) -> Option<InsertPlan> {
        let token = self.tokens.get(struck)?;
        let tangent = path.tangent(token.distance);
        let side = resolve_side(policy, &self.tokens, struck, incoming, tangent);
        Some(plan_insertion(&self.tokens, struck, side, diameter))
    }

    /// Remove one token, shifting later indices down
    pub fn remove(&mut self, index: usize) -> Token {
        self.tokens.remove(index)
    }

    /// Remove `len` tokens starting at `start`, back to front.
    /// Returned in chain order.
    pub fn remove_range(&mut self, start: usize, len: usize) -> Vec<Token> {
        let mut removed = Vec::with_capacity(len);
        for index in (start..start + len).rev() {
            removed.push(self.tokens.remove(index));
        }
        removed.reverse();
        removed
    }

    /// Zero every velocity
    pub fn freeze(&mut self) {
        for token in &mut self.tokens {
            token.freeze();
        }
    }

    /// Destroy every token. IDs keep counting up.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Distances never increase from head to tail
    pub fn is_ordered(&self) -> bool {
        self.tokens.windows(2).all(|p| p[0].distance >= p[1].distance)
    }

    /// Every adjacent pair is at least its half-diameter-sum apart
    pub fn is_spaced(&self) -> bool {
        self.tokens
            .windows(2)
            .all(|p| p[0].distance - p[1].distance >= p[0].spacing_to(&p[1]) - SPACING_EPSILON)
    }
}
