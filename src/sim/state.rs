//! Session phase, outgoing events and RNG bookkeeping

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::token::TokenId;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Initial chain is being laid out, one token per tick
    Spawning,
    /// Chain moves, insertions are accepted
    Running,
    /// Enough words cleared
    Won,
    /// Head token reached the end of the path
    Lost,
}

impl SessionPhase {
    /// No more motion or insertions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Won | SessionPhase::Lost)
    }
}

/// Things that happened during a tick, for audio/UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    TokenSpawned { id: TokenId, glyph: char },
    SpawnComplete { chain_len: usize },
    TokenInserted { id: TokenId, glyph: char, index: usize },
    WordMatched { word: String, matched_count: u32 },
    Won { matched_count: u32 },
    Lost { head_distance: f32 },
    Reset,
}

/// RNG state wrapper for serialization
///
/// `stream` counts session resets so a reset session draws fresh words while
/// staying reproducible from the original seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed ^ self.stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Move to the next stream (used on reset)
    pub fn advance_stream(&mut self) {
        self.stream = self.stream.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_seed_same_rng() {
        let a: u32 = RngState::new(7).to_rng().random();
        let b: u32 = RngState::new(7).to_rng().random();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stream_changes_sequence() {
        let mut state = RngState::new(7);
        let first: u64 = state.to_rng().random();
        state.advance_stream();
        let second: u64 = state.to_rng().random();
        assert_ne!(first, second);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(SessionPhase::Won.is_terminal());
        assert!(SessionPhase::Lost.is_terminal());
        assert!(!SessionPhase::Spawning.is_terminal());
        assert!(!SessionPhase::Running.is_terminal());
    }
}
