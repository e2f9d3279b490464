//! Word matching and cascades
//!
//! After any change to the chain, windows of consecutive tokens are checked
//! against the session words. A match removes its tokens and the scan starts
//! over from the head, because closing the gap can line up a new word anywhere.

use super::chain::ChainEngine;
use super::supply::Lexicon;
use crate::settings::MatchPolicy;

/// Finds and removes matched windows
#[derive(Debug, Clone)]
pub struct MatchEngine {
    window: usize,
    policy: MatchPolicy,
}

impl MatchEngine {
    pub fn new(window: usize, policy: MatchPolicy) -> Self {
        assert!(window > 0, "match window must be positive");
        Self { window, policy }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Leftmost matching window: (start index, word)
    pub fn find_match<L: Lexicon + ?Sized>(&self, chain: &ChainEngine, words: &L) -> Option<(usize, String)> {
        let len = chain.len();
        if len < self.window {
            return None;
        }
        (0..=len - self.window).find_map(|start| {
            chain
                .window(start, self.window)
                .filter(|w| words.contains_word(w))
                .map(|w| (start, w))
        })
    }

    /// Remove matches until a full scan finds none. Returns the cleared words
    /// in the order they were removed.
    pub fn resolve_cascades<L: Lexicon + ?Sized>(&self, chain: &mut ChainEngine, words: &L) -> Vec<String> {
        let mut cleared = Vec::new();
        while let Some((start, word)) = self.find_match(chain, words) {
            chain.remove_range(start, self.window);
            log::info!("Matched '{}' at index {}", word, start);
            cleared.push(word);
        }
        if cleared.len() > 1 {
            log::info!("Cascade cleared {} words", cleared.len());
        }
        cleared
    }

    /// Check only the windows that contain `index`, removing the first match.
    pub fn check_local<L: Lexicon + ?Sized>(
        &self,
        chain: &mut ChainEngine,
        words: &L,
        index: usize,
    ) -> Option<String> {
        let lowest = index.saturating_sub(self.window - 1);
        for start in lowest..=index {
            let Some(word) = chain.window(start, self.window) else {
                continue;
            };
            if words.contains_word(&word) {
                chain.remove_range(start, self.window);
                log::info!("Matched '{}' near insertion at index {}", word, index);
                return Some(word);
            }
        }
        None
    }

    /// Resolve matches after a token landed at `index`, per the configured policy.
    /// The full rescan always runs last so the result never depends on the policy.
    pub fn resolve_after_insert<L: Lexicon + ?Sized>(
        &self,
        chain: &mut ChainEngine,
        words: &L,
        index: usize,
    ) -> Vec<String> {
        let mut cleared = Vec::new();
        if self.policy == MatchPolicy::LocalThenFull {
            cleared.extend(self.check_local(chain, words, index));
        }
        cleared.extend(self.resolve_cascades(chain, words));
        cleared
    }
}
