//! Word dictionary and character supply
//!
//! Pipeline, in fixed order so a seeded RNG reproduces it exactly:
//! 1. dictionary: every distinct 4-character line of the word file
//! 2. session words: `idioms_per_level` of them, drawn without replacement
//! 3. character pool: all characters of all session words
//! 4. one full shuffle of the pool, split into the initial-spawn queue (first
//!    half, rounded up) and the shoot queue (everything)
//!
//! Each queue refills itself from its backup list with a fresh shuffle when it
//! runs dry, so callers never see exhaustion unless the session has no words.

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MATCH_WINDOW;

/// Offered by [`SupplyManager::random_session_word`] when no words are loaded
pub const FALLBACK_WORD: &str = "万事如意";

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can answer "is this a word of the current session?"
pub trait Lexicon {
    fn contains_word(&self, word: &str) -> bool;
}

impl Lexicon for BTreeSet<String> {
    fn contains_word(&self, word: &str) -> bool {
        self.contains(word)
    }
}

impl Lexicon for [&str] {
    fn contains_word(&self, word: &str) -> bool {
        self.contains(&word)
    }
}

/// All known words of one length
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    words: BTreeSet<String>,
}

impl Dictionary {
    /// Parse newline-delimited text, keeping trimmed 4-character lines
    pub fn parse(text: &str) -> Self {
        Self::parse_with_len(text, MATCH_WINDOW)
    }

    /// Parse keeping lines of exactly `word_len` characters.
    /// Other lines are skipped, not errors.
    pub fn parse_with_len(text: &str, word_len: usize) -> Self {
        let mut words = BTreeSet::new();
        let mut skipped = 0usize;
        for line in text.split(['\r', '\n']) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.chars().count() == word_len {
                words.insert(line.to_string());
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            log::trace!("Skipped {} dictionary lines of the wrong length", skipped);
        }
        Self { words }
    }

    /// Read and parse a dictionary file of 4-character words
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        Self::load_with_len(path, MATCH_WINDOW)
    }

    /// Read and parse a dictionary file keeping `word_len`-character lines
    pub fn load_with_len(path: impl AsRef<Path>, word_len: usize) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dict = Self::parse_with_len(&text, word_len);
        log::info!("Loaded {} words from {}", dict.len(), path.display());
        Ok(dict)
    }

    /// Drop every word that is not exactly `word_len` characters.
    /// Returns how many were dropped.
    pub fn retain_len(&mut self, word_len: usize) -> usize {
        let before = self.words.len();
        self.words.retain(|w| w.chars().count() == word_len);
        before - self.words.len()
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Words in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// FIFO of characters that reshuffles its backup list when exhausted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplyQueue {
    live: VecDeque<char>,
    backup: Vec<char>,
}

impl SupplyQueue {
    /// Queue served in `backup` order until the first refill
    pub fn new(backup: Vec<char>) -> Self {
        Self {
            live: backup.iter().copied().collect(),
            backup,
        }
    }

    /// Pop the front character, refilling first if empty.
    /// `None` only when the backup list itself is empty.
    pub fn pop(&mut self, rng: &mut impl Rng) -> Option<char> {
        if self.live.is_empty() {
            if self.backup.is_empty() {
                return None;
            }
            self.refill(rng);
        }
        self.live.pop_front()
    }

    fn refill(&mut self, rng: &mut impl Rng) {
        let mut order = self.backup.clone();
        order.shuffle(rng);
        self.live = order.into();
        log::warn!("Supply queue empty, reshuffled {} characters", self.live.len());
    }

    /// Characters left before the next refill
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn backup(&self) -> &[char] {
        &self.backup
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.backup.clear();
    }
}

/// Owns the dictionary, the session's words and both character queues
#[derive(Debug, Clone)]
pub struct SupplyManager {
    dictionary: Dictionary,
    session_words: BTreeSet<String>,
    character_pool: Vec<char>,
    initial_spawn: SupplyQueue,
    shoot: SupplyQueue,
    rng: Pcg32,
}

impl SupplyManager {
    pub fn new(dictionary: Dictionary, idioms_per_level: usize, mut rng: Pcg32) -> Self {
        let session_words = select_session_words(&dictionary, idioms_per_level, &mut rng);

        // Words iterate sorted, so the pool is deterministic before the shuffle
        let mut character_pool: Vec<char> =
            session_words.iter().flat_map(|w| w.chars()).collect();
        character_pool.shuffle(&mut rng);

        let split = character_pool.len().div_ceil(2);
        let initial_spawn = SupplyQueue::new(character_pool[..split].to_vec());
        let shoot = SupplyQueue::new(character_pool.clone());

        log::info!(
            "Supply ready: {} session words, initial queue {} chars, shoot queue {} chars",
            session_words.len(),
            initial_spawn.len(),
            shoot.len()
        );
        for word in &session_words {
            log::debug!("Session word: {}", word);
        }

        Self {
            dictionary,
            session_words,
            character_pool,
            initial_spawn,
            shoot,
            rng,
        }
    }

    /// Build from a dictionary file of `word_len`-character words. A missing or
    /// unreadable file is logged and yields an empty (unplayable) supply rather
    /// than an error.
    pub fn from_path(path: impl AsRef<Path>, word_len: usize, idioms_per_level: usize, rng: Pcg32) -> Self {
        let dictionary = match Dictionary::load_with_len(path.as_ref(), word_len) {
            Ok(dict) => dict,
            Err(e) => {
                log::error!("{}, continuing with an empty dictionary", e);
                Dictionary::default()
            }
        };
        if dictionary.is_empty() {
            log::error!("Dictionary has no usable words");
        }
        Self::new(dictionary, idioms_per_level, rng)
    }

    /// Next character for the initial chain
    pub fn next_initial_spawn_char(&mut self) -> Option<char> {
        self.initial_spawn.pop(&mut self.rng)
    }

    /// Next character for the launcher
    pub fn next_shoot_char(&mut self) -> Option<char> {
        self.shoot.pop(&mut self.rng)
    }

    pub fn is_session_word(&self, word: &str) -> bool {
        self.session_words.contains(word)
    }

    /// A uniformly chosen session word, or [`FALLBACK_WORD`] if there are none
    pub fn random_session_word(&mut self) -> &str {
        if self.session_words.is_empty() {
            return FALLBACK_WORD;
        }
        let idx = self.rng.random_range(0..self.session_words.len());
        self.session_words
            .iter()
            .nth(idx)
            .map(String::as_str)
            .unwrap_or(FALLBACK_WORD)
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn session_words(&self) -> &BTreeSet<String> {
        &self.session_words
    }

    /// Shuffled pool the queues were seeded from
    pub fn character_pool(&self) -> &[char] {
        &self.character_pool
    }

    pub fn initial_spawn_queue(&self) -> &SupplyQueue {
        &self.initial_spawn
    }

    pub fn shoot_queue(&self) -> &SupplyQueue {
        &self.shoot
    }

    /// Drop session words and empty both queues and their backups
    pub fn clear(&mut self) {
        self.session_words.clear();
        self.character_pool.clear();
        self.initial_spawn.clear();
        self.shoot.clear();
    }

    /// Hand back the RNG so a rebuilt supply continues the same stream
    pub fn into_rng(self) -> Pcg32 {
        self.rng
    }
}

impl Lexicon for SupplyManager {
    fn contains_word(&self, word: &str) -> bool {
        self.is_session_word(word)
    }
}

fn select_session_words(dictionary: &Dictionary, count: usize, rng: &mut Pcg32) -> BTreeSet<String> {
    let all: Vec<&str> = dictionary.iter().collect();
    if all.len() <= count {
        return all.into_iter().map(str::to_string).collect();
    }
    index::sample(rng, all.len(), count)
        .into_iter()
        .map(|i| all[i].to_string())
        .collect()
}
