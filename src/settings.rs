//! Session configuration
//!
//! Loaded from a JSON file next to the dictionary. Every field has a default so
//! partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading or saving a [`SessionConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// How an incoming character picks its side of the struck token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InsertPolicy {
    /// Compare straight-line distance to both chain neighbours
    #[default]
    NearestNeighbor,
    /// Compare the lateral coordinate against the struck token.
    /// Cheaper, but misclassifies on tight curves.
    Lateral,
}

impl InsertPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPolicy::NearestNeighbor => "nearest-neighbor",
            InsertPolicy::Lateral => "lateral",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nearest-neighbor" | "nearest" => Some(InsertPolicy::NearestNeighbor),
            "lateral" => Some(InsertPolicy::Lateral),
            _ => None,
        }
    }
}

/// When matches are searched after a change to the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MatchPolicy {
    /// Rescan the whole chain until no window matches
    #[default]
    FullRescan,
    /// Try the windows around the insertion point first, then rescan
    LocalThenFull,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::FullRescan => "full",
            MatchPolicy::LocalThenFull => "local",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "full" | "full-rescan" => Some(MatchPolicy::FullRescan),
            "local" | "local-then-full" => Some(MatchPolicy::LocalThenFull),
            _ => None,
        }
    }
}

/// Per-session tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How many words are drawn from the dictionary for this session
    pub idioms_per_level: usize,
    /// Tokens spawned before the chain starts moving
    pub initial_chain_length: usize,
    /// Head speed along the path (distance units per second)
    pub chain_speed: f32,
    /// Consecutive tokens forming a word
    pub match_window: usize,
    /// Diameter given to every spawned or inserted token
    pub token_diameter: f32,
    /// Words to clear for a win. `None` means every session word.
    pub target_count: Option<u32>,

    pub insert_policy: InsertPolicy,
    pub match_policy: MatchPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idioms_per_level: IDIOMS_PER_LEVEL,
            initial_chain_length: INITIAL_CHAIN_LENGTH,
            chain_speed: CHAIN_SPEED,
            match_window: MATCH_WINDOW,
            token_diameter: TOKEN_DIAMETER,
            target_count: None,
            insert_policy: InsertPolicy::default(),
            match_policy: MatchPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Win threshold once the session word count is known
    pub fn effective_target(&self, session_words: usize) -> u32 {
        self.target_count.unwrap_or(session_words as u32)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.match_window == 0 {
            return Err(ConfigError::Invalid("match_window must be positive"));
        }
        if !(self.token_diameter > 0.0) {
            return Err(ConfigError::Invalid("token_diameter must be positive"));
        }
        if !self.chain_speed.is_finite() || self.chain_speed < 0.0 {
            return Err(ConfigError::Invalid("chain_speed must be finite and non-negative"));
        }
        if self.target_count == Some(0) {
            return Err(ConfigError::Invalid("target_count must be positive when set"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded session config from {}", path.display());
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Session config saved to {}", path.display());
        Ok(())
    }
}
