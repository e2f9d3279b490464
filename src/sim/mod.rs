//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Chain order is path order (head first), never insertion order
//! - No rendering or platform dependencies

pub mod chain;
pub mod collision;
pub mod matching;
pub mod path;
pub mod session;
pub mod state;
pub mod supply;
pub mod token;

pub use chain::ChainEngine;
pub use collision::{CollisionEvent, InsertOutcome, InsertPlan, InsertSide};
pub use matching::MatchEngine;
pub use path::{ArcPath, PathProvider, PathUnit, PolylinePath};
pub use session::{Launcher, SessionController};
pub use state::{GameEvent, RngState, SessionPhase};
pub use supply::{Dictionary, DictionaryError, FALLBACK_WORD, Lexicon, SupplyManager, SupplyQueue};
pub use token::{Token, TokenId};
