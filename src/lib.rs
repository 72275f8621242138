//! # Oakoak
//!
//! Wild creature encounters for group chats.
//!
//! ## Architecture Overview
//!
//! A creature spawns at random in a channel, stays catchable for a bounded
//! time and is captured by typing its name. The crate is split into:
//!
//! - **Catalog**: read-only creature records and the sprite files that belong to them
//! - **Channel**: per-channel spawn configuration and its store
//! - **Encounter**: rarity rolls, the spawner, the active encounter registry and
//!   the name matcher
//! - **Catches**: the history of captured creatures
//! - **Imaging**: the layered compositor producing teaser and reveal images
//! - **Game**: the session that wires everything together for a chat transport
//!
//! The chat transport itself lives outside this crate. It feeds channel events
//! into [`EncounterGame`] and ships back the captions and images it produces.

pub mod catalog;
pub mod catches;
pub mod channel;
pub mod encounter;
pub mod game;
pub mod imaging;

// Core module re-exports
pub use catalog::*;
pub use catches::*;
pub use channel::*;
pub use encounter::*;
pub use game::*;
pub use imaging::*;

use std::path::PathBuf;

/// Core error type for the encounter engine.
#[derive(thiserror::Error, Debug)]
pub enum OakError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration is malformed or out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No creature in the catalog satisfies the spawn constraints
    #[error("No eligible creature for tier {tier} in generations {generations:?}")]
    NoEligibleCreature {
        tier: RarityTier,
        generations: Vec<u8>,
    },

    /// A sprite or fixed image asset could not be loaded
    #[error("Asset missing: {path}: {reason}")]
    AssetMissing { path: PathBuf, reason: String },

    /// Image encoding or processing failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Catalog data is inconsistent
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Catch or configuration persistence failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A background worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type used throughout the crate.
pub type OakResult<T> = Result<T, OakError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants.
pub mod config {
    /// Seconds a wild creature stays catchable
    pub const ENCOUNTER_TIMEOUT_SECS: u64 = 120;

    /// Probability that a spawned creature is shiny
    pub const SHINY_CHANCE: f64 = 1.0 / 10_000.0;

    /// Highest creature generation known to the catalog
    pub const MAX_GENERATION: u8 = 8;

    /// Spawn probability given to channels seen for the first time
    pub const DEFAULT_SPAWN_RATE: f64 = 0.05;

    /// Number of caught creatures listed by a team listing
    pub const TEAM_DISPLAY_LIMIT: usize = 50;

    /// Highest individual value of a stat
    pub const MAX_IV: u8 = 31;
}
