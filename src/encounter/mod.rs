//! # Encounter Module
//!
//! Everything between a spawn roll and a capture:
//! - rarity selection from a cumulative threshold table
//! - the spawner that turns a tier into a concrete wild encounter
//! - the registry holding at most one live encounter per channel
//! - the matcher deciding whether a guess names the encounter

pub mod matcher;
pub mod rarity;
pub mod registry;
pub mod spawner;

pub use matcher::*;
pub use rarity::*;
pub use registry::*;
pub use spawner::*;

use crate::{
    config, ChannelDefaults, CreatureRecord, OakError, OakResult, RarityTier, SpriteVariant, Stat,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Unique identifier of a spawned encounter.
pub type EncounterId = Uuid;

/// Source of monotonic timestamps for spawn and expiry math.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use oakoak::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now() - start, Duration::from_secs(5));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Gender rolled for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Genderless,
}

/// Individual values rolled for each stat, `0..=31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IndividualValues {
    pub hp: u8,
    pub attack: u8,
    pub defense: u8,
    pub special_attack: u8,
    pub special_defense: u8,
    pub speed: u8,
}

impl IndividualValues {
    /// Rolls every stat uniformly.
    pub fn roll(rng: &mut StdRng) -> Self {
        let mut stat = || rng.gen_range(0..=config::MAX_IV);
        Self {
            hp: stat(),
            attack: stat(),
            defense: stat(),
            special_attack: stat(),
            special_defense: stat(),
            speed: stat(),
        }
    }

    /// Value of one stat.
    pub fn get(&self, stat: Stat) -> u8 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::SpecialAttack => self.special_attack,
            Stat::SpecialDefense => self.special_defense,
            Stat::Speed => self.speed,
        }
    }

    /// Sum of all six values.
    pub fn total(&self) -> u16 {
        [
            self.hp,
            self.attack,
            self.defense,
            self.special_attack,
            self.special_defense,
            self.speed,
        ]
        .iter()
        .map(|&value| u16::from(value))
        .sum()
    }
}

/// A spawned creature, catchable in exactly one channel until it is caught or
/// it flees.
#[derive(Debug, Clone, PartialEq)]
pub struct WildEncounter {
    /// Unique id of this spawn
    pub id: EncounterId,
    /// Catalog record of the creature
    pub creature: Arc<CreatureRecord>,
    /// Sprite chosen for this spawn
    pub sprite: SpriteVariant,
    /// Tier the spawn was rolled from
    pub tier: RarityTier,
    /// Shiny coloring
    pub shiny: bool,
    /// Rolled gender
    pub gender: Gender,
    /// Rolled ability
    pub ability: String,
    /// Rolled nature
    pub nature: String,
    /// Rolled individual values
    pub ivs: IndividualValues,
    /// Monotonic spawn time
    pub spawned_at: Instant,
}

impl WildEncounter {
    /// Display name of the creature.
    pub fn name(&self) -> &str {
        &self.creature.name
    }

    /// Sprite asset to render.
    pub fn sprite_path(&self) -> &Path {
        &self.sprite.path
    }

    /// Whether more than `timeout` has passed since the spawn.
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.spawned_at) > timeout
    }
}

/// Creates the random source for spawn rolls. A seed makes every roll
/// reproducible.
pub fn create_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Tunables of the encounter game.
///
/// # Examples
///
/// ```
/// use oakoak::GameConfig;
///
/// let config = GameConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.encounter_timeout().as_secs(), 120);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seconds a wild creature stays catchable
    pub encounter_timeout_secs: u64,
    /// Probability that a spawn is shiny
    pub shiny_chance: f64,
    /// Cumulative rarity thresholds
    pub rarity_table: RarityTable,
    /// Spawn rate for channels seen for the first time
    pub default_spawn_rate: f64,
    /// Generations for channels seen for the first time
    pub default_generations: Vec<u8>,
    /// Highest valid generation
    pub max_generation: u8,
    /// Number of caught creatures shown in a team listing
    pub team_display_limit: usize,
}

impl GameConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            encounter_timeout_secs: config::ENCOUNTER_TIMEOUT_SECS,
            shiny_chance: config::SHINY_CHANCE,
            rarity_table: RarityTable::default(),
            default_spawn_rate: config::DEFAULT_SPAWN_RATE,
            default_generations: (1..=config::MAX_GENERATION).collect(),
            max_generation: config::MAX_GENERATION,
            team_display_limit: config::TEAM_DISPLAY_LIMIT,
        }
    }

    /// Creates a configuration for tests: every message spawns and shinies
    /// never happen.
    pub fn for_testing() -> Self {
        Self {
            shiny_chance: 0.0,
            default_spawn_rate: 1.0,
            ..Self::new()
        }
    }

    /// Loads a configuration from a JSON file and validates it.
    pub fn load(path: impl AsRef<Path>) -> OakResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value for range errors.
    pub fn validate(&self) -> OakResult<()> {
        if self.encounter_timeout_secs == 0 {
            return Err(OakError::Config(
                "encounter timeout must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.shiny_chance) {
            return Err(OakError::Config(format!(
                "shiny chance {} is not within [0, 1]",
                self.shiny_chance
            )));
        }
        if self.max_generation == 0 {
            return Err(OakError::Config(
                "max generation must be at least 1".to_string(),
            ));
        }
        crate::ChannelConfig::new(
            0,
            self.default_spawn_rate,
            self.default_generations.iter().copied(),
            self.max_generation,
        )?;
        Ok(())
    }

    /// Encounter lifetime.
    pub fn encounter_timeout(&self) -> Duration {
        Duration::from_secs(self.encounter_timeout_secs)
    }

    /// Defaults handed to newly seen channels.
    pub fn channel_defaults(&self) -> ChannelDefaults {
        ChannelDefaults {
            spawn_rate: self.default_spawn_rate,
            generations: self.default_generations.clone(),
            max_generation: self.max_generation,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
