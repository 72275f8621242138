//! # Channel Module
//!
//! Per-channel spawn configuration and the store it lives in.

use crate::{config, OakError, OakResult};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// Identifier of a chat channel.
pub type ChannelId = i64;

/// Identifier of a chat user.
pub type UserId = i64;

/// Alternate forms a channel has opted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlternateForms {
    /// Regional variants (alolan, galarian, ...)
    pub regional: bool,
    /// Mega art
    pub mega: bool,
}

/// Spawn configuration of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelConfig {
    /// Channel this configuration belongs to
    pub channel_id: ChannelId,
    /// Probability that a message spawns a creature
    spawn_rate: f64,
    /// Generations allowed to spawn
    generations: BTreeSet<u8>,
    /// Alternate forms opted into
    pub alternate_forms: AlternateForms,
}

impl ChannelConfig {
    /// Creates a validated channel configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use oakoak::ChannelConfig;
    ///
    /// let config = ChannelConfig::new(-100, 0.1, [1, 2], 8).unwrap();
    /// assert_eq!(config.spawn_rate(), 0.1);
    /// assert!(ChannelConfig::new(-100, 1.5, [1], 8).is_err());
    /// assert!(ChannelConfig::new(-100, 0.1, [9], 8).is_err());
    /// ```
    pub fn new(
        channel_id: ChannelId,
        spawn_rate: f64,
        generations: impl IntoIterator<Item = u8>,
        max_generation: u8,
    ) -> OakResult<Self> {
        let mut config = Self {
            channel_id,
            spawn_rate: 0.0,
            generations: BTreeSet::new(),
            alternate_forms: AlternateForms::default(),
        };
        config.set_spawn_rate(spawn_rate)?;
        config.set_generations(generations, max_generation)?;
        Ok(config)
    }

    /// Spawn probability in `[0, 1]`.
    pub fn spawn_rate(&self) -> f64 {
        self.spawn_rate
    }

    /// Allowed generations.
    pub fn generations(&self) -> &BTreeSet<u8> {
        &self.generations
    }

    /// Replaces the spawn rate. The old value is kept on error.
    pub fn set_spawn_rate(&mut self, rate: f64) -> OakResult<()> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(OakError::Config(format!(
                "spawn rate {} is not within [0, 1]",
                rate
            )));
        }
        self.spawn_rate = rate;
        Ok(())
    }

    /// Replaces the allowed generations. The old set is kept on error.
    pub fn set_generations(
        &mut self,
        generations: impl IntoIterator<Item = u8>,
        max_generation: u8,
    ) -> OakResult<()> {
        let generations: BTreeSet<u8> = generations.into_iter().collect();
        if generations.is_empty() {
            return Err(OakError::Config(
                "at least one generation must be allowed".to_string(),
            ));
        }
        if let Some(bad) = generations
            .iter()
            .find(|&&generation| generation == 0 || generation > max_generation)
        {
            return Err(OakError::Config(format!(
                "generation {} is not within [1, {}]",
                bad, max_generation
            )));
        }
        self.generations = generations;
        Ok(())
    }
}

/// Parses the argument of a "set rate" command.
///
/// # Examples
///
/// ```
/// use oakoak::parse_spawn_rate;
///
/// assert_eq!(parse_spawn_rate(" 0.01 ").unwrap(), 0.01);
/// assert!(parse_spawn_rate("2").is_err());
/// assert!(parse_spawn_rate("often").is_err());
/// ```
pub fn parse_spawn_rate(input: &str) -> OakResult<f64> {
    let rate: f64 = input
        .trim()
        .parse()
        .map_err(|_| OakError::Config(format!("'{}' is not a number", input.trim())))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(OakError::Config(format!(
            "spawn rate {} is not within [0, 1]",
            rate
        )));
    }
    Ok(rate)
}

/// Parses the comma separated argument of a "set generations" command.
///
/// # Examples
///
/// ```
/// use oakoak::parse_generations;
///
/// assert_eq!(parse_generations("1, 2,3", 8).unwrap(), vec![1, 2, 3]);
/// assert!(parse_generations("1,9", 8).is_err());
/// assert!(parse_generations("", 8).is_err());
/// ```
pub fn parse_generations(input: &str, max_generation: u8) -> OakResult<Vec<u8>> {
    let generations = input
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u8>()
                .ok()
                .filter(|&generation| generation >= 1 && generation <= max_generation)
                .ok_or_else(|| {
                    OakError::Config(format!(
                        "'{}' is not a generation within [1, {}]",
                        part, max_generation
                    ))
                })
        })
        .collect::<OakResult<Vec<u8>>>()?;
    Ok(generations)
}

/// Storage of channel configurations.
///
/// Updates are all-or-nothing: a failed update leaves the stored
/// configuration untouched.
pub trait ConfigStore: Send + Sync {
    /// Returns the configuration of a channel, creating the default one for
    /// channels seen for the first time.
    fn get_channel_config(&self, channel_id: ChannelId) -> OakResult<ChannelConfig>;

    /// Updates the spawn rate of a channel.
    fn set_spawn_rate(&self, channel_id: ChannelId, rate: f64) -> OakResult<()>;

    /// Updates the allowed generations of a channel.
    fn set_generations(&self, channel_id: ChannelId, generations: &[u8]) -> OakResult<()>;

    /// Updates the alternate forms a channel has opted into.
    fn set_alternate_forms(&self, channel_id: ChannelId, forms: AlternateForms) -> OakResult<()>;
}

/// Defaults applied to channels seen for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefaults {
    /// Initial spawn rate
    pub spawn_rate: f64,
    /// Initial generations
    pub generations: Vec<u8>,
    /// Highest valid generation
    pub max_generation: u8,
}

impl Default for ChannelDefaults {
    fn default() -> Self {
        Self {
            spawn_rate: config::DEFAULT_SPAWN_RATE,
            generations: (1..=config::MAX_GENERATION).collect(),
            max_generation: config::MAX_GENERATION,
        }
    }
}

/// Config store kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    defaults: ChannelDefaults,
    configs: RwLock<HashMap<ChannelId, ChannelConfig>>,
}

impl InMemoryConfigStore {
    /// Creates an empty store handing out `defaults` to new channels.
    pub fn new(defaults: ChannelDefaults) -> OakResult<Self> {
        // Validate the defaults once so later lookups cannot fail on them.
        ChannelConfig::new(
            0,
            defaults.spawn_rate,
            defaults.generations.iter().copied(),
            defaults.max_generation,
        )?;
        Ok(Self {
            defaults,
            configs: RwLock::new(HashMap::new()),
        })
    }

    /// Number of known channels.
    pub fn channel_count(&self) -> usize {
        self.configs.read().map(|configs| configs.len()).unwrap_or(0)
    }

    fn update<F>(&self, channel_id: ChannelId, apply: F) -> OakResult<()>
    where
        F: FnOnce(&mut ChannelConfig) -> OakResult<()>,
    {
        let mut configs = self
            .configs
            .write()
            .map_err(|_| OakError::Persistence("config store lock poisoned".to_string()))?;
        let mut updated = match configs.get(&channel_id) {
            Some(config) => config.clone(),
            None => self.default_config(channel_id)?,
        };
        apply(&mut updated)?;
        configs.insert(channel_id, updated);
        Ok(())
    }

    fn default_config(&self, channel_id: ChannelId) -> OakResult<ChannelConfig> {
        ChannelConfig::new(
            channel_id,
            self.defaults.spawn_rate,
            self.defaults.generations.iter().copied(),
            self.defaults.max_generation,
        )
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get_channel_config(&self, channel_id: ChannelId) -> OakResult<ChannelConfig> {
        {
            let configs = self
                .configs
                .read()
                .map_err(|_| OakError::Persistence("config store lock poisoned".to_string()))?;
            if let Some(config) = configs.get(&channel_id) {
                return Ok(config.clone());
            }
        }

        let mut configs = self
            .configs
            .write()
            .map_err(|_| OakError::Persistence("config store lock poisoned".to_string()))?;
        if let Some(config) = configs.get(&channel_id) {
            return Ok(config.clone());
        }
        let config = self.default_config(channel_id)?;
        info!("Registered channel {}", channel_id);
        configs.insert(channel_id, config.clone());
        Ok(config)
    }

    fn set_spawn_rate(&self, channel_id: ChannelId, rate: f64) -> OakResult<()> {
        self.update(channel_id, |config| config.set_spawn_rate(rate))?;
        info!("Rate for channel {} set to {}", channel_id, rate);
        Ok(())
    }

    fn set_generations(&self, channel_id: ChannelId, generations: &[u8]) -> OakResult<()> {
        let max_generation = self.defaults.max_generation;
        self.update(channel_id, |config| {
            config.set_generations(generations.iter().copied(), max_generation)
        })?;
        info!("Generations for channel {} set to {:?}", channel_id, generations);
        Ok(())
    }

    fn set_alternate_forms(&self, channel_id: ChannelId, forms: AlternateForms) -> OakResult<()> {
        self.update(channel_id, |config| {
            config.alternate_forms = forms;
            Ok(())
        })
    }
}
