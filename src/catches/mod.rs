//! # Catches Module
//!
//! History of captured creatures, kept per user and channel.

use crate::{ChannelId, Gender, IndividualValues, OakError, OakResult, UserId, WildEncounter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

/// A creature caught by a user in a channel. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaughtRecord {
    /// Position in the user's team for this channel, starting at 0
    pub team_index: usize,
    /// Catching user
    pub user_id: UserId,
    /// Channel the creature was caught in
    pub channel_id: ChannelId,
    /// Catalog id of the creature
    pub creature_id: u32,
    /// Display name at catch time
    pub creature_name: String,
    /// Wall-clock catch time
    pub caught_at: SystemTime,
    /// Shiny coloring
    pub shiny: bool,
    /// Form id of the sprite
    pub form: u8,
    /// Regional tag of the sprite
    pub region: String,
    /// Mega art
    pub mega: bool,
    /// Rolled gender
    pub gender: Gender,
    /// Rolled ability
    pub ability: String,
    /// Rolled nature
    pub nature: String,
    /// Rolled individual values
    pub ivs: IndividualValues,
}

/// Storage of caught creatures.
pub trait CatchStore: Send + Sync {
    /// Records the capture of `encounter` by `user_id`.
    fn record_catch(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        encounter: &WildEncounter,
    ) -> OakResult<CaughtRecord>;

    /// Lists a user's catches in a channel in capture order.
    fn list_caught(&self, user_id: UserId, channel_id: ChannelId) -> OakResult<Vec<CaughtRecord>>;
}

/// Catch store kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatchStore {
    teams: Mutex<HashMap<(ChannelId, UserId), Vec<CaughtRecord>>>,
}

impl InMemoryCatchStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of catches across all users and channels.
    pub fn total(&self) -> usize {
        self.teams
            .lock()
            .map(|teams| teams.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl CatchStore for InMemoryCatchStore {
    fn record_catch(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        encounter: &WildEncounter,
    ) -> OakResult<CaughtRecord> {
        let mut teams = self
            .teams
            .lock()
            .map_err(|_| OakError::Persistence("catch store lock poisoned".to_string()))?;
        let team = teams.entry((channel_id, user_id)).or_default();

        let record = CaughtRecord {
            team_index: team.len(),
            user_id,
            channel_id,
            creature_id: encounter.creature.id,
            creature_name: encounter.name().to_string(),
            caught_at: SystemTime::now(),
            shiny: encounter.shiny,
            form: encounter.sprite.form,
            region: encounter.sprite.region.tag().to_string(),
            mega: encounter.sprite.mega,
            gender: encounter.gender,
            ability: encounter.ability.clone(),
            nature: encounter.nature.clone(),
            ivs: encounter.ivs,
        };
        team.push(record.clone());
        Ok(record)
    }

    fn list_caught(&self, user_id: UserId, channel_id: ChannelId) -> OakResult<Vec<CaughtRecord>> {
        let teams = self
            .teams
            .lock()
            .map_err(|_| OakError::Persistence("catch store lock poisoned".to_string()))?;
        Ok(teams
            .get(&(channel_id, user_id))
            .cloned()
            .unwrap_or_default())
    }
}
