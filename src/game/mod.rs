//! # Game Module
//!
//! The encounter session a chat transport talks to.
//!
//! [`EncounterGame`] owns the registry and the spawner and holds handles to
//! the catalog, the channel config store, the catch store and the
//! compositor. A transport forwards plain messages to
//! [`EncounterGame::on_message`] and catch commands to
//! [`EncounterGame::attempt_capture`], then sends back the captions and
//! images described by the returned outcomes.

pub mod captions;

pub use captions::*;

use crate::{
    matches, AlternateForms, CaptureAttempt, Catalog, CatchStore, CaughtRecord, ChannelConfig,
    ChannelId, Clock, Compositor, ConfigStore, EncounterRegistry, EncounterSpawner, GameConfig,
    InMemoryCatchStore, InMemoryConfigStore, InsertOutcome, OakError, OakResult, RarityTier,
    RenderMode, SpawnRoll, UserId, WildEncounter,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// What a channel message did to the channel's encounter.
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome {
    /// The live encounter had timed out and is gone
    Fled(WildEncounter),
    /// A live encounter is already waiting to be caught
    StillActive,
    /// The spawn-rate draw did not trigger
    NoRoll,
    /// The roll triggered but nothing in the catalog fits the channel
    NoEligibleCreature(RarityTier),
    /// A new encounter was released
    Spawned(WildEncounter),
}

impl SpawnOutcome {
    /// Caption the transport sends with this outcome, if any.
    pub fn caption(&self) -> Option<&'static str> {
        match self {
            SpawnOutcome::Spawned(_) => Some(SPAWN_CAPTION),
            SpawnOutcome::Fled(_) => Some(FLED_CAPTION),
            SpawnOutcome::StillActive
            | SpawnOutcome::NoRoll
            | SpawnOutcome::NoEligibleCreature(_) => None,
        }
    }
}

/// Result of a catch command.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The guess was right and this caller won the encounter
    Caught {
        record: CaughtRecord,
        encounter: WildEncounter,
    },
    /// The guess does not name anything live in the channel
    WrongGuess,
    /// There is nothing to catch in the channel
    NothingHere,
    /// The guess names the host professor
    NotCatchable,
    /// The guess was blank
    EmptyGuess,
}

impl CaptureOutcome {
    /// Reply to the user named `user_name` who guessed `guess`.
    pub fn caption(&self, user_name: &str, guess: &str) -> String {
        match self {
            CaptureOutcome::Caught { encounter, .. } => {
                catch_caption(user_name, encounter.name(), encounter.shiny)
            }
            CaptureOutcome::WrongGuess | CaptureOutcome::NothingHere => {
                wrong_guess_caption(guess.trim())
            }
            CaptureOutcome::NotCatchable => NOT_CATCHABLE_CAPTION.to_string(),
            CaptureOutcome::EmptyGuess => EMPTY_GUESS_CAPTION.to_string(),
        }
    }
}

/// Encounter game session shared by every channel.
pub struct EncounterGame {
    config: GameConfig,
    catalog: Arc<dyn Catalog>,
    channels: Arc<dyn ConfigStore>,
    catches: Arc<dyn CatchStore>,
    registry: EncounterRegistry,
    spawner: EncounterSpawner,
    compositor: Compositor,
}

impl std::fmt::Debug for EncounterGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncounterGame")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("compositor", &self.compositor)
            .finish_non_exhaustive()
    }
}

impl EncounterGame {
    /// Creates a session over the given stores.
    pub fn new(
        config: GameConfig,
        catalog: Arc<dyn Catalog>,
        channels: Arc<dyn ConfigStore>,
        catches: Arc<dyn CatchStore>,
        compositor: Compositor,
        clock: Arc<dyn Clock>,
    ) -> OakResult<Self> {
        config.validate()?;
        let registry = EncounterRegistry::new(config.encounter_timeout(), Arc::clone(&clock));
        let spawner = EncounterSpawner::new(Arc::clone(&catalog), clock);
        Ok(Self {
            config,
            catalog,
            channels,
            catches,
            registry,
            spawner,
            compositor,
        })
    }

    /// Creates a session with in-memory channel and catch stores.
    pub fn in_memory(
        config: GameConfig,
        catalog: Arc<dyn Catalog>,
        compositor: Compositor,
        clock: Arc<dyn Clock>,
    ) -> OakResult<Self> {
        let channels = Arc::new(InMemoryConfigStore::new(config.channel_defaults())?);
        let catches = Arc::new(InMemoryCatchStore::new());
        Self::new(config, catalog, channels, catches, compositor, clock)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &EncounterRegistry {
        &self.registry
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Handles an ordinary message in `channel`.
    ///
    /// A timed out encounter is reported as fled and nothing else happens on
    /// that message. Otherwise, on an empty channel, a uniform draw below the
    /// channel's spawn rate triggers a rarity roll and a spawn.
    pub fn on_message(&self, channel: ChannelId, rng: &mut StdRng) -> OakResult<SpawnOutcome> {
        if let Some(fled) = self.registry.take_expired(channel) {
            return Ok(SpawnOutcome::Fled(fled));
        }
        if self.registry.is_occupied(channel) {
            return Ok(SpawnOutcome::StillActive);
        }

        let channel_config = self.channels.get_channel_config(channel)?;
        let gate: f64 = rng.gen();
        if gate >= channel_config.spawn_rate() {
            return Ok(SpawnOutcome::NoRoll);
        }

        let roll = self
            .config
            .rarity_table
            .roll(rng, self.config.shiny_chance);
        self.release(&channel_config, &roll, rng)
    }

    /// Spawns an encounter for an already evaluated roll and places it in
    /// the channel.
    pub fn release(
        &self,
        channel: &ChannelConfig,
        roll: &SpawnRoll,
        rng: &mut StdRng,
    ) -> OakResult<SpawnOutcome> {
        let encounter = match self.spawner.spawn(channel, roll, rng) {
            Ok(encounter) => encounter,
            Err(OakError::NoEligibleCreature { tier, generations }) => {
                info!(
                    "No {} creature for channel {} in generations {:?}",
                    tier, channel.channel_id, generations
                );
                return Ok(SpawnOutcome::NoEligibleCreature(tier));
            }
            Err(err) => return Err(err),
        };

        match self
            .registry
            .try_insert(channel.channel_id, encounter.clone())
        {
            InsertOutcome::Inserted => Ok(SpawnOutcome::Spawned(encounter)),
            InsertOutcome::Occupied(_) => {
                debug!("Lost the spawn race on channel {}", channel.channel_id);
                Ok(SpawnOutcome::StillActive)
            }
        }
    }

    /// Handles a catch command.
    ///
    /// The match runs inside the channel's critical section, so of several
    /// correct concurrent guesses exactly one is [`CaptureOutcome::Caught`].
    /// When the catch cannot be recorded the encounter goes back into the
    /// channel and the error is returned.
    pub fn attempt_capture(
        &self,
        channel: ChannelId,
        user: UserId,
        guess: &str,
    ) -> OakResult<CaptureOutcome> {
        let trimmed = guess.trim();
        if trimmed.is_empty() {
            return Ok(CaptureOutcome::EmptyGuess);
        }

        match self
            .registry
            .capture_if(channel, |encounter| matches(trimmed, encounter))
        {
            CaptureAttempt::Captured(encounter) => {
                let record = match self.catches.record_catch(user, channel, &encounter) {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(
                            "Could not record {} for user {}: {}",
                            encounter.name(),
                            user,
                            err
                        );
                        self.registry.restore(channel, encounter);
                        return Err(err);
                    }
                };
                info!(
                    "User {} caught {} on channel {}",
                    user,
                    encounter.name(),
                    channel
                );
                Ok(CaptureOutcome::Caught { record, encounter })
            }
            _ if PROFESSOR_NAMES.contains(&trimmed.to_lowercase().as_str()) => {
                Ok(CaptureOutcome::NotCatchable)
            }
            CaptureAttempt::Rejected => Ok(CaptureOutcome::WrongGuess),
            CaptureAttempt::Empty => Ok(CaptureOutcome::NothingHere),
        }
    }

    /// Numbered listing of a user's catches in a channel.
    pub fn team_listing(
        &self,
        user: UserId,
        user_name: &str,
        channel: ChannelId,
    ) -> OakResult<String> {
        let team = self.catches.list_caught(user, channel)?;
        Ok(team_listing(user_name, &team, self.config.team_display_limit))
    }

    /// Applies a "set rate" command argument.
    pub fn set_rate(&self, channel: ChannelId, argument: &str) -> OakResult<f64> {
        let rate = crate::parse_spawn_rate(argument)?;
        self.channels.set_spawn_rate(channel, rate)?;
        Ok(rate)
    }

    /// Applies a "set generations" command argument.
    pub fn set_generations(&self, channel: ChannelId, argument: &str) -> OakResult<Vec<u8>> {
        let generations = crate::parse_generations(argument, self.config.max_generation)?;
        self.channels.set_generations(channel, &generations)?;
        Ok(generations)
    }

    /// Opts a channel in or out of regional and mega art.
    pub fn set_alternate_forms(&self, channel: ChannelId, forms: AlternateForms) -> OakResult<()> {
        self.channels.set_alternate_forms(channel, forms)
    }

    /// Silhouette image of a fresh encounter.
    pub async fn render_teaser(&self, encounter: &WildEncounter) -> OakResult<Vec<u8>> {
        self.compositor
            .render_detached(
                encounter.sprite_path().to_path_buf(),
                encounter.name().to_string(),
                RenderMode::Silhouette,
            )
            .await
    }

    /// Full-color image of a caught encounter.
    pub async fn render_reveal(&self, encounter: &WildEncounter) -> OakResult<Vec<u8>> {
        self.compositor
            .render_detached(
                encounter.sprite_path().to_path_buf(),
                encounter.name().to_string(),
                RenderMode::Reveal,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::creature;
    use crate::{AssetPaths, CompositorSettings, InMemoryCatalog, ManualClock};
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Catch store whose writes fail until it is switched back on.
    #[derive(Default)]
    struct FlakyStore {
        down: AtomicBool,
        inner: InMemoryCatchStore,
    }

    impl CatchStore for FlakyStore {
        fn record_catch(
            &self,
            user_id: UserId,
            channel_id: ChannelId,
            encounter: &WildEncounter,
        ) -> OakResult<CaughtRecord> {
            if self.down.load(Ordering::SeqCst) {
                return Err(OakError::Persistence("db down".to_string()));
            }
            self.inner.record_catch(user_id, channel_id, encounter)
        }

        fn list_caught(&self, user_id: UserId, channel_id: ChannelId) -> OakResult<Vec<CaughtRecord>> {
            self.inner.list_caught(user_id, channel_id)
        }
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(
            vec![
                creature(25, "Pikachu", 1, RarityTier::UltraRare),
                creature(133, "Eevee", 1, RarityTier::Rare),
                creature(19, "Rattata", 1, RarityTier::Common),
                creature(16, "Pidgey", 1, RarityTier::UltraCommon),
            ],
            8,
        )
        .unwrap()
    }

    fn compositor() -> Compositor {
        Compositor::new(AssetPaths::default(), CompositorSettings::default()).unwrap()
    }

    fn game() -> (Arc<ManualClock>, EncounterGame) {
        let clock = Arc::new(ManualClock::new());
        let game = EncounterGame::in_memory(
            GameConfig::for_testing(),
            Arc::new(catalog()),
            compositor(),
            clock.clone(),
        )
        .unwrap();
        (clock, game)
    }

    fn spawned(outcome: SpawnOutcome) -> WildEncounter {
        match outcome {
            SpawnOutcome::Spawned(encounter) => encounter,
            other => panic!("expected a spawn, got {:?}", other),
        }
    }

    #[test]
    fn test_message_spawns_then_stays_active() {
        let (_, game) = game();
        let mut rng = StdRng::seed_from_u64(7);

        let encounter = spawned(game.on_message(-1, &mut rng).unwrap());
        assert!(!encounter.shiny);
        assert_eq!(game.on_message(-1, &mut rng).unwrap(), SpawnOutcome::StillActive);
        assert_eq!(game.registry().peek(-1), Some(encounter));
    }

    #[test]
    fn test_zero_rate_never_spawns() {
        let (_, game) = game();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(game.set_rate(-1, "0").unwrap(), 0.0);
        for _ in 0..100 {
            assert_eq!(game.on_message(-1, &mut rng).unwrap(), SpawnOutcome::NoRoll);
        }
    }

    #[test]
    fn test_flee_after_timeout() {
        let (clock, game) = game();
        let mut rng = StdRng::seed_from_u64(1);
        let encounter = spawned(game.on_message(-1, &mut rng).unwrap());

        clock.advance(Duration::from_secs(121));
        assert_eq!(
            game.on_message(-1, &mut rng).unwrap(),
            SpawnOutcome::Fled(encounter)
        );
        assert_eq!(
            game.attempt_capture(-1, 5, "pikachu").unwrap(),
            CaptureOutcome::NothingHere
        );
    }

    #[test]
    fn test_capture_flow() {
        let (_, game) = game();
        let mut rng = StdRng::seed_from_u64(3);
        let encounter = spawned(game.on_message(-1, &mut rng).unwrap());

        assert_eq!(
            game.attempt_capture(-1, 5, "definitely not it").unwrap(),
            CaptureOutcome::WrongGuess
        );
        assert_eq!(
            game.attempt_capture(-1, 5, "Professor Oak").unwrap(),
            CaptureOutcome::NotCatchable
        );
        assert_eq!(game.attempt_capture(-1, 5, "  ").unwrap(), CaptureOutcome::EmptyGuess);

        let guess = encounter.name().to_uppercase();
        match game.attempt_capture(-1, 5, &guess).unwrap() {
            CaptureOutcome::Caught { record, encounter: caught } => {
                assert_eq!(caught, encounter);
                assert_eq!(record.creature_id, encounter.creature.id);
                assert_eq!(record.team_index, 0);
            }
            other => panic!("expected a catch, got {:?}", other),
        }
        assert_eq!(
            game.attempt_capture(-1, 6, &guess).unwrap(),
            CaptureOutcome::NothingHere
        );

        let listing = game.team_listing(5, "ash", -1).unwrap();
        assert!(listing.contains(&format!("1. {}", encounter.name())));
    }

    #[test]
    fn test_release_with_fixed_roll() {
        let (_, game) = game();
        let mut rng = StdRng::seed_from_u64(11);
        let channel = ChannelConfig::new(-9, 1.0, [1], 8).unwrap();
        let table = &game.config().rarity_table;
        let roll = SpawnRoll {
            tier: table.select_tier(0.01),
            shiny: false,
            tier_roll: 0.01,
        };

        let encounter = spawned(game.release(&channel, &roll, &mut rng).unwrap());
        assert_eq!(encounter.tier, RarityTier::UltraRare);
        assert_eq!(encounter.name(), "Pikachu");
    }

    #[test]
    fn test_no_eligible_creature_is_an_outcome() {
        let (_, game) = game();
        let mut rng = StdRng::seed_from_u64(11);
        let channel = ChannelConfig::new(-9, 1.0, [4], 8).unwrap();
        let roll = SpawnRoll {
            tier: RarityTier::Common,
            shiny: false,
            tier_roll: 0.3,
        };
        assert_eq!(
            game.release(&channel, &roll, &mut rng).unwrap(),
            SpawnOutcome::NoEligibleCreature(RarityTier::Common)
        );
        assert!(!game.registry().is_occupied(-9));
    }

    #[test]
    fn test_failed_persist_keeps_the_encounter() {
        let config = GameConfig::for_testing();
        let store = Arc::new(FlakyStore::default());
        let channels = Arc::new(InMemoryConfigStore::new(config.channel_defaults()).unwrap());
        let game = EncounterGame::new(
            config,
            Arc::new(catalog()),
            channels,
            store.clone(),
            compositor(),
            Arc::new(ManualClock::new()),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let encounter = spawned(game.on_message(-1, &mut rng).unwrap());

        store.down.store(true, Ordering::SeqCst);
        let result = game.attempt_capture(-1, 5, encounter.name());
        assert!(matches!(result, Err(OakError::Persistence(_))));
        assert_eq!(game.registry().peek(-1), Some(encounter.clone()));

        store.down.store(false, Ordering::SeqCst);
        assert!(matches!(
            game.attempt_capture(-1, 5, encounter.name()).unwrap(),
            CaptureOutcome::Caught { .. }
        ));
        assert_eq!(store.list_caught(5, -1).unwrap().len(), 1);
    }

    #[test]
    fn test_outcome_captions() {
        let (clock, game) = game();
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = game.on_message(-1, &mut rng).unwrap();
        assert_eq!(outcome.caption(), Some(SPAWN_CAPTION));
        assert_eq!(game.on_message(-1, &mut rng).unwrap().caption(), None);
        assert_eq!(SpawnOutcome::NoRoll.caption(), None);

        clock.advance(Duration::from_secs(121));
        assert_eq!(game.on_message(-1, &mut rng).unwrap().caption(), Some(FLED_CAPTION));

        assert_eq!(
            CaptureOutcome::NotCatchable.caption("ash", "oak"),
            "Hey! I'm not yours to catch!"
        );
        assert_eq!(
            CaptureOutcome::EmptyGuess.caption("ash", ""),
            "You must tell me which creature you want to catch"
        );
        assert_eq!(
            CaptureOutcome::NothingHere.caption("ash", " mew "),
            "Hm no, I haven't seen any wild mew"
        );

        let encounter = spawned(game.on_message(-1, &mut rng).unwrap());
        let caught = game.attempt_capture(-1, 5, encounter.name()).unwrap();
        assert_eq!(
            caught.caption("ash", encounter.name()),
            format!("Congratulations ash! {} was caught!", encounter.name())
        );
    }

    #[test]
    fn test_set_generations_command() {
        let (_, game) = game();
        assert_eq!(game.set_generations(-1, "1,2").unwrap(), vec![1, 2]);
        assert!(game.set_generations(-1, "1,12").is_err());
        assert!(game.set_rate(-1, "1.5").is_err());
    }
}
