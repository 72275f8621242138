//! # Encounter Spawner
//!
//! Turns a channel configuration and a spawn roll into a concrete
//! [`WildEncounter`]. The spawner only builds the value; placing it in the
//! registry is up to the caller.

use crate::{
    Catalog, ChannelConfig, Clock, CreatureFilter, CreatureRecord, Gender, GenderTag,
    IndividualValues, OakError, OakResult, SpawnRoll, SpriteVariant, VariantConstraints,
    WildEncounter,
};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

/// Builds wild encounters from catalog data.
#[derive(Clone)]
pub struct EncounterSpawner {
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EncounterSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncounterSpawner")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl EncounterSpawner {
    /// Creates a spawner reading from `catalog` and stamping times from `clock`.
    pub fn new(catalog: Arc<dyn Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    /// Draws one encounter for `channel` in the rolled tier.
    ///
    /// Candidates are the enabled creatures of the rolled tier in the
    /// channel's generations that have at least one usable sprite. One is
    /// picked uniformly, then one of its sprites is picked uniformly.
    ///
    /// Regional and mega forms are only used when the channel opted in. A
    /// shiny roll falls back to normal art, and drops the shiny flag, when no
    /// candidate has shiny art. Gender, ability, nature and individual values
    /// are rolled last, in that order.
    pub fn spawn(
        &self,
        channel: &ChannelConfig,
        roll: &SpawnRoll,
        rng: &mut StdRng,
    ) -> OakResult<WildEncounter> {
        let filter = CreatureFilter::spawnable(
            channel.generations().clone(),
            roll.tier,
            channel.alternate_forms.mega,
        );
        let creatures = self.catalog.list_creatures(&filter)?;

        let mut constraints = VariantConstraints {
            shiny: roll.shiny,
            include_regional: channel.alternate_forms.regional,
            include_mega: channel.alternate_forms.mega,
        };

        let mut candidates = self.candidates(&creatures, &constraints)?;
        if candidates.is_empty() && constraints.shiny {
            warn!(
                "No shiny art for tier {} in channel {}, spawning normal art",
                roll.tier, channel.channel_id
            );
            constraints.shiny = false;
            candidates = self.candidates(&creatures, &constraints)?;
        }

        let Some((creature, sprites)) = candidates.choose(rng) else {
            return Err(OakError::NoEligibleCreature {
                tier: roll.tier,
                generations: channel.generations().iter().copied().collect(),
            });
        };
        let sprite = sprites
            .choose(rng)
            .cloned()
            .ok_or_else(|| OakError::Catalog(format!("{} lost its sprites", creature.name)))?;

        let gender = roll_gender(sprite.gender, rng);
        let ability = roll_ability(creature, rng);
        let nature = self
            .catalog
            .natures()?
            .choose(rng)
            .map(|nature| nature.name.clone())
            .ok_or_else(|| OakError::Catalog("nature table is empty".to_string()))?;

        let encounter = WildEncounter {
            id: Uuid::new_v4(),
            gender,
            ability,
            nature,
            ivs: IndividualValues::roll(rng),
            creature: Arc::clone(creature),
            sprite,
            tier: roll.tier,
            shiny: constraints.shiny,
            spawned_at: self.clock.now(),
        };
        debug!(
            "Spawned {} from {} candidates ({})",
            encounter.name(),
            candidates.len(),
            encounter.sprite.path.display()
        );
        Ok(encounter)
    }

    fn candidates(
        &self,
        creatures: &[Arc<CreatureRecord>],
        constraints: &VariantConstraints,
    ) -> OakResult<Vec<(Arc<CreatureRecord>, Vec<SpriteVariant>)>> {
        let mut candidates = Vec::with_capacity(creatures.len());
        for creature in creatures {
            let sprites = self.catalog.get_sprite_paths(creature.id, constraints)?;
            if !sprites.is_empty() {
                candidates.push((Arc::clone(creature), sprites));
            }
        }
        Ok(candidates)
    }
}

fn roll_gender(tag: GenderTag, rng: &mut StdRng) -> Gender {
    match tag {
        GenderTag::MaleOnly | GenderTag::MaleDifference => Gender::Male,
        GenderTag::FemaleOnly | GenderTag::FemaleDifference => Gender::Female,
        GenderTag::Unknown => Gender::Genderless,
        GenderTag::Both => {
            if rng.gen_bool(0.5) {
                Gender::Male
            } else {
                Gender::Female
            }
        }
    }
}

fn roll_ability(creature: &CreatureRecord, rng: &mut StdRng) -> String {
    creature
        .abilities
        .all()
        .choose(rng)
        .map(|ability| ability.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{creature, sprite};
    use crate::{AlternateForms, InMemoryCatalog, ManualClock, Nature, RarityTier};
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn roll(tier: RarityTier, shiny: bool) -> SpawnRoll {
        SpawnRoll {
            tier,
            shiny,
            tier_roll: 0.0,
        }
    }

    fn spawner(records: Vec<CreatureRecord>) -> EncounterSpawner {
        let catalog = InMemoryCatalog::new(records, 8).unwrap();
        EncounterSpawner::new(Arc::new(catalog), Arc::new(ManualClock::new()))
    }

    fn channel(generations: &[u8]) -> ChannelConfig {
        ChannelConfig::new(-1, 1.0, generations.iter().copied(), 8).unwrap()
    }

    #[test]
    fn test_spawn_respects_tier_and_generation() {
        let spawner = spawner(vec![
            creature(1, "Bulbasaur", 1, RarityTier::Common),
            creature(4, "Charmander", 1, RarityTier::Rare),
            creature(152, "Chikorita", 2, RarityTier::Common),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..50 {
            let encounter = spawner
                .spawn(&channel(&[1]), &roll(RarityTier::Common, false), &mut rng)
                .unwrap();
            assert_eq!(encounter.name(), "Bulbasaur");
            assert_eq!(encounter.tier, RarityTier::Common);
            assert!(!encounter.shiny);
            assert!(!encounter.sprite.shiny);
        }
    }

    #[test]
    fn test_spawn_without_candidates() {
        let spawner = spawner(vec![creature(1, "Bulbasaur", 1, RarityTier::Common)]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = spawner.spawn(&channel(&[2]), &roll(RarityTier::Common, false), &mut rng);
        assert!(matches!(result, Err(OakError::NoEligibleCreature { .. })));

        let result = spawner.spawn(&channel(&[1]), &roll(RarityTier::UltraRare, false), &mut rng);
        assert!(matches!(
            result,
            Err(OakError::NoEligibleCreature {
                tier: RarityTier::UltraRare,
                ..
            })
        ));
    }

    #[test]
    fn test_spawn_skips_disabled_and_mega() {
        let mut disabled = creature(2, "Ivysaur", 1, RarityTier::Common);
        disabled.enabled = false;
        let mut mega = creature(3, "Mega Venusaur", 1, RarityTier::Common);
        mega.mega = true;
        let spawner = spawner(vec![disabled, mega]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = spawner.spawn(&channel(&[1]), &roll(RarityTier::Common, false), &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_spawn_picks_uniformly() {
        let spawner = spawner(vec![
            creature(1, "Bulbasaur", 1, RarityTier::Common),
            creature(4, "Charmander", 1, RarityTier::Common),
            creature(7, "Squirtle", 1, RarityTier::Common),
        ]);
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = std::collections::HashMap::new();
        for _ in 0..3_000 {
            let encounter = spawner
                .spawn(&channel(&[1]), &roll(RarityTier::Common, false), &mut rng)
                .unwrap();
            *seen.entry(encounter.creature.id).or_insert(0usize) += 1;
        }
        assert_eq!(seen.len(), 3);
        for count in seen.values() {
            assert!(*count > 850 && *count < 1150, "count {}", count);
        }
    }

    #[test]
    fn test_regional_art_requires_opt_in() {
        let mut raichu = creature(26, "Raichu", 1, RarityTier::Rare);
        raichu.sprites.push(sprite(26, "alolan", false, false));
        raichu.sprites.push(sprite(26, "global", false, true));
        let spawner = spawner(vec![raichu]);
        let mut rng = StdRng::seed_from_u64(5);

        let mut regions = HashSet::new();
        for _ in 0..200 {
            let encounter = spawner
                .spawn(&channel(&[1]), &roll(RarityTier::Rare, false), &mut rng)
                .unwrap();
            assert!(!encounter.sprite.is_alternate_form());
            regions.insert(encounter.sprite.region.tag().to_string());
        }
        assert_eq!(regions.len(), 1);

        let mut opted_in = channel(&[1]);
        opted_in.alternate_forms = AlternateForms {
            regional: true,
            mega: false,
        };
        for _ in 0..200 {
            let encounter = spawner
                .spawn(&opted_in, &roll(RarityTier::Rare, false), &mut rng)
                .unwrap();
            assert!(!encounter.sprite.mega);
            regions.insert(encounter.sprite.region.tag().to_string());
        }
        assert!(regions.contains("alolan"));
    }

    #[test]
    fn test_shiny_roll_uses_shiny_art() {
        let spawner = spawner(vec![creature(1, "Bulbasaur", 1, RarityTier::Common)]);
        let mut rng = StdRng::seed_from_u64(1);
        let encounter = spawner
            .spawn(&channel(&[1]), &roll(RarityTier::Common, true), &mut rng)
            .unwrap();
        assert!(encounter.shiny);
        assert!(encounter.sprite.shiny);
    }

    #[test]
    fn test_shiny_roll_without_shiny_art_falls_back() {
        let mut bulbasaur = creature(1, "Bulbasaur", 1, RarityTier::Common);
        bulbasaur.sprites.retain(|sprite| !sprite.shiny);
        let spawner = spawner(vec![bulbasaur]);
        let mut rng = StdRng::seed_from_u64(1);
        let encounter = spawner
            .spawn(&channel(&[1]), &roll(RarityTier::Common, true), &mut rng)
            .unwrap();
        assert!(!encounter.shiny);
        assert!(!encounter.sprite.shiny);
    }

    #[test]
    fn test_same_seed_same_spawn() {
        let records = vec![
            creature(1, "Bulbasaur", 1, RarityTier::Common),
            creature(4, "Charmander", 1, RarityTier::Common),
            creature(7, "Squirtle", 1, RarityTier::Common),
        ];
        let spawner = spawner(records);
        let mut first = StdRng::seed_from_u64(2024);
        let mut second = StdRng::seed_from_u64(2024);
        for _ in 0..20 {
            let a = spawner
                .spawn(&channel(&[1]), &roll(RarityTier::Common, false), &mut first)
                .unwrap();
            let b = spawner
                .spawn(&channel(&[1]), &roll(RarityTier::Common, false), &mut second)
                .unwrap();
            assert_eq!(a.creature.id, b.creature.id);
            assert_eq!(a.sprite, b.sprite);
            assert_eq!(a.ability, b.ability);
            assert_eq!(a.gender, b.gender);
            assert_eq!(a.nature, b.nature);
            assert_eq!(a.ivs, b.ivs);
        }
    }

    #[test]
    fn test_nature_comes_from_the_catalog() {
        let bold = Nature {
            name: "Bold".to_string(),
            increases: None,
            decreases: None,
        };
        let catalog = InMemoryCatalog::new(vec![creature(1, "Bulbasaur", 1, RarityTier::Common)], 8)
            .unwrap()
            .with_natures(vec![bold])
            .unwrap();
        let spawner = EncounterSpawner::new(Arc::new(catalog), Arc::new(ManualClock::new()));
        let mut rng = StdRng::seed_from_u64(21);

        let mut iv_totals = HashSet::new();
        for _ in 0..30 {
            let encounter = spawner
                .spawn(&channel(&[1]), &roll(RarityTier::Common, false), &mut rng)
                .unwrap();
            assert_eq!(encounter.nature, "Bold");
            assert!(encounter.ivs.hp <= 31 && encounter.ivs.speed <= 31);
            iv_totals.insert(encounter.ivs.total());
        }
        assert!(iv_totals.len() > 1);
    }

    #[test]
    fn test_mega_forms_require_opt_in() {
        let mut mega = creature(10006, "Mega Charizard", 1, RarityTier::Rare);
        mega.number = 6;
        mega.mega = true;
        mega.sprites = vec![sprite(6, "global", false, true), sprite(6, "global", true, true)];
        let spawner = spawner(vec![mega]);
        let mut rng = StdRng::seed_from_u64(8);

        let result = spawner.spawn(&channel(&[1]), &roll(RarityTier::Rare, false), &mut rng);
        assert!(matches!(result, Err(OakError::NoEligibleCreature { .. })));

        let mut opted_in = channel(&[1]);
        opted_in.alternate_forms = AlternateForms {
            regional: false,
            mega: true,
        };
        let encounter = spawner
            .spawn(&opted_in, &roll(RarityTier::Rare, false), &mut rng)
            .unwrap();
        assert_eq!(encounter.name(), "Mega Charizard");
        assert!(encounter.sprite.mega);
    }

    #[test]
    fn test_gender_follows_sprite_tag() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_gender(GenderTag::MaleDifference, &mut rng), Gender::Male);
        assert_eq!(roll_gender(GenderTag::FemaleOnly, &mut rng), Gender::Female);
        assert_eq!(roll_gender(GenderTag::Unknown, &mut rng), Gender::Genderless);
        assert_ne!(roll_gender(GenderTag::Both, &mut rng), Gender::Genderless);
    }
}
