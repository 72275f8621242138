//! # Catalog Module
//!
//! Read-only reference data: creature records and the sprite art available
//! for each of them.
//!
//! Records are loaded once at startup and never mutated. Consumers query the
//! catalog through the [`Catalog`] trait so that the backing store can be a
//! JSON file, a database or a test fixture.

pub mod audit;
pub mod natures;
pub mod sprites;

pub use audit::*;
pub use natures::*;
pub use sprites::*;

use crate::{OakError, OakResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Named probability bucket a creature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RarityTier {
    UltraRare,
    Rare,
    Common,
    UltraCommon,
}

impl RarityTier {
    /// All tiers from rarest to most common.
    pub fn all() -> [RarityTier; 4] {
        [
            RarityTier::UltraRare,
            RarityTier::Rare,
            RarityTier::Common,
            RarityTier::UltraCommon,
        ]
    }

    /// Name used in configuration files and logs.
    pub fn name(self) -> &'static str {
        match self {
            RarityTier::UltraRare => "ultra-rare",
            RarityTier::Rare => "rare",
            RarityTier::Common => "common",
            RarityTier::UltraCommon => "ultra-common",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Abilities a creature may roll when it spawns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Abilities {
    /// Primary ability
    pub primary: String,
    /// Secondary ability, if any
    #[serde(default)]
    pub secondary: Option<String>,
    /// Hidden ability, if any
    #[serde(default)]
    pub hidden: Option<String>,
}

impl Abilities {
    /// All abilities in declaration order.
    pub fn all(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str())
            .chain(self.secondary.as_deref())
            .chain(self.hidden.as_deref())
            .filter(|ability| !ability.is_empty())
            .collect()
    }
}

/// Immutable reference record of one creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    /// Unique catalog id
    pub id: u32,
    /// Dex number shared by all forms of the species
    pub number: u16,
    /// Form id within the dex number
    pub form: u8,
    /// Regional tag of this form
    pub region: Region,
    /// Display name
    pub name: String,
    /// Generation the creature was introduced in
    pub generation: u8,
    /// Rarity bucket
    pub rarity: RarityTier,
    /// Mega-only entry, never spawned in the wild
    pub mega: bool,
    /// Disabled entries are kept for history but never spawn
    pub enabled: bool,
    /// Legendary flag
    pub legendary: bool,
    /// Elemental types
    pub types: Vec<String>,
    /// Possible abilities
    pub abilities: Abilities,
    /// Sprite art available for this creature
    pub sprites: Vec<SpriteVariant>,
}

impl CreatureRecord {
    /// Whether `sprite` depicts this record: same dex number, form, region
    /// and mega flag.
    pub fn owns(&self, sprite: &SpriteVariant) -> bool {
        sprite.number == self.number
            && sprite.form == self.form
            && sprite.region == self.region
            && sprite.mega == self.mega
    }

    /// Sprites matching the given constraints.
    pub fn sprites_matching(&self, constraints: &VariantConstraints) -> Vec<SpriteVariant> {
        self.sprites
            .iter()
            .filter(|sprite| sprite.satisfies(constraints))
            .cloned()
            .collect()
    }
}

/// Query used to list spawnable creatures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreatureFilter {
    /// Allowed generations; empty allows none
    pub generations: BTreeSet<u8>,
    /// Required rarity tier, if any
    pub rarity: Option<RarityTier>,
    /// Skip mega entries
    pub exclude_mega: bool,
    /// Skip disabled entries
    pub enabled_only: bool,
}

impl CreatureFilter {
    /// Filter used for wild spawns: enabled entries of the given tier and
    /// generations. Mega entries only pass when `include_mega` is set.
    pub fn spawnable(generations: BTreeSet<u8>, rarity: RarityTier, include_mega: bool) -> Self {
        Self {
            generations,
            rarity: Some(rarity),
            exclude_mega: !include_mega,
            enabled_only: true,
        }
    }

    /// Whether a record passes this filter.
    pub fn accepts(&self, record: &CreatureRecord) -> bool {
        self.generations.contains(&record.generation)
            && self.rarity.map_or(true, |tier| tier == record.rarity)
            && !(self.exclude_mega && record.mega)
            && !(self.enabled_only && !record.enabled)
    }
}

/// Read-only access to creature reference data.
pub trait Catalog: Send + Sync {
    /// Lists the creatures accepted by `filter`, ordered by id.
    fn list_creatures(&self, filter: &CreatureFilter) -> OakResult<Vec<Arc<CreatureRecord>>>;

    /// Lists the sprites of a creature that satisfy `constraints`.
    fn get_sprite_paths(
        &self,
        creature_id: u32,
        constraints: &VariantConstraints,
    ) -> OakResult<Vec<SpriteVariant>>;

    /// Looks up one creature by id.
    fn get_creature(&self, creature_id: u32) -> OakResult<Arc<CreatureRecord>>;

    /// Natures a spawn may roll.
    fn natures(&self) -> OakResult<Vec<Nature>>;
}

/// Row format of the catalog JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureRow {
    pub id: u32,
    pub number: u16,
    #[serde(default = "base_form")]
    pub form: u8,
    #[serde(default)]
    pub region: Region,
    pub name: String,
    pub generation: u8,
    pub rarity: RarityTier,
    #[serde(default)]
    pub mega: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub legendary: bool,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub abilities: Abilities,
}

fn enabled_by_default() -> bool {
    true
}

fn base_form() -> u8 {
    1
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    records: Vec<Arc<CreatureRecord>>,
    by_id: HashMap<u32, usize>,
    natures: Vec<Nature>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            by_id: HashMap::new(),
            natures: Nature::standard(),
        }
    }
}

impl InMemoryCatalog {
    /// Builds a catalog from complete records with the standard natures.
    ///
    /// Fails on duplicate ids or generations outside `1..=max_generation`.
    pub fn new(records: Vec<CreatureRecord>, max_generation: u8) -> OakResult<Self> {
        let mut catalog = Self::default();

        for record in records {
            if record.generation == 0 || record.generation > max_generation {
                return Err(OakError::Catalog(format!(
                    "{} (#{}) has generation {} outside 1..={}",
                    record.name, record.id, record.generation, max_generation
                )));
            }
            if catalog.by_id.contains_key(&record.id) {
                return Err(OakError::Catalog(format!(
                    "duplicate creature id {}",
                    record.id
                )));
            }
            catalog.by_id.insert(record.id, catalog.records.len());
            catalog.records.push(Arc::new(record));
        }

        catalog.records.sort_by_key(|record| record.id);
        catalog.by_id = catalog
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.id, idx))
            .collect();
        Ok(catalog)
    }

    /// Builds a catalog from JSON rows and attaches sprites.
    ///
    /// A row receives the sprites of its own dex number, form, region and
    /// mega flag, so the global and regional forms of a species are separate
    /// records with separate art.
    pub fn from_rows(
        rows: Vec<CreatureRow>,
        sprites: &SpriteIndex,
        max_generation: u8,
    ) -> OakResult<Self> {
        let records = rows
            .into_iter()
            .map(|row| {
                let mut record = CreatureRecord {
                    id: row.id,
                    number: row.number,
                    form: row.form,
                    region: row.region,
                    name: row.name,
                    generation: row.generation,
                    rarity: row.rarity,
                    mega: row.mega,
                    enabled: row.enabled,
                    legendary: row.legendary,
                    types: row.types,
                    abilities: row.abilities,
                    sprites: Vec::new(),
                };
                record.sprites = sprites
                    .variants(record.number)
                    .iter()
                    .filter(|sprite| record.owns(sprite))
                    .cloned()
                    .collect();
                if record.sprites.is_empty() && record.enabled {
                    warn!("{} (#{}) has no sprites", record.name, record.id);
                }
                record
            })
            .collect();

        Self::new(records, max_generation)
    }

    /// Loads the catalog JSON file and scans the sprite directory.
    pub fn load(
        catalog_path: impl AsRef<Path>,
        sprite_dir: impl AsRef<Path>,
        max_generation: u8,
    ) -> OakResult<Self> {
        let contents = std::fs::read_to_string(catalog_path.as_ref())?;
        let rows: Vec<CreatureRow> = serde_json::from_str(&contents)?;
        let sprites = SpriteIndex::scan(sprite_dir)?;
        let catalog = Self::from_rows(rows, &sprites, max_generation)?;
        info!(
            "Loaded {} creatures and {} sprites",
            catalog.len(),
            sprites.len()
        );
        Ok(catalog)
    }

    /// Replaces the nature table.
    pub fn with_natures(mut self, natures: Vec<Nature>) -> OakResult<Self> {
        validate_natures(&natures)?;
        self.natures = natures;
        Ok(self)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records ordered by id.
    pub fn records(&self) -> &[Arc<CreatureRecord>] {
        &self.records
    }
}

impl Catalog for InMemoryCatalog {
    fn list_creatures(&self, filter: &CreatureFilter) -> OakResult<Vec<Arc<CreatureRecord>>> {
        Ok(self
            .records
            .iter()
            .filter(|record| filter.accepts(record))
            .cloned()
            .collect())
    }

    fn get_sprite_paths(
        &self,
        creature_id: u32,
        constraints: &VariantConstraints,
    ) -> OakResult<Vec<SpriteVariant>> {
        Ok(self.get_creature(creature_id)?.sprites_matching(constraints))
    }

    fn get_creature(&self, creature_id: u32) -> OakResult<Arc<CreatureRecord>> {
        self.by_id
            .get(&creature_id)
            .map(|&idx| Arc::clone(&self.records[idx]))
            .ok_or_else(|| OakError::Catalog(format!("unknown creature id {}", creature_id)))
    }

    fn natures(&self) -> OakResult<Vec<Nature>> {
        Ok(self.natures.clone())
    }
}

/// Test fixtures shared by unit and integration tests.
pub mod fixtures {
    use super::*;
    use std::path::PathBuf;

    /// Builds a record with one normal and one shiny base sprite.
    pub fn creature(id: u32, name: &str, generation: u8, rarity: RarityTier) -> CreatureRecord {
        let number = id as u16;
        CreatureRecord {
            id,
            number,
            form: 1,
            region: Region::global(),
            name: name.to_string(),
            generation,
            rarity,
            mega: false,
            enabled: true,
            legendary: false,
            types: vec!["normal".to_string()],
            abilities: Abilities {
                primary: "run-away".to_string(),
                secondary: None,
                hidden: Some("guts".to_string()),
            },
            sprites: vec![
                sprite(number, "global", false, false),
                sprite(number, "global", true, false),
            ],
        }
    }

    /// Builds a sprite variant with a conventional file name.
    pub fn sprite(number: u16, region: &str, shiny: bool, mega: bool) -> SpriteVariant {
        let path = PathBuf::from(format!(
            "{:04}_01_{}_{}_{}_mf.png",
            number,
            region,
            if shiny { "s" } else { "n" },
            if mega { "m" } else { "n" },
        ));
        SpriteVariant {
            number,
            form: 1,
            region: Region::new(region),
            shiny,
            mega,
            gender: GenderTag::Both,
            path,
        }
    }
}
