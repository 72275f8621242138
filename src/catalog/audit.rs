//! # Data Audit
//!
//! Cross-checks catalog records against the sprite files on disk.

use super::{CreatureRecord, GenderTag, Region, SpriteIndex, SpriteVariant};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Problem found with a creature's art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArtProblem {
    /// No sprite at all
    NoSprites,
    /// Normal art without a shiny counterpart
    MissingShiny(PathBuf),
    /// Shiny art without a normal counterpart
    MissingNormal(PathBuf),
}

/// Result of [`audit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataAudit {
    /// Enabled creatures whose art is incomplete, with the problems found
    pub incomplete: Vec<(u32, String, Vec<ArtProblem>)>,
    /// Sprite files no catalog record claims
    pub orphans: Vec<PathBuf>,
}

impl DataAudit {
    /// Whether nothing was found.
    pub fn is_clean(&self) -> bool {
        self.incomplete.is_empty() && self.orphans.is_empty()
    }
}

type ArtKey = (u8, Region, bool, GenderTag);

/// Dex number, form, region and mega flag: what ties a sprite to a record.
type OwnerKey = (u16, u8, Region, bool);

fn art_key(sprite: &SpriteVariant) -> ArtKey {
    (sprite.form, sprite.region.clone(), sprite.mega, sprite.gender)
}

/// Checks that every enabled creature has matching normal and shiny art and
/// that every sprite belongs to a record.
pub fn audit<'a>(
    records: impl IntoIterator<Item = &'a CreatureRecord>,
    sprites: &SpriteIndex,
) -> DataAudit {
    let mut report = DataAudit::default();
    let mut claimed: HashSet<OwnerKey> = HashSet::new();

    for record in records {
        claimed.insert((record.number, record.form, record.region.clone(), record.mega));
        if !record.enabled {
            continue;
        }

        let mut problems = Vec::new();
        if record.sprites.is_empty() {
            problems.push(ArtProblem::NoSprites);
        }
        let keys = |shiny: bool| -> HashSet<ArtKey> {
            record
                .sprites
                .iter()
                .filter(|sprite| sprite.shiny == shiny)
                .map(art_key)
                .collect()
        };
        let (normal, shiny) = (keys(false), keys(true));
        for sprite in &record.sprites {
            let key = art_key(sprite);
            if !sprite.shiny && !shiny.contains(&key) {
                problems.push(ArtProblem::MissingShiny(sprite.path.clone()));
            }
            if sprite.shiny && !normal.contains(&key) {
                problems.push(ArtProblem::MissingNormal(sprite.path.clone()));
            }
        }

        if !problems.is_empty() {
            report
                .incomplete
                .push((record.id, record.name.clone(), problems));
        }
    }

    report.orphans = sprites
        .iter()
        .filter(|sprite| {
            !claimed.contains(&(sprite.number, sprite.form, sprite.region.clone(), sprite.mega))
        })
        .map(|sprite| sprite.path.clone())
        .collect();
    report
}
