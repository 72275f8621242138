//! # Sprite Variants
//!
//! Sprite assets are plain files whose names encode the variant they depict:
//!
//! ```text
//! NNNN_FF_region_S_M_gender.png
//! 0026_01_alolan_n_n_mf.png
//! ```
//!
//! `NNNN` is the dex number, `FF` the form id, `region` the regional tag
//! (`global` for the base form), `S` is `n`/`s` for normal/shiny, `M` is
//! `n`/`m` for regular/mega and `gender` describes which genders the art covers.

use crate::{OakError, OakResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Regional tag of a sprite, e.g. `global`, `alolan` or `galarian`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Region(String);

impl Region {
    /// Tag used by base forms.
    pub const GLOBAL: &'static str = "global";

    /// Creates a region from its tag. Tags are stored lowercase.
    ///
    /// # Examples
    ///
    /// ```
    /// use oakoak::Region;
    ///
    /// let region = Region::new("Alolan");
    /// assert_eq!(region.tag(), "alolan");
    /// assert!(region.is_regional());
    /// assert!(!Region::global().is_regional());
    /// ```
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase())
    }

    /// The base, non-regional form.
    pub fn global() -> Self {
        Self(Self::GLOBAL.to_string())
    }

    /// Raw tag.
    pub fn tag(&self) -> &str {
        &self.0
    }

    /// Whether this is a named regional form.
    pub fn is_regional(&self) -> bool {
        !self.0.is_empty() && self.0 != Self::GLOBAL
    }

    /// Words a player may use to qualify a regional form, longest first.
    ///
    /// Contains the adjective itself, its stem without the final letter
    /// (`alolan` / `alola`) and the place name for regions whose stem is not
    /// a word on its own (`galarian` / `galar`).
    pub fn qualifiers(&self) -> Vec<String> {
        if !self.is_regional() {
            return Vec::new();
        }

        let mut words = vec![self.0.clone()];
        let mut chars = self.0.chars();
        chars.next_back();
        let stem = chars.as_str();
        if !stem.is_empty() {
            words.push(stem.to_string());
        }
        let place = match self.0.as_str() {
            "galarian" => Some("galar"),
            "hisuian" => Some("hisui"),
            "paldean" => Some("paldea"),
            _ => None,
        };
        if let Some(place) = place {
            words.push(place.to_string());
        }

        words.sort_by_key(|word| std::cmp::Reverse(word.len()));
        words.dedup();
        words
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::global()
    }
}

impl From<String> for Region {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which genders a sprite covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenderTag {
    /// Both genders share this art (`mf`)
    Both,
    /// Male-only species (`mo`)
    MaleOnly,
    /// Female-only species (`fo`)
    FemaleOnly,
    /// Male art of a species with visible differences (`md`)
    MaleDifference,
    /// Female art of a species with visible differences (`fd`)
    FemaleDifference,
    /// Genderless species (`uk`)
    Unknown,
}

impl FromStr for GenderTag {
    type Err = OakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mf" => Ok(GenderTag::Both),
            "mo" => Ok(GenderTag::MaleOnly),
            "fo" => Ok(GenderTag::FemaleOnly),
            "md" => Ok(GenderTag::MaleDifference),
            "fd" => Ok(GenderTag::FemaleDifference),
            "uk" => Ok(GenderTag::Unknown),
            other => Err(OakError::Catalog(format!("unknown gender tag '{}'", other))),
        }
    }
}

/// One sprite file and the variant attributes parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteVariant {
    /// Dex number
    pub number: u16,
    /// Form id
    pub form: u8,
    /// Regional tag
    pub region: Region,
    /// Shiny coloring
    pub shiny: bool,
    /// Mega evolution art
    pub mega: bool,
    /// Genders covered by the art
    pub gender: GenderTag,
    /// Location of the asset
    pub path: PathBuf,
}

impl SpriteVariant {
    /// Parses a sprite path following the `NNNN_FF_region_S_M_gender.png`
    /// convention.
    ///
    /// # Examples
    ///
    /// ```
    /// use oakoak::{GenderTag, SpriteVariant};
    ///
    /// let sprite = SpriteVariant::parse_path("sprites/0026_01_alolan_s_n_mf.png").unwrap();
    /// assert_eq!(sprite.number, 26);
    /// assert_eq!(sprite.region.tag(), "alolan");
    /// assert!(sprite.shiny);
    /// assert_eq!(sprite.gender, GenderTag::Both);
    /// ```
    pub fn parse_path(path: impl AsRef<Path>) -> OakResult<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| bad_name(path, "no file name"))?;

        let parts: Vec<&str> = stem.split('_').collect();
        let [number, form, region, shiny, mega, gender] = parts[..] else {
            return Err(bad_name(path, "expected 6 '_' separated fields"));
        };

        let number = number
            .parse()
            .map_err(|_| bad_name(path, "dex number is not numeric"))?;
        let form = form
            .parse()
            .map_err(|_| bad_name(path, "form is not numeric"))?;
        let shiny = match shiny {
            "n" => false,
            "s" => true,
            _ => return Err(bad_name(path, "shiny flag must be 'n' or 's'")),
        };
        let mega = match mega {
            "n" => false,
            "m" => true,
            _ => return Err(bad_name(path, "mega flag must be 'n' or 'm'")),
        };

        Ok(Self {
            number,
            form,
            region: Region::new(region),
            shiny,
            mega,
            gender: gender.parse()?,
            path: path.to_path_buf(),
        })
    }

    /// Whether this art shows an alternate form (regional or mega).
    pub fn is_alternate_form(&self) -> bool {
        self.mega || self.region.is_regional()
    }

    /// Whether the sprite satisfies the given constraints.
    pub fn satisfies(&self, constraints: &VariantConstraints) -> bool {
        self.shiny == constraints.shiny
            && (constraints.include_regional || !self.region.is_regional())
            && (constraints.include_mega || !self.mega)
    }
}

fn bad_name(path: &Path, reason: &str) -> OakError {
    OakError::Catalog(format!(
        "sprite '{}' does not follow the naming convention: {}",
        path.display(),
        reason
    ))
}

/// Constraints used when resolving which sprite a spawn will use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantConstraints {
    /// Require shiny art
    pub shiny: bool,
    /// Allow regional forms
    pub include_regional: bool,
    /// Allow mega art
    pub include_mega: bool,
}

/// Sprite variants grouped by dex number.
#[derive(Debug, Clone, Default)]
pub struct SpriteIndex {
    by_number: HashMap<u16, Vec<SpriteVariant>>,
}

impl SpriteIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans a directory for `.png` sprites.
    ///
    /// Files that do not follow the naming convention are skipped with a
    /// warning. Variants are kept sorted by path so repeated scans of the same
    /// directory produce the same order.
    pub fn scan(dir: impl AsRef<Path>) -> OakResult<Self> {
        let mut index = Self::new();

        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
                continue;
            }
            match SpriteVariant::parse_path(&path) {
                Ok(variant) => index.insert(variant),
                Err(e) => warn!("Skipping sprite: {}", e),
            }
        }

        for variants in index.by_number.values_mut() {
            variants.sort_by(|a, b| a.path.cmp(&b.path));
        }
        Ok(index)
    }

    /// Adds one variant.
    pub fn insert(&mut self, variant: SpriteVariant) {
        self.by_number.entry(variant.number).or_default().push(variant);
    }

    /// All variants for a dex number.
    pub fn variants(&self, number: u16) -> &[SpriteVariant] {
        self.by_number
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates over every indexed variant.
    pub fn iter(&self) -> impl Iterator<Item = &SpriteVariant> {
        self.by_number.values().flatten()
    }

    /// Number of indexed variants.
    pub fn len(&self) -> usize {
        self.by_number.values().map(Vec::len).sum()
    }

    /// Whether the index holds no variants.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
