//! # Natures
//!
//! Reference table of natures a spawn may roll. Each nature raises one stat
//! and lowers another; neutral natures touch nothing.

use crate::{OakError, OakResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Battle stat affected by natures and individual values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stat {
    Hp,
    Attack,
    Defense,
    SpecialAttack,
    SpecialDefense,
    Speed,
}

/// One nature of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nature {
    pub name: String,
    #[serde(default)]
    pub increases: Option<Stat>,
    #[serde(default)]
    pub decreases: Option<Stat>,
}

impl Nature {
    fn new(name: &str, increases: Option<Stat>, decreases: Option<Stat>) -> Self {
        Self {
            name: name.to_string(),
            increases,
            decreases,
        }
    }

    /// Whether the nature leaves every stat alone.
    pub fn is_neutral(&self) -> bool {
        self.increases == self.decreases
    }

    /// The 25 standard natures.
    ///
    /// # Examples
    ///
    /// ```
    /// use oakoak::Nature;
    ///
    /// let natures = Nature::standard();
    /// assert_eq!(natures.len(), 25);
    /// assert_eq!(natures.iter().filter(|n| n.is_neutral()).count(), 5);
    /// ```
    pub fn standard() -> Vec<Nature> {
        use Stat::*;
        let raised = [Attack, Defense, Speed, SpecialAttack, SpecialDefense];
        let names = [
            ["Hardy", "Lonely", "Brave", "Adamant", "Naughty"],
            ["Bold", "Docile", "Relaxed", "Impish", "Lax"],
            ["Timid", "Hasty", "Serious", "Jolly", "Naive"],
            ["Modest", "Mild", "Quiet", "Bashful", "Rash"],
            ["Calm", "Gentle", "Sassy", "Careful", "Quirky"],
        ];

        let mut natures = Vec::with_capacity(25);
        for (row, increases) in names.iter().zip(raised) {
            for (name, decreases) in row.iter().zip(raised) {
                if increases == decreases {
                    natures.push(Nature::new(name, None, None));
                } else {
                    natures.push(Nature::new(name, Some(increases), Some(decreases)));
                }
            }
        }
        natures
    }

    /// Loads a nature table from a JSON file.
    pub fn load_table(path: impl AsRef<Path>) -> OakResult<Vec<Nature>> {
        let contents = std::fs::read_to_string(path)?;
        let natures: Vec<Nature> = serde_json::from_str(&contents)?;
        validate_natures(&natures)?;
        Ok(natures)
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A nature table must be non-empty and free of blank names.
pub fn validate_natures(natures: &[Nature]) -> OakResult<()> {
    if natures.is_empty() {
        return Err(OakError::Catalog("nature table is empty".to_string()));
    }
    if natures.iter().any(|nature| nature.name.trim().is_empty()) {
        return Err(OakError::Catalog("nature with a blank name".to_string()));
    }
    Ok(())
}
