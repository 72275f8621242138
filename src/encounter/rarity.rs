//! # Rarity Selection
//!
//! Maps uniform draws to rarity tiers through a cumulative threshold table.

use crate::{OakError, OakResult, RarityTier};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One row of the rarity table: a tier and its cumulative upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBound {
    pub tier: RarityTier,
    pub upper_bound: f64,
}

/// Ordered cumulative thresholds mapping `[0, 1)` onto rarity tiers.
///
/// Bounds are strictly increasing and the last one is exactly `1.0`, which
/// makes [`RarityTable::select_tier`] total over `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TierBound>", into = "Vec<TierBound>")]
pub struct RarityTable {
    bounds: Vec<TierBound>,
}

impl RarityTable {
    /// Builds a validated table.
    ///
    /// # Examples
    ///
    /// ```
    /// use oakoak::{RarityTable, RarityTier};
    ///
    /// let table = RarityTable::new(vec![
    ///     (RarityTier::Rare, 0.2),
    ///     (RarityTier::Common, 1.0),
    /// ]).unwrap();
    /// assert_eq!(table.select_tier(0.1), RarityTier::Rare);
    ///
    /// assert!(RarityTable::new(vec![(RarityTier::Common, 0.9)]).is_err());
    /// ```
    pub fn new(bounds: Vec<(RarityTier, f64)>) -> OakResult<Self> {
        let bounds: Vec<TierBound> = bounds
            .into_iter()
            .map(|(tier, upper_bound)| TierBound { tier, upper_bound })
            .collect();
        Self::try_from(bounds)
    }

    /// Tiers and bounds in order.
    pub fn bounds(&self) -> &[TierBound] {
        &self.bounds
    }

    /// Returns the first tier whose upper bound exceeds `roll`.
    ///
    /// `roll` is expected in `[0, 1)`; values at or above `1.0` map to the
    /// last tier.
    pub fn select_tier(&self, roll: f64) -> RarityTier {
        self.bounds
            .iter()
            .find(|bound| roll < bound.upper_bound)
            .or_else(|| self.bounds.last())
            .map(|bound| bound.tier)
            .unwrap_or(RarityTier::UltraCommon)
    }

    /// Probability mass assigned to `tier`.
    pub fn probability(&self, tier: RarityTier) -> f64 {
        let mut lower = 0.0;
        for bound in &self.bounds {
            if bound.tier == tier {
                return bound.upper_bound - lower;
            }
            lower = bound.upper_bound;
        }
        0.0
    }

    /// Evaluates one spawn roll.
    ///
    /// The tier and the shiny flag come from two independent uniform draws
    /// taken in the same step.
    pub fn roll(&self, rng: &mut StdRng, shiny_chance: f64) -> SpawnRoll {
        let tier_roll: f64 = rng.gen();
        let shiny_roll: f64 = rng.gen();
        let roll = SpawnRoll {
            tier: self.select_tier(tier_roll),
            shiny: shiny_roll < shiny_chance,
            tier_roll,
        };
        debug!(
            "Rolled {:.5} -> {} (shiny: {})",
            roll.tier_roll, roll.tier, roll.shiny
        );
        roll
    }
}

impl Default for RarityTable {
    fn default() -> Self {
        Self {
            bounds: vec![
                TierBound {
                    tier: RarityTier::UltraRare,
                    upper_bound: 0.025,
                },
                TierBound {
                    tier: RarityTier::Rare,
                    upper_bound: 0.15,
                },
                TierBound {
                    tier: RarityTier::Common,
                    upper_bound: 0.50,
                },
                TierBound {
                    tier: RarityTier::UltraCommon,
                    upper_bound: 1.0,
                },
            ],
        }
    }
}

impl TryFrom<Vec<TierBound>> for RarityTable {
    type Error = OakError;

    fn try_from(bounds: Vec<TierBound>) -> Result<Self, Self::Error> {
        let Some(last) = bounds.last() else {
            return Err(OakError::Config("rarity table is empty".to_string()));
        };
        if last.upper_bound != 1.0 {
            return Err(OakError::Config(format!(
                "rarity table must end at 1.0, ends at {}",
                last.upper_bound
            )));
        }

        let mut previous = 0.0;
        for bound in &bounds {
            if !(bound.upper_bound > previous) {
                return Err(OakError::Config(format!(
                    "rarity bound {} for {} does not increase past {}",
                    bound.upper_bound, bound.tier, previous
                )));
            }
            previous = bound.upper_bound;
        }

        for (idx, bound) in bounds.iter().enumerate() {
            if bounds[..idx].iter().any(|other| other.tier == bound.tier) {
                return Err(OakError::Config(format!(
                    "tier {} appears twice in the rarity table",
                    bound.tier
                )));
            }
        }

        Ok(Self { bounds })
    }
}

impl From<RarityTable> for Vec<TierBound> {
    fn from(table: RarityTable) -> Self {
        table.bounds
    }
}

/// Outcome of one spawn roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRoll {
    /// Selected tier
    pub tier: RarityTier,
    /// Whether the spawn is shiny
    pub shiny: bool,
    /// Raw draw used for the tier
    pub tier_roll: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_default_table_selection() {
        let table = RarityTable::default();
        assert_eq!(table.select_tier(0.0), RarityTier::UltraRare);
        assert_eq!(table.select_tier(0.01), RarityTier::UltraRare);
        assert_eq!(table.select_tier(0.025), RarityTier::Rare);
        assert_eq!(table.select_tier(0.149), RarityTier::Rare);
        assert_eq!(table.select_tier(0.15), RarityTier::Common);
        assert_eq!(table.select_tier(0.5), RarityTier::UltraCommon);
        assert_eq!(table.select_tier(0.999_999), RarityTier::UltraCommon);
    }

    #[test]
    fn test_malformed_tables_rejected() {
        assert!(RarityTable::new(vec![]).is_err());
        assert!(RarityTable::new(vec![
            (RarityTier::Rare, 0.5),
            (RarityTier::Common, 0.5),
            (RarityTier::UltraCommon, 1.0),
        ])
        .is_err());
        assert!(RarityTable::new(vec![(RarityTier::Rare, 0.5), (RarityTier::Common, 0.9)]).is_err());
        assert!(RarityTable::new(vec![(RarityTier::Rare, 0.0), (RarityTier::Common, 1.0)]).is_err());
        assert!(RarityTable::new(vec![(RarityTier::Rare, 0.5), (RarityTier::Rare, 1.0)]).is_err());
    }

    #[test]
    fn test_table_from_json() {
        let table: RarityTable = serde_json::from_str(
            r#"[{"tier": "rare", "upper_bound": 0.3}, {"tier": "common", "upper_bound": 1.0}]"#,
        )
        .unwrap();
        assert_eq!(table.select_tier(0.29), RarityTier::Rare);

        let bad: Result<RarityTable, _> =
            serde_json::from_str(r#"[{"tier": "rare", "upper_bound": 0.3}]"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_probability_mass() {
        let table = RarityTable::default();
        assert!((table.probability(RarityTier::UltraRare) - 0.025).abs() < 1e-12);
        assert!((table.probability(RarityTier::Rare) - 0.125).abs() < 1e-12);
        assert!((table.probability(RarityTier::Common) - 0.35).abs() < 1e-12);
        assert!((table.probability(RarityTier::UltraCommon) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empirical_distribution_converges() {
        let table = RarityTable::default();
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 200_000;
        let mut counts: HashMap<RarityTier, usize> = HashMap::new();
        for _ in 0..trials {
            *counts.entry(table.roll(&mut rng, 0.0).tier).or_default() += 1;
        }

        for tier in RarityTier::all() {
            let observed = counts.get(&tier).copied().unwrap_or(0) as f64 / trials as f64;
            let expected = table.probability(tier);
            // Five standard deviations of a binomial proportion
            let tolerance = 5.0 * (expected * (1.0 - expected) / trials as f64).sqrt();
            assert!(
                (observed - expected).abs() < tolerance,
                "{}: observed {} expected {}",
                tier,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_shiny_is_independent_of_tier() {
        let table = RarityTable::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut shiny_tiers = HashMap::new();
        for _ in 0..20_000 {
            let roll = table.roll(&mut rng, 0.5);
            if roll.shiny {
                *shiny_tiers.entry(roll.tier).or_insert(0usize) += 1;
            }
        }
        // A shared draw would confine shinies to the rarest tiers
        assert!(shiny_tiers.get(&RarityTier::UltraCommon).copied().unwrap_or(0) > 0);
        assert!(shiny_tiers.get(&RarityTier::Common).copied().unwrap_or(0) > 0);
    }

    #[test]
    fn test_zero_shiny_chance_never_shiny() {
        let table = RarityTable::default();
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..5_000).all(|_| !table.roll(&mut rng, 0.0).shiny));
    }

    proptest! {
        #[test]
        fn prop_selected_tier_bound_exceeds_roll(roll in 0.0f64..1.0) {
            let table = RarityTable::default();
            let tier = table.select_tier(roll);
            let bounds = table.bounds();
            let idx = bounds.iter().position(|b| b.tier == tier).unwrap();
            prop_assert!(roll < bounds[idx].upper_bound);
            if idx > 0 {
                prop_assert!(roll >= bounds[idx - 1].upper_bound);
            }
        }
    }
}
