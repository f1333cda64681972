//! Tier computation.
//!
//! A tier is a pure function of the member's balance and an immutable ladder of thresholds.
//! The ladder is built once from configuration and passed around as a snapshot, so the
//! computation stays deterministic and testable in isolation.

use std::str::FromStr;

use plg_common::Points;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single rung of the ladder. `min_balance` is an inclusive lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub name: String,
    pub min_balance: Points,
}

/// An ordered set of tier thresholds with strictly increasing minimum balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLadder {
    thresholds: Vec<TierThreshold>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierLadderError {
    #[error("A tier ladder needs at least one threshold")]
    Empty,
    #[error("Tier thresholds must be strictly increasing: {0} does not increase on its predecessor")]
    NotIncreasing(String),
    #[error("Invalid tier ladder entry: {0}")]
    InvalidEntry(String),
}

impl TierLadder {
    pub fn new(thresholds: Vec<TierThreshold>) -> Result<Self, TierLadderError> {
        if thresholds.is_empty() {
            return Err(TierLadderError::Empty);
        }
        for pair in thresholds.windows(2) {
            if pair[1].min_balance <= pair[0].min_balance {
                return Err(TierLadderError::NotIncreasing(pair[1].name.clone()));
            }
        }
        Ok(Self { thresholds })
    }

    /// The conventional four-tier ladder used when no configuration is supplied.
    pub fn default_ladder() -> Self {
        let thresholds = [("Bronze", 0), ("Silver", 150), ("Gold", 500), ("Platinum", 1000)]
            .into_iter()
            .map(|(name, min)| TierThreshold { name: name.to_string(), min_balance: Points::from(min) })
            .collect();
        Self::new(thresholds).expect("default ladder is valid")
    }

    /// The tier for the given balance. Thresholds are inclusive lower bounds: a balance equal
    /// to a threshold belongs to that threshold's tier. Balances below the first threshold map
    /// to the lowest defined tier.
    pub fn tier_for(&self, balance: Points) -> &str {
        self.thresholds
            .iter()
            .rev()
            .find(|t| balance >= t.min_balance)
            .unwrap_or(&self.thresholds[0])
            .name
            .as_str()
    }

    /// The name of the lowest tier. New members start here.
    pub fn lowest_tier(&self) -> &str {
        self.thresholds[0].name.as_str()
    }

    pub fn thresholds(&self) -> &[TierThreshold] {
        &self.thresholds
    }
}

/// Parses a ladder from a `Name:min,Name:min,...` string, e.g.
/// `Bronze:0,Silver:150,Gold:500,Platinum:1000`.
impl FromStr for TierLadder {
    type Err = TierLadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let thresholds = s
            .split(',')
            .map(|pair| {
                let (name, min) = pair
                    .split_once(':')
                    .ok_or_else(|| TierLadderError::InvalidEntry(pair.to_string()))?;
                let min_balance = min
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| TierLadderError::InvalidEntry(pair.to_string()))?;
                Ok(TierThreshold { name: name.trim().to_string(), min_balance: Points::from(min_balance) })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(thresholds)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ladder() -> TierLadder {
        TierLadder::default_ladder()
    }

    #[test]
    fn empty_balance_maps_to_lowest_tier() {
        assert_eq!(ladder().tier_for(Points::from(0)), "Bronze");
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        let l = ladder();
        assert_eq!(l.tier_for(Points::from(149)), "Bronze");
        assert_eq!(l.tier_for(Points::from(150)), "Silver");
        assert_eq!(l.tier_for(Points::from(499)), "Silver");
        assert_eq!(l.tier_for(Points::from(500)), "Gold");
        assert_eq!(l.tier_for(Points::from(1000)), "Platinum");
        assert_eq!(l.tier_for(Points::from(250_000)), "Platinum");
    }

    #[test]
    fn computation_is_deterministic() {
        let l = ladder();
        for balance in [0, 1, 149, 150, 999, 1000] {
            assert_eq!(l.tier_for(Points::from(balance)), l.tier_for(Points::from(balance)));
        }
    }

    #[test]
    fn ladder_rejects_bad_input() {
        assert_eq!(TierLadder::new(vec![]), Err(TierLadderError::Empty));
        let decreasing = vec![
            TierThreshold { name: "A".into(), min_balance: Points::from(100) },
            TierThreshold { name: "B".into(), min_balance: Points::from(100) },
        ];
        assert!(matches!(TierLadder::new(decreasing), Err(TierLadderError::NotIncreasing(_))));
    }

    #[test]
    fn parse_from_configuration_string() {
        let l = "Member:0, Elite:200, VIP:800".parse::<TierLadder>().unwrap();
        assert_eq!(l.lowest_tier(), "Member");
        assert_eq!(l.tier_for(Points::from(200)), "Elite");
        assert!("Member".parse::<TierLadder>().is_err());
        assert!("Member:x".parse::<TierLadder>().is_err());
    }
}
