//! Auction rule and rival tuning configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::numbers::i64_to_f64;
use crate::pacing::PacingConfig;

const DEFAULT_AUCTION_DATA: &str = include_str!("../assets/data/auction.json");

/// Top-level configuration bundle handed to a session at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuctionConfig {
    #[serde(default)]
    pub rules: AuctionRules,
    #[serde(default)]
    pub rivals: RivalTuning,
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl AuctionConfig {
    /// Parse a configuration document, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load the embedded configuration, falling back to defaults if it fails to parse.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_AUCTION_DATA).unwrap_or_default()
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `AuctionConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), AuctionConfigError> {
        self.rules.validate()?;
        self.rivals.validate()?;
        self.pacing.validate()?;
        Ok(())
    }
}

/// Pricing, pressure and gating rules for one auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRules {
    /// Opening price as a fraction of the market estimate.
    #[serde(default = "AuctionRules::default_opening_ratio")]
    pub opening_ratio: f32,
    #[serde(default = "AuctionRules::default_bid_increment")]
    pub bid_increment: i64,
    #[serde(default = "AuctionRules::default_power_bid_increment")]
    pub power_bid_increment: i64,
    /// Patience lost by every active rival when someone else raises the price.
    #[serde(default = "AuctionRules::default_outbid_patience_cost")]
    pub outbid_patience_cost: i32,
    #[serde(default = "AuctionRules::default_power_bid_patience_cost")]
    pub power_bid_patience_cost: i32,
    #[serde(default = "AuctionRules::default_stall_patience_cost")]
    pub stall_patience_cost: i32,
    #[serde(default = "AuctionRules::default_kick_tires_min_skill")]
    pub kick_tires_min_skill: u8,
    /// Share of the market estimate a kick-tires inspection can knock off rival budgets.
    #[serde(default = "AuctionRules::default_kick_tires_budget_pct")]
    pub kick_tires_budget_pct: f32,
    #[serde(default = "AuctionRules::default_stall_min_skill")]
    pub stall_min_skill: u8,
    /// Ceiling for rival-vs-rival bidding, relative to the market estimate.
    #[serde(default = "AuctionRules::default_rival_only_cap_ratio")]
    pub rival_only_cap_ratio: f32,
    #[serde(default = "AuctionRules::default_bid_history_window")]
    pub bid_history_window: usize,
}

impl AuctionRules {
    #[must_use]
    pub const fn default_opening_ratio() -> f32 {
        constants::DEFAULT_OPENING_RATIO
    }

    #[must_use]
    pub const fn default_bid_increment() -> i64 {
        constants::DEFAULT_BID_INCREMENT
    }

    #[must_use]
    pub const fn default_power_bid_increment() -> i64 {
        constants::DEFAULT_POWER_BID_INCREMENT
    }

    #[must_use]
    pub const fn default_outbid_patience_cost() -> i32 {
        constants::DEFAULT_OUTBID_PATIENCE_COST
    }

    #[must_use]
    pub const fn default_power_bid_patience_cost() -> i32 {
        constants::DEFAULT_POWER_BID_PATIENCE_COST
    }

    #[must_use]
    pub const fn default_stall_patience_cost() -> i32 {
        constants::DEFAULT_STALL_PATIENCE_COST
    }

    #[must_use]
    pub const fn default_kick_tires_min_skill() -> u8 {
        constants::DEFAULT_KICK_TIRES_MIN_SKILL
    }

    #[must_use]
    pub const fn default_kick_tires_budget_pct() -> f32 {
        constants::DEFAULT_KICK_TIRES_BUDGET_PCT
    }

    #[must_use]
    pub const fn default_stall_min_skill() -> u8 {
        constants::DEFAULT_STALL_MIN_SKILL
    }

    #[must_use]
    pub const fn default_rival_only_cap_ratio() -> f32 {
        constants::DEFAULT_RIVAL_ONLY_CAP_RATIO
    }

    #[must_use]
    pub const fn default_bid_history_window() -> usize {
        constants::DEFAULT_BID_HISTORY_WINDOW
    }

    fn validate(&self) -> Result<(), AuctionConfigError> {
        check_range("rules.opening_ratio", self.opening_ratio, 0.1, 2.0)?;
        check_range("rules.rival_only_cap_ratio", self.rival_only_cap_ratio, 1.0, 3.0)?;
        check_range(
            "rules.kick_tires_budget_pct",
            self.kick_tires_budget_pct,
            0.0,
            1.0,
        )?;
        if self.bid_increment < 1 {
            return Err(AuctionConfigError::MinViolation {
                field: "rules.bid_increment",
                min: 1.0,
                value: i64_to_f64(self.bid_increment),
            });
        }
        if self.power_bid_increment <= self.bid_increment {
            return Err(AuctionConfigError::IncrementOrder {
                bid: self.bid_increment,
                power_bid: self.power_bid_increment,
            });
        }
        for (field, value) in [
            ("rules.outbid_patience_cost", self.outbid_patience_cost),
            ("rules.power_bid_patience_cost", self.power_bid_patience_cost),
            ("rules.stall_patience_cost", self.stall_patience_cost),
        ] {
            if value < 0 {
                return Err(AuctionConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value: f64::from(value),
                });
            }
        }
        if self.power_bid_patience_cost <= self.outbid_patience_cost {
            return Err(AuctionConfigError::PressureOrder {
                outbid: self.outbid_patience_cost,
                power_bid: self.power_bid_patience_cost,
            });
        }
        if self.bid_history_window == 0 {
            return Err(AuctionConfigError::MinViolation {
                field: "rules.bid_history_window",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            opening_ratio: Self::default_opening_ratio(),
            bid_increment: Self::default_bid_increment(),
            power_bid_increment: Self::default_power_bid_increment(),
            outbid_patience_cost: Self::default_outbid_patience_cost(),
            power_bid_patience_cost: Self::default_power_bid_patience_cost(),
            stall_patience_cost: Self::default_stall_patience_cost(),
            kick_tires_min_skill: Self::default_kick_tires_min_skill(),
            kick_tires_budget_pct: Self::default_kick_tires_budget_pct(),
            stall_min_skill: Self::default_stall_min_skill(),
            rival_only_cap_ratio: Self::default_rival_only_cap_ratio(),
            bid_history_window: Self::default_bid_history_window(),
        }
    }
}

/// Knobs used to seed and drive rival negotiation agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalTuning {
    /// Budget floor as a fraction of market value, before interest is applied.
    #[serde(default = "RivalTuning::default_budget_floor_ratio")]
    pub budget_floor_ratio: f32,
    #[serde(default = "RivalTuning::default_budget_interest_span")]
    pub budget_interest_span: f32,
    #[serde(default = "RivalTuning::default_patience_interest_bonus")]
    pub patience_interest_bonus: f32,
    /// Interest at which a rival starts jumping by double increments.
    #[serde(default = "RivalTuning::default_eager_interest")]
    pub eager_interest: f32,
    #[serde(default = "RivalTuning::default_eager_patience")]
    pub eager_patience: i32,
    /// Cautious rivals decline once a bid passes this share of their budget.
    #[serde(default = "RivalTuning::default_caution_margin")]
    pub caution_margin: f32,
    #[serde(default = "RivalTuning::default_willingness_interest_weight")]
    pub willingness_interest_weight: f32,
    #[serde(default = "RivalTuning::default_willingness_patience_weight")]
    pub willingness_patience_weight: f32,
    #[serde(default = "RivalTuning::default_min_willingness")]
    pub min_willingness: f32,
}

impl RivalTuning {
    #[must_use]
    pub const fn default_budget_floor_ratio() -> f32 {
        constants::DEFAULT_BUDGET_FLOOR_RATIO
    }

    #[must_use]
    pub const fn default_budget_interest_span() -> f32 {
        constants::DEFAULT_BUDGET_INTEREST_SPAN
    }

    #[must_use]
    pub const fn default_patience_interest_bonus() -> f32 {
        constants::DEFAULT_PATIENCE_INTEREST_BONUS
    }

    #[must_use]
    pub const fn default_eager_interest() -> f32 {
        constants::DEFAULT_EAGER_INTEREST
    }

    #[must_use]
    pub const fn default_eager_patience() -> i32 {
        constants::DEFAULT_EAGER_PATIENCE
    }

    #[must_use]
    pub const fn default_caution_margin() -> f32 {
        constants::DEFAULT_CAUTION_MARGIN
    }

    #[must_use]
    pub const fn default_willingness_interest_weight() -> f32 {
        constants::DEFAULT_WILLINGNESS_INTEREST_WEIGHT
    }

    #[must_use]
    pub const fn default_willingness_patience_weight() -> f32 {
        constants::DEFAULT_WILLINGNESS_PATIENCE_WEIGHT
    }

    #[must_use]
    pub const fn default_min_willingness() -> f32 {
        constants::DEFAULT_MIN_WILLINGNESS
    }

    fn validate(&self) -> Result<(), AuctionConfigError> {
        check_range("rivals.budget_floor_ratio", self.budget_floor_ratio, 0.1, 3.0)?;
        check_range(
            "rivals.budget_interest_span",
            self.budget_interest_span,
            0.0,
            3.0,
        )?;
        check_range(
            "rivals.patience_interest_bonus",
            self.patience_interest_bonus,
            0.0,
            100.0,
        )?;
        check_range("rivals.eager_interest", self.eager_interest, 0.0, 1.0)?;
        check_range("rivals.caution_margin", self.caution_margin, 0.1, 1.0)?;
        check_range("rivals.min_willingness", self.min_willingness, 0.0, 1.0)?;
        check_range(
            "rivals.willingness_interest_weight",
            self.willingness_interest_weight,
            0.0,
            1.0,
        )?;
        check_range(
            "rivals.willingness_patience_weight",
            self.willingness_patience_weight,
            0.0,
            1.0,
        )?;
        if !(0..=constants::PATIENCE_MAX).contains(&self.eager_patience) {
            return Err(AuctionConfigError::RangeViolation {
                field: "rivals.eager_patience",
                min: 0.0,
                max: f64::from(constants::PATIENCE_MAX),
                value: f64::from(self.eager_patience),
            });
        }
        Ok(())
    }
}

impl Default for RivalTuning {
    fn default() -> Self {
        Self {
            budget_floor_ratio: Self::default_budget_floor_ratio(),
            budget_interest_span: Self::default_budget_interest_span(),
            patience_interest_bonus: Self::default_patience_interest_bonus(),
            eager_interest: Self::default_eager_interest(),
            eager_patience: Self::default_eager_patience(),
            caution_margin: Self::default_caution_margin(),
            willingness_interest_weight: Self::default_willingness_interest_weight(),
            willingness_patience_weight: Self::default_willingness_patience_weight(),
            min_willingness: Self::default_min_willingness(),
        }
    }
}

fn check_range(
    field: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), AuctionConfigError> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(AuctionConfigError::RangeViolation {
        field,
        min: f64::from(min),
        max: f64::from(max),
        value: f64::from(value),
    })
}

/// Errors raised when auction configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum AuctionConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("power bid increment {power_bid} must exceed bid increment {bid}")]
    IncrementOrder { bid: i64, power_bid: i64 },
    #[error("power bid patience cost {power_bid} must exceed outbid cost {outbid}")]
    PressureOrder { outbid: i32, power_bid: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg = AuctionConfig::from_json("{}").expect("deserialize");
        assert_eq!(cfg, AuctionConfig::default());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn static_config_parses_and_validates() {
        let cfg = AuctionConfig::load_from_static();
        cfg.validate().expect("embedded config is valid");
        assert!(cfg.rules.power_bid_increment > cfg.rules.bid_increment);
    }

    #[test]
    fn rejects_power_increment_not_above_bid() {
        let cfg = AuctionConfig {
            rules: AuctionRules {
                power_bid_increment: 500,
                ..AuctionRules::default()
            },
            ..AuctionConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(AuctionConfigError::IncrementOrder {
                bid: 500,
                power_bid: 500
            })
        );
    }

    #[test]
    fn rejects_cap_ratio_below_market() {
        let cfg = AuctionConfig {
            rules: AuctionRules {
                rival_only_cap_ratio: 0.9,
                ..AuctionRules::default()
            },
            ..AuctionConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(AuctionConfigError::RangeViolation { field, .. }) if field == "rules.rival_only_cap_ratio"
        ));
    }

    #[test]
    fn rejects_power_pressure_not_above_outbid() {
        let rules = AuctionRules {
            outbid_patience_cost: 15,
            ..AuctionRules::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(AuctionConfigError::PressureOrder { .. })
        ));
    }

    #[test]
    fn rejects_empty_history_window() {
        let rules = AuctionRules {
            bid_history_window: 0,
            ..AuctionRules::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(AuctionConfigError::MinViolation { field, .. }) if field == "rules.bid_history_window"
        ));
    }
}
