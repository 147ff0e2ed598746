//! The lot under the hammer.
use serde::{Deserialize, Serialize};

use crate::config::AuctionRules;
use crate::numbers::{i64_to_f64, round_f64_to_i64, scale_money};

/// Immutable description of the car being auctioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionItem {
    pub id: String,
    pub name: String,
    /// Market-adjusted estimate supplied by the pricing collaborator.
    pub market_value: i64,
    /// Condition score, 0 (scrap) to 100 (concours).
    #[serde(default = "AuctionItem::default_condition")]
    pub condition: u8,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AuctionItem {
    #[must_use]
    pub fn new(id: &str, name: &str, market_value: i64, condition: u8) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            market_value,
            condition: condition.min(100),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| (*tag).to_string()).collect();
        self
    }

    #[must_use]
    pub const fn default_condition() -> u8 {
        50
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|own| own.eq_ignore_ascii_case(tag))
    }

    /// Opening price seeded from the market estimate.
    #[must_use]
    pub fn opening_price(&self, rules: &AuctionRules) -> i64 {
        scale_money(self.market_value, rules.opening_ratio).max(0)
    }

    /// Ceiling for rival-vs-rival bidding once the player has left the room.
    #[must_use]
    pub fn rival_only_ceiling(&self, rules: &AuctionRules) -> i64 {
        scale_money(self.market_value, rules.rival_only_cap_ratio)
    }

    /// Budget cut a kick-tires inspection inflicts; worse cars reveal more flaws.
    #[must_use]
    pub fn kick_tires_reduction(&self, rules: &AuctionRules) -> i64 {
        let wear = 1.0 - f64::from(self.condition.min(100)) / 100.0;
        let base = i64_to_f64(self.market_value) * f64::from(rules.kick_tires_budget_pct);
        // Even a pristine car gives the inspector something to talk about.
        round_f64_to_i64(base * (0.5 + wear * 0.5)).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_and_ceiling_follow_rules() {
        let item = AuctionItem::new("fastback", "'67 Fastback", 10_000, 60);
        let rules = AuctionRules::default();
        assert_eq!(item.opening_price(&rules), 7_500);
        assert_eq!(item.rival_only_ceiling(&rules), 10_500);
    }

    #[test]
    fn rough_cars_lose_more_to_inspection() {
        let rules = AuctionRules::default();
        let rough = AuctionItem::new("a", "Rust Bucket", 10_000, 10);
        let clean = AuctionItem::new("b", "Garage Queen", 10_000, 95);
        assert!(rough.kick_tires_reduction(&rules) > clean.kick_tires_reduction(&rules));
        assert!(clean.kick_tires_reduction(&rules) > 0);
    }

    #[test]
    fn tags_match_case_insensitively() {
        let item = AuctionItem::new("c", "Coupe", 5_000, 40).with_tags(&["Muscle", "v8"]);
        assert!(item.has_tag("muscle"));
        assert!(item.has_tag("V8"));
        assert!(!item.has_tag("jdm"));
    }
}
