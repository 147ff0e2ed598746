//! Rival negotiation agents.
//!
//! Each rival carries hidden `patience` and `budget` that only ever go down.
//! [`RivalAgent::decide_bid`] is a pure read of that state; the `on_*`
//! mutators are how the opposing player's tactics wear a rival down.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{AuctionConfig, AuctionRules, RivalTuning};
use crate::constants::PATIENCE_MAX;
use crate::numbers::{
    i64_to_f64, patience_fraction, round_f32_to_i32, round_f64_to_i64, scale_money,
};

/// Stable identifier for a rival bidder.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RivalId(pub String);

impl RivalId {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RivalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RivalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Temperament fixed at construction; shapes thresholds, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RivalMood {
    Desperate,
    Cautious,
    Confident,
    #[default]
    Normal,
}

impl RivalMood {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Desperate => "desperate",
            Self::Cautious => "cautious",
            Self::Confident => "confident",
            Self::Normal => "normal",
        }
    }

    #[must_use]
    pub const fn budget_multiplier(self) -> f32 {
        match self {
            Self::Desperate => 1.2,
            Self::Confident => 1.1,
            Self::Normal => 1.0,
            Self::Cautious => 0.9,
        }
    }

    #[must_use]
    pub const fn base_patience(self) -> i32 {
        match self {
            Self::Desperate => 75,
            Self::Confident => 65,
            Self::Normal => 55,
            Self::Cautious => 40,
        }
    }

    #[must_use]
    pub const fn willingness_bias(self) -> f32 {
        match self {
            Self::Desperate => 0.3,
            Self::Confident => 0.15,
            Self::Normal => 0.0,
            Self::Cautious => -0.1,
        }
    }

    /// Moods that jump by a double increment whenever patience allows.
    #[must_use]
    pub const fn jumps_early(self) -> bool {
        matches!(self, Self::Desperate | Self::Confident)
    }
}

/// Why a rival left the bidding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawReason {
    PatienceExhausted,
    BudgetExceeded,
    Declined,
}

impl WithdrawReason {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PatienceExhausted => "patience-exhausted",
            Self::BudgetExceeded => "budget-exceeded",
            Self::Declined => "declined",
        }
    }
}

/// Outcome of a rival evaluating the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidDecision {
    /// Raise the price by `raise` (zero when claiming the opening price).
    Bid { raise: i64 },
    Withdraw(WithdrawReason),
}

impl BidDecision {
    #[must_use]
    pub const fn is_bid(self) -> bool {
        matches!(self, Self::Bid { .. })
    }
}

/// Construction input for one invited rival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalEntry {
    pub rival_id: RivalId,
    /// 0..=1 preference match for the item, computed by the caller.
    pub interest: f32,
    #[serde(default)]
    pub mood: RivalMood,
    /// Cash the rival brought; a hard cap on the seeded budget.
    pub wallet: i64,
}

/// Fixed numbers an agent needs from the session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRules {
    pub bid_increment: i64,
    pub outbid_patience_cost: i32,
    pub power_bid_patience_cost: i32,
    pub stall_patience_cost: i32,
    pub tuning: RivalTuning,
}

impl AgentRules {
    #[must_use]
    pub fn new(rules: &AuctionRules, tuning: &RivalTuning) -> Self {
        Self {
            bid_increment: rules.bid_increment,
            outbid_patience_cost: rules.outbid_patience_cost,
            power_bid_patience_cost: rules.power_bid_patience_cost,
            stall_patience_cost: rules.stall_patience_cost,
            tuning: tuning.clone(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AuctionConfig) -> Self {
        Self::new(&config.rules, &config.rivals)
    }
}

impl Default for AgentRules {
    fn default() -> Self {
        Self::new(&AuctionRules::default(), &RivalTuning::default())
    }
}

/// Hidden negotiation state for one rival in one auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalAgent {
    rival_id: RivalId,
    interest: f32,
    patience: i32,
    budget: i64,
    mood: RivalMood,
    rules: AgentRules,
}

impl RivalAgent {
    /// Seed budget and patience from interest, mood and the item's market value.
    #[must_use]
    pub fn new(entry: &RivalEntry, market_value: i64, rules: AgentRules) -> Self {
        let interest = sanitize_interest(entry.interest);
        let tuning = &rules.tuning;
        let budget_ratio = (tuning.budget_floor_ratio + interest * tuning.budget_interest_span)
            * entry.mood.budget_multiplier();
        let budget = scale_money(market_value, budget_ratio).min(entry.wallet);
        let patience = (entry.mood.base_patience()
            + round_f32_to_i32(interest * tuning.patience_interest_bonus))
        .clamp(0, PATIENCE_MAX);
        log::trace!(
            target: crate::constants::LOG_TARGET,
            "seeded rival {} mood={} interest={interest:.2} budget={budget} patience={patience}",
            entry.rival_id,
            entry.mood.key(),
        );
        Self {
            rival_id: entry.rival_id.clone(),
            interest,
            patience,
            budget,
            mood: entry.mood,
            rules,
        }
    }

    /// Build an agent with explicit hidden state.
    #[must_use]
    pub fn with_state(
        rival_id: RivalId,
        interest: f32,
        mood: RivalMood,
        patience: i32,
        budget: i64,
        rules: AgentRules,
    ) -> Self {
        Self {
            rival_id,
            interest: sanitize_interest(interest),
            patience: patience.clamp(0, PATIENCE_MAX),
            budget,
            mood,
            rules,
        }
    }

    #[must_use]
    pub const fn rival_id(&self) -> &RivalId {
        &self.rival_id
    }

    #[must_use]
    pub const fn interest(&self) -> f32 {
        self.interest
    }

    #[must_use]
    pub const fn patience(&self) -> i32 {
        self.patience
    }

    #[must_use]
    pub const fn budget(&self) -> i64 {
        self.budget
    }

    #[must_use]
    pub const fn mood(&self) -> RivalMood {
        self.mood
    }

    /// Decide against `current_price` with an explicit willingness roll in `0.0..1.0`.
    ///
    /// `opening` means no bid has claimed the opening price yet, so a bid
    /// takes the price as-is instead of raising it.
    #[must_use]
    pub fn decide_bid(&self, current_price: i64, opening: bool, roll: f32) -> BidDecision {
        if current_price > self.budget {
            return BidDecision::Withdraw(WithdrawReason::BudgetExceeded);
        }
        if self.patience <= 0 {
            return BidDecision::Withdraw(WithdrawReason::PatienceExhausted);
        }

        let standard = self.rules.bid_increment;
        let raise = if opening {
            0
        } else {
            let preferred = if self.is_eager() {
                standard.saturating_mul(2)
            } else {
                standard
            };
            if current_price.saturating_add(preferred) <= self.budget {
                preferred
            } else if current_price.saturating_add(standard) <= self.budget {
                standard
            } else {
                return BidDecision::Withdraw(WithdrawReason::BudgetExceeded);
            }
        };

        let target = current_price.saturating_add(raise);
        if self.mood == RivalMood::Cautious && target > self.caution_limit() {
            return BidDecision::Withdraw(WithdrawReason::Declined);
        }
        if roll >= self.willingness() {
            return BidDecision::Withdraw(WithdrawReason::Declined);
        }
        BidDecision::Bid { raise }
    }

    /// Draw the willingness roll from `rng` and decide.
    pub fn decide_bid_with(
        &self,
        current_price: i64,
        opening: bool,
        rng: &mut impl Rng,
    ) -> BidDecision {
        let roll: f32 = rng.gen_range(0.0..1.0);
        self.decide_bid(current_price, opening, roll)
    }

    /// Chance of staying in at the current state, before mood-specific gates.
    #[must_use]
    pub fn willingness(&self) -> f32 {
        let tuning = &self.rules.tuning;
        let raw = self.interest * tuning.willingness_interest_weight
            + patience_fraction(self.patience) * tuning.willingness_patience_weight
            + self.mood.willingness_bias();
        raw.clamp(tuning.min_willingness, 1.0)
    }

    fn is_eager(&self) -> bool {
        let tuning = &self.rules.tuning;
        self.patience >= tuning.eager_patience
            && (self.interest >= tuning.eager_interest || self.mood.jumps_early())
    }

    fn caution_limit(&self) -> i64 {
        round_f64_to_i64(i64_to_f64(self.budget) * f64::from(self.rules.tuning.caution_margin))
    }

    /// Someone else raised the price; one bidding round of patience is spent.
    pub fn on_outbid(&mut self) {
        self.spend_patience(self.rules.outbid_patience_cost);
    }

    pub fn on_power_bid(&mut self) {
        self.spend_patience(self.rules.power_bid_patience_cost);
    }

    pub fn on_stall(&mut self) {
        self.spend_patience(self.rules.stall_patience_cost);
    }

    /// Permanently lower the budget. Negative reductions are ignored.
    pub fn on_kick_tires(&mut self, budget_reduction: i64) {
        self.budget = self.budget.saturating_sub(budget_reduction.max(0));
    }

    /// Immediate re-evaluation after a tactic, without waiting for a turn.
    #[must_use]
    pub const fn pressure_check(&self, current_price: i64) -> Option<WithdrawReason> {
        if current_price > self.budget {
            Some(WithdrawReason::BudgetExceeded)
        } else if self.patience <= 0 {
            Some(WithdrawReason::PatienceExhausted)
        } else {
            None
        }
    }

    fn spend_patience(&mut self, cost: i32) {
        self.patience = self.patience.saturating_sub(cost.max(0)).max(0);
    }
}

fn sanitize_interest(interest: f32) -> f32 {
    if interest.is_finite() {
        interest.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Per-session arena of rival agents keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RivalArena {
    agents: BTreeMap<RivalId, RivalAgent>,
}

impl RivalArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct one agent per entry.
    #[must_use]
    pub fn from_entries(entries: &[RivalEntry], market_value: i64, rules: &AgentRules) -> Self {
        entries
            .iter()
            .map(|entry| RivalAgent::new(entry, market_value, rules.clone()))
            .collect()
    }

    pub fn insert(&mut self, agent: RivalAgent) {
        self.agents.insert(agent.rival_id.clone(), agent);
    }

    #[must_use]
    pub fn get(&self, rival_id: &RivalId) -> Option<&RivalAgent> {
        self.agents.get(rival_id)
    }

    pub fn get_mut(&mut self, rival_id: &RivalId) -> Option<&mut RivalAgent> {
        self.agents.get_mut(rival_id)
    }

    #[must_use]
    pub fn contains(&self, rival_id: &RivalId) -> bool {
        self.agents.contains_key(rival_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl FromIterator<RivalAgent> for RivalArena {
    fn from_iter<I: IntoIterator<Item = RivalAgent>>(iter: I) -> Self {
        let mut arena = Self::new();
        for agent in iter {
            arena.insert(agent);
        }
        arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn agent(mood: RivalMood, interest: f32, patience: i32, budget: i64) -> RivalAgent {
        RivalAgent::with_state(
            RivalId::new("vince"),
            interest,
            mood,
            patience,
            budget,
            AgentRules::default(),
        )
    }

    #[test]
    fn bids_standard_increment_when_affordable() {
        let rival = agent(RivalMood::Normal, 0.5, 60, 10_000);
        assert_eq!(rival.decide_bid(8_500, false, 0.0), BidDecision::Bid { raise: 500 });
    }

    #[test]
    fn opening_bid_claims_price_without_raise() {
        let rival = agent(RivalMood::Normal, 0.5, 60, 10_000);
        assert_eq!(rival.decide_bid(8_000, true, 0.0), BidDecision::Bid { raise: 0 });
    }

    #[test]
    fn price_over_budget_forces_withdrawal() {
        let rival = agent(RivalMood::Desperate, 1.0, 100, 7_500);
        assert_eq!(
            rival.decide_bid(8_000, false, 0.0),
            BidDecision::Withdraw(WithdrawReason::BudgetExceeded)
        );
    }

    #[test]
    fn no_room_for_an_increment_is_budget_exceeded() {
        let rival = agent(RivalMood::Normal, 0.5, 60, 8_200);
        assert_eq!(
            rival.decide_bid(8_000, false, 0.0),
            BidDecision::Withdraw(WithdrawReason::BudgetExceeded)
        );
    }

    #[test]
    fn exhausted_patience_forces_withdrawal() {
        let rival = agent(RivalMood::Normal, 0.9, 0, 20_000);
        assert_eq!(
            rival.decide_bid(8_000, false, 0.0),
            BidDecision::Withdraw(WithdrawReason::PatienceExhausted)
        );
    }

    #[test]
    fn eager_rival_jumps_double_but_falls_back_near_budget() {
        let rival = agent(RivalMood::Normal, 0.9, 80, 9_000);
        assert_eq!(rival.decide_bid(7_000, false, 0.0), BidDecision::Bid { raise: 1_000 });
        assert_eq!(rival.decide_bid(8_300, false, 0.0), BidDecision::Bid { raise: 500 });
    }

    #[test]
    fn cautious_rival_declines_near_budget() {
        let rival = agent(RivalMood::Cautious, 0.6, 80, 10_000);
        assert_eq!(rival.decide_bid(8_000, false, 0.0), BidDecision::Bid { raise: 500 });
        assert_eq!(
            rival.decide_bid(8_600, false, 0.0),
            BidDecision::Withdraw(WithdrawReason::Declined)
        );
    }

    #[test]
    fn high_roll_declines() {
        let rival = agent(RivalMood::Normal, 0.2, 20, 10_000);
        assert!(rival.willingness() < 0.5);
        assert_eq!(
            rival.decide_bid(8_000, false, 0.99),
            BidDecision::Withdraw(WithdrawReason::Declined)
        );
    }

    #[test]
    fn decide_bid_is_pure() {
        let rival = agent(RivalMood::Confident, 0.6, 70, 12_000);
        let before = rival.clone();
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..16 {
            let _ = rival.decide_bid_with(9_000, false, &mut rng);
        }
        assert_eq!(rival, before);
    }

    #[test]
    fn mutators_only_ever_lower_state() {
        let mut rival = agent(RivalMood::Normal, 0.5, 30, 9_000);
        rival.on_outbid();
        assert_eq!(rival.patience(), 25);
        rival.on_power_bid();
        assert_eq!(rival.patience(), 10);
        rival.on_stall();
        assert_eq!(rival.patience(), 0, "patience clamps at zero");
        rival.on_kick_tires(1_500);
        assert_eq!(rival.budget(), 7_500);
        rival.on_kick_tires(-4_000);
        assert_eq!(rival.budget(), 7_500, "negative cuts are ignored");
        rival.on_kick_tires(10_000);
        assert_eq!(rival.budget(), -2_500, "budget has no floor");
    }

    #[test]
    fn pressure_check_prefers_budget_reason() {
        let mut rival = agent(RivalMood::Normal, 0.5, 5, 9_000);
        assert_eq!(rival.pressure_check(8_000), None);
        rival.on_kick_tires(1_500);
        assert_eq!(
            rival.pressure_check(8_000),
            Some(WithdrawReason::BudgetExceeded)
        );
        let mut patient = agent(RivalMood::Normal, 0.5, 5, 20_000);
        patient.on_stall();
        assert_eq!(
            patient.pressure_check(8_000),
            Some(WithdrawReason::PatienceExhausted)
        );
    }

    #[test]
    fn construction_seeds_budget_and_patience_from_interest() {
        let rules = AgentRules::default();
        let keen = RivalAgent::new(
            &RivalEntry {
                rival_id: RivalId::new("keen"),
                interest: 1.0,
                mood: RivalMood::Normal,
                wallet: 1_000_000,
            },
            10_000,
            rules.clone(),
        );
        let bored = RivalAgent::new(
            &RivalEntry {
                rival_id: RivalId::new("bored"),
                interest: 0.0,
                mood: RivalMood::Normal,
                wallet: 1_000_000,
            },
            10_000,
            rules,
        );
        assert_eq!(keen.budget(), 13_000);
        assert_eq!(bored.budget(), 8_000);
        assert_eq!(keen.patience(), 75);
        assert_eq!(bored.patience(), 55);
    }

    #[test]
    fn wallet_caps_seeded_budget() {
        let rival = RivalAgent::new(
            &RivalEntry {
                rival_id: RivalId::new("broke"),
                interest: 1.0,
                mood: RivalMood::Desperate,
                wallet: 6_000,
            },
            10_000,
            AgentRules::default(),
        );
        assert_eq!(rival.budget(), 6_000);
    }

    #[test]
    fn arena_collects_agents_by_id() {
        let entries = vec![
            RivalEntry {
                rival_id: RivalId::new("a"),
                interest: 0.4,
                mood: RivalMood::Cautious,
                wallet: 50_000,
            },
            RivalEntry {
                rival_id: RivalId::new("b"),
                interest: 0.9,
                mood: RivalMood::Confident,
                wallet: 50_000,
            },
        ];
        let arena = RivalArena::from_entries(&entries, 10_000, &AgentRules::default());
        assert_eq!(arena.len(), 2);
        assert!(arena.contains(&RivalId::new("b")));
        assert_eq!(
            arena.get(&RivalId::new("a")).map(RivalAgent::mood),
            Some(RivalMood::Cautious)
        );
    }
}
