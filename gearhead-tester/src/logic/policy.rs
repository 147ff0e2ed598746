use std::fmt;

use gearhead_auction::{AuctionRules, AuctionState, PlayerAction, PlayerSkills};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// What a policy can see when the floor is theirs.
#[derive(Debug, Clone, Copy)]
pub struct PlayerView<'a> {
    pub state: &'a AuctionState,
    pub rules: &'a AuctionRules,
    pub funds: i64,
    pub skills: PlayerSkills,
    /// Budget cut a kick-tires inspection of this item would inflict.
    pub kick_reduction: i64,
}

impl PlayerView<'_> {
    fn market(&self) -> i64 {
        self.state.item().market_value
    }

    fn next_bid(&self) -> i64 {
        self.state.price_after_raise(self.rules.bid_increment)
    }

    fn next_power_bid(&self) -> i64 {
        self.state.price_after_raise(self.rules.power_bid_increment)
    }

    fn can_kick_tires(&self) -> bool {
        self.skills.eye >= self.rules.kick_tires_min_skill
            && self.state.tactics().kick_tires_used < self.skills.eye
    }

    fn can_stall(&self) -> bool {
        self.skills.tongue >= self.rules.stall_min_skill
            && self.state.tactics().stalls_used < self.skills.tongue
    }
}

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub action: PlayerAction,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(action: PlayerAction, rationale: impl Into<String>) -> Self {
        Self {
            action,
            rationale: Some(rationale.into()),
        }
    }
}

/// Policy interface for automated bidding.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the next action while it is the player's turn.
    fn decide(&mut self, view: &PlayerView<'_>) -> PolicyDecision;
}

/// Built-in bidding strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BiddingStrategy {
    /// Standard bids up to market value.
    Steady,
    /// Power bids up to a premium over market.
    Aggressive,
    /// Wears rivals down with tactics before bidding.
    Tactician,
    /// Opens, then walks away early.
    Lowball,
    /// Uniformly random actions.
    Chaos,
}

impl BiddingStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Steady => "Steady",
            Self::Aggressive => "Aggressive",
            Self::Tactician => "Tactician",
            Self::Lowball => "Lowball",
            Self::Chaos => "Chaos",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Steady => Box::new(SteadyPolicy),
            Self::Aggressive => Box::new(AggressivePolicy),
            Self::Tactician => Box::new(TacticianPolicy),
            Self::Lowball => Box::new(LowballPolicy),
            Self::Chaos => Box::new(ChaosPolicy::new(seed)),
        }
    }
}

impl fmt::Display for BiddingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct SteadyPolicy;
struct AggressivePolicy;
struct TacticianPolicy;
struct LowballPolicy;

struct ChaosPolicy {
    rng: ChaCha20Rng,
}

impl ChaosPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

/// Bid if the next price stays under `limit`, otherwise fold.
fn bid_within(view: &PlayerView<'_>, limit: i64) -> PolicyDecision {
    let next = view.next_bid();
    if next <= limit && next <= view.funds {
        PolicyDecision::new(PlayerAction::Bid, format!("bid {next} under {limit}"))
    } else {
        PolicyDecision::new(PlayerAction::Withdraw, format!("{next} over limit {limit}"))
    }
}

impl PlayerPolicy for SteadyPolicy {
    fn name(&self) -> &'static str {
        "Steady"
    }

    fn decide(&mut self, view: &PlayerView<'_>) -> PolicyDecision {
        bid_within(view, view.market())
    }
}

impl PlayerPolicy for AggressivePolicy {
    fn name(&self) -> &'static str {
        "Aggressive"
    }

    fn decide(&mut self, view: &PlayerView<'_>) -> PolicyDecision {
        let limit = view.market() + view.market() / 6;
        let power = view.next_power_bid();
        if view.state.has_any_bids() && power <= limit && power <= view.funds {
            return PolicyDecision::new(PlayerAction::PowerBid, format!("power to {power}"));
        }
        bid_within(view, limit)
    }
}

impl PlayerPolicy for TacticianPolicy {
    fn name(&self) -> &'static str {
        "Tactician"
    }

    fn decide(&mut self, view: &PlayerView<'_>) -> PolicyDecision {
        if view.can_kick_tires() {
            return PolicyDecision::new(
                PlayerAction::KickTires {
                    budget_reduction: view.kick_reduction,
                },
                format!("inspect for -{}", view.kick_reduction),
            );
        }
        if view.can_stall() {
            return PolicyDecision::new(PlayerAction::Stall, "stall");
        }
        bid_within(view, view.market())
    }
}

impl PlayerPolicy for LowballPolicy {
    fn name(&self) -> &'static str {
        "Lowball"
    }

    fn decide(&mut self, view: &PlayerView<'_>) -> PolicyDecision {
        bid_within(view, view.state.opening_price() + view.rules.bid_increment)
    }
}

impl PlayerPolicy for ChaosPolicy {
    fn name(&self) -> &'static str {
        "Chaos"
    }

    fn decide(&mut self, view: &PlayerView<'_>) -> PolicyDecision {
        let action = match self.rng.gen_range(0..10) {
            0..=4 => PlayerAction::Bid,
            5 => PlayerAction::PowerBid,
            6 => PlayerAction::KickTires {
                budget_reduction: view.kick_reduction,
            },
            7 | 8 => PlayerAction::Stall,
            _ => PlayerAction::Withdraw,
        };
        PolicyDecision {
            action,
            rationale: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearhead_auction::{AuctionItem, RivalId};

    fn state(market: i64) -> AuctionState {
        AuctionState::new(
            AuctionItem::new("lot", "Lot", market, 50),
            &AuctionRules::default(),
            vec![RivalId::new("a")],
        )
    }

    fn view<'a>(
        state: &'a AuctionState,
        rules: &'a AuctionRules,
        skills: PlayerSkills,
    ) -> PlayerView<'a> {
        PlayerView {
            state,
            rules,
            funds: 100_000,
            skills,
            kick_reduction: 900,
        }
    }

    #[test]
    fn steady_opens_then_folds_over_market() {
        let rules = AuctionRules::default();
        let cheap = state(10_000);
        let decision = SteadyPolicy.decide(&view(&cheap, &rules, PlayerSkills::default()));
        assert_eq!(decision.action, PlayerAction::Bid);

        let zero_market = state(0);
        let mut broke = view(&zero_market, &rules, PlayerSkills::default());
        broke.funds = -1;
        assert_eq!(SteadyPolicy.decide(&broke).action, PlayerAction::Withdraw);
    }

    #[test]
    fn tactician_spends_tactics_before_bidding() {
        let rules = AuctionRules::default();
        let lot = state(10_000);
        let skilled = PlayerSkills { eye: 3, tongue: 2 };
        let decision = TacticianPolicy.decide(&view(&lot, &rules, skilled));
        assert_eq!(
            decision.action,
            PlayerAction::KickTires {
                budget_reduction: 900
            }
        );
        let unskilled = TacticianPolicy.decide(&view(&lot, &rules, PlayerSkills::default()));
        assert_eq!(unskilled.action, PlayerAction::Bid);
    }

    #[test]
    fn chaos_policy_is_seed_stable() {
        let rules = AuctionRules::default();
        let lot = state(10_000);
        let v = view(&lot, &rules, PlayerSkills::default());
        let mut a = BiddingStrategy::Chaos.create_policy(7);
        let mut b = BiddingStrategy::Chaos.create_policy(7);
        for _ in 0..32 {
            assert_eq!(a.decide(&v).action, b.decide(&v).action);
        }
    }
}
