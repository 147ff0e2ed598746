//! Turn resolution engine.
//!
//! Every transition takes the session state and the rival arena by `&mut`,
//! validates first and mutates second: a rejected action leaves both
//! untouched and emits nothing. Applied transitions return the ordered
//! effects the driver should render.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuctionRules;
use crate::constants::LOG_TARGET;
use crate::effects::{AuctionEffect, BarkTrigger, BidKind, EffectList, EndReason, Speaker, Tactic};
use crate::rival::{BidDecision, RivalArena, RivalId, WithdrawReason};
use crate::state::{AuctionState, BidderId, TurnMode, TurnOwner};

/// Source of the player's spendable money; queried on every bid attempt.
pub trait PlayerWallet {
    fn available_funds(&self) -> i64;
}

impl PlayerWallet for i64 {
    fn available_funds(&self) -> i64 {
        *self
    }
}

/// Cash on hand minus money already promised elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub cash: i64,
    pub committed: i64,
}

impl PlayerWallet for WalletSnapshot {
    fn available_funds(&self) -> i64 {
        self.cash.saturating_sub(self.committed.max(0))
    }
}

/// Player skill levels relevant to auction tactics; owned by the economy layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerSkills {
    /// Mechanical eye; gates kick-tires.
    pub eye: u8,
    /// Negotiation; gates stalling and caps stalls per auction.
    pub tongue: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    Bid,
    PowerBid,
    KickTires { budget_reduction: i64 },
    Stall,
    Withdraw,
}

/// Scripted escape hatch that guarantees a specific winner.
///
/// Only honoured while `sequence_active` is set by the narrative layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOverride {
    pub sequence_active: bool,
    pub winner: BidderId,
}

impl ResolutionOverride {
    #[must_use]
    pub const fn armed(winner: BidderId) -> Self {
        Self {
            sequence_active: true,
            winner,
        }
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.sequence_active
    }
}

/// Precondition that turned an action into a no-op.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("the auction is already over")]
    AuctionResolved,
    #[error("it is not the player's turn")]
    NotPlayerTurn,
    #[error("the rivals are not due to act")]
    NotRivalTurn,
    #[error("the player has already walked away")]
    PlayerWithdrawn,
    #[error("the player already holds the high bid")]
    AlreadyLeading,
    #[error("a bid of {required} needs more than the {available} available")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("{tactic} needs skill {required} (have {actual})")]
    SkillTooLow {
        tactic: Tactic,
        required: u8,
        actual: u8,
    },
    #[error("{tactic} already used {used} of {cap} times")]
    TacticExhausted { tactic: Tactic, used: u8, cap: u8 },
    #[error("override requested without an active scripted sequence")]
    OverrideInactive,
    #[error("unknown rival {0}")]
    UnknownRival(RivalId),
    #[error("rival {0} has already withdrawn")]
    RivalWithdrawn(RivalId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResolution {
    Applied,
    Rejected(Rejection),
}

/// Result of one transition: whether it applied, and what the driver should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub resolution: ActionResolution,
    pub effects: EffectList,
}

impl TransitionOutcome {
    #[must_use]
    pub const fn applied(effects: EffectList) -> Self {
        Self {
            resolution: ActionResolution::Applied,
            effects,
        }
    }

    #[must_use]
    pub fn rejected(rejection: Rejection) -> Self {
        log::debug!(target: LOG_TARGET, "action rejected: {rejection}");
        Self {
            resolution: ActionResolution::Rejected(rejection),
            effects: EffectList::new(),
        }
    }

    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self.resolution, ActionResolution::Applied)
    }

    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match &self.resolution {
            ActionResolution::Applied => None,
            ActionResolution::Rejected(rejection) => Some(rejection),
        }
    }

    /// Whether this transition ended the auction.
    #[must_use]
    pub fn ended(&self) -> bool {
        self.effects.iter().any(AuctionEffect::is_terminal)
    }

    /// Fold another applied step's effects into this outcome.
    pub fn absorb(&mut self, other: Self) {
        self.effects.extend(other.effects);
    }
}

/// Stateless rule set applying transitions to caller-owned sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuctionEngine {
    rules: AuctionRules,
}

impl AuctionEngine {
    #[must_use]
    pub const fn new(rules: AuctionRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub const fn rules(&self) -> &AuctionRules {
        &self.rules
    }

    /// Dispatch a player action to its transition.
    pub fn apply(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        action: PlayerAction,
        wallet: &impl PlayerWallet,
        skills: PlayerSkills,
    ) -> TransitionOutcome {
        match action {
            PlayerAction::Bid => self.bid(state, arena, wallet),
            PlayerAction::PowerBid => self.power_bid(state, arena, wallet),
            PlayerAction::KickTires { budget_reduction } => {
                self.kick_tires(state, arena, skills, budget_reduction)
            }
            PlayerAction::Stall => self.stall(state, arena, skills),
            PlayerAction::Withdraw => self.withdraw(state),
        }
    }

    /// Standard bid: the opening price, or the current price plus one increment.
    pub fn bid(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        wallet: &impl PlayerWallet,
    ) -> TransitionOutcome {
        self.place_player_bid(state, arena, wallet, false)
    }

    /// Power bid: a larger jump that also costs every rival extra patience.
    pub fn power_bid(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        wallet: &impl PlayerWallet,
    ) -> TransitionOutcome {
        self.place_player_bid(state, arena, wallet, true)
    }

    fn place_player_bid(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        wallet: &impl PlayerWallet,
        power: bool,
    ) -> TransitionOutcome {
        if let Err(rejection) = guard_player_turn(state) {
            return TransitionOutcome::rejected(rejection);
        }
        if state.player_leads() {
            return TransitionOutcome::rejected(Rejection::AlreadyLeading);
        }
        let increment = if power {
            self.rules.power_bid_increment
        } else {
            self.rules.bid_increment
        };
        let price = state.price_after_raise(increment);
        let available = wallet.available_funds();
        if price > available {
            return TransitionOutcome::rejected(Rejection::InsufficientFunds {
                required: price,
                available,
            });
        }

        let kind = if !state.has_any_bids() {
            BidKind::Opening
        } else if power {
            BidKind::Power
        } else {
            BidKind::Standard
        };
        let mut effects = EffectList::new();
        state.record_bid(BidderId::Player, price);
        log::debug!(target: LOG_TARGET, "player bid {price} ({kind:?})");
        effects.push(AuctionEffect::BidRecorded {
            bidder: BidderId::Player,
            price,
            kind,
        });
        effects.push(AuctionEffect::bark(
            Speaker::Player,
            if kind == BidKind::Opening {
                BarkTrigger::OpeningBid
            } else {
                BarkTrigger::Raised
            },
        ));

        // An opening power bid lands at the opening price, so it presses like a plain bid.
        let power = power && kind == BidKind::Power;
        let active: Vec<RivalId> = state.active_rivals().to_vec();
        for rival_id in &active {
            if let Some(agent) = arena.get_mut(rival_id) {
                if power {
                    agent.on_power_bid();
                } else {
                    agent.on_outbid();
                }
            }
        }

        if power {
            let counters = state.tactics_mut();
            counters.power_bids = counters.power_bids.saturating_add(1);
            effects.push(AuctionEffect::TacticApplied {
                tactic: Tactic::PowerBid,
            });
            if let Some(first) = active.first() {
                effects.push(AuctionEffect::bark(
                    Speaker::Rival(first.clone()),
                    BarkTrigger::PowerBidShock,
                ));
            }
            pressure_sweep(state, arena, &mut effects);
        }

        if !settle(state, &mut effects) {
            state.set_awaiting(TurnOwner::Rivals);
        }
        TransitionOutcome::applied(effects)
    }

    /// Inspect the car in front of the room, permanently lowering rival budgets.
    ///
    /// Uses per auction are capped at the player's eye. The player keeps the
    /// turn afterwards.
    pub fn kick_tires(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        skills: PlayerSkills,
        budget_reduction: i64,
    ) -> TransitionOutcome {
        if let Err(rejection) = guard_player_turn(state) {
            return TransitionOutcome::rejected(rejection);
        }
        let required = self.rules.kick_tires_min_skill;
        if skills.eye < required {
            return TransitionOutcome::rejected(Rejection::SkillTooLow {
                tactic: Tactic::KickTires,
                required,
                actual: skills.eye,
            });
        }
        let used = state.tactics().kick_tires_used;
        if used >= skills.eye {
            return TransitionOutcome::rejected(Rejection::TacticExhausted {
                tactic: Tactic::KickTires,
                used,
                cap: skills.eye,
            });
        }

        let mut effects = EffectList::new();
        for rival_id in state.active_rivals() {
            if let Some(agent) = arena.get_mut(rival_id) {
                agent.on_kick_tires(budget_reduction);
            }
        }
        state.tactics_mut().kick_tires_used = used.saturating_add(1);
        state.advance_tick();
        log::debug!(target: LOG_TARGET, "player kicked tires: budgets -{budget_reduction}");
        effects.push(AuctionEffect::TacticApplied {
            tactic: Tactic::KickTires,
        });
        effects.push(AuctionEffect::bark(Speaker::Player, BarkTrigger::TiresKicked));
        pressure_sweep(state, arena, &mut effects);
        settle(state, &mut effects);
        TransitionOutcome::applied(effects)
    }

    /// Drag the auction out, wearing down every rival's patience.
    pub fn stall(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        skills: PlayerSkills,
    ) -> TransitionOutcome {
        if let Err(rejection) = guard_player_turn(state) {
            return TransitionOutcome::rejected(rejection);
        }
        let required = self.rules.stall_min_skill;
        if skills.tongue < required {
            return TransitionOutcome::rejected(Rejection::SkillTooLow {
                tactic: Tactic::Stall,
                required,
                actual: skills.tongue,
            });
        }
        let used = state.tactics().stalls_used;
        if used >= skills.tongue {
            return TransitionOutcome::rejected(Rejection::TacticExhausted {
                tactic: Tactic::Stall,
                used,
                cap: skills.tongue,
            });
        }

        let mut effects = EffectList::new();
        for rival_id in state.active_rivals() {
            if let Some(agent) = arena.get_mut(rival_id) {
                agent.on_stall();
            }
        }
        state.tactics_mut().stalls_used = used.saturating_add(1);
        state.advance_tick();
        log::debug!(target: LOG_TARGET, "player stalled ({} of {})", used + 1, skills.tongue);
        effects.push(AuctionEffect::TacticApplied {
            tactic: Tactic::Stall,
        });
        effects.push(AuctionEffect::bark(Speaker::Player, BarkTrigger::Stalled));
        pressure_sweep(state, arena, &mut effects);
        if !settle(state, &mut effects) {
            state.set_awaiting(TurnOwner::Rivals);
        }
        TransitionOutcome::applied(effects)
    }

    /// Walk away. Rivals keep bidding among themselves afterwards.
    pub fn withdraw(&self, state: &mut AuctionState) -> TransitionOutcome {
        if let Err(rejection) = guard_player_turn(state) {
            return TransitionOutcome::rejected(rejection);
        }
        let mut effects = EffectList::new();
        state.withdraw_player();
        state.advance_tick();
        log::debug!(target: LOG_TARGET, "player withdrew at {}", state.current_price());
        effects.push(AuctionEffect::bark(Speaker::Player, BarkTrigger::PlayerFolded));
        if !settle(state, &mut effects) {
            state.set_awaiting(TurnOwner::Rivals);
        }
        TransitionOutcome::applied(effects)
    }

    /// Apply a batch of rival decisions in order.
    ///
    /// Entries for rivals that are no longer active, or that currently hold
    /// the high bid, are skipped. Bid targets are recomputed from the price
    /// at the moment each entry is applied. An armed override short-circuits
    /// natural resolution in favour of its scripted winner.
    pub fn resolve_rival_decisions(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        decisions: &[(RivalId, BidDecision)],
        scripted: Option<&ResolutionOverride>,
    ) -> TransitionOutcome {
        if let Err(rejection) = guard_rival_turn(state) {
            return TransitionOutcome::rejected(rejection);
        }
        if let Some(scripted) = scripted.filter(|o| o.is_armed()) {
            if let Err(rejection) = validate_override(state, arena, scripted) {
                return TransitionOutcome::rejected(rejection);
            }
            let mut effects = EffectList::new();
            self.force_winner(state, arena, &scripted.winner, &mut effects);
            return TransitionOutcome::applied(effects);
        }

        let mut effects = EffectList::new();
        for (rival_id, decision) in decisions {
            if state.is_resolved() {
                break;
            }
            if !state.is_active(rival_id) || state.rival_leads(rival_id) {
                log::trace!(target: LOG_TARGET, "skipping {rival_id}: inactive or leading");
                continue;
            }
            match *decision {
                BidDecision::Withdraw(reason) => {
                    drop_rival(state, rival_id, reason, &mut effects);
                }
                BidDecision::Bid { raise } => {
                    self.apply_rival_bid(state, arena, rival_id, raise, &mut effects);
                }
            }
            settle(state, &mut effects);
        }
        TransitionOutcome::applied(effects)
    }

    fn apply_rival_bid(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        rival_id: &RivalId,
        raise: i64,
        effects: &mut EffectList,
    ) {
        let Some(budget) = arena.get(rival_id).map(crate::rival::RivalAgent::budget) else {
            return;
        };
        let opening = !state.has_any_bids();
        let raise = if opening {
            0
        } else {
            raise.max(self.rules.bid_increment)
        };
        let mut price = state.price_after_raise(raise);

        if state.mode() == TurnMode::RivalOnly && price > state.rival_only_ceiling() {
            let ceiling = state.rival_only_ceiling();
            if !opening && ceiling > state.current_price() {
                price = ceiling;
            } else {
                drop_rival(state, rival_id, WithdrawReason::Declined, effects);
                return;
            }
        }
        if price > budget {
            drop_rival(state, rival_id, WithdrawReason::BudgetExceeded, effects);
            return;
        }

        state.record_bid(BidderId::Rival(rival_id.clone()), price);
        log::debug!(target: LOG_TARGET, "rival {rival_id} bid {price}");
        effects.push(AuctionEffect::BidRecorded {
            bidder: BidderId::Rival(rival_id.clone()),
            price,
            kind: if opening {
                BidKind::Opening
            } else {
                BidKind::Standard
            },
        });
        effects.push(AuctionEffect::bark(
            Speaker::Rival(rival_id.clone()),
            if opening {
                BarkTrigger::OpeningBid
            } else {
                BarkTrigger::Raised
            },
        ));
        for other in state.active_rivals() {
            if other != rival_id
                && let Some(agent) = arena.get_mut(other)
            {
                agent.on_outbid();
            }
        }
    }

    /// Close out a rival turn: check end conditions and hand control back.
    pub fn finish_rival_turn(&self, state: &mut AuctionState) -> TransitionOutcome {
        if let Err(rejection) = guard_rival_turn(state) {
            return TransitionOutcome::rejected(rejection);
        }
        let mut effects = EffectList::new();
        state.advance_tick();
        if !settle(state, &mut effects) && state.mode() == TurnMode::PlayerPresent {
            state.set_awaiting(TurnOwner::Player);
        }
        TransitionOutcome::applied(effects)
    }

    /// Explicit end requested by the caller, e.g. a scripted story beat.
    pub fn end_auction(
        &self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        request: &ResolutionOverride,
    ) -> TransitionOutcome {
        if state.is_resolved() {
            return TransitionOutcome::rejected(Rejection::AuctionResolved);
        }
        if !request.is_armed() {
            return TransitionOutcome::rejected(Rejection::OverrideInactive);
        }
        if let Err(rejection) = validate_override(state, arena, request) {
            return TransitionOutcome::rejected(rejection);
        }
        let mut effects = EffectList::new();
        conclude(state, request.winner.clone(), EndReason::Forced, &mut effects);
        TransitionOutcome::applied(effects)
    }

    fn force_winner(
        &self,
        state: &mut AuctionState,
        arena: &RivalArena,
        winner: &BidderId,
        effects: &mut EffectList,
    ) {
        if let BidderId::Rival(rival_id) = winner
            && arena.contains(rival_id)
            && !state.rival_leads(rival_id)
        {
            let opening = !state.has_any_bids();
            let price = state.price_after_raise(self.rules.bid_increment);
            state.record_bid(winner.clone(), price);
            effects.push(AuctionEffect::BidRecorded {
                bidder: winner.clone(),
                price,
                kind: if opening {
                    BidKind::Opening
                } else {
                    BidKind::Standard
                },
            });
        }
        log::debug!(target: LOG_TARGET, "scripted override resolves auction for {winner}");
        conclude(state, winner.clone(), EndReason::Forced, effects);
    }
}

fn guard_player_turn(state: &AuctionState) -> Result<(), Rejection> {
    if state.is_resolved() {
        return Err(Rejection::AuctionResolved);
    }
    if state.player_withdrawn() {
        return Err(Rejection::PlayerWithdrawn);
    }
    if state.awaiting() != TurnOwner::Player {
        return Err(Rejection::NotPlayerTurn);
    }
    Ok(())
}

fn guard_rival_turn(state: &AuctionState) -> Result<(), Rejection> {
    if state.is_resolved() {
        return Err(Rejection::AuctionResolved);
    }
    if state.awaiting() != TurnOwner::Rivals {
        return Err(Rejection::NotRivalTurn);
    }
    Ok(())
}

fn validate_override(
    state: &AuctionState,
    arena: &RivalArena,
    request: &ResolutionOverride,
) -> Result<(), Rejection> {
    match &request.winner {
        BidderId::Player => Ok(()),
        BidderId::Rival(rival_id) if !arena.contains(rival_id) => {
            Err(Rejection::UnknownRival(rival_id.clone()))
        }
        BidderId::Rival(rival_id) if !state.is_active(rival_id) => {
            Err(Rejection::RivalWithdrawn(rival_id.clone()))
        }
        BidderId::Rival(_) => Ok(()),
    }
}

/// Drop every active rival whose tactic-worn state can no longer hold on.
fn pressure_sweep(state: &mut AuctionState, arena: &RivalArena, effects: &mut EffectList) {
    let price = state.current_price();
    let broken: Vec<(RivalId, WithdrawReason)> = state
        .active_rivals()
        .iter()
        .filter_map(|rival_id| {
            arena
                .get(rival_id)
                .and_then(|agent| agent.pressure_check(price))
                .map(|reason| (rival_id.clone(), reason))
        })
        .collect();
    for (rival_id, reason) in broken {
        drop_rival(state, &rival_id, reason, effects);
    }
}

fn drop_rival(
    state: &mut AuctionState,
    rival_id: &RivalId,
    reason: WithdrawReason,
    effects: &mut EffectList,
) {
    if !state.withdraw_rival(rival_id) {
        return;
    }
    log::debug!(target: LOG_TARGET, "rival {rival_id} dropped: {}", reason.key());
    effects.push(AuctionEffect::RivalDropped {
        rival_id: rival_id.clone(),
        reason,
    });
    effects.push(AuctionEffect::bark(
        Speaker::Rival(rival_id.clone()),
        BarkTrigger::Withdrew(reason),
    ));
}

/// Natural end conditions, checked after every transition.
fn end_condition(state: &AuctionState) -> Option<(BidderId, EndReason)> {
    let active = state.active_rivals();
    if active.is_empty() {
        return Some((BidderId::Player, EndReason::AllRivalsDropped));
    }
    if state.player_withdrawn()
        && let [last] = active
    {
        return Some((BidderId::Rival(last.clone()), EndReason::LastRivalStanding));
    }
    None
}

/// Resolve the auction if an end condition holds. Returns whether it ended.
fn settle(state: &mut AuctionState, effects: &mut EffectList) -> bool {
    if state.is_resolved() {
        return true;
    }
    match end_condition(state) {
        Some((winner, reason)) => {
            conclude(state, winner, reason, effects);
            true
        }
        None => false,
    }
}

fn conclude(
    state: &mut AuctionState,
    winner: BidderId,
    reason: EndReason,
    effects: &mut EffectList,
) {
    let result = state.resolve(winner, reason);
    log::debug!(
        target: LOG_TARGET,
        "auction for {} ended: {} wins at {} ({:?})",
        state.item().id,
        result.winner,
        result.price,
        result.reason
    );
    effects.push(AuctionEffect::AuctionEnded {
        winner: result.winner.clone(),
        price: result.price,
        reason: result.reason,
    });
    effects.push(AuctionEffect::bark(Speaker::Auctioneer, BarkTrigger::Sold));
    match &result.winner {
        BidderId::Player => {
            effects.push(AuctionEffect::bark(Speaker::Player, BarkTrigger::Won));
        }
        BidderId::Rival(rival_id) => {
            effects.push(AuctionEffect::bark(
                Speaker::Rival(rival_id.clone()),
                BarkTrigger::Won,
            ));
            if !state.player_withdrawn() {
                effects.push(AuctionEffect::bark(Speaker::Player, BarkTrigger::Lost));
            }
        }
    }
}
