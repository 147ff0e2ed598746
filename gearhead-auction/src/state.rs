//! Authoritative record of one auction in progress.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::config::AuctionRules;
use crate::effects::EndReason;
use crate::item::AuctionItem;
use crate::rival::RivalId;

/// Either the player or one of the rivals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidderId {
    Player,
    Rival(RivalId),
}

impl BidderId {
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self, Self::Player)
    }

    #[must_use]
    pub const fn rival_id(&self) -> Option<&RivalId> {
        match self {
            Self::Player => None,
            Self::Rival(id) => Some(id),
        }
    }

    #[must_use]
    pub fn is_rival(&self, rival_id: &RivalId) -> bool {
        self.rival_id() == Some(rival_id)
    }
}

impl fmt::Display for BidderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Rival(id) => write!(f, "{id}"),
        }
    }
}

/// Whose move the engine will accept next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOwner {
    Player,
    Rivals,
}

/// Whether the player is still in the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    PlayerPresent,
    RivalOnly,
}

/// Tactic uses scoped to one auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TacticCounters {
    pub power_bids: u32,
    pub stalls_used: u8,
    pub kick_tires_used: u8,
}

/// Display-only bid log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidLogEntry {
    pub bidder: BidderId,
    pub price: i64,
    /// Logical session tick at which the bid landed.
    pub tick: u64,
}

/// Terminal outcome of an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionResult {
    pub winner: BidderId,
    pub price: i64,
    pub reason: EndReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionState {
    item: AuctionItem,
    opening_price: i64,
    current_price: i64,
    has_any_bids: bool,
    leading_bidder: Option<BidderId>,
    active_rivals: Vec<RivalId>,
    withdrawn_rivals: Vec<RivalId>,
    tactics: TacticCounters,
    player_withdrawn: bool,
    bid_history: VecDeque<BidLogEntry>,
    history_window: usize,
    resolved: Option<AuctionResult>,
    awaiting: TurnOwner,
    rival_only_ceiling: i64,
    tick: u64,
}

impl AuctionState {
    /// Open an auction for `item` with the given rivals, player to act first.
    #[must_use]
    pub fn new(item: AuctionItem, rules: &AuctionRules, rivals: Vec<RivalId>) -> Self {
        let opening_price = item.opening_price(rules);
        let rival_only_ceiling = item.rival_only_ceiling(rules);
        let mut active_rivals = Vec::with_capacity(rivals.len());
        for rival_id in rivals {
            if !active_rivals.contains(&rival_id) {
                active_rivals.push(rival_id);
            }
        }
        Self {
            item,
            opening_price,
            current_price: opening_price,
            has_any_bids: false,
            leading_bidder: None,
            active_rivals,
            withdrawn_rivals: Vec::new(),
            tactics: TacticCounters::default(),
            player_withdrawn: false,
            bid_history: VecDeque::with_capacity(rules.bid_history_window),
            history_window: rules.bid_history_window.max(1),
            resolved: None,
            awaiting: TurnOwner::Player,
            rival_only_ceiling,
            tick: 0,
        }
    }

    #[must_use]
    pub const fn item(&self) -> &AuctionItem {
        &self.item
    }

    #[must_use]
    pub const fn opening_price(&self) -> i64 {
        self.opening_price
    }

    #[must_use]
    pub const fn current_price(&self) -> i64 {
        self.current_price
    }

    #[must_use]
    pub const fn has_any_bids(&self) -> bool {
        self.has_any_bids
    }

    #[must_use]
    pub const fn leading_bidder(&self) -> Option<&BidderId> {
        self.leading_bidder.as_ref()
    }

    #[must_use]
    pub fn active_rivals(&self) -> &[RivalId] {
        &self.active_rivals
    }

    #[must_use]
    pub fn withdrawn_rivals(&self) -> &[RivalId] {
        &self.withdrawn_rivals
    }

    #[must_use]
    pub const fn tactics(&self) -> &TacticCounters {
        &self.tactics
    }

    #[must_use]
    pub const fn player_withdrawn(&self) -> bool {
        self.player_withdrawn
    }

    pub fn bid_history(&self) -> impl Iterator<Item = &BidLogEntry> {
        self.bid_history.iter()
    }

    #[must_use]
    pub const fn result(&self) -> Option<&AuctionResult> {
        self.resolved.as_ref()
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    #[must_use]
    pub const fn awaiting(&self) -> TurnOwner {
        self.awaiting
    }

    #[must_use]
    pub const fn rival_only_ceiling(&self) -> i64 {
        self.rival_only_ceiling
    }

    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub const fn mode(&self) -> TurnMode {
        if self.player_withdrawn {
            TurnMode::RivalOnly
        } else {
            TurnMode::PlayerPresent
        }
    }

    #[must_use]
    pub fn is_active(&self, rival_id: &RivalId) -> bool {
        self.active_rivals.contains(rival_id)
    }

    #[must_use]
    pub fn player_leads(&self) -> bool {
        matches!(self.leading_bidder, Some(BidderId::Player))
    }

    #[must_use]
    pub fn rival_leads(&self, rival_id: &RivalId) -> bool {
        self.leading_bidder
            .as_ref()
            .is_some_and(|leader| leader.is_rival(rival_id))
    }

    /// Price a bid would land at: the opening price as-is, otherwise a raise.
    #[must_use]
    pub const fn price_after_raise(&self, raise: i64) -> i64 {
        if self.has_any_bids {
            self.current_price.saturating_add(raise)
        } else {
            self.current_price
        }
    }

    pub(crate) fn record_bid(&mut self, bidder: BidderId, price: i64) {
        debug_assert!(price >= self.current_price, "price must never decrease");
        self.current_price = self.current_price.max(price);
        self.has_any_bids = true;
        self.tick = self.tick.saturating_add(1);
        if self.bid_history.len() == self.history_window {
            self.bid_history.pop_front();
        }
        self.bid_history.push_back(BidLogEntry {
            bidder: bidder.clone(),
            price: self.current_price,
            tick: self.tick,
        });
        self.leading_bidder = Some(bidder);
    }

    /// Remove a rival permanently. A withdrawing leader reopens the bidding.
    pub(crate) fn withdraw_rival(&mut self, rival_id: &RivalId) -> bool {
        let Some(pos) = self.active_rivals.iter().position(|id| id == rival_id) else {
            return false;
        };
        let removed = self.active_rivals.remove(pos);
        if self.rival_leads(&removed) {
            self.reopen_bidding();
        }
        self.withdrawn_rivals.push(removed);
        true
    }

    pub(crate) fn withdraw_player(&mut self) {
        self.player_withdrawn = true;
        if self.player_leads() {
            self.reopen_bidding();
        }
    }

    fn reopen_bidding(&mut self) {
        self.leading_bidder = None;
        self.has_any_bids = false;
    }

    pub(crate) fn resolve(&mut self, winner: BidderId, reason: EndReason) -> AuctionResult {
        let result = AuctionResult {
            winner,
            price: self.current_price,
            reason,
        };
        self.resolved = Some(result.clone());
        result
    }

    pub(crate) const fn tactics_mut(&mut self) -> &mut TacticCounters {
        &mut self.tactics
    }

    pub(crate) const fn set_awaiting(&mut self, owner: TurnOwner) {
        self.awaiting = owner;
    }

    pub(crate) const fn advance_tick(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }
}
