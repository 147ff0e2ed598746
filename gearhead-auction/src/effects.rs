//! Effects emitted by auction transitions for the driver to render.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::rival::{RivalId, WithdrawReason};
use crate::state::BidderId;

/// Most transitions emit a handful of effects; keep them inline.
pub type EffectList = SmallVec<[AuctionEffect; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidKind {
    /// Claimed the seeded opening price.
    Opening,
    Standard,
    Power,
}

/// Player tactics with a mechanical effect beyond the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    PowerBid,
    Stall,
    KickTires,
}

impl Tactic {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PowerBid => "power_bid",
            Self::Stall => "stall",
            Self::KickTires => "kick_tires",
        }
    }
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    AllRivalsDropped,
    LastRivalStanding,
    /// Ended by an explicit scripted override.
    Forced,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Player,
    Rival(RivalId),
    Auctioneer,
}

/// Moments that deserve a short flavor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarkTrigger {
    OpeningBid,
    Raised,
    PowerBidShock,
    Stalled,
    TiresKicked,
    Withdrew(WithdrawReason),
    PlayerFolded,
    /// Hammer falls; spoken by the auctioneer.
    Sold,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEffect {
    BidRecorded {
        bidder: BidderId,
        price: i64,
        kind: BidKind,
    },
    RivalDropped {
        rival_id: RivalId,
        reason: WithdrawReason,
    },
    AuctionEnded {
        winner: BidderId,
        price: i64,
        reason: EndReason,
    },
    BarkRequested {
        speaker: Speaker,
        trigger: BarkTrigger,
    },
    TacticApplied {
        tactic: Tactic,
    },
}

impl AuctionEffect {
    #[must_use]
    pub fn bark(speaker: Speaker, trigger: BarkTrigger) -> Self {
        Self::BarkRequested { speaker, trigger }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AuctionEnded { .. })
    }
}
