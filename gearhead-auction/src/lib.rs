//! Gearhead Auction Engine
//!
//! Platform-agnostic core of the Gearhead car auction: rival negotiation
//! agents, the per-auction session state, the turn resolution engine and the
//! multi-rival turn scheduler. No rendering, timers or platform I/O live here.

pub mod config;
pub mod constants;
pub mod effects;
pub mod engine;
pub mod item;
pub mod numbers;
pub mod pacing;
pub mod rival;
pub mod rng;
pub mod roster;
pub mod scheduler;
pub mod session;
pub mod state;

use anyhow::Context;
use std::convert::Infallible;

// Re-export commonly used types
pub use config::{AuctionConfig, AuctionConfigError, AuctionRules, RivalTuning};
pub use constants::RIVAL_ONLY_MAX_TURNS;
pub use effects::{AuctionEffect, BarkTrigger, BidKind, EffectList, EndReason, Speaker, Tactic};
pub use engine::{
    ActionResolution, AuctionEngine, PlayerAction, PlayerSkills, PlayerWallet, Rejection,
    ResolutionOverride, TransitionOutcome, WalletSnapshot,
};
pub use item::AuctionItem;
pub use pacing::{PacingConfig, ScheduledTurn, TicketError, TurnPacer, TurnTicket};
pub use rival::{
    AgentRules, BidDecision, RivalAgent, RivalArena, RivalEntry, RivalId, RivalMood,
    WithdrawReason,
};
pub use rng::{AuctionRng, CountingRng};
pub use roster::{RivalProfile, RivalRoster, RosterError};
pub use scheduler::{
    RivalOnlyRun, RivalTurnScheduler, SchedulerPhase, SchedulerStep, shuffled_order,
};
pub use session::AuctionSession;
pub use state::{
    AuctionResult, AuctionState, BidLogEntry, BidderId, TacticCounters, TurnMode, TurnOwner,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the auction rules, rival tuning and pacing configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<AuctionConfig, Self::Error>;

    /// Load the roster of known rivals
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be loaded or parsed.
    fn load_roster(&self) -> Result<RivalRoster, Self::Error>;
}

/// Loader backed by the data embedded in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedData;

impl DataLoader for EmbeddedData {
    type Error = Infallible;

    fn load_config(&self) -> Result<AuctionConfig, Self::Error> {
        Ok(AuctionConfig::load_from_static())
    }

    fn load_roster(&self) -> Result<RivalRoster, Self::Error> {
        Ok(RivalRoster::load_from_static())
    }
}

/// Opens auction sessions from loaded configuration and roster data.
pub struct AuctionHouse<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> AuctionHouse<L>
where
    L: DataLoader,
{
    /// Create an auction house with the provided data loader
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn config(&self) -> anyhow::Result<AuctionConfig> {
        let config = self
            .data_loader
            .load_config()
            .context("loading auction config")?;
        config.validate().context("validating auction config")?;
        Ok(config)
    }

    /// Load and validate the rival roster.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the roster is invalid.
    pub fn roster(&self) -> anyhow::Result<RivalRoster> {
        let roster = self
            .data_loader
            .load_roster()
            .context("loading rival roster")?;
        roster.validate().context("validating rival roster")?;
        Ok(roster)
    }

    /// Open an auction for `item` against the invited rivals.
    ///
    /// # Errors
    ///
    /// Returns an error if data cannot be loaded or an invited rival is unknown.
    pub fn open_session(
        &self,
        item: AuctionItem,
        invited: &[RivalId],
        seed: u64,
    ) -> anyhow::Result<AuctionSession> {
        let config = self.config()?;
        let roster = self.roster()?;
        let entries = roster
            .entries_for(invited, &item)
            .with_context(|| format!("inviting rivals to auction {}", item.id))?;
        Ok(AuctionSession::new(item, &entries, &config, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct FixtureLoader {
        roster_json: &'static str,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("fixture: {0}")]
    struct FixtureError(#[from] serde_json::Error);

    impl DataLoader for FixtureLoader {
        type Error = FixtureError;

        fn load_config(&self) -> Result<AuctionConfig, Self::Error> {
            Ok(AuctionConfig::from_json("{}")?)
        }

        fn load_roster(&self) -> Result<RivalRoster, Self::Error> {
            Ok(RivalRoster::from_json(self.roster_json)?)
        }
    }

    #[test]
    fn embedded_house_opens_sessions() {
        let house = AuctionHouse::new(EmbeddedData);
        let roster = house.roster().expect("embedded roster");
        let invited: Vec<RivalId> = roster.ids().take(2).cloned().collect();
        let item = AuctionItem::new("vette", "Stingray", 30_000, 65).with_tags(&["american"]);
        let session = house.open_session(item, &invited, 7).expect("session opens");
        assert_eq!(session.state().active_rivals().len(), 2);
        assert_eq!(session.arena().len(), 2);
        assert_eq!(session.state().opening_price(), 22_500);
    }

    #[test]
    fn unknown_invitee_is_an_error() {
        let house = AuctionHouse::new(FixtureLoader {
            roster_json: r#"{ "sal": { "name": "Sal", "wallet": 9000 } }"#,
        });
        let item = AuctionItem::new("bug", "Beetle", 6_000, 40);
        let err = house
            .open_session(item, &[RivalId::new("ghost")], 1)
            .err()
            .expect("unknown rival rejected");
        assert!(format!("{err:#}").contains("ghost"));
    }

    #[test]
    fn malformed_roster_surfaces_context() {
        let house = AuctionHouse::new(FixtureLoader {
            roster_json: "{ not json",
        });
        let err = house.roster().expect_err("bad json");
        assert!(err.to_string().contains("loading rival roster"));
    }
}
