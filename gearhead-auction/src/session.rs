//! One auction bundled with everything needed to drive it.
use crate::config::AuctionConfig;
use crate::constants::{LOG_TARGET, RIVAL_ONLY_MAX_TURNS};
use crate::engine::{
    AuctionEngine, PlayerAction, PlayerSkills, PlayerWallet, Rejection, ResolutionOverride,
    TransitionOutcome,
};
use crate::item::AuctionItem;
use crate::pacing::{ScheduledTurn, TicketError, TurnPacer, TurnTicket};
use crate::rival::{AgentRules, RivalArena, RivalEntry, RivalId};
use crate::rng::AuctionRng;
use crate::scheduler::{RivalTurnScheduler, SchedulerStep};
use crate::state::{AuctionResult, AuctionState, TurnMode, TurnOwner};

/// Wraps state, rivals, rules, scheduler, randomness and pacing for one auction.
#[derive(Debug, Clone)]
pub struct AuctionSession {
    engine: AuctionEngine,
    state: AuctionState,
    arena: RivalArena,
    scheduler: RivalTurnScheduler,
    rng: AuctionRng,
    pacer: TurnPacer,
    seed: u64,
}

impl AuctionSession {
    /// Open an auction for `item` with one agent per entry.
    #[must_use]
    pub fn new(
        item: AuctionItem,
        entries: &[RivalEntry],
        config: &AuctionConfig,
        seed: u64,
    ) -> Self {
        let agent_rules = AgentRules::from_config(config);
        let arena = RivalArena::from_entries(entries, item.market_value, &agent_rules);
        let invited: Vec<RivalId> = entries.iter().map(|entry| entry.rival_id.clone()).collect();
        log::debug!(
            target: LOG_TARGET,
            "opening auction for {} ({}) with {} rivals, seed {seed}",
            item.id,
            item.market_value,
            invited.len()
        );
        let state = AuctionState::new(item, &config.rules, invited);
        Self {
            engine: AuctionEngine::new(config.rules.clone()),
            state,
            arena,
            scheduler: RivalTurnScheduler::new(),
            rng: AuctionRng::from_user_seed(seed),
            pacer: TurnPacer::new(config.pacing.clone()),
            seed,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AuctionState {
        &self.state
    }

    #[must_use]
    pub const fn arena(&self) -> &RivalArena {
        &self.arena
    }

    #[must_use]
    pub const fn engine(&self) -> &AuctionEngine {
        &self.engine
    }

    #[must_use]
    pub const fn scheduler(&self) -> &RivalTurnScheduler {
        &self.scheduler
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn result(&self) -> Option<&AuctionResult> {
        self.state.result()
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.state.is_resolved()
    }

    #[must_use]
    pub const fn mode(&self) -> TurnMode {
        self.state.mode()
    }

    /// Budget cut this item's kick-tires inspection would inflict.
    #[must_use]
    pub fn kick_tires_reduction(&self) -> i64 {
        self.state.item().kick_tires_reduction(self.engine.rules())
    }

    /// Apply a player action. Any rival turn left mid-flight is abandoned first.
    pub fn act(
        &mut self,
        action: PlayerAction,
        wallet: &impl PlayerWallet,
        skills: PlayerSkills,
    ) -> TransitionOutcome {
        let outcome = self
            .engine
            .apply(&mut self.state, &mut self.arena, action, wallet, skills);
        if outcome.is_applied() {
            self.scheduler.cancel();
            if self.state.is_resolved() {
                self.pacer.cancel_pending();
            }
        }
        outcome
    }

    /// Run the rivals' response to completion: one turn with the player
    /// present, or turns until resolution once the player has left.
    ///
    /// # Errors
    ///
    /// Rejects when the rivals are not due to act.
    pub fn run_rivals(
        &mut self,
        scripted: Option<&ResolutionOverride>,
    ) -> Result<TransitionOutcome, Rejection> {
        match self.state.mode() {
            TurnMode::PlayerPresent => self.scheduler.run_turn(
                &mut self.state,
                &mut self.arena,
                &self.engine,
                scripted,
                &mut self.rng,
            ),
            TurnMode::RivalOnly => self
                .scheduler
                .run_rival_only(
                    &mut self.state,
                    &mut self.arena,
                    &self.engine,
                    scripted,
                    &mut self.rng,
                    RIVAL_ONLY_MAX_TURNS,
                )
                .map(|run| run.outcome),
        }
    }

    /// Start an incremental rival turn for drivers that pace each rival.
    ///
    /// # Errors
    ///
    /// Rejects when the rivals are not due to act.
    pub fn begin_rival_turn(&mut self) -> Result<(), Rejection> {
        self.scheduler.begin_turn(&self.state, &mut self.rng)
    }

    /// Evaluate the next rival of the turn in progress.
    pub fn step_rival(&mut self, scripted: Option<&ResolutionOverride>) -> SchedulerStep {
        self.scheduler.step(
            &mut self.state,
            &mut self.arena,
            &self.engine,
            scripted,
            &mut self.rng,
        )
    }

    /// Explicitly end the auction through a scripted override.
    pub fn end(&mut self, request: &ResolutionOverride) -> TransitionOutcome {
        let outcome = self.engine.end_auction(&mut self.state, &mut self.arena, request);
        if outcome.is_applied() {
            self.teardown();
        }
        outcome
    }

    /// Schedule the next rival turn, superseding anything still pending.
    ///
    /// Returns `None` when the rivals are not due to act.
    pub fn schedule_rival_turn(&mut self) -> Option<TurnTicket> {
        if self.state.is_resolved() || self.state.awaiting() != TurnOwner::Rivals {
            return None;
        }
        let kind = match self.state.mode() {
            TurnMode::PlayerPresent => ScheduledTurn::RivalResponse,
            TurnMode::RivalOnly => ScheduledTurn::RivalOnly,
        };
        Some(self.pacer.schedule(kind))
    }

    /// Schedule the pause between two rivals of the same turn.
    pub fn schedule_stagger(&mut self) -> TurnTicket {
        self.pacer.schedule(ScheduledTurn::RivalStagger)
    }

    /// Redeem a ticket whose delay has elapsed.
    ///
    /// # Errors
    ///
    /// Returns a `TicketError` when the ticket was superseded or cancelled.
    pub fn claim(&mut self, ticket: TurnTicket) -> Result<(), TicketError> {
        self.pacer.claim(ticket)
    }

    #[must_use]
    pub const fn pacer(&self) -> &TurnPacer {
        &self.pacer
    }

    /// Cancel pending pacing and any rival turn in progress.
    pub fn teardown(&mut self) {
        let pending = self.pacer.cancel_pending();
        let running = self.scheduler.cancel();
        if pending || running {
            log::debug!(target: LOG_TARGET, "auction {} torn down mid-turn", self.state.item().id);
        }
    }

    /// Consume the session, keeping only the final state.
    #[must_use]
    pub fn into_state(self) -> AuctionState {
        self.state
    }
}
