//! Multi-rival turn scheduling.
//!
//! A rival turn visits every active rival once, in a freshly shuffled order,
//! and applies each decision as soon as it is made so later rivals see the
//! updated price. The scheduler is a small state machine so a paced driver can
//! interleave delays between steps and cancel a turn that is no longer wanted.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::LOG_TARGET;
use crate::engine::{AuctionEngine, Rejection, ResolutionOverride, TransitionOutcome};
use crate::rival::{BidDecision, RivalArena, RivalId};
use crate::rng::AuctionRng;
use crate::state::{AuctionState, TurnMode, TurnOwner};

/// Randomized rival order for one turn. Pure with respect to the session.
#[must_use]
pub fn shuffled_order(active: &[RivalId], rng: &mut impl Rng) -> Vec<RivalId> {
    let mut order = active.to_vec();
    order.shuffle(rng);
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SchedulerPhase {
    #[default]
    Idle,
    /// Next rival to evaluate is `order[index]`.
    Evaluating { index: usize },
    /// Every rival has acted; the turn still needs closing.
    Resolving,
}

/// What a single [`RivalTurnScheduler::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerStep {
    /// No turn in progress.
    Idle,
    /// Rival had withdrawn or already held the high bid.
    Skipped(RivalId),
    Acted {
        rival_id: RivalId,
        decision: BidDecision,
        outcome: TransitionOutcome,
    },
    /// A scripted override ended the auction.
    Forced(TransitionOutcome),
    /// Turn closed; control returns to the player when present.
    Finished(TransitionOutcome),
    /// Auction resolved mid-turn; remaining rivals were not consulted.
    Ended,
}

/// Summary of an unattended rival-only run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RivalOnlyRun {
    pub turns: u32,
    pub outcome: TransitionOutcome,
    /// The turn guard fired before the auction resolved.
    pub exhausted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RivalTurnScheduler {
    phase: SchedulerPhase,
    order: Vec<RivalId>,
}

impl RivalTurnScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, SchedulerPhase::Idle)
    }

    /// Order chosen for the turn in progress.
    #[must_use]
    pub fn order(&self) -> &[RivalId] {
        &self.order
    }

    /// Shuffle the active rivals and start evaluating them.
    ///
    /// # Errors
    ///
    /// Rejects when the auction is resolved or the rivals are not due to act.
    pub fn begin_turn(
        &mut self,
        state: &AuctionState,
        rng: &mut AuctionRng,
    ) -> Result<(), Rejection> {
        if state.is_resolved() {
            return Err(Rejection::AuctionResolved);
        }
        if state.awaiting() != TurnOwner::Rivals {
            return Err(Rejection::NotRivalTurn);
        }
        self.order = shuffled_order(state.active_rivals(), rng.order());
        self.phase = if self.order.is_empty() {
            SchedulerPhase::Resolving
        } else {
            SchedulerPhase::Evaluating { index: 0 }
        };
        log::trace!(target: LOG_TARGET, "rival turn order: {:?}", self.order);
        Ok(())
    }

    /// Advance the turn by one rival, or close it once every rival has acted.
    pub fn step(
        &mut self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        engine: &AuctionEngine,
        scripted: Option<&ResolutionOverride>,
        rng: &mut AuctionRng,
    ) -> SchedulerStep {
        if self.is_idle() {
            return SchedulerStep::Idle;
        }
        if state.is_resolved() {
            self.cancel();
            return SchedulerStep::Ended;
        }
        if let Some(scripted) = scripted.filter(|o| o.is_armed()) {
            let outcome = engine.resolve_rival_decisions(state, arena, &[], Some(scripted));
            if outcome.is_applied() {
                self.cancel();
                return SchedulerStep::Forced(outcome);
            }
            log::debug!(
                target: LOG_TARGET,
                "ignoring scripted override: {:?}",
                outcome.rejection()
            );
        }

        match self.phase {
            SchedulerPhase::Idle => SchedulerStep::Idle,
            SchedulerPhase::Resolving => {
                self.cancel();
                SchedulerStep::Finished(engine.finish_rival_turn(state))
            }
            SchedulerPhase::Evaluating { index } => {
                let Some(rival_id) = self.order.get(index).cloned() else {
                    self.phase = SchedulerPhase::Resolving;
                    return self.step(state, arena, engine, None, rng);
                };
                self.phase = if index + 1 < self.order.len() {
                    SchedulerPhase::Evaluating { index: index + 1 }
                } else {
                    SchedulerPhase::Resolving
                };
                if !state.is_active(&rival_id) || state.rival_leads(&rival_id) {
                    return SchedulerStep::Skipped(rival_id);
                }
                let Some(agent) = arena.get(&rival_id) else {
                    return SchedulerStep::Skipped(rival_id);
                };
                let decision = agent.decide_bid_with(
                    state.current_price(),
                    !state.has_any_bids(),
                    rng.decision(),
                );
                log::trace!(
                    target: LOG_TARGET,
                    "{rival_id} at {} (patience {}, budget {}): {decision:?}",
                    state.current_price(),
                    agent.patience(),
                    agent.budget()
                );
                let outcome = engine.resolve_rival_decisions(
                    state,
                    arena,
                    &[(rival_id.clone(), decision)],
                    None,
                );
                SchedulerStep::Acted {
                    rival_id,
                    decision,
                    outcome,
                }
            }
        }
    }

    /// Run one complete rival turn and return every effect it produced.
    ///
    /// # Errors
    ///
    /// Rejects when the turn cannot begin.
    pub fn run_turn(
        &mut self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        engine: &AuctionEngine,
        scripted: Option<&ResolutionOverride>,
        rng: &mut AuctionRng,
    ) -> Result<TransitionOutcome, Rejection> {
        self.begin_turn(state, rng)?;
        let mut combined = TransitionOutcome::applied(crate::effects::EffectList::new());
        loop {
            match self.step(state, arena, engine, scripted, rng) {
                SchedulerStep::Skipped(_) => {}
                SchedulerStep::Acted { outcome, .. } => combined.absorb(outcome),
                SchedulerStep::Forced(outcome) | SchedulerStep::Finished(outcome) => {
                    combined.absorb(outcome);
                    break;
                }
                SchedulerStep::Ended | SchedulerStep::Idle => break,
            }
        }
        Ok(combined)
    }

    /// Keep running rival turns until the auction resolves or `max_turns` is hit.
    ///
    /// # Errors
    ///
    /// Rejects unless the player has withdrawn and the rivals are due to act.
    pub fn run_rival_only(
        &mut self,
        state: &mut AuctionState,
        arena: &mut RivalArena,
        engine: &AuctionEngine,
        scripted: Option<&ResolutionOverride>,
        rng: &mut AuctionRng,
        max_turns: u32,
    ) -> Result<RivalOnlyRun, Rejection> {
        if state.is_resolved() {
            return Err(Rejection::AuctionResolved);
        }
        if state.mode() != TurnMode::RivalOnly {
            return Err(Rejection::NotRivalTurn);
        }
        let mut combined = TransitionOutcome::applied(crate::effects::EffectList::new());
        let mut turns = 0;
        while !state.is_resolved() && turns < max_turns {
            combined.absorb(self.run_turn(state, arena, engine, scripted, rng)?);
            turns += 1;
        }
        let exhausted = !state.is_resolved();
        if exhausted {
            log::warn!(
                target: LOG_TARGET,
                "rival-only bidding for {} still open after {turns} turns",
                state.item().id
            );
        }
        Ok(RivalOnlyRun {
            turns,
            outcome: combined,
            exhausted,
        })
    }

    /// Abandon the turn in progress. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = !self.is_idle();
        self.phase = SchedulerPhase::Idle;
        self.order.clear();
        was_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuctionRules;
    use crate::effects::AuctionEffect;
    use crate::item::AuctionItem;
    use crate::rival::{AgentRules, RivalAgent, RivalMood};
    use crate::state::BidderId;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn ids(raw: &[&str]) -> Vec<RivalId> {
        raw.iter().map(|id| RivalId::new(id)).collect()
    }

    fn setup(rivals: &[(&str, i32, i64)]) -> (AuctionEngine, AuctionState, RivalArena) {
        let rules = AuctionRules::default();
        let item = AuctionItem::new("roadster", "Roadster", 10_000, 50);
        let state = AuctionState::new(
            item,
            &rules,
            rivals.iter().map(|(id, _, _)| RivalId::new(id)).collect(),
        );
        let arena = rivals
            .iter()
            .map(|(id, patience, budget)| {
                RivalAgent::with_state(
                    RivalId::new(id),
                    1.0,
                    RivalMood::Desperate,
                    *patience,
                    *budget,
                    AgentRules::default(),
                )
            })
            .collect();
        (AuctionEngine::new(rules), state, arena)
    }

    #[test]
    fn shuffle_is_a_permutation_and_seed_stable() {
        let active = ids(&["a", "b", "c", "d", "e"]);
        let first = shuffled_order(&active, &mut SmallRng::seed_from_u64(9));
        let again = shuffled_order(&active, &mut SmallRng::seed_from_u64(9));
        assert_eq!(first, again);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, active);
    }

    #[test]
    fn begin_turn_requires_rival_turn() {
        let (_, state, _) = setup(&[("a", 60, 20_000)]);
        let mut scheduler = RivalTurnScheduler::new();
        let mut rng = AuctionRng::from_user_seed(1);
        assert_eq!(
            scheduler.begin_turn(&state, &mut rng),
            Err(Rejection::NotRivalTurn)
        );
        assert!(scheduler.is_idle());
    }

    #[test]
    fn steps_walk_through_phases_back_to_idle() {
        let (engine, mut state, mut arena) = setup(&[("a", 90, 30_000), ("b", 90, 30_000)]);
        let mut rng = AuctionRng::from_user_seed(7);
        assert!(engine.bid(&mut state, &mut arena, &100_000).is_applied());

        let mut scheduler = RivalTurnScheduler::new();
        scheduler.begin_turn(&state, &mut rng).expect("rival turn");
        assert_eq!(scheduler.phase(), SchedulerPhase::Evaluating { index: 0 });
        let mut seen = 0;
        loop {
            match scheduler.step(&mut state, &mut arena, &engine, None, &mut rng) {
                SchedulerStep::Acted { .. } | SchedulerStep::Skipped(_) => seen += 1,
                SchedulerStep::Finished(outcome) => {
                    assert!(outcome.is_applied());
                    break;
                }
                other => panic!("unexpected step {other:?}"),
            }
        }
        assert_eq!(seen, 2);
        assert!(scheduler.is_idle());
        assert_eq!(state.awaiting(), TurnOwner::Player);
    }

    #[test]
    fn later_rivals_see_updated_price() {
        let (engine, mut state, mut arena) = setup(&[("a", 90, 30_000), ("b", 90, 30_000)]);
        let mut rng = AuctionRng::from_user_seed(11);
        assert!(engine.bid(&mut state, &mut arena, &100_000).is_applied());
        let mut scheduler = RivalTurnScheduler::new();
        let outcome = scheduler
            .run_turn(&mut state, &mut arena, &engine, None, &mut rng)
            .expect("turn runs");
        let prices: Vec<i64> = outcome
            .effects
            .iter()
            .filter_map(|effect| match effect {
                AuctionEffect::BidRecorded { price, .. } => Some(*price),
                _ => None,
            })
            .collect();
        assert!(prices.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(!state.player_leads() || prices.is_empty());
    }

    #[test]
    fn cancel_returns_to_idle() {
        let (engine, mut state, mut arena) = setup(&[("a", 90, 30_000), ("b", 90, 30_000)]);
        let mut rng = AuctionRng::from_user_seed(3);
        assert!(engine.bid(&mut state, &mut arena, &100_000).is_applied());
        let mut scheduler = RivalTurnScheduler::new();
        scheduler.begin_turn(&state, &mut rng).expect("rival turn");
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
        assert_eq!(
            scheduler.step(&mut state, &mut arena, &engine, None, &mut rng),
            SchedulerStep::Idle
        );
    }

    #[test]
    fn rival_only_run_always_resolves_under_ceiling() {
        for seed in 0..20 {
            let (engine, mut state, mut arena) =
                setup(&[("a", 100, 50_000), ("b", 100, 50_000), ("c", 100, 50_000)]);
            let mut rng = AuctionRng::from_user_seed(seed);
            assert!(engine.withdraw(&mut state).is_applied());
            let mut scheduler = RivalTurnScheduler::new();
            let run = scheduler
                .run_rival_only(&mut state, &mut arena, &engine, None, &mut rng, 200)
                .expect("rival-only run");
            assert!(!run.exhausted, "seed {seed} did not resolve");
            let result = state.result().expect("resolved");
            assert!(matches!(result.winner, BidderId::Rival(_)));
            assert!(result.price <= state.rival_only_ceiling());
        }
    }

    #[test]
    fn rival_only_requires_withdrawn_player() {
        let (engine, mut state, mut arena) = setup(&[("a", 90, 30_000), ("b", 90, 30_000)]);
        let mut rng = AuctionRng::from_user_seed(5);
        let mut scheduler = RivalTurnScheduler::new();
        assert_eq!(
            scheduler.run_rival_only(&mut state, &mut arena, &engine, None, &mut rng, 10),
            Err(Rejection::NotRivalTurn)
        );
    }

    #[test]
    fn armed_override_short_circuits_turn() {
        let (engine, mut state, mut arena) = setup(&[("a", 90, 30_000), ("b", 90, 30_000)]);
        let mut rng = AuctionRng::from_user_seed(5);
        assert!(engine.bid(&mut state, &mut arena, &100_000).is_applied());
        let scripted = ResolutionOverride::armed(BidderId::Rival(RivalId::new("b")));
        let mut scheduler = RivalTurnScheduler::new();
        let outcome = scheduler
            .run_turn(&mut state, &mut arena, &engine, Some(&scripted), &mut rng)
            .expect("turn runs");
        assert!(outcome.ended());
        assert_eq!(
            state.result().map(|r| r.winner.clone()),
            Some(BidderId::Rival(RivalId::new("b")))
        );
    }
}
