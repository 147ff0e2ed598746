use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use gearhead_auction::{
    AuctionConfig, AuctionEffect, AuctionHouse, AuctionItem, AuctionResult, AuctionSession,
    BidderId, DataLoader, PlayerAction, PlayerSkills, PlayerWallet, RivalId, RivalRoster,
    TurnOwner, WalletSnapshot,
};
use thiserror::Error;

use crate::logic::invariants::InvariantWatch;
use crate::logic::policy::{BiddingStrategy, PlayerPolicy, PlayerView};

/// Check run against a finished simulation.
pub type Expectation = fn(&SimulationSummary) -> Result<(), String>;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing auction data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Data source for the tester: an optional config file over the embedded defaults.
#[derive(Debug, Clone, Default)]
pub struct TesterData {
    config_path: Option<PathBuf>,
}

impl TesterData {
    #[must_use]
    pub const fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    fn read(path: &Path) -> Result<String, LoaderError> {
        fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl DataLoader for TesterData {
    type Error = LoaderError;

    fn load_config(&self) -> Result<AuctionConfig, Self::Error> {
        match &self.config_path {
            Some(path) => Ok(AuctionConfig::from_json(&Self::read(path)?)?),
            None => Ok(AuctionConfig::load_from_static()),
        }
    }

    fn load_roster(&self) -> Result<RivalRoster, Self::Error> {
        Ok(RivalRoster::load_from_static())
    }
}

/// One automated auction: what is for sale, who shows up and how the player bids.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub item: AuctionItem,
    pub invited: Vec<RivalId>,
    pub strategy: BiddingStrategy,
    pub wallet: WalletSnapshot,
    pub skills: PlayerSkills,
    pub max_rounds: usize,
    pub expectations: Vec<Expectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(item: AuctionItem, invited: &[&str], strategy: BiddingStrategy) -> Self {
        let cash = item.market_value.saturating_mul(2);
        Self {
            item,
            invited: invited.iter().map(|id| RivalId::new(id)).collect(),
            strategy,
            wallet: WalletSnapshot { cash, committed: 0 },
            skills: PlayerSkills::default(),
            max_rounds: 200,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_skills(mut self, skills: PlayerSkills) -> Self {
        self.skills = skills;
        self
    }

    #[must_use]
    pub fn with_wallet(mut self, wallet: WalletSnapshot) -> Self {
        self.wallet = wallet;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }
}

/// One player decision and how the engine took it.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub round: usize,
    pub action: PlayerAction,
    pub policy_name: String,
    pub rationale: Option<String>,
    pub rejection: Option<String>,
}

/// Everything observed while playing one plan with one seed.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: BiddingStrategy,
    pub item_id: String,
    pub market_value: i64,
    pub skills: PlayerSkills,
    pub rounds: usize,
    pub decisions: Vec<DecisionRecord>,
    pub effects: Vec<AuctionEffect>,
    pub result: Option<AuctionResult>,
    pub player_withdrawn: bool,
    pub violations: Vec<String>,
}

impl SimulationSummary {
    fn new(plan: &SimulationPlan, seed: u64) -> Self {
        Self {
            seed,
            strategy: plan.strategy,
            item_id: plan.item.id.clone(),
            market_value: plan.item.market_value,
            skills: plan.skills,
            rounds: 0,
            decisions: Vec::new(),
            effects: Vec::new(),
            result: None,
            player_withdrawn: false,
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn resolved(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn player_won(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|result| result.winner == BidderId::Player)
    }

    #[must_use]
    pub fn rival_drops(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, AuctionEffect::RivalDropped { .. }))
            .count()
    }

    #[must_use]
    pub fn applied_actions(&self, matcher: fn(&PlayerAction) -> bool) -> usize {
        self.decisions
            .iter()
            .filter(|record| record.rejection.is_none() && matcher(&record.action))
            .count()
    }

    fn observe(
        &mut self,
        watch: &mut InvariantWatch,
        session: &AuctionSession,
        effects: &[AuctionEffect],
    ) {
        self.violations.extend(watch.check(session.state(), effects));
        self.effects.extend_from_slice(effects);
    }
}

/// Plays simulation plans against auction sessions opened from tester data.
pub struct AuctionTester {
    house: AuctionHouse<TesterData>,
    verbose: bool,
}

impl AuctionTester {
    #[must_use]
    pub const fn new(data: TesterData, verbose: bool) -> Self {
        Self {
            house: AuctionHouse::new(data),
            verbose,
        }
    }

    #[must_use]
    pub const fn embedded(verbose: bool) -> Self {
        Self::new(TesterData::new(None), verbose)
    }

    /// Load and validate config and roster once, before any plan runs.
    ///
    /// # Errors
    ///
    /// Returns the loader or validation error with context.
    pub fn validate_data(&self) -> Result<()> {
        self.house.config()?;
        self.house.roster()?;
        Ok(())
    }

    /// Open the session a plan would play.
    ///
    /// # Errors
    ///
    /// Returns an error if data cannot be loaded or an invited rival is unknown.
    pub fn open(&self, plan: &SimulationPlan, seed: u64) -> Result<AuctionSession> {
        self.house.open_session(plan.item.clone(), &plan.invited, seed)
    }

    /// Play `plan` to resolution (or `max_rounds`) with `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the rivals refuse a due turn.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let mut session = self.open(plan, seed)?;
        let mut policy = plan.strategy.create_policy(seed);
        let mut watch = InvariantWatch::new(session.state());
        let mut summary = SimulationSummary::new(plan, seed);

        while !session.is_resolved() && summary.rounds < plan.max_rounds {
            summary.rounds += 1;
            if session.state().awaiting() == TurnOwner::Player {
                self.player_turn(&mut session, policy.as_mut(), plan, &mut watch, &mut summary);
            }
            if !session.is_resolved() && session.state().awaiting() == TurnOwner::Rivals {
                let outcome = session
                    .run_rivals(None)
                    .with_context(|| format!("rival turn in round {}", summary.rounds))?;
                summary.observe(&mut watch, &session, &outcome.effects);
            }
        }

        summary.result = session.result().cloned();
        summary.player_withdrawn = session.state().player_withdrawn();
        if self.verbose && !session.is_resolved() {
            println!(
                "  ⚠️  {} still open after {} rounds (seed {seed})",
                plan.item.id.yellow(),
                summary.rounds
            );
        }
        Ok(summary)
    }

    fn player_turn(
        &self,
        session: &mut AuctionSession,
        policy: &mut dyn PlayerPolicy,
        plan: &SimulationPlan,
        watch: &mut InvariantWatch,
        summary: &mut SimulationSummary,
    ) {
        let decision = {
            let view = PlayerView {
                state: session.state(),
                rules: session.engine().rules(),
                funds: plan.wallet.available_funds(),
                skills: plan.skills,
                kick_reduction: session.kick_tires_reduction(),
            };
            policy.decide(&view)
        };
        let outcome = session.act(decision.action, &plan.wallet, plan.skills);
        let rejection = outcome.rejection().map(ToString::to_string);
        if self.verbose
            && let Some(reason) = &rejection
        {
            println!("     ↳ {} {:?} rejected: {reason}", policy.name(), decision.action);
        }
        summary.decisions.push(DecisionRecord {
            round: summary.rounds,
            action: decision.action,
            policy_name: policy.name().to_string(),
            rationale: decision.rationale,
            rejection,
        });
        summary.observe(watch, session, &outcome.effects);

        // A refused action would leave the floor with the player forever.
        if !outcome.is_applied()
            && !session.is_resolved()
            && session.state().awaiting() == TurnOwner::Player
        {
            let fold = session.act(PlayerAction::Withdraw, &plan.wallet, plan.skills);
            summary.decisions.push(DecisionRecord {
                round: summary.rounds,
                action: PlayerAction::Withdraw,
                policy_name: policy.name().to_string(),
                rationale: Some("fallback after rejection".to_string()),
                rejection: fold.rejection().map(ToString::to_string),
            });
            summary.observe(watch, session, &fold.effects);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(strategy: BiddingStrategy) -> SimulationPlan {
        SimulationPlan::new(
            AuctionItem::new("camaro", "'69 Camaro", 24_000, 70).with_tags(&["muscle", "american"]),
            &["lola", "boone"],
            strategy,
        )
    }

    #[test]
    fn steady_plan_resolves_cleanly() {
        let tester = AuctionTester::embedded(false);
        let summary = tester.run_plan(&plan(BiddingStrategy::Steady), 1337).unwrap();
        assert!(summary.resolved());
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert!(!summary.decisions.is_empty());
    }

    #[test]
    fn runs_replay_for_equal_seeds() {
        let tester = AuctionTester::embedded(false);
        let a = tester.run_plan(&plan(BiddingStrategy::Chaos), 99).unwrap();
        let b = tester.run_plan(&plan(BiddingStrategy::Chaos), 99).unwrap();
        assert_eq!(a.effects, b.effects);
        assert_eq!(a.result, b.result);
    }

    #[test]
    fn unknown_rival_fails_to_open() {
        let tester = AuctionTester::embedded(false);
        let mut bad = plan(BiddingStrategy::Steady);
        bad.invited.push(RivalId::new("nobody"));
        assert!(tester.run_plan(&bad, 1).is_err());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let data = TesterData::new(Some(PathBuf::from("/definitely/not/here.json")));
        let err = data.load_config().unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }
}
