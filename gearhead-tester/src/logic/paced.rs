use anyhow::{Context, Result};
use gearhead_auction::{
    AuctionEffect, AuctionResult, AuctionSession, PlayerAction, PlayerWallet, SchedulerStep,
    TurnOwner,
};
use std::io::Write;
use std::time::Duration;

use crate::logic::policy::PlayerView;
use crate::logic::reports::describe_effect;
use crate::logic::simulation::{AuctionTester, SimulationPlan};

const MAX_PACE_SCALE: f64 = 100.0;

/// What a paced playback printed and how it ended.
#[derive(Debug, Clone, Default)]
pub struct PacedRun {
    pub rival_turns: usize,
    pub lines: usize,
    pub result: Option<AuctionResult>,
}

/// Scale a configured delay; zero or invalid scales disable waiting.
#[must_use]
pub fn scaled_delay(delay_ms: u64, scale: f64) -> Duration {
    if !scale.is_finite() || scale <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis(delay_ms).mul_f64(scale.min(MAX_PACE_SCALE))
}

struct Narrator<'a> {
    out: &'a mut dyn Write,
    lines: usize,
}

impl Narrator<'_> {
    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        self.lines += 1;
        Ok(())
    }

    fn effects(&mut self, effects: &[AuctionEffect]) -> Result<()> {
        for effect in effects {
            self.line(&format!("   {}", describe_effect(effect)))?;
        }
        Ok(())
    }
}

/// Play `plan` with the session's pacing delays, narrating every effect.
///
/// # Errors
///
/// Returns an error if the session cannot be opened, output fails, or a
/// scheduled turn cannot be claimed.
pub async fn play_paced(
    tester: &AuctionTester,
    plan: &SimulationPlan,
    seed: u64,
    scale: f64,
    out: &mut dyn Write,
) -> Result<PacedRun> {
    let mut session = tester.open(plan, seed)?;
    let mut policy = plan.strategy.create_policy(seed);
    let mut narrator = Narrator { out, lines: 0 };
    let mut run = PacedRun::default();
    let mut rounds = 0;

    narrator.line(&format!(
        "🚗 {} (market ${}) opens at ${}",
        session.state().item().name,
        session.state().item().market_value,
        session.state().opening_price()
    ))?;

    while !session.is_resolved() && rounds < plan.max_rounds {
        rounds += 1;
        if session.state().awaiting() == TurnOwner::Player {
            let decision = policy.decide(&PlayerView {
                state: session.state(),
                rules: session.engine().rules(),
                funds: plan.wallet.available_funds(),
                skills: plan.skills,
                kick_reduction: session.kick_tires_reduction(),
            });
            narrator.line(&format!("🙋 {} plays {:?}", policy.name(), decision.action))?;
            let outcome = session.act(decision.action, &plan.wallet, plan.skills);
            narrator.effects(&outcome.effects)?;
            if let Some(rejection) = outcome.rejection() {
                narrator.line(&format!("   ⛔ {rejection}"))?;
                if session.state().awaiting() == TurnOwner::Player {
                    let fold = session.act(PlayerAction::Withdraw, &plan.wallet, plan.skills);
                    narrator.effects(&fold.effects)?;
                }
            }
        }

        if let Some(ticket) = session.schedule_rival_turn() {
            tokio::time::sleep(scaled_delay(ticket.delay_ms, scale)).await;
            session.claim(ticket).context("claiming rival turn")?;
            session.begin_rival_turn().context("starting rival turn")?;
            run.rival_turns += 1;
            play_rival_turn(&mut session, &mut narrator, scale).await?;
        }
    }

    run.lines = narrator.lines;
    run.result = session.result().cloned();
    if run.result.is_none() {
        session.teardown();
    }
    Ok(run)
}

async fn play_rival_turn(
    session: &mut AuctionSession,
    narrator: &mut Narrator<'_>,
    scale: f64,
) -> Result<()> {
    loop {
        match session.step_rival(None) {
            SchedulerStep::Skipped(rival_id) => {
                log::trace!("{rival_id} sits this one out");
            }
            SchedulerStep::Acted {
                rival_id, outcome, ..
            } => {
                narrator.line(&format!("🤔 {rival_id} considers the price"))?;
                narrator.effects(&outcome.effects)?;
                let stagger = session.schedule_stagger();
                tokio::time::sleep(scaled_delay(stagger.delay_ms, scale)).await;
                session.claim(stagger).context("claiming stagger")?;
            }
            SchedulerStep::Forced(outcome) | SchedulerStep::Finished(outcome) => {
                narrator.effects(&outcome.effects)?;
                return Ok(());
            }
            SchedulerStep::Ended | SchedulerStep::Idle => return Ok(()),
        }
    }
}
