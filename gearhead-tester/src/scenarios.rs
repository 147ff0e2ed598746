use gearhead_auction::{AuctionItem, PlayerAction, PlayerSkills, WalletSnapshot};

use crate::logic::{BiddingStrategy, SimulationPlan, SimulationSummary};

const ALL_RIVALS: [&str; 6] = ["dutch", "lola", "sal", "kenji", "marguerite", "boone"];

/// A named simulation plan the CLI can run.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    fn new(name: &str, description: &str, plan: SimulationPlan) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            plan,
        }
    }
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Steady bidder against two rivals on a muscle car"),
        ("tactician", "Kick-tires and stall before bidding on a European classic"),
        ("power-play", "Power bids against deep-pocketed collectors"),
        ("fold-early", "Lowball opener leaves the rivals to settle it"),
        ("broke-bidder", "Player cannot afford the opening and walks"),
        ("random-walk", "Seeded random actions against the full roster"),
        ("crowded-room", "Steady bidder against every rival on the roster"),
    ]
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let description = list_scenarios()
        .into_iter()
        .find_map(|(key, description)| (key == name).then_some(description))?;
    let plan = match name {
        "smoke" => SimulationPlan::new(camaro(), &["lola", "boone"], BiddingStrategy::Steady)
            .with_expectation(resolved)
            .with_expectation(no_violations),
        "tactician" => SimulationPlan::new(
            AuctionItem::new("porsche-911", "'73 911 Carrera", 42_000, 82)
                .with_tags(&["classic", "european"]),
            &["dutch", "kenji", "marguerite"],
            BiddingStrategy::Tactician,
        )
        .with_skills(PlayerSkills { eye: 3, tongue: 3 })
        .with_expectation(resolved)
        .with_expectation(no_violations)
        .with_expectation(kicked_tires_within_eye),
        "power-play" => SimulationPlan::new(
            AuctionItem::new("e-type", "Jaguar E-Type", 55_000, 88)
                .with_tags(&["classic", "european", "concours"]),
            &["marguerite", "lola"],
            BiddingStrategy::Aggressive,
        )
        .with_expectation(resolved)
        .with_expectation(no_violations),
        "fold-early" => SimulationPlan::new(
            AuctionItem::new("f100", "'79 F-100", 12_000, 40).with_tags(&["truck", "american"]),
            &["sal", "boone", "kenji"],
            BiddingStrategy::Lowball,
        )
        .with_expectation(resolved)
        .with_expectation(no_violations)
        .with_expectation(walkaway_goes_to_rival),
        "broke-bidder" => SimulationPlan::new(camaro(), &["lola", "boone"], BiddingStrategy::Steady)
            .with_wallet(WalletSnapshot {
                cash: 5_000,
                committed: 1_000,
            })
            .with_expectation(resolved)
            .with_expectation(no_violations)
            .with_expectation(walkaway_goes_to_rival),
        "random-walk" => SimulationPlan::new(
            AuctionItem::new("rx7", "FD RX-7", 30_000, 64).with_tags(&["jdm", "rotary", "turbo"]),
            &ALL_RIVALS,
            BiddingStrategy::Chaos,
        )
        .with_skills(PlayerSkills { eye: 2, tongue: 2 })
        .with_expectation(resolved)
        .with_expectation(no_violations),
        "crowded-room" => SimulationPlan::new(camaro(), &ALL_RIVALS, BiddingStrategy::Steady)
            .with_expectation(resolved)
            .with_expectation(no_violations)
            .with_expectation(losers_dropped),
        _ => return None,
    };
    Some(TestScenario::new(name, description, plan))
}

fn camaro() -> AuctionItem {
    AuctionItem::new("camaro", "'69 Camaro SS", 24_000, 70).with_tags(&["muscle", "v8", "american"])
}

fn resolved(summary: &SimulationSummary) -> Result<(), String> {
    if summary.resolved() {
        Ok(())
    } else {
        Err(format!("auction still open after {} rounds", summary.rounds))
    }
}

fn no_violations(summary: &SimulationSummary) -> Result<(), String> {
    match summary.violations.first() {
        None => Ok(()),
        Some(first) => Err(format!(
            "{} invariant violation(s), first: {first}",
            summary.violations.len()
        )),
    }
}

fn kicked_tires_within_eye(summary: &SimulationSummary) -> Result<(), String> {
    let kicks = summary.applied_actions(|action| matches!(action, PlayerAction::KickTires { .. }));
    let eye = usize::from(summary.skills.eye);
    if (1..=eye).contains(&kicks) {
        Ok(())
    } else {
        Err(format!("expected 1..={eye} kick-tires, saw {kicks}"))
    }
}

fn walkaway_goes_to_rival(summary: &SimulationSummary) -> Result<(), String> {
    if summary.player_withdrawn && summary.player_won() {
        Err("player won after walking away".to_string())
    } else {
        Ok(())
    }
}

fn losers_dropped(summary: &SimulationSummary) -> Result<(), String> {
    let drops = summary.rival_drops();
    let expected = if summary.player_won() {
        ALL_RIVALS.len()
    } else {
        ALL_RIVALS.len() - 1
    };
    if drops >= expected {
        Ok(())
    } else {
        Err(format!("only {drops} of {expected} losing rivals dropped"))
    }
}
