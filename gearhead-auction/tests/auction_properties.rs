use gearhead_auction::{
    AuctionConfig, AuctionEffect, AuctionItem, AuctionSession, BidderId, PacingConfig,
    PlayerAction, PlayerSkills, RivalEntry, RivalId, RivalMood, TurnOwner, WalletSnapshot,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

const SEEDS: u64 = 150;
const MAX_ROUNDS: usize = 120;

const MOODS: [RivalMood; 4] = [
    RivalMood::Desperate,
    RivalMood::Cautious,
    RivalMood::Confident,
    RivalMood::Normal,
];

fn random_session(seed: u64, rng: &mut SmallRng) -> AuctionSession {
    let market = rng.gen_range(4_000..40_000_i64);
    let item = AuctionItem::new("lot", "Lot", market, rng.gen_range(0..=100));
    let rivals = rng.gen_range(1..=4);
    let entries: Vec<RivalEntry> = (0..rivals)
        .map(|idx| RivalEntry {
            rival_id: RivalId::new(&format!("r{idx}")),
            interest: rng.gen_range(0.0..=1.0),
            mood: MOODS[rng.gen_range(0..MOODS.len())],
            wallet: rng.gen_range(market / 2..market * 2),
        })
        .collect();
    let config = AuctionConfig {
        pacing: PacingConfig::instant(),
        ..AuctionConfig::default()
    };
    AuctionSession::new(item, &entries, &config, seed)
}

fn random_action(rng: &mut SmallRng, kick: i64) -> PlayerAction {
    match rng.gen_range(0..10) {
        0..=4 => PlayerAction::Bid,
        5 => PlayerAction::PowerBid,
        6 => PlayerAction::KickTires {
            budget_reduction: kick,
        },
        7 | 8 => PlayerAction::Stall,
        _ => PlayerAction::Withdraw,
    }
}

/// Tracks cross-transition invariants for one session.
struct Watch {
    last_price: i64,
    withdrawn: BTreeSet<RivalId>,
    agents: BTreeMap<RivalId, (i32, i64)>,
}

impl Watch {
    fn new(session: &AuctionSession) -> Self {
        Self {
            last_price: session.state().current_price(),
            withdrawn: BTreeSet::new(),
            agents: agent_snapshot(session),
        }
    }

    fn check(&mut self, session: &AuctionSession, effects: &[AuctionEffect]) {
        let state = session.state();
        assert!(
            state.current_price() >= self.last_price,
            "price went backwards: {} -> {}",
            self.last_price,
            state.current_price()
        );
        self.last_price = state.current_price();

        for id in state.withdrawn_rivals() {
            self.withdrawn.insert(id.clone());
        }
        for id in &self.withdrawn {
            assert!(!state.is_active(id), "{id} came back after withdrawing");
        }

        match state.leading_bidder() {
            Some(BidderId::Rival(id)) => assert!(state.is_active(id), "withdrawn leader {id}"),
            Some(BidderId::Player) => assert!(!state.player_withdrawn()),
            None => {}
        }

        let mut price = 0;
        for effect in effects {
            if let AuctionEffect::BidRecorded { price: bid, .. } = effect {
                assert!(*bid >= price, "bids out of order in one outcome");
                price = *bid;
            }
        }
        let agents = agent_snapshot(session);
        for (id, &(patience, budget)) in &agents {
            let Some(&(was_patience, was_budget)) = self.agents.get(id) else {
                panic!("{id} appeared mid-auction");
            };
            assert!(patience <= was_patience, "{id} patience rose: {was_patience} -> {patience}");
            assert!(budget <= was_budget, "{id} budget rose: {was_budget} -> {budget}");
        }
        self.agents = agents;

        let ends = effects.iter().filter(|effect| effect.is_terminal()).count();
        assert!(ends <= 1, "auction ended twice");
        assert!(state.bid_history().count() <= 10);
    }
}

fn agent_snapshot(session: &AuctionSession) -> BTreeMap<RivalId, (i32, i64)> {
    let state = session.state();
    state
        .active_rivals()
        .iter()
        .chain(state.withdrawn_rivals())
        .filter_map(|id| {
            session
                .arena()
                .get(id)
                .map(|agent| (id.clone(), (agent.patience(), agent.budget())))
        })
        .collect()
}

#[test]
fn random_action_sequences_preserve_invariants() {
    for seed in 0..SEEDS {
        let mut rng = SmallRng::seed_from_u64(seed ^ 0x5EED);
        let mut session = random_session(seed, &mut rng);
        let wallet = WalletSnapshot {
            cash: session.state().item().market_value * 2,
            committed: rng.gen_range(0..2_000),
        };
        let skills = PlayerSkills {
            eye: rng.gen_range(0..=4),
            tongue: rng.gen_range(0..=4),
        };
        let kick = session.kick_tires_reduction();
        let mut watch = Watch::new(&session);

        let mut rounds = 0;
        while !session.is_resolved() && rounds < MAX_ROUNDS {
            if session.state().awaiting() == TurnOwner::Player {
                let action = if rounds + 10 >= MAX_ROUNDS {
                    PlayerAction::Withdraw
                } else {
                    random_action(&mut rng, kick)
                };
                let outcome = session.act(action, &wallet, skills);
                if !outcome.is_applied() {
                    assert!(outcome.effects.is_empty());
                }
                watch.check(&session, &outcome.effects);
                // A rejected bid leaves the player stuck; walk away instead.
                if !outcome.is_applied() && session.state().awaiting() == TurnOwner::Player {
                    let fold = session.act(PlayerAction::Withdraw, &wallet, skills);
                    assert!(fold.is_applied(), "seed {seed}: {:?}", fold.rejection());
                    watch.check(&session, &fold.effects);
                }
            }
            if !session.is_resolved() && session.state().awaiting() == TurnOwner::Rivals {
                let outcome = session.run_rivals(None).expect("rivals due");
                watch.check(&session, &outcome.effects);
            }
            rounds += 1;
        }

        assert!(session.is_resolved(), "seed {seed} never resolved");
        let frozen = session.state().clone();
        for action in [PlayerAction::Bid, PlayerAction::Stall, PlayerAction::Withdraw] {
            let outcome = session.act(action, &wallet, skills);
            assert!(!outcome.is_applied());
            assert!(outcome.effects.is_empty());
        }
        assert!(session.run_rivals(None).is_err());
        assert_eq!(session.state(), &frozen, "seed {seed} mutated after resolution");
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let play = |seed: u64| {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut session = random_session(seed, &mut rng);
        let wallet = session.state().item().market_value * 3;
        let mut log = Vec::new();
        let mut rounds = 0;
        while !session.is_resolved() && rounds < MAX_ROUNDS {
            let outcome = session.act(PlayerAction::Bid, &wallet, PlayerSkills::default());
            log.extend(outcome.effects);
            if session.state().awaiting() == TurnOwner::Player && !session.is_resolved() {
                let fold = session.act(PlayerAction::Withdraw, &wallet, PlayerSkills::default());
                log.extend(fold.effects);
            }
            if !session.is_resolved()
                && let Ok(outcome) = session.run_rivals(None)
            {
                log.extend(outcome.effects);
            }
            rounds += 1;
        }
        (session.into_state(), log)
    };
    for seed in [1, 42, 0xBEEF] {
        assert_eq!(play(seed), play(seed));
    }
}
