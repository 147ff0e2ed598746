use std::collections::BTreeSet;

use gearhead_auction::{AuctionEffect, AuctionState, BidderId, RivalId};

/// Cross-transition checks run after every outcome of a simulated auction.
#[derive(Debug, Clone)]
pub struct InvariantWatch {
    last_price: i64,
    withdrawn: BTreeSet<RivalId>,
    ended: usize,
}

impl InvariantWatch {
    #[must_use]
    pub fn new(state: &AuctionState) -> Self {
        Self {
            last_price: state.current_price(),
            withdrawn: state.withdrawn_rivals().iter().cloned().collect(),
            ended: 0,
        }
    }

    /// Check the state after an outcome and return any violations found.
    pub fn check(&mut self, state: &AuctionState, effects: &[AuctionEffect]) -> Vec<String> {
        let mut violations = Vec::new();

        if state.current_price() < self.last_price {
            violations.push(format!(
                "price went backwards: {} -> {}",
                self.last_price,
                state.current_price()
            ));
        }
        self.last_price = self.last_price.max(state.current_price());

        self.withdrawn.extend(state.withdrawn_rivals().iter().cloned());
        for id in &self.withdrawn {
            if state.is_active(id) {
                violations.push(format!("{id} re-entered after withdrawing"));
            }
        }

        match state.leading_bidder() {
            Some(BidderId::Rival(id)) if !state.is_active(id) => {
                violations.push(format!("withdrawn rival {id} holds the high bid"));
            }
            Some(BidderId::Player) if state.player_withdrawn() => {
                violations.push("withdrawn player holds the high bid".to_string());
            }
            _ => {}
        }

        let mut previous = 0;
        for effect in effects {
            if let AuctionEffect::BidRecorded { price, .. } = effect {
                if *price < previous {
                    violations.push(format!("bid {price} recorded after {previous}"));
                }
                previous = *price;
            }
        }

        self.ended += effects.iter().filter(|effect| effect.is_terminal()).count();
        if self.ended > 1 {
            violations.push(format!("auction ended {} times", self.ended));
        }
        if state.is_resolved() != (self.ended == 1) {
            violations.push("resolution does not match end effects".to_string());
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearhead_auction::{AuctionItem, AuctionRules, BidKind, EndReason};

    fn state() -> AuctionState {
        AuctionState::new(
            AuctionItem::new("lot", "Lot", 10_000, 50),
            &AuctionRules::default(),
            vec![RivalId::new("a"), RivalId::new("b")],
        )
    }

    #[test]
    fn quiet_state_has_no_violations() {
        let state = state();
        let mut watch = InvariantWatch::new(&state);
        assert!(watch.check(&state, &[]).is_empty());
    }

    #[test]
    fn flags_out_of_order_bids_and_phantom_endings() {
        let state = state();
        let mut watch = InvariantWatch::new(&state);
        let effects = [
            AuctionEffect::BidRecorded {
                bidder: BidderId::Player,
                price: 9_000,
                kind: BidKind::Standard,
            },
            AuctionEffect::BidRecorded {
                bidder: BidderId::Rival(RivalId::new("a")),
                price: 8_000,
                kind: BidKind::Standard,
            },
            AuctionEffect::AuctionEnded {
                winner: BidderId::Player,
                price: 9_000,
                reason: EndReason::AllRivalsDropped,
            },
        ];
        let violations = watch.check(&state, &effects);
        assert!(violations.iter().any(|v| v.contains("recorded after")));
        assert!(violations.iter().any(|v| v.contains("resolution")));
    }
}
