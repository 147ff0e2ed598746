pub mod invariants;
pub mod paced;
pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use paced::play_paced;
pub use policy::BiddingStrategy;
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use simulation::{AuctionTester, SimulationPlan, SimulationSummary, TesterData};
pub use tester::{LogicTester, ScenarioResult};
