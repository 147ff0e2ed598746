use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::simulation::{AuctionTester, SimulationPlan, SimulationSummary};
use crate::scenarios::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub player_wins: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester<'a> {
    tester: &'a AuctionTester,
    verbose: bool,
}

impl<'a> LogicTester<'a> {
    pub const fn new(tester: &'a AuctionTester, verbose: bool) -> Self {
        Self { tester, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let tally = self.run_simulation_iterations(&scenario.plan, seed, iterations);

        let average_duration = if tally.performance_data.is_empty() {
            Duration::ZERO
        } else {
            tally.performance_data.iter().sum::<Duration>()
                / u32::try_from(tally.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: tally.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: tally.successes,
            player_wins: tally.player_wins,
            failures: tally.failures,
            average_duration,
            performance_data: tally.performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationTally {
        let mut tally = IterationTally::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self.tester.run_plan(plan, iteration_seed) {
                Ok(summary) => summary,
                Err(err) => {
                    tally
                        .failures
                        .push(format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1));
                    continue;
                }
            };

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let context = summarize_decision_path(&summary);
                tally.failures.push(format!(
                    "Iteration {} ({} market {}, strategy {}, seed {}, rounds {}, outcome {}): {} | {}",
                    i + 1,
                    summary.item_id,
                    summary.market_value,
                    summary.strategy,
                    summary.seed,
                    summary.rounds,
                    describe_outcome(&summary),
                    err,
                    context
                ));

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                    println!("     ↳ Seed {} | Decisions: {}", summary.seed, context);
                }
            } else {
                tally.successes += 1;
                if summary.player_won() {
                    tally.player_wins += 1;
                }
                let duration = start_time.elapsed();
                tally.performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) rounds:{} outcome:{}",
                        i + 1,
                        iterations,
                        summary.rounds,
                        describe_outcome(&summary)
                    );
                }
            }
        }

        tally
    }
}

#[derive(Debug, Default)]
struct IterationTally {
    successes: usize,
    player_wins: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation(summary).err())
}

fn describe_outcome(summary: &SimulationSummary) -> String {
    summary.result.as_ref().map_or_else(
        || "unresolved".to_string(),
        |result| format!("{} at {} ({:?})", result.winner, result.price, result.reason),
    )
}

fn summarize_decision_path(summary: &SimulationSummary) -> String {
    if summary.decisions.is_empty() {
        return "no decisions recorded".to_string();
    }

    summary
        .decisions
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            let rationale = entry
                .rationale
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("-");
            let verdict = entry.rejection.as_deref().unwrap_or("applied");
            format!(
                "round {} {}: {:?} [{}] {}",
                entry.round, entry.policy_name, entry.action, rationale, verdict
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
