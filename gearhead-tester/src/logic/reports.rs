use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use gearhead_auction::{AuctionEffect, BidKind, Speaker};
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    if results.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len() as f64) * 100.0;
    rate
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Auction Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "================================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenario runs: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful, player won {}",
            result.successful_iterations, result.iterations_run, result.player_wins
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Gearhead Auction Test Results\n")?;
    writeln!(out, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenario runs**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(out, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Player wins**: {}", result.player_wins)?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One-line rendering of an effect for paced playback.
#[must_use]
pub fn describe_effect(effect: &AuctionEffect) -> String {
    match effect {
        AuctionEffect::BidRecorded {
            bidder,
            price,
            kind,
        } => {
            let verb = match kind {
                BidKind::Opening => "opens at",
                BidKind::Standard => "bids",
                BidKind::Power => "power-bids",
            };
            format!("💰 {bidder} {verb} ${price}")
        }
        AuctionEffect::RivalDropped { rival_id, reason } => {
            format!("🚪 {rival_id} drops out ({})", reason.key())
        }
        AuctionEffect::AuctionEnded {
            winner,
            price,
            reason,
        } => format!("🔨 Sold to {winner} for ${price} ({reason:?})"),
        AuctionEffect::BarkRequested { speaker, trigger } => {
            let who = match speaker {
                Speaker::Player => "player".to_string(),
                Speaker::Rival(id) => id.to_string(),
                Speaker::Auctioneer => "auctioneer".to_string(),
            };
            format!("💬 {who}: {trigger:?}")
        }
        AuctionEffect::TacticApplied { tactic } => format!("🎯 tactic: {tactic}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearhead_auction::{BidderId, RivalId, WithdrawReason};

    fn sample(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "smoke".to_string(),
            seed: 1337,
            passed,
            iterations_run: 2,
            successful_iterations: usize::from(passed) * 2,
            player_wins: 1,
            failures: if passed {
                Vec::new()
            } else {
                vec!["Iteration 1: boom".to_string()]
            },
            average_duration: Duration::from_millis(3),
            performance_data: vec![Duration::from_millis(3)],
        }
    }

    #[test]
    fn markdown_lists_failures() {
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &[sample(true), sample(false)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# Gearhead Auction Test Results"));
        assert!(text.contains("Success rate**: 50.0%"));
        assert!(text.contains("  - Iteration 1: boom"));
    }

    #[test]
    fn console_report_includes_performance() {
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &[sample(true)], Duration::from_millis(9)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Performance Summary"));
        assert!(text.contains("smoke"));
    }

    #[test]
    fn effects_render_readably() {
        let bid = AuctionEffect::BidRecorded {
            bidder: BidderId::Rival(RivalId::new("lola")),
            price: 9_000,
            kind: BidKind::Power,
        };
        assert_eq!(describe_effect(&bid), "💰 lola power-bids $9000");
        let drop = AuctionEffect::RivalDropped {
            rival_id: RivalId::new("sal"),
            reason: WithdrawReason::BudgetExceeded,
        };
        assert!(describe_effect(&drop).contains("sal drops out"));
    }
}
