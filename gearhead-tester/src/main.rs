mod logic;
mod scenarios;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{
    AuctionTester, LogicTester, SeedInfo, TesterData, play_paced, resolve_seed_inputs,
};
use scenarios::{get_scenario, list_scenarios};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "gearhead-tester", version = "0.1.0")]
#[command(about = "Automated QA for the Gearhead auction engine: seeded bidding simulations")]
struct Args {
    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Auction config JSON to use instead of the embedded defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Narrate one run per scenario and seed with the configured rival delays
    #[arg(long)]
    paced: bool,

    /// Multiplier applied to pacing delays (0 plays instantly)
    #[arg(long, default_value_t = 1.0)]
    pace_scale: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let pace_scale = validate_pace_scale(&args)?;
    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();

    let tester = match args.config.clone() {
        Some(path) => AuctionTester::new(TesterData::new(Some(path)), args.verbose),
        None => AuctionTester::embedded(args.verbose),
    };
    tester.validate_data()?;

    if args.paced {
        run_paced_scenarios(&scenarios, &seed_infos, &tester, pace_scale).await?;
    }

    let all_results = run_logic_scenarios(&args, &scenarios, &seeds, &tester);

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🔨 Gearhead Auction Tester".bright_cyan().bold());
    println!("{}", "==========================".cyan());
}

fn validate_pace_scale(args: &Args) -> Result<f64> {
    if !args.pace_scale.is_finite() || args.pace_scale < 0.0 {
        bail!("--pace-scale must be a non-negative number, got {}", args.pace_scale);
    }
    Ok(args.pace_scale)
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    tester: &AuctionTester,
) -> Vec<logic::ScenarioResult> {
    println!("{}", "🧠 Running Auction Simulations".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(tester, args.verbose);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            if args.verbose {
                println!("📋 {}: {}", scenario.name.bright_white(), scenario.description);
            }
            results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

async fn run_paced_scenarios(
    scenarios: &[String],
    seed_infos: &[SeedInfo],
    tester: &AuctionTester,
    pace_scale: f64,
) -> Result<()> {
    println!("{}", "🎙️  Paced Playback".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());

    let mut out = stdout();
    for scenario_name in scenarios {
        let Some(scenario) = get_scenario(scenario_name) else {
            continue;
        };
        for seed_info in seed_infos {
            let label = seed_info
                .token
                .clone()
                .unwrap_or_else(|| seed_info.seed.to_string());
            println!("▶ {} (seed {label})", scenario.name.bold());
            let run = play_paced(tester, &scenario.plan, seed_info.seed, pace_scale, &mut out)
                .await
                .with_context(|| format!("paced playback of {}", scenario.name))?;
            if run.result.is_none() {
                eprintln!(
                    "⚠️  {} left unresolved after {} rival turns",
                    scenario.name.yellow(),
                    run.rival_turns
                );
            } else {
                println!("   ({} rival turns, {} lines)", run.rival_turns, run.lines);
            }
        }
    }
    Ok(())
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Gearhead Auction Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No auction scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::io::Write;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            config: None,
            paced: false,
            pace_scale: 0.0,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gearhead-{}-{name}", std::process::id()))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1337,
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            player_wins: 0,
            failures: Vec::new(),
            average_duration: Duration::ZERO,
            performance_data: Vec::new(),
        }
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let scenarios = expand_scenarios("tactician,all");
        assert_eq!(scenarios[0], "tactician");
        assert_eq!(scenarios.len(), list_scenarios().len());
        assert!(scenarios.contains(&"smoke".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        assert_eq!(expand_scenarios("random-walk,smoke"), vec!["random-walk", "smoke"]);
    }

    #[test]
    fn rejects_negative_pace_scale() {
        let args = Args {
            pace_scale: -0.5,
            ..base_args()
        };
        assert!(validate_pace_scale(&args).is_err());
        assert_eq!(validate_pace_scale(&base_args()).unwrap(), 0.0);
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let tester = AuctionTester::embedded(false);
        let results = run_logic_scenarios(&base_args(), &["nope".to_string()], &[1], &tester);
        assert!(results.is_empty());
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_file("list.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("crowded-room"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_file("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("scenario_name"));
        assert!(content.contains("Smoke"));
    }

    #[test]
    fn write_reports_emits_console_report() {
        let temp = temp_file("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Total time"));
        assert!(content.contains("Smoke"));
    }

    #[test]
    fn bad_config_path_fails_validation() {
        let tester = AuctionTester::new(
            TesterData::new(Some(temp_file("missing-config.json"))),
            false,
        );
        let err = tester.validate_data().unwrap_err();
        assert!(format!("{err:#}").contains("loading auction config"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
