//! Gallop Simulator CLI
//!
//! Run deterministic race-program scenarios, or play one program in real time.

use clap::Parser;
use gallop_core::{ProgramConfig, RaceEvent, RaceProgram};
use gallop_env::{drive, FrameContext, TokioContext};
use gallop_sim::scenarios::ScenarioId;
use gallop_sim::{CheckedProgram, ScenarioResult, ScenarioRunner, SimError};
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Frame budget for real-time playback (~10 minutes at 60 Hz).
const REALTIME_MAX_FRAMES: u64 = 36_000;

/// Gallop deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "gallop-sim")]
#[command(about = "Run deterministic race-program simulations for Gallop", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (full_program, pause_resume, condition_bias,
    /// instant_program, repeat_generation, stop_rearm, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Virtual frames per second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Trials for statistical scenarios
    #[arg(long, default_value = "200")]
    trials: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export sampled horse positions of one scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Play one program against the real clock instead of running scenarios
    #[arg(long)]
    realtime: bool,

    /// Program configuration (JSON)
    #[arg(long)]
    config: Option<String>,
}

/// Plays one generated program at real speed through the async host driver.
fn run_realtime(config: ProgramConfig, seed: u64) -> Result<(), SimError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()?;

    let ctx = TokioContext::new();
    let mut program = RaceProgram::with_seed(config, seed)?;
    let events = program.subscribe();
    program.generate_program_at(ctx.system_time())?;
    program.start_all_races();

    info!(
        "Playing {} sessions in real time ({:?} per frame)",
        program.sessions().len(),
        ctx.frame_interval()
    );

    let mut checked = CheckedProgram::new(&mut program);
    let frames = runtime.block_on(drive(&ctx, &mut checked, REALTIME_MAX_FRAMES))?;
    checked.finish()?;

    for event in events.try_iter() {
        if let RaceEvent::SessionCompleted { id, winner: Some(winner) } = event {
            info!("  Session {}: {} won in {:.2}s", id, winner.horse_name, winner.finish_time);
        }
    }
    info!(
        "Played {} frames in {:.1}s",
        frames,
        ctx.now().as_secs_f64()
    );
    Ok(())
}

fn print_json_summary(results: &[ScenarioResult], failed_count: usize) -> Result<(), SimError> {
    let summary = serde_json::json!({
        "total": results.len(),
        "passed": results.len() - failed_count,
        "failed": failed_count,
        "results": results.iter().map(|r| {
            serde_json::json!({
                "scenario": r.scenario.name(),
                "seed": r.seed,
                "passed": r.passed,
                "frames": r.total_frames,
                "time_secs": r.final_time_secs,
                "sessions_completed": r.sessions_completed,
                "failure_reason": r.failure_reason,
                "metrics": r.metrics,
            })
        }).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Gallop Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let program_config = match &args.config {
        Some(path) => ProgramConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => ProgramConfig::default(),
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos() as u64
    } else {
        args.seed
    };

    if args.realtime {
        if let Err(e) = run_realtime(program_config, base_seed) {
            error!("✗ Real-time playback failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios:");
            for scenario in ScenarioId::all() {
                eprintln!("  {:<18} {}", scenario.name(), scenario.description());
            }
            eprintln!("  {:<18} every scenario above", "all");
            std::process::exit(1);
        })]
    };

    let runner_for = |seed: u64| {
        ScenarioRunner::new(seed)
            .with_fps(args.fps)
            .with_trials(args.trials)
            .with_program_config(program_config.clone())
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);

        let (result, export) = runner_for(base_seed).run_with_export(scenarios[0]);
        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {}", e);
            std::process::exit(1);
        }
        info!("Exported {} frames to {}", export.frames.len(), export_path);

        if result.passed {
            info!("✓ {} (seed={}) PASSED", scenarios[0].name(), base_seed);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();

    if args.json {
        if let Err(e) = print_json_summary(&all_results, failed_count) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
