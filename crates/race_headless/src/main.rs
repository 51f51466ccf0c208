//! Headless racer arena runner.
//!
//! This binary runs races without graphics, writing JSON lines to stdout.
//! Designed for CI determinism checks, scripted playback and benchmarking.
//!
//! # Usage
//!
//! ```bash
//! # Scripted run of a built-in scenario
//! cargo run -p race_headless -- run --scenario demo --ticks 600
//!
//! # Interactive mode - read commands from stdin
//! cargo run -p race_headless -- serve --scenario duel
//!
//! # Verify determinism
//! cargo run -p race_headless -- verify --scenario storm --runs 5
//!
//! # Time the tick loop
//! cargo run -p race_headless --release -- benchmark --ticks 36000
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use race_headless::{
    runner::{verify_determinism, HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "race_headless")]
#[command(about = "Headless racer arena runner for CI and scripted playback")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario for a fixed number of ticks
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "demo")]
        scenario: String,

        /// Ticks to run (default: the scenario's own length)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Output a line for every tick, even quiet ones
        #[arg(long)]
        all_ticks: bool,

        /// Output a snapshot every N ticks
        #[arg(long)]
        snapshot_every: Option<u64>,
    },

    /// Serve JSON commands from stdin
    Serve {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "demo")]
        scenario: String,
    },

    /// Verify determinism by running the same scenario multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "demo")]
        scenario: String,

        /// Ticks per run (default: the scenario's own length)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Run N ticks for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "36000")]
        ticks: u64,

        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "demo")]
        scenario: String,
    },

    /// Print a scenario as RON
    Dump {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "demo")]
        scenario: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            ticks,
            all_ticks,
            snapshot_every,
        }) => {
            let config = HeadlessConfig {
                emit_quiet_ticks: all_ticks,
                snapshot_every,
            };
            cmd_run(&scenario, ticks, config);
        }
        Some(Commands::Serve { scenario }) => {
            cmd_serve(&scenario);
        }
        Some(Commands::Verify {
            scenario,
            ticks,
            runs,
        }) => {
            cmd_verify(&scenario, ticks, runs);
        }
        Some(Commands::Benchmark { ticks, scenario }) => {
            cmd_benchmark(ticks, &scenario);
        }
        Some(Commands::Dump { scenario }) => {
            cmd_dump(&scenario);
        }
        None => {
            // Default: interactive mode
            cmd_serve("demo");
        }
    }
}

fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(s) => {
            tracing::info!(scenario = %s.name, racers = s.setup.racers.len(), "Loaded scenario");
            s
        }
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_runner(scenario: Scenario, config: HeadlessConfig) -> HeadlessRunner {
    match HeadlessRunner::with_config(scenario, config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to start race: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a scenario to completion
fn cmd_run(scenario: &str, ticks: Option<u64>, config: HeadlessConfig) {
    let mut runner = build_runner(load_scenario(scenario), config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match runner.play(ticks, &mut out) {
        Ok(hash) => eprintln!("Final state hash: {:016x}", hash),
        Err(e) => {
            eprintln!("Failed to write output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Serve commands from stdin
fn cmd_serve(scenario: &str) {
    let mut runner = build_runner(load_scenario(scenario), HeadlessConfig::default());
    let stdin = io::stdin();
    let stdout = io::stdout();

    if let Err(e) = runner.serve(stdin.lock(), &mut stdout.lock()) {
        eprintln!("Session failed: {}", e);
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, ticks: Option<u64>, runs: u32) {
    let scenario = load_scenario(scenario);
    let ticks = ticks.unwrap_or(scenario.ticks);
    tracing::info!(
        "Verifying determinism: {} for {} ticks ({} runs)",
        scenario.name,
        ticks,
        runs
    );

    let report = match verify_determinism(&scenario, ticks, runs) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to build scenario: {}", e);
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!("PASS: All {} runs produced identical results", runs);
        if let Some(hash) = report.hashes.first() {
            eprintln!("  Hash: {:016x}", hash);
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in report.hashes.iter().enumerate() {
            eprintln!("  Run {}: {:016x}", run, hash);
        }
        if let Some(tick) = report.first_divergence {
            eprintln!("  First divergence at tick {}", tick);
        }
        std::process::exit(1);
    }
}

/// Run benchmark
fn cmd_benchmark(ticks: u64, scenario: &str) {
    let scenario = load_scenario(scenario);
    let mut sim = match scenario.build() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to build scenario: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Starting benchmark with {} racers", sim.racers().len());
    eprintln!("Running {} ticks...", ticks);

    // Warmup
    for _ in 0..100 {
        sim.tick();
    }

    let start = Instant::now();
    let mut collisions = 0usize;
    for _ in 0..ticks {
        collisions += sim.tick().collisions.len();
    }
    let elapsed = start.elapsed();

    let tps = ticks as f64 / elapsed.as_secs_f64();
    let knocked_out = sim.racers().iter().filter(|r| r.is_knocked_out()).count();

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {}", ticks);
    eprintln!("Duration: {:.3}s", elapsed.as_secs_f64());
    eprintln!("Ticks/second: {:.1}", tps);
    eprintln!("ms/tick: {:.4}", elapsed.as_secs_f64() * 1000.0 / ticks.max(1) as f64);
    eprintln!("Collisions: {}", collisions);
    eprintln!("Knocked out: {}", knocked_out);
    eprintln!("State hash: {:016x}", sim.state_hash());
}

/// Print a scenario as RON
fn cmd_dump(scenario: &str) {
    let scenario = load_scenario(scenario);
    match ron::ser::to_string_pretty(&scenario, ron::ser::PrettyConfig::default()) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Failed to serialize scenario: {}", e);
            std::process::exit(1);
        }
    }
}
