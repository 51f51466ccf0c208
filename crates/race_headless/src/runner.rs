//! Headless race runner implementation.
//!
//! The runner owns one [`Simulation`] and writes [`Response`] lines to any
//! [`Write`] sink, so the binary can point it at stdout and tests can point
//! it at a buffer.

use std::io::{self, BufRead, Write};

use race_core::simulation::Simulation;

use crate::protocol::{Command, Response};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Emit a `tick` line even when nothing happened.
    pub emit_quiet_ticks: bool,
    /// Emit a snapshot every N ticks during scripted runs.
    pub snapshot_every: Option<u64>,
}

/// Headless runner for scripted and interactive races.
pub struct HeadlessRunner {
    scenario: Scenario,
    config: HeadlessConfig,
    sim: Simulation,
}

impl HeadlessRunner {
    /// Create a runner with default config.
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        Self::with_config(scenario, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(scenario: Scenario, config: HeadlessConfig) -> Result<Self, ScenarioError> {
        let sim = scenario.build()?;
        Ok(Self {
            scenario,
            config,
            sim,
        })
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// The scenario this runner was built from.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn ready(&self) -> Response {
        Response::ready(
            &self.scenario.name,
            self.sim.racers().len(),
            self.sim.get_tick(),
        )
    }

    /// Advance `count` ticks, writing events (and periodic snapshots).
    pub fn run_ticks<W: Write>(&mut self, count: u64, out: &mut W) -> io::Result<()> {
        for _ in 0..count {
            let events = self.sim.tick();
            let tick = self.sim.get_tick();
            if self.config.emit_quiet_ticks || !events.is_empty() {
                let line = Response::Tick {
                    tick,
                    time_ms: self.sim.time_ms(),
                    events,
                };
                out.write_all(line.to_json_line().as_bytes())?;
            }
            if self
                .config
                .snapshot_every
                .is_some_and(|every| every > 0 && tick % every == 0)
            {
                out.write_all(self.snapshot().to_json_line().as_bytes())?;
            }
        }
        Ok(())
    }

    /// Run the scenario for its configured length.
    ///
    /// Writes `ready`, every tick's events, then `done` with the final hash.
    /// Returns the final hash.
    pub fn play<W: Write>(&mut self, ticks: Option<u64>, out: &mut W) -> io::Result<u64> {
        let ticks = ticks.unwrap_or(self.scenario.ticks);
        tracing::info!(scenario = %self.scenario.name, ticks, "Starting scripted run");

        out.write_all(self.ready().to_json_line().as_bytes())?;
        self.run_ticks(ticks, out)?;

        let hash = self.sim.state_hash();
        let done = Response::Done {
            ticks: self.sim.get_tick(),
            hash,
        };
        out.write_all(done.to_json_line().as_bytes())?;
        out.flush()?;

        tracing::info!(tick = self.sim.get_tick(), hash = format!("{hash:016x}"), "Run complete");
        Ok(hash)
    }

    /// Serve JSON commands from `input` until `quit` or end of input.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        tracing::info!(scenario = %self.scenario.name, "Starting interactive session");
        out.write_all(self.ready().to_json_line().as_bytes())?;
        out.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let cmd = match Command::from_json(line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    let error = Response::error(format!("Parse error: {e}"), None);
                    out.write_all(error.to_json_line().as_bytes())?;
                    out.flush()?;
                    continue;
                }
            };

            if !self.execute(cmd, out)? {
                break;
            }
            out.flush()?;
        }

        out.write_all(Response::Bye.to_json_line().as_bytes())?;
        out.flush()
    }

    /// Apply one command. Returns `false` once the session should end.
    fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<bool> {
        let cmd_name = cmd.name();
        tracing::debug!(cmd = cmd_name, tick = self.sim.get_tick(), "Command");

        let response = match cmd {
            Command::Tick { count } => {
                self.run_ticks(u64::from(count), out)?;
                Response::StateHash {
                    tick: self.sim.get_tick(),
                    hash: self.sim.state_hash(),
                }
            }
            Command::Activate { racer } => match self.sim.request_activation(racer) {
                Ok(true) => Response::ack(cmd_name),
                Ok(false) => Response::error(
                    format!("Racer {racer} cannot activate right now"),
                    Some(cmd_name),
                ),
                Err(e) => Response::error(e.to_string(), Some(cmd_name)),
            },
            Command::SetWeather { weather } => {
                self.sim.set_weather(weather);
                Response::ack(cmd_name)
            }
            Command::Snapshot => self.snapshot(),
            Command::Hash => Response::StateHash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            },
            Command::Quit => return Ok(false),
        };

        out.write_all(response.to_json_line().as_bytes())?;
        Ok(true)
    }

    fn snapshot(&self) -> Response {
        Response::Snapshot {
            tick: self.sim.get_tick(),
            time_ms: self.sim.time_ms(),
            racers: self.sim.snapshot(),
        }
    }
}

/// Outcome of re-running one scenario several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Final hash of every run, in run order.
    pub hashes: Vec<u64>,
    /// First tick at which two fresh builds replayed in lockstep disagreed.
    /// Stays `None` when the runs disagree but the replay does not.
    pub first_divergence: Option<u64>,
}

impl VerifyReport {
    /// Whether every run ended in the same state.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run `scenario` `runs` times for `ticks` ticks and compare final hashes.
///
/// When runs disagree, two fresh builds are replayed in lockstep to find the
/// first tick whose hashes differ.
pub fn verify_determinism(
    scenario: &Scenario,
    ticks: u64,
    runs: u32,
) -> Result<VerifyReport, ScenarioError> {
    let mut hashes = Vec::with_capacity(runs as usize);
    for run in 0..runs {
        let mut sim = scenario.build()?;
        for _ in 0..ticks {
            sim.tick();
        }
        let hash = sim.state_hash();
        tracing::debug!(run, hash = format!("{hash:016x}"), "Verification run finished");
        hashes.push(hash);
    }

    let mut report = VerifyReport {
        hashes,
        first_divergence: None,
    };
    if !report.is_deterministic() {
        report.first_divergence = first_divergence(scenario.build()?, scenario.build()?, ticks);
        tracing::warn!(divergence = ?report.first_divergence, "Runs disagree");
    }
    Ok(report)
}

/// Tick both simulations side by side and return the first tick whose state
/// hashes differ.
fn first_divergence(mut a: Simulation, mut b: Simulation, ticks: u64) -> Option<u64> {
    for _ in 0..ticks {
        a.tick();
        b.tick();
        if a.state_hash() != b.state_hash() {
            return Some(a.get_tick());
        }
    }
    None
}
