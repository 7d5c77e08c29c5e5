//! Runs one of the example crowds and reports every frame as csv on stdout.
//!
//! Diagnostics go to stderr through `env_logger`; set `RUST_LOG=info` to see
//! them.

mod cli;
mod report;
mod scenarios;

use anyhow::Context;
use clap::Parser;
use hrvo::{AgentParameters, Parallelism, Simulator};
use log::info;

/// On-disk override for the scenario's agent defaults.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    defaults: AgentParameters,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = cli::Cli::parse();

    let defaults = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config =
                toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
            config.defaults
        }
        None => scenarios::default_parameters(),
    };

    let mut simulator = Simulator::new();
    simulator.set_time_step(cli.time_step)?;
    simulator.set_agent_defaults(defaults)?;
    if cli.single_threaded {
        simulator.set_parallelism(Parallelism::SingleThreaded);
    }

    match cli.scenario {
        cli::Scenario::Circle => scenarios::circle(&mut simulator, cli.robots)?,
        cli::Scenario::Line => scenarios::line(&mut simulator, cli.robots)?,
        cli::Scenario::Perimeter => scenarios::perimeter(&mut simulator, cli.robots)?,
    }
    info!(
        "{} robots, dt = {} s, reporting {} simulated seconds",
        simulator.num_agents(),
        cli.time_step,
        cli.duration
    );

    let stdout = std::io::stdout();
    report::run(
        &mut simulator,
        cli.duration,
        cli.until_reached,
        &mut stdout.lock(),
    )?;
    Ok(())
}
