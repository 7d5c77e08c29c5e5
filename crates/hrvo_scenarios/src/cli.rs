//! cli argument parser module

use std::path::PathBuf;

use clap::Parser;

/// Which example crowd to build
#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Robots on a circle, each heading for the antipodal point
    Circle,
    /// A vertical line of robots all moving down
    Line,
    /// A row of robots crossing a field whose perimeter is lined with
    /// parked robots
    Perimeter,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Perimeter => "perimeter",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Cli {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value_t = Scenario::Circle)]
    pub scenario: Scenario,

    /// Number of moving robots
    #[arg(short, long, default_value_t = 8)]
    pub robots: usize,

    /// Simulated seconds to run for
    #[arg(short, long, default_value_t = 10.0)]
    pub duration: f32,

    /// Step length in seconds
    #[arg(short, long, default_value_t = 1.0 / 30.0)]
    pub time_step: f32,

    /// Stop early once every robot has reached its goal
    #[arg(long)]
    pub until_reached: bool,

    /// toml file with agent defaults, overriding the built-in ones
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Run the per-robot phase on a single thread
    #[arg(long)]
    pub single_threaded: bool,
}
