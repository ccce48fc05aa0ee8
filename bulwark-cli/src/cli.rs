//! CLI argument parsing definitions

use bulwark_resilience::FailureKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Place a single call
    Call {
        /// Contact name
        #[arg(long, value_name = "NAME")]
        name: String,

        /// Contact phone number (e.g. +1-555-0123)
        #[arg(long, value_name = "PHONE")]
        phone: String,

        /// Make the first N speech requests fail (simulated mode only)
        #[arg(long, value_name = "N")]
        simulate_outage: Option<u32>,

        /// Failure returned by simulated outages
        #[arg(long, value_enum, default_value_t = SimulatedFailure::Unavailable)]
        failure: SimulatedFailure,
    },

    /// Call every contact listed in a YAML or JSON file
    Batch {
        /// File containing a list of `{name, phone}` entries
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a three-call scenario where the first call hits a speech outage
    Demo,

    /// Probe each service once and print its health.
    ///
    /// Breaker state is kept in memory only, so the breakers listed here are
    /// the fresh CLOSED ones of this process. Use `session` to follow breakers
    /// across calls and reset them.
    Status {
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session: place calls, inject outages, inspect and reset
    /// breakers against one long-lived agent
    Session,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path; prints to stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Failure kinds that can be injected from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SimulatedFailure {
    Unavailable,
    Timeout,
    Network,
    Auth,
    InvalidRequest,
    Quota,
}

impl From<SimulatedFailure> for FailureKind {
    fn from(failure: SimulatedFailure) -> Self {
        match failure {
            SimulatedFailure::Unavailable => FailureKind::ServiceUnavailable,
            SimulatedFailure::Timeout => FailureKind::Timeout,
            SimulatedFailure::Network => FailureKind::NetworkError,
            SimulatedFailure::Auth => FailureKind::AuthenticationFailure,
            SimulatedFailure::InvalidRequest => FailureKind::InvalidRequest,
            SimulatedFailure::Quota => FailureKind::QuotaExceeded,
        }
    }
}
