//! Command-line interface parsing for the contest client
//!
//! This module handles parsing of CLI arguments using clap: global options
//! that override the default `Config`, and the `problem` and `leaderboard`
//! subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The log level name is not recognized
    #[error("Invalid log level: '{0}'. Valid levels: error, warning, info, debug, trace")]
    InvalidLogLevel(String),

    /// A duration argument is not a non-negative number of seconds
    #[error("Invalid duration: '{0}'. Expected a non-negative number of seconds")]
    InvalidSeconds(String),
}

/// Contest API client - query problems, submit solutions, check the leaderboard
#[derive(Parser, Debug)]
#[command(name = "contest-client")]
#[command(about = "Cached, rate-limited client for the contest API")]
#[command(version)]
pub struct Cli {
    /// Log level: error, warning, info, debug or trace
    #[arg(long, default_value = "warning", global = true)]
    pub loglevel: String,

    /// Path of the JSON response cache
    #[arg(long, value_name = "PATH", global = true)]
    pub cache: Option<PathBuf>,

    /// Path of the file holding the API key
    #[arg(long, value_name = "PATH", global = true)]
    pub api_key: Option<PathBuf>,

    /// Base URL of the contest API
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Minimum spacing between two API requests, in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, global = true)]
    pub min_interval: Option<Duration>,

    /// How long the cached snapshot list stays fresh, in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, global = true)]
    pub snapshot_ttl: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Just do something with your problems
    Problem {
        /// Operation on the problem
        action: ProblemAction,
        /// Problem id
        #[arg(value_parser = clap::value_parser!(u32).range(1..2000))]
        id: u32,
    },
    /// Who is the best?
    Leaderboard {
        /// Leaderboard query
        action: LeaderboardAction,
    },
}

/// Operations on a single problem
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemAction {
    /// Print the problem's specification text
    #[value(name = "get_spec")]
    GetSpec,
    /// Print the problem's metadata
    #[value(name = "get_info")]
    GetInfo,
    /// Submit a solution read from standard input
    #[value(name = "submit_solution")]
    SubmitSolution,
}

/// Leaderboard queries
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardAction {
    /// Print our 1-based rank
    #[value(name = "where_we_are")]
    WhereWeAre,
}

/// Parses a log level name into a filter.
///
/// Accepts Python-style `warning` alongside the `log` crate's names.
pub fn parse_log_level(s: &str) -> Result<LevelFilter, CliError> {
    match s.to_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "critical" | "fatal" | "error" => Ok(LevelFilter::Error),
        "warning" | "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(CliError::InvalidLogLevel(s.to_string())),
    }
}

/// Parses a duration given in (possibly fractional) seconds
pub fn parse_seconds(s: &str) -> Result<Duration, CliError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| CliError::InvalidSeconds(s.to_string()))
}

impl Cli {
    /// Applies the command-line overrides on top of the default config
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.credential_path = api_key.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(interval) = self.min_interval {
            config.min_request_interval = interval;
        }
        if let Some(ttl) = self.snapshot_ttl {
            config.snapshot_ttl = ttl;
        }
        config
    }
}
