//! Integration tests for CLI argument handling
//!
//! Tests subcommand parsing and startup failures from the command line.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_contest-client"))
        .args(args)
        .output()
        .expect("Failed to execute contest-client")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("contest-client"), "Help should mention the binary");
    assert!(stdout.contains("problem"), "Help should mention the problem subcommand");
    assert!(stdout.contains("leaderboard"), "Help should mention the leaderboard subcommand");
}

#[test]
fn test_problem_help_lists_actions() {
    let output = run_cli(&["problem", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("get_spec"));
    assert!(stdout.contains("get_info"));
    assert!(stdout.contains("submit_solution"));
}

#[test]
fn test_out_of_range_problem_id_fails() {
    let output = run_cli(&["problem", "get_info", "5000"]);
    assert!(!output.status.success(), "Expected id 5000 to be rejected");
}

#[test]
fn test_invalid_log_level_prints_error_and_exits() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let key = temp_dir.path().join("api_key");
    let key_arg = key.to_string_lossy().to_string();

    let output = run_cli(&[
        "--loglevel",
        "loud",
        "--api-key",
        &key_arg,
        "leaderboard",
        "where_we_are",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid log level"),
        "Should print error message about the log level: {}",
        stderr
    );
}

#[test]
fn test_missing_credential_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let key = temp_dir.path().join("missing_key");
    let cache = temp_dir.path().join("data.json");
    let key_arg = key.to_string_lossy().to_string();
    let cache_arg = cache.to_string_lossy().to_string();

    let output = run_cli(&[
        "--api-key",
        &key_arg,
        "--cache",
        &cache_arg,
        "leaderboard",
        "where_we_are",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("credential"), "Unexpected stderr: {}", stderr);
    assert!(!cache.exists(), "Cache should not be created before the credential loads");
}

#[test]
fn test_corrupt_cache_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let key = temp_dir.path().join("api_key");
    let cache = temp_dir.path().join("data.json");
    fs::write(&key, "1-secret\n").unwrap();
    fs::write(&cache, "{broken").unwrap();
    let key_arg = key.to_string_lossy().to_string();
    let cache_arg = cache.to_string_lossy().to_string();

    let output = run_cli(&[
        "--api-key",
        &key_arg,
        "--cache",
        &cache_arg,
        "--base-url",
        "http://127.0.0.1:9/api/",
        "problem",
        "get_info",
        "1",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("corrupt"), "Unexpected stderr: {}", stderr);
    assert_eq!(fs::read_to_string(&cache).unwrap(), "{broken");
}

#[test]
fn test_invalid_snapshot_ttl_is_rejected() {
    let output = run_cli(&["--snapshot-ttl", "forever", "leaderboard", "where_we_are"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid duration"),
        "Should explain the bad duration: {}",
        stderr
    );
}

#[test]
fn test_help_lists_timing_options() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--min-interval"));
    assert!(stdout.contains("--snapshot-ttl"));
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use contest_client::cli::{Cli, Command, LeaderboardAction, ProblemAction};

    #[test]
    fn test_cli_parse_submit_solution() {
        let cli = Cli::parse_from(["contest-client", "problem", "submit_solution", "101"]);
        assert_eq!(
            cli.command,
            Command::Problem {
                action: ProblemAction::SubmitSolution,
                id: 101
            }
        );
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "contest-client",
            "leaderboard",
            "where_we_are",
            "--loglevel",
            "debug",
        ]);
        assert_eq!(cli.loglevel, "debug");
        assert_eq!(
            cli.command,
            Command::Leaderboard {
                action: LeaderboardAction::WhereWeAre
            }
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["contest-client"]).is_err());
    }
}
