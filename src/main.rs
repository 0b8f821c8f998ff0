//! Contest client - query the contest API from the command line
//!
//! Every request goes through the local cache and the one-request-per-second
//! throttle; results are printed to standard output.

use std::io::{self, Read};

use clap::Parser;
use serde_json::Value;

use contest_client::api::{error_chain, ClientError, ContestClient, HttpTransport};
use contest_client::cli::{parse_log_level, Cli, Command, LeaderboardAction, ProblemAction};

/// Sets up timed logging to stderr at the requested level
fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = parse_log_level(level)?;
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(filter);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.try_init()?;
    Ok(())
}

/// Prints a value: strings verbatim, everything else as pretty JSON
fn print_value(value: &Value) -> Result<(), serde_json::Error> {
    match value {
        Value::String(text) => println!("{}", text),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

async fn run(client: &ContestClient<HttpTransport>, command: &Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Problem { action, id } => {
            let value = match action {
                ProblemAction::GetSpec => client.problem_spec(*id).await?,
                ProblemAction::GetInfo => client.problem(*id).await?,
                ProblemAction::SubmitSolution => {
                    let mut solution = String::new();
                    io::stdin().read_to_string(&mut solution)?;
                    client.submit_solution(*id, &solution).await?
                }
            };
            print_value(&value)?;
        }
        Command::Leaderboard {
            action: LeaderboardAction::WhereWeAre,
        } => {
            let rank = client.where_we_are().await?;
            println!("{}", rank);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.loglevel) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let config = cli.config();
    let client = ContestClient::from_config(&config).map_err(|e: ClientError| {
        log::error!("Startup failed: {}", error_chain(&e));
        e
    })?;

    run(&client, &cli.command).await.map_err(|e| {
        log::error!("{}", error_chain(e.as_ref()));
        e
    })
}
