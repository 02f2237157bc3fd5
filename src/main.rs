use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use wxlocate::location::{locate_blocking, Deadline, LocateOptions, Location};

/// wxlocate — find out roughly where this machine is.
///
/// Asks ipapi.co, ip-api.com and ipwho.is at the same time and prints one
/// answer. By default the first service to answer wins; with --best every
/// answer that arrives in time is ranked by completeness.
///
/// Examples:
///   wxlocate
///   wxlocate --best --json
///   wxlocate --overall-ms 1800 --per-call-ms 1000
#[derive(Parser)]
#[command(name = "wxlocate", version, about, long_about = None)]
struct Cli {
    /// Wait for all providers (or the deadline) and keep the most complete answer.
    #[arg(long)]
    best: bool,

    /// Budget for the whole lookup, in milliseconds.
    #[arg(long, default_value_t = 1500)]
    overall_ms: u64,

    /// Budget for a single provider call, in milliseconds.
    #[arg(long, default_value_t = 900)]
    per_call_ms: u64,

    /// Hard upper bound for the process, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    deadline_ms: u64,

    /// Identifier sent as User-Agent.
    #[arg(long)]
    user_agent: Option<String>,

    /// Print the location as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Log provider activity to stderr (-v debug, -vv trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct ErrorOut {
    error: String,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut opts = LocateOptions::default()
        .overall_timeout(Duration::from_millis(cli.overall_ms))
        .per_call_timeout(Duration::from_millis(cli.per_call_ms))
        .prefer_fastest(!cli.best);
    if let Some(ua) = cli.user_agent {
        opts = opts.user_agent(ua);
    }
    tracing::debug!(?opts, "starting location lookup");

    let deadline = Deadline::after(Duration::from_millis(cli.deadline_ms));
    match locate_blocking(deadline, opts) {
        Ok(loc) => print_location(&loc, cli.json),
        Err(e) => {
            if cli.json {
                print_json(&ErrorOut { error: e.to_string() });
            } else {
                println!("\u{274C} Location error: {}", e);
            }
            std::process::exit(1);
        }
    }
}

fn print_location(loc: &Location, json: bool) {
    if json {
        print_json(loc);
    } else {
        println!("{}", loc.display_line());
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error: cannot encode output: {}", e);
            std::process::exit(2);
        }
    }
}
