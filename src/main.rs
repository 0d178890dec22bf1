use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use outrights::api::{simulate_season, SimOptions};
use outrights::types::{Event, Market};

const USAGE: &str = "\
Usage: outrights --events=<path> --results=<path> [--markets=<path>] [options]

Required:
  --events=<path>                JSON array of priced training events
  --results=<path>               JSON array of completed results

Options:
  --markets=<path>               JSON array of outright markets
  --generations=N                solver generation budget (default 1000)
  --npaths=N                     Monte Carlo paths (default 5000)
  --rounds=N                     meetings per ordered team pair (default 1)
  --time-power-weighting=F       recency decay exponent (default 1.0)
  --seed=N                       RNG seed for reproducible output
  --debug                        per-generation solver logging
  --help                         print this help";

const KNOWN_FLAGS: &[&str] = &[
    "--events=",
    "--results=",
    "--markets=",
    "--generations=",
    "--npaths=",
    "--rounds=",
    "--time-power-weighting=",
    "--seed=",
];

const KNOWN_SWITCHES: &[&str] = &["--debug", "--help"];

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help") {
        println!("{USAGE}");
        return Ok(());
    }
    for arg in &args {
        let known = KNOWN_SWITCHES.contains(&arg.as_str())
            || KNOWN_FLAGS.iter().any(|flag| arg.starts_with(flag));
        if !known {
            bail!("unknown argument: {arg} (see --help)");
        }
    }

    let debug = has_flag(&args, "--debug");
    init_tracing(debug);

    let events_path = parse_arg(&args, "--events")
        .context("missing required --events=<path> (see --help)")?;
    let results_path = parse_arg(&args, "--results")
        .context("missing required --results=<path> (see --help)")?;
    let markets_path = parse_arg(&args, "--markets");

    let events: Vec<Event> = read_json(Path::new(&events_path))?;
    let results: Vec<Event> = read_json(Path::new(&results_path))?;
    let markets: Vec<Market> = match markets_path {
        Some(path) => read_json(Path::new(&path))?,
        None => Vec::new(),
    };

    let options = SimOptions {
        generations: parse_usize_arg(&args, "--generations")?,
        n_paths: parse_usize_arg(&args, "--npaths")?,
        rounds: parse_usize_arg(&args, "--rounds")?,
        time_power_weighting: parse_f64_arg(&args, "--time-power-weighting")?,
        seed: parse_u64_arg(&args, "--seed")?,
        debug,
        ..SimOptions::default()
    };

    let result = simulate_season(results, events, markets, Default::default(), options)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("serialize result")?
    );
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn parse_arg(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    args.iter()
        .find_map(|a| a.strip_prefix(&prefix))
        .map(|v| v.to_string())
}

fn parse_usize_arg(args: &[String], name: &str) -> Result<Option<usize>> {
    parse_arg(args, name)
        .map(|raw| raw.parse().with_context(|| format!("invalid {name}: {raw}")))
        .transpose()
}

fn parse_u64_arg(args: &[String], name: &str) -> Result<Option<u64>> {
    parse_arg(args, name)
        .map(|raw| raw.parse().with_context(|| format!("invalid {name}: {raw}")))
        .transpose()
}

fn parse_f64_arg(args: &[String], name: &str) -> Result<Option<f64>> {
    parse_arg(args, name)
        .map(|raw| raw.parse().with_context(|| format!("invalid {name}: {raw}")))
        .transpose()
}
