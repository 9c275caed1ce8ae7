//! Command-line entry point.
//!
//! # Responsibility
//! - `lazyplan_cli`: print ping/version to verify `lazyplan_core` linkage.
//! - `lazyplan_cli parse [TIME_ZONE]`: turn schedule lines from stdin into
//!   calendar insert bodies, one JSON document per line on stdout.
//! - `lazyplan_cli config`: print the effective settings and the next
//!   free/busy lookahead range as JSON.
//!
//! Settings come from the JSON file named by `LAZYPLAN_CONFIG`, else
//! defaults. A `TIME_ZONE` argument overrides the configured zone.
//! Set `LAZYPLAN_LOG_DIR` to an absolute path to enable file logging at the
//! configured level. Lines that fail to parse go to stderr; the exit code
//! is 1 when any did.

use chrono::Utc;
use lazyplan_core::{load_config, PlannerConfig};
use std::io::Read;
use std::process::ExitCode;

const CONFIG_ENV: &str = "LAZYPLAN_CONFIG";
const LOG_DIR_ENV: &str = "LAZYPLAN_LOG_DIR";

fn main() -> ExitCode {
    let config = match planner_config() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(2);
        }
    };

    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(message) = lazyplan_core::init_logging(config.effective_log_level(), &log_dir) {
            eprintln!("warning: logging disabled: {message}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        None => {
            println!("lazyplan_core ping={}", lazyplan_core::ping());
            println!("lazyplan_core version={}", lazyplan_core::core_version());
            Ok(true)
        }
        Some("parse") => run_parse(config, args.get(1).map(String::as_str)),
        Some("config") => print_config(&config).map(|()| true),
        Some(other) => Err(format!(
            "unknown command `{other}`; usage: lazyplan_cli [parse [TIME_ZONE] | config]"
        )),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
    }
}

fn planner_config() -> Result<PlannerConfig, String> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => load_config(&path).map_err(|err| err.to_string()),
        Err(_) => Ok(PlannerConfig::default()),
    }
}

/// Returns `Ok(false)` when at least one line was skipped.
fn run_parse(mut config: PlannerConfig, zone: Option<&str>) -> Result<bool, String> {
    if let Some(zone) = zone {
        config.time_zone = zone.to_string();
    }
    let parser = config.schedule_parser().map_err(|err| err.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|err| format!("failed to read stdin: {err}"))?;

    let batch = parser.parse_block(&input, &Utc::now());
    for spec in &batch.events {
        let body = serde_json::to_string(&spec.to_event_body())
            .map_err(|err| format!("failed to encode event body: {err}"))?;
        println!("{body}");
    }
    for failure in &batch.failures {
        eprintln!(
            "line {}: {} ({})",
            failure.line_number, failure.error, failure.line
        );
    }
    Ok(batch.failures.is_empty())
}

fn print_config(config: &PlannerConfig) -> Result<(), String> {
    let summary = serde_json::json!({
        "config": config,
        "effective_log_level": config.effective_log_level(),
        "lookahead": config.lookahead_range(&Utc::now()),
    });
    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| format!("failed to encode config: {err}"))?;
    println!("{rendered}");
    Ok(())
}
