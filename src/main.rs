//! squadlog - Tempo worklog compliance reports for Jira squads
//!
//! A CLI tool that fetches squad members' Tempo worklogs over a period,
//! classifies every entry against a configurable taxonomy and Jira squad
//! affiliation, and renders per-squad completion reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, connection, lookup failure, etc.)
//!   2 - Report produced but some members are missing (--allow-partial)

mod analysis;
mod classify;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod report;
#[cfg(test)]
mod testutil;

use analysis::{Pipeline, PipelineOptions};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use client::{build_http_client, JiraClient, TempoClient};
use config::{Config, DEFAULT_CONFIG_FILE};
use report::ReportMetrics;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("squadlog v{}", env!("CARGO_PKG_VERSION"));
    debug!("Squad: {:?}, period: {:?}", args.squad, args.period);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .squadlog.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set your Tempo/Jira URLs, periods and squads.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so that a report written to stdout stays clean.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch to --list or a report run. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if args.list {
        print_listing(&config);
        return Ok(0);
    }

    run_report(&args, &config).await
}

/// Compute and render the report. Returns exit code (0 or 2).
async fn run_report(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();

    let selection = config.select(args.squad.as_deref(), args.period.as_deref())?;
    config.validate(&selection)?;

    let squad = selection.squad;
    let period = selection.period;
    let users = squad.users();

    eprintln!(
        "📥 Fetching worklogs of {} ({} members) for {} ({} to {})",
        squad.name,
        users.len(),
        selection.period_name,
        period.start,
        period.end
    );

    let http = build_http_client(config.general.timeout_seconds, &config.tls)?;
    let tempo = TempoClient::new(http.clone(), &config.tempo.base_url, &config.tempo.api_token);
    let jira = JiraClient::new(
        http,
        &config.jira.base_url,
        &config.jira.user,
        &config.jira.password,
        &config.jira.squad_field,
    );

    let options = PipelineOptions {
        show_progress: !args.quiet,
        ..PipelineOptions::from(&config.general)
    };
    let pipeline = Pipeline::new(tempo, jira, config.taxonomy.clone(), options);

    let squad_report = pipeline
        .squad_report(&squad.name, &users, selection.period_name, period)
        .await?;

    let taxonomy = pipeline.taxonomy();
    let output = match args.format {
        OutputFormat::Markdown => {
            report::generate_markdown_report(&squad_report, taxonomy, args.members)
        }
        OutputFormat::Text => report::generate_text_report(&squad_report, taxonomy, args.members),
        OutputFormat::Json => {
            report::generate_json_report(&squad_report, taxonomy, args.members)?
        }
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    let metrics = ReportMetrics::compute(&squad_report.hours, taxonomy);
    eprintln!("\n📊 {} / {}:", squad_report.squad, squad_report.period_name);
    eprintln!(
        "   Completion: {} ({}h of {}h)",
        metrics.completion, metrics.logged, metrics.expected
    );
    eprintln!(
        "   Not in squad: {}h ({} of worked)",
        metrics.not_in_squad, metrics.not_in_squad_share
    );
    eprintln!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());

    if squad_report.is_partial() {
        let ids: Vec<&str> = squad_report
            .missing
            .iter()
            .map(|m| m.user_id.as_str())
            .collect();
        eprintln!(
            "\n⛔ Partial report, missing members: {} (exit code 2).",
            ids.join(", ")
        );
        return Ok(2);
    }

    eprintln!("\n✅ Report complete.");
    Ok(0)
}

/// Print configured squads and periods.
fn print_listing(config: &Config) {
    println!("Periods:");
    if config.periods.is_empty() {
        println!("   (none)");
    }
    for (name, period) in &config.periods {
        println!(
            "   {} : {} to {}, {} working days",
            name, period.start, period.end, period.working_days
        );
    }

    println!("Squads:");
    if config.squads.is_empty() {
        println!("   (none)");
    }
    for squad in &config.squads {
        let ids: Vec<&str> = squad.members.iter().map(|m| m.id.as_str()).collect();
        println!("   {} ({}): {}", squad.name, ids.len(), ids.join(", "));
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            warn!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Config::default())
        }
    }
}
