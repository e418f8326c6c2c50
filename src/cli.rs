//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// squadlog - Tempo worklog compliance reports for Jira squads
///
/// Fetches each squad member's Tempo worklogs over a period, classifies
/// them (squad work, other squads, leave, cross-team codes) and reports
/// completion and the breakdown of worked hours.
///
/// Examples:
///   squadlog --squad Rocket --period sprint-12
///   squadlog --squad Rocket --period sprint-12 --members --format text
///   squadlog --period sprint-12 --format json --output report.json
///   squadlog --list
///   squadlog --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Squad to report on
    ///
    /// May be omitted when the configuration holds a single squad.
    #[arg(short, long, value_name = "NAME")]
    pub squad: Option<String>,

    /// Period to report on, as named in the configuration
    ///
    /// May be omitted when the configuration holds a single period.
    #[arg(short, long, value_name = "NAME")]
    pub period: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .squadlog.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, text, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Include a per-member table
    #[arg(long)]
    pub members: bool,

    /// Members processed at once, and maximum concurrent issue lookups
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report without members whose worklogs or issues cannot be fetched
    ///
    /// The missing members are listed in the report and the exit code is 2.
    #[arg(long)]
    pub allow_partial: bool,

    /// Tempo API token
    #[arg(long, env = "TEMPO_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub tempo_token: Option<String>,

    /// Jira user name
    #[arg(long, env = "JIRA_USER", value_name = "USER")]
    pub jira_user: Option<String>,

    /// Jira password
    #[arg(long, env = "JIRA_PASSWORD", hide_env_values = true, value_name = "PASSWORD")]
    pub jira_password: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// List configured squads and periods, then exit
    #[arg(long)]
    pub list: bool,

    /// Generate a default .squadlog.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// Plain console layout
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        for (flag, value) in [("--squad", &self.squad), ("--period", &self.period)] {
            if matches!(value, Some(name) if name.trim().is_empty()) {
                return Err(format!("{} cannot be empty", flag));
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(format!("Output path is a directory: {}", output.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
