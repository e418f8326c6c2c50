//! Configuration file handling.
//!
//! This module handles loading, merging and validating configuration from
//! `.squadlog.toml` files. Validation runs before any network call.

use crate::classify::Taxonomy;
use crate::error::{ReportError, Result as ReportResult};
use crate::models::{Period, User};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".squadlog.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Tempo worklog servlet.
    #[serde(default)]
    pub tempo: TempoConfig,

    /// Jira issue API.
    #[serde(default)]
    pub jira: JiraConfig,

    /// Client certificate presented to both services.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Category rules.
    #[serde(default)]
    pub taxonomy: Taxonomy,

    /// Reporting periods by name, in file order.
    #[serde(default)]
    pub periods: IndexMap<String, Period>,

    /// Squad rosters.
    #[serde(default)]
    pub squads: Vec<SquadConfig>,
}

/// What to do when one member's report cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Produce the report without the member and list it as missing.
    Partial,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Members processed at once, and issue lookups in flight across the run.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub on_member_failure: FailurePolicy,

    /// Default report path; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout(),
            on_member_failure: FailurePolicy::default(),
            output: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

/// Tempo settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempoConfig {
    /// Jira base URL hosting the Tempo plugin.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_token: String,
}

/// Jira settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Custom field holding the squad affiliation of an issue.
    #[serde(default = "default_squad_field")]
    pub squad_field: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user: String::new(),
            password: String::new(),
            squad_field: default_squad_field(),
        }
    }
}

fn default_squad_field() -> String {
    "customfield_12624".to_string()
}

/// Optional PKCS#12 client identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// A squad and its roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadConfig {
    pub name: String,

    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

/// One roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberConfig {
    /// Tempo user name.
    pub id: String,

    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: f64,
}

fn default_hours_per_day() -> f64 {
    8.0
}

impl SquadConfig {
    /// Members as reported under this squad.
    pub fn users(&self) -> Vec<User> {
        self.members
            .iter()
            .map(|member| User {
                id: member.id.clone(),
                squad_name: self.name.clone(),
                hours_per_day: member.hours_per_day,
            })
            .collect()
    }
}

/// Squad and period selected for a run.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub squad: &'a SquadConfig,
    pub period_name: &'a str,
    pub period: &'a Period,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }
        if args.allow_partial {
            self.general.on_member_failure = FailurePolicy::Partial;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        // Credentials, possibly from the environment
        if let Some(ref token) = args.tempo_token {
            self.tempo.api_token = token.clone();
        }
        if let Some(ref user) = args.jira_user {
            self.jira.user = user.clone();
        }
        if let Some(ref password) = args.jira_password {
            self.jira.password = password.clone();
        }
    }

    /// Pick the squad and period of a run.
    ///
    /// A name may be omitted when exactly one squad (or period) is configured.
    pub fn select(&self, squad: Option<&str>, period: Option<&str>) -> ReportResult<Selection<'_>> {
        let squad = match squad {
            Some(name) => self
                .squads
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| {
                    ReportError::config(format!(
                        "unknown squad '{}' (configured: {})",
                        name,
                        self.squad_names().join(", ")
                    ))
                })?,
            None => match self.squads.as_slice() {
                [only] => only,
                [] => return Err(ReportError::config("no squad configured")),
                _ => {
                    return Err(ReportError::config(format!(
                        "several squads configured, pick one with --squad ({})",
                        self.squad_names().join(", ")
                    )))
                }
            },
        };

        let (period_name, period) = match period {
            Some(name) => self.periods.get_key_value(name).ok_or_else(|| {
                ReportError::config(format!(
                    "unknown period '{}' (configured: {})",
                    name,
                    self.period_names().join(", ")
                ))
            })?,
            None => match self.periods.len() {
                1 => self
                    .periods
                    .first()
                    .ok_or_else(|| ReportError::config("no period configured"))?,
                0 => return Err(ReportError::config("no period configured")),
                _ => {
                    return Err(ReportError::config(format!(
                        "several periods configured, pick one with --period ({})",
                        self.period_names().join(", ")
                    )))
                }
            },
        };

        Ok(Selection {
            squad,
            period_name: period_name.as_str(),
            period,
        })
    }

    /// Check everything a run needs before contacting any service.
    pub fn validate(&self, selection: &Selection<'_>) -> ReportResult<()> {
        if self.general.concurrency == 0 {
            return Err(ReportError::config("concurrency must be at least 1"));
        }
        if self.general.timeout_seconds == 0 {
            return Err(ReportError::config("timeout must be at least 1 second"));
        }

        validate_url("tempo.base_url", &self.tempo.base_url)?;
        validate_url("jira.base_url", &self.jira.base_url)?;
        require("tempo.api_token (or TEMPO_API_TOKEN)", &self.tempo.api_token)?;
        require("jira.user (or JIRA_USER)", &self.jira.user)?;
        require("jira.password (or JIRA_PASSWORD)", &self.jira.password)?;
        require("jira.squad_field", &self.jira.squad_field)?;

        if let Some(ref certificate) = self.tls.certificate {
            if !certificate.is_file() {
                return Err(ReportError::config(format!(
                    "certificate not found: {}",
                    certificate.display()
                )));
            }
        }

        self.taxonomy.validate()?;
        validate_period(selection.period_name, selection.period)?;
        validate_squad(selection.squad)
    }

    fn squad_names(&self) -> Vec<&str> {
        self.squads.iter().map(|s| s.name.as_str()).collect()
    }

    fn period_names(&self) -> Vec<&str> {
        self.periods.keys().map(String::as_str).collect()
    }

    /// A starting configuration with one example period and squad.
    pub fn example() -> Self {
        let mut config = Config::default();
        config.tempo.base_url = "https://jira.example.com".to_string();
        config.jira.base_url = "https://jira.example.com".to_string();

        if let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(2024, 1, 8),
            NaiveDate::from_ymd_opt(2024, 1, 19),
        ) {
            config.periods.insert(
                "sprint-1".to_string(),
                Period {
                    start,
                    end,
                    working_days: 10,
                    hours_per_day: default_hours_per_day(),
                },
            );
        }

        config.squads.push(SquadConfig {
            name: "My Squad".to_string(),
            members: vec![MemberConfig {
                id: "jdoe".to_string(),
                hours_per_day: default_hours_per_day(),
            }],
        });

        config
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::example();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn require(name: &str, value: &str) -> ReportResult<()> {
    if value.trim().is_empty() {
        return Err(ReportError::config(format!("{} is not set", name)));
    }
    Ok(())
}

fn validate_url(name: &str, url: &str) -> ReportResult<()> {
    require(name, url)?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ReportError::config(format!(
            "{} must start with 'http://' or 'https://'",
            name
        )));
    }
    Ok(())
}

fn validate_period(name: &str, period: &Period) -> ReportResult<()> {
    if period.start > period.end {
        return Err(ReportError::config(format!(
            "period '{}' starts after it ends ({} > {})",
            name, period.start, period.end
        )));
    }
    if !valid_hours_per_day(period.hours_per_day) {
        return Err(ReportError::config(format!(
            "period '{}' must have hours_per_day in (0, {}]",
            name, MAX_HOURS_PER_DAY
        )));
    }
    Ok(())
}

const MAX_HOURS_PER_DAY: f64 = 24.0;

fn valid_hours_per_day(hours: f64) -> bool {
    hours.is_finite() && hours > 0.0 && hours <= MAX_HOURS_PER_DAY
}

fn validate_squad(squad: &SquadConfig) -> ReportResult<()> {
    if squad.members.is_empty() {
        return Err(ReportError::config(format!(
            "squad '{}' has no members",
            squad.name
        )));
    }
    for member in &squad.members {
        if member.id.trim().is_empty() {
            return Err(ReportError::config(format!(
                "squad '{}' has a member without id",
                squad.name
            )));
        }
        if !valid_hours_per_day(member.hours_per_day) {
            return Err(ReportError::config(format!(
                "member {} of '{}' must have hours_per_day in (0, {}]",
                member.id, squad.name, MAX_HOURS_PER_DAY
            )));
        }
    }
    Ok(())
}
