//! Data models for squad worklog reports.
//!
//! This module contains the core data structures shared by the
//! classification, aggregation and rendering stages.

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// An amount of logged time, held in whole seconds so sums are exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours(i64);

impl Hours {
    pub const ZERO: Hours = Hours(0);

    /// Convert decimal hours, rounding to the nearest second.
    pub fn from_hours(hours: f64) -> Self {
        Hours((hours * SECONDS_PER_HOUR).round() as i64)
    }

    pub fn seconds(self) -> i64 {
        self.0
    }

    pub fn as_hours(self) -> f64 {
        self.0 as f64 / SECONDS_PER_HOUR
    }

    /// Express the amount in working days of `hours_per_day`.
    pub fn as_days(self, hours_per_day: f64) -> f64 {
        if hours_per_day > 0.0 {
            self.as_hours() / hours_per_day
        } else {
            0.0
        }
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Hours {
    type Output = Hours;

    fn add(self, rhs: Hours) -> Hours {
        Hours(self.0 + rhs.0)
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Hours) {
        self.0 += rhs.0;
    }
}

impl Sub for Hours {
    type Output = Hours;

    fn sub(self, rhs: Hours) -> Hours {
        Hours(self.0 - rhs.0)
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Hours>>(iter: I) -> Self {
        iter.fold(Hours::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Hours> for Hours {
    fn sum<I: Iterator<Item = &'a Hours>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_decimal(self.as_hours()))
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_hours())
    }
}

/// Format a number with at most two decimals, dropping trailing zeros.
pub fn format_decimal(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn default_hours_per_day() -> f64 {
    8.0
}

/// A reporting period, e.g. one sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// First day of the period (inclusive).
    pub start: NaiveDate,
    /// Last day of the period (inclusive).
    pub end: NaiveDate,
    /// Number of working days in the period.
    pub working_days: u32,
    /// Length of a working day, used to express hours as days.
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: f64,
}

impl Period {
    /// Hours a member working `hours_per_day` is expected to log.
    pub fn expected_hours(&self, hours_per_day: f64) -> Hours {
        Hours::from_hours(f64::from(self.working_days) * hours_per_day)
    }
}

/// A squad member as reported under one squad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Tempo user name.
    pub id: String,
    /// Squad the member is currently reported under.
    pub squad_name: String,
    pub hours_per_day: f64,
}

/// A single logged time record against an issue.
#[derive(Debug, Clone, PartialEq)]
pub struct WorklogEntry {
    pub issue_key: String,
    pub issue_summary: String,
    pub hours: Hours,
    pub project_key: String,
    pub issue_type_id: u64,
    pub billing_key: Option<String>,
}

impl WorklogEntry {
    /// Reference shown for entries logged outside the squad.
    pub fn issue_reference(&self) -> String {
        format!("{} {}", self.issue_key, self.issue_summary)
    }
}

/// Issue metadata returned by Jira.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueMetadata {
    pub key: String,
    pub project_key: String,
    /// Value of the squad custom field; `None` when unaffiliated.
    pub squad_affiliation: Option<String>,
}

impl IssueMetadata {
    pub fn belongs_to(&self, squad_name: &str) -> bool {
        self.squad_affiliation.as_deref() == Some(squad_name)
    }
}

/// Work-type sub-category, distinguished by the Jira issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Grooming,
    Maintenance,
    Development,
}

impl WorkType {
    pub const ALL: [WorkType; 3] = [
        WorkType::Grooming,
        WorkType::Maintenance,
        WorkType::Development,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            WorkType::Grooming => "grooming",
            WorkType::Maintenance => "maintenance",
            WorkType::Development => "development",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkType::Grooming => "Grooming",
            WorkType::Maintenance => "TMA",
            WorkType::Development => "Dev",
        }
    }
}

/// How hours of a rule-defined category count toward the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    /// Counted as worked time.
    Worked,
    /// Logged but not worked (leave, administrative codes).
    Excluded,
    /// Worked for another team.
    NotInSquad,
}

/// The bucket a worklog entry is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// Category defined by a taxonomy rule.
    Rule { key: String, kind: BucketKind },
    /// Issue affiliated with the member's squad.
    Squad(WorkType),
    /// Issue not affiliated with the member's squad.
    OtherSquad(WorkType),
}

impl Category {
    pub fn rule(key: impl Into<String>, kind: BucketKind) -> Self {
        Category::Rule {
            key: key.into(),
            kind,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(
            self,
            Category::Rule {
                kind: BucketKind::Excluded,
                ..
            }
        )
    }

    pub fn is_not_in_squad(&self) -> bool {
        matches!(
            self,
            Category::OtherSquad(_)
                | Category::Rule {
                    kind: BucketKind::NotInSquad,
                    ..
                }
        )
    }

    pub fn key(&self) -> String {
        match self {
            Category::Rule { key, .. } => key.clone(),
            Category::Squad(work_type) => work_type.key().to_string(),
            Category::OtherSquad(work_type) => format!("other.{}", work_type.key()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Accumulated hours of one member or a whole squad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoursReport {
    /// Sum of every classified entry.
    pub logged: Hours,
    /// Hours the member(s) should have logged over the period.
    pub expected: Hours,
    /// Hours per category; categories never hit are absent.
    pub buckets: BTreeMap<Category, Hours>,
    /// Deduplicated `"{key} {summary}"` of entries outside the squad.
    pub other_issues: IndexSet<String>,
}

impl HoursReport {
    pub fn hours(&self, category: &Category) -> Hours {
        self.buckets.get(category).copied().unwrap_or_default()
    }

    pub fn excluded(&self) -> Hours {
        self.sum_where(Category::is_excluded)
    }

    pub fn worked(&self) -> Hours {
        self.logged - self.excluded()
    }

    pub fn not_in_squad(&self) -> Hours {
        self.sum_where(Category::is_not_in_squad)
    }

    pub fn other_squad(&self) -> Hours {
        self.sum_where(|c| matches!(c, Category::OtherSquad(_)))
    }

    /// In-squad plus other-squad hours of one work type.
    pub fn work_type_total(&self, work_type: WorkType) -> Hours {
        self.hours(&Category::Squad(work_type)) + self.hours(&Category::OtherSquad(work_type))
    }

    /// Sum over every bucket; equals `logged` for any folded report.
    pub fn bucket_total(&self) -> Hours {
        self.buckets.values().sum()
    }

    pub fn missing(&self) -> Hours {
        self.expected - self.logged
    }

    fn sum_where(&self, predicate: impl Fn(&Category) -> bool) -> Hours {
        self.buckets
            .iter()
            .filter(|(category, _)| predicate(category))
            .map(|(_, hours)| *hours)
            .sum()
    }
}

/// Report of one member.
#[derive(Debug, Clone, PartialEq)]
pub struct UserReport {
    pub user: User,
    pub hours: HoursReport,
}

/// A member whose report could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberFailure {
    pub user_id: String,
    pub reason: String,
}

/// Report of a squad over one period.
#[derive(Debug, Clone, PartialEq)]
pub struct SquadReport {
    pub squad: String,
    pub period_name: String,
    pub period: Period,
    /// Field-wise sum of every successful member report.
    pub hours: HoursReport,
    pub members: Vec<UserReport>,
    /// Members left out of `hours` because their computation failed.
    pub missing: Vec<MemberFailure>,
}

impl SquadReport {
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }
}
