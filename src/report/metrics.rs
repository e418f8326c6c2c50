//! Ratios shown in rendered reports.

use crate::classify::Taxonomy;
use crate::models::{Category, Hours, HoursReport, WorkType};
use serde::{Serialize, Serializer};
use std::fmt;

/// A percentage that is undefined when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percent(Option<f64>);

impl Percent {
    /// `part / whole × 100`, undefined when `whole` is zero.
    pub fn of(part: Hours, whole: Hours) -> Self {
        if whole.is_zero() {
            Percent(None)
        } else {
            Percent(Some(part.seconds() as f64 * 100.0 / whole.seconds() as f64))
        }
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{:.2}%", value),
            None => f.write_str("N/A"),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_some(&((value * 100.0).round() / 100.0)),
            None => serializer.serialize_none(),
        }
    }
}

/// One line of the breakdown: hours and share of worked hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub key: String,
    pub label: String,
    pub hours: Hours,
    /// Share of worked hours.
    pub share: Percent,
}

/// Everything the renderers derive from an `HoursReport`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetrics {
    pub logged: Hours,
    pub expected: Hours,
    pub completion: Percent,
    /// `expected − logged`; negative when overtime was logged.
    pub missing: Hours,
    pub worked: Hours,
    /// Categories excluded from worked hours (leave, admin codes).
    pub excluded: Vec<Share>,
    /// Work types, in-squad and other-squad hours combined.
    pub work_types: Vec<Share>,
    /// Rule categories counted as worked.
    pub worked_categories: Vec<Share>,
    pub not_in_squad: Hours,
    pub not_in_squad_share: Percent,
    /// Not-in-squad rule categories.
    pub not_in_squad_categories: Vec<Share>,
    pub other_squad: Hours,
    /// Work types of issues owned by other squads.
    pub other_squad_work_types: Vec<Share>,
    pub other_issues: Vec<String>,
}

impl ReportMetrics {
    pub fn compute(report: &HoursReport, taxonomy: &Taxonomy) -> Self {
        let worked = report.worked();
        let share = |category: &Category, hours: Hours| Share {
            key: category.key(),
            label: taxonomy.label(category),
            hours,
            share: Percent::of(hours, worked),
        };

        // Configured rule categories first, then any the report carries that
        // the taxonomy no longer names.
        let mut rule_categories = taxonomy.rule_categories();
        for category in report.buckets.keys() {
            if matches!(category, Category::Rule { .. }) && !rule_categories.contains(category) {
                rule_categories.push(category.clone());
            }
        }

        let rule_shares = |pick: fn(&Category) -> bool| -> Vec<Share> {
            rule_categories
                .iter()
                .filter(|category| pick(category))
                .map(|category| share(category, report.hours(category)))
                .collect()
        };

        Self {
            logged: report.logged,
            expected: report.expected,
            completion: Percent::of(report.logged, report.expected),
            missing: report.missing(),
            worked,
            excluded: rule_shares(Category::is_excluded),
            work_types: WorkType::ALL
                .iter()
                .map(|w| share(&Category::Squad(*w), report.work_type_total(*w)))
                .collect(),
            worked_categories: rule_shares(|c| !c.is_excluded() && !c.is_not_in_squad()),
            not_in_squad: report.not_in_squad(),
            not_in_squad_share: Percent::of(report.not_in_squad(), worked),
            not_in_squad_categories: rule_shares(Category::is_not_in_squad),
            other_squad: report.other_squad(),
            other_squad_work_types: WorkType::ALL
                .iter()
                .map(|w| {
                    let category = Category::OtherSquad(*w);
                    share(&category, report.hours(&category))
                })
                .collect(),
            other_issues: report.other_issues.iter().cloned().collect(),
        }
    }
}
