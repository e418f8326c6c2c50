//! Category taxonomy expressed as ordered data.
//!
//! Rules are evaluated top to bottom and the first one whose predicate
//! matches decides the category. Entries matching no rule fall through to
//! the squad-membership check performed by the classifier.

use crate::error::{ReportError, Result};
use crate::models::{BucketKind, Category, WorkType, WorklogEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Condition on a single worklog field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    IssueKey(String),
    ProjectKey(String),
    BillingKey(String),
}

impl Predicate {
    pub fn matches(&self, entry: &WorklogEntry) -> bool {
        match self {
            Predicate::IssueKey(key) => entry.issue_key == *key,
            Predicate::ProjectKey(key) => entry.project_key == *key,
            Predicate::BillingKey(key) => entry.billing_key.as_deref() == Some(key.as_str()),
        }
    }
}

/// One `(predicate, category)` pair of the taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Category key, e.g. `cp_rtt`.
    pub category: String,
    /// Display label; defaults to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: BucketKind,
    pub when: Predicate,
}

impl Rule {
    pub fn new(category: &str, label: &str, kind: BucketKind, when: Predicate) -> Self {
        Self {
            category: category.to_string(),
            label: Some(label.to_string()),
            kind,
            when,
        }
    }

    pub fn to_category(&self) -> Category {
        Category::rule(self.category.clone(), self.kind)
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.category)
    }
}

/// The ordered rule list plus the issue types that split work types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default = "default_grooming_type_id")]
    pub grooming_type_id: u64,

    #[serde(default = "default_maintenance_type_id")]
    pub maintenance_type_id: u64,

    #[serde(default = "default_rules")]
    pub rules: Vec<Rule>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            grooming_type_id: default_grooming_type_id(),
            maintenance_type_id: default_maintenance_type_id(),
            rules: default_rules(),
        }
    }
}

fn default_grooming_type_id() -> u64 {
    10402
}

fn default_maintenance_type_id() -> u64 {
    10102
}

fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "cp_rtt",
            "CP/RTT",
            BucketKind::Excluded,
            Predicate::IssueKey("TEMPO-3".to_string()),
        ),
        Rule::new(
            "cse",
            "CSE",
            BucketKind::NotInSquad,
            Predicate::IssueKey("TEMPO-2".to_string()),
        ),
        Rule::new(
            "da",
            "DA",
            BucketKind::NotInSquad,
            Predicate::ProjectKey("DA".to_string()),
        ),
        Rule::new(
            "ar",
            "AR",
            BucketKind::Worked,
            Predicate::ProjectKey("AR".to_string()),
        ),
        Rule::new(
            "sot",
            "SOT",
            BucketKind::Worked,
            Predicate::BillingKey("OVERKIZ-SOT".to_string()),
        ),
    ]
}

impl Taxonomy {
    /// First rule matching the entry, if any.
    pub fn first_match(&self, entry: &WorklogEntry) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.when.matches(entry))
    }

    /// Work type of an issue type id.
    pub fn work_type(&self, issue_type_id: u64) -> WorkType {
        if issue_type_id == self.grooming_type_id {
            WorkType::Grooming
        } else if issue_type_id == self.maintenance_type_id {
            WorkType::Maintenance
        } else {
            WorkType::Development
        }
    }

    /// Rule categories in rule order, without duplicates.
    pub fn rule_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = Vec::new();
        for rule in &self.rules {
            let category = rule.to_category();
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }

    /// Display label of any category.
    pub fn label(&self, category: &Category) -> String {
        match category {
            Category::Rule { key, .. } => self
                .rules
                .iter()
                .find(|rule| rule.category == *key)
                .map(|rule| rule.label().to_string())
                .unwrap_or_else(|| key.clone()),
            Category::Squad(work_type) | Category::OtherSquad(work_type) => {
                work_type.label().to_string()
            }
        }
    }

    /// Check the rule list is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.grooming_type_id == self.maintenance_type_id {
            return Err(ReportError::config(format!(
                "grooming and maintenance share issue type id {}",
                self.grooming_type_id
            )));
        }

        let reserved: Vec<String> = WorkType::ALL
            .iter()
            .map(|w| w.key().to_string())
            .chain(WorkType::ALL.iter().map(|w| format!("other.{}", w.key())))
            .collect();

        let mut kinds: HashMap<&str, BucketKind> = HashMap::new();
        for rule in &self.rules {
            if rule.category.trim().is_empty() {
                return Err(ReportError::config("taxonomy rule with an empty category"));
            }
            if reserved.contains(&rule.category) {
                return Err(ReportError::config(format!(
                    "taxonomy category '{}' is reserved for work types",
                    rule.category
                )));
            }
            match kinds.insert(rule.category.as_str(), rule.kind) {
                Some(previous) if previous != rule.kind => {
                    return Err(ReportError::config(format!(
                        "taxonomy category '{}' declared as both {:?} and {:?}",
                        rule.category, previous, rule.kind
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
