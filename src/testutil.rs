//! Test utilities for squadlog.
//!
//! In-memory stand-ins for Tempo and Jira that record every call, plus
//! builders for the entries, users and periods the tests share.

use crate::client::{IssueLookup, WorklogSource};
use crate::error::ClientError;
use crate::models::{Hours, IssueMetadata, Period, User, WorklogEntry};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared call counter, cloned out of a fake before it is moved.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<HashMap<String, usize>>>);

impl CallLog {
    fn record(&self, key: &str) {
        let mut calls = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *calls.entry(key.to_string()).or_default() += 1;
    }

    pub fn count(&self, key: &str) -> usize {
        let calls = self.0.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        let calls = self.0.lock().unwrap_or_else(|e| e.into_inner());
        calls.values().sum()
    }
}

/// Jira stand-in keyed by issue key.
#[derive(Debug, Default)]
pub struct FakeLookup {
    issues: HashMap<String, IssueMetadata>,
    failures: HashMap<String, ClientError>,
    calls: CallLog,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, key: &str, squad: Option<&str>) -> Self {
        let project_key = key.split('-').next().unwrap_or(key).to_string();
        self.issues.insert(
            key.to_string(),
            IssueMetadata {
                key: key.to_string(),
                project_key,
                squad_affiliation: squad.map(String::from),
            },
        );
        self
    }

    pub fn with_failure(mut self, key: &str, error: ClientError) -> Self {
        self.failures.insert(key.to_string(), error);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl IssueLookup for FakeLookup {
    async fn issue(&self, key: &str) -> Result<IssueMetadata, ClientError> {
        self.calls.record(key);
        if let Some(error) = self.failures.get(key) {
            return Err(error.clone());
        }
        self.issues.get(key).cloned().ok_or(ClientError::Status {
            status: 404,
            body: format!("Issue Does Not Exist: {}", key),
        })
    }
}

/// Tempo stand-in keyed by user id.
#[derive(Debug, Default)]
pub struct FakeSource {
    worklogs: HashMap<String, Vec<WorklogEntry>>,
    failures: HashMap<String, ClientError>,
    calls: CallLog,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worklogs(mut self, user_id: &str, entries: Vec<WorklogEntry>) -> Self {
        self.worklogs.insert(user_id.to_string(), entries);
        self
    }

    pub fn with_failure(mut self, user_id: &str, error: ClientError) -> Self {
        self.failures.insert(user_id.to_string(), error);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl WorklogSource for FakeSource {
    async fn worklogs(
        &self,
        user_id: &str,
        _period: &Period,
    ) -> Result<Vec<WorklogEntry>, ClientError> {
        self.calls.record(user_id);
        if let Some(error) = self.failures.get(user_id) {
            return Err(error.clone());
        }
        Ok(self.worklogs.get(user_id).cloned().unwrap_or_default())
    }
}

/// A development entry in the project named by the key prefix.
pub fn entry(issue_key: &str, hours: f64) -> WorklogEntry {
    typed_entry(issue_key, hours, 1)
}

pub fn typed_entry(issue_key: &str, hours: f64, issue_type_id: u64) -> WorklogEntry {
    WorklogEntry {
        issue_key: issue_key.to_string(),
        issue_summary: format!("Summary of {}", issue_key),
        hours: Hours::from_hours(hours),
        project_key: issue_key.split('-').next().unwrap_or(issue_key).to_string(),
        issue_type_id,
        billing_key: None,
    }
}

/// Ten working days of eight hours.
pub fn period() -> Period {
    Period {
        start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        end: NaiveDate::from_ymd_opt(2023, 1, 13).unwrap(),
        working_days: 10,
        hours_per_day: 8.0,
    }
}

pub fn user(id: &str, squad_name: &str) -> User {
    User {
        id: id.to_string(),
        squad_name: squad_name.to_string(),
        hours_per_day: 8.0,
    }
}
