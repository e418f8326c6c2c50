//! External collaborators: Tempo worklogs and Jira issue metadata.
//!
//! The pipeline only sees the two traits below; the HTTP clients are
//! swapped for in-memory fakes in tests.

pub mod cache;
pub mod http;
pub mod jira;
pub mod tempo;

use crate::error::ClientError;
use crate::models::{IssueMetadata, Period, WorklogEntry};
use async_trait::async_trait;

pub use cache::CachedLookup;
pub use http::build_http_client;
pub use jira::JiraClient;
pub use tempo::TempoClient;

/// Source of a member's worklog entries over a period.
#[async_trait]
pub trait WorklogSource: Send + Sync {
    async fn worklogs(
        &self,
        user_id: &str,
        period: &Period,
    ) -> Result<Vec<WorklogEntry>, ClientError>;
}

/// Source of issue metadata by key.
#[async_trait]
pub trait IssueLookup: Send + Sync {
    async fn issue(&self, key: &str) -> Result<IssueMetadata, ClientError>;
}
