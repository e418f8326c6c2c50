//! Error types for report computation.
//!
//! `ClientError` describes what went wrong talking to Tempo or Jira;
//! `ReportError` adds which member or issue the failure belongs to.

use thiserror::Error;

/// Transport-level failure of an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The service could not be reached (connection refused, DNS, timeout).
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// The service rejected our credentials.
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    /// Short name of the failure kind, used in logs and rendered reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Unreachable(_) => "unreachable",
            ClientError::Unauthorized { .. } => "unauthorized",
            ClientError::Status { .. } => "http-status",
            ClientError::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            ClientError::Unreachable(e.to_string())
        } else if e.is_decode() {
            ClientError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ClientError::Unreachable(e.to_string())
        }
    }
}

/// Failure of a report computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Issue lookup failed while classifying an entry.
    #[error("lookup of issue {issue_key} failed ({kind}): {source}", kind = .source.kind())]
    Lookup {
        issue_key: String,
        #[source]
        source: ClientError,
    },

    /// Worklog retrieval failed for a member.
    #[error("worklogs of {user} could not be retrieved ({kind}): {source}", kind = .source.kind())]
    Source {
        user: String,
        #[source]
        source: ClientError,
    },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A member's report failed; wraps the underlying cause with the member id.
    #[error("report of {user} failed: {source}")]
    Member {
        user: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    pub fn config(message: impl Into<String>) -> Self {
        ReportError::Config(message.into())
    }

    /// Attach the member id unless the error already names it.
    pub fn for_member(self, user: &str) -> Self {
        match self {
            ReportError::Source { .. } | ReportError::Member { .. } => self,
            other => ReportError::Member {
                user: user.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
