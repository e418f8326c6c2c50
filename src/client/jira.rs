//! Jira issue lookup client (agile REST API).

use crate::client::http::check_status;
use crate::client::IssueLookup;
use crate::error::ClientError;
use crate::models::IssueMetadata;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Client of `GET /rest/agile/1.0/issue/{key}`.
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    squad_field: String,
}

impl JiraClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        user: &str,
        password: &str,
        squad_field: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            password: password.to_string(),
            squad_field: squad_field.to_string(),
        }
    }

    fn issue_url(&self, key: &str) -> String {
        format!("{}/rest/agile/1.0/issue/{}", self.base_url, key)
    }
}

#[async_trait]
impl IssueLookup for JiraClient {
    async fn issue(&self, key: &str) -> Result<IssueMetadata, ClientError> {
        debug!("GET jira issue {}", key);

        let response = self
            .http
            .get(self.issue_url(key))
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        let body: Value = check_status(response).await?.json().await?;
        parse_issue(&body, &self.squad_field)
    }
}

/// Extract the metadata we need from an issue document.
///
/// The squad lives in a select custom field (`{"value": "..."}`); a missing
/// or null field means the issue is not affiliated with any squad.
pub fn parse_issue(body: &Value, squad_field: &str) -> Result<IssueMetadata, ClientError> {
    let key = body["key"]
        .as_str()
        .ok_or_else(|| ClientError::Malformed("issue without key".to_string()))?;

    let fields = body["fields"]
        .as_object()
        .ok_or_else(|| ClientError::Malformed(format!("issue {} without fields", key)))?;

    let project_key = fields
        .get("project")
        .and_then(|project| project["key"].as_str())
        .unwrap_or_default()
        .to_string();

    let squad_affiliation = match fields.get(squad_field) {
        None | Some(Value::Null) => None,
        Some(field) => Some(
            field["value"]
                .as_str()
                .ok_or_else(|| {
                    ClientError::Malformed(format!(
                        "issue {}: unexpected {} value {}",
                        key, squad_field, field
                    ))
                })?
                .to_string(),
        ),
    };

    Ok(IssueMetadata {
        key: key.to_string(),
        project_key,
        squad_affiliation,
    })
}
