//! Tempo worklog export client.
//!
//! Uses the `tempo-getWorklog` servlet, which answers in XML.

use crate::client::http::check_status;
use crate::client::WorklogSource;
use crate::error::ClientError;
use crate::models::{Hours, Period, WorklogEntry};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// `<worklogs>` root element.
#[derive(Debug, Deserialize)]
struct WorklogsXml {
    #[serde(rename = "worklog", default)]
    worklogs: Vec<WorklogXml>,
}

#[derive(Debug, Deserialize)]
struct WorklogXml {
    issue_key: String,
    #[serde(default)]
    issue_summary: String,
    hours: f64,
    #[serde(default)]
    billing_key: Option<String>,
    issue_details: IssueDetailsXml,
}

#[derive(Debug, Deserialize)]
struct IssueDetailsXml {
    project_key: String,
    type_id: u64,
}

impl TryFrom<WorklogXml> for WorklogEntry {
    type Error = ClientError;

    fn try_from(xml: WorklogXml) -> Result<Self, Self::Error> {
        if !xml.hours.is_finite() || xml.hours <= 0.0 {
            return Err(ClientError::Malformed(format!(
                "worklog on {} has invalid hours {}",
                xml.issue_key, xml.hours
            )));
        }

        Ok(WorklogEntry {
            issue_key: xml.issue_key,
            issue_summary: xml.issue_summary.trim().to_string(),
            hours: Hours::from_hours(xml.hours),
            project_key: xml.issue_details.project_key,
            issue_type_id: xml.issue_details.type_id,
            billing_key: xml
                .billing_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        })
    }
}

/// Parse a Tempo XML export.
///
/// An export holding a single `<worklog>` yields a one-element list.
pub fn parse_worklogs(xml: &str) -> Result<Vec<WorklogEntry>, ClientError> {
    let parsed: WorklogsXml =
        quick_xml::de::from_str(xml).map_err(|e| ClientError::Malformed(e.to_string()))?;
    parsed
        .worklogs
        .into_iter()
        .map(WorklogEntry::try_from)
        .collect()
}

/// Client of the Tempo worklog servlet.
pub struct TempoClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl TempoClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/plugins/servlet/tempo-getWorklog/", self.base_url)
    }
}

#[async_trait]
impl WorklogSource for TempoClient {
    async fn worklogs(
        &self,
        user_id: &str,
        period: &Period,
    ) -> Result<Vec<WorklogEntry>, ClientError> {
        let date_from = period.start.format("%Y-%m-%d").to_string();
        let date_to = period.end.format("%Y-%m-%d").to_string();
        debug!("GET tempo worklogs of {} from {} to {}", user_id, date_from, date_to);

        let response = self
            .http
            .get(self.endpoint())
            .query(&[
                ("tempoApiToken", self.api_token.as_str()),
                ("userName", user_id),
                ("dateFrom", date_from.as_str()),
                ("dateTo", date_to.as_str()),
                ("format", "xml"),
                ("addIssueSummary", "true"),
                ("addIssueDetails", "true"),
                ("addParentIssue", "true"),
            ])
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        parse_worklogs(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_WORKLOGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worklogs date_from="2023-01-02" date_to="2023-01-13" number_of_worklogs="2" format="xml" userName="jdoe">
  <worklog>
    <worklog_id>1001</worklog_id>
    <issue_id>20001</issue_id>
    <issue_key>SQ-12</issue_key>
    <hours>1.5</hours>
    <work_date>2023-01-02</work_date>
    <username>jdoe</username>
    <billing_key/>
    <issue_summary>Login page &amp; session</issue_summary>
    <issue_details>
      <issue_key>SQ-12</issue_key>
      <issue_type>Story</issue_type>
      <project_key>SQ</project_key>
      <type_id>10001</type_id>
    </issue_details>
  </worklog>
  <worklog>
    <worklog_id>1002</worklog_id>
    <issue_key>TEMPO-3</issue_key>
    <hours>7</hours>
    <billing_key>OVERKIZ-SOT</billing_key>
    <issue_summary>Leave</issue_summary>
    <issue_details>
      <project_key>TEMPO</project_key>
      <type_id>3</type_id>
    </issue_details>
  </worklog>
</worklogs>"#;

    #[test]
    fn test_parse_worklogs() {
        let entries = parse_worklogs(TWO_WORKLOGS).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].issue_key, "SQ-12");
        assert_eq!(entries[0].issue_summary, "Login page & session");
        assert_eq!(entries[0].hours, Hours::from_hours(1.5));
        assert_eq!(entries[0].project_key, "SQ");
        assert_eq!(entries[0].issue_type_id, 10001);
        assert_eq!(entries[0].billing_key, None);

        assert_eq!(entries[1].billing_key.as_deref(), Some("OVERKIZ-SOT"));
        assert_eq!(entries[1].hours, Hours::from_hours(7.0));
    }

    #[test]
    fn test_single_worklog_is_a_list() {
        let xml = r#"<worklogs>
  <worklog>
    <issue_key>SQ-1</issue_key>
    <hours>2</hours>
    <issue_summary>Only one</issue_summary>
    <issue_details><project_key>SQ</project_key><type_id>1</type_id></issue_details>
  </worklog>
</worklogs>"#;
        let entries = parse_worklogs(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].issue_reference(), "SQ-1 Only one");
    }

    #[test]
    fn test_empty_export() {
        assert!(parse_worklogs("<worklogs></worklogs>").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_hours_are_malformed() {
        let xml = r#"<worklogs><worklog>
    <issue_key>SQ-1</issue_key>
    <hours>-1</hours>
    <issue_details><project_key>SQ</project_key><type_id>1</type_id></issue_details>
</worklog></worklogs>"#;
        assert!(matches!(
            parse_worklogs(xml),
            Err(ClientError::Malformed(_))
        ));
    }

    #[test]
    fn test_incomplete_worklog_is_malformed() {
        let missing_details = r#"<worklogs><worklog><issue_key>SQ-1</issue_key><hours>1</hours></worklog></worklogs>"#;
        assert!(matches!(
            parse_worklogs(missing_details),
            Err(ClientError::Malformed(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = TempoClient::new(reqwest::Client::new(), "https://jira.example.com/", "token");
        assert_eq!(
            client.endpoint(),
            "https://jira.example.com/plugins/servlet/tempo-getWorklog/"
        );
    }
}
