//! Shared HTTP client construction and status handling.

use crate::config::TlsConfig;
use crate::error::{ClientError, ReportError, Result};
use reqwest::{Client, Identity, Response, StatusCode};
use std::time::Duration;
use tracing::info;

/// Longest error body kept in a `ClientError::Status`.
const MAX_ERROR_BODY: usize = 200;

/// Build the client used for both Tempo and Jira.
pub fn build_http_client(timeout_seconds: u64, tls: &TlsConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("squadlog/", env!("CARGO_PKG_VERSION")));

    if let Some(ref path) = tls.certificate {
        let der = std::fs::read(path).map_err(|e| {
            ReportError::config(format!(
                "cannot read certificate {}: {}",
                path.display(),
                e
            ))
        })?;
        let identity = Identity::from_pkcs12_der(&der, tls.password.as_deref().unwrap_or(""))
            .map_err(|e| {
                ReportError::config(format!("invalid certificate {}: {}", path.display(), e))
            })?;
        info!("Using client certificate {}", path.display());
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| ReportError::config(format!("failed to create HTTP client: {}", e)))
}

/// Pass successful responses through, turn the rest into a `ClientError`.
pub async fn check_status(response: Response) -> std::result::Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ClientError::Unauthorized {
            status: status.as_u16(),
        };
    }
    let mut body = body.trim().to_string();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push('…');
    }
    ClientError::Status {
        status: status.as_u16(),
        body,
    }
}
