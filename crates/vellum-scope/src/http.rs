//! Identity lookup against a remote identity service.

use crate::config::{IdentityClientConfig, ScopeConfig};
use crate::error::{ScopeError, ScopeResult};
use crate::lookup::IdentityLookup;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use vellum_core::{CallerId, WireMessage};
use vellum_schema::{catalog, json, SchemaRegistry};

#[derive(Debug, Serialize)]
struct ListAssociatesRequest<'a> {
    caller: &'a str,
}

/// Calls `POST {endpoint}/identity/listAssociates` on a Vellum identity
/// service.
///
/// The response body is newline-delimited JSON, one associate per line. A
/// trailing line carrying an `error` object aborts the lookup.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    registry: Arc<SchemaRegistry>,
    config: IdentityClientConfig,
    scope: ScopeConfig,
}

impl HttpIdentityClient {
    /// Builds a client.
    pub fn new(
        config: IdentityClientConfig,
        scope: ScopeConfig,
        registry: Arc<SchemaRegistry>,
    ) -> ScopeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ScopeError::unavailable(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            registry,
            config,
            scope,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/identity/listAssociates",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityClient {
    async fn list_associates(&self, caller: &CallerId) -> ScopeResult<Vec<WireMessage>> {
        let url = self.url();
        debug!(url = %url, caller = %caller.log_id(), "listing associates");

        let response = self
            .client
            .post(&url)
            .header("x-caller-id", caller.as_str())
            .json(&ListAssociatesRequest {
                caller: caller.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), "identity service failed");
            return Err(ScopeError::unavailable(format!(
                "identity service returned status {status}"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ScopeError::IdentityRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_associates(&self.registry, &body)
    }

    fn is_privileged(&self, caller: &CallerId) -> bool {
        self.scope.is_privileged(caller.as_str())
    }
}

/// Parses an NDJSON `listAssociates` body.
pub(crate) fn parse_associates(
    registry: &SchemaRegistry,
    body: &str,
) -> ScopeResult<Vec<WireMessage>> {
    let mut associates = Vec::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| ScopeError::InvalidResponse(e.to_string()))?;
        if let Some(error) = value.get("error") {
            let retryable = error
                .get("retryable")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            let message = error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("identity stream aborted")
                .to_string();
            return Err(if retryable {
                ScopeError::IdentityUnavailable(message)
            } else {
                ScopeError::InvalidResponse(message)
            });
        }
        associates.push(json::from_json(registry, catalog::ASSOCIATE, &value)?);
    }
    Ok(associates)
}
