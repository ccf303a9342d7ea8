// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget extraction with webhook delivery.
//!
//! The caller gets an acknowledgement immediately; the result is POSTed
//! to `webhook_url` when the orchestrator finishes. Delivery failures are
//! logged and go nowhere else.

use crate::error::{ExtractError, ExtractResult};
use crate::orchestrator::Orchestrator;
use crate::types::{validate_url, ExtractedArticle, ExtractionRequest, ExtractionResult, RoutingOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Timeout for one webhook POST.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Extraction request plus where to deliver the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRequest {
    #[serde(flatten)]
    pub request: ExtractionRequest,
    pub webhook_url: String,
    /// Echoed back untouched in the delivery.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl WebhookRequest {
    pub fn validate(&self) -> Result<(), ExtractError> {
        self.request.validate()?;
        validate_url(&self.webhook_url).map_err(|_| {
            ExtractError::InvalidRequest(format!(
                "webhook_url must start with http:// or https://, got '{}'",
                self.webhook_url
            ))
        })
    }
}

/// Immediate reply to a webhook request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub accepted: bool,
    pub url: String,
    pub webhook_url: String,
}

/// Body POSTed to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub success: bool,
    pub original_url: String,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<ExtractedArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub routing_decision: RoutingOutcome,
    pub attempts: u32,
    /// RFC 3339 completion time.
    pub timestamp: String,
}

impl CallbackPayload {
    pub fn from_result(job: &WebhookRequest, result: ExtractionResult) -> Self {
        Self {
            success: result.success,
            original_url: job.request.url.clone(),
            metadata: job.metadata.clone(),
            parsed_data: result.data,
            error: result.error,
            routing_decision: result.routing_decision,
            attempts: result.attempts,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Runs webhook jobs on background tasks.
#[derive(Clone)]
pub struct CallbackDispatcher {
    orchestrator: Orchestrator,
    client: reqwest::Client,
}

impl CallbackDispatcher {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            orchestrator,
            client,
        }
    }

    /// Start the job in the background and acknowledge at once. The
    /// returned handle may be dropped; the task keeps running.
    pub fn spawn(&self, job: WebhookRequest) -> (CallbackAck, JoinHandle<()>) {
        let ack = CallbackAck {
            accepted: true,
            url: job.request.url.clone(),
            webhook_url: job.webhook_url.clone(),
        };

        let dispatcher = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = dispatcher.run(job).await {
                warn!(error = %e, "webhook job finished without delivery");
            }
        });

        (ack, handle)
    }

    /// Extract and deliver, in the foreground.
    pub async fn run(&self, job: WebhookRequest) -> ExtractResult<()> {
        let result = self.orchestrator.extract(&job.request).await;
        let payload = CallbackPayload::from_result(&job, result);
        self.deliver(&job.webhook_url, &payload).await
    }

    async fn deliver(&self, webhook_url: &str, payload: &CallbackPayload) -> ExtractResult<()> {
        let resp = self
            .client
            .post(webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ExtractError::Callback(format!("POST {webhook_url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractError::Callback(format!(
                "POST {webhook_url}: HTTP {status}"
            )));
        }

        info!(
            webhook_url = %webhook_url,
            url = %payload.original_url,
            success = payload.success,
            "webhook delivered"
        );
        Ok(())
    }
}
