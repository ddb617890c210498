//! HTTP client for the workflow engine.

use super::{
    decode_envelope, DetailParams, Flow, OutlineParams, WorkflowEngine, WorkflowError,
    WorkflowInvocation, WorkflowResult,
};
use crate::config::WorkflowSettings;
use crate::services::metrics::record_invocation;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Instant;

/// Calls the engine's single run endpoint.
///
/// Holds only static settings and a pooled `reqwest::Client`, so one instance
/// is shared by all requests. Dropping an in-flight call future aborts the
/// outbound request and returns its connection to the pool.
pub struct WorkflowClient {
    settings: WorkflowSettings,
    client: Client,
}

impl WorkflowClient {
    pub fn new(settings: WorkflowSettings) -> Result<Self, WorkflowError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| WorkflowError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    pub fn outline_invocation(&self, params: OutlineParams) -> WorkflowInvocation {
        WorkflowInvocation::outline(self.settings.outline_flow_id.clone(), params)
    }

    pub fn detail_invocation(&self, params: DetailParams) -> WorkflowInvocation {
        WorkflowInvocation::detail(self.settings.detail_flow_id.clone(), params)
    }

    #[tracing::instrument(skip_all, fields(flow = flow.label(), flow_id = %invocation.flow_id()))]
    async fn execute(
        &self,
        flow: Flow,
        invocation: WorkflowInvocation,
    ) -> Result<WorkflowResult, WorkflowError> {
        if self.settings.api_url.is_empty() {
            return Err(WorkflowError::NotConfigured("WORKFLOW_API_URL"));
        }
        if invocation.flow_id().is_empty() {
            return Err(WorkflowError::NotConfigured(flow.setting_name()));
        }

        let start = Instant::now();
        let result = self.send(&invocation).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(payload) => {
                tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    keys = payload.len(),
                    "Workflow call succeeded"
                );
                record_invocation(flow.label(), "success", elapsed);
            }
            Err(e) => {
                tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Workflow call failed"
                );
                record_invocation(flow.label(), e.outcome(), elapsed);
            }
        }

        result
    }

    async fn send(&self, invocation: &WorkflowInvocation) -> Result<WorkflowResult, WorkflowError> {
        tracing::debug!(
            parameters = ?invocation.parameters().keys().collect::<Vec<_>>(),
            content_chars = invocation
                .parameters()
                .get("TEXTBOOK_CONTENT")
                .map(|c| c.chars().count())
                .unwrap_or(0),
            "Sending workflow request"
        );

        let response = self
            .client
            .post(&self.settings.api_url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(self.settings.bearer_credential())
            .json(invocation)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        status = status.as_u16(),
                        error = %e,
                        "Failed to read workflow error body"
                    );
                    String::new()
                }
            };
            tracing::warn!(status = status.as_u16(), body = %body, "Workflow engine error response");
            return Err(WorkflowError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(classify)?;
        decode_envelope(&body)
    }
}

fn classify(err: reqwest::Error) -> WorkflowError {
    if err.is_timeout() {
        WorkflowError::Timeout
    } else {
        WorkflowError::Transport(err.to_string())
    }
}

#[async_trait]
impl WorkflowEngine for WorkflowClient {
    async fn invoke_outline_generation(
        &self,
        params: OutlineParams,
    ) -> Result<WorkflowResult, WorkflowError> {
        let invocation = self.outline_invocation(params);
        self.execute(Flow::Outline, invocation).await
    }

    async fn invoke_detail_generation(
        &self,
        params: DetailParams,
    ) -> Result<WorkflowResult, WorkflowError> {
        let invocation = self.detail_invocation(params);
        self.execute(Flow::Detail, invocation).await
    }
}
