//! In-process engine used to exercise request handling without an upstream.

use super::{
    DetailParams, OutlineParams, WorkflowEngine, WorkflowError, WorkflowInvocation,
    WorkflowResult,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Answers every call with a fixed outcome and remembers what it was sent.
pub struct MockWorkflowEngine {
    response: Result<WorkflowResult, WorkflowError>,
    call_count: AtomicU64,
    invocations: Mutex<Vec<WorkflowInvocation>>,
}

impl MockWorkflowEngine {
    pub fn returning(result: WorkflowResult) -> Self {
        Self::with_response(Ok(result))
    }

    pub fn failing(error: WorkflowError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<WorkflowResult, WorkflowError>) -> Self {
        Self {
            response,
            call_count: AtomicU64::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Invocations as they would have gone on the wire, oldest first.
    pub async fn invocations(&self) -> Vec<WorkflowInvocation> {
        self.invocations.lock().await.clone()
    }

    async fn record(&self, invocation: WorkflowInvocation) -> Result<WorkflowResult, WorkflowError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            flow_id = %invocation.flow_id(),
            parameters = invocation.parameters().len(),
            "[MOCK] Workflow would be invoked"
        );

        self.invocations.lock().await.push(invocation);
        self.response.clone()
    }
}

#[async_trait]
impl WorkflowEngine for MockWorkflowEngine {
    async fn invoke_outline_generation(
        &self,
        params: OutlineParams,
    ) -> Result<WorkflowResult, WorkflowError> {
        self.record(WorkflowInvocation::outline("mock-outline-flow", params))
            .await
    }

    async fn invoke_detail_generation(
        &self,
        params: DetailParams,
    ) -> Result<WorkflowResult, WorkflowError> {
        self.record(WorkflowInvocation::detail("mock-detail-flow", params))
            .await
    }
}
