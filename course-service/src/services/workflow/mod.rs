//! Workflow engine integration.
//!
//! The engine runs opaque flows selected by a flow id. Every flow takes
//! string-typed parameters and answers with a JSON envelope whose `output`
//! field may itself be a JSON document encoded as a string.

pub mod client;
pub mod mock;

pub use client::WorkflowClient;
pub use mock::MockWorkflowEngine;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Normalized payload handed back to callers. Always an object.
pub type WorkflowResult = Map<String, Value>;

/// Caller identity sent with every invocation; this server is single-tenant.
pub const DEFAULT_UID: &str = "user_default";

/// Placeholder for optional outline parameters the caller left out.
pub const UNSPECIFIED: &str = "unspecified";

/// Key used when a payload has to be wrapped to stay an object.
pub const CONTENT_KEY: &str = "content";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("workflow engine returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("workflow call timed out, please retry later")]
    Timeout,

    #[error("workflow transport error: {0}")]
    Transport(String),

    #[error("workflow engine returned a non-JSON body: {0}")]
    MalformedEnvelope(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl WorkflowError {
    /// Metric label for this failure kind.
    pub fn outcome(&self) -> &'static str {
        match self {
            WorkflowError::Http { .. } => "http_error",
            WorkflowError::Timeout => "timeout",
            WorkflowError::Transport(_) => "transport_error",
            WorkflowError::MalformedEnvelope(_) => "malformed_envelope",
            WorkflowError::NotConfigured(_) => "not_configured",
        }
    }
}

/// A payload that doesn't match the shape its flow promises.
#[derive(Debug, Error)]
#[error("{shape} shape mismatch: {source}")]
pub struct ResponseShapeError {
    pub shape: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Try to read `result` as `T` without consuming it.
pub fn validate_shape<T: DeserializeOwned>(
    shape: &'static str,
    result: &WorkflowResult,
) -> Result<T, ResponseShapeError> {
    serde_json::from_value(Value::Object(result.clone()))
        .map_err(|source| ResponseShapeError { shape, source })
}

/// The two flows this service knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Outline,
    Detail,
}

impl Flow {
    pub fn label(self) -> &'static str {
        match self {
            Flow::Outline => "outline",
            Flow::Detail => "detail",
        }
    }

    /// Name of the setting that carries this flow's id.
    pub fn setting_name(self) -> &'static str {
        match self {
            Flow::Outline => "OUTLINE_FLOW_ID",
            Flow::Detail => "DETAIL_FLOW_ID",
        }
    }
}

/// Module description for the detail flow, either as structured JSON or
/// already serialized by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModuleInfo {
    Serialized(String),
    Structured(Map<String, Value>),
}

impl ModuleInfo {
    pub fn title(&self) -> Option<&str> {
        match self {
            ModuleInfo::Structured(map) => map.get("title").and_then(Value::as_str),
            ModuleInfo::Serialized(_) => None,
        }
    }

    /// Text form sent as the `MODULE_INFO` parameter.
    pub fn into_parameter(self) -> String {
        match self {
            ModuleInfo::Serialized(raw) => raw,
            ModuleInfo::Structured(map) => Value::Object(map).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineParams {
    pub textbook_content: String,
    pub grade_level: Option<String>,
    pub subject: Option<String>,
    pub module_count: u32,
}

impl OutlineParams {
    pub const DEFAULT_MODULE_COUNT: u32 = 4;

    pub fn new(textbook_content: impl Into<String>) -> Self {
        Self {
            textbook_content: textbook_content.into(),
            grade_level: None,
            subject: None,
            module_count: Self::DEFAULT_MODULE_COUNT,
        }
    }

    fn into_parameters(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("TEXTBOOK_CONTENT".to_string(), self.textbook_content),
            (
                "GRADE_LEVEL".to_string(),
                self.grade_level.unwrap_or_else(|| UNSPECIFIED.to_string()),
            ),
            (
                "SUBJECT".to_string(),
                self.subject.unwrap_or_else(|| UNSPECIFIED.to_string()),
            ),
            ("MODULE_COUNT".to_string(), self.module_count.to_string()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailParams {
    pub module_info: ModuleInfo,
    pub textbook_content: String,
    pub detail_level: String,
    pub exercise_count: u32,
}

impl DetailParams {
    pub const DEFAULT_DETAIL_LEVEL: &'static str = "standard";
    pub const DEFAULT_EXERCISE_COUNT: u32 = 5;

    pub fn new(module_info: ModuleInfo, textbook_content: impl Into<String>) -> Self {
        Self {
            module_info,
            textbook_content: textbook_content.into(),
            detail_level: Self::DEFAULT_DETAIL_LEVEL.to_string(),
            exercise_count: Self::DEFAULT_EXERCISE_COUNT,
        }
    }

    fn into_parameters(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("MODULE_INFO".to_string(), self.module_info.into_parameter()),
            ("TEXTBOOK_CONTENT".to_string(), self.textbook_content),
            ("DETAIL_LEVEL".to_string(), self.detail_level),
            ("EXERCISE_COUNT".to_string(), self.exercise_count.to_string()),
        ])
    }
}

/// Request body of one workflow call. Built per request and sent once.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WorkflowInvocation {
    flow_id: String,
    uid: String,
    parameters: BTreeMap<String, String>,
    stream: bool,
}

impl WorkflowInvocation {
    pub fn new(flow_id: impl Into<String>, parameters: BTreeMap<String, String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            uid: DEFAULT_UID.to_string(),
            parameters,
            stream: false,
        }
    }

    pub fn outline(flow_id: impl Into<String>, params: OutlineParams) -> Self {
        Self::new(flow_id, params.into_parameters())
    }

    pub fn detail(flow_id: impl Into<String>, params: DetailParams) -> Self {
        Self::new(flow_id, params.into_parameters())
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }
}

/// Decode a raw response body into a [`WorkflowResult`].
pub fn decode_envelope(body: &str) -> Result<WorkflowResult, WorkflowError> {
    let envelope: Value = serde_json::from_str(body)
        .map_err(|e| WorkflowError::MalformedEnvelope(e.to_string()))?;
    Ok(normalize_envelope(envelope))
}

/// Unwrap `output` from an already-parsed envelope.
///
/// At most two levels are unwrapped: the envelope, then a string-encoded
/// `output`. Anything that would not be an object ends up under
/// [`CONTENT_KEY`].
pub fn normalize_envelope(envelope: Value) -> WorkflowResult {
    let mut envelope = match envelope {
        Value::Object(map) => map,
        other => return wrap_content(other),
    };

    // A null `output` carries nothing to unwrap; the envelope (error codes,
    // session ids) is the only useful payload left.
    if matches!(envelope.get("output"), None | Some(Value::Null)) {
        return envelope;
    }

    match envelope.remove("output") {
        Some(Value::String(raw)) => decode_embedded(raw),
        Some(Value::Object(map)) => map,
        Some(other) => wrap_content(other),
        None => envelope,
    }
}

fn decode_embedded(raw: String) -> WorkflowResult {
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!("Workflow output decoded to a non-object, wrapping it");
            wrap_content(other)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Workflow output is not valid JSON, returning raw content");
            wrap_content(Value::String(raw))
        }
    }
}

fn wrap_content(value: Value) -> WorkflowResult {
    let mut map = Map::new();
    map.insert(CONTENT_KEY.to_string(), value);
    map
}

/// Seam between request handling and the workflow engine.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn invoke_outline_generation(
        &self,
        params: OutlineParams,
    ) -> Result<WorkflowResult, WorkflowError>;

    async fn invoke_detail_generation(
        &self,
        params: DetailParams,
    ) -> Result<WorkflowResult, WorkflowError>;
}
