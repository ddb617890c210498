//! Turns validated generation requests into workflow calls.
//!
//! Shape validation here is advisory: a payload that doesn't look like a
//! course outline or module detail is logged and counted, then returned to
//! the caller untouched.

use crate::models::{CourseOutline, GenerateDetailRequest, GenerateOutlineRequest, ModuleDetail};
use crate::services::metrics::record_shape_mismatch;
use crate::services::workflow::{
    validate_shape, DetailParams, Flow, OutlineParams, WorkflowEngine, WorkflowError,
    WorkflowResult,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

/// Raw workflow payload plus its typed reading, when the shape matched.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub data: WorkflowResult,
    pub validated: Option<T>,
}

pub type OutlineData = Generated<CourseOutline>;
pub type DetailData = Generated<ModuleDetail>;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to generate course outline: {0}")]
    Outline(#[source] WorkflowError),

    #[error("Failed to generate module detail: {0}")]
    Detail(#[source] WorkflowError),
}

impl GenerationError {
    pub fn cause(&self) -> &WorkflowError {
        match self {
            GenerationError::Outline(e) | GenerationError::Detail(e) => e,
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        let message = err.to_string();
        match err.cause() {
            WorkflowError::Timeout => AppError::GatewayTimeout(message),
            WorkflowError::NotConfigured(_) => AppError::ServiceUnavailable(message),
            WorkflowError::Http { .. }
            | WorkflowError::Transport(_)
            | WorkflowError::MalformedEnvelope(_) => AppError::BadGateway(message),
        }
    }
}

#[derive(Clone)]
pub struct RequestDispatcher {
    engine: Arc<dyn WorkflowEngine>,
}

impl RequestDispatcher {
    pub fn new(engine: Arc<dyn WorkflowEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle_outline_request(
        &self,
        request: GenerateOutlineRequest,
    ) -> Result<OutlineData, GenerationError> {
        let params = OutlineParams::from(request);

        tracing::info!(
            content_chars = params.textbook_content.chars().count(),
            grade_level = ?params.grade_level,
            subject = ?params.subject,
            module_count = params.module_count,
            "Outline generation requested"
        );

        let data = self
            .engine
            .invoke_outline_generation(params)
            .await
            .map_err(GenerationError::Outline)?;

        let validated = check_shape::<CourseOutline>(Flow::Outline, &data);
        if let Some(outline) = &validated {
            tracing::info!(
                course_title = %outline.course_title,
                modules = outline.modules.len(),
                total_modules = outline.total_modules,
                sequential = outline.is_sequential(),
                "Outline generated"
            );
        }

        Ok(Generated { data, validated })
    }

    pub async fn handle_detail_request(
        &self,
        request: GenerateDetailRequest,
    ) -> Result<DetailData, GenerationError> {
        let params = DetailParams::from(request);

        tracing::info!(
            module = params.module_info.title().unwrap_or("-"),
            content_chars = params.textbook_content.chars().count(),
            detail_level = %params.detail_level,
            exercise_count = params.exercise_count,
            "Module detail generation requested"
        );

        let data = self
            .engine
            .invoke_detail_generation(params)
            .await
            .map_err(GenerationError::Detail)?;

        let validated = check_shape::<ModuleDetail>(Flow::Detail, &data);
        if let Some(detail) = &validated {
            tracing::info!(
                module_id = %detail.module_id,
                examples = detail.examples.len(),
                exercises = detail.exercises.len(),
                "Module detail generated"
            );
        }

        Ok(Generated { data, validated })
    }
}

fn check_shape<T: DeserializeOwned>(flow: Flow, data: &WorkflowResult) -> Option<T> {
    match validate_shape::<T>(flow.label(), data) {
        Ok(value) => Some(value),
        Err(e) => {
            record_shape_mismatch(flow.label());
            tracing::warn!(
                error = %e,
                raw = %serde_json::Value::Object(data.clone()),
                "Workflow payload does not match the expected shape, returning it as-is"
            );
            None
        }
    }
}
