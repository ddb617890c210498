use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::services::workflow::{DetailParams, ModuleInfo, OutlineParams};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateOutlineRequest {
    #[validate(custom(function = "not_blank"))]
    pub textbook_content: String,
    pub grade_level: Option<String>,
    pub subject: Option<String>,
    pub module_count: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateDetailRequest {
    pub module_info: ModuleInfo,
    #[validate(custom(function = "not_blank"))]
    pub textbook_content: String,
    pub detail_level: Option<String>,
    pub exercise_count: Option<u32>,
}

impl From<GenerateOutlineRequest> for OutlineParams {
    fn from(request: GenerateOutlineRequest) -> Self {
        OutlineParams {
            textbook_content: request.textbook_content,
            grade_level: non_blank(request.grade_level),
            subject: non_blank(request.subject),
            module_count: request
                .module_count
                .filter(|n| *n > 0)
                .unwrap_or(OutlineParams::DEFAULT_MODULE_COUNT),
        }
    }
}

impl From<GenerateDetailRequest> for DetailParams {
    fn from(request: GenerateDetailRequest) -> Self {
        DetailParams {
            module_info: request.module_info,
            textbook_content: request.textbook_content,
            detail_level: non_blank(request.detail_level)
                .unwrap_or_else(|| DetailParams::DEFAULT_DETAIL_LEVEL.to_string()),
            exercise_count: request
                .exercise_count
                .filter(|n| *n > 0)
                .unwrap_or(DetailParams::DEFAULT_EXERCISE_COUNT),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("textbook_content cannot be empty"));
        return Err(error);
    }
    Ok(())
}

// Callers send "" for "not chosen" as often as they omit the field.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Success envelope for generation endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}
