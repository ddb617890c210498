//! Shapes the upstream flows are expected to produce.
//!
//! These are only used for best-effort validation and logging; callers always
//! receive the payload exactly as the workflow engine returned it.

use serde::{Deserialize, Serialize};

/// One teachable unit of a course outline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseModule {
    pub module_id: String,
    pub title: String,
    pub description: String,
    pub sequence: u32,
    pub duration_minutes: u32,
    pub learning_objectives: Vec<String>,
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseOutline {
    pub course_title: String,
    pub grade: String,
    pub subject: String,
    pub total_modules: u32,
    pub estimated_hours: u32,
    pub modules: Vec<CourseModule>,
}

impl CourseOutline {
    /// True when modules are numbered 1..=n in order.
    pub fn is_sequential(&self) -> bool {
        self.modules
            .iter()
            .enumerate()
            .all(|(i, m)| m.sequence as usize == i + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeachingSection {
    pub title: String,
    pub duration_minutes: u32,
    pub content: String,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeachingPlan {
    pub introduction: TeachingSection,
    pub main_content: TeachingSection,
    pub practice: TeachingSection,
    pub summary: TeachingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub answer: String,
    pub difficulty: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeachingExample {
    pub title: String,
    pub content: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleDetail {
    pub module_id: String,
    pub teaching_plan: TeachingPlan,
    pub examples: Vec<TeachingExample>,
    pub exercises: Vec<Exercise>,
    pub teaching_tips: Vec<String>,
}
