//! HTTP handlers for course-service.

pub mod generation;
pub mod health;

pub use generation::{generate_detail, generate_outline};
pub use health::{health_check, metrics, readiness_check, root};
