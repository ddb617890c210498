pub mod course;
pub mod requests;

pub use course::{
    CourseModule, CourseOutline, Exercise, ModuleDetail, TeachingExample, TeachingPlan,
    TeachingSection,
};
pub use requests::{ApiResponse, GenerateDetailRequest, GenerateOutlineRequest};
