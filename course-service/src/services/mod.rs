pub mod dispatcher;
pub mod metrics;
pub mod workflow;

pub use dispatcher::{DetailData, Generated, GenerationError, OutlineData, RequestDispatcher};
pub use self::metrics::{get_metrics, init_metrics, record_invocation, record_shape_mismatch};
pub use workflow::{
    MockWorkflowEngine, WorkflowClient, WorkflowEngine, WorkflowError, WorkflowResult,
};
