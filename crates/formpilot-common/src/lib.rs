pub mod error;
pub mod plan;

pub use error::{BackendError, FillError};
pub use plan::{
    Action, ActionStatus, ActionValue, ExecutionReport, FieldKind, FillPlan, Question, RunStatus,
    ScanReport,
};
