//! Assessment pipeline
//!
//! [`AssessmentPipeline`] drives one submission from repository reference to
//! persisted record. [`AssessmentScheduler`] runs many of them concurrently.

pub mod assessment;
pub mod error;
pub mod persister;
pub mod scheduler;

pub use assessment::{AssessmentPipeline, PipelineBuilder, VisibilityPolicy};
pub use error::{AssessmentError, INACCESSIBLE_REASON};
pub use persister::{PendingRun, ResultPersister, INTERRUPTED_REASON};
pub use scheduler::{AssessmentJob, AssessmentScheduler};
