use thiserror::Error;
use uuid::Uuid;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the submission pipeline. NotFound and Validation abort
/// a submission before anything is persisted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("module {0} not found")]
    ModuleNotFound(Uuid),

    #[error("course {0} not found")]
    CourseNotFound(Uuid),

    #[error("learner {0} not found")]
    LearnerNotFound(Uuid),

    #[error("invalid submission: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
