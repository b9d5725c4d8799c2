// ABOUTME: Error types for document workflow operations
// ABOUTME: Lifecycle and lock violations are synchronous rejections, never retried automatically

use doculens_core::ReviewStatus;
use doculens_storage::StorageError;
use thiserror::Error;

use crate::actor::Capability;
use crate::lock_policy::Operation;
use crate::review_workflow::ReviewAction;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Cannot {action} a document that is {from}")]
    InvalidTransition {
        action: ReviewAction,
        from: ReviewStatus,
    },

    #[error("Document is locked while {status}: {operation} is not permitted")]
    Locked {
        operation: Operation,
        status: ReviewStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{actor_id} does not have {capability} capability")]
    Forbidden {
        actor_id: String,
        capability: Capability,
    },

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Generation failed for section {section_id}: {message}")]
    GenerationFailed { section_id: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for DocumentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput(msg) => DocumentError::Validation(msg),
            other => DocumentError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
