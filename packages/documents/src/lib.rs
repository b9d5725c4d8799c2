// ABOUTME: DocuLens document generation and review orchestration
// ABOUTME: Review state machine, edit lock policy, batch generation with progress, and the editor controller

pub mod actor;
pub mod editor;
pub mod error;
pub mod export;
pub mod lock_policy;
pub mod orchestrator;
pub mod progress;
pub mod review_workflow;

pub use actor::{Actor, Capability};
pub use editor::{DocumentEditor, SaveOutcome};
pub use error::{DocumentError, Result};
pub use export::{can_export, export_document, ExportFormat, ExportOptions, ExportResult};
pub use lock_policy::{is_locked, Operation, PermittedActions};
pub use orchestrator::{
    BatchEvent, BatchOutcome, BatchReport, BatchSummary, CancelHandle, FailedSection,
    GenerationOrchestrator, Interruption, RegeneratedSection,
};
pub use progress::{AttemptStatus, GenerationAttempt, GenerationProgress};
pub use review_workflow::{ReviewAction, ReviewWorkflow, Transition};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actor::{Actor, Capability};
    pub use crate::editor::DocumentEditor;
    pub use crate::error::{DocumentError, Result};
    pub use crate::orchestrator::{BatchOutcome, CancelHandle, GenerationOrchestrator};
    pub use crate::review_workflow::{ReviewAction, ReviewWorkflow};
    pub use doculens_core::{Document, ReviewStatus, Section};
}
