// ABOUTME: Edit lock policy derived from review status
// ABOUTME: Decides which mutations and review actions an actor may perform right now

use std::fmt;

use doculens_core::ReviewStatus;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::actor::{Actor, Capability};
use crate::error::{DocumentError, Result};
use crate::review_workflow::ReviewAction;

/// Mutations that are only possible while a document is unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    EditContent,
    AddSection,
    RemoveSection,
    ReorderSections,
    UpdateSection,
    RegenerateSection,
    GenerateAll,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::EditContent,
        Operation::AddSection,
        Operation::RemoveSection,
        Operation::ReorderSections,
        Operation::UpdateSection,
        Operation::RegenerateSection,
        Operation::GenerateAll,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::EditContent => "editing content",
            Operation::AddSection => "adding a section",
            Operation::RemoveSection => "removing a section",
            Operation::ReorderSections => "reordering sections",
            Operation::UpdateSection => "updating a section",
            Operation::RegenerateSection => "regenerating a section",
            Operation::GenerateAll => "generating all sections",
        };
        f.write_str(s)
    }
}

pub fn is_locked(status: ReviewStatus) -> bool {
    matches!(status, ReviewStatus::PendingReview | ReviewStatus::Approved)
}

/// Reject `operation` when `status` locks the document
pub fn ensure_unlocked(status: ReviewStatus, operation: Operation) -> Result<()> {
    if is_locked(status) {
        warn!("Rejected {} while document is {}", operation, status);
        return Err(DocumentError::Locked { operation, status });
    }
    Ok(())
}

/// Everything an actor can do given a document's review status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermittedActions {
    pub operations: Vec<Operation>,
    pub review_actions: Vec<ReviewAction>,
}

impl PermittedActions {
    pub fn for_actor(status: ReviewStatus, actor: &Actor) -> Self {
        let operations = if !is_locked(status) && actor.can(Capability::Edit) {
            Operation::ALL.to_vec()
        } else {
            Vec::new()
        };

        let review_actions = ReviewAction::ALL
            .into_iter()
            .filter(|action| action.allowed_from(status) && actor.can(action.required_capability()))
            .collect();

        Self {
            operations,
            review_actions,
        }
    }

    pub fn allows(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    pub fn allows_review(&self, action: ReviewAction) -> bool {
        self.review_actions.contains(&action)
    }
}
