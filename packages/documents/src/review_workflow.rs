// ABOUTME: Review lifecycle state machine and the service that applies it to storage
// ABOUTME: Every transition is a compare-and-set so concurrent actors cannot double-apply

use std::fmt;

use doculens_core::{ReviewStatus, ReviewStatusView};
use doculens_storage::{DocumentStorage, StorageError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actor::{Actor, Capability};
use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    SubmitForReview,
    WithdrawFromReview,
    Approve,
    RequestChanges,
    RecallToDraft,
}

impl ReviewAction {
    pub const ALL: [ReviewAction; 5] = [
        ReviewAction::SubmitForReview,
        ReviewAction::WithdrawFromReview,
        ReviewAction::Approve,
        ReviewAction::RequestChanges,
        ReviewAction::RecallToDraft,
    ];

    /// State the action moves a document into
    pub fn target(self) -> ReviewStatus {
        match self {
            ReviewAction::SubmitForReview => ReviewStatus::PendingReview,
            ReviewAction::WithdrawFromReview => ReviewStatus::Draft,
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::RequestChanges => ReviewStatus::ChangesRequested,
            ReviewAction::RecallToDraft => ReviewStatus::Draft,
        }
    }

    /// Whether the action is defined from `status`
    pub fn allowed_from(self, status: ReviewStatus) -> bool {
        use ReviewStatus::*;
        match self {
            ReviewAction::SubmitForReview => matches!(status, Draft | ChangesRequested),
            ReviewAction::WithdrawFromReview
            | ReviewAction::Approve
            | ReviewAction::RequestChanges => status == PendingReview,
            ReviewAction::RecallToDraft => status == Approved,
        }
    }

    pub fn required_capability(self) -> Capability {
        match self {
            ReviewAction::SubmitForReview | ReviewAction::WithdrawFromReview => Capability::Edit,
            ReviewAction::Approve | ReviewAction::RequestChanges | ReviewAction::RecallToDraft => {
                Capability::Review
            }
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewAction::SubmitForReview => "submit for review",
            ReviewAction::WithdrawFromReview => "withdraw from review",
            ReviewAction::Approve => "approve",
            ReviewAction::RequestChanges => "request changes on",
            ReviewAction::RecallToDraft => "recall to draft",
        };
        f.write_str(s)
    }
}

/// Result of planning an action against a known state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply {
        from: ReviewStatus,
        to: ReviewStatus,
    },
    /// The document is already where the action would put it
    NoOp,
}

/// Plan `action` from `current`.
///
/// Replaying a decision, a withdrawal, or a recall against a document that
/// already sits in the resulting state is a no-op. Submitting an already
/// submitted or approved document is an error.
pub fn plan(current: ReviewStatus, action: ReviewAction) -> Result<Transition> {
    if action.allowed_from(current) {
        return Ok(Transition::Apply {
            from: current,
            to: action.target(),
        });
    }

    let replay = action != ReviewAction::SubmitForReview && current == action.target();
    if replay {
        return Ok(Transition::NoOp);
    }

    Err(DocumentError::InvalidTransition {
        action,
        from: current,
    })
}

pub fn ensure_capability(actor: &Actor, capability: Capability) -> Result<()> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(DocumentError::Forbidden {
            actor_id: actor.id.clone(),
            capability,
        })
    }
}

/// Applies review transitions to stored documents.
#[derive(Clone)]
pub struct ReviewWorkflow {
    storage: DocumentStorage,
}

impl ReviewWorkflow {
    pub fn new(storage: DocumentStorage) -> Self {
        Self { storage }
    }

    pub async fn submit_for_review(
        &self,
        document_id: &str,
        actor: &Actor,
    ) -> Result<ReviewStatusView> {
        self.perform(document_id, actor, ReviewAction::SubmitForReview, None, None)
            .await
    }

    pub async fn withdraw_from_review(
        &self,
        document_id: &str,
        actor: &Actor,
    ) -> Result<ReviewStatusView> {
        self.perform(document_id, actor, ReviewAction::WithdrawFromReview, None, None)
            .await
    }

    pub async fn recall_to_draft(
        &self,
        document_id: &str,
        actor: &Actor,
    ) -> Result<ReviewStatusView> {
        self.perform(document_id, actor, ReviewAction::RecallToDraft, None, None)
            .await
    }

    pub async fn approve(
        &self,
        document_id: &str,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<ReviewStatusView> {
        self.perform(document_id, actor, ReviewAction::Approve, comment, None)
            .await
    }

    pub async fn request_changes(
        &self,
        document_id: &str,
        actor: &Actor,
        comment: &str,
    ) -> Result<ReviewStatusView> {
        self.perform(
            document_id,
            actor,
            ReviewAction::RequestChanges,
            Some(comment),
            None,
        )
        .await
    }

    /// Run `action` against the stored document.
    ///
    /// `seen` is the status the actor was looking at when they chose the
    /// action. If it no longer matches the stored status, somebody else got
    /// there first and the action fails instead of replaying.
    pub async fn perform(
        &self,
        document_id: &str,
        actor: &Actor,
        action: ReviewAction,
        comment: Option<&str>,
        seen: Option<ReviewStatus>,
    ) -> Result<ReviewStatusView> {
        ensure_capability(actor, action.required_capability())?;

        if action == ReviewAction::RequestChanges
            && comment.map_or(true, |c| c.trim().is_empty())
        {
            return Err(DocumentError::Validation(
                "A comment is required when requesting changes".to_string(),
            ));
        }

        let current = self.storage.current_review_status(document_id).await?;
        let transition = match seen {
            Some(seen) => plan_from_view(seen, current, action)?,
            None => plan(current, action)?,
        };

        let Transition::Apply { from, to } = transition else {
            debug!("{} on document {} is a no-op", action, document_id);
            return Ok(self.storage.review_status_view(document_id).await?);
        };

        let applied = match action {
            ReviewAction::Approve => self
                .storage
                .approve_document(document_id, &actor.id, comment)
                .await
                .map(|review| {
                    info!(
                        "Document {} approved by {} at version {}",
                        document_id,
                        actor.id,
                        review.version_number.unwrap_or_default()
                    );
                }),
            ReviewAction::RequestChanges => self
                .storage
                .request_changes(document_id, &actor.id, comment.unwrap_or_default())
                .await
                .map(|_| {
                    info!("Changes requested on document {} by {}", document_id, actor.id);
                }),
            _ => self
                .storage
                .transition_review_status(document_id, from, to)
                .await
                .map(|_| {
                    info!(
                        "Document {} moved from {} to {} by {}",
                        document_id, from, to, actor.id
                    );
                }),
        };
        applied.map_err(|e| conflict_as_transition(e, action))?;

        Ok(self.storage.review_status_view(document_id).await?)
    }
}

/// Plan `action` for an actor who chose it while looking at `seen`.
pub fn plan_from_view(
    seen: ReviewStatus,
    current: ReviewStatus,
    action: ReviewAction,
) -> Result<Transition> {
    if seen != current && action.allowed_from(seen) {
        return Err(DocumentError::InvalidTransition {
            action,
            from: current,
        });
    }
    plan(current, action)
}

/// A lost compare-and-set means another actor moved the document first.
fn conflict_as_transition(err: StorageError, action: ReviewAction) -> DocumentError {
    match err {
        StorageError::ReviewStatusConflict { document_id, actual, .. } => {
            warn!(
                "Concurrent change on document {}: cannot {} from {}",
                document_id, action, actual
            );
            DocumentError::InvalidTransition {
                action,
                from: actual,
            }
        }
        other => other.into(),
    }
}
