// ABOUTME: Integration tests for the review lifecycle against SQLite storage
// ABOUTME: Covers permitted transitions, capabilities, replays, and concurrent approvals

mod common;

use common::{fill_content, move_to, seed_document, setup_storage};
use doculens_core::{ReviewDecision, ReviewStatus};
use doculens_documents::{Actor, Capability, DocumentError, ReviewAction, ReviewWorkflow};
use pretty_assertions::assert_eq;
use rstest::rstest;

async fn document_in(status: ReviewStatus) -> (ReviewWorkflow, doculens_storage::DocumentStorage, String) {
    let storage = setup_storage().await;
    let document = seed_document(&storage, &["Overview", "Design"]).await;
    fill_content(&storage, &document).await;
    move_to(&storage, &document.id, status).await;
    (ReviewWorkflow::new(storage.clone()), storage, document.id)
}

#[rstest]
#[case(ReviewStatus::Draft)]
#[case(ReviewStatus::ChangesRequested)]
#[tokio::test]
async fn submit_moves_to_pending_review(#[case] from: ReviewStatus) {
    let (workflow, _storage, id) = document_in(from).await;

    let view = workflow
        .submit_for_review(&id, &Actor::editor("alice"))
        .await
        .unwrap();

    assert_eq!(view.review_status, ReviewStatus::PendingReview);
    assert!(view.submitted_at.is_some());
}

#[rstest]
#[case(ReviewStatus::PendingReview)]
#[case(ReviewStatus::Approved)]
#[tokio::test]
async fn submit_from_locked_states_fails_without_writing(#[case] from: ReviewStatus) {
    let (workflow, storage, id) = document_in(from).await;
    let before = storage.review_status_view(&id).await.unwrap();

    let err = workflow
        .submit_for_review(&id, &Actor::editor("alice"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::InvalidTransition {
            action: ReviewAction::SubmitForReview,
            from: f
        } if f == from
    ));
    assert_eq!(storage.review_status_view(&id).await.unwrap(), before);
}

#[tokio::test]
async fn approve_requires_review_capability() {
    let (workflow, storage, id) = document_in(ReviewStatus::PendingReview).await;

    let err = workflow
        .approve(&id, &Actor::editor("alice"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::Forbidden {
            capability: Capability::Review,
            ..
        }
    ));
    assert_eq!(
        storage.current_review_status(&id).await.unwrap(),
        ReviewStatus::PendingReview
    );
}

#[tokio::test]
async fn approve_records_review_and_bumps_version() {
    let (workflow, storage, id) = document_in(ReviewStatus::PendingReview).await;

    let view = workflow
        .approve(&id, &Actor::reviewer("rita"), Some("Ship it"))
        .await
        .unwrap();

    assert_eq!(view.review_status, ReviewStatus::Approved);
    assert_eq!(view.total_reviews, 1);
    let review = view.latest_review.unwrap();
    assert_eq!(review.decision, ReviewDecision::Approved);
    assert_eq!(review.reviewer_id, "rita");
    assert_eq!(review.version_number, Some(1));

    let document = storage.get_document(&id).await.unwrap();
    assert_eq!(document.current_version, 1);
    assert_eq!(storage.list_versions(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn replayed_approval_is_a_no_op() {
    let (workflow, storage, id) = document_in(ReviewStatus::PendingReview).await;
    let reviewer = Actor::reviewer("rita");

    workflow.approve(&id, &reviewer, None).await.unwrap();
    let view = workflow.approve(&id, &reviewer, None).await.unwrap();

    assert_eq!(view.review_status, ReviewStatus::Approved);
    assert_eq!(view.total_reviews, 1);
    assert_eq!(storage.get_document(&id).await.unwrap().current_version, 1);
}

#[tokio::test]
async fn concurrent_approvals_apply_once() {
    let (workflow, storage, id) = document_in(ReviewStatus::PendingReview).await;
    let first = Actor::reviewer("rita");
    let second = Actor::reviewer("sam");

    let (a, b) = tokio::join!(
        workflow.approve(&id, &first, None),
        workflow.approve(&id, &second, None)
    );

    for result in [&a, &b] {
        assert!(matches!(
            result,
            Ok(_)
                | Err(DocumentError::InvalidTransition {
                    action: ReviewAction::Approve,
                    from: ReviewStatus::Approved
                })
        ));
    }
    assert!(a.is_ok() || b.is_ok());

    assert_eq!(storage.list_reviews(&id).await.unwrap().len(), 1);
    assert_eq!(storage.get_document(&id).await.unwrap().current_version, 1);
    assert_eq!(storage.list_versions(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stale_approval_fails_with_invalid_transition() {
    let (workflow, storage, id) = document_in(ReviewStatus::PendingReview).await;

    workflow
        .approve(&id, &Actor::reviewer("rita"), None)
        .await
        .unwrap();
    let err = workflow
        .perform(
            &id,
            &Actor::reviewer("sam"),
            ReviewAction::Approve,
            None,
            Some(ReviewStatus::PendingReview),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::InvalidTransition {
            action: ReviewAction::Approve,
            from: ReviewStatus::Approved
        }
    ));
    assert_eq!(storage.list_reviews(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn request_changes_needs_a_comment() {
    let (workflow, storage, id) = document_in(ReviewStatus::PendingReview).await;

    let err = workflow
        .request_changes(&id, &Actor::reviewer("rita"), "   ")
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Validation(_)));
    assert_eq!(
        storage.current_review_status(&id).await.unwrap(),
        ReviewStatus::PendingReview
    );
    assert!(storage.list_reviews(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn approving_after_changes_requested_needs_resubmission() {
    let (workflow, _storage, id) = document_in(ReviewStatus::ChangesRequested).await;

    let err = workflow
        .approve(&id, &Actor::reviewer("rita"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::InvalidTransition {
            action: ReviewAction::Approve,
            from: ReviewStatus::ChangesRequested
        }
    ));
}

#[tokio::test]
async fn withdraw_is_the_editors_escape_hatch() {
    let (workflow, _storage, id) = document_in(ReviewStatus::PendingReview).await;

    let err = workflow
        .withdraw_from_review(&id, &Actor::reviewer("rita"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::Forbidden { .. }));

    let view = workflow
        .withdraw_from_review(&id, &Actor::editor("alice"))
        .await
        .unwrap();
    assert_eq!(view.review_status, ReviewStatus::Draft);
}

#[tokio::test]
async fn recall_returns_approved_document_to_draft() {
    let (workflow, storage, id) = document_in(ReviewStatus::Approved).await;

    let view = workflow
        .recall_to_draft(&id, &Actor::reviewer("rita"))
        .await
        .unwrap();

    assert_eq!(view.review_status, ReviewStatus::Draft);
    assert!(view.approved_at.is_none());
    // History is append-only
    assert_eq!(storage.list_reviews(&id).await.unwrap().len(), 1);
}
