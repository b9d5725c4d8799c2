// ABOUTME: Review workflow persistence: conditional status transitions and decision history
// ABOUTME: Every transition is a compare-and-set on review_status so concurrent decisions apply once

use chrono::Utc;
use doculens_core::{
    generate_id, DocumentVersion, Review, ReviewDecision, ReviewStatus, ReviewStatusView,
};
use serde_json::json;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{info, warn};

use crate::documents::{fetch_sections, DocumentStorage};
use crate::{Result, StorageError};

const REVIEW_COLUMNS: &str =
    "id, document_id, reviewer_id, decision, overall_comment, version_number, created_at";

impl DocumentStorage {
    /// Move `review_status` from `expected` to `next` if, and only if, the
    /// stored value still equals `expected`.
    ///
    /// Reviewer decisions do not go through here; they need the history
    /// append in the same transaction, see [`DocumentStorage::approve_document`]
    /// and [`DocumentStorage::request_changes`].
    pub async fn transition_review_status(
        &self,
        document_id: &str,
        expected: ReviewStatus,
        next: ReviewStatus,
    ) -> Result<()> {
        if matches!(next, ReviewStatus::Approved | ReviewStatus::ChangesRequested) {
            return Err(StorageError::InvalidInput(format!(
                "{} is a reviewer decision and must be recorded with a review",
                next
            )));
        }

        let now = Utc::now();
        let submitted_at = (next == ReviewStatus::PendingReview).then_some(now);

        let result = sqlx::query(
            "UPDATE documents
             SET review_status = $1,
                 submitted_at = COALESCE($2, submitted_at),
                 approved_at = NULL,
                 updated_at = $3
             WHERE id = $4 AND review_status = $5",
        )
        .bind(next)
        .bind(submitted_at)
        .bind(now)
        .bind(document_id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.status_conflict(document_id, expected).await);
        }

        info!(
            "Document {} review status {} -> {}",
            document_id, expected, next
        );
        Ok(())
    }

    /// Approve a document under review: bump the version, append the review,
    /// and snapshot the included sections, all in one transaction.
    pub async fn approve_document(
        &self,
        document_id: &str,
        reviewer_id: &str,
        comment: Option<&str>,
    ) -> Result<Review> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE documents
             SET review_status = $1,
                 current_version = current_version + 1,
                 approved_at = $2,
                 updated_at = $2
             WHERE id = $3 AND review_status = $4
             RETURNING title, current_version",
        )
        .bind(ReviewStatus::Approved)
        .bind(now)
        .bind(document_id)
        .bind(ReviewStatus::PendingReview)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(self
                .status_conflict(document_id, ReviewStatus::PendingReview)
                .await);
        };

        let title: String = updated.get("title");
        let version: i64 = updated.get("current_version");

        let sections = fetch_sections(&mut *tx, document_id).await?;
        let snapshot = json!({
            "title": title,
            "version": version,
            "sections": sections
                .iter()
                .filter(|s| s.is_included)
                .map(|s| json!({
                    "id": s.id,
                    "title": s.title,
                    "display_order": s.display_order,
                    "content": s.content,
                }))
                .collect::<Vec<_>>(),
        });

        sqlx::query(
            "INSERT INTO document_versions (id, document_id, version_number, snapshot, change_summary, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(generate_id("ver"))
        .bind(document_id)
        .bind(version)
        .bind(serde_json::to_string(&snapshot)?)
        .bind(format!("Approved as version {}", version))
        .bind(reviewer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let review = insert_review(
            &mut tx,
            document_id,
            reviewer_id,
            ReviewDecision::Approved,
            comment,
            version,
        )
        .await?;

        tx.commit().await?;

        info!(
            "Document {} approved by {} as version {}",
            document_id, reviewer_id, version
        );
        Ok(review)
    }

    /// Send a document under review back to its editors with a rationale
    pub async fn request_changes(
        &self,
        document_id: &str,
        reviewer_id: &str,
        comment: &str,
    ) -> Result<Review> {
        if comment.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "A comment is required when requesting changes".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE documents
             SET review_status = $1, approved_at = NULL, updated_at = $2
             WHERE id = $3 AND review_status = $4
             RETURNING current_version",
        )
        .bind(ReviewStatus::ChangesRequested)
        .bind(now)
        .bind(document_id)
        .bind(ReviewStatus::PendingReview)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(self
                .status_conflict(document_id, ReviewStatus::PendingReview)
                .await);
        };
        let version: i64 = updated.get("current_version");

        let review = insert_review(
            &mut tx,
            document_id,
            reviewer_id,
            ReviewDecision::ChangesRequested,
            Some(comment),
            version,
        )
        .await?;

        tx.commit().await?;

        info!("Changes requested on document {} by {}", document_id, reviewer_id);
        Ok(review)
    }

    /// Review history, newest first
    pub async fn list_reviews(&self, document_id: &str) -> Result<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM document_reviews WHERE document_id = $1 ORDER BY created_at DESC, rowid DESC",
            REVIEW_COLUMNS
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(review_from_row).collect())
    }

    /// The review-status read model for a document
    pub async fn review_status_view(&self, document_id: &str) -> Result<ReviewStatusView> {
        let row = sqlx::query(
            "SELECT review_status, submitted_at, approved_at FROM documents WHERE id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("document {}", document_id)))?;

        let latest_review = sqlx::query(&format!(
            "SELECT {} FROM document_reviews WHERE document_id = $1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
            REVIEW_COLUMNS
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| review_from_row(&r));

        let total_reviews: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM document_reviews WHERE document_id = $1")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?
                .get("total");

        Ok(ReviewStatusView {
            document_id: document_id.to_string(),
            review_status: row.get("review_status"),
            submitted_at: row.get("submitted_at"),
            approved_at: row.get("approved_at"),
            latest_review,
            total_reviews,
        })
    }

    /// Approval snapshots, newest first
    pub async fn list_versions(&self, document_id: &str) -> Result<Vec<DocumentVersion>> {
        let rows = sqlx::query(
            "SELECT id, document_id, version_number, snapshot, change_summary, created_by, created_at
             FROM document_versions
             WHERE document_id = $1
             ORDER BY version_number DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let snapshot: String = row.get("snapshot");
                Ok(DocumentVersion {
                    id: row.get("id"),
                    document_id: row.get("document_id"),
                    version_number: row.get("version_number"),
                    snapshot: serde_json::from_str(&snapshot)?,
                    change_summary: row.get("change_summary"),
                    created_by: row.get("created_by"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn status_conflict(&self, document_id: &str, expected: ReviewStatus) -> StorageError {
        match self.current_review_status(document_id).await {
            Ok(actual) => {
                warn!(
                    "Review transition on document {} rejected: expected {}, found {}",
                    document_id, expected, actual
                );
                StorageError::ReviewStatusConflict {
                    document_id: document_id.to_string(),
                    expected,
                    actual,
                }
            }
            Err(err) => err,
        }
    }
}

async fn insert_review(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    document_id: &str,
    reviewer_id: &str,
    decision: ReviewDecision,
    comment: Option<&str>,
    version: i64,
) -> Result<Review> {
    let review = Review {
        id: generate_id("rev"),
        document_id: document_id.to_string(),
        reviewer_id: reviewer_id.to_string(),
        decision,
        overall_comment: comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        version_number: Some(version),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO document_reviews (id, document_id, reviewer_id, decision, overall_comment, version_number, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(&review.id)
    .bind(&review.document_id)
    .bind(&review.reviewer_id)
    .bind(review.decision)
    .bind(&review.overall_comment)
    .bind(review.version_number)
    .bind(review.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(review)
}

fn review_from_row(row: &SqliteRow) -> Review {
    Review {
        id: row.get("id"),
        document_id: row.get("document_id"),
        reviewer_id: row.get("reviewer_id"),
        decision: row.get("decision"),
        overall_comment: row.get("overall_comment"),
        version_number: row.get("version_number"),
        created_at: row.get("created_at"),
    }
}
