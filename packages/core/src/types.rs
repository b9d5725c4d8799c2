// ABOUTME: Type definitions for documents, sections, reviews, and version snapshots
// ABOUTME: Content-production status and review status are tracked as independent axes

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse content-production phase of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Sections are being planned
    Draft,
    /// Section plan accepted, nothing generated yet
    SectionsApproved,
    /// A generation batch is running
    Generating,
    /// Every included section went through generation
    Completed,
    /// Content is being edited by hand
    Editing,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::SectionsApproved => "sections_approved",
            DocumentStatus::Generating => "generating",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Editing => "editing",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review lifecycle status; governs whether the document may be mutated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    PendingReview,
    Approved,
    ChangesRequested,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Draft => "draft",
            ReviewStatus::PendingReview => "pending_review",
            ReviewStatus::Approved => "approved",
            ReviewStatus::ChangesRequested => "changes_requested",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReviewStatus::Draft),
            "pending_review" => Ok(ReviewStatus::PendingReview),
            "approved" => Ok(ReviewStatus::Approved),
            "changes_requested" => Ok(ReviewStatus::ChangesRequested),
            other => Err(format!("Unknown review status: {}", other)),
        }
    }
}

/// Decision recorded by a reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::ChangesRequested => "changes_requested",
        }
    }
}

/// A titled, orderable unit of document content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub document_id: String,
    pub title: String,
    pub description: String,
    pub display_order: i32,
    pub is_included: bool,
    /// Latest content version; `None` means not generated yet
    pub content: Option<String>,
    pub content_version: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Section {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// Document with its ordered sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub status: DocumentStatus,
    pub review_status: ReviewStatus,
    pub current_version: i64,
    /// Sorted by `display_order`
    pub sections: Vec<Section>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    /// Included sections in display order
    pub fn included_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.is_included)
    }

    pub fn has_any_content(&self) -> bool {
        self.included_sections().any(Section::has_content)
    }
}

/// Append-only review history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub document_id: String,
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub overall_comment: Option<String>,
    /// Document version the decision applied to
    pub version_number: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the document taken when it was approved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: String,
    pub document_id: String,
    pub version_number: i64,
    pub snapshot: serde_json::Value,
    pub change_summary: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review-status read model, fetched independently of the document view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStatusView {
    pub document_id: String,
    pub review_status: ReviewStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub latest_review: Option<Review>,
    pub total_reviews: i64,
}

/// Input for creating a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentInput {
    pub title: String,
}

/// Input for adding a section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSectionInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Appended after the last section when absent
    pub display_order: Option<i32>,
    #[serde(default = "default_included")]
    pub is_included: bool,
}

fn default_included() -> bool {
    true
}

/// Input for updating section metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSectionInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_included: Option<bool>,
}

/// One entry of a reorder request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOrder {
    pub id: String,
    pub display_order: i32,
}
