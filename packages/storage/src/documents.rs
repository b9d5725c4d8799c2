// ABOUTME: Document and section storage with versioned section content
// ABOUTME: Sections are always returned in display order with their latest content version

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use doculens_core::{
    generate_id, validate_document_input, validate_section_input, validate_section_update,
    CreateDocumentInput, CreateSectionInput, Document, DocumentStatus, ReviewStatus, Section,
    SectionOrder, UpdateSectionInput,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::{Result, StorageError};

const SECTIONS_QUERY: &str = "SELECT s.id, s.document_id, s.title, s.description, s.display_order, s.is_included, s.created_at,
        c.content AS content, c.version AS content_version
     FROM document_sections s
     LEFT JOIN section_contents c
        ON c.section_id = s.id
        AND c.version = (SELECT MAX(version) FROM section_contents WHERE section_id = s.id)
     WHERE s.document_id = $1
     ORDER BY s.display_order, s.id";

const SECTION_QUERY: &str = "SELECT s.id, s.document_id, s.title, s.description, s.display_order, s.is_included, s.created_at,
        c.content AS content, c.version AS content_version
     FROM document_sections s
     LEFT JOIN section_contents c
        ON c.section_id = s.id
        AND c.version = (SELECT MAX(version) FROM section_contents WHERE section_id = s.id)
     WHERE s.document_id = $1 AND s.id = $2";

const DOCUMENT_QUERY: &str = "SELECT id, title, status, review_status, current_version, submitted_at, approved_at, created_at, updated_at
     FROM documents
     WHERE id = $1";

/// Storage for documents and their sections
#[derive(Clone)]
pub struct DocumentStorage {
    pub(crate) pool: SqlitePool,
}

impl DocumentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Create an empty document in draft/draft state
    pub async fn create_document(&self, input: CreateDocumentInput) -> Result<Document> {
        validate_document_input(&input)?;

        let id = generate_id("doc");
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO documents (id, title, status, review_status, current_version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, 0, $5, $6)",
        )
        .bind(&id)
        .bind(input.title.trim())
        .bind(DocumentStatus::Draft)
        .bind(ReviewStatus::Draft)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!("Created document {}", id);
        self.get_document(&id).await
    }

    /// Get a document with its ordered sections
    pub async fn get_document(&self, document_id: &str) -> Result<Document> {
        let row = sqlx::query(DOCUMENT_QUERY)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("document {}", document_id)))?;

        let sections = fetch_sections(&self.pool, document_id).await?;
        Ok(document_from_row(&row, sections))
    }

    /// Delete a document; sections, content, and reviews cascade
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("document {}", document_id)));
        }
        info!("Deleted document {}", document_id);
        Ok(())
    }

    pub async fn set_document_status(
        &self,
        document_id: &str,
        status: DocumentStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("document {}", document_id)));
        }
        debug!("Document {} status set to {}", document_id, status);
        Ok(())
    }

    /// Fresh review status read, bypassing any cached document view
    pub async fn current_review_status(&self, document_id: &str) -> Result<ReviewStatus> {
        let row = sqlx::query("SELECT review_status FROM documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("document {}", document_id)))?;
        Ok(row.get("review_status"))
    }

    pub async fn get_section(&self, document_id: &str, section_id: &str) -> Result<Section> {
        let row = sqlx::query(SECTION_QUERY)
            .bind(document_id)
            .bind(section_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| section_not_found(document_id, section_id))?;
        Ok(section_from_row(&row))
    }

    /// Add a section; without an explicit order it is appended after the last one
    pub async fn add_section(
        &self,
        document_id: &str,
        input: CreateSectionInput,
    ) -> Result<Section> {
        validate_section_input(&input)?;

        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::NotFound(format!("document {}", document_id)));
        }

        let display_order = match input.display_order {
            Some(order) => {
                let taken = sqlx::query(
                    "SELECT 1 FROM document_sections WHERE document_id = $1 AND display_order = $2",
                )
                .bind(document_id)
                .bind(order)
                .fetch_optional(&mut *tx)
                .await?;
                if taken.is_some() {
                    return Err(StorageError::InvalidInput(format!(
                        "display_order {} is already used in document {}",
                        order, document_id
                    )));
                }
                order
            }
            None => {
                let row = sqlx::query(
                    "SELECT COALESCE(MAX(display_order), 0) + 1 AS next_order
                     FROM document_sections WHERE document_id = $1",
                )
                .bind(document_id)
                .fetch_one(&mut *tx)
                .await?;
                row.get::<i32, _>("next_order")
            }
        };

        let id = generate_id("sec");
        sqlx::query(
            "INSERT INTO document_sections (id, document_id, title, description, display_order, is_included, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&id)
        .bind(document_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(display_order)
        .bind(input.is_included as i32)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        touch_document(&mut *tx, document_id).await?;
        tx.commit().await?;

        info!("Added section {} to document {} at order {}", id, document_id, display_order);
        self.get_section(document_id, &id).await
    }

    /// Update title, description, or inclusion of a section
    pub async fn update_section(
        &self,
        document_id: &str,
        section_id: &str,
        input: UpdateSectionInput,
    ) -> Result<Section> {
        validate_section_update(&input)?;

        let result = sqlx::query(
            "UPDATE document_sections
             SET title = COALESCE($1, title),
                 description = COALESCE($2, description),
                 is_included = COALESCE($3, is_included)
             WHERE id = $4 AND document_id = $5",
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.description.as_deref())
        .bind(input.is_included.map(|included| included as i32))
        .bind(section_id)
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(section_not_found(document_id, section_id));
        }

        touch_document(&self.pool, document_id).await?;
        self.get_section(document_id, section_id).await
    }

    pub async fn remove_section(&self, document_id: &str, section_id: &str) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM document_sections WHERE id = $1 AND document_id = $2")
                .bind(section_id)
                .bind(document_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(section_not_found(document_id, section_id));
        }

        touch_document(&self.pool, document_id).await?;
        info!("Removed section {} from document {}", section_id, document_id);
        Ok(())
    }

    /// Apply new display orders atomically. Sections not named keep their order;
    /// the resulting orders must stay unique within the document.
    pub async fn reorder_sections(&self, document_id: &str, orders: &[SectionOrder]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_sections(&mut *tx, document_id).await?;
        let mut final_orders: HashMap<&str, i32> = existing
            .iter()
            .map(|s| (s.id.as_str(), s.display_order))
            .collect();

        let mut named: HashSet<&str> = HashSet::new();
        for order in orders {
            if !named.insert(order.id.as_str()) {
                return Err(StorageError::InvalidInput(format!(
                    "section {} is listed more than once",
                    order.id
                )));
            }
            match final_orders.get_mut(order.id.as_str()) {
                Some(slot) => *slot = order.display_order,
                None => {
                    return Err(StorageError::InvalidInput(format!(
                        "section {} does not belong to document {}",
                        order.id, document_id
                    )))
                }
            }
        }

        let distinct: HashSet<i32> = final_orders.values().copied().collect();
        if distinct.len() != final_orders.len() {
            return Err(StorageError::InvalidInput(
                "display_order values must be unique within a document".to_string(),
            ));
        }

        // Park moved sections on sentinel orders first so the unique index
        // never sees two sections on the same order mid-update.
        for (idx, order) in orders.iter().enumerate() {
            sqlx::query(
                "UPDATE document_sections SET display_order = $1 WHERE id = $2 AND document_id = $3",
            )
            .bind(i32::MIN + idx as i32)
            .bind(&order.id)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        }
        for order in orders {
            sqlx::query(
                "UPDATE document_sections SET display_order = $1 WHERE id = $2 AND document_id = $3",
            )
            .bind(order.display_order)
            .bind(&order.id)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        }

        touch_document(&mut *tx, document_id).await?;
        tx.commit().await?;

        info!("Reordered {} sections in document {}", orders.len(), document_id);
        Ok(())
    }

    /// Append a new content version for a section and return its version number
    pub async fn save_section_content(
        &self,
        document_id: &str,
        section_id: &str,
        content: &str,
        is_ai_generated: bool,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query("SELECT 1 FROM document_sections WHERE id = $1 AND document_id = $2")
            .bind(section_id)
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?;
        if owned.is_none() {
            return Err(section_not_found(document_id, section_id));
        }

        let version: i64 = sqlx::query(
            "SELECT COALESCE(MAX(version), 0) + 1 AS next_version FROM section_contents WHERE section_id = $1",
        )
        .bind(section_id)
        .fetch_one(&mut *tx)
        .await?
        .get("next_version");

        sqlx::query(
            "INSERT INTO section_contents (id, section_id, content, version, is_ai_generated, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(generate_id("cnt"))
        .bind(section_id)
        .bind(content)
        .bind(version)
        .bind(is_ai_generated as i32)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        touch_document(&mut *tx, document_id).await?;
        tx.commit().await?;

        debug!(
            "Saved content v{} for section {} (ai_generated: {})",
            version, section_id, is_ai_generated
        );
        Ok(version)
    }
}

pub(crate) async fn fetch_sections<'e, E>(executor: E, document_id: &str) -> Result<Vec<Section>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(SECTIONS_QUERY)
        .bind(document_id)
        .fetch_all(executor)
        .await?;
    Ok(rows.iter().map(section_from_row).collect())
}

pub(crate) async fn touch_document<'e, E>(executor: E, document_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE documents SET updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(document_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) fn document_from_row(row: &SqliteRow, sections: Vec<Section>) -> Document {
    Document {
        id: row.get("id"),
        title: row.get("title"),
        status: row.get("status"),
        review_status: row.get("review_status"),
        current_version: row.get("current_version"),
        sections,
        submitted_at: row.get("submitted_at"),
        approved_at: row.get("approved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn section_from_row(row: &SqliteRow) -> Section {
    Section {
        id: row.get("id"),
        document_id: row.get("document_id"),
        title: row.get("title"),
        description: row.get("description"),
        display_order: row.get("display_order"),
        is_included: row.get::<i32, _>("is_included") != 0,
        content: row.get("content"),
        content_version: row.get("content_version"),
        created_at: row.get("created_at"),
    }
}

fn section_not_found(document_id: &str, section_id: &str) -> StorageError {
    StorageError::NotFound(format!("section {} in document {}", section_id, document_id))
}
