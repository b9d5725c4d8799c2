// ABOUTME: Sequential section generation with live progress and isolated failures
// ABOUTME: Batches stream progress snapshots and end with exactly one summary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use doculens_ai::{GenerationError, SectionGenerationRequest, SectionGenerator};
use doculens_core::{Document, DocumentStatus, ReviewStatus, Section};
use doculens_storage::DocumentStorage;

use crate::error::{DocumentError, Result};
use crate::lock_policy::{ensure_unlocked, Operation};
use crate::progress::{AttemptStatus, GenerationProgress};

/// Cooperative cancellation for a running batch.
///
/// Cancelling stops sections that have not started; a section already in
/// flight finishes and is saved.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a batch stopped before reaching the last section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Interruption {
    Cancelled,
    /// A review transition locked the document mid-batch
    Locked { status: ReviewStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSection {
    pub section_id: String,
    pub title: String,
    pub message: String,
}

/// Worst condition seen in a batch: error beats placeholder beats success
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    FullSuccess,
    DegradedSuccess { placeholder_count: usize },
    PartialFailure { failed: Vec<FailedSection> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub outcome: BatchOutcome,
    pub total: usize,
    pub completed: usize,
    pub placeholder_count: usize,
    pub error_count: usize,
    /// Sections never started
    pub skipped: usize,
    pub interruption: Option<Interruption>,
}

impl BatchSummary {
    pub fn from_progress(progress: &GenerationProgress, interruption: Option<Interruption>) -> Self {
        let placeholder_count = progress.placeholder_count();
        let error_count = progress.error_count();

        let outcome = if error_count > 0 {
            BatchOutcome::PartialFailure {
                failed: progress
                    .failed()
                    .map(|a| FailedSection {
                        section_id: a.section_id.clone(),
                        title: a.title.clone(),
                        message: a.error.clone().unwrap_or_default(),
                    })
                    .collect(),
            }
        } else if placeholder_count > 0 {
            BatchOutcome::DegradedSuccess { placeholder_count }
        } else {
            BatchOutcome::FullSuccess
        };

        Self {
            outcome,
            total: progress.total(),
            completed: progress.count(AttemptStatus::Completed),
            placeholder_count,
            error_count,
            skipped: progress.count(AttemptStatus::Pending),
            interruption,
        }
    }

    /// The one user-facing message for this batch
    pub fn message(&self) -> String {
        let mut message = match &self.outcome {
            BatchOutcome::PartialFailure { failed } => {
                let titles: Vec<&str> = failed.iter().map(|f| f.title.as_str()).collect();
                format!(
                    "{} of {} sections failed to generate: {}. Regenerate them individually to retry.",
                    failed.len(),
                    self.total,
                    titles.join(", ")
                )
            }
            BatchOutcome::DegradedSuccess { placeholder_count } => format!(
                "Generated {} sections, but {} used placeholder content because the generation service was unavailable. Review and replace it before submitting.",
                self.completed, placeholder_count
            ),
            BatchOutcome::FullSuccess if self.total == 0 => {
                "There are no included sections to generate.".to_string()
            }
            BatchOutcome::FullSuccess => format!("Generated {} sections.", self.completed),
        };

        match self.interruption {
            Some(Interruption::Cancelled) => message.push_str(&format!(
                " Generation was stopped; {} sections were not started.",
                self.skipped
            )),
            Some(Interruption::Locked { status }) => message.push_str(&format!(
                " Generation stopped because the document is now {}.",
                status
            )),
            None => {}
        }
        message
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub progress: GenerationProgress,
    pub summary: BatchSummary,
    /// Document re-read after the batch so persisted content is authoritative
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Progress(GenerationProgress),
    Finished(BatchReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegeneratedSection {
    pub section_id: String,
    pub content: String,
    pub used_placeholder: bool,
    pub content_version: i64,
}

/// Drives a [`SectionGenerator`] over a document's sections
#[derive(Clone)]
pub struct GenerationOrchestrator {
    generator: Arc<dyn SectionGenerator>,
    storage: DocumentStorage,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn SectionGenerator>, storage: DocumentStorage) -> Self {
        Self { generator, storage }
    }

    /// Generate every included section in display order.
    ///
    /// Yields a progress snapshot whenever an attempt changes state and then
    /// one [`BatchEvent::Finished`]. Errors are only yielded for problems
    /// with the batch as a whole; section failures land in the progress.
    pub fn stream_batch<'a>(
        &'a self,
        document: &'a Document,
        context: Option<String>,
        cancel: CancelHandle,
    ) -> impl Stream<Item = Result<BatchEvent>> + 'a {
        stream! {
            if let Err(e) = self.begin_batch(document).await {
                yield Err(e);
                return;
            }

            let mut restore = StatusRestore::new(self.storage.clone(), document);

            let sections: Vec<&Section> = document.included_sections().collect();
            let mut progress = GenerationProgress::start(sections.iter().copied());
            let mut interruption = None;
            yield Ok(BatchEvent::Progress(progress.clone()));

            for section in sections {
                if cancel.is_cancelled() {
                    info!("Generation for document {} cancelled before '{}'", document.id, section.title);
                    interruption = Some(Interruption::Cancelled);
                    break;
                }

                progress = progress.mark_generating(&section.id);
                yield Ok(BatchEvent::Progress(progress.clone()));

                match self.generate_and_save(document, section, context.as_deref()).await {
                    Ok(generated) => {
                        progress = progress.mark_completed(&section.id, generated.used_placeholder);
                    }
                    Err(DocumentError::Locked { status, .. }) => {
                        progress = progress.mark_error(
                            &section.id,
                            format!("Document became {} during generation", status),
                        );
                        interruption = Some(Interruption::Locked { status });
                    }
                    Err(e) => {
                        progress = progress.mark_error(&section.id, attempt_message(&e));
                    }
                }
                yield Ok(BatchEvent::Progress(progress.clone()));

                if interruption.is_some() {
                    break;
                }
            }

            let summary = BatchSummary::from_progress(&progress, interruption);
            match &summary.outcome {
                BatchOutcome::PartialFailure { failed } => warn!(
                    "Generation for document {} finished with {} failed sections",
                    document.id,
                    failed.len()
                ),
                BatchOutcome::DegradedSuccess { placeholder_count } => warn!(
                    "Generation for document {} finished with {} placeholder sections",
                    document.id, placeholder_count
                ),
                BatchOutcome::FullSuccess => info!(
                    "Generation for document {} finished: {} sections",
                    document.id, summary.completed
                ),
            }

            match self.finish_batch(document, interruption.is_some()).await {
                Ok(refreshed) => {
                    restore.disarm();
                    yield Ok(BatchEvent::Finished(BatchReport {
                        progress,
                        summary,
                        document: refreshed,
                    }));
                }
                Err(e) => {
                    yield Err(e);
                }
            }
        }
    }

    /// Drain [`Self::stream_batch`], reporting each snapshot to `on_progress`
    pub async fn run_batch<F>(
        &self,
        document: &Document,
        context: Option<String>,
        cancel: &CancelHandle,
        mut on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&GenerationProgress),
    {
        let stream = self.stream_batch(document, context, cancel.clone());
        futures::pin_mut!(stream);

        while let Some(event) = stream.next().await {
            match event? {
                BatchEvent::Progress(progress) => on_progress(&progress),
                BatchEvent::Finished(report) => return Ok(report),
            }
        }

        Err(DocumentError::GenerationFailed {
            section_id: String::new(),
            message: "generation ended without a summary".to_string(),
        })
    }

    /// Regenerate a single section outside any batch
    pub async fn generate_one(
        &self,
        document: &Document,
        section_id: &str,
        context: Option<&str>,
    ) -> Result<RegeneratedSection> {
        let status = self.storage.current_review_status(&document.id).await?;
        ensure_unlocked(status, Operation::RegenerateSection)?;

        let section = document
            .section(section_id)
            .ok_or_else(|| DocumentError::SectionNotFound(section_id.to_string()))?;
        if !section.is_included {
            return Err(DocumentError::Validation(format!(
                "Section '{}' is excluded from generation",
                section.title
            )));
        }

        self.generate_and_save(document, section, context).await
    }

    async fn begin_batch(&self, document: &Document) -> Result<()> {
        let status = self.storage.current_review_status(&document.id).await?;
        ensure_unlocked(status, Operation::GenerateAll)?;

        self.storage
            .set_document_status(&document.id, DocumentStatus::Generating)
            .await?;
        info!(
            "Starting generation for document {} ({} included sections)",
            document.id,
            document.included_sections().count()
        );
        Ok(())
    }

    async fn finish_batch(&self, document: &Document, interrupted: bool) -> Result<Document> {
        let status = if interrupted {
            document.status
        } else {
            DocumentStatus::Completed
        };
        self.storage.set_document_status(&document.id, status).await?;
        Ok(self.storage.get_document(&document.id).await?)
    }

    async fn generate_and_save(
        &self,
        document: &Document,
        section: &Section,
        context: Option<&str>,
    ) -> Result<RegeneratedSection> {
        let request = SectionGenerationRequest {
            document_id: document.id.clone(),
            document_title: document.title.clone(),
            section_id: section.id.clone(),
            section_title: section.title.clone(),
            section_description: section.description.clone(),
            context: context.map(str::to_string),
        };

        debug!("Generating section '{}' of document {}", section.title, document.id);
        let generated = self
            .generator
            .generate_section(&request)
            .await
            .map_err(|e| generation_failed(&section.id, e))?;

        // Review state may have moved while the call was in flight
        let status = self.storage.current_review_status(&document.id).await?;
        ensure_unlocked(status, Operation::RegenerateSection)?;

        let content_version = self
            .storage
            .save_section_content(&document.id, &section.id, &generated.content, true)
            .await?;

        if generated.used_placeholder {
            warn!("Section '{}' saved with placeholder content", section.title);
        } else {
            info!(
                "Section '{}' generated (version {})",
                section.title, content_version
            );
        }

        Ok(RegeneratedSection {
            section_id: section.id.clone(),
            content: generated.content,
            used_placeholder: generated.used_placeholder,
            content_version,
        })
    }
}

/// Puts the document status back when a batch is dropped before finishing
struct StatusRestore {
    storage: DocumentStorage,
    document_id: String,
    prior: DocumentStatus,
    armed: bool,
}

impl StatusRestore {
    fn new(storage: DocumentStorage, document: &Document) -> Self {
        Self {
            storage,
            document_id: document.id.clone(),
            prior: document.status,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StatusRestore {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Batch for document {} dropped outside a runtime; status left as generating",
                self.document_id
            );
            return;
        };

        info!(
            "Batch for document {} dropped early, restoring status {}",
            self.document_id, self.prior
        );
        let storage = self.storage.clone();
        let document_id = std::mem::take(&mut self.document_id);
        let prior = self.prior;
        handle.spawn(async move {
            if let Err(e) = storage.set_document_status(&document_id, prior).await {
                error!("Failed to restore status of document {}: {}", document_id, e);
            }
        });
    }
}

fn generation_failed(section_id: &str, err: GenerationError) -> DocumentError {
    error!("Generation failed for section {}: {}", section_id, err);
    DocumentError::GenerationFailed {
        section_id: section_id.to_string(),
        message: err.to_string(),
    }
}

fn attempt_message(err: &DocumentError) -> String {
    match err {
        DocumentError::GenerationFailed { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn sections(ids: &[&str]) -> Vec<Section> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Section {
                id: id.to_string(),
                document_id: "doc-1".to_string(),
                title: id.to_uppercase(),
                description: String::new(),
                display_order: i as i32 + 1,
                is_included: true,
                content: None,
                content_version: None,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn error_outranks_placeholder() {
        let sections = sections(&["a", "b", "c"]);
        let progress = GenerationProgress::start(&sections)
            .mark_completed("a", true)
            .mark_error("b", "bad request")
            .mark_completed("c", false);

        let summary = BatchSummary::from_progress(&progress, None);
        assert_eq!(
            summary.outcome,
            BatchOutcome::PartialFailure {
                failed: vec![FailedSection {
                    section_id: "b".to_string(),
                    title: "B".to_string(),
                    message: "bad request".to_string(),
                }]
            }
        );
        assert!(summary.message().contains("B"));
    }

    #[test]
    fn placeholder_outranks_success() {
        let sections = sections(&["a", "b"]);
        let progress = GenerationProgress::start(&sections)
            .mark_completed("a", false)
            .mark_completed("b", true);

        let summary = BatchSummary::from_progress(&progress, None);
        assert_eq!(
            summary.outcome,
            BatchOutcome::DegradedSuccess {
                placeholder_count: 1
            }
        );
        assert!(summary.message().contains("placeholder"));
    }

    #[test]
    fn cancelled_summary_counts_skipped_sections() {
        let sections = sections(&["a", "b", "c"]);
        let progress = GenerationProgress::start(&sections).mark_completed("a", false);

        let summary = BatchSummary::from_progress(&progress, Some(Interruption::Cancelled));
        assert_eq!(summary.outcome, BatchOutcome::FullSuccess);
        assert_eq!(summary.skipped, 2);
        assert!(summary.message().contains("2 sections were not started"));
    }

    #[test]
    fn cancel_handle_is_shared_between_clones() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
