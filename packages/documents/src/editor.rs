// ABOUTME: Document editor controller composing review workflow, lock policy, and generation
// ABOUTME: Re-checks stored review status before every mutation and re-reads both views after

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use doculens_ai::SectionGenerator;
use doculens_core::{
    CreateSectionInput, Document, ReviewStatus, ReviewStatusView, Section, SectionOrder,
    UpdateSectionInput,
};
use doculens_storage::DocumentStorage;

use crate::actor::{Actor, Capability};
use crate::error::{DocumentError, Result};
use crate::export::{self, ExportOptions, ExportResult};
use crate::lock_policy::{ensure_unlocked, is_locked, Operation, PermittedActions};
use crate::orchestrator::{BatchReport, CancelHandle, GenerationOrchestrator, RegeneratedSection};
use crate::progress::GenerationProgress;
use crate::review_workflow::{ensure_capability, ReviewAction, ReviewWorkflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Nothing differed from the stored content
    Unchanged,
    Saved { content_version: i64 },
}

/// One open document, as seen by one actor.
///
/// Holds the two read models (document and review status) and the actor's
/// unsaved edits. Every mutating call consults the stored review status
/// first and re-reads both read models afterwards.
pub struct DocumentEditor {
    storage: DocumentStorage,
    workflow: ReviewWorkflow,
    orchestrator: GenerationOrchestrator,
    actor: Actor,
    document: Document,
    review: ReviewStatusView,
    selected: Option<String>,
    /// Unsaved content keyed by section id
    drafts: HashMap<String, String>,
    auto_generate_fired: bool,
    cancel: CancelHandle,
}

impl DocumentEditor {
    pub async fn open(
        storage: DocumentStorage,
        generator: Arc<dyn SectionGenerator>,
        actor: Actor,
        document_id: &str,
    ) -> Result<Self> {
        let document = storage.get_document(document_id).await?;
        let review = storage.review_status_view(document_id).await?;
        debug!("{} opened document {}", actor.id, document_id);

        Ok(Self {
            workflow: ReviewWorkflow::new(storage.clone()),
            orchestrator: GenerationOrchestrator::new(generator, storage.clone()),
            storage,
            actor,
            document,
            review,
            selected: None,
            drafts: HashMap::new(),
            auto_generate_fired: false,
            cancel: CancelHandle::new(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn review_status(&self) -> &ReviewStatusView {
        &self.review
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Lock state as of the last refresh; mutations re-check storage anyway
    pub fn is_locked(&self) -> bool {
        is_locked(self.review.review_status)
    }

    /// Re-read both read models and drop edits that no longer apply
    pub async fn refresh(&mut self) -> Result<()> {
        self.document = self.storage.get_document(&self.document.id).await?;
        self.review = self.storage.review_status_view(&self.document.id).await?;
        self.reconcile_drafts();
        Ok(())
    }

    fn reconcile_drafts(&mut self) {
        // Approved content is frozen; edits made before approval are void
        if self.review.review_status == ReviewStatus::Approved && !self.drafts.is_empty() {
            info!(
                "Discarding {} unsaved edits on approved document {}",
                self.drafts.len(),
                self.document.id
            );
            self.drafts.clear();
        }

        let document = &self.document;
        self.drafts.retain(|section_id, draft| {
            document
                .section(section_id)
                .map_or(false, |s| s.content.as_deref().unwrap_or_default() != draft.as_str())
        });
        let selection_gone = self
            .selected
            .as_deref()
            .is_some_and(|id| self.document.section(id).is_none());
        if selection_gone {
            self.selected = None;
        }
    }

    // Section editing

    pub fn select_section(&mut self, section_id: &str) -> Result<()> {
        if self.document.section(section_id).is_none() {
            return Err(DocumentError::SectionNotFound(section_id.to_string()));
        }
        self.selected = Some(section_id.to_string());
        Ok(())
    }

    pub fn selected_section(&self) -> Option<&Section> {
        self.selected
            .as_deref()
            .and_then(|id| self.document.section(id))
    }

    /// Content shown for the selected section: the unsaved edit if any
    pub fn selected_content(&self) -> Option<&str> {
        let section = self.selected_section()?;
        self.drafts
            .get(&section.id)
            .map(String::as_str)
            .or(section.content.as_deref())
    }

    pub async fn edit_content(&mut self, content: impl Into<String>) -> Result<()> {
        let section_id = self.require_selection()?;
        self.ensure_editable(Operation::EditContent).await?;

        let content = content.into();
        let persisted = self
            .document
            .section(&section_id)
            .and_then(|s| s.content.as_deref())
            .unwrap_or_default();

        if content == persisted {
            self.drafts.remove(&section_id);
        } else {
            self.drafts.insert(section_id, content);
        }
        Ok(())
    }

    /// The selected section differs from its stored content
    pub fn is_dirty(&self) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|id| self.drafts.contains_key(id))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.drafts.is_empty()
    }

    pub fn can_save(&self) -> bool {
        self.is_dirty() && !self.is_locked() && self.actor.can(Capability::Edit)
    }

    pub fn discard_changes(&mut self) {
        if let Some(id) = &self.selected {
            self.drafts.remove(id);
        }
    }

    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let section_id = self.require_selection()?;
        let Some(content) = self.drafts.get(&section_id).cloned() else {
            return Ok(SaveOutcome::Unchanged);
        };

        self.ensure_editable(Operation::EditContent).await?;

        let content_version = self
            .storage
            .save_section_content(&self.document.id, &section_id, &content, false)
            .await?;
        self.drafts.remove(&section_id);
        info!(
            "{} saved section {} (version {})",
            self.actor.id, section_id, content_version
        );

        self.refresh().await?;
        Ok(SaveOutcome::Saved { content_version })
    }

    // Structure

    pub async fn add_section(&mut self, input: CreateSectionInput) -> Result<Section> {
        self.ensure_editable(Operation::AddSection).await?;
        let section = self.storage.add_section(&self.document.id, input).await?;
        self.refresh().await?;
        Ok(section)
    }

    pub async fn remove_section(&mut self, section_id: &str) -> Result<()> {
        self.ensure_editable(Operation::RemoveSection).await?;
        self.storage
            .remove_section(&self.document.id, section_id)
            .await?;
        self.refresh().await
    }

    pub async fn reorder_sections(&mut self, orders: &[SectionOrder]) -> Result<()> {
        self.ensure_editable(Operation::ReorderSections).await?;
        self.storage
            .reorder_sections(&self.document.id, orders)
            .await?;
        self.refresh().await
    }

    pub async fn update_section(
        &mut self,
        section_id: &str,
        input: UpdateSectionInput,
    ) -> Result<Section> {
        self.ensure_editable(Operation::UpdateSection).await?;
        let section = self
            .storage
            .update_section(&self.document.id, section_id, input)
            .await?;
        self.refresh().await?;
        Ok(section)
    }

    // Generation

    /// Sections exist but none has content, and this load has not fired yet
    pub fn should_auto_generate(&self) -> bool {
        !self.auto_generate_fired
            && !self.is_locked()
            && self.actor.can(Capability::Edit)
            && self.document.included_sections().next().is_some()
            && !self.document.has_any_content()
    }

    /// Run the first-load batch at most once per editor
    pub async fn auto_generate<F>(
        &mut self,
        context: Option<String>,
        on_progress: F,
    ) -> Result<Option<BatchReport>>
    where
        F: FnMut(&GenerationProgress),
    {
        if !self.should_auto_generate() {
            return Ok(None);
        }
        self.auto_generate_fired = true;
        info!("Auto-generating document {}", self.document.id);
        self.generate_all(context, on_progress).await.map(Some)
    }

    pub async fn generate_all<F>(
        &mut self,
        context: Option<String>,
        on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&GenerationProgress),
    {
        ensure_capability(&self.actor, Capability::Edit)?;
        // Sections may have changed in another session since the last read
        self.refresh().await?;

        let result = self
            .orchestrator
            .run_batch(&self.document, context, &self.cancel, on_progress)
            .await;
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.refresh().await?;
                return Err(e);
            }
        };

        self.document = report.document.clone();
        self.review = self.storage.review_status_view(&self.document.id).await?;
        self.reconcile_drafts();
        Ok(report)
    }

    pub async fn regenerate_section(
        &mut self,
        section_id: &str,
        context: Option<&str>,
    ) -> Result<RegeneratedSection> {
        ensure_capability(&self.actor, Capability::Edit)?;

        let result = self
            .orchestrator
            .generate_one(&self.document, section_id, context)
            .await;
        self.refresh().await?;
        result
    }

    // Review lifecycle

    pub async fn submit_for_review(&mut self) -> Result<&ReviewStatusView> {
        if self.has_unsaved_changes() {
            return Err(DocumentError::Validation(
                "Save or discard unsaved edits before submitting for review".to_string(),
            ));
        }
        self.transition(ReviewAction::SubmitForReview, None).await
    }

    pub async fn withdraw_from_review(&mut self) -> Result<&ReviewStatusView> {
        self.transition(ReviewAction::WithdrawFromReview, None).await
    }

    pub async fn recall_to_draft(&mut self) -> Result<&ReviewStatusView> {
        self.transition(ReviewAction::RecallToDraft, None).await
    }

    pub async fn approve(&mut self, comment: Option<&str>) -> Result<&ReviewStatusView> {
        self.transition(ReviewAction::Approve, comment).await
    }

    pub async fn request_changes(&mut self, comment: &str) -> Result<&ReviewStatusView> {
        self.transition(ReviewAction::RequestChanges, Some(comment))
            .await
    }

    async fn transition(
        &mut self,
        action: ReviewAction,
        comment: Option<&str>,
    ) -> Result<&ReviewStatusView> {
        let seen = self.review.review_status;
        let result = self
            .workflow
            .perform(&self.document.id, &self.actor, action, comment, Some(seen))
            .await;

        // Both read models are refreshed whether or not the transition applied
        self.refresh().await?;
        result?;
        Ok(&self.review)
    }

    /// What this actor may do right now, from the stored review status
    pub async fn permitted_actions(&self) -> Result<PermittedActions> {
        let status = self.storage.current_review_status(&self.document.id).await?;
        Ok(PermittedActions::for_actor(status, &self.actor))
    }

    // Export

    pub fn can_export(&self) -> bool {
        export::can_export(&self.document)
    }

    pub fn export(&self, options: &ExportOptions) -> Result<ExportResult> {
        export::export_document(&self.document, options)
    }

    // Navigation

    /// Handle for stopping a running batch from another task. Cancelling it
    /// ends generation for the rest of this editor's life.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Navigate away: sections not yet started are abandoned
    pub fn leave(self) {
        self.cancel.cancel();
        debug!("{} left document {}", self.actor.id, self.document.id);
    }

    fn require_selection(&self) -> Result<String> {
        self.selected
            .clone()
            .ok_or_else(|| DocumentError::Validation("No section selected".to_string()))
    }

    async fn ensure_editable(&mut self, operation: Operation) -> Result<()> {
        ensure_capability(&self.actor, Capability::Edit)?;

        let status = self.storage.current_review_status(&self.document.id).await?;
        if let Err(e) = ensure_unlocked(status, operation) {
            self.review = self.storage.review_status_view(&self.document.id).await?;
            return Err(e);
        }
        Ok(())
    }
}
