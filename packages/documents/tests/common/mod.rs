// ABOUTME: Shared helpers for document workflow integration tests
// ABOUTME: In-memory storage setup and a scripted section generator

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use doculens_ai::{GeneratedSection, GenerationError, SectionGenerationRequest, SectionGenerator};
use doculens_core::{CreateDocumentInput, CreateSectionInput, Document, ReviewStatus};
use doculens_documents::CancelHandle;
use doculens_storage::{connect_in_memory, DocumentStorage};

pub async fn setup_storage() -> DocumentStorage {
    let pool = connect_in_memory().await.unwrap();
    let storage = DocumentStorage::new(pool);
    storage.migrate().await.unwrap();
    storage
}

/// Create a document whose sections are all included and empty
pub async fn seed_document(storage: &DocumentStorage, titles: &[&str]) -> Document {
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Payments Service Design".to_string(),
        })
        .await
        .unwrap();

    for title in titles {
        storage
            .add_section(
                &doc.id,
                CreateSectionInput {
                    title: title.to_string(),
                    description: format!("Describe the {}", title.to_lowercase()),
                    display_order: None,
                    is_included: true,
                },
            )
            .await
            .unwrap();
    }

    storage.get_document(&doc.id).await.unwrap()
}

/// Store hand-written content for every included section
pub async fn fill_content(storage: &DocumentStorage, document: &Document) -> Document {
    for section in document.included_sections() {
        storage
            .save_section_content(
                &document.id,
                &section.id,
                &format!("Written by hand: {}", section.title),
                false,
            )
            .await
            .unwrap();
    }
    storage.get_document(&document.id).await.unwrap()
}

pub async fn move_to(storage: &DocumentStorage, document_id: &str, status: ReviewStatus) {
    if status == ReviewStatus::Draft {
        return;
    }

    storage
        .transition_review_status(document_id, ReviewStatus::Draft, ReviewStatus::PendingReview)
        .await
        .unwrap();

    match status {
        ReviewStatus::Approved => {
            storage
                .approve_document(document_id, "reviewer-0", None)
                .await
                .unwrap();
        }
        ReviewStatus::ChangesRequested => {
            storage
                .request_changes(document_id, "reviewer-0", "needs work")
                .await
                .unwrap();
        }
        _ => {}
    }
}

#[derive(Debug, Clone)]
pub enum Script {
    Content,
    Placeholder,
    Fail(GenerationError),
}

enum Hook {
    Cancel(CancelHandle),
    Submit(DocumentStorage, String),
}

/// Generator whose behaviour is scripted per section title.
///
/// Titles without a script get normal content. Hooks run while the call for
/// their section is in flight.
#[derive(Default)]
pub struct ScriptedGenerator {
    scripts: HashMap<String, Script>,
    hooks: Mutex<HashMap<String, Hook>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, title: &str, script: Script) -> Self {
        self.scripts.insert(title.to_string(), script);
        self
    }

    pub fn cancel_during(self, title: &str, handle: CancelHandle) -> Self {
        self.hooks
            .lock()
            .unwrap()
            .insert(title.to_string(), Hook::Cancel(handle));
        self
    }

    pub fn submit_during(self, title: &str, storage: DocumentStorage, document_id: &str) -> Self {
        self.hooks.lock().unwrap().insert(
            title.to_string(),
            Hook::Submit(storage, document_id.to_string()),
        );
        self
    }

    /// Section titles in the order they were requested
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

pub fn generated_content(title: &str) -> String {
    format!("## {}\n\nGenerated body for {}.", title, title)
}

#[async_trait]
impl SectionGenerator for ScriptedGenerator {
    async fn generate_section(
        &self,
        request: &SectionGenerationRequest,
    ) -> Result<GeneratedSection, GenerationError> {
        let title = request.section_title.clone();
        self.calls.lock().unwrap().push(title.clone());

        let hook = self.hooks.lock().unwrap().remove(&title);
        match hook {
            Some(Hook::Cancel(handle)) => handle.cancel(),
            Some(Hook::Submit(storage, document_id)) => {
                storage
                    .transition_review_status(
                        &document_id,
                        ReviewStatus::Draft,
                        ReviewStatus::PendingReview,
                    )
                    .await
                    .unwrap();
            }
            None => {}
        }

        match self.scripts.get(&title).cloned().unwrap_or(Script::Content) {
            Script::Content => Ok(GeneratedSection {
                content: generated_content(&title),
                used_placeholder: false,
            }),
            Script::Placeholder => Ok(GeneratedSection {
                content: format!("## {}\n\nPlaceholder for {}.", title, title),
                used_placeholder: true,
            }),
            Script::Fail(err) => Err(err),
        }
    }
}
