// ABOUTME: Core types, constants, and utilities for DocuLens
// ABOUTME: Foundational package shared by storage, generation, and document workflow packages

pub mod constants;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export main types
pub use types::{
    CreateDocumentInput, CreateSectionInput, Document, DocumentStatus, DocumentVersion,
    Review, ReviewDecision, ReviewStatus, ReviewStatusView, Section, SectionOrder,
    UpdateSectionInput,
};

// Re-export utilities
pub use utils::generate_id;

// Re-export validation
pub use validation::{
    validate_document_input, validate_section_input, validate_section_update,
    ValidationError,
};
