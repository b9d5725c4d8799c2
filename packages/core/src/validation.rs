// ABOUTME: Input validation for documents and sections
// ABOUTME: Rejects empty titles and oversized fields before they reach storage

use thiserror::Error;

use crate::types::{CreateDocumentInput, CreateSectionInput, UpdateSectionInput};

pub const MAX_DOCUMENT_TITLE_LENGTH: usize = 500;
pub const MAX_SECTION_TITLE_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },
}

fn check_title(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn check_description(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_document_input(input: &CreateDocumentInput) -> Result<(), ValidationError> {
    check_title("title", &input.title, MAX_DOCUMENT_TITLE_LENGTH)
}

pub fn validate_section_input(input: &CreateSectionInput) -> Result<(), ValidationError> {
    check_title("title", &input.title, MAX_SECTION_TITLE_LENGTH)?;
    check_description(&input.description)
}

pub fn validate_section_update(input: &UpdateSectionInput) -> Result<(), ValidationError> {
    if let Some(title) = &input.title {
        check_title("title", title, MAX_SECTION_TITLE_LENGTH)?;
    }
    if let Some(description) = &input.description {
        check_description(description)?;
    }
    Ok(())
}
