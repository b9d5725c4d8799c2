// ABOUTME: SectionGenerator contract and its Anthropic-backed implementation
// ABOUTME: Unavailability becomes placeholder content; only request/response faults are errors

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::GenerationConfig;
use crate::placeholder::placeholder_content;
use crate::prompts;
use crate::service::{AIService, AIServiceError, AIServiceResult};

/// Everything the generator needs to write one section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionGenerationRequest {
    pub document_id: String,
    pub document_title: String,
    pub section_id: String,
    pub section_title: String,
    pub section_description: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub content: String,
    /// Content is synthesized filler because the model was unreachable
    pub used_placeholder: bool,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Invalid generation request: {0}")]
    Validation(String),

    #[error("Generation request failed: {0}")]
    Transport(String),

    #[error("Generation service rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation service returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl From<AIServiceError> for GenerationError {
    fn from(err: AIServiceError) -> Self {
        match err {
            AIServiceError::ApiError { status, message } => GenerationError::Api { status, message },
            AIServiceError::ParseError(msg) => GenerationError::InvalidResponse(msg),
            AIServiceError::InvalidResponse => {
                GenerationError::InvalidResponse("no text content in response".to_string())
            }
            other => GenerationError::Transport(other.to_string()),
        }
    }
}

/// Outcome for one section of a bulk call
#[derive(Debug, Clone, PartialEq)]
pub struct SectionGenerationResult {
    pub section_id: String,
    pub outcome: Result<GeneratedSection, GenerationError>,
}

/// Produces content for one section at a time.
///
/// Implementations must resolve every call within a bounded time and must
/// not return an error merely because the model is unavailable; that case is
/// a successful call with `used_placeholder = true`.
#[async_trait]
pub trait SectionGenerator: Send + Sync {
    async fn generate_section(
        &self,
        request: &SectionGenerationRequest,
    ) -> Result<GeneratedSection, GenerationError>;

    /// Bulk variant: sections are generated one after another, in the order given
    async fn generate_document(
        &self,
        requests: &[SectionGenerationRequest],
    ) -> Vec<SectionGenerationResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = self.generate_section(request).await;
            results.push(SectionGenerationResult {
                section_id: request.section_id.clone(),
                outcome,
            });
        }
        results
    }
}

/// Generator backed by the Anthropic API, falling back to placeholder content
pub struct AiSectionGenerator {
    service: AIService,
    timeout: Duration,
}

impl AiSectionGenerator {
    pub fn new(config: &GenerationConfig) -> AIServiceResult<Self> {
        Ok(Self {
            service: AIService::from_config(config)?,
            timeout: config.timeout,
        })
    }

    fn placeholder(&self, request: &SectionGenerationRequest) -> GeneratedSection {
        GeneratedSection {
            content: placeholder_content(&request.section_title, &request.section_description),
            used_placeholder: true,
        }
    }
}

#[async_trait]
impl SectionGenerator for AiSectionGenerator {
    async fn generate_section(
        &self,
        request: &SectionGenerationRequest,
    ) -> Result<GeneratedSection, GenerationError> {
        if request.section_title.trim().is_empty() {
            return Err(GenerationError::Validation(format!(
                "section {} has no title",
                request.section_id
            )));
        }

        if !self.service.has_api_key() {
            info!(
                "No API key configured, using placeholder for section '{}'",
                request.section_title
            );
            return Ok(self.placeholder(request));
        }

        let prompt = prompts::section_prompt(request);
        let system_prompt = prompts::system_prompt(&request.document_title);

        let call = self.service.generate_text(prompt, Some(system_prompt));
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                warn!(
                    "Generation for section '{}' exceeded {:?}, using placeholder",
                    request.section_title, self.timeout
                );
                Ok(self.placeholder(request))
            }
            Ok(Ok(response)) => {
                let content = response.data.trim();
                if content.is_empty() {
                    error!(
                        "Generation for section '{}' returned empty content",
                        request.section_title
                    );
                    return Err(GenerationError::InvalidResponse(
                        "empty content".to_string(),
                    ));
                }
                info!(
                    "Generated section '{}' with {} (tokens: {})",
                    request.section_title,
                    self.service.model(),
                    response.usage.total_tokens()
                );
                Ok(GeneratedSection {
                    content: content.to_string(),
                    used_placeholder: false,
                })
            }
            Ok(Err(err)) if err.is_unavailable() => {
                warn!(
                    "Generation service unavailable for section '{}': {}, using placeholder",
                    request.section_title, err
                );
                Ok(self.placeholder(request))
            }
            Ok(Err(err)) => {
                error!(
                    "Generation failed for section '{}': {}",
                    request.section_title, err
                );
                Err(err.into())
            }
        }
    }
}
