// ABOUTME: Section content generation for DocuLens documents
// ABOUTME: Anthropic API client, prompts, placeholder fallback, and the SectionGenerator contract

pub mod config;
pub mod generation;
pub mod placeholder;
pub mod prompts;
pub mod service;

pub use config::{ConfigError, GenerationConfig};
pub use generation::{
    AiSectionGenerator, GeneratedSection, GenerationError, SectionGenerationRequest,
    SectionGenerationResult, SectionGenerator,
};
pub use service::{AIResponse, AIService, AIServiceError, AIServiceResult, Usage};
