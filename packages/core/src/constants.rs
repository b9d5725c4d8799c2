// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across DocuLens

// Generation service
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const DOCULENS_AI_MODEL: &str = "DOCULENS_AI_MODEL";
pub const DOCULENS_AI_MAX_TOKENS: &str = "DOCULENS_AI_MAX_TOKENS";
pub const DOCULENS_AI_TEMPERATURE: &str = "DOCULENS_AI_TEMPERATURE";
pub const DOCULENS_AI_TIMEOUT_SECS: &str = "DOCULENS_AI_TIMEOUT_SECS";
pub const DOCULENS_AI_BASE_URL: &str = "DOCULENS_AI_BASE_URL";
