//! LLM provider trait for text generation

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt-in, text-out generation
///
/// Sampling settings (temperature, token limits) are fixed per instance.
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server
/// - `GeminiClient`: Google Vertex AI (gemini-2.5-pro / gemini-2.5-flash)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate raw text for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
