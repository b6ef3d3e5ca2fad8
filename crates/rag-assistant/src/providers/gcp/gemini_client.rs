//! Gemini client for text generation via Vertex AI

use async_trait::async_trait;
use std::sync::Arc;

use super::auth::GcpAuth;
use crate::error::{Error, Result};
use crate::providers::llm::LlmProvider;

/// Gemini client via Vertex AI
pub struct GeminiClient {
    auth: Arc<GcpAuth>,
    model: String,
    location: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    /// * `auth` - GCP authentication
    /// * `location` - GCP region (e.g., "europe-west1")
    /// * `model` - Model name (default: "gemini-2.5-pro")
    /// * `temperature` - Fixed sampling temperature for every call
    pub fn new(
        auth: Arc<GcpAuth>,
        location: String,
        model: Option<String>,
        temperature: f32,
    ) -> Self {
        Self {
            auth,
            model: model.unwrap_or_else(|| "gemini-2.5-pro".to_string()),
            location,
            temperature,
            max_output_tokens: 8192,
        }
    }

    /// Override the output token cap
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!(
            "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.location,
            self.auth.project_id(),
            self.location,
            self.model
        )
    }
}

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(serde::Serialize)]
struct Part {
    text: String,
}

#[derive(serde::Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate
fn first_candidate_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = self.auth.authorized_client().await?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Gemini generation failed ({}): {}",
                status, body
            )));
        }

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        first_candidate_text(gen_response)
            .ok_or_else(|| Error::Llm("No text in Gemini response".to_string()))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_text_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Self-attention "},{"text":"relates positions."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            first_candidate_text(response).as_deref(),
            Some("Self-attention relates positions.")
        );
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(first_candidate_text(response).is_none());

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(first_candidate_text(empty).is_none());
    }
}
