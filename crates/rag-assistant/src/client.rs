//! Chat client for the query server
//!
//! The session history lives only on the client; every request carries a
//! single question.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Result;

/// Deployed query service
pub const DEFAULT_API_URL: &str = "https://rag-multimodal-api-693032776487.europe-west1.run.app";

/// Shown when a successful response carries no answer
pub const NO_RESPONSE_MESSAGE: &str = "Sorry, I couldn't get a response.";

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// HTTP client for `POST /`
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Ask one question; failures come back as display text
    pub async fn get_rag_response(&self, query: &str) -> String {
        match self.request(query).await {
            Ok(Some(answer)) => answer,
            Ok(None) => NO_RESPONSE_MESSAGE.to_string(),
            Err(e) => {
                tracing::debug!("Request to {} failed: {}", self.endpoint, e);
                format!("An error occurred: {}", e)
            }
        }
    }

    async fn request(&self, query: &str) -> reqwest::Result<Option<String>> {
        let body: Value = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match body.get("response") {
            Some(Value::String(answer)) => Some(answer.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }
}

/// Append-only conversation log
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    /// Record the question, ask the server, record and return the reply
    pub async fn submit(&mut self, client: &ChatClient, prompt: &str) -> String {
        self.push(Role::User, prompt);
        let answer = client.get_rag_response(prompt).await;
        self.push(Role::Assistant, answer.clone());
        answer
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
