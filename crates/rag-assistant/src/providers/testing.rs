//! In-process provider doubles for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};

use super::{ArtifactStore, EmbeddingProvider, LlmProvider};

const DIMENSIONS: usize = 64;

/// Hashed bag-of-words embedder: texts sharing words land close together
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("embedding backend unavailable"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// LLM that records prompts and answers with a fixed prefix plus the prompt
#[derive(Default)]
pub struct RecordingLlm {
    pub prompts: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
}

impl RecordingLlm {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail_on: Some(marker.to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(marker) = &self.fail_on {
            if prompt.contains(marker.as_str()) {
                return Err(Error::llm("model quota exceeded"));
            }
        }
        Ok(format!("generated: {}", prompt))
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-1"
    }
}

/// In-memory bucket with switchable failures
#[derive(Default)]
pub struct MemoryArtifactStore {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_downloads: AtomicBool,
    /// Reject uploads of this one blob
    pub fail_uploads_of: Mutex<Option<String>>,
    pub downloads: AtomicUsize,
    pub uploads: AtomicUsize,
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads_of.lock().as_deref() == Some(name) {
            return Err(Error::storage(format!("simulated outage storing {}", name)));
        }
        self.blobs.lock().insert(name.to_string(), data);
        Ok(self.uri(name))
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(Error::storage(format!("simulated outage fetching {}", name)));
        }
        self.blobs
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::storage(format!("No such blob: {}", name)))
    }

    fn uri(&self, name: &str) -> String {
        format!("mem://{}", name)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
