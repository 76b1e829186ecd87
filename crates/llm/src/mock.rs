//! Mock LLM Service Implementation
//!
//! Used by `LlmServiceFactory` when provider is `"mock"`.
//! Returns deterministic responses for testing; a canned reply can be set
//! for callers that parse the completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::{CompletionRequest, CompletionResponse, LlmError, LlmService};

/// Mock LLM service for testing
#[derive(Debug, Clone, Default)]
pub struct MockLlmService {
    reply: Arc<RwLock<Option<String>>>,
    failing: Arc<RwLock<bool>>,
    calls: Arc<AtomicUsize>,
}

impl MockLlmService {
    /// Create a new mock LLM service
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that always answers with `reply`
    pub fn with_reply(reply: impl Into<String>) -> Self {
        let service = Self::new();
        service.set_reply(reply);
        service
    }

    pub fn set_reply(&self, reply: impl Into<String>) {
        *self.reply.write().unwrap_or_else(|e| e.into_inner()) = Some(reply.into());
    }

    /// Make every completion fail as an unreachable gateway would
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write().unwrap_or_else(|e| e.into_inner()) = failing;
    }

    /// Number of completions requested so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        tracing::info!("Mock LLM service processing completion request");
        self.calls.fetch_add(1, Ordering::SeqCst);

        if *self.failing.read().unwrap_or_else(|e| e.into_inner()) {
            return Err(LlmError::Request("Mock LLM gateway unavailable".to_string()));
        }

        let model = if request.model.is_empty() {
            "mock-model".to_string()
        } else {
            request.model
        };

        let canned = self.reply.read().unwrap_or_else(|e| e.into_inner()).clone();
        let content = match canned {
            Some(reply) => reply,
            None => {
                let last_message = request
                    .messages
                    .last()
                    .map(|m| m.content.as_str())
                    .unwrap_or("empty");
                format!("Mock response to: {}", last_message)
            }
        };

        let input_tokens = request
            .messages
            .iter()
            .map(|m| m.content.len() as i32 / 4)
            .sum::<i32>();
        let output_tokens = content.len() as i32 / 4;

        Ok(CompletionResponse {
            content,
            model,
            input_tokens,
            output_tokens,
            stop_reason: "stop".to_string(),
        })
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}
