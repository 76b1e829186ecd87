//! Technique text translation through the LLM gateway
//!
//! Translations are cached per `(text, source, target)` in process memory,
//! up to a fixed number of entries; only locales missing from the cache are
//! requested.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tatame_llm::{CompletionRequest, LlmError, LlmMessage, LlmService};
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You translate Brazilian Jiu-Jitsu technique names and descriptions. \
Keep established BJJ terms (guard, mount, kimura, de la riva) in their usual form. \
Reply with a single JSON object mapping each requested locale code to its translation and nothing else.";

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("LLM gateway error: {0}")]
    Gateway(#[from] LlmError),

    #[error("Unusable translation reply: {0}")]
    MalformedReply(String),
}

/// Cached translations kept per process before the cache starts over
pub const DEFAULT_CACHE_CAPACITY: usize = 2048;

type CacheKey = (String, String, String);

/// Translator with a bounded in-process cache
#[derive(Clone)]
pub struct Translator {
    llm: Arc<dyn LlmService>,
    cache: Arc<RwLock<HashMap<CacheKey, String>>>,
    capacity: usize,
}

impl Translator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self::with_capacity(llm, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(llm: Arc<dyn LlmService>, capacity: usize) -> Self {
        Self {
            llm,
            cache: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of cached translations
    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn key(text: &str, source: &str, target: &str) -> CacheKey {
        (text.to_string(), source.to_string(), target.to_string())
    }

    /// Translate `text` from `source` into every locale of `targets`
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        targets: &[String],
    ) -> Result<BTreeMap<String, String>, TranslationError> {
        let mut translations = BTreeMap::new();
        let mut missing = Vec::new();
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            for target in targets {
                if target == source {
                    translations.insert(target.clone(), text.to_string());
                } else if let Some(hit) = cache.get(&Self::key(text, source, target)) {
                    translations.insert(target.clone(), hit.clone());
                } else if !missing.contains(target) {
                    missing.push(target.clone());
                }
            }
        }

        if missing.is_empty() {
            return Ok(translations);
        }

        tracing::debug!(source, targets = ?missing, "Requesting translation");
        let fresh = self.request(text, source, &missing).await?;

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        for target in &missing {
            let translated = fresh.get(target).ok_or_else(|| {
                TranslationError::MalformedReply(format!("missing locale {}", target))
            })?;
            if cache.len() >= self.capacity {
                // Start over once full
                tracing::debug!(entries = cache.len(), "Translation cache full, clearing");
                cache.clear();
            }
            cache.insert(Self::key(text, source, target), translated.clone());
            translations.insert(target.clone(), translated.clone());
        }

        Ok(translations)
    }

    async fn request(
        &self,
        text: &str,
        source: &str,
        targets: &[String],
    ) -> Result<BTreeMap<String, String>, TranslationError> {
        let prompt = format!(
            "Source locale: {}\nTarget locales: {}\nText:\n{}",
            source,
            targets.join(", "),
            text
        );

        let response = self
            .llm
            .complete(CompletionRequest {
                model: self.llm.default_model().to_string(),
                system_prompt: Some(SYSTEM_PROMPT.to_string()),
                messages: vec![LlmMessage::user(prompt)],
                max_tokens: None,
            })
            .await?;

        parse_reply(&response.content)
    }
}

/// Read the locale map out of a reply, tolerating a fenced code block
fn parse_reply(reply: &str) -> Result<BTreeMap<String, String>, TranslationError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => return Err(TranslationError::MalformedReply("no JSON object".to_string())),
    };

    serde_json::from_str(json).map_err(|e| TranslationError::MalformedReply(e.to_string()))
}
