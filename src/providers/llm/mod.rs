//! Language model providers and the prompt-driven extractor built on them
//!
//! A `LanguageModel` only turns a prompt into text. `ModelExtractor` owns the
//! prompts, the content cap and the recovery parsing, so every backend gets
//! identical extraction behavior.

mod gemini;
mod groq;
mod prompts;

pub use gemini::{GeminiModel, GEMINI_DEFAULT_MODEL};
pub use groq::{GroqModel, GROQ_DEFAULT_MODEL};
pub use prompts::{render_prompt, ASSETS_PROMPT, LEADERSHIP_PROMPT};

use super::http::{body_preview, parse_retry_after};
use super::{Extraction, ExtractionError, Extractor};
use crate::extraction::{parse_records, truncate_chars};
use crate::model::{AssetRecord, ExtractedRecord, LeaderRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

/// Provider error text that signals quota exhaustion regardless of status
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &'static str;

    /// Model identifier sent to the provider
    fn model_name(&self) -> &str;

    /// Sends one prompt and returns the model's text output
    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Extractor that prompts a language model and parses its answer
pub struct ModelExtractor {
    model: Box<dyn LanguageModel>,
    max_content_length: usize,
}

impl ModelExtractor {
    pub fn new(model: Box<dyn LanguageModel>, max_content_length: usize) -> Self {
        Self {
            model,
            max_content_length,
        }
    }

    async fn extract<T: ExtractedRecord>(
        &self,
        template: &str,
        text: &str,
        entity_name: &str,
    ) -> Result<Extraction<T>, ExtractionError> {
        let content = truncate_chars(text, self.max_content_length);
        let prompt = render_prompt(template, entity_name, content);

        let raw = self.model.generate(&prompt).await?;
        debug!(
            "{} {} response ({} chars): {}",
            self.model.name(),
            T::COLLECTION_KEY,
            raw.len(),
            truncate_chars(&raw, 500)
        );

        let values = parse_records(&raw, T::COLLECTION_KEY)?;
        let records = T::from_values(&values);
        debug!(
            "Parsed {} {} record(s) for {}",
            records.len(),
            T::COLLECTION_KEY,
            entity_name
        );

        Ok(Extraction { records, raw })
    }
}

#[async_trait]
impl Extractor for ModelExtractor {
    async fn extract_leadership(
        &self,
        text: &str,
        entity_name: &str,
    ) -> Result<Extraction<LeaderRecord>, ExtractionError> {
        self.extract(LEADERSHIP_PROMPT, text, entity_name).await
    }

    async fn extract_assets(
        &self,
        text: &str,
        entity_name: &str,
    ) -> Result<Extraction<AssetRecord>, ExtractionError> {
        self.extract(ASSETS_PROMPT, text, entity_name).await
    }
}

/// Returns the body of a successful model response, classifying failures
///
/// HTTP 429 and quota-exhaustion bodies become `RateLimited`, carrying the
/// `Retry-After` header when present.
pub(crate) async fn read_model_response(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String, ExtractionError> {
    let status = response.status();
    let retry_after = parse_retry_after(response.headers());
    let body = response
        .text()
        .await
        .map_err(|e| ExtractionError::from_reqwest(provider, e))?;

    if status.is_success() {
        return Ok(body);
    }

    if status == StatusCode::TOO_MANY_REQUESTS || body.contains(RESOURCE_EXHAUSTED) {
        return Err(ExtractionError::RateLimited {
            provider,
            retry_after,
        });
    }

    Err(ExtractionError::Status {
        provider,
        status: status.as_u16(),
        body: body_preview(&body),
    })
}
