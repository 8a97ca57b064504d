use super::{read_model_response, LanguageModel};
use crate::providers::ExtractionError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Google Gemini through the `generateContent` REST endpoint
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiModel {
    pub fn new(client: Client, api_key: String, model: Option<String>, base_url: String) -> Self {
        Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
            base_url,
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.1,
                "maxOutputTokens": 8192,
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::from_reqwest(self.name(), e))?;

        let text = read_model_response(self.name(), response).await?;
        response_text(&text).map_err(|message| ExtractionError::Decode {
            provider: self.name(),
            message,
        })
    }
}

/// Concatenates the text parts of the first candidate
///
/// A response without candidates (blocked prompt) yields an empty string,
/// which the recovery parser reports as an empty response.
fn response_text(body: &str) -> Result<String, String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| e.to_string())?;

    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}
