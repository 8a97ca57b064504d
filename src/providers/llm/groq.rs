use super::{read_model_response, LanguageModel};
use crate::providers::ExtractionError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq through its OpenAI-compatible chat completions endpoint
pub struct GroqModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl GroqModel {
    pub fn new(client: Client, api_key: String, model: Option<String>, base_url: String) -> Self {
        Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
            base_url,
        }
    }
}

#[async_trait]
impl LanguageModel for GroqModel {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.1,
            "max_tokens": 4096,
        });

        let response = self
            .client
            .post(format!("{}/openai/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::from_reqwest(self.name(), e))?;

        let text = read_model_response(self.name(), response).await?;
        let completion: ChatCompletion =
            serde_json::from_str(&text).map_err(|e| ExtractionError::Decode {
                provider: self.name(),
                message: e.to_string(),
            })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default())
    }
}
