//! Jina reader crawl provider
//!
//! `r.jina.ai/{url}` fetches the target page and returns it as markdown.

use super::{Crawl, CrawlError, CrawlResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub struct JinaCrawler {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct JinaResponse {
    data: Option<JinaPage>,
    content: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct JinaPage {
    content: Option<String>,
    title: Option<String>,
}

impl JinaCrawler {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Crawl for JinaCrawler {
    async fn crawl(&self, url: &str) -> Result<CrawlResult, CrawlError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, url))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| CrawlError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| CrawlError::from_reqwest(url, e))?;

        page_from_json(&text).map_err(|message| CrawlError::Decode {
            url: url.to_string(),
            message,
        })
    }
}

/// Reads markdown and title, preferring the `data` envelope over top-level fields
fn page_from_json(text: &str) -> Result<CrawlResult, String> {
    let response: JinaResponse = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let (nested_content, nested_title) = match response.data {
        Some(page) => (page.content, page.title),
        None => (None, None),
    };

    Ok(CrawlResult {
        markdown: non_empty(nested_content)
            .or_else(|| non_empty(response.content))
            .unwrap_or_default(),
        title: non_empty(nested_title)
            .or_else(|| non_empty(response.title))
            .unwrap_or_default(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
