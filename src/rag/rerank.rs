use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::time::Duration;

/// One reranked candidate, pointing back into the submitted document list.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    pub relevance_score: f32,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Up to `top_n` hits, most relevant first.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize
    ) -> Result<Vec<RerankHit>, Box<dyn StdError + Send + Sync>>;
}

pub struct CohereReranker {
    http: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

impl CohereReranker {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Option<Duration>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if api_key.trim().is_empty() {
            return Err("Rerank API key is required for CohereReranker".into());
        }
        Ok(Self {
            http: crate::llm::http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize
    ) -> Result<Vec<RerankHit>, Box<dyn StdError + Send + Sync>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/v1/rerank", self.base_url);
        let req = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };

        let resp = self.http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<RerankResponse>().await?;

        if let Some(bad) = resp.results.iter().find(|hit| hit.index >= documents.len()) {
            return Err(
                format!(
                    "Reranker returned index {} for {} documents",
                    bad.index,
                    documents.len()
                ).into()
            );
        }

        Ok(resp.results)
    }
}
