use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use super::{ EmbeddingClient, EmbeddingResponse };
use crate::llm::{ http_client, LlmConfig };

pub struct OllamaEmbeddingClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbeddingClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Ok(Self {
            http: http_client(config.timeout)?,
            base_url: config.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: config.embedding_model.clone().unwrap_or_else(|| "nomic-embed-text".to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(
        &self,
        text: &str
    ) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let resp = self.http
            .post(&url)
            .json(&(EmbeddingRequest { model: &self.model, prompt: text }))
            .send().await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>().await?;

        if resp.embedding.is_empty() {
            return Err("Ollama embedding generation returned no results".into());
        }
        Ok(EmbeddingResponse { embedding: resp.embedding })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmType;
    use serde_json::json;

    #[tokio::test]
    async fn it_posts_model_and_prompt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .match_body(mockito::Matcher::Json(json!({ "model": "nomic-embed-text", "prompt": "leave rules" })))
            .with_status(200)
            .with_body(json!({ "embedding": [1.0, 2.0] }).to_string())
            .create_async().await;

        let client = OllamaEmbeddingClient::from_config(&LlmConfig {
            llm_type: LlmType::Ollama,
            base_url: Some(server.url()),
            ..Default::default()
        }).unwrap();
        let resp = client.embed("leave rules").await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.embedding, vec![1.0, 2.0]);
    }
}
