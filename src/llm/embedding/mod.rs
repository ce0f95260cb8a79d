pub mod azure;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::{ LlmConfig, LlmType };
use self::azure::AzureEmbeddingClient;
use self::ollama::OllamaEmbeddingClient;
use self::openai::OpenAIEmbeddingClient;

/// A single query vector. Its length is checked against the collection
/// dimension by the caller.
#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn EmbeddingClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn EmbeddingClient> = match config.llm_type {
        LlmType::Ollama => Arc::new(OllamaEmbeddingClient::from_config(config)?),
        LlmType::OpenAI => Arc::new(OpenAIEmbeddingClient::from_config(config)?),
        LlmType::Azure => Arc::new(AzureEmbeddingClient::from_config(config)?),
    };
    Ok(client)
}
