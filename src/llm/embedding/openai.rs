use async_trait::async_trait;
use rllm::{ builder::{ LLMBackend, LLMBuilder }, LLMProvider };
use std::error::Error as StdError;
use crate::llm::{ LlmConfig, LlmType };
use super::{ EmbeddingClient, EmbeddingResponse };

const DEFAULT_MODEL: &str = "text-embedding-3-large";

/// Query embeddings through the OpenAI API. `dimensions` is forwarded so
/// `text-embedding-3-*` models can be shortened to the collection's size.
pub struct OpenAIEmbeddingClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    model: String,
}

impl OpenAIEmbeddingClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::OpenAI {
            return Err("Invalid config type for OpenAIEmbeddingClient".into());
        }
        let api_key = config.api_key
            .clone()
            .ok_or("OpenAI API key is required for query embeddings")?;
        let model = config.embedding_model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::OpenAI)
            .api_key(api_key)
            .model(&model);
        if let Some(url) = &config.base_url {
            builder = builder.base_url(url);
        }
        if let Some(dims) = config.dimensions {
            builder = builder.embedding_dimensions(dims);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout_seconds(timeout.as_secs());
        }

        Ok(Self { llm: builder.build()?, model })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddingClient {
    async fn embed(
        &self,
        text: &str
    ) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>> {
        let embedding = self.llm
            .embed(vec![text.to_string()]).await?
            .into_iter()
            .next()
            .ok_or_else(|| format!("{} returned no embedding for the query", self.model))?;

        Ok(EmbeddingResponse { embedding })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
