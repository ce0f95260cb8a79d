use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::{ EmbeddingClient, EmbeddingResponse };
use crate::llm::azure::AzureDeployment;
use crate::llm::{ http_client, LlmConfig };

const DEFAULT_DEPLOYMENT: &str = "text-embedding-3-large";

pub struct AzureEmbeddingClient {
    http: HttpClient,
    deployment: AzureDeployment,
    model: String,
    dimensions: Option<u32>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct AzureEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl AzureEmbeddingClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let deployment = AzureDeployment::from_config(config)?;
        Ok(Self {
            http: http_client(config.timeout)?,
            deployment,
            model: config.embedding_model.clone().unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingClient for AzureEmbeddingClient {
    async fn embed(
        &self,
        text: &str
    ) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>> {
        let url = self.deployment.url(&self.model, "embeddings");
        let req = EmbeddingRequest { input: text, dimensions: self.dimensions };

        let resp = self.http
            .post(&url)
            .header("api-key", &self.deployment.api_key)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<AzureEmbeddingResponse>().await?;

        let embedding = resp.data
            .into_iter()
            .next()
            .ok_or_else(|| "Azure embedding generation returned no results".to_string())?
            .embedding;

        Ok(EmbeddingResponse { embedding })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmType;
    use mockito::Matcher;
    use serde_json::json;

    fn config(url: String) -> LlmConfig {
        LlmConfig {
            llm_type: LlmType::Azure,
            base_url: Some(url),
            api_key: Some("secret".into()),
            embedding_model: Some("embed-deploy".into()),
            dimensions: Some(3),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn it_embeds_through_the_deployment_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/embed-deploy/embeddings")
            .match_query(Matcher::UrlEncoded("api-version".into(), "2024-02-01".into()))
            .match_header("api-key", "secret")
            .match_body(Matcher::Json(json!({ "input": "hello", "dimensions": 3 })))
            .with_status(200)
            .with_body(json!({ "data": [{ "embedding": [0.1, 0.2, 0.3] }] }).to_string())
            .create_async().await;

        let client = AzureEmbeddingClient::from_config(&config(server.url())).unwrap();
        let resp = client.embed("hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn it_fails_on_empty_data() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(json!({ "data": [] }).to_string())
            .create_async().await;

        let client = AzureEmbeddingClient::from_config(&config(server.url())).unwrap();
        assert!(client.embed("hello").await.is_err());
    }

    #[tokio::test]
    async fn it_fails_on_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", Matcher::Any).with_status(500).create_async().await;

        let client = AzureEmbeddingClient::from_config(&config(server.url())).unwrap();
        assert!(client.embed("hello").await.is_err());
    }
}
