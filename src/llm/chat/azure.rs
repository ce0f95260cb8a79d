use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::error::Error as StdError;

use super::openai::{ OpenAIChatRequest, OpenAIResponse };
use super::{ ChatClient, ChatTurn, CompletionResponse, DEFAULT_TEMPERATURE };
use crate::llm::azure::AzureDeployment;
use crate::llm::{ http_client, LlmConfig };

const DEFAULT_DEPLOYMENT: &str = "gpt-4o";

/// Chat completions against an Azure OpenAI deployment. The deployment name
/// selects the model, so the request body carries no `model` field.
pub struct AzureChatClient {
    http: HttpClient,
    deployment: AzureDeployment,
    model: String,
    temperature: f32,
}

impl AzureChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Ok(Self {
            http: http_client(config.timeout)?,
            deployment: AzureDeployment::from_config(config)?,
            model: config.completion_model.clone().unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }
}

#[async_trait]
impl ChatClient for AzureChatClient {
    async fn complete(
        &self,
        messages: &[ChatTurn]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = self.deployment.url(&self.model, "chat/completions");
        let req = OpenAIChatRequest {
            model: None,
            messages,
            temperature: self.temperature,
        };

        let resp = self.http
            .post(&url)
            .header("api-key", &self.deployment.api_key)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<OpenAIResponse>().await?;

        resp.into_completion("Azure OpenAI")
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
