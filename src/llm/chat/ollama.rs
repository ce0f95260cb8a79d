use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use std::error::Error as StdError;
use super::{ ChatClient, ChatTurn, CompletionResponse, DEFAULT_TEMPERATURE };
use crate::llm::{ http_client, LlmConfig, LlmType };

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Ollama {
            return Err("Invalid config type for OllamaClient".into());
        }

        Ok(Self {
            http: http_client(config.timeout)?,
            base_url: config.base_url.clone().unwrap_or_else(|| "http://localhost:11434".into()),
            completion_model: config.completion_model.clone().unwrap_or_else(|| "llama3".to_string()),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(
        &self,
        messages: &[ChatTurn]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let req = ChatRequest {
            model: &self.completion_model,
            messages,
            stream: false,
            options: ChatOptions { temperature: self.temperature },
        };
        let resp = self.http.post(&url).json(&req).send().await?.error_for_status()?;
        let data = resp.json::<ChatResponse>().await?;
        Ok(CompletionResponse { response: data.message.content })
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn it_completes_without_streaming() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(json!({ "model": "llama3", "stream": false })))
            .with_status(200)
            .with_body(json!({ "message": { "role": "assistant", "content": "ok" }, "done": true }).to_string())
            .create_async().await;

        let client = OllamaClient::from_config(&LlmConfig {
            llm_type: LlmType::Ollama,
            base_url: Some(server.url()),
            ..Default::default()
        }).unwrap();
        let res = client.complete(&[ChatTurn::user("hi")]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(res.response, "ok");
    }

    #[test]
    fn rejects_foreign_config() {
        let config = LlmConfig { llm_type: LlmType::OpenAI, ..Default::default() };
        assert!(OllamaClient::from_config(&config).is_err());
    }
}
