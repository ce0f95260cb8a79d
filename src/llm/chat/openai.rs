use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::time::Duration;

use super::{ ChatClient, ChatTurn, CompletionResponse, DEFAULT_TEMPERATURE };
use crate::llm::LlmConfig;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    temperature: f32,
}

#[derive(Serialize)]
pub(super) struct OpenAIChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: &'a [ChatTurn],
    pub temperature: f32,
}

#[derive(Deserialize)]
pub(super) struct OpenAIMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct OpenAIChoice {
    pub message: OpenAIMessage,
}

#[derive(Deserialize)]
pub(super) struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
}

impl OpenAIResponse {
    pub(super) fn into_completion(
        self,
        provider: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let content = self.choices
            .into_iter()
            .next()
            .ok_or_else(|| format!("No response from {} API", provider))?
            .message.content
            .unwrap_or_default();
        Ok(CompletionResponse { response: content })
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        temperature: Option<f32>,
        timeout: Option<Duration>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| "gpt-4o".to_string());
        let api_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let mut builder = HttpClient::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
            temperature: temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "OpenAI API key is required".to_string())?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.temperature,
            config.timeout,
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        messages: &[ChatTurn]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        let req = OpenAIChatRequest {
            model: Some(&self.model),
            messages,
            temperature: self.temperature,
        };

        let resp = self.http.post(&url)
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIResponse>()
            .await?;

        resp.into_completion("OpenAI")
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(url: String) -> OpenAIChatClient {
        OpenAIChatClient::new("abc".into(), Some("gpt-4o".into()), Some(url), None, None).unwrap()
    }

    #[tokio::test]
    async fn it_gets_completions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("Authorization", "Bearer abc")
            .match_body(Matcher::Json(json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "hi" }
                ],
                "temperature": 0.6
            })))
            .with_status(200)
            .with_body(json!({ "choices": [{ "message": { "role": "assistant", "content": "Hello" } }] }).to_string())
            .create_async().await;

        let res = client(server.url())
            .complete(&[ChatTurn::system("sys"), ChatTurn::user("hi")]).await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(res.response, "Hello");
    }

    #[tokio::test]
    async fn it_errors_without_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(json!({ "choices": [] }).to_string())
            .create_async().await;

        let res = client(server.url()).complete(&[ChatTurn::user("hi")]).await;
        assert!(res.is_err());
    }
}
