use std::error::Error as StdError;
use super::LlmConfig;

pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Endpoint and credentials of an Azure OpenAI resource.
#[derive(Debug, Clone)]
pub struct AzureDeployment {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl AzureDeployment {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let endpoint = config.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| "Azure OpenAI endpoint (base URL) is required".to_string())?;
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Azure OpenAI API key is required".to_string())?;
        let api_version = config.api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self { endpoint, api_key, api_version })
    }

    /// `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=...`
    pub fn url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint.trim_end_matches('/'),
            deployment,
            operation,
            self.api_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmType;

    #[test]
    fn builds_deployment_urls() {
        let config = LlmConfig {
            llm_type: LlmType::Azure,
            base_url: Some("https://example.openai.azure.com/".into()),
            api_key: Some("key".into()),
            ..Default::default()
        };
        let deployment = AzureDeployment::from_config(&config).unwrap();
        assert_eq!(
            deployment.url("gpt4o", "chat/completions"),
            "https://example.openai.azure.com/openai/deployments/gpt4o/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn requires_endpoint_and_key() {
        let missing_endpoint = LlmConfig {
            llm_type: LlmType::Azure,
            api_key: Some("key".into()),
            ..Default::default()
        };
        assert!(AzureDeployment::from_config(&missing_endpoint).is_err());

        let missing_key = LlmConfig {
            llm_type: LlmType::Azure,
            base_url: Some("https://example.openai.azure.com".into()),
            ..Default::default()
        };
        assert!(AzureDeployment::from_config(&missing_key).is_err());
    }
}
