use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::sync::Arc;
use log::info;
use crate::llm::chat::ChatTurn;

pub const QUERY_PLACEHOLDER: &str = "{query}";
pub const DOCUMENTS_PLACEHOLDER: &str = "{documents}";
pub const HISTORY_PLACEHOLDER: &str = "{history}";

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an advanced AI assistant specializing in Navy Regulations Part II. \
Provide clear, structured responses using proper markdown formatting. Focus on accuracy and clarity.";

const DEFAULT_ANSWER_TEMPLATE: &str =
    r#"You are an AI assistant specialized in Navy Regulations Part II. Format your response using the following structure:

# [Main Topic / Question Focus]

## Key Points
- Provide 2-3 bullet points summarizing the main points
- Keep these concise and clear

## Detailed Explanation
[Provide a thorough explanation with proper formatting]
- Use bullet points for lists
- Use **bold** for important terms
- Use *italics* for emphasis
- Break complex topics into digestible parts

## Regulatory References
- **Section**: [Relevant section numbers]
- **Chapter**: [Chapter reference]
- **Related Regulations**: [Cross-references if applicable]

## Practical Application
- Explain real-world implementation
- Provide specific examples or scenarios
- Include any relevant procedures

## Important Notes
- List any exceptions or special considerations
- Include warnings or cautions if applicable
- Mention any recent updates or changes

Remember to:
1. Use proper markdown formatting
2. Keep paragraphs concise and well-structured
3. Use hierarchical headings (# for main, ## for sub-sections)
4. Include all relevant regulatory citations
5. Maintain professional tone throughout

Current Query: {query}
Retrieved Documents:
{documents}
Conversation History:
{history}
"#;

#[derive(Debug)]
pub enum PromptError {
    MissingPlaceholder(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::MissingPlaceholder(key) =>
                write!(f, "Answer template is missing the '{}' placeholder", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Prompt text sent to the generation endpoint. Either field may be
/// overridden from a JSON file; omitted fields keep the built-in text.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub answer_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            answer_template: DEFAULT_ANSWER_TEMPLATE.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        for placeholder in [QUERY_PLACEHOLDER, DOCUMENTS_PLACEHOLDER, HISTORY_PLACEHOLDER] {
            if !self.answer_template.contains(placeholder) {
                return Err(PromptError::MissingPlaceholder(placeholder.to_string()));
            }
        }
        Ok(())
    }
}

pub fn load_prompts_from_str(json: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Loads prompt overrides from `path`, or the built-in prompts when no path
/// is configured.
pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, Box<dyn Error + Send + Sync>> {
    let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
        info!("Using built-in prompts");
        return Ok(Arc::new(PromptConfig::default()));
    };
    let file_content = fs
        ::read_to_string(path)
        .map_err(|e| format!("Failed to read prompts file '{}': {}", path, e))?;
    let config = load_prompts_from_str(&file_content).map_err(|e|
        format!("Failed to parse prompts file '{}': {}", path, e)
    )?;
    info!("Loaded prompts from: {}", path);
    Ok(Arc::new(config))
}

/// Fills the answer template in one pass. Placeholder-like text inside any
/// substituted value is copied literally.
pub fn get_answer_prompt(
    config: &PromptConfig,
    query: &str,
    documents: &str,
    history: &str
) -> String {
    let substitutions = [
        (QUERY_PLACEHOLDER, query),
        (DOCUMENTS_PLACEHOLDER, documents),
        (HISTORY_PLACEHOLDER, history),
    ];
    let template = config.answer_template.as_str();
    let mut prompt = String::with_capacity(
        template.len() + query.len() + documents.len() + history.len()
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        let tail = &rest[open..];
        match substitutions.iter().find(|(placeholder, _)| tail.starts_with(placeholder)) {
            Some((placeholder, value)) => {
                prompt.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                prompt.push('{');
                rest = &tail[1..];
            }
        }
    }
    prompt.push_str(rest);
    prompt
}

/// The fixed system turn followed by the single templated user turn.
pub fn build_generation_messages(
    config: &PromptConfig,
    query: &str,
    documents: &str,
    history: &str
) -> Vec<ChatTurn> {
    vec![
        ChatTurn::system(config.system_prompt.clone()),
        ChatTurn::user(get_answer_prompt(config, query, documents, history))
    ]
}

pub fn strip_code_fences(text: &str) -> String {
    text.replace("```", "")
}
