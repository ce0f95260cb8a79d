use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Session Store Args ---
    /// Chat session store type (redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "redis")]
    pub history_type: String,

    /// Chat session store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis session keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "regrag:")]
    pub history_redis_prefix: String,

    /// Number of most recent stored messages passed to generation as conversation history.
    #[arg(long, env = "HISTORY_WINDOW", default_value = "5")]
    pub history_window: usize,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for answer generation (azure, openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "azure")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (Azure resource endpoint for azure)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model (or Azure deployment) name for answer generation
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature for answer generation.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.6")]
    pub chat_temperature: f32,

    // --- Embedding LLM Provider Args ---
    /// Type of LLM provider for text embedding (azure, openai, ollama)
    #[arg(long, env = "EMBEDDING_LLM_TYPE", default_value = "azure")]
    pub embedding_llm_type: String,

    /// Base URL for the Embedding LLM provider API (Azure resource endpoint for azure)
    #[arg(long, env = "EMBEDDING_BASE_URL")] // No default, let adapters handle defaults if None
    pub embedding_base_url: Option<String>,

    /// API Key for the Embedding LLM provider
    #[arg(long, env = "EMBEDDING_API_KEY", default_value = "")]
    pub embedding_api_key: String,

    /// Model (or Azure deployment) name for text embedding
    #[arg(long, env = "EMBEDDING_MODEL")] // No default, rely on adapter defaults if None
    pub embedding_model: Option<String>,

    /// API version used for Azure OpenAI requests.
    #[arg(long, env = "AZURE_API_VERSION", default_value = "2024-02-01")]
    pub azure_api_version: String,

    // --- Vector Store Args ---
    /// Qdrant URL (gRPC endpoint)
    #[arg(long, env = "VECTOR_HOST", default_value = "http://localhost:6334")]
    pub host: String,

    /// API key for the vector database
    #[arg(short = 'k', env = "VECTOR_SECRET", long, default_value = "")]
    pub secret: String,

    /// Collection holding the embedded regulation passages
    #[arg(long, env = "VECTOR_INDEX_NAME", default_value = "pdf_contents6")]
    pub indexes: String,

    /// Vector dimension size
    #[arg(long, env = "VECTOR_DIMENSION", default_value = "1536")]
    pub dimension: usize,

    /// Payload field holding the passage text
    #[arg(long, env = "VECTOR_TEXT_FIELD", default_value = "text")]
    pub text_field: String,

    /// Payload field holding the source document name
    #[arg(long, env = "VECTOR_SOURCE_FIELD", default_value = "document_name")]
    pub source_field: String,

    /// Source label used when a passage has no source document name
    #[arg(long, env = "DEFAULT_SOURCE", default_value = "Navy Regulations Part II")]
    pub default_source: String,

    // --- Retrieval Args ---
    /// Number of nearest neighbours retrieved from the vector store.
    #[arg(long, env = "RAG_DEFAULT_LIMIT", default_value = "10")]
    pub rag_default_limit: usize,

    /// Number of documents kept after reranking.
    #[arg(long, env = "RERANK_TOP_K", default_value = "5")]
    pub rerank_top_k: usize,

    /// Number of reranked documents attached to answers as contexts.
    #[arg(long, env = "CONTEXT_COUNT", default_value = "3")]
    pub context_count: usize,

    // --- Reranker Args ---
    /// Base URL of the Cohere-compatible rerank API
    #[arg(long, env = "RERANK_BASE_URL", default_value = "https://api.cohere.com")]
    pub rerank_base_url: String,

    /// API key for the rerank API. When empty, reranking is skipped.
    #[arg(long, env = "RERANK_API_KEY", default_value = "")]
    pub rerank_api_key: String,

    /// Rerank model name
    #[arg(long, env = "RERANK_MODEL", default_value = "rerank-english-v3.0")]
    pub rerank_model: String,

    // --- General App Args ---
    /// Optional path to a prompt override file (JSON with system_prompt / answer_template).
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Timeout in seconds for outbound HTTP requests. 0 disables the timeout.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "120")]
    pub http_timeout_secs: u64,

    /// Host address and port for the HTTP API to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn http_timeout(&self) -> Option<std::time::Duration> {
        (self.http_timeout_secs > 0).then(|| std::time::Duration::from_secs(self.http_timeout_secs))
    }
}
