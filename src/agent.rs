use crate::history::{ initialize_session_store, SessionStore };
use crate::rag::rag::{ RagEngine, RagSettings };
use crate::rag::rerank::{ CohereReranker, Reranker };
use crate::rag::vector::{ QdrantVectorIndex, VectorIndex };

use crate::cli::Args;
use crate::config::prompt;
use crate::error::AppError;
use crate::llm::{ parse_llm_type, LlmConfig };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::llm::embedding::{ EmbeddingClient, new_client as new_embedding_client };
use crate::models::chat::{ ChatMessage, Session };

use chrono::Utc;
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;

fn describe_client(llm_type: &str, model: &str, base_url: Option<&str>) -> String {
    format!(
        "Type={}, Model={}, BaseURL={}",
        llm_type,
        model,
        base_url.unwrap_or("adapter default")
    )
}

/// Session bookkeeping plus the retrieval pipeline behind the HTTP API.
#[derive(Clone)]
pub struct AIAgent {
    session_store: Arc<dyn SessionStore>,
    rag_tool: RagEngine,
    history_window: usize,
}

impl AIAgent {
    fn initialize_llm_clients(
        args: &Args
    ) -> Result<(Arc<dyn ChatClient>, Arc<dyn EmbeddingClient>), Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            llm_type: parse_llm_type(&args.chat_llm_type)?,
            base_url: args.chat_base_url.clone(),
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: args.chat_model.clone(),
            embedding_model: None,
            api_version: Some(args.azure_api_version.clone()),
            dimensions: None,
            temperature: Some(args.chat_temperature),
            timeout: args.http_timeout(),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: {}",
            describe_client(
                &args.chat_llm_type,
                &chat_client.get_model(),
                chat_config.base_url.as_deref()
            )
        );

        let embedding_config = LlmConfig {
            llm_type: parse_llm_type(&args.embedding_llm_type)?,
            base_url: args.embedding_base_url.clone(),
            api_key: Some(args.embedding_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: None,
            embedding_model: args.embedding_model.clone(),
            api_version: Some(args.azure_api_version.clone()),
            dimensions: Some(u32::try_from(args.dimension)?),
            temperature: None,
            timeout: args.http_timeout(),
        };
        let embedding_client = new_embedding_client(&embedding_config)?;
        info!(
            "Embedding client configured: {}",
            describe_client(
                &args.embedding_llm_type,
                &embedding_client.get_model(),
                embedding_config.base_url.as_deref()
            )
        );

        Ok((chat_client, embedding_client))
    }

    async fn initialize_vector_index(
        args: &Args
    ) -> Result<Arc<dyn VectorIndex>, Box<dyn Error + Send + Sync>> {
        info!("Connecting to vector store at: {}", args.host);
        let index = QdrantVectorIndex::new(
            &args.host,
            Some(args.secret.clone()).filter(|k| !k.is_empty()),
            &args.indexes,
            &args.text_field,
            &args.source_field
        )?;
        index.check_collection().await;
        Ok(Arc::new(index))
    }

    fn initialize_reranker(
        args: &Args
    ) -> Result<Option<Arc<dyn Reranker>>, Box<dyn Error + Send + Sync>> {
        if args.rerank_api_key.trim().is_empty() {
            warn!("No rerank API key configured. Passages will keep vector search order.");
            return Ok(None);
        }
        let reranker = CohereReranker::new(
            &args.rerank_base_url,
            &args.rerank_api_key,
            &args.rerank_model,
            args.http_timeout()
        )?;
        info!("Reranker configured: Model={}, BaseURL={}", args.rerank_model, args.rerank_base_url);
        Ok(Some(Arc::new(reranker)))
    }

    pub async fn new(args: Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let (chat_client, embedding_client) = Self::initialize_llm_clients(&args)?;
        let vector_index = Self::initialize_vector_index(&args).await?;
        let reranker = Self::initialize_reranker(&args)?;
        let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;
        let session_store = initialize_session_store(&args)?;

        let settings = RagSettings {
            dimension: args.dimension,
            retrieve_limit: args.rag_default_limit,
            rerank_top_k: args.rerank_top_k,
            context_count: args.context_count,
            default_source: args.default_source.clone(),
        };
        let rag_tool = RagEngine::new(
            embedding_client,
            vector_index,
            reranker,
            chat_client,
            prompt_config,
            settings
        );

        Ok(Self::from_parts(session_store, rag_tool, args.history_window))
    }

    pub fn from_parts(
        session_store: Arc<dyn SessionStore>,
        rag_tool: RagEngine,
        history_window: usize
    ) -> Self {
        Self { session_store, rag_tool, history_window }
    }

    pub async fn create_session(&self) -> Result<Session, AppError> {
        let session = Session::new(Utc::now());
        self.session_store.create_session(&session).await?;
        info!("Created session {} ({})", session.id, session.name);
        Ok(session)
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, AppError> {
        Ok(self.session_store.list_sessions().await?)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        if !self.session_store.delete_session(session_id).await? {
            return Err(AppError::session_not_found());
        }
        info!("Deleted session {}", session_id);
        Ok(())
    }

    /// Answers `message` within a session and records the exchange.
    ///
    /// The session is looked up before the message is validated, so an
    /// unknown session reports 404 whatever the body holds. Nothing is
    /// written unless generation succeeds.
    pub async fn send_message(
        &self,
        session_id: &str,
        message: Option<&str>
    ) -> Result<(ChatMessage, ChatMessage), AppError> {
        let session = self.session_store
            .get_session(session_id).await?
            .ok_or_else(AppError::session_not_found)?;

        let query = message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Message is required".to_string()))?;

        let now = Utc::now();
        let history = session.recent_messages(self.history_window);
        info!(
            "Session {}: answering with {} prior messages as history",
            session_id,
            history.len()
        );

        let answer = self.rag_tool.answer(query, history).await?;

        let user_message = ChatMessage::user(query, now);
        let ai_message = ChatMessage::assistant(answer.content, answer.contexts, now);

        let appended = self.session_store.append_messages(
            session_id,
            &[user_message.clone(), ai_message.clone()],
            now
        ).await?;
        if !appended {
            warn!("Session {} was deleted while its answer was generated", session_id);
            return Err(AppError::session_not_found());
        }

        Ok((user_message, ai_message))
    }
}
