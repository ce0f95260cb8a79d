use crate::config::prompt::{ self, PromptConfig };
use crate::history::format_history_for_prompt;
use crate::llm::chat::ChatClient;
use crate::llm::embedding::EmbeddingClient;
use crate::models::chat::{ new_id, ChatMessage, RetrievedContext };
use crate::rag::rerank::Reranker;
use crate::rag::vector::{ RetrievedDocument, VectorIndex };

use log::{ debug, info, warn };
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),
}

/// Sizes of each pipeline stage.
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub dimension: usize,
    pub retrieve_limit: usize,
    pub rerank_top_k: usize,
    pub context_count: usize,
    pub default_source: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            dimension: 1536,
            retrieve_limit: 10,
            rerank_top_k: 5,
            context_count: 3,
            default_source: "Navy Regulations Part II".to_string(),
        }
    }
}

/// Candidates after the rerank stage. `reranked` is false when the reranker
/// was unavailable or failed and vector order was kept.
#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub documents: Vec<RetrievedDocument>,
    pub reranked: bool,
}

/// A retrieved passage stripped down to what the generation prompt needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationDocument {
    pub text: String,
    pub document_name: String,
    pub relevance_score: Option<f32>,
    pub rank: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub content: String,
    pub contexts: Vec<RetrievedContext>,
}

#[derive(Clone)]
pub struct RagEngine {
    embedding_client: Arc<dyn EmbeddingClient>,
    vector_index: Arc<dyn VectorIndex>,
    reranker: Option<Arc<dyn Reranker>>,
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
    settings: RagSettings,
}

impl RagEngine {
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        vector_index: Arc<dyn VectorIndex>,
        reranker: Option<Arc<dyn Reranker>>,
        chat_client: Arc<dyn ChatClient>,
        prompt_config: Arc<PromptConfig>,
        settings: RagSettings
    ) -> Self {
        Self {
            embedding_client,
            vector_index,
            reranker,
            chat_client,
            prompt_config,
            settings,
        }
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let resp = self.embedding_client
            .embed(query).await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        if resp.embedding.len() != self.settings.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.settings.dimension,
                actual: resp.embedding.len(),
            });
        }
        Ok(resp.embedding)
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RagError> {
        let vector = self.embed_query(query).await?;
        let hits = self.vector_index
            .search(&vector, self.settings.retrieve_limit).await
            .map_err(|e| RagError::VectorSearch(e.to_string()))?;
        info!("→ Retrieved {} candidate passages", hits.len());
        Ok(hits)
    }

    /// Reorders `documents` with the reranker and keeps the top `rerank_top_k`.
    /// Never fails: on any reranker error the first `rerank_top_k` candidates
    /// are kept in vector order with no score or rank.
    pub async fn rerank_documents(
        &self,
        query: &str,
        documents: Vec<RetrievedDocument>
    ) -> RerankOutcome {
        let top_k = self.settings.rerank_top_k;
        let Some(reranker) = &self.reranker else {
            debug!("No reranker configured, keeping vector order");
            return Self::fallback(documents, top_k);
        };

        let texts: Vec<String> = documents
            .iter()
            .map(|d| d.text.clone())
            .collect();
        match reranker.rerank(query, &texts, top_k).await {
            Ok(hits) => {
                let reranked = hits
                    .iter()
                    .take(top_k)
                    .enumerate()
                    .filter_map(|(position, hit)| {
                        documents.get(hit.index).map(|doc| {
                            let mut doc = doc.clone();
                            doc.relevance_score = Some(hit.relevance_score);
                            doc.rank = Some(position + 1);
                            doc
                        })
                    })
                    .collect();
                RerankOutcome { documents: reranked, reranked: true }
            }
            Err(e) => {
                warn!("Reranking failed, falling back to vector order: {}", e);
                Self::fallback(documents, top_k)
            }
        }
    }

    fn fallback(mut documents: Vec<RetrievedDocument>, top_k: usize) -> RerankOutcome {
        documents.truncate(top_k);
        RerankOutcome { documents, reranked: false }
    }

    fn source_of(&self, doc: &RetrievedDocument) -> String {
        doc.source.clone().unwrap_or_else(|| self.settings.default_source.clone())
    }

    /// Snapshot of the top passages shown with the answer.
    pub fn build_contexts(&self, documents: &[RetrievedDocument]) -> Vec<RetrievedContext> {
        documents
            .iter()
            .take(self.settings.context_count)
            .map(|doc| RetrievedContext {
                id: new_id(),
                content: doc.text.clone(),
                relevance_score: doc.relevance_score,
                source: self.source_of(doc),
            })
            .collect()
    }

    pub fn clean_documents(&self, documents: &[RetrievedDocument]) -> Vec<GenerationDocument> {
        documents
            .iter()
            .map(|doc| GenerationDocument {
                text: doc.text.clone(),
                document_name: self.source_of(doc),
                relevance_score: doc.relevance_score,
                rank: doc.rank,
            })
            .collect()
    }

    pub fn format_documents_for_prompt(documents: &[GenerationDocument]) -> String {
        if documents.is_empty() {
            return "No relevant documents found.".to_string();
        }

        let mut docs_text = String::new();
        for (i, doc) in documents.iter().enumerate() {
            let relevance = doc.relevance_score
                .map(|s| format!("{:.4}", s))
                .unwrap_or_else(|| "n/a".to_string());
            let rank = doc.rank.map(|r| r.to_string()).unwrap_or_else(|| "n/a".to_string());
            docs_text.push_str(
                &format!(
                    "Document {} (Source: {}, Relevance: {}, Rank: {})\n{}\n\n",
                    i + 1,
                    doc.document_name,
                    relevance,
                    rank,
                    doc.text.trim()
                )
            );
        }
        docs_text
    }

    pub async fn generate(
        &self,
        query: &str,
        documents: &[GenerationDocument],
        history: &[ChatMessage]
    ) -> Result<String, RagError> {
        let docs_text = Self::format_documents_for_prompt(documents);
        let history_text = format_history_for_prompt(history);
        let messages = prompt::build_generation_messages(
            &self.prompt_config,
            query,
            &docs_text,
            &history_text
        );
        debug!("--- Final Answer Prompt ---\n{}\n--------------------------", messages[1].content);

        let resp = self.chat_client
            .complete(&messages).await
            .map_err(|e| RagError::Generation(e.to_string()))?;
        Ok(prompt::strip_code_fences(&resp.response))
    }

    /// Runs retrieval, reranking and generation for one user query.
    pub async fn answer(&self, query: &str, history: &[ChatMessage]) -> Result<RagAnswer, RagError> {
        let candidates = self.retrieve(query).await?;
        let outcome = self.rerank_documents(query, candidates).await;
        info!(
            "→ {} passages after rerank (reranked: {})",
            outcome.documents.len(),
            outcome.reranked
        );

        let contexts = self.build_contexts(&outcome.documents);
        let clean_docs = self.clean_documents(&outcome.documents);
        let content = self.generate(query, &clean_docs, history).await?;

        Ok(RagAnswer { content, contexts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::{ ChatTurn, CompletionResponse };
    use crate::llm::embedding::EmbeddingResponse;
    use crate::rag::rerank::RerankHit;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::error::Error as StdError;
    use std::sync::Mutex;

    struct FixedEmbedding(usize);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedding {
        async fn embed(&self, _text: &str) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>> {
            Ok(EmbeddingResponse { embedding: vec![0.5; self.0] })
        }

        fn get_model(&self) -> String {
            "fixed".into()
        }
    }

    struct StaticIndex(Vec<RetrievedDocument>);

    #[async_trait]
    impl VectorIndex for StaticIndex {
        async fn search(
            &self,
            _vector: &[f32],
            limit: usize
        ) -> Result<Vec<RetrievedDocument>, Box<dyn StdError + Send + Sync>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    /// Scores documents in reverse order.
    struct ReverseReranker;

    #[async_trait]
    impl Reranker for ReverseReranker {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
            top_n: usize
        ) -> Result<Vec<RerankHit>, Box<dyn StdError + Send + Sync>> {
            Ok(
                (0..documents.len())
                    .rev()
                    .take(top_n)
                    .enumerate()
                    .map(|(i, index)| RerankHit { index, relevance_score: 1.0 - (i as f32) * 0.1 })
                    .collect()
            )
        }
    }

    struct BrokenReranker;

    #[async_trait]
    impl Reranker for BrokenReranker {
        async fn rerank(
            &self,
            _query: &str,
            _documents: &[String],
            _top_n: usize
        ) -> Result<Vec<RerankHit>, Box<dyn StdError + Send + Sync>> {
            Err("rerank service unavailable".into())
        }
    }

    #[derive(Default)]
    struct RecordingChat {
        calls: Mutex<Vec<Vec<ChatTurn>>>,
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn complete(
            &self,
            messages: &[ChatTurn]
        ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok(CompletionResponse { response: "```markdown\n# Answer\n```".into() })
        }

        fn get_model(&self) -> String {
            "recording".into()
        }
    }

    fn corpus() -> Vec<RetrievedDocument> {
        (0..10)
            .map(|i| {
                let source = if i % 2 == 0 { Some(format!("Chapter {}", i)) } else { None };
                RetrievedDocument::new(format!("passage {}", i), source, 1.0 - (i as f32) / 10.0)
            })
            .collect()
    }

    fn engine(reranker: Option<Arc<dyn Reranker>>, chat: Arc<RecordingChat>) -> RagEngine {
        RagEngine::new(
            Arc::new(FixedEmbedding(1536)),
            Arc::new(StaticIndex(corpus())),
            reranker,
            chat,
            Arc::new(PromptConfig::default()),
            RagSettings::default()
        )
    }

    #[tokio::test]
    async fn reranked_documents_carry_score_and_rank() {
        let engine = engine(Some(Arc::new(ReverseReranker)), Arc::default());
        let outcome = engine.rerank_documents("q", corpus()).await;

        assert!(outcome.reranked);
        assert_eq!(outcome.documents.len(), 5);
        assert_eq!(outcome.documents[0].text, "passage 9");
        assert_eq!(outcome.documents[0].rank, Some(1));
        assert_eq!(outcome.documents[0].relevance_score, Some(1.0));
        assert_eq!(outcome.documents[4].rank, Some(5));
    }

    #[tokio::test]
    async fn failed_rerank_keeps_vector_order_without_scores() {
        let engine = engine(Some(Arc::new(BrokenReranker)), Arc::default());
        let outcome = engine.rerank_documents("q", corpus()).await;

        assert!(!outcome.reranked);
        let texts: Vec<&str> = outcome.documents.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["passage 0", "passage 1", "passage 2", "passage 3", "passage 4"]);
        assert!(outcome.documents.iter().all(|d| d.relevance_score.is_none() && d.rank.is_none()));
    }

    #[tokio::test]
    async fn contexts_use_top_three_and_default_source() {
        let engine = engine(None, Arc::default());
        let outcome = engine.rerank_documents("q", corpus()).await;
        let contexts = engine.build_contexts(&outcome.documents);

        assert_eq!(contexts.len(), 3);
        assert_eq!(contexts[0].source, "Chapter 0");
        assert_eq!(contexts[1].source, "Navy Regulations Part II");
        assert!(contexts.iter().all(|c| c.relevance_score.is_none()));
        assert_ne!(contexts[0].id, contexts[1].id);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let engine = RagEngine::new(
            Arc::new(FixedEmbedding(768)),
            Arc::new(StaticIndex(corpus())),
            None,
            Arc::new(RecordingChat::default()),
            Arc::new(PromptConfig::default()),
            RagSettings::default()
        );
        let err = engine.retrieve("q").await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 1536, actual: 768 }));
    }

    #[tokio::test]
    async fn answer_strips_fences_and_embeds_history() {
        let chat = Arc::new(RecordingChat::default());
        let engine = engine(Some(Arc::new(ReverseReranker)), Arc::clone(&chat));
        let history = vec![ChatMessage::user("earlier question", Utc::now())];

        let answer = engine.answer("What is casual leave?", &history).await.unwrap();
        assert_eq!(answer.content, "markdown\n# Answer\n");
        assert_eq!(answer.contexts.len(), 3);
        assert_eq!(answer.contexts[0].relevance_score, Some(1.0));

        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let user_turn = &calls[0][1].content;
        assert!(user_turn.contains("Current Query: What is casual leave?"));
        assert!(user_turn.contains("User: earlier question"));
        assert!(user_turn.contains("Document 1 (Source: Navy Regulations Part II, Relevance: 1.0000, Rank: 1)\npassage 9"));
    }

    #[test]
    fn formats_unscored_documents() {
        let docs = vec![GenerationDocument {
            text: " body ".into(),
            document_name: "Chapter 2".into(),
            relevance_score: None,
            rank: None,
        }];
        assert_eq!(
            RagEngine::format_documents_for_prompt(&docs),
            "Document 1 (Source: Chapter 2, Relevance: n/a, Rank: n/a)\nbody\n\n"
        );
        assert_eq!(RagEngine::format_documents_for_prompt(&[]), "No relevant documents found.");
    }
}
