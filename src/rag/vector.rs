use async_trait::async_trait;
use log::{ info, warn };
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{ value::Kind, SearchPointsBuilder, Value as QdrantValue };
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as StdError;

/// A passage returned by vector search. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub source: Option<String>,
    pub similarity: f32,
    pub relevance_score: Option<f32>,
    /// 1-based position after reranking.
    pub rank: Option<usize>,
}

impl RetrievedDocument {
    pub fn new(text: impl Into<String>, source: Option<String>, similarity: f32) -> Self {
        Self {
            text: text.into(),
            source,
            similarity,
            relevance_score: None,
            rank: None,
        }
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The `limit` nearest neighbours of `vector`, closest first.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize
    ) -> Result<Vec<RetrievedDocument>, Box<dyn StdError + Send + Sync>>;
}

pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    text_field: String,
    source_field: String,
}

impl QdrantVectorIndex {
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        text_field: &str,
        source_field: &str
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let client = Qdrant::from_url(url).api_key(api_key).build()?;
        Ok(Self {
            client,
            collection: collection.to_string(),
            text_field: text_field.to_string(),
            source_field: source_field.to_string(),
        })
    }

    /// Logs whether the passage collection is reachable. Startup continues
    /// either way; searches against a missing collection fail per request.
    pub async fn check_collection(&self) {
        match self.client.collection_exists(&self.collection).await {
            Ok(true) => info!("Vector collection '{}' is available", self.collection),
            Ok(false) => warn!("Vector collection '{}' does not exist", self.collection),
            Err(e) => warn!("Could not reach vector store for '{}': {}", self.collection, e),
        }
    }

    fn to_document(&self, payload: &HashMap<String, QdrantValue>, score: f32) -> RetrievedDocument {
        RetrievedDocument::new(
            payload_string(payload, &self.text_field).unwrap_or_default(),
            payload_string(payload, &self.source_field).filter(|s| !s.is_empty()),
            score
        )
    }
}

fn payload_string(payload: &HashMap<String, QdrantValue>, field: &str) -> Option<String> {
    match payload.get(field).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn search(
        &self,
        vector: &[f32],
        limit: usize
    ) -> Result<Vec<RetrievedDocument>, Box<dyn StdError + Send + Sync>> {
        let resp = self.client.search_points(
            SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64).with_payload(
                true
            )
        ).await?;

        Ok(
            resp.result
                .iter()
                .map(|point| self.to_document(&point.payload, point.score))
                .collect()
        )
    }
}
