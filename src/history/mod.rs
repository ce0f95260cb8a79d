mod memory;
mod redis;
use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::models::chat::{ ChatMessage, Session };

pub use self::memory::MemorySessionStore;
pub use self::redis::RedisSessionStore;

/// Persistence for chat sessions. Messages are append-only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn get_session(
        &self,
        session_id: &str
    ) -> Result<Option<Session>, Box<dyn Error + Send + Sync>>;

    /// All sessions, most recently updated first.
    async fn list_sessions(&self) -> Result<Vec<Session>, Box<dyn Error + Send + Sync>>;

    /// Returns `false` when no session had that id.
    async fn delete_session(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// Appends `messages` in order and sets `updated_at` as one atomic step.
    /// Returns `false` (and writes nothing) when the session does not exist.
    async fn append_messages(
        &self,
        session_id: &str,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>
    ) -> Result<bool, Box<dyn Error + Send + Sync>>;
}

pub fn create_session_store(
    args: &Args
) -> Result<Arc<dyn SessionStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "redis" => {
            let store = redis::RedisSessionStore::new(&args.history_host, &args.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(memory::MemorySessionStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_session_store(
    args: &Args
) -> Result<Arc<dyn SessionStore>, Box<dyn Error + Send + Sync>> {
    info!("Chat sessions will be stored in: {} at {}", args.history_type, args.history_host);
    create_session_store(args)
}

pub fn format_history_for_prompt(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No previous conversation.".to_string();
    }
    let mut result = String::from("Previous conversation:\n");
    for msg in messages {
        result.push_str(&format!("{}: {}\n", msg.role.display_name(), msg.content));
    }

    result
}
