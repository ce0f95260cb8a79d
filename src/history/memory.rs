use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;
use crate::history::SessionStore;
use crate::models::chat::{ ChatMessage, Session };

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: &Session) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sessions.write().await.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(
        &self,
        session_id: &str
    ) -> Result<Option<Session>, Box<dyn Error + Send + Sync>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, Box<dyn Error + Send + Sync>> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn append_messages(
        &self,
        session_id: &str,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.messages.extend_from_slice(messages);
                session.updated_at = session.updated_at.max(updated_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn lists_most_recently_updated_first() {
        let store = MemorySessionStore::new();
        let t0 = Utc::now();
        let older = Session::new(t0);
        let newer = Session::new(t0 + Duration::seconds(5));
        store.create_session(&older).await.unwrap();
        store.create_session(&newer).await.unwrap();

        let ids: Vec<String> = store.list_sessions().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id.clone(), older.id.clone()]);

        let bumped = t0 + Duration::seconds(10);
        store.append_messages(&older.id, &[ChatMessage::user("hi", bumped)], bumped).await.unwrap();
        let ids: Vec<String> = store.list_sessions().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn append_to_missing_session_writes_nothing() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let appended = store.append_messages("nope", &[ChatMessage::user("x", now)], now).await.unwrap();
        assert!(!appended);
        assert!(store.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn late_append_does_not_move_updated_at_back() {
        let store = MemorySessionStore::new();
        let t0 = Utc::now();
        let session = Session::new(t0);
        store.create_session(&session).await.unwrap();

        let later = t0 + Duration::seconds(20);
        let earlier = t0 + Duration::seconds(10);
        store.append_messages(&session.id, &[ChatMessage::user("fast", later)], later).await.unwrap();
        store.append_messages(&session.id, &[ChatMessage::user("slow", earlier)], earlier).await.unwrap();

        let stored = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, later);
        assert_eq!(stored.messages.len(), 2);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemorySessionStore::new();
        let session = Session::new(Utc::now());
        store.create_session(&session).await.unwrap();
        assert!(store.delete_session(&session.id).await.unwrap());
        assert!(!store.delete_session(&session.id).await.unwrap());
        assert!(store.get_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let store = Arc::new(MemorySessionStore::new());
        let session = Session::new(Utc::now());
        store.create_session(&session).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                let now = Utc::now();
                let pair = [
                    ChatMessage::user(format!("q{}", i), now),
                    ChatMessage::assistant(format!("a{}", i), vec![], now),
                ];
                store.append_messages(&id, &pair, now).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let stored = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 32);
        for pair in stored.messages.chunks(2) {
            assert_eq!(&pair[0].content[1..], &pair[1].content[1..]);
        }
    }
}
