use chrono::{ DateTime, Local, Utc };
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A supporting passage shown next to an assistant answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub id: String,
    pub content: String,
    /// Reranker score; absent when reranking fell back to vector order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<RetrievedContext>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
            role: Role::User,
            timestamp,
            contexts: None,
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        contexts: Vec<RetrievedContext>,
        timestamp: DateTime<Utc>
    ) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
            role: Role::Assistant,
            timestamp,
            contexts: Some(contexts),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh, empty session named after the local creation time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name: format!("Chat {}", now.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The last `limit` messages in insertion order.
    pub fn recent_messages(&self, limit: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn new_session_is_empty_with_equal_timestamps() {
        let now = at(1_700_000_000);
        let session = Session::new(now);
        assert!(session.messages.is_empty());
        assert_eq!(session.created_at, session.updated_at);
        assert!(session.name.starts_with("Chat "));
        assert_eq!(session.name.len(), "Chat 2023-11-14 22:13".len());
    }

    #[test]
    fn recent_messages_keeps_the_tail() {
        let mut session = Session::new(at(0));
        for i in 0..8 {
            session.messages.push(ChatMessage::user(format!("m{}", i), at(i)));
        }
        let recent: Vec<&str> = session
            .recent_messages(5)
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(recent, vec!["m3", "m4", "m5", "m6", "m7"]);
        assert_eq!(session.recent_messages(50).len(), 8);
    }

    #[test]
    fn user_messages_serialize_without_contexts() {
        let msg = ChatMessage::user("hello", at(0));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("contexts").is_none());
    }

    #[test]
    fn unscored_contexts_omit_relevance_score() {
        let ctx = RetrievedContext {
            id: "c1".into(),
            content: "text".into(),
            relevance_score: None,
            source: "Navy Regulations Part II".into(),
        };
        let msg = ChatMessage::assistant("answer", vec![ctx], at(0));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value["contexts"][0].get("relevance_score").is_none());
    }
}
