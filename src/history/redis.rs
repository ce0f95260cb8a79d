use async_trait::async_trait;
use chrono::{ DateTime, SecondsFormat, Utc };
use log::{ debug, error };
use once_cell::sync::Lazy;
use redis::{ AsyncCommands, Client, Script };
use std::collections::HashMap;
use std::error::Error;
use crate::history::SessionStore;
use crate::models::chat::{ ChatMessage, Session };

/// Appends messages only if the session hash still exists, then moves
/// `updated_at` and the listing score forward in the same step. An older
/// timestamp never replaces a newer one.
///
/// KEYS: session hash, message list, session index.
/// ARGV: updated_at, index score, session id, messages...
static APPEND_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
for i = 4, #ARGV do
    redis.call('RPUSH', KEYS[2], ARGV[i])
end
local current = redis.call('ZSCORE', KEYS[3], ARGV[3])
if not current or tonumber(current) <= tonumber(ARGV[2]) then
    redis.call('HSET', KEYS[1], 'updated_at', ARGV[1])
    redis.call('ZADD', KEYS[3], ARGV[2], ARGV[3])
end
return 1
"
    )
});

/// Sessions live in three kinds of keys:
/// `{prefix}session:{id}` hash with the metadata,
/// `{prefix}session:{id}:messages` list of JSON messages, and
/// `{prefix}sessions` sorted set of ids scored by `updated_at` millis.
pub struct RedisSessionStore {
    client: Client,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}session:{}", self.key_prefix, session_id)
    }

    fn messages_key(&self, session_id: &str) -> String {
        format!("{}session:{}:messages", self.key_prefix, session_id)
    }

    fn index_key(&self) -> String {
        format!("{}sessions", self.key_prefix)
    }

    async fn load_session(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        session_id: &str
    ) -> Result<Option<Session>, Box<dyn Error + Send + Sync>> {
        let fields: HashMap<String, String> = conn.hgetall(self.session_key(session_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        let raw_messages: Vec<String> = conn.lrange(self.messages_key(session_id), 0, -1).await?;
        decode_session(session_id, &fields, &raw_messages).map(Some)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(
    fields: &HashMap<String, String>,
    name: &str
) -> Result<DateTime<Utc>, Box<dyn Error + Send + Sync>> {
    let raw = fields.get(name).ok_or_else(|| format!("Session record is missing '{}'", name))?;
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn encode_metadata(session: &Session) -> Vec<(&'static str, String)> {
    vec![
        ("id", session.id.clone()),
        ("name", session.name.clone()),
        ("created_at", format_timestamp(&session.created_at)),
        ("updated_at", format_timestamp(&session.updated_at))
    ]
}

fn encode_messages(messages: &[ChatMessage]) -> Result<Vec<String>, serde_json::Error> {
    messages.iter().map(serde_json::to_string).collect()
}

fn decode_session(
    session_id: &str,
    fields: &HashMap<String, String>,
    raw_messages: &[String]
) -> Result<Session, Box<dyn Error + Send + Sync>> {
    let mut messages = Vec::with_capacity(raw_messages.len());
    for raw in raw_messages {
        match serde_json::from_str::<ChatMessage>(raw) {
            Ok(msg) => messages.push(msg),
            Err(e) => error!("Error parsing message of session {}: {}", session_id, e),
        }
    }

    Ok(Session {
        id: session_id.to_string(),
        name: fields.get("name").cloned().unwrap_or_default(),
        messages,
        created_at: parse_timestamp(fields, "created_at")?,
        updated_at: parse_timestamp(fields, "updated_at")?,
    })
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create_session(&self, session: &Session) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let metadata = encode_metadata(session);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(self.session_key(&session.id), metadata.as_slice())
            .ignore()
            .zadd(self.index_key(), &session.id, session.updated_at.timestamp_millis())
            .ignore();
        if !session.messages.is_empty() {
            pipe.rpush(self.messages_key(&session.id), encode_messages(&session.messages)?).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        debug!("Created session {}", session.id);
        Ok(())
    }

    async fn get_session(
        &self,
        session_id: &str
    ) -> Result<Option<Session>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        self.load_session(&mut conn, session_id).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let ids: Vec<String> = conn.zrevrange(self.index_key(), 0, -1).await?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.load_session(&mut conn, &id).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let (removed, _, _): (i64, i64, i64) = redis
            ::pipe()
            .atomic()
            .del(self.session_key(session_id))
            .del(self.messages_key(session_id))
            .zrem(self.index_key(), session_id)
            .query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn append_messages(
        &self,
        session_id: &str,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let mut invocation = APPEND_SCRIPT.prepare_invoke();
        invocation
            .key(self.session_key(session_id))
            .key(self.messages_key(session_id))
            .key(self.index_key())
            .arg(format_timestamp(&updated_at))
            .arg(updated_at.timestamp_millis())
            .arg(session_id);
        for encoded in encode_messages(messages)? {
            invocation.arg(encoded);
        }
        let appended: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(appended == 1)
    }
}
