use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{Result, SolarAdvisorError};
use crate::models::Session;
use crate::redis::RedisManager;

/// Key/value persistence for session snapshots with per-key expiry
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored snapshot, or a fresh session when absent or expired
    async fn get(&self, session_id: &str) -> Result<Session>;

    /// Overwrite the snapshot and restart its expiry countdown from `ttl`
    async fn put(&self, session_id: &str, session: &Session, ttl: Duration) -> Result<()>;
}

/// Redis implementation; expiry is delegated to `SETEX`
pub struct RedisSessionStore {
    redis: Arc<RedisManager>,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<RedisManager>, key_prefix: impl Into<String>) -> Self {
        Self {
            redis,
            key_prefix: key_prefix.into(),
        }
    }

    fn session_key(&self, session_id: &str) -> String {
        session_key(&self.key_prefix, session_id)
    }
}

fn session_key(prefix: &str, session_id: &str) -> String {
    format!("{prefix}:{session_id}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str) -> Result<Session> {
        let key = self.session_key(session_id);
        match self.redis.get_json::<Session>(&key).await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => Ok(Session::default()),
            Err(SolarAdvisorError::Serialization(e)) => {
                tracing::warn!("Discarding unreadable session at {}: {}", key, e);
                Ok(Session::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn put(&self, session_id: &str, session: &Session, ttl: Duration) -> Result<()> {
        let key = self.session_key(session_id);
        self.redis.set_json_ex(&key, session, ttl).await?;
        tracing::debug!("Saved session {} ({} turns, ttl {:?})", key, session.history.len(), ttl);
        Ok(())
    }
}

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-process store with sliding expiry, used for tests and redis-less runs.
///
/// Snapshots are kept serialized so callers never share state with the store.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Session> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(session_id) {
                Some(entry) if entry.expires_at > now => {
                    return Ok(serde_json::from_str(&entry.payload)?);
                }
                Some(_) => {}
                None => return Ok(Session::default()),
            }
        }

        // Expired: evict lazily
        let mut entries = self.entries.write().await;
        if entries
            .get(session_id)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            entries.remove(session_id);
        }
        Ok(Session::default())
    }

    async fn put(&self, session_id: &str, session: &Session, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(session)?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // Sweep sessions that expired without being read again
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        if entries.len() < before {
            tracing::debug!("Evicted {} expired sessions", before - entries.len());
        }
        entries.insert(
            session_id.to_string(),
            Entry {
                payload,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, Turn};

    fn sample_session() -> Session {
        let mut session = Session {
            language: Language::En,
            introduced: true,
            ..Session::default()
        };
        session.push_turn(Turn::user("hello"));
        session.push_turn(Turn::assistant("hi there"));
        session.slots.capacity = Some(5.0);
        session
    }

    #[tokio::test]
    async fn test_missing_session_is_fresh() {
        let store = MemorySessionStore::new();
        let session = store.get("nobody").await.unwrap();
        assert_eq!(session, Session::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_before_expiry() {
        let store = MemorySessionStore::new();
        let session = sample_session();
        store
            .put("s1", &session, Duration::from_secs(3600))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert_eq!(store.get("s1").await.unwrap(), session);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_reads_as_fresh() {
        let store = MemorySessionStore::new();
        store
            .put("s1", &sample_session(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        let session = store.get("s1").await.unwrap();
        assert!(session.history.is_empty());
        assert_eq!(session.language, Language::Vi);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_put_restarts_the_countdown() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(60);
        store.put("s1", &sample_session(), ttl).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        store.put("s1", &sample_session(), ttl).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!store.get("s1").await.unwrap().history.is_empty());

        tokio::time::advance(Duration::from_secs(16)).await;
        assert!(store.get("s1").await.unwrap().history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_abandoned_sessions() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(60);
        for i in 0..1000 {
            store
                .put(&format!("abandoned-{i}"), &sample_session(), ttl)
                .await
                .unwrap();
        }
        assert_eq!(store.entries.read().await.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.put("fresh", &sample_session(), ttl).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.entries.read().await.len(), 1);
        assert!(!store.get("fresh").await.unwrap().history.is_empty());
    }

    #[test]
    fn test_redis_key_is_namespaced() {
        assert_eq!(session_key("solar:context", "abc-123"), "solar:context:abc-123");
    }
}
