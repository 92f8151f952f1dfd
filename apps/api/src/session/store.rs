use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::SessionState;

/// A mutation applied to the latest stored session. May run more than once
/// when a concurrent writer wins the race.
pub type SessionUpdate<'a> = &'a (dyn Fn(&mut SessionState) + Send + Sync);

/// Pluggable session persistence. Default: `MemorySessionStore`.
/// `RedisSessionStore` is used when `REDIS_URL` is set.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, AppError>;
    /// Writes a session unconditionally. Used for new sessions.
    async fn save(&self, session: &SessionState) -> Result<(), AppError>;
    /// Applies `apply` atomically with respect to other updates of the same
    /// session, bumps the revision and returns the stored value.
    async fn update(&self, id: Uuid, apply: SessionUpdate<'_>) -> Result<SessionState, AppError>;
    /// Returns false when the session did not exist.
    async fn remove(&self, id: Uuid) -> Result<bool, AppError>;

    fn name(&self) -> &'static str;
}

/// Loads a session or fails with `NotFound`.
pub async fn require_session(
    store: &dyn SessionStore,
    id: Uuid,
) -> Result<SessionState, AppError> {
    store.load(id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}

// ────────────────────────────────────────────────────────────────────────────
// In-process store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, AppError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn save(&self, session: &SessionState) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn update(&self, id: Uuid, apply: SessionUpdate<'_>) -> Result<SessionState, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        apply(session);
        session.revision += 1;
        Ok(session.clone())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis store
// ────────────────────────────────────────────────────────────────────────────

const KEY_PREFIX: &str = "discovery:session:";

const MAX_UPDATE_ATTEMPTS: usize = 5;

// KEYS[1] session key, ARGV[1] expected revision, ARGV[2] new JSON, ARGV[3] ttl.
// Returns -1 when the key is gone, 0 on a revision mismatch, 1 when written.
const COMPARE_AND_SET: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then return -1 end
local revision = cjson.decode(current).revision or 0
if revision ~= tonumber(ARGV[1]) then return 0 end
redis.call('SET', KEYS[1], ARGV[2], 'EX', tonumber(ARGV[3]))
return 1
"#;

fn session_key(id: Uuid) -> String {
    format!("{KEY_PREFIX}{id}")
}

fn encode(session: &SessionState) -> Result<String, AppError> {
    serde_json::to_string(session)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session serialization failed: {e}")))
}

/// Sessions serialized as JSON under `discovery:session:<id>`, refreshed to
/// the configured TTL on every write. Updates are revision-checked in a Lua
/// script and retried on conflict.
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
    compare_and_set: redis::Script,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        info!("Redis session store connected (ttl {ttl_secs}s)");
        Ok(Self {
            conn,
            ttl_secs,
            compare_and_set: redis::Script::new(COMPARE_AND_SET),
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(session_key(id)).await?;
        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::SessionStore(format!("Corrupt session {id}: {e}")))
        })
        .transpose()
    }

    async fn save(&self, session: &SessionState) -> Result<(), AppError> {
        let json = encode(session)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(session_key(session.id), json, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn update(&self, id: Uuid, apply: SessionUpdate<'_>) -> Result<SessionState, AppError> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut session = self.load(id).await?.ok_or_else(|| not_found(id))?;
            let expected = session.revision;
            apply(&mut session);
            session.revision = expected + 1;

            let mut conn = self.conn.clone();
            let written: i64 = self
                .compare_and_set
                .key(session_key(id))
                .arg(expected)
                .arg(encode(&session)?)
                .arg(self.ttl_secs)
                .invoke_async(&mut conn)
                .await?;
            match written {
                1 => return Ok(session),
                -1 => return Err(not_found(id)),
                _ => warn!("Session {id}: revision {expected} conflict (attempt {attempt})"),
            }
        }
        Err(AppError::SessionStore(format!(
            "Session {id} kept changing; update abandoned after {MAX_UPDATE_ATTEMPTS} attempts"
        )))
    }

    async fn remove(&self, id: Uuid) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(session_key(id)).await?;
        Ok(removed > 0)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::analyzer::AnalysisResult;
    use crate::intake::models::{ContentKind, UploadedContent};

    #[tokio::test]
    async fn test_memory_store_roundtrip_and_remove() {
        let store = MemorySessionStore::new();
        let session = SessionState::new();
        store.save(&session).await.unwrap();

        let loaded = store.load(session.id).await.unwrap();
        assert_eq!(loaded, Some(session.clone()));

        assert!(store.remove(session.id).await.unwrap());
        assert!(!store.remove(session.id).await.unwrap());
        assert!(store.load(session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let mut a = SessionState::new();
        let b = SessionState::new();
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        a.reset();
        a.set_analysis(crate::discovery::analyzer::AnalysisResult::insufficient_content());
        store.save(&a).await.unwrap();

        let loaded_b = store.load(b.id).await.unwrap().unwrap();
        assert!(loaded_b.analysis.is_none());
    }

    #[tokio::test]
    async fn test_require_session_unknown_id_is_not_found() {
        let store = MemorySessionStore::new();
        let err = require_session(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_applies_to_latest_value_and_bumps_revision() {
        let store = MemorySessionStore::new();
        let session = SessionState::new();
        store.save(&session).await.unwrap();

        // A stale copy held elsewhere does not affect the update.
        let _stale = store.load(session.id).await.unwrap().unwrap();
        store
            .update(session.id, &|s| s.set_analysis(AnalysisResult::insufficient_content()))
            .await
            .unwrap();
        let updated = store.update(session.id, &|s| s.reset()).await.unwrap();

        assert_eq!(updated.revision, 2);
        assert!(updated.analysis.is_none());
        assert_eq!(store.load(session.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_all_kept() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let session = SessionState::new();
        let id = session.id;
        store.save(&session).await.unwrap();

        let mut tasks = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let upload = UploadedContent::new(
                    id,
                    format!("note-{n}.txt"),
                    ContentKind::Text,
                    "We use SageMaker.".to_string(),
                );
                store
                    .update(id, &|s| s.add_upload(upload.clone()))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let loaded = store.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.uploads.len(), 8);
        assert_eq!(loaded.revision, 8);
    }

    #[tokio::test]
    async fn test_update_unknown_session_is_not_found() {
        let store = MemorySessionStore::new();
        let err = store.update(Uuid::new_v4(), &|_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_session_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            session_key(id),
            "discovery:session:00000000-0000-0000-0000-000000000000"
        );
    }
}
