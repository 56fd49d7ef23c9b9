//! 프로세스 내 세션 키 저장소.
//!
//! Redis와 같은 의미(upsert 시 TTL 재설정, 만료된 키는 없는 것으로 취급)를
//! `HashMap`으로 흉내냅니다. 만료는 조회 시점에 지연 처리됩니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::StoreResult;
use crate::traits::{session_key, SessionKeyStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// 메모리 기반 세션 키 저장소.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionKeyStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료되지 않은 세션 수.
    pub async fn live_sessions(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// 만료된 항목 정리.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }
}

#[async_trait]
impl SessionKeyStore for MemorySessionKeyStore {
    async fn set(&self, session_id: &str, public_key: &str, ttl_secs: u64) -> StoreResult<()> {
        let entry = Entry {
            value: public_key.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries
            .write()
            .await
            .insert(session_key(session_id), entry);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(&session_key(session_id))
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn delete(&self, session_id: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let removed = self
            .entries
            .write()
            .await
            .remove(&session_key(session_id));
        Ok(removed.is_some_and(|e| e.is_live(now)))
    }

    async fn exists(&self, session_id: &str) -> StoreResult<bool> {
        Ok(self.get(session_id).await?.is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
