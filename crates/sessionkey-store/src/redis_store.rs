//! Redis 세션 키 저장소 구현.
//!
//! `SET session:{id} <pem> EX <ttl>`, `GET`, `DEL`, `EXISTS` 명령만 사용합니다.
//! 모든 일관성은 Redis 단일 명령의 원자성에 의존하며, 프로세스 내 잠금은 없습니다.

use std::time::Duration;

use ::redis::{aio::ConnectionManager, AsyncCommands, Client};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sessionkey_core::RedisConfig;
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::traits::{session_key, SessionKeyStore};

/// Redis 기반 세션 키 저장소.
///
/// `ConnectionManager`는 내부적으로 멀티플렉싱되고 끊기면 재연결하므로
/// 복제해서 요청마다 사용합니다.
#[derive(Clone)]
pub struct RedisSessionKeyStore {
    connection: ConnectionManager,
}

impl RedisSessionKeyStore {
    /// 새로운 Redis 연결을 생성합니다.
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        info!("Connecting to Redis session store...");

        let client = Client::open(config.url.expose_secret())
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let timeout = Duration::from_secs(config.connection_timeout_secs);
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                StoreError::Timeout(format!(
                    "connect timed out after {}s",
                    config.connection_timeout_secs
                ))
            })??;

        info!("Redis session store connection established");

        Ok(Self { connection })
    }
}

#[async_trait]
impl SessionKeyStore for RedisSessionKeyStore {
    #[instrument(skip(self, public_key), fields(session_id = %session_id))]
    async fn set(&self, session_id: &str, public_key: &str, ttl_secs: u64) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(session_key(session_id), public_key, ttl_secs)
            .await?;

        debug!(ttl_secs, "Session public key stored");
        Ok(())
    }

    async fn get(&self, session_id: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(session_key(session_id)).await?;
        Ok(value)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn delete(&self, session_id: &str) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(session_key(session_id)).await?;

        debug!(deleted, "Session key deleted");
        Ok(deleted > 0)
    }

    async fn exists(&self, session_id: &str) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(session_key(session_id)).await?;
        Ok(exists)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let result: String = ::redis::cmd("PING").query_async(&mut conn).await?;

        if result == "PONG" {
            Ok(())
        } else {
            Err(StoreError::UnexpectedResponse(result))
        }
    }
}
