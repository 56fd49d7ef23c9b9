//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! `Arc<AppState>`로 래핑되어 요청 간에 공유됩니다.

use std::sync::Arc;

use sessionkey_core::AppConfig;
use sessionkey_store::SessionKeyStore;

use crate::auth::{AuthorizationGate, CookieSettings, SessionAuthEngine};
use crate::repository::UserRepository;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 세션 인증 엔진 - 발급, 회전, 검증, 폐기
    pub engine: Arc<SessionAuthEngine>,

    /// 요청별 인가 게이트
    pub gate: AuthorizationGate,

    /// 사용자 저장소 (PostgreSQL 또는 메모리)
    pub users: Arc<dyn UserRepository>,

    /// 토큰 쿠키 설정
    pub cookies: CookieSettings,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 설정으로 상태를 구성합니다.
    pub fn new(
        store: Arc<dyn SessionKeyStore>,
        users: Arc<dyn UserRepository>,
        config: &AppConfig,
    ) -> Self {
        let engine = Arc::new(SessionAuthEngine::from_config(store, &config.auth));
        Self::from_parts(engine, users, CookieSettings::from_config(config))
    }

    /// 이미 만든 엔진으로 상태를 구성합니다.
    pub fn from_parts(
        engine: Arc<SessionAuthEngine>,
        users: Arc<dyn UserRepository>,
        cookies: CookieSettings,
    ) -> Self {
        let gate = AuthorizationGate::new(engine.clone(), users.clone());

        Self {
            engine,
            gate,
            users,
            cookies,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 세션 키 저장소.
    pub fn store(&self) -> &Arc<dyn SessionKeyStore> {
        self.engine.store()
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// Redis 연결 상태 확인.
    pub async fn is_store_healthy(&self) -> bool {
        self.store().ping().await.is_ok()
    }

    /// 사용자 DB 연결 상태 확인.
    pub async fn is_users_healthy(&self) -> bool {
        self.users.ping().await.is_ok()
    }
}

/// 메모리 저장소로 테스트용 상태를 만듭니다.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    use crate::repository::MemoryUserRepository;
    use sessionkey_store::MemorySessionKeyStore;

    AppState::new(
        Arc::new(MemorySessionKeyStore::new()),
        Arc::new(MemoryUserRepository::new()),
        &AppConfig::default(),
    )
}
