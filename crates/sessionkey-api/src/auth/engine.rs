//! 세션 인증 엔진.
//!
//! 키 페어 발급기, 세션 키 저장소, 토큰 코덱을 묶어 세션 생명주기를 관리합니다.
//!
//! 발급과 회전은 항상 같은 순서를 따릅니다.
//! 1. 새 키 페어 생성
//! 2. 공개 키를 `session:{id}`에 저장 (TTL = Refresh Token 수명)
//! 3. 같은 개인 키로 Access/Refresh Token 서명
//! 4. 개인 키 폐기
//!
//! 저장에 실패하면 토큰은 만들어지지 않습니다.

use std::sync::Arc;

use chrono::Duration;
use sessionkey_core::{
    AuthConfig, AuthResult, IssuedSession, KeyPairIssuer, SessionId, TokenClaims, TokenKind,
    TokenPair, UserIdentity, VerifiedToken,
};
use sessionkey_store::SessionKeyStore;
use tracing::{debug, info, instrument};

use super::clock::{Clock, SystemClock};
use super::codec::TokenCodec;
use crate::metrics::{record_session_event, SessionEvent};

/// Access/Refresh Token 수명.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::days(7),
        }
    }
}

impl From<&AuthConfig> for TokenLifetimes {
    fn from(config: &AuthConfig) -> Self {
        Self {
            access: config.access_ttl(),
            refresh: config.refresh_ttl(),
        }
    }
}

impl TokenLifetimes {
    /// 저장소 TTL (초). Refresh Token 수명과 같습니다.
    pub fn store_ttl_secs(&self) -> u64 {
        self.refresh.num_seconds().max(1) as u64
    }
}

/// 세션 인증 엔진.
///
/// 전역 인스턴스 없이 명시적으로 생성하여 `Arc`로 HTTP 계층과 공유합니다.
pub struct SessionAuthEngine {
    issuer: KeyPairIssuer,
    codec: TokenCodec,
    store: Arc<dyn SessionKeyStore>,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
}

impl SessionAuthEngine {
    /// 새 엔진 생성.
    pub fn new(store: Arc<dyn SessionKeyStore>, lifetimes: TokenLifetimes) -> Self {
        Self {
            issuer: KeyPairIssuer::new(),
            codec: TokenCodec::new(store.clone()),
            store,
            clock: Arc::new(SystemClock),
            lifetimes,
        }
    }

    /// 설정에서 수명을 읽어 엔진을 생성합니다.
    pub fn from_config(store: Arc<dyn SessionKeyStore>, config: &AuthConfig) -> Self {
        Self::new(store, TokenLifetimes::from(config))
    }

    /// 시계 교체.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionKeyStore> {
        &self.store
    }

    /// 새 세션을 만들고 토큰 쌍을 발급합니다.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn issue(&self, user: &UserIdentity) -> AuthResult<IssuedSession> {
        let session_id = SessionId::generate();
        let tokens = self.install_key_pair(user, session_id.as_str()).await?;

        info!(session_id = %session_id, "Session issued");
        record_session_event(SessionEvent::Issued);

        Ok(IssuedSession { session_id, tokens })
    }

    /// 기존 세션의 키 페어를 교체하고 새 토큰 쌍을 발급합니다.
    ///
    /// 같은 `session_id`를 유지하며, 이전 키로 서명된 토큰은 이후 서명 검증에 실패합니다.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn rotate(&self, user: &UserIdentity, session_id: &str) -> AuthResult<TokenPair> {
        let tokens = self.install_key_pair(user, session_id).await?;

        info!(session_id = %session_id, "Session rotated");
        record_session_event(SessionEvent::Rotated);

        Ok(tokens)
    }

    /// 토큰 검증.
    pub async fn verify(
        &self,
        token: &str,
        expected: Option<TokenKind>,
    ) -> AuthResult<VerifiedToken> {
        self.codec.verify(token, expected).await
    }

    /// 세션 공개 키가 남아 있는지 확인합니다.
    pub async fn is_valid(&self, session_id: &str) -> AuthResult<bool> {
        Ok(self.store.exists(session_id).await?)
    }

    /// 세션을 폐기합니다. 이후 해당 세션의 모든 토큰은 `PublicKeyNotFound`로 실패합니다.
    #[instrument(skip(self))]
    pub async fn revoke(&self, session_id: &str) -> AuthResult<()> {
        let removed = self.store.delete(session_id).await?;

        info!(removed, "Session revoked");
        if removed {
            record_session_event(SessionEvent::Revoked);
        }
        Ok(())
    }

    async fn install_key_pair(
        &self,
        user: &UserIdentity,
        session_id: &str,
    ) -> AuthResult<TokenPair> {
        let (signing_key, public_key) = self.issuer.generate()?.into_parts();

        self.store
            .set(session_id, &public_key, self.lifetimes.store_ttl_secs())
            .await?;
        debug!(session_id = %session_id, "Public key stored");

        let issued_at = self.clock.now();
        let access_claims = TokenClaims::access(&user.id, &user.email, session_id);
        let refresh_claims = TokenClaims::refresh(&user.id, session_id);

        let access_token =
            TokenCodec::sign(&access_claims, &signing_key, issued_at, self.lifetimes.access)?;
        let refresh_token =
            TokenCodec::sign(&refresh_claims, &signing_key, issued_at, self.lifetimes.refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
