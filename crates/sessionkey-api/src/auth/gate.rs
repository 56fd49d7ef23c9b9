//! 요청별 인가 게이트.
//!
//! 상태 전이:
//!
//! ```text
//! NoCredentials ─ access 있음 ─▶ CheckingAccess ─ 성공 ─▶ Authorized (회전 없음)
//!       │                             │
//!       │ access 없음                 │ TokenExpired
//!       ▼                             ▼
//!  CheckingRefresh ◀──────────────────┘
//!       │ 성공 → 사용자 확인 → rotate → Authorized (새 토큰 쌍)
//!       └ 실패 → Rejected
//! ```
//!
//! Access Token의 만료 이외의 실패는 Refresh Token으로 넘어가지 않고 즉시 거부됩니다.

use std::sync::Arc;

use sessionkey_core::{AuthError, SessionId, TokenError, TokenKind, TokenPair};
use tracing::debug;

use super::engine::SessionAuthEngine;
use crate::repository::{RepositoryError, User, UserRepository};

/// 요청에서 읽은 자격 증명.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        // 빈 쿠키 값은 없는 것으로 취급
        Self {
            access_token: access_token.filter(|t| !t.is_empty()),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// 거부 사유.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Refresh Token이 필요한데 없음
    MissingCredentials,
    /// 토큰은 유효하지만 사용자가 없음
    UserNotFound,
    /// 토큰 검증 실패
    Token(TokenError),
}

impl RejectReason {
    /// 로그용 코드.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingCredentials => "MISSING_CREDENTIALS",
            RejectReason::UserNotFound => "USER_NOT_FOUND",
            RejectReason::Token(e) => e.code(),
        }
    }
}

/// 인가 성공 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub user: User,
    pub session_id: SessionId,
    /// 회전이 일어났다면 전송 계층이 저장해야 할 새 토큰 쌍
    pub rotated: Option<TokenPair>,
}

/// 게이트 상태.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    NoCredentials,
    CheckingAccess,
    CheckingRefresh,
    Authorized(Authorized),
    Rejected(RejectReason),
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Authorized(_) | GateState::Rejected(_))
    }
}

/// 게이트 내부 실패 (저장소, 키 생성, 서명, 사용자 DB).
///
/// 자격 증명 문제가 아니므로 거부가 아닌 서버 오류로 처리됩니다.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Auth(e) => e.code(),
            GateError::Repository(_) => "REPOSITORY_ERROR",
        }
    }
}

/// 요청별 인가 게이트.
#[derive(Clone)]
pub struct AuthorizationGate {
    engine: Arc<SessionAuthEngine>,
    users: Arc<dyn UserRepository>,
}

impl AuthorizationGate {
    pub fn new(engine: Arc<SessionAuthEngine>, users: Arc<dyn UserRepository>) -> Self {
        Self { engine, users }
    }

    /// 종료 상태(`Authorized` 또는 `Rejected`)에 도달할 때까지 게이트를 실행합니다.
    pub async fn authorize(&self, credentials: &Credentials) -> Result<GateState, GateError> {
        let mut state = GateState::NoCredentials;
        while !state.is_terminal() {
            state = self.step(state, credentials).await?;
        }
        Ok(state)
    }

    /// 한 단계 전이.
    pub async fn step(
        &self,
        state: GateState,
        credentials: &Credentials,
    ) -> Result<GateState, GateError> {
        match state {
            GateState::NoCredentials => Ok(if credentials.access_token.is_some() {
                GateState::CheckingAccess
            } else {
                GateState::CheckingRefresh
            }),
            GateState::CheckingAccess => self.check_access(credentials).await,
            GateState::CheckingRefresh => self.check_refresh(credentials).await,
            terminal => Ok(terminal),
        }
    }

    async fn check_access(&self, credentials: &Credentials) -> Result<GateState, GateError> {
        let Some(token) = credentials.access_token.as_deref() else {
            return Ok(GateState::CheckingRefresh);
        };

        let verified = match self.engine.verify(token, Some(TokenKind::Access)).await {
            Ok(verified) => verified,
            Err(e) if e.is_token_expired() => {
                debug!("Access token expired, falling back to refresh token");
                return Ok(GateState::CheckingRefresh);
            }
            Err(e) => return reject_or_fail(e),
        };

        let Some(user) = self.users.find_by_id(verified.claims.user_id()).await? else {
            return Ok(GateState::Rejected(RejectReason::UserNotFound));
        };

        Ok(GateState::Authorized(Authorized {
            user,
            session_id: SessionId::from(verified.claims.session_id()),
            rotated: None,
        }))
    }

    async fn check_refresh(&self, credentials: &Credentials) -> Result<GateState, GateError> {
        let Some(token) = credentials.refresh_token.as_deref() else {
            return Ok(GateState::Rejected(RejectReason::MissingCredentials));
        };

        let verified = match self.engine.verify(token, Some(TokenKind::Refresh)).await {
            Ok(verified) => verified,
            Err(e) => return reject_or_fail(e),
        };

        let Some(user) = self.users.find_by_id(verified.claims.user_id()).await? else {
            return Ok(GateState::Rejected(RejectReason::UserNotFound));
        };

        let session_id = verified.claims.session_id();
        let tokens = self.engine.rotate(&user.identity(), session_id).await?;

        Ok(GateState::Authorized(Authorized {
            user,
            session_id: SessionId::from(session_id),
            rotated: Some(tokens),
        }))
    }
}

/// 토큰 검증 실패는 거부, 그 외(저장소 등)는 내부 실패.
fn reject_or_fail(err: AuthError) -> Result<GateState, GateError> {
    if let Some(reason) = err.token_error() {
        return Ok(GateState::Rejected(RejectReason::Token(reason.clone())));
    }
    Err(GateError::Auth(err))
}
