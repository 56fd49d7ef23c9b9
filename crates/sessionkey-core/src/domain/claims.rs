//! 토큰 클레임 타입.
//!
//! 서명 대상 페이로드([`WireClaims`]), 서명 검증 전의 신뢰할 수 없는 페이로드
//! ([`UntrustedClaims`]), 그리고 검증 후 애플리케이션이 다루는 태그드 유니온
//! ([`TokenClaims`])을 정의합니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// 토큰 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// 단기 Access Token
    Access,
    /// 장기 Refresh Token
    Refresh,
}

impl TokenKind {
    /// `type` 클레임 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(TokenError::InvalidPayload(format!(
                "unknown token type: {other}"
            ))),
        }
    }
}

/// Access Token 클레임.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: String,
    pub email: String,
    pub session_id: String,
}

/// Refresh Token 클레임.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub user_id: String,
    pub session_id: String,
}

/// 검증된 토큰 클레임.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClaims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl TokenClaims {
    /// Access 클레임 생성.
    pub fn access(
        user_id: impl Into<String>,
        email: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        TokenClaims::Access(AccessClaims {
            user_id: user_id.into(),
            email: email.into(),
            session_id: session_id.into(),
        })
    }

    /// Refresh 클레임 생성.
    pub fn refresh(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        TokenClaims::Refresh(RefreshClaims {
            user_id: user_id.into(),
            session_id: session_id.into(),
        })
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            TokenClaims::Access(_) => TokenKind::Access,
            TokenClaims::Refresh(_) => TokenKind::Refresh,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            TokenClaims::Access(c) => &c.user_id,
            TokenClaims::Refresh(c) => &c.user_id,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            TokenClaims::Access(c) => &c.session_id,
            TokenClaims::Refresh(c) => &c.session_id,
        }
    }

    /// Access 클레임이면 이메일을 반환합니다.
    pub fn email(&self) -> Option<&str> {
        match self {
            TokenClaims::Access(c) => Some(&c.email),
            TokenClaims::Refresh(_) => None,
        }
    }
}

/// JWT 페이로드 직렬화 형식.
///
/// 필드명은 camelCase (`userId`, `sessionId`, `type`)로 직렬화됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireClaims {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl WireClaims {
    /// 발급 시각과 수명으로 페이로드를 구성합니다.
    pub fn new(claims: &TokenClaims, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            user_id: claims.user_id().to_string(),
            email: claims.email().map(str::to_string),
            session_id: claims.session_id().to_string(),
            kind: claims.kind(),
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
        }
    }
}

/// 서명 검증 전의 페이로드.
///
/// 모든 필드가 선택적이며, [`UntrustedClaims::into_claims`]에서 필드 존재 여부를
/// 명시적으로 확인한 뒤에만 [`TokenClaims`]로 변환됩니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UntrustedClaims {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
}

fn required(field: Option<String>, name: &str) -> Result<String, TokenError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(TokenError::InvalidPayload(format!("missing claim: {name}"))),
    }
}

impl UntrustedClaims {
    /// JSON 바이트에서 페이로드를 파싱합니다.
    pub fn from_json(bytes: &[u8]) -> Result<Self, TokenError> {
        serde_json::from_slice(bytes)
            .map_err(|e| TokenError::InvalidPayload(format!("malformed claims: {e}")))
    }

    /// 토큰 타입 클레임만 해석합니다.
    pub fn token_kind(&self) -> Result<TokenKind, TokenError> {
        self.kind
            .as_deref()
            .ok_or_else(|| TokenError::InvalidPayload("missing claim: type".to_string()))?
            .parse()
    }

    /// 필드 존재 여부를 확인하여 태그드 유니온으로 변환합니다.
    pub fn into_claims(self) -> Result<TokenClaims, TokenError> {
        let kind = self.token_kind()?;
        let session_id = required(self.session_id, "sessionId")?;
        let user_id = required(self.user_id, "userId")?;

        match kind {
            TokenKind::Access => {
                let email = required(self.email, "email")?;
                Ok(TokenClaims::Access(AccessClaims {
                    user_id,
                    email,
                    session_id,
                }))
            }
            TokenKind::Refresh => Ok(TokenClaims::Refresh(RefreshClaims {
                user_id,
                session_id,
            })),
        }
    }
}

/// 검증이 끝난 토큰.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub claims: TokenClaims,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}
