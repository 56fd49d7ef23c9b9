//! 토큰 및 인증 에러 타입.
//!
//! 검증 실패 사유는 [`TokenError`]로, 엔진 수준의 실패(저장소, 키 생성, 서명)는
//! [`AuthError`]로 구분합니다. `code()`가 반환하는 코드는 로그 전용이며
//! 신뢰할 수 없는 클라이언트에게 그대로 노출하지 않습니다.

use thiserror::Error;

use crate::domain::TokenKind;

/// 토큰 검증 실패 사유.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// 클레임 형식 오류 (필수 필드 누락, 알 수 없는 타입 등)
    #[error("잘못된 토큰 페이로드: {0}")]
    InvalidPayload(String),

    /// 기대한 토큰 타입과 실제 타입이 다름
    #[error("토큰 타입 불일치: expected {expected}, got {actual}")]
    InvalidTokenType {
        expected: TokenKind,
        actual: TokenKind,
    },

    /// 세션 공개 키 없음 (로그아웃 또는 TTL 만료)
    #[error("공개 키를 찾을 수 없거나 만료되었습니다")]
    PublicKeyNotFound,

    /// exp 클레임 기준 만료
    #[error("토큰이 만료되었습니다")]
    TokenExpired,

    /// 서명 불일치 (회전 이전 키로 서명된 토큰 포함)
    #[error("토큰 서명이 유효하지 않습니다")]
    InvalidSignature,

    /// 기타 암호학적 검증 실패
    #[error("토큰 검증 실패: {0}")]
    VerifyError(String),
}

impl TokenError {
    /// 로그용 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidPayload(_) => "INVALID_PAYLOAD",
            TokenError::InvalidTokenType { .. } => "INVALID_TOKEN_TYPE",
            TokenError::PublicKeyNotFound => "PUBLIC_KEY_NOT_FOUND",
            TokenError::TokenExpired => "TOKEN_EXPIRED",
            TokenError::InvalidSignature => "INVALID_SIGNATURE",
            TokenError::VerifyError(_) => "VERIFY_ERROR",
        }
    }
}

/// 외부로 노출 가능한 에러 범주.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 인증 실패 (401)
    Unauthorized,
    /// 서버 내부 실패 (500)
    Internal,
}

/// 세션 인증 엔진 에러.
#[derive(Debug, Error)]
pub enum AuthError {
    /// 토큰 검증 실패
    #[error(transparent)]
    Token(#[from] TokenError),

    /// 세션 키 저장소 실패
    #[error("세션 저장소 에러: {0}")]
    Store(String),

    /// 키 페어 생성 실패
    #[error("키 페어 생성 실패: {0}")]
    KeyGeneration(String),

    /// 토큰 서명 실패
    #[error("토큰 서명 실패: {0}")]
    Signing(String),
}

/// 인증 작업을 위한 Result 타입.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// 로그용 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Token(e) => e.code(),
            AuthError::Store(_) => "STORE_ERROR",
            AuthError::KeyGeneration(_) => "KEY_GENERATION_ERROR",
            AuthError::Signing(_) => "SIGNING_ERROR",
        }
    }

    /// 외부 노출용 범주.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::Token(_) => ErrorCategory::Unauthorized,
            AuthError::Store(_) | AuthError::KeyGeneration(_) | AuthError::Signing(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// exp 만료로 인한 실패인지 확인합니다.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, AuthError::Token(TokenError::TokenExpired))
    }

    /// 토큰 검증 실패라면 그 사유를 반환합니다.
    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            AuthError::Token(e) => Some(e),
            _ => None,
        }
    }
}
