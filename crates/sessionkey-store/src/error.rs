//! 저장소 오류 타입.

use sessionkey_core::AuthError;
use thiserror::Error;

/// 세션 키 저장소 오류.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 연결 오류
    #[error("Store connection error: {0}")]
    ConnectionError(String),

    /// 명령 실행 오류
    #[error("Store command error: {0}")]
    CommandError(String),

    /// 타임아웃 오류
    #[error("Store operation timeout: {0}")]
    Timeout(String),

    /// 예상하지 못한 응답
    #[error("Unexpected store response: {0}")]
    UnexpectedResponse(String),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::ConnectionError(err.to_string())
        } else if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else {
            StoreError::CommandError(err.to_string())
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
