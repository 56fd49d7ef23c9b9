//! API 에러 응답 타입.
//!
//! 모든 엔드포인트가 같은 JSON 형식으로 에러를 반환합니다.
//! 토큰 검증 실패의 세부 사유는 로그에만 남기고 클라이언트에는 일반적인
//! `UNAUTHORIZED` 응답만 보냅니다.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sessionkey_core::{AuthError, ErrorCategory};
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::auth::{GateError, PasswordError, RejectReason};
use crate::metrics::{record_auth_failure, record_auth_rejection};
use crate::repository::RepositoryError;

/// API 에러 응답.
///
/// ```json
/// {
///   "code": "UNAUTHORIZED",
///   "message": "Unauthorized",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "UNAUTHORIZED", "VALIDATION_ERROR")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 타임스탬프를 포함한 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 핸들러 에러 타입.
pub type ApiError = (StatusCode, Json<ApiErrorResponse>);

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

/// 일반 401 응답.
pub fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorResponse::new("UNAUTHORIZED", "Unauthorized")),
    )
}

/// 일반 500 응답.
pub fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiErrorResponse::new(
            "INTERNAL_ERROR",
            "Internal server error",
        )),
    )
}

/// 400 요청 형식 오류.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::new("VALIDATION_ERROR", message)),
    )
}

/// `validator` 검증 실패를 400 응답으로 변환합니다.
///
/// `details`에는 필드별 메시지 목록이 담깁니다.
pub fn validation_error(errors: ValidationErrors) -> ApiError {
    let details: serde_json::Map<String, Value> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{}: invalid value", field))
                })
                .map(Value::String)
                .collect();
            (field.to_string(), Value::Array(messages))
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::with_details(
            "VALIDATION_ERROR",
            "Invalid request body",
            Value::Object(details),
        )),
    )
}

/// 엔진 에러를 응답으로 변환합니다.
///
/// 토큰 실패는 401, 저장소/키 생성/서명 실패는 500입니다.
pub fn auth_failure(err: AuthError) -> ApiError {
    match err.category() {
        ErrorCategory::Unauthorized => {
            warn!(code = err.code(), error = %err, "Token rejected");
            record_auth_rejection(err.code());
            unauthorized()
        }
        ErrorCategory::Internal => {
            error!(code = err.code(), error = %err, "Session engine failure");
            record_auth_failure(err.code());
            internal_error()
        }
    }
}

/// 게이트 거부 사유를 응답으로 변환합니다.
pub fn rejection(reason: &RejectReason) -> ApiError {
    warn!(code = reason.code(), "Request rejected by authorization gate");
    record_auth_rejection(reason.code());
    unauthorized()
}

/// 게이트 내부 실패를 응답으로 변환합니다.
pub fn gate_failure(err: GateError) -> ApiError {
    match err {
        GateError::Auth(e) => auth_failure(e),
        GateError::Repository(e) => repository_failure(e),
    }
}

/// 사용자 저장소 실패를 응답으로 변환합니다.
pub fn repository_failure(err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::Duplicate(_) => (
            StatusCode::CONFLICT,
            Json(ApiErrorResponse::new(
                "EMAIL_IN_USE",
                "Email already in use.",
            )),
        ),
        RepositoryError::Database(msg) => {
            error!(error = %msg, "User repository failure");
            record_auth_failure("REPOSITORY_ERROR");
            internal_error()
        }
    }
}

/// 비밀번호 해싱 실패를 응답으로 변환합니다.
pub fn password_failure(err: PasswordError) -> ApiError {
    error!(error = %err, "Password hashing failure");
    internal_error()
}
