//! 인증 endpoint.
//!
//! - `POST /register` - 회원가입 후 세션 발급
//! - `POST /login` - 로그인 후 세션 발급
//! - `POST /refresh` - Refresh Token으로 세션 회전
//! - `POST /logout` - 세션 폐기 및 쿠키 삭제
//! - `GET /me` - 현재 사용자 (인가 게이트 적용)
//!
//! 토큰은 응답 본문이 아닌 HttpOnly 쿠키로만 전달됩니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use sessionkey_core::{SessionId, TokenKind};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{hash_password, require_auth, verify_password, CurrentUser, PasswordError};
use crate::error::{
    auth_failure, bad_request, password_failure, repository_failure, unauthorized,
    validation_error, ApiError, ApiErrorResponse, ApiResult,
};
use crate::repository::{NewUser, RepositoryError, UserProfile};
use crate::state::AppState;

// ================================================================================================
// Request / Response
// ================================================================================================

/// 회원가입 요청.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// 로그인 요청.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserProfile,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// 이메일은 소문자로 저장/조회합니다.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 본문 파싱과 필드 검증.
fn validated<T: Validate>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(request) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    request.validate().map_err(validation_error)?;
    Ok(request)
}

fn wrong_credentials() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorResponse::new(
            "INVALID_CREDENTIALS",
            "Wrong email or password.",
        )),
    )
}

// ================================================================================================
// Handlers
// ================================================================================================

/// 회원가입.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, CookieJar, Json<UserResponse>)> {
    let request = validated(body)?;
    let email = normalize_email(&request.email);

    if state
        .users
        .find_by_email(&email)
        .await
        .map_err(repository_failure)?
        .is_some()
    {
        return Err(repository_failure(RepositoryError::Duplicate(email)));
    }

    let password_hash = hash_password(&request.password).map_err(password_failure)?;

    let user = state
        .users
        .create(NewUser {
            email,
            name: request.name.filter(|n| !n.trim().is_empty()),
            password_hash,
        })
        .await
        .map_err(repository_failure)?;

    let session = state
        .engine
        .issue(&user.identity())
        .await
        .map_err(auth_failure)?;

    info!(user_id = %user.id, session_id = %session.session_id, "User registered");

    let jar = state.cookies.set_tokens(jar, &session.tokens);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(UserResponse {
            user: user.profile(),
        }),
    ))
}

/// 로그인.
///
/// 이메일이 없는 경우와 비밀번호가 틀린 경우 같은 응답을 반환합니다.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<UserResponse>)> {
    let request = validated(body)?;
    let email = normalize_email(&request.email);

    let Some(user) = state
        .users
        .find_by_email(&email)
        .await
        .map_err(repository_failure)?
    else {
        warn!("Login failed: unknown email");
        return Err(wrong_credentials());
    };

    match verify_password(&request.password, &user.password_hash) {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(wrong_credentials());
        }
        Err(e) => return Err(password_failure(e)),
    }

    let session = state
        .engine
        .issue(&user.identity())
        .await
        .map_err(auth_failure)?;

    info!(user_id = %user.id, session_id = %session.session_id, "User logged in");

    let jar = state.cookies.set_tokens(jar, &session.tokens);
    Ok((
        jar,
        Json(UserResponse {
            user: user.profile(),
        }),
    ))
}

/// Refresh Token으로 세션을 회전합니다.
///
/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<UserResponse>)> {
    let token = state.cookies.refresh_token(&jar).ok_or_else(unauthorized)?;

    let verified = state
        .engine
        .verify(&token, Some(TokenKind::Refresh))
        .await
        .map_err(auth_failure)?;
    let session_id = verified.claims.session_id().to_string();

    let Some(user) = state
        .users
        .find_by_id(verified.claims.user_id())
        .await
        .map_err(repository_failure)?
    else {
        warn!(session_id = %session_id, "Refresh rejected: user not found");
        return Err(unauthorized());
    };

    let tokens = state
        .engine
        .rotate(&user.identity(), &session_id)
        .await
        .map_err(auth_failure)?;

    let jar = state.cookies.set_tokens(jar, &tokens);
    Ok((
        jar,
        Json(UserResponse {
            user: user.profile(),
        }),
    ))
}

/// 로그아웃. 세션 공개 키를 삭제하고 쿠키를 비웁니다.
///
/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let token = state.cookies.refresh_token(&jar).ok_or_else(unauthorized)?;

    let verified = state
        .engine
        .verify(&token, Some(TokenKind::Refresh))
        .await
        .map_err(auth_failure)?;

    state
        .engine
        .revoke(verified.claims.session_id())
        .await
        .map_err(auth_failure)?;

    Ok((
        state.cookies.clear(jar),
        Json(MessageResponse {
            message: "Logged out successfully.".to_string(),
        }),
    ))
}

/// 현재 사용자.
///
/// GET /api/v1/auth/me
pub async fn me(CurrentUser(ctx): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: ctx.user,
        session_id: ctx.session_id,
    })
}

/// 인증 라우터 생성.
///
/// `/me`에만 인가 게이트가 적용됩니다.
pub fn auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .merge(protected)
}
