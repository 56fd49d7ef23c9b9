//! Axum용 인증 미들웨어 및 추출기.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use sessionkey_core::SessionId;
use tracing::debug;

use super::gate::GateState;
use crate::error::{gate_failure, rejection, unauthorized, ApiError};
use crate::repository::UserProfile;
use crate::state::AppState;

/// 인증된 요청 정보. `require_auth`가 요청 확장에 넣습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user: UserProfile,
    pub session_id: SessionId,
    /// 이번 요청에서 세션이 회전되었는지 여부
    pub rotated: bool,
}

/// 쿠키로 인가 게이트를 실행하는 미들웨어.
///
/// 회전이 일어나면 응답에 새 토큰 쿠키를 추가합니다.
///
/// ```rust,ignore
/// Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
/// ```
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = state.cookies.credentials(&jar);

    let authorized = match state.gate.authorize(&credentials).await {
        Ok(GateState::Authorized(authorized)) => authorized,
        Ok(GateState::Rejected(reason)) => return rejection(&reason).into_response(),
        Ok(other) => {
            // authorize는 종료 상태만 반환함
            debug!(state = ?other, "Gate returned non-terminal state");
            return unauthorized().into_response();
        }
        Err(e) => return gate_failure(e).into_response(),
    };

    request.extensions_mut().insert(AuthContext {
        user: authorized.user.profile(),
        session_id: authorized.session_id.clone(),
        rotated: authorized.rotated.is_some(),
    });

    let response = next.run(request).await;

    match authorized.rotated {
        Some(tokens) => {
            debug!(session_id = %authorized.session_id, "Attaching rotated token cookies");
            let jar = state.cookies.set_tokens(CookieJar::new(), &tokens);
            (jar, response).into_response()
        }
        None => response,
    }
}

/// 인증된 사용자 추출기.
///
/// `require_auth`가 적용되지 않은 라우트에서는 항상 401을 반환합니다.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(unauthorized)
    }
}
