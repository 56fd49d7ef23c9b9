//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/auth` - 회원가입, 로그인, 회전, 로그아웃, 현재 사용자
//! - `/metrics` - Prometheus 메트릭 ([`metrics_router`], 별도 상태)

pub mod auth;
pub mod health;

pub use auth::{
    auth_router, LoginRequest, MeResponse, MessageResponse, RegisterRequest, UserResponse,
};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};

use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sessionkey_core::RateLimitSettings;
use tracing::info;

use crate::middleware::{metrics_layer, rate_limit_middleware, RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 요청 제한은 인증 라우트에만 적용됩니다. 헬스 체크와 `/metrics`는 제외됩니다.
pub fn create_router(state: Arc<AppState>, rate_limit: &RateLimitSettings) -> Router {
    let mut auth = auth_router(state.clone());

    if rate_limit.disabled {
        info!("Rate limiting disabled");
    } else {
        let limiter = RateLimiter::new(RateLimitConfig::from(rate_limit));
        limiter.spawn_cleanup();
        auth = auth.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/auth", auth)
        .layer(middleware::from_fn(metrics_layer))
        .with_state(state)
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// `/metrics` 라우터. 요청 제한과 HTTP 메트릭 수집에서 제외됩니다.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(handle)
}
