//! 세션 키 기반 인증 API 라이브러리.
//!
//! 세션마다 새로 생성한 RSA 키 페어로 토큰을 서명하고, 공개 키만 외부 저장소에
//! 남겨 검증합니다. 세션을 회전하면 이전 키로 서명된 토큰은 모두 무효화됩니다.
//!
//! # 모듈 구성
//!
//! - [`auth`]: 토큰 코덱, 세션 인증 엔진, 요청별 인가 게이트, 쿠키, 비밀번호
//! - [`repository`]: 사용자 저장소 (PostgreSQL, 메모리)
//! - [`routes`]: `/api/v1/auth`, `/health` 라우트
//! - [`middleware`]: 요청 제한, HTTP 메트릭
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`state`]: 핸들러 공유 상태

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod state;

pub use self::metrics::setup_metrics_recorder;
pub use routes::{create_router, metrics_router};
pub use state::AppState;
