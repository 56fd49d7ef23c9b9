//! 인증 및 세션 관리.
//!
//! 세션별 키 페어로 서명한 토큰의 발급, 검증, 회전, 폐기를 담당합니다.
//!
//! # 구성 요소
//!
//! - [`TokenCodec`]: RS256 서명 및 2단계 검증 (페이로드 확인 → 공개 키 조회 → 서명 검증)
//! - [`SessionAuthEngine`]: `issue` / `rotate` / `is_valid` / `revoke`
//! - [`AuthorizationGate`]: Access Token 확인, 만료 시 Refresh Token으로 회전
//! - [`require_auth`]: 게이트를 실행하는 Axum 미들웨어
//! - [`CurrentUser`]: 인증된 사용자 추출기
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn protected_handler(CurrentUser(ctx): CurrentUser) -> impl IntoResponse {
//!     format!("Hello, {}!", ctx.user.email)
//! }
//! ```

mod clock;
mod codec;
mod cookies;
mod engine;
mod gate;
mod middleware;
mod password;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::TokenCodec;
pub use cookies::CookieSettings;
pub use engine::{SessionAuthEngine, TokenLifetimes};
pub use gate::{
    AuthorizationGate, Authorized, Credentials, GateError, GateState, RejectReason,
};
pub use middleware::{require_auth, AuthContext, CurrentUser};
pub use password::{hash_password, verify_password, PasswordError};
