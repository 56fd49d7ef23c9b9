//! # Sessionkey Core
//!
//! 세션 단위 키 페어로 서명되는 토큰 시스템의 핵심 타입을 제공합니다.
//!
//! 이 크레이트는 워크스페이스 전반에서 사용되는 기본 구성 요소를 제공합니다:
//! - 토큰 클레임 및 세션 도메인 타입
//! - 토큰/인증 에러 분류 체계
//! - 세션별 RSA 키 페어 발급 ([`KeyPairIssuer`])
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use crypto::{KeyPair, KeyPairIssuer, SigningKey, RSA_KEY_BITS};
pub use domain::*;
pub use error::*;
pub use logging::*;
