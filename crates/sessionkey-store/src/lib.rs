//! 세션 공개 키 저장소.
//!
//! `session:{sessionId} -> publicKey` 형태의 TTL 키/값 저장소를 추상화합니다.
//!
//! # 모듈 구성
//!
//! - [`SessionKeyStore`]: 저장소 trait (set/get/delete/exists)
//! - [`RedisSessionKeyStore`]: Redis 구현 (`SET EX`, `GET`, `DEL`, `EXISTS`)
//! - [`MemorySessionKeyStore`]: 프로세스 내 구현 (테스트/로컬 개발용)

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemorySessionKeyStore;
pub use redis_store::RedisSessionKeyStore;
pub use traits::{session_key, SessionKeyStore, SESSION_KEY_PREFIX};
