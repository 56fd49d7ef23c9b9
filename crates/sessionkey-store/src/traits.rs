use async_trait::async_trait;

use crate::error::StoreResult;

/// 세션 키 접두사.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// 저장소 키 생성.
///
/// 형식: `session:{session_id}`
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

/// 세션 공개 키 저장소.
///
/// 각 연산은 저장소 자체의 원자적 명령에 대응하며, 구현체는 재시도하지 않습니다.
/// 실패는 호출한 요청에 그대로 전파됩니다.
#[async_trait]
pub trait SessionKeyStore: Send + Sync {
    /// 공개 키 저장 (upsert, TTL 재설정).
    async fn set(&self, session_id: &str, public_key: &str, ttl_secs: u64) -> StoreResult<()>;

    /// 공개 키 조회. 없거나 만료되었으면 `None`.
    async fn get(&self, session_id: &str) -> StoreResult<Option<String>>;

    /// 세션 삭제. 실제로 삭제되었으면 `true`.
    async fn delete(&self, session_id: &str) -> StoreResult<bool>;

    /// 세션 존재 여부.
    async fn exists(&self, session_id: &str) -> StoreResult<bool>;

    /// 연결 상태 확인.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_format() {
        assert_eq!(session_key("abc-123"), "session:abc-123");
    }
}
