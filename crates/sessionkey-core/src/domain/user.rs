//! 토큰에 담기는 사용자 식별 정보.

use serde::{Deserialize, Serialize};

/// 토큰 발급에 필요한 최소 사용자 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// 사용자 ID
    pub id: String,
    /// 이메일 (Access Token 클레임)
    pub email: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}
