//! # 키 페어 발급 모듈
//!
//! 로그인/가입 및 토큰 회전마다 새 RSA 키 페어를 생성합니다.
//!
//! ## 보안 고려사항
//! - 개인 키는 [`SigningKey`]로만 존재하며 `Clone`이 불가능
//! - 개인 키 PEM은 생성 직후 서명 키로 변환되고 즉시 zeroize
//! - 공개 키(PKCS#1 PEM)만 세션 저장소에 게시

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;

use crate::error::AuthError;

/// RSA 모듈러스 크기 (비트)
pub const RSA_KEY_BITS: usize = 2048;

/// 일회용 서명 키.
///
/// 토큰 한 쌍을 서명하는 동안에만 살아 있으며, 저장하거나 복제할 수 없습니다.
pub struct SigningKey {
    inner: EncodingKey,
}

impl SigningKey {
    /// RS256으로 클레임을 서명하여 compact JWS 문자열을 만듭니다.
    pub fn sign_rs256<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::RS256), claims, &self.inner)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// 새로 생성된 키 페어.
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    public_key_pem: String,
}

impl KeyPair {
    /// 공개 키 (PKCS#1 PEM).
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// 서명 키와 공개 키로 분리합니다.
    pub fn into_parts(self) -> (SigningKey, String) {
        (self.signing_key, self.public_key_pem)
    }
}

/// 세션별 RSA 키 페어 발급기.
#[derive(Debug, Clone)]
pub struct KeyPairIssuer {
    bits: usize,
}

impl Default for KeyPairIssuer {
    fn default() -> Self {
        Self { bits: RSA_KEY_BITS }
    }
}

impl KeyPairIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 키 페어 생성.
    ///
    /// 실패는 엔트로피 또는 라이브러리 수준의 치명적 오류뿐이며 재시도하지 않습니다.
    pub fn generate(&self) -> Result<KeyPair, AuthError> {
        let mut rng = rand::rngs::OsRng;

        let private_key = RsaPrivateKey::new(&mut rng, self.bits)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let public_key_pem = public_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;

        // Zeroizing<String> - 스코프를 벗어나면 메모리에서 지워짐
        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
        let inner = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;

        Ok(KeyPair {
            signing_key: SigningKey { inner },
            public_key_pem,
        })
    }
}
