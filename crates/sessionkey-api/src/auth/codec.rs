//! 토큰 서명 및 검증.
//!
//! 검증은 두 단계로 진행됩니다. 먼저 서명을 확인하지 않은 채 페이로드를 해석해
//! `sessionId`를 얻고, 그 세션의 현재 공개 키를 저장소에서 조회한 뒤에야
//! 서명과 만료를 확인합니다.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use sessionkey_core::{
    AuthResult, SigningKey, TokenClaims, TokenError, TokenKind, UntrustedClaims, VerifiedToken,
    WireClaims,
};
use sessionkey_store::SessionKeyStore;
use tracing::debug;

/// 세션 키 기반 토큰 코덱.
#[derive(Clone)]
pub struct TokenCodec {
    store: Arc<dyn SessionKeyStore>,
}

impl TokenCodec {
    pub fn new(store: Arc<dyn SessionKeyStore>) -> Self {
        Self { store }
    }

    /// 클레임에 `iat`/`exp`를 붙여 RS256으로 서명합니다.
    pub fn sign(
        claims: &TokenClaims,
        signing_key: &SigningKey,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> AuthResult<String> {
        let wire = WireClaims::new(claims, issued_at, lifetime);
        signing_key.sign_rs256(&wire)
    }

    /// 서명 확인 없이 페이로드만 해석합니다.
    ///
    /// 반환값은 신뢰할 수 없으며 저장소 키 조회에만 사용해야 합니다.
    pub fn decode_untrusted(token: &str) -> Result<UntrustedClaims, TokenError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(TokenError::InvalidPayload(
                    "token must have three segments".to_string(),
                ))
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::InvalidPayload(format!("payload is not base64url: {e}")))?;

        UntrustedClaims::from_json(&bytes)
    }

    /// 토큰을 검증합니다.
    ///
    /// 1. 페이로드 형태 확인 (`InvalidPayload`)
    /// 2. 기대 타입 확인 (`InvalidTokenType`)
    /// 3. 공개 키 조회 (`PublicKeyNotFound`)
    /// 4. RS256 서명 및 만료 확인 (`InvalidSignature`, `TokenExpired`, `VerifyError`)
    ///
    /// 저장소 실패는 `AuthError::Store`로 전파됩니다.
    pub async fn verify(
        &self,
        token: &str,
        expected: Option<TokenKind>,
    ) -> AuthResult<VerifiedToken> {
        let untrusted = Self::decode_untrusted(token)?;
        let claims = untrusted.into_claims()?;

        if let Some(expected) = expected {
            if claims.kind() != expected {
                return Err(TokenError::InvalidTokenType {
                    expected,
                    actual: claims.kind(),
                }
                .into());
            }
        }

        let public_key = self
            .store
            .get(claims.session_id())
            .await?
            .ok_or(TokenError::PublicKeyNotFound)?;

        // 서명이 확인된 페이로드로 다시 변환
        let verified = verify_signature(token, &public_key)?;
        let issued_at = verified.iat;
        let expires_at = verified.exp;
        let claims = verified.into_claims()?;

        debug!(session_id = %claims.session_id(), kind = %claims.kind(), "Token verified");

        Ok(VerifiedToken {
            claims,
            issued_at,
            expires_at,
        })
    }
}

fn verify_signature(token: &str, public_key_pem: &str) -> Result<UntrustedClaims, TokenError> {
    let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .map_err(|e| TokenError::VerifyError(format!("malformed public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;

    decode::<UntrustedClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::TokenExpired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::VerifyError(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sessionkey_core::{AuthError, KeyPairIssuer};
    use sessionkey_store::MemorySessionKeyStore;

    fn codec_with_store() -> (TokenCodec, Arc<MemorySessionKeyStore>) {
        let store = Arc::new(MemorySessionKeyStore::new());
        (TokenCodec::new(store.clone()), store)
    }

    fn token_error(result: AuthResult<VerifiedToken>) -> TokenError {
        match result {
            Err(AuthError::Token(e)) => e,
            other => panic!("expected token error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let (codec, store) = codec_with_store();
        let (signing_key, public_key) = KeyPairIssuer::new().generate().unwrap().into_parts();
        store.set("s1", &public_key, 60).await.unwrap();

        let claims = TokenClaims::access("u1", "u1@example.com", "s1");
        let token =
            TokenCodec::sign(&claims, &signing_key, Utc::now(), Duration::minutes(15)).unwrap();

        let verified = codec.verify(&token, Some(TokenKind::Access)).await.unwrap();
        assert_eq!(verified.claims, claims);
        assert_eq!(
            verified.expires_at.unwrap() - verified.issued_at.unwrap(),
            15 * 60
        );

        // 타입 기대값 없이도 검증 가능
        assert!(codec.verify(&token, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_header_is_rs256() {
        let (signing_key, _) = KeyPairIssuer::new().generate().unwrap().into_parts();
        let token = TokenCodec::sign(
            &TokenClaims::refresh("u1", "s1"),
            &signing_key,
            Utc::now(),
            Duration::days(7),
        )
        .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_decode_untrusted_rejects_malformed() {
        assert!(matches!(
            TokenCodec::decode_untrusted("only.two"),
            Err(TokenError::InvalidPayload(_))
        ));
        assert!(matches!(
            TokenCodec::decode_untrusted("a.b.c.d"),
            Err(TokenError::InvalidPayload(_))
        ));
        assert!(matches!(
            TokenCodec::decode_untrusted("a.!!!.c"),
            Err(TokenError::InvalidPayload(_))
        ));

        let not_json = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(matches!(
            TokenCodec::decode_untrusted(&format!("h.{not_json}.s")),
            Err(TokenError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_session_id_is_invalid_payload() {
        let (codec, _) = codec_with_store();
        let payload = URL_SAFE_NO_PAD.encode(br#"{"userId":"u1","type":"refresh"}"#);

        let err = token_error(codec.verify(&format!("h.{payload}.s"), None).await);
        assert!(matches!(err, TokenError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_type_mismatch_checked_before_key_lookup() {
        // 저장소가 비어 있어도 타입 불일치가 먼저 보고됨
        let (codec, _) = codec_with_store();
        let (signing_key, _) = KeyPairIssuer::new().generate().unwrap().into_parts();
        let token = TokenCodec::sign(
            &TokenClaims::refresh("u1", "s1"),
            &signing_key,
            Utc::now(),
            Duration::days(7),
        )
        .unwrap();

        let err = token_error(codec.verify(&token, Some(TokenKind::Access)).await);
        assert_eq!(
            err,
            TokenError::InvalidTokenType {
                expected: TokenKind::Access,
                actual: TokenKind::Refresh,
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_public_key_not_found() {
        let (codec, _) = codec_with_store();
        let (signing_key, _) = KeyPairIssuer::new().generate().unwrap().into_parts();
        let token = TokenCodec::sign(
            &TokenClaims::refresh("u1", "missing"),
            &signing_key,
            Utc::now(),
            Duration::days(7),
        )
        .unwrap();

        let err = token_error(codec.verify(&token, Some(TokenKind::Refresh)).await);
        assert_eq!(err, TokenError::PublicKeyNotFound);
    }

    #[tokio::test]
    async fn test_other_key_is_invalid_signature() {
        let (codec, store) = codec_with_store();
        let issuer = KeyPairIssuer::new();
        let (signing_key, _) = issuer.generate().unwrap().into_parts();
        let (_, other_public_key) = issuer.generate().unwrap().into_parts();
        store.set("s1", &other_public_key, 60).await.unwrap();

        let token = TokenCodec::sign(
            &TokenClaims::refresh("u1", "s1"),
            &signing_key,
            Utc::now(),
            Duration::days(7),
        )
        .unwrap();

        let err = token_error(codec.verify(&token, None).await);
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (codec, store) = codec_with_store();
        let (signing_key, public_key) = KeyPairIssuer::new().generate().unwrap().into_parts();
        store.set("s1", &public_key, 60).await.unwrap();

        let token = TokenCodec::sign(
            &TokenClaims::access("u1", "u1@example.com", "s1"),
            &signing_key,
            Utc::now() - Duration::hours(1),
            Duration::minutes(15),
        )
        .unwrap();

        let err = token_error(codec.verify(&token, Some(TokenKind::Access)).await);
        assert_eq!(err, TokenError::TokenExpired);
    }

    #[tokio::test]
    async fn test_non_rs256_algorithm_rejected() {
        let (codec, store) = codec_with_store();
        let (_, public_key) = KeyPairIssuer::new().generate().unwrap().into_parts();
        store.set("s1", &public_key, 60).await.unwrap();

        let wire = WireClaims::new(
            &TokenClaims::refresh("u1", "s1"),
            Utc::now(),
            Duration::days(7),
        );
        let token = encode(
            &Header::new(Algorithm::HS256),
            &wire,
            &EncodingKey::from_secret(public_key.as_bytes()),
        )
        .unwrap();

        let err = token_error(codec.verify(&token, None).await);
        assert!(matches!(err, TokenError::VerifyError(_)));
    }

    #[tokio::test]
    async fn test_malformed_stored_key_is_verify_error() {
        let (codec, store) = codec_with_store();
        let (signing_key, _) = KeyPairIssuer::new().generate().unwrap().into_parts();
        store.set("s1", "not a pem", 60).await.unwrap();

        let token = TokenCodec::sign(
            &TokenClaims::refresh("u1", "s1"),
            &signing_key,
            Utc::now(),
            Duration::days(7),
        )
        .unwrap();

        let err = token_error(codec.verify(&token, None).await);
        assert!(matches!(err, TokenError::VerifyError(_)));
    }
}
