//! 토큰 쿠키 전송.
//!
//! 두 토큰 모두 `HttpOnly`, `SameSite=Strict`, `Path=/` 쿠키로 전달됩니다.
//! `Secure`는 운영 환경에서만 붙습니다.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sessionkey_core::{AppConfig, TokenPair};
use time::Duration;

use super::gate::Credentials;

/// 쿠키 이름과 속성.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    pub secure: bool,
    pub access_max_age: Duration,
    pub refresh_max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl CookieSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            access_name: config.auth.access_cookie_name.clone(),
            refresh_name: config.auth.refresh_cookie_name.clone(),
            secure: config.secure_cookies(),
            access_max_age: Duration::seconds(config.auth.access_ttl().num_seconds()),
            refresh_max_age: Duration::seconds(config.auth.refresh_ttl().num_seconds()),
        }
    }

    /// 쿠키에서 자격 증명을 읽습니다.
    pub fn credentials(&self, jar: &CookieJar) -> Credentials {
        Credentials::new(
            jar.get(&self.access_name).map(|c| c.value().to_string()),
            jar.get(&self.refresh_name).map(|c| c.value().to_string()),
        )
    }

    /// Refresh Token 쿠키 값.
    pub fn refresh_token(&self, jar: &CookieJar) -> Option<String> {
        self.credentials(jar).refresh_token
    }

    /// 새 토큰 쌍을 쿠키로 설정합니다.
    pub fn set_tokens(&self, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
        jar.add(self.token_cookie(
            &self.access_name,
            tokens.access_token.clone(),
            self.access_max_age,
        ))
        .add(self.token_cookie(
            &self.refresh_name,
            tokens.refresh_token.clone(),
            self.refresh_max_age,
        ))
    }

    /// 두 토큰 쿠키를 만료시킵니다 (`Max-Age=0`).
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.token_cookie(&self.access_name, String::new(), Duration::ZERO))
            .add(self.token_cookie(&self.refresh_name, String::new(), Duration::ZERO))
    }

    fn token_cookie(&self, name: &str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(max_age)
            .build()
    }
}
