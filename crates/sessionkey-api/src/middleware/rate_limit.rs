//! 요청 제한 미들웨어.
//!
//! IP별 Token Bucket으로 인증 엔드포인트 호출 빈도를 제한합니다.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sessionkey_core::RateLimitSettings;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

use crate::error::ApiErrorResponse;

/// 요청 제한 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 분당 최대 요청 수
    pub requests_per_minute: u32,
    /// 버스트 허용량
    pub burst_size: u32,
    /// 이 시간 동안 요청이 없던 버킷은 정리 대상
    pub idle_timeout: Duration,
    /// 프록시 헤더로 클라이언트 IP 판단
    pub trust_proxy_headers: bool,
}

impl RateLimitConfig {
    /// 분당 요청 수로 생성합니다. 버스트는 10%.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size: requests_per_minute / 10,
            idle_timeout: Duration::from_secs(60),
            trust_proxy_headers: false,
        }
    }

    /// 프록시 헤더 신뢰 여부 설정.
    pub fn with_proxy_headers(mut self, trusted: bool) -> Self {
        self.trust_proxy_headers = trusted;
        self
    }

    /// 버스트 없는 설정.
    pub fn strict(requests_per_minute: u32) -> Self {
        Self {
            burst_size: 0,
            ..Self::new(requests_per_minute)
        }
    }

    fn capacity(&self) -> f64 {
        self.refill_per_sec() + self.burst_size as f64
    }

    fn refill_per_sec(&self) -> f64 {
        self.requests_per_minute as f64 / 60.0
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self::new(settings.requests_per_minute).with_proxy_headers(settings.trust_proxy_headers)
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    updated_at: Instant,
}

impl Bucket {
    fn full(config: &RateLimitConfig) -> Self {
        Self {
            tokens: config.capacity(),
            updated_at: Instant::now(),
        }
    }

    /// 토큰 하나를 소비합니다. 부족하면 다음 토큰까지 남은 초를 반환합니다.
    fn take(&mut self, config: &RateLimitConfig) -> Result<(), u64> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.updated_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * config.refill_per_sec()).min(config.capacity());
        self.updated_at = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }

        let rate = config.refill_per_sec();
        if rate <= 0.0 {
            return Err(60);
        }
        Err(((1.0 - self.tokens) / rate).ceil().max(1.0) as u64)
    }
}

/// 요청 제한 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u64 },
}

/// IP별 요청 제한기.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<RwLock<HashMap<IpAddr, Bucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 요청 허용 여부 확인.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| Bucket::full(&self.config));

        match bucket.take(&self.config) {
            Ok(()) => RateLimitResult::Allowed,
            Err(retry_after) => RateLimitResult::Limited { retry_after },
        }
    }

    /// 오래 사용되지 않은 버킷 정리.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|_, b| now.duration_since(b.updated_at) < self.config.idle_timeout);
        before - buckets.len()
    }

    /// 현재 추적 중인 IP 수.
    pub async fn tracked_ips(&self) -> usize {
        self.buckets.read().await.len()
    }

    /// 주기적으로 버킷을 정리하는 백그라운드 태스크를 시작합니다.
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.config.idle_timeout);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        })
    }
}

/// 요청 제한 미들웨어.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request, limiter.config.trust_proxy_headers);

    match limiter.check(ip).await {
        RateLimitResult::Allowed => next.run(request).await,
        RateLimitResult::Limited { retry_after } => {
            warn!(client_ip = %ip, retry_after, "Rate limit exceeded");

            let body = ApiErrorResponse::with_details(
                "RATE_LIMITED",
                "Too many requests. Please try again later.",
                serde_json::json!({ "retry_after": retry_after }),
            );
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

/// 클라이언트 IP 추출.
///
/// 기본은 TCP 연결 주소입니다. 클라이언트가 임의로 넣을 수 있으므로 프록시 헤더
/// (`X-Forwarded-For`, `X-Real-IP`)는 `trust_proxy_headers`일 때만 읽습니다.
fn client_ip(request: &Request, trust_proxy_headers: bool) -> IpAddr {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    let forwarded = if trust_proxy_headers {
        header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
    } else {
        None
    };

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_burst_then_limited() {
        let limiter = RateLimiter::new(RateLimitConfig {
            burst_size: 2,
            ..RateLimitConfig::new(60)
        });

        // 초당 1 + 버스트 2
        for _ in 0..3 {
            assert_eq!(limiter.check(ip("10.0.0.1")).await, RateLimitResult::Allowed);
        }
        assert!(matches!(
            limiter.check(ip("10.0.0.1")).await,
            RateLimitResult::Limited { retry_after } if retry_after >= 1
        ));

        // 다른 IP는 별도 버킷
        assert_eq!(limiter.check(ip("10.0.0.2")).await, RateLimitResult::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_over_time() {
        let limiter = RateLimiter::new(RateLimitConfig::strict(60));

        assert_eq!(limiter.check(ip("10.0.0.1")).await, RateLimitResult::Allowed);
        assert!(matches!(
            limiter.check(ip("10.0.0.1")).await,
            RateLimitResult::Limited { .. }
        ));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.check(ip("10.0.0.1")).await, RateLimitResult::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_idle_buckets() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60));
        limiter.check(ip("10.0.0.1")).await;
        assert_eq!(limiter.tracked_ips().await, 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.cleanup().await, 1);
        assert_eq!(limiter.tracked_ips().await, 0);
    }

    #[tokio::test]
    async fn test_middleware_returns_429_with_retry_after() {
        let limiter = RateLimiter::new(RateLimitConfig::strict(60).with_proxy_headers(true));
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        let request = || {
            axum::http::Request::builder()
                .uri("/")
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(RETRY_AFTER));
    }

    fn request_from(peer: &str, forwarded_for: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn test_client_ip_ignores_forwarded_header_by_default() {
        let request = request_from("192.0.2.10:5000", Some("203.0.113.7"));

        assert_eq!(client_ip(&request, false), ip("192.0.2.10"));
        assert_eq!(client_ip(&request, true), ip("203.0.113.7"));

        // 헤더가 없으면 신뢰 설정과 무관하게 연결 주소
        let request = request_from("192.0.2.10:5000", None);
        assert_eq!(client_ip(&request, true), ip("192.0.2.10"));
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_header_shares_bucket() {
        let limiter = RateLimiter::new(RateLimitConfig::strict(60));
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        let first = app
            .clone()
            .oneshot(request_from("192.0.2.10:5000", Some("203.0.113.1")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // 헤더를 바꿔도 같은 연결 주소라면 같은 버킷
        let second = app
            .oneshot(request_from("192.0.2.10:5001", Some("203.0.113.2")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_config_from_settings() {
        let config = RateLimitConfig::from(&RateLimitSettings::default());
        assert_eq!(config.requests_per_minute, 100);
        assert_eq!(config.burst_size, 10);
        assert!(!config.trust_proxy_headers);
    }
}
