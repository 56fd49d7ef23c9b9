//! 인증 라우트 통합 테스트
//!
//! 메모리 저장소 기반 전체 라우터를 `oneshot`으로 호출합니다.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sessionkey_api::auth::{FixedClock, SessionAuthEngine, TokenLifetimes};
use sessionkey_api::repository::MemoryUserRepository;
use sessionkey_api::{create_router, AppState};
use sessionkey_core::{AppConfig, RateLimitSettings, UserIdentity};
use sessionkey_store::{MemorySessionKeyStore, SessionKeyStore};
use tower::ServiceExt;

const ACCESS: &str = "sk_access";
const REFRESH: &str = "sk_refresh";

struct TestApp {
    router: Router,
    store: Arc<MemorySessionKeyStore>,
}

fn test_app_with(rate_limit: RateLimitSettings) -> TestApp {
    let store = Arc::new(MemorySessionKeyStore::new());
    let state = Arc::new(AppState::new(
        store.clone(),
        Arc::new(MemoryUserRepository::new()),
        &AppConfig::default(),
    ));

    TestApp {
        router: create_router(state, &rate_limit),
        store,
    }
}

fn test_app() -> TestApp {
    test_app_with(RateLimitSettings {
        requests_per_minute: 100,
        disabled: true,
        trust_proxy_headers: false,
    })
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn with_cookies(&self, method: &str, uri: &str, cookies: &Cookies) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::COOKIE, cookies.header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn register(&self, email: &str) -> (Value, Cookies) {
        let response = self
            .post_json(
                "/api/v1/auth/register",
                json!({ "email": email, "password": "secret123", "name": "Tester" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = Cookies::from_response(&response);
        (body_json(response).await, cookies)
    }
}

/// 응답의 Set-Cookie 헤더에서 읽은 쿠키.
#[derive(Debug, Default, Clone)]
struct Cookies {
    values: HashMap<String, String>,
    raw: Vec<String>,
}

impl Cookies {
    fn from_response(response: &Response<Body>) -> Self {
        let raw: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();

        let values = raw
            .iter()
            .filter_map(|c| c.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.to_string()))
            .collect();

        Self { values, raw }
    }

    fn pair(access: &str, refresh: &str) -> Self {
        Self {
            values: HashMap::from([
                (ACCESS.to_string(), access.to_string()),
                (REFRESH.to_string(), refresh.to_string()),
            ]),
            raw: Vec::new(),
        }
    }

    fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or_default()
    }

    fn header(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn raw_for(&self, name: &str) -> &str {
        self.raw
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_sets_http_only_cookies() {
    let app = test_app();
    let (body, cookies) = app.register("alice@example.com").await;

    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["name"], "Tester");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body.get("access_token").is_none());

    for name in [ACCESS, REFRESH] {
        let raw = cookies.raw_for(name);
        assert!(!cookies.get(name).is_empty(), "missing cookie {name}");
        assert!(raw.contains("HttpOnly"), "{raw}");
        assert!(raw.contains("SameSite=Strict"), "{raw}");
        assert!(raw.contains("Path=/"), "{raw}");
        assert!(!raw.contains("Secure"), "{raw}");
    }
    assert!(cookies.raw_for(ACCESS).contains("Max-Age=900"));
    assert!(cookies.raw_for(REFRESH).contains("Max-Age=604800"));

    assert_eq!(app.store.live_sessions().await, 1);
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let app = test_app();
    app.register("bob@example.com").await;

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "BOB@example.com", "password": "another1" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "EMAIL_IN_USE");
}

#[tokio::test]
async fn invalid_register_input_is_bad_request() {
    let app = test_app();

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "not-an-email", "password": "123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["password"][0], "Password must be at least 6 characters");
    assert_eq!(body["details"]["email"][0], "Invalid email address");

    // 본문 형식 오류도 같은 코드
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = test_app();
    app.register("carol@example.com").await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "carol@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Wrong email or password.");

    // 존재하지 않는 이메일도 같은 응답
    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "nobody@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Wrong email or password.");
}

#[tokio::test]
async fn login_issues_new_session() {
    let app = test_app();
    app.register("dave@example.com").await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "dave@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = Cookies::from_response(&response);
    assert!(!cookies.get(ACCESS).is_empty());
    assert_eq!(body_json(response).await["user"]["email"], "dave@example.com");

    // 가입 세션과 로그인 세션이 각각 존재
    assert_eq!(app.store.live_sessions().await, 2);
}

#[tokio::test]
async fn me_with_valid_cookies() {
    let app = test_app();
    let (registered, cookies) = app.register("erin@example.com").await;

    let response = app.with_cookies("GET", "/api/v1/auth/me", &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], registered["user"]["id"]);
    assert!(body["session_id"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn me_without_cookies_is_unauthorized() {
    let app = test_app();

    let response = app
        .send(
            Request::builder()
                .uri("/api/v1/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn me_with_expired_access_rotates_cookies() {
    let app = test_app();
    let (registered, _) = app.register("frank@example.com").await;
    let user_id = registered["user"]["id"].as_str().unwrap().to_string();

    // 1시간 전 시각으로 서명된 세션: Access 만료, Refresh 유효
    let store: Arc<dyn SessionKeyStore> = app.store.clone();
    let stale_engine = SessionAuthEngine::new(store, TokenLifetimes::default())
        .with_clock(Arc::new(FixedClock(Utc::now() - Duration::hours(1))));
    let stale = stale_engine
        .issue(&UserIdentity::new(&user_id, "frank@example.com"))
        .await
        .unwrap();
    let old = Cookies::pair(&stale.tokens.access_token, &stale.tokens.refresh_token);

    let response = app.with_cookies("GET", "/api/v1/auth/me", &old).await;
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = Cookies::from_response(&response);
    assert!(!rotated.get(ACCESS).is_empty());
    assert_ne!(rotated.get(ACCESS), old.get(ACCESS));
    assert_ne!(rotated.get(REFRESH), old.get(REFRESH));

    let body = body_json(response).await;
    assert_eq!(body["session_id"], stale.session_id.as_str());

    // 새 쿠키로는 통과, 이전 쿠키는 거부
    let response = app.with_cookies("GET", "/api/v1/auth/me", &rotated).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.with_cookies("GET", "/api/v1/auth/me", &old).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_invalidates_old_tokens() {
    let app = test_app();
    let (_, cookies) = app.register("gina@example.com").await;

    let response = app
        .with_cookies("POST", "/api/v1/auth/refresh", &cookies)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = Cookies::from_response(&response);
    assert_eq!(body_json(response).await["user"]["email"], "gina@example.com");

    // 이전 Refresh Token 재사용 불가
    let response = app
        .with_cookies("POST", "/api/v1/auth/refresh", &cookies)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.with_cookies("GET", "/api/v1/auth/me", &rotated).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let app = test_app();

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes_session() {
    let app = test_app();
    let (_, cookies) = app.register("hank@example.com").await;

    let response = app
        .with_cookies("POST", "/api/v1/auth/logout", &cookies)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cleared = Cookies::from_response(&response);
    for name in [ACCESS, REFRESH] {
        assert_eq!(cleared.get(name), "");
        assert!(cleared.raw_for(name).contains("Max-Age=0"));
    }
    assert!(body_json(response).await["message"].is_string());
    assert_eq!(app.store.live_sessions().await, 0);

    // 로그아웃 이후 기존 쿠키는 모두 거부
    let response = app.with_cookies("GET", "/api/v1/auth/me", &cookies).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .with_cookies("POST", "/api/v1/auth/logout", &cookies)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_routes_are_rate_limited() {
    // 분당 60 → 초당 1 + 버스트 6
    let app = test_app_with(RateLimitSettings {
        requests_per_minute: 60,
        disabled: false,
        trust_proxy_headers: true,
    });

    let refresh = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/refresh")
            .header("x-forwarded-for", "198.51.100.9")
            .body(Body::empty())
            .unwrap()
    };

    let mut statuses = Vec::new();
    for _ in 0..10 {
        statuses.push(app.send(refresh()).await.status());
    }

    assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
    assert_eq!(statuses[9], StatusCode::TOO_MANY_REQUESTS);

    // 헬스 체크는 제한 대상이 아님
    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_endpoints() {
    let app = test_app();

    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}
