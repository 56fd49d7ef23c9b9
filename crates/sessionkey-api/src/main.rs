//! 세션 키 인증 API 서버.
//!
//! # 환경 변수
//!
//! - `SESSIONKEY_CONFIG`: 설정 파일 경로 (기본값: `config/default.toml`)
//! - `SESSIONKEY__<SECTION>__<KEY>`: 설정 오버라이드 (예: `SESSIONKEY__SERVER__PORT=8080`)
//! - `DATABASE_URL`: PostgreSQL URL. 없으면 메모리 사용자 저장소
//! - `CORS_ORIGINS`: 허용할 origin 목록 (쉼표 구분)
//! - `RUST_LOG`: 로그 필터
//! - `LOG_FORMAT`: 로그 형식 (pretty, json, compact)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use sessionkey_api::repository::{MemoryUserRepository, PgUserRepository, UserRepository};
use sessionkey_api::{create_router, metrics_router, setup_metrics_recorder, AppState};
use sessionkey_core::{init_logging, AppConfig, DatabaseConfig, LogConfig};
use sessionkey_store::RedisSessionKeyStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config_path =
        std::env::var("SESSIONKEY_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("설정 로드 실패: {}", config_path))?;

    init_logging(LogConfig::from(&config.logging).with_env_overrides())
        .context("로깅 초기화 실패")?;

    info!(config = %config_path, "Starting sessionkey API server...");

    // 세션 키 저장소는 필수
    let store = RedisSessionKeyStore::connect(&config.redis)
        .await
        .context("Redis 세션 키 저장소 연결 실패")?;

    let users = connect_users(&config.database).await?;

    let state = Arc::new(AppState::new(Arc::new(store), users, &config));
    info!(
        version = %state.version,
        users_backend = state.users.backend(),
        access_ttl_secs = config.auth.access_token_ttl_secs,
        refresh_ttl_secs = config.auth.refresh_token_ttl_secs,
        secure_cookies = config.secure_cookies(),
        "Application state initialized"
    );

    let mut app = create_router(state, &config.rate_limit);

    // 메트릭은 부가 기능이므로 실패해도 서버는 계속 동작
    match setup_metrics_recorder() {
        Ok(handle) => {
            app = app.merge(metrics_router(handle));
            info!("Prometheus metrics exposed at /metrics");
        }
        Err(e) => warn!(error = %e, "Failed to install metrics recorder, /metrics disabled"),
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer());

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("잘못된 바인드 주소: {}", config.server.bind_address()))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// 사용자 저장소 연결.
///
/// 데이터베이스 URL이 없으면 메모리 저장소로 동작합니다. 재시작하면 계정이 사라집니다.
async fn connect_users(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn UserRepository>> {
    let url = config
        .url
        .as_ref()
        .map(|u| SecretString::from(u.expose_secret()))
        .or_else(|| {
            std::env::var("DATABASE_URL")
                .ok()
                .filter(|u| !u.is_empty())
                .map(SecretString::from)
        });

    let Some(url) = url else {
        warn!("DATABASE_URL not set, using in-memory user repository (development only)");
        return Ok(Arc::new(MemoryUserRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(url.expose_secret())
        .await
        .context("PostgreSQL 연결 실패")?;

    let repository = PgUserRepository::new(pool);
    repository
        .ensure_schema()
        .await
        .context("users 테이블 생성 실패")?;

    info!(max_connections = config.max_connections, "PostgreSQL user repository ready");
    Ok(Arc::new(repository))
}

/// CORS 설정.
///
/// 인증이 쿠키로 이루어지므로 origin이 명시된 경우에만 credentials를 허용합니다.
fn cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let origins: Vec<_> = std::env::var("CORS_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ORIGINS not set, allowing any origin without credentials (development mode)");
        base.allow_origin(AllowOrigin::any())
    } else {
        info!("CORS configured with {} allowed origins", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// Ctrl+C 또는 SIGTERM 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => warn!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
