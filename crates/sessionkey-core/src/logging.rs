//! 서버 로그 출력 설정.
//!
//! 필터는 `RUST_LOG`가 있으면 그것을, 없으면 `[logging].level`을 씁니다.
//! 형식은 `[logging].format`이 기본이고 `LOG_FORMAT`으로 바꿀 수 있습니다.
//!
//! 토큰 원문과 개인 키는 어떤 레벨에서도 기록하지 않습니다.
//! 세션 관련 이벤트는 `session_id` 필드로 구분합니다.

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{
    filter::ParseError, fmt, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 여러 줄, 색상 포함 (로컬 개발)
    #[default]
    Pretty,
    /// 한 줄에 JSON 객체 하나 (로그 수집기)
    Json,
    Compact,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log format `{0}` (expected pretty, json or compact)")]
pub struct UnknownLogFormat(pub String);

impl std::str::FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// 로깅 초기화 실패.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// 구독자 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `RUST_LOG`가 없을 때 쓰는 필터 지시어
    pub filter: String,
    pub format: LogFormat,
    /// 이벤트에 소스 파일과 줄 번호 표시
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
            source_location: false,
        }
    }
}

impl LogConfig {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// `LOG_FORMAT` 환경 변수를 반영합니다.
    pub fn with_env_overrides(self) -> Self {
        let format = std::env::var("LOG_FORMAT").ok();
        self.with_format_override(format.as_deref())
    }

    /// 읽을 수 없는 형식 값은 무시하고 기존 형식을 유지합니다.
    fn with_format_override(mut self, value: Option<&str>) -> Self {
        if let Some(format) = value.and_then(|v| v.parse().ok()) {
            self.format = format;
        }
        self
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            filter: config.level.clone(),
            format: config.format.parse().unwrap_or_default(),
            source_location: false,
        }
    }
}

fn fmt_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// 전역 tracing 구독자를 설치합니다. 프로세스당 한 번만 호출할 수 있습니다.
///
/// ```no_run
/// use sessionkey_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("sessionkey_api=debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(&config))
        .try_init()?;

    tracing::info!(format = ?config.format, filter = %config.filter, "Logging initialized");
    Ok(())
}
