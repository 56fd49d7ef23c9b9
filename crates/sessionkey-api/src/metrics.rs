//! Prometheus 메트릭.
//!
//! HTTP 요청 메트릭과 세션 수명 주기 이벤트를 수집하고 `/metrics`로 노출합니다.
//! 레코더가 설치되지 않은 경우(테스트 등) 기록 함수는 아무 일도 하지 않습니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const HTTP_DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// 세션 수명 주기 이벤트 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Issued,
    Rotated,
    Revoked,
}

impl SessionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEvent::Issued => "issued",
            SessionEvent::Rotated => "rotated",
            SessionEvent::Revoked => "revoked",
        }
    }
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    // 키 생성 시간이 포함되므로 상한을 넉넉히 둠
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        HTTP_DURATION_BUCKETS,
    )
}

/// 전역 Prometheus 레코더를 설치하고 렌더링 핸들을 반환합니다.
///
/// 이미 레코더가 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

// ============================================================================
// HTTP
// ============================================================================

pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증
// ============================================================================

/// 세션 발급/회전/폐기 카운터.
pub fn record_session_event(event: SessionEvent) {
    counter!("sessionkey_session_events_total", "event" => event.as_str()).increment(1);
}

/// 인증 거부 카운터. `code`는 `TokenError::code()` / `RejectReason::code()` 값입니다.
pub fn record_auth_rejection(code: &'static str) {
    counter!("sessionkey_auth_rejections_total", "code" => code).increment(1);
}

/// 내부 실패 카운터 (저장소, 키 생성, 서명, 사용자 DB).
pub fn record_auth_failure(code: &'static str) {
    counter!("sessionkey_auth_failures_total", "code" => code).increment(1);
}

/// 경로의 동적 세그먼트(UUID, 숫자)를 `:id`로 바꿔 라벨 카디널리티를 제한합니다.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_uuid = segment.len() == 36 && segment.matches('-').count() == 4;
            let is_numeric = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
            if is_uuid || is_numeric {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 로컬 레코더로 `f`를 실행하고 렌더링된 메트릭을 반환합니다.
#[cfg(test)]
pub(crate) fn capture<F: FnOnce()>(f: F) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, f);
    handle.render()
}
