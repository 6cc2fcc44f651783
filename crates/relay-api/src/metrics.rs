//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 릴레이 이벤트 메트릭을 수집하고 `/metrics`로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// 이벤트 처리 결과 라벨.
pub const OUTCOME_SENT: &str = "sent";
pub const OUTCOME_INVALID: &str = "invalid";
pub const OUTCOME_FAILED: &str = "failed";

/// 라우트에 매칭되지 않은 요청의 경로 라벨.
pub const UNMATCHED_PATH: &str = "unmatched";

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
    )
}

/// 전역 Prometheus 레코더를 설치하고 렌더링 핸들을 반환합니다.
///
/// 레코더는 프로세스당 한 번만 설치할 수 있습니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// 전역에 설치하지 않은 레코더의 핸들 (테스트용).
pub fn detached_handle() -> Result<PrometheusHandle, BuildError> {
    Ok(builder()?.build_recorder().handle())
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 릴레이 메트릭
// ============================================================================

/// 처리한 웹훅 이벤트 카운터 증가.
pub fn record_relay_event(profile: &str, kind: &str, outcome: &str) {
    counter!(
        "relay_events_total",
        "profile" => profile.to_string(),
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 레지스트리의 열린 신호 수 설정.
pub fn set_open_signals(count: usize) {
    gauge!("relay_open_signals").set(count as f64);
}
