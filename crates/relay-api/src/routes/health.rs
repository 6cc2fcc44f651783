//! 헬스 체크 endpoint.
//!
//! `GET /`는 로드밸런서용 liveness 프로브, `GET /health`는 상세 상태입니다.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// liveness 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 서비스 상태 ("ok")
    pub status: String,

    /// API 버전
    pub version: String,

    /// 서버 업타임(초)
    pub uptime_secs: i64,

    /// 레지스트리의 열린 신호 수
    pub open_signals: usize,

    /// 활성화된 배포 프로파일
    pub profiles: Vec<String>,
}

/// `GET /`
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
    })
}

/// `GET /health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        open_signals: state.registry.len().await,
        profiles: state.profile_names(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::create_test_state;

    #[tokio::test]
    async fn test_liveness() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_reports_profiles() {
        let (state, _) = create_test_state(true);
        let Json(body) = health_check(State(Arc::new(state))).await;

        assert_eq!(body.status, "ok");
        assert_eq!(body.open_signals, 0);
        assert_eq!(body.profiles, vec!["primary", "real"]);
        assert!(!body.version.is_empty());
    }
}
