//! 트레이딩 신호 웹훅 릴레이 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 웹훅 엔드포인트 (`/webhook`, `/real-channel`)
//! - 배포 프로파일별 신호 이벤트 라우터
//! - 헬스 체크 및 열린 신호 조회
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: HTTP 엔드포인트와 라우터 조합
//! - [`services`]: 신호 이벤트 라우터
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`error`]: API 에러 응답

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::{create_api_router, create_app};
pub use services::{AnchorSource, DeploymentProfile, SignalRouter, WebhookOutcome};
pub use state::AppState;
