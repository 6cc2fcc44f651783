//! HTTP 라우트.
//!
//! | 경로 | 설명 |
//! |---|---|
//! | `GET /` | liveness |
//! | `GET /health` | 상세 상태 |
//! | `POST /webhook` | 기본 프로파일 웹훅 |
//! | `POST /real-channel` | 실거래 프로파일 웹훅 (설정 시) |
//! | `GET /signals` | 열린 신호 목록 |
//! | `GET /metrics` | Prometheus |

pub mod health;
pub mod signals;
pub mod webhook;

use std::sync::Arc;

use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::middleware::metrics_layer;
use crate::state::AppState;

pub use health::{health_check, liveness, HealthResponse, LivenessResponse};
pub use signals::{list_signals, SignalsResponse};
pub use webhook::{real_channel, webhook};

/// API 라우터 (상태 주입 전).
///
/// `/real-channel`은 `real_channel_enabled`일 때만 등록됩니다.
pub fn create_api_router(real_channel_enabled: bool) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/webhook", post(webhook))
        .route("/signals", get(list_signals));

    if real_channel_enabled {
        router.route("/real-channel", post(real_channel))
    } else {
        router
    }
}

/// 미들웨어까지 조합된 전체 애플리케이션 라우터.
pub fn create_app(
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
    cors_origins: Option<&str>,
) -> Router {
    let api_router = create_api_router(state.real_channel.is_some()).with_state(state);

    let router = match metrics_handle {
        Some(handle) => Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(handle)
            .merge(api_router),
        None => api_router,
    };

    router
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// CORS 레이어. origin 목록이 없으면 모든 origin을 허용합니다.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let allow_origin = match origins {
        Some(origins) if !origins.trim().is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}
