//! 웹훅 수신 endpoint.
//!
//! - `POST /webhook`: 레지스트리 앵커 프로파일
//! - `POST /real-channel`: 채널 히스토리 앵커 프로파일 (실거래 봇 설정 시에만)

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use relay_core::WebhookPayload;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::services::{SignalRouter, WebhookOutcome};
use crate::state::AppState;

/// `POST /webhook`
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookOutcome>> {
    relay(&state.webhook, payload).await
}

/// `POST /real-channel`
pub async fn real_channel(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookOutcome>> {
    let router = state
        .real_channel
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Real channel is not configured"))?;
    relay(router, payload).await
}

async fn relay(
    router: &SignalRouter,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> ApiResult<Json<WebhookOutcome>> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!(
            profile = %router.profile().name,
            error = %rejection.body_text(),
            "Malformed webhook body"
        );
        ApiError::from(rejection)
    })?;

    let outcome = router.handle_payload(payload).await?;
    Ok(Json(outcome))
}
