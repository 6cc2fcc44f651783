//! 열린 신호 조회 endpoint.

use axum::{extract::State, Json};
use relay_core::TrackedSignal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 열린 신호 목록 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignalsResponse {
    pub count: usize,
    pub signals: Vec<TrackedSignal>,
}

/// `GET /signals`
///
/// 레지스트리의 읽기 전용 스냅샷 (심볼 순).
pub async fn list_signals(State(state): State<Arc<AppState>>) -> Json<SignalsResponse> {
    let signals = state.registry.snapshot().await;
    Json(SignalsResponse {
        count: signals.len(),
        signals,
    })
}
