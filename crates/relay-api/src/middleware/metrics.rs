//! HTTP 요청 metrics middleware.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{
    record_http_duration, record_http_request, record_http_response, UNMATCHED_PATH,
};

/// 요청마다 `http_requests_total`, `http_responses_total`,
/// `http_request_duration_seconds`를 기록합니다.
///
/// 경로 라벨은 매칭된 라우트 템플릿이며, 매칭되지 않은 요청은 모두 [`UNMATCHED_PATH`]입니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().as_str().to_owned();
    let path = route_label(&request);

    record_http_request(&method, &path);
    let response = next.run(request).await;

    let status = response.status().as_u16();
    record_http_response(&method, &path, status);
    record_http_duration(&method, &path, started.elapsed().as_secs_f64());
    response
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_owned(), |matched| matched.as_str().to_owned())
}
