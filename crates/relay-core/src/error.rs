//! 신호 릴레이의 에러 타입.
//!
//! 라우터 경계에서 모든 실패는 이 타입으로 수렴하며,
//! HTTP 계층은 이를 400/500 응답으로 매핑합니다.

use thiserror::Error;

/// 핵심 릴레이 에러.
#[derive(Debug, Error)]
pub enum RelayError {
    /// 필수 필드 누락 또는 잘못된 값 (400)
    #[error("{0}")]
    InvalidPayload(String),

    /// 채널 게이트웨이 전송 실패 (500)
    #[error("Failed to send {action}")]
    DeliveryFailure {
        /// 실패한 작업 설명 (예: "close message")
        action: String,
        /// 게이트웨이가 반환한 원본 에러
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 릴레이 작업을 위한 Result 타입.
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// 잘못된 페이로드 에러를 생성합니다.
    pub fn invalid(reason: impl Into<String>) -> Self {
        RelayError::InvalidPayload(reason.into())
    }

    /// 전송 실패 에러를 생성합니다.
    pub fn delivery<E>(action: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RelayError::DeliveryFailure {
            action: action.into(),
            source: Box::new(source),
        }
    }

    /// 호출자 입력 문제인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::InvalidPayload(_))
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(err: config::ConfigError) -> Self {
        RelayError::Config(err.to_string())
    }
}
