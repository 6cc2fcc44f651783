//! # Relay Core
//!
//! 트레이딩 신호 웹훅 릴레이의 핵심 도메인 모델과 로직을 제공합니다.
//!
//! 이 크레이트는 다음을 포함합니다:
//! - 웹훅 페이로드 및 검증된 신호 이벤트 타입
//! - 채널 메시지 포맷터 (심볼 정규화, 가격 포맷, 수익 계산, MarkdownV2 이스케이프)
//! - 심볼별 열린 신호를 추적하는 인메모리 레지스트리
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod error;
pub mod event;
pub mod formatter;
pub mod logging;
pub mod registry;
pub mod types;

pub use self::config::*;
pub use error::*;
pub use event::*;
pub use formatter::*;
pub use logging::*;
pub use registry::*;
pub use types::*;
