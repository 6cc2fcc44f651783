//! # Relay Notification
//!
//! 신호 메시지를 채널로 전달하는 게이트웨이.
//!
//! - [`ChannelGateway`]: "채널 C에 텍스트 전송 (선택적으로 메시지 M에 대한 답장)" 추상화
//! - [`TelegramGateway`]: Telegram Bot API 구현
//! - `MockGateway`: 테스트용 전송 기록기 (`test-utils` feature)

pub mod history;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod telegram;
pub mod types;

pub use history::*;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::*;
pub use telegram::*;
pub use types::*;
