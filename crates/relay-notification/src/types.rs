//! 게이트웨이 타입 및 trait 정의.

use async_trait::async_trait;
use relay_core::{ChannelId, MessageId};
use serde::{Deserialize, Serialize};

/// 메시지 파싱 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Telegram MarkdownV2 (예약 문자 이스케이프 필요)
    MarkdownV2,
}

impl ParseMode {
    /// Bot API 표기.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// 보낼 메시지.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// 대상 채널
    pub channel: ChannelId,
    /// 본문
    pub text: String,
    /// 답장 앵커 (없으면 단독 메시지)
    pub reply_to: Option<MessageId>,
    /// 파싱 모드 (없으면 일반 텍스트)
    pub parse_mode: Option<ParseMode>,
}

impl OutboundMessage {
    /// 일반 텍스트 메시지를 생성합니다.
    pub fn plain(channel: ChannelId, text: impl Into<String>) -> Self {
        Self {
            channel,
            text: text.into(),
            reply_to: None,
            parse_mode: None,
        }
    }

    /// MarkdownV2 메시지를 생성합니다.
    pub fn markdown_v2(channel: ChannelId, text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::MarkdownV2),
            ..Self::plain(channel, text)
        }
    }

    /// 답장 앵커를 설정합니다.
    pub fn reply_to(mut self, anchor: Option<MessageId>) -> Self {
        self.reply_to = anchor;
        self
    }
}

/// 게이트웨이 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 게이트웨이 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("알림 전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 채널 게이트웨이 trait.
///
/// 봇 하나가 하나의 게이트웨이입니다. 실패 원인은 호출자에게 불투명합니다.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// 메시지를 보내고 게시된 메시지 ID를 반환합니다.
    async fn send_message(&self, message: &OutboundMessage) -> NotificationResult<MessageId>;

    /// 채널에서 심볼을 언급한 가장 최근 메시지를 찾습니다.
    ///
    /// 검색 범위는 구현이 정의하며 항상 유한해야 합니다.
    async fn find_latest_message_with_symbol(
        &self,
        channel: &ChannelId,
        symbol: &str,
    ) -> NotificationResult<Option<MessageId>>;

    /// 게이트웨이 이름 (로그용).
    fn name(&self) -> &str;
}
