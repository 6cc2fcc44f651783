//! 텔레그램 게이트웨이.
//!
//! Telegram Bot API `sendMessage`로 채널에 메시지를 게시하고 메시지 ID를 돌려받습니다.
//! 보낸 메시지는 [`SentHistory`]에 기록되어 심볼 검색에 쓰입니다.

use async_trait::async_trait;
use relay_core::{BotChannel, ChannelId, MessageId};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::history::SentHistory;
use crate::types::{ChannelGateway, NotificationError, NotificationResult, OutboundMessage};

/// 기본 Bot API URL.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
/// 기본 히스토리 검색 깊이.
pub const DEFAULT_HISTORY_DEPTH: usize = 200;
/// 429 응답에 retry_after가 없을 때 쓰는 값 (초).
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 텔레그램 봇 설정.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// 봇 이름 (로그용, 예: "signal", "promotion")
    pub name: String,
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// Bot API 기본 URL
    pub api_url: String,
    /// 채널별 히스토리 검색 깊이
    pub history_depth: usize,
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(name: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bot_token: bot_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }

    /// 봇/채널 설정에서 생성합니다.
    pub fn from_bot(name: impl Into<String>, bot: &BotChannel) -> Self {
        Self::new(name, bot.bot_token.clone())
    }

    /// Bot API URL을 지정합니다.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 히스토리 깊이를 지정합니다.
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }
}

/// Bot API 응답 봉투.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

/// 게시된 메시지 (필요한 필드만).
#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// 텔레그램 게이트웨이.
pub struct TelegramGateway {
    config: TelegramConfig,
    client: reqwest::Client,
    history: SentHistory,
}

impl TelegramGateway {
    /// 새 게이트웨이를 생성합니다.
    pub fn new(config: TelegramConfig) -> NotificationResult<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(NotificationError::InvalidConfig(format!(
                "{} bot token is empty",
                config.name
            )));
        }

        let history = SentHistory::new(config.history_depth);
        Ok(Self {
            config,
            client: reqwest::Client::new(),
            history,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.config.api_url, self.config.bot_token, method)
    }

    fn request_body(message: &OutboundMessage) -> serde_json::Value {
        let mut body = serde_json::json!({
            "chat_id": message.channel.as_str(),
            "text": message.text,
            "disable_web_page_preview": true,
        });

        if let Some(mode) = message.parse_mode {
            body["parse_mode"] = serde_json::Value::from(mode.as_str());
        }
        if let Some(anchor) = message.reply_to {
            // 앵커가 지워졌거나 다른 채팅의 메시지여도 전송은 성공해야 한다
            body["reply_parameters"] = serde_json::json!({
                "message_id": anchor.0,
                "allow_sending_without_reply": true,
            });
        }
        body
    }
}

#[async_trait]
impl ChannelGateway for TelegramGateway {
    async fn send_message(&self, message: &OutboundMessage) -> NotificationResult<MessageId> {
        debug!(
            bot = %self.config.name,
            chat_id = %message.channel,
            reply_to = ?message.reply_to,
            "Sending Telegram message"
        );

        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&Self::request_body(message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() == 429 {
            let retry_after = serde_json::from_str::<ApiResponse<SentMessage>>(&body)
                .ok()
                .and_then(|r| r.parameters)
                .and_then(|p| p.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(bot = %self.config.name, retry_after, "Telegram rate limited");
            return Err(NotificationError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let description = serde_json::from_str::<ApiResponse<SentMessage>>(&body)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or(body);
            error!(
                bot = %self.config.name,
                chat_id = %message.channel,
                %status,
                %description,
                "Failed to send Telegram message"
            );
            return Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, description
            )));
        }

        let parsed: ApiResponse<SentMessage> = serde_json::from_str(&body)?;
        let sent = match (parsed.ok, parsed.result) {
            (true, Some(sent)) => sent,
            _ => {
                let description = parsed.description.unwrap_or_else(|| "no result".to_string());
                error!(bot = %self.config.name, %description, "Telegram returned ok=false");
                return Err(NotificationError::SendFailed(description));
            }
        };

        let message_id = MessageId(sent.message_id);
        self.history
            .record(&message.channel, message_id, &message.text)
            .await;

        info!(
            bot = %self.config.name,
            chat_id = %message.channel,
            message_id = %message_id,
            "Telegram message sent"
        );
        Ok(message_id)
    }

    async fn find_latest_message_with_symbol(
        &self,
        channel: &ChannelId,
        symbol: &str,
    ) -> NotificationResult<Option<MessageId>> {
        let found = self.history.find_latest(channel, symbol).await;
        debug!(
            bot = %self.config.name,
            chat_id = %channel,
            symbol,
            depth = self.history.depth(),
            found = ?found,
            "Searched channel history"
        );
        Ok(found)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
