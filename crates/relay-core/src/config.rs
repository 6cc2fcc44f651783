//! 설정 관리.
//!
//! 기본값 → `config/relay.toml` (선택) → 환경 변수 순으로 덮어씁니다.
//! 환경 변수 이름은 기존 배포와 같습니다 (`TELEGRAM_BOT_TOKEN`, `PORT` 등).
//! 접두사가 없으므로 [`ENV_KEYS`]에 있는 변수만 읽습니다.

use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::{RelayError, RelayResult};
use crate::types::ChannelId;

/// 기본 설정 파일 경로 (확장자 제외).
pub const DEFAULT_CONFIG_FILE: &str = "config/relay";

/// 설정으로 읽는 환경 변수.
pub const ENV_KEYS: &[&str] = &[
    "BIND_HOST",
    "PORT",
    "TELEGRAM_API_URL",
    "TELEGRAM_BOT_TOKEN",
    "TELEGRAM_CHANNEL_ID",
    "TELEGRAM_BOT_TOKEN_2",
    "TELEGRAM_CHANNEL_PROMOTION",
    "TELEGRAM_BOT_TOKEN_REAL",
    "TELEGRAM_CHANNEL_ID_REAL",
    "SIGNAL_MENTION",
    "CHANNEL_HISTORY_DEPTH",
    "CORS_ORIGINS",
];

/// 릴레이 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// 바인딩할 호스트 (`BIND_HOST`)
    pub bind_host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// Telegram Bot API 기본 URL
    pub telegram_api_url: String,
    /// 기본 신호 봇 토큰
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    /// 기본 신호 채널
    #[serde(default)]
    pub telegram_channel_id: Option<String>,
    /// 홍보 봇 토큰
    #[serde(default)]
    pub telegram_bot_token_2: Option<String>,
    /// 홍보 채널
    #[serde(default)]
    pub telegram_channel_promotion: Option<String>,
    /// 실거래 봇 토큰
    #[serde(default)]
    pub telegram_bot_token_real: Option<String>,
    /// 실거래 채널
    #[serde(default)]
    pub telegram_channel_id_real: Option<String>,
    /// 진입 메시지 끝에 붙는 멘션. 빈 문자열이면 붙이지 않습니다.
    pub signal_mention: String,
    /// 채널 히스토리 검색 깊이 (채널별 최근 전송 메시지 수)
    pub channel_history_depth: usize,
    /// 허용 CORS origin (쉼표 구분)
    #[serde(default)]
    pub cors_origins: Option<String>,
}

/// 봇 토큰과 대상 채널 한 쌍.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotChannel {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// 메시지를 보낼 채널
    pub channel_id: ChannelId,
}

impl RelaySettings {
    /// 기본 경로의 파일과 프로세스 환경 변수에서 설정을 로드합니다.
    pub fn load() -> RelayResult<Self> {
        Self::load_from(
            Some(DEFAULT_CONFIG_FILE),
            relay_environment(std::env::vars()),
        )
    }

    /// 지정한 파일(선택)과 환경 소스에서 설정을 로드합니다.
    pub fn load_from(file: Option<&str>, environment: config::Environment) -> RelayResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("bind_host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("telegram_api_url", "https://api.telegram.org")?
            .set_default("signal_mention", "@AI_tradesbot")?
            .set_default("channel_history_depth", 200)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings: Self = builder.add_source(environment).build()?.try_deserialize()?;
        Ok(settings)
    }

    /// 소켓 주소.
    pub fn socket_addr(&self) -> RelayResult<SocketAddr> {
        format!("{}:{}", self.bind_host, self.port)
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid BIND_HOST/PORT: {}", e)))
    }

    /// 기본 신호 봇/채널 (필수).
    pub fn signal_bot(&self) -> RelayResult<BotChannel> {
        required_pair(
            &self.telegram_bot_token,
            "TELEGRAM_BOT_TOKEN",
            &self.telegram_channel_id,
            "TELEGRAM_CHANNEL_ID",
        )
    }

    /// 홍보 봇/채널 (필수).
    pub fn promotion_bot(&self) -> RelayResult<BotChannel> {
        required_pair(
            &self.telegram_bot_token_2,
            "TELEGRAM_BOT_TOKEN_2",
            &self.telegram_channel_promotion,
            "TELEGRAM_CHANNEL_PROMOTION",
        )
    }

    /// 실거래 봇/채널. 둘 중 하나라도 없으면 `None`.
    pub fn real_bot(&self) -> Option<BotChannel> {
        required_pair(
            &self.telegram_bot_token_real,
            "TELEGRAM_BOT_TOKEN_REAL",
            &self.telegram_channel_id_real,
            "TELEGRAM_CHANNEL_ID_REAL",
        )
        .ok()
    }

    /// 진입 메시지 멘션.
    pub fn mention(&self) -> Option<String> {
        let mention = self.signal_mention.trim();
        (!mention.is_empty()).then(|| mention.to_string())
    }
}

/// [`ENV_KEYS`]에 있는 변수만 담은 환경 소스.
pub fn relay_environment(vars: impl IntoIterator<Item = (String, String)>) -> config::Environment {
    let known: HashMap<String, String> = vars
        .into_iter()
        .filter(|(key, _)| ENV_KEYS.contains(&key.as_str()))
        .collect();
    config::Environment::default()
        .source(Some(known))
        .try_parsing(true)
}

fn required_pair(
    token: &Option<String>,
    token_key: &str,
    channel: &Option<String>,
    channel_key: &str,
) -> RelayResult<BotChannel> {
    let token = non_empty(token).ok_or_else(|| RelayError::Config(format!("{} is not set", token_key)))?;
    let channel =
        non_empty(channel).ok_or_else(|| RelayError::Config(format!("{} is not set", channel_key)))?;

    Ok(BotChannel {
        bot_token: token,
        channel_id: ChannelId::new(channel),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
