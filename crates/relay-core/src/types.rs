//! 신호 릴레이 전반에서 사용하는 기본 타입.
//!
//! - `Side` - 포지션 방향 (롱/숏)
//! - `PriceInput` - 발신자가 보낸 그대로의 가격 값
//! - `MessageId`, `ChannelId` - 채널 메시지 식별자

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 롱 (상승 방향)
    Long,
    /// 숏 (하락 방향)
    Short,
}

impl Side {
    /// 소문자 표기 ("long" / "short").
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    /// 대문자 표기 ("LONG" / "SHORT").
    pub fn as_upper(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// 웹훅으로 받은 가격 값.
///
/// JSON 숫자 또는 문자열로 들어오며, 원본 표기를 그대로 보존합니다.
/// 숫자 해석은 필요할 때 [`PriceInput::to_decimal`]로 수행합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    /// JSON 숫자
    Number(serde_json::Number),
    /// JSON 문자열
    Text(String),
}

impl PriceInput {
    /// 원본 표기를 문자열로 반환합니다.
    pub fn raw(&self) -> String {
        match self {
            PriceInput::Number(n) => n.to_string(),
            PriceInput::Text(s) => s.clone(),
        }
    }

    /// Decimal로 변환합니다. 숫자가 아니면 `None`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let raw = self.raw();
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
    }

    /// 값이 비어 있는지 확인합니다.
    ///
    /// 빈 문자열과 숫자 0은 값이 없는 것으로 간주합니다.
    pub fn is_blank(&self) -> bool {
        match self {
            PriceInput::Number(n) => n.as_f64().is_some_and(|v| v == 0.0),
            PriceInput::Text(s) => s.trim().is_empty(),
        }
    }

    /// JSON 숫자로 들어온 값인지 확인합니다.
    pub fn is_number(&self) -> bool {
        matches!(self, PriceInput::Number(_))
    }
}

impl From<&str> for PriceInput {
    fn from(value: &str) -> Self {
        PriceInput::Text(value.to_string())
    }
}

impl From<f64> for PriceInput {
    fn from(value: f64) -> Self {
        match serde_json::Number::from_f64(value) {
            Some(n) => PriceInput::Number(n),
            None => PriceInput::Text(value.to_string()),
        }
    }
}

impl From<i64> for PriceInput {
    fn from(value: i64) -> Self {
        PriceInput::Number(value.into())
    }
}

/// 채널에 게시된 메시지의 식별자 (답장 앵커).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 메시지를 보낼 채널 식별자 (`-100...` 형식 ID 또는 `@channel` 이름).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// 새 채널 ID를 생성합니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// 문자열 참조를 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
