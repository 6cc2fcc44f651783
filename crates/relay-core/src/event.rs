//! 웹훅 페이로드와 검증된 신호 이벤트.
//!
//! 웹훅 본문은 먼저 느슨한 [`WebhookPayload`]로 역직렬화된 뒤,
//! `message` 판별자를 기준으로 한 번만 검증되어 [`SignalEvent`]가 됩니다.
//! 이후의 처리 로직은 필드 존재 여부를 다시 확인하지 않습니다.
//!
//! 판별 순서 (먼저 일치하는 것이 적용됨):
//! 1. `"close"` → [`SignalEvent::Close`]
//! 2. `"tp"` / `"lastTp"` → [`SignalEvent::TakeProfit`]
//! 3. 그 외 → [`SignalEvent::NewEntry`]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RelayError, RelayResult};
use crate::formatter::normalize_symbol;
use crate::types::{PriceInput, Side};

/// 청산 이벤트 판별 값.
pub const MESSAGE_CLOSE: &str = "close";
/// 중간 익절 이벤트 판별 값.
pub const MESSAGE_TP: &str = "tp";
/// 최종 익절 이벤트 판별 값.
pub const MESSAGE_LAST_TP: &str = "lastTp";

/// 목표가 목록. 단일 값 또는 배열로 들어올 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Targets {
    /// 순서가 있는 목표가 배열
    Many(Vec<PriceInput>),
    /// 단일 목표가
    One(PriceInput),
}

impl Targets {
    /// 목표가를 순서대로 펼칩니다.
    pub fn into_vec(self) -> Vec<PriceInput> {
        match self {
            Targets::Many(targets) => targets,
            Targets::One(target) => vec![target],
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Targets::Many(targets) => targets.is_empty(),
            Targets::One(target) => target.is_blank(),
        }
    }
}

/// 웹훅 원본 페이로드.
///
/// 모든 필드는 선택적이며, 검증은 [`SignalEvent::try_from`]에서 수행됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// 이벤트 판별자 ("close", "tp", "lastTp", 그 외는 신규 진입)
    #[serde(default)]
    pub message: Option<String>,
    /// 거래 심볼 (예: "OMUSDT.P")
    #[serde(default)]
    pub symbol: Option<String>,
    /// 포지션 방향 ("long" / "short")
    #[serde(default)]
    pub side: Option<String>,
    /// 진입가
    #[serde(default)]
    pub entry_price: Option<PriceInput>,
    /// 목표가 (단일 값 또는 배열)
    #[serde(default)]
    pub targets: Option<Targets>,
    /// 손절가
    #[serde(default)]
    pub stop_loss: Option<PriceInput>,
    /// 중간 익절가
    #[serde(default)]
    pub tp_price: Option<PriceInput>,
    /// 최종 익절가
    #[serde(default)]
    pub final_tp_price: Option<PriceInput>,
}

/// 익절 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeProfitStage {
    /// 중간 목표 도달 (`tp`)
    Intermediate,
    /// 마지막 목표 도달 (`lastTp`) - 신호 종료
    Final,
}

impl TakeProfitStage {
    /// 웹훅 판별 값 ("tp" / "lastTp").
    pub fn message(&self) -> &'static str {
        match self {
            TakeProfitStage::Intermediate => MESSAGE_TP,
            TakeProfitStage::Final => MESSAGE_LAST_TP,
        }
    }

    /// 홍보 메시지에 쓰이는 가격 라벨.
    pub fn price_label(&self) -> &'static str {
        match self {
            TakeProfitStage::Intermediate => "TP Price",
            TakeProfitStage::Final => "Final TP Price",
        }
    }
}

/// 검증이 끝난 신호 이벤트.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent {
    /// 신규 진입 신호
    NewEntry {
        side: Side,
        symbol: String,
        entry_price: PriceInput,
        targets: Vec<PriceInput>,
        stop_loss: PriceInput,
    },
    /// 익절 (중간 또는 최종)
    TakeProfit {
        symbol: String,
        side: Side,
        entry_price: PriceInput,
        tp_price: PriceInput,
        stage: TakeProfitStage,
    },
    /// 신호 청산
    Close { symbol: String, side: Side },
}

/// 이벤트 종류 (로그/메트릭 라벨용).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewEntry,
    TakeProfit,
    FinalTakeProfit,
    Close,
}

impl EventKind {
    /// 라벨 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewEntry => "new_entry",
            EventKind::TakeProfit => "tp",
            EventKind::FinalTakeProfit => "last_tp",
            EventKind::Close => "close",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignalEvent {
    /// 정규화된 심볼.
    pub fn symbol(&self) -> &str {
        match self {
            SignalEvent::NewEntry { symbol, .. }
            | SignalEvent::TakeProfit { symbol, .. }
            | SignalEvent::Close { symbol, .. } => symbol,
        }
    }

    /// 포지션 방향.
    pub fn side(&self) -> Side {
        match self {
            SignalEvent::NewEntry { side, .. }
            | SignalEvent::TakeProfit { side, .. }
            | SignalEvent::Close { side, .. } => *side,
        }
    }

    /// 이벤트 종류.
    pub fn kind(&self) -> EventKind {
        match self {
            SignalEvent::NewEntry { .. } => EventKind::NewEntry,
            SignalEvent::TakeProfit {
                stage: TakeProfitStage::Intermediate,
                ..
            } => EventKind::TakeProfit,
            SignalEvent::TakeProfit {
                stage: TakeProfitStage::Final,
                ..
            } => EventKind::FinalTakeProfit,
            SignalEvent::Close { .. } => EventKind::Close,
        }
    }
}

impl TryFrom<WebhookPayload> for SignalEvent {
    type Error = RelayError;

    fn try_from(payload: WebhookPayload) -> RelayResult<Self> {
        match payload.message.as_deref() {
            Some(MESSAGE_CLOSE) => close_event(payload),
            Some(MESSAGE_TP) => take_profit_event(payload, TakeProfitStage::Intermediate),
            Some(MESSAGE_LAST_TP) => take_profit_event(payload, TakeProfitStage::Final),
            _ => new_entry_event(payload),
        }
    }
}

fn close_event(payload: WebhookPayload) -> RelayResult<SignalEvent> {
    let missing = || RelayError::invalid("Invalid close payload: symbol and side are required");

    let symbol = present_text(payload.symbol).ok_or_else(missing)?;
    let side = present_text(payload.side).ok_or_else(missing)?;

    Ok(SignalEvent::Close {
        symbol: normalize_symbol(&symbol),
        side: parse_side(&side)?,
    })
}

fn take_profit_event(payload: WebhookPayload, stage: TakeProfitStage) -> RelayResult<SignalEvent> {
    let missing = || {
        RelayError::invalid(format!(
            "Invalid {} payload: required fields are missing",
            stage.message()
        ))
    };

    let exit_price = match stage {
        TakeProfitStage::Intermediate => payload.tp_price,
        TakeProfitStage::Final => payload.final_tp_price,
    };

    let symbol = present_text(payload.symbol).ok_or_else(missing)?;
    let entry_price = present_price(payload.entry_price).ok_or_else(missing)?;
    let side = present_text(payload.side).ok_or_else(missing)?;
    let tp_price = present_price(exit_price).ok_or_else(missing)?;

    Ok(SignalEvent::TakeProfit {
        symbol: normalize_symbol(&symbol),
        side: parse_side(&side)?,
        entry_price,
        tp_price,
        stage,
    })
}

fn new_entry_event(payload: WebhookPayload) -> RelayResult<SignalEvent> {
    let missing = || RelayError::invalid("Invalid payload: required fields are missing");

    let side = present_text(payload.side).ok_or_else(missing)?;
    let symbol = present_text(payload.symbol).ok_or_else(missing)?;
    let entry_price = present_price(payload.entry_price).ok_or_else(missing)?;
    let targets = payload
        .targets
        .filter(|t| !t.is_blank())
        .ok_or_else(missing)?;
    let stop_loss = present_price(payload.stop_loss).ok_or_else(missing)?;

    Ok(SignalEvent::NewEntry {
        side: parse_side(&side)?,
        symbol: normalize_symbol(&symbol),
        entry_price,
        targets: targets.into_vec(),
        stop_loss,
    })
}

fn present_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn present_price(value: Option<PriceInput>) -> Option<PriceInput> {
    value.filter(|v| !v.is_blank())
}

fn parse_side(side: &str) -> RelayResult<Side> {
    side.parse::<Side>()
        .map_err(|_| RelayError::invalid(format!("Invalid side '{}': expected long or short", side)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RelayResult<SignalEvent> {
        let payload: WebhookPayload = serde_json::from_value(value).unwrap();
        SignalEvent::try_from(payload)
    }

    #[test]
    fn test_new_entry_with_target_list() {
        let event = parse(json!({
            "side": "long",
            "symbol": "OMUSDT.P",
            "entryPrice": 7.53114,
            "targets": [7.7, "7.9"],
            "stopLoss": 7.1
        }))
        .unwrap();

        match event {
            SignalEvent::NewEntry {
                side,
                symbol,
                targets,
                ..
            } => {
                assert_eq!(side, Side::Long);
                assert_eq!(symbol, "OM/USDT");
                assert_eq!(targets.len(), 2);
                assert_eq!(targets[1], PriceInput::from("7.9"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_new_entry_with_scalar_target() {
        let event = parse(json!({
            "side": "short",
            "symbol": "BTCUSDT",
            "entryPrice": "65000",
            "targets": 64000,
            "stopLoss": 66000
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::NewEntry);
        if let SignalEvent::NewEntry { targets, .. } = event {
            assert_eq!(targets, vec![PriceInput::from(64000i64)]);
        }
    }

    #[test]
    fn test_new_entry_missing_fields() {
        let err = parse(json!({"side": "long"})).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Invalid payload: required fields are missing");
    }

    #[test]
    fn test_zero_entry_price_counts_as_missing() {
        let err = parse(json!({
            "side": "long",
            "symbol": "OMUSDT",
            "entryPrice": 0,
            "targets": [1],
            "stopLoss": 1
        }))
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_empty_target_list_is_rejected() {
        let err = parse(json!({
            "side": "long",
            "symbol": "OMUSDT",
            "entryPrice": 1,
            "targets": [],
            "stopLoss": 1
        }))
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_close_event() {
        let event = parse(json!({"message": "close", "symbol": "OMUSDT.P", "side": "long"})).unwrap();
        assert_eq!(
            event,
            SignalEvent::Close {
                symbol: "OM/USDT".to_string(),
                side: Side::Long
            }
        );
    }

    #[test]
    fn test_close_missing_side() {
        let err = parse(json!({"message": "close", "symbol": "OMUSDT"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid close payload: symbol and side are required"
        );
    }

    #[test]
    fn test_take_profit_missing_fields() {
        let err = parse(json!({"message": "tp"})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid tp payload: required fields are missing");
    }

    #[test]
    fn test_last_tp_requires_final_price() {
        // lastTp는 tpPrice가 아니라 finalTpPrice를 요구한다
        let err = parse(json!({
            "message": "lastTp",
            "symbol": "OMUSDT",
            "side": "long",
            "entryPrice": 7.5,
            "tpPrice": 8.0
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid lastTp payload: required fields are missing"
        );
    }

    #[test]
    fn test_final_take_profit_event() {
        let event = parse(json!({
            "message": "lastTp",
            "symbol": "OM/USDT",
            "side": "short",
            "entryPrice": "7.5",
            "finalTpPrice": 7.0
        }))
        .unwrap();
        assert_eq!(event.kind(), EventKind::FinalTakeProfit);
        assert_eq!(event.symbol(), "OM/USDT");
        assert_eq!(event.side(), Side::Short);
    }

    #[test]
    fn test_take_profit_accepts_non_numeric_price() {
        // 숫자가 아닌 가격은 홍보 메시지에서 원문 그대로 표기된다
        let event = parse(json!({
            "message": "tp",
            "symbol": "OMUSDT",
            "side": "long",
            "entryPrice": "7.5",
            "tpPrice": "market"
        }))
        .unwrap();

        match event {
            SignalEvent::TakeProfit { tp_price, stage, .. } => {
                assert_eq!(tp_price, PriceInput::from("market"));
                assert_eq!(stage, TakeProfitStage::Intermediate);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // 문자열 "0"은 누락이 아니다
        let event = parse(json!({
            "message": "lastTp",
            "symbol": "OMUSDT",
            "side": "short",
            "entryPrice": "0",
            "finalTpPrice": 1
        }));
        assert!(event.is_ok());
    }

    #[test]
    fn test_unknown_side_rejected() {
        let err = parse(json!({"message": "close", "symbol": "OMUSDT", "side": "sideways"}))
            .unwrap_err();
        assert!(err.to_string().contains("expected long or short"));
    }
}
