//! 열린 신호 레지스트리.
//!
//! 심볼별로 가장 최근 진입 신호의 채널 메시지 ID를 기억해,
//! 이후 익절/청산 메시지를 그 메시지에 대한 답장으로 보낼 수 있게 합니다.
//!
//! 프로세스 수명 동안만 유지되며 만료 정책은 없습니다.
//! 각 연산은 자기 구간에서만 잠금을 잡고, 게이트웨이 호출 동안에는 잡지 않습니다.
//! 같은 심볼에 대한 동시 이벤트는 마지막 쓰기가 이깁니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{MessageId, PriceInput, Side};

/// 추적 중인 열린 신호.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSignal {
    /// 정규화된 심볼 (예: "OM/USDT")
    pub symbol: String,
    /// 포지션 방향
    pub side: Side,
    /// 발신자가 보낸 진입가
    pub entry_price: PriceInput,
    /// 진입 메시지 ID (답장 앵커)
    pub message_id: MessageId,
    /// 등록 시각
    pub created_at: DateTime<Utc>,
}

impl TrackedSignal {
    /// 현재 시각으로 새 신호를 생성합니다.
    pub fn new(symbol: impl Into<String>, side: Side, entry_price: PriceInput, message_id: MessageId) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            entry_price,
            message_id,
            created_at: Utc::now(),
        }
    }
}

/// 심볼 → 열린 신호 인메모리 저장소.
#[derive(Debug, Default)]
pub struct SignalRegistry {
    signals: RwLock<HashMap<String, TrackedSignal>>,
}

impl SignalRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 신호를 등록합니다. 같은 심볼의 기존 신호는 무조건 교체되며 반환됩니다.
    pub async fn put(&self, signal: TrackedSignal) -> Option<TrackedSignal> {
        let symbol = signal.symbol.clone();
        let replaced = self.signals.write().await.insert(symbol.clone(), signal);
        debug!(symbol = %symbol, replaced = replaced.is_some(), "Signal stored");
        replaced
    }

    /// 심볼의 열린 신호를 조회합니다.
    pub async fn get(&self, symbol: &str) -> Option<TrackedSignal> {
        self.signals.read().await.get(symbol).cloned()
    }

    /// 심볼의 신호를 제거합니다. 없으면 아무 일도 하지 않습니다.
    pub async fn delete(&self, symbol: &str) -> Option<TrackedSignal> {
        let removed = self.signals.write().await.remove(symbol);
        debug!(symbol = %symbol, removed = removed.is_some(), "Signal removed");
        removed
    }

    /// 열린 신호 목록 (심볼 순).
    pub async fn snapshot(&self) -> Vec<TrackedSignal> {
        let mut signals: Vec<TrackedSignal> = self.signals.read().await.values().cloned().collect();
        signals.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        signals
    }

    /// 열린 신호 수.
    pub async fn len(&self) -> usize {
        self.signals.read().await.len()
    }

    /// 비어 있는지 확인합니다.
    pub async fn is_empty(&self) -> bool {
        self.signals.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(symbol: &str, message_id: i64) -> TrackedSignal {
        TrackedSignal::new(symbol, Side::Long, PriceInput::from("1.5"), MessageId(message_id))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let registry = SignalRegistry::new();
        assert!(registry.put(signal("OM/USDT", 10)).await.is_none());

        let stored = registry.get("OM/USDT").await.unwrap();
        assert_eq!(stored.message_id, MessageId(10));
        assert!(registry.get("BTC/USDT").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_signal() {
        let registry = SignalRegistry::new();
        registry.put(signal("OM/USDT", 10)).await;

        let replaced = registry.put(signal("OM/USDT", 11)).await.unwrap();
        assert_eq!(replaced.message_id, MessageId(10));
        assert_eq!(registry.get("OM/USDT").await.unwrap().message_id, MessageId(11));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let registry = SignalRegistry::new();
        registry.put(signal("OM/USDT", 10)).await;

        assert!(registry.delete("OM/USDT").await.is_some());
        assert!(registry.delete("OM/USDT").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_symbol() {
        let registry = SignalRegistry::new();
        registry.put(signal("OM/USDT", 1)).await;
        registry.put(signal("BTC/USDT", 2)).await;

        let symbols: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.symbol)
            .collect();
        assert_eq!(symbols, vec!["BTC/USDT", "OM/USDT"]);
    }
}
