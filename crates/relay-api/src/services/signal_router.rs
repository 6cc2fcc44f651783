//! 신호 이벤트 라우터.
//!
//! 검증된 [`SignalEvent`]를 받아 레지스트리, 포맷터, 게이트웨이를 조율합니다.
//! 한 라우터는 하나의 [`DeploymentProfile`]에 묶이며, 프로파일이 채널, 봇,
//! 답장 앵커를 찾는 방법과 멘션 정책을 결정합니다.
//!
//! 레지스트리 변경은 전송이 성공한 뒤에만 일어나므로 실패 시 되돌릴 것이 없습니다.

use std::fmt;
use std::sync::Arc;

use relay_core::{
    format_close_message, format_entry_message, format_promotion_message, webhook_span,
    ChannelId, MessageId, PositionPolicy, PriceInput, RelayError, RelayResult, Side, SignalEvent,
    SignalRegistry, TakeProfitStage, TrackedSignal, TradeResult, WebhookPayload,
};
use relay_notification::{ChannelGateway, OutboundMessage};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn, Instrument};

use crate::metrics::{
    record_relay_event, set_open_signals, OUTCOME_FAILED, OUTCOME_INVALID, OUTCOME_SENT,
};

/// 진입 전송 성공 상태.
pub const STATUS_MESSAGE_SENT: &str = "Message sent";
/// 청산 전송 성공 상태.
pub const STATUS_CLOSE_SENT: &str = "Close message sent";

/// 후속 메시지의 답장 앵커를 찾는 방법.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSource {
    /// 진입 시 등록한 레지스트리 항목
    Registry,
    /// 게이트웨이의 채널 히스토리 검색 (레지스트리 미사용)
    ChannelHistory,
}

/// 웹훅 경로 하나의 배포 설정.
#[derive(Clone)]
pub struct DeploymentProfile {
    /// 프로파일 이름 (로그/메트릭 라벨)
    pub name: String,
    /// 진입/청산 메시지 채널
    pub signal_channel: ChannelId,
    /// 익절 홍보 채널
    pub promotion_channel: ChannelId,
    /// 답장 앵커 출처
    pub anchor: AnchorSource,
    /// 메시지 끝 멘션
    pub mention: Option<String>,
    /// 진입/청산 전송 봇
    pub signal_gateway: Arc<dyn ChannelGateway>,
    /// 홍보 전송 봇
    pub promotion_gateway: Arc<dyn ChannelGateway>,
}

impl fmt::Debug for DeploymentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentProfile")
            .field("name", &self.name)
            .field("signal_channel", &self.signal_channel)
            .field("promotion_channel", &self.promotion_channel)
            .field("anchor", &self.anchor)
            .field("mention", &self.mention)
            .field("signal_gateway", &self.signal_gateway.name())
            .field("promotion_gateway", &self.promotion_gateway.name())
            .finish()
    }
}

/// 처리 성공 응답.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookOutcome {
    /// 상태 설명 (예: "Message sent")
    pub status: String,
    /// 채널에 게시된 본문
    pub message: String,
}

impl WebhookOutcome {
    fn new(status: impl Into<String>, message: String) -> Self {
        Self {
            status: status.into(),
            message,
        }
    }
}

/// 프로파일 하나에 묶인 이벤트 라우터.
pub struct SignalRouter {
    profile: DeploymentProfile,
    registry: Arc<SignalRegistry>,
    policy: PositionPolicy,
}

impl SignalRouter {
    pub fn new(profile: DeploymentProfile, registry: Arc<SignalRegistry>) -> Self {
        Self {
            profile,
            registry,
            policy: PositionPolicy::default(),
        }
    }

    /// 수익 계산 정책을 바꿉니다.
    pub fn with_policy(mut self, policy: PositionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn profile(&self) -> &DeploymentProfile {
        &self.profile
    }

    /// 원시 페이로드를 검증한 뒤 처리합니다.
    pub async fn handle_payload(&self, payload: WebhookPayload) -> RelayResult<WebhookOutcome> {
        let event = match SignalEvent::try_from(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(profile = %self.profile.name, error = %e, "Rejected webhook payload");
                record_relay_event(&self.profile.name, "unknown", OUTCOME_INVALID);
                return Err(e);
            }
        };
        self.handle(event).await
    }

    /// 검증된 이벤트를 처리합니다.
    pub async fn handle(&self, event: SignalEvent) -> RelayResult<WebhookOutcome> {
        let kind = event.kind();
        let span = webhook_span!(self.profile.name, kind, event.symbol());

        let result = async {
            match event {
                SignalEvent::NewEntry {
                    side,
                    symbol,
                    entry_price,
                    targets,
                    stop_loss,
                } => {
                    self.new_entry(side, symbol, entry_price, &targets, &stop_loss)
                        .await
                }
                SignalEvent::TakeProfit {
                    symbol,
                    side,
                    entry_price,
                    tp_price,
                    stage,
                } => {
                    self.take_profit(symbol, side, &entry_price, &tp_price, stage)
                        .await
                }
                SignalEvent::Close { symbol, side } => self.close(symbol, side).await,
            }
        }
        .instrument(span)
        .await;

        let outcome = match &result {
            Ok(_) => OUTCOME_SENT,
            Err(e) if e.is_client_error() => OUTCOME_INVALID,
            Err(e) => {
                error!(
                    profile = %self.profile.name,
                    kind = %kind,
                    error = %e,
                    cause = ?std::error::Error::source(e).map(|s| s.to_string()),
                    "Webhook event failed"
                );
                OUTCOME_FAILED
            }
        };
        record_relay_event(&self.profile.name, kind.as_str(), outcome);

        result
    }

    async fn new_entry(
        &self,
        side: Side,
        symbol: String,
        entry_price: PriceInput,
        targets: &[PriceInput],
        stop_loss: &PriceInput,
    ) -> RelayResult<WebhookOutcome> {
        let text = format_entry_message(
            side,
            &symbol,
            &entry_price,
            targets,
            stop_loss,
            self.profile.mention.as_deref(),
        );

        let message = OutboundMessage::plain(self.profile.signal_channel.clone(), text.clone());
        let message_id = self
            .profile
            .signal_gateway
            .send_message(&message)
            .await
            .map_err(|e| RelayError::delivery("message", e))?;

        if self.profile.anchor == AnchorSource::Registry {
            let signal = TrackedSignal::new(symbol.clone(), side, entry_price, message_id);
            if let Some(previous) = self.registry.put(signal).await {
                warn!(
                    symbol = %symbol,
                    previous_message_id = %previous.message_id,
                    "Unclosed signal replaced by new entry"
                );
            }
            set_open_signals(self.registry.len().await);
        }

        info!(message_id = %message_id, "Entry signal relayed");
        Ok(WebhookOutcome::new(STATUS_MESSAGE_SENT, text))
    }

    async fn take_profit(
        &self,
        symbol: String,
        side: Side,
        entry_price: &PriceInput,
        tp_price: &PriceInput,
        stage: TakeProfitStage,
    ) -> RelayResult<WebhookOutcome> {
        let result = TradeResult::compute(&symbol, side, entry_price, tp_price, stage, &self.policy);
        let text = format_promotion_message(&result, &self.policy, self.profile.mention.as_deref());

        // 히스토리 프로파일의 홍보 메시지는 항상 단독 전송
        let anchor = match self.profile.anchor {
            AnchorSource::Registry => self.registry.get(&symbol).await.map(|s| s.message_id),
            AnchorSource::ChannelHistory => None,
        };
        debug!(anchor = ?anchor, "Resolved take-profit anchor");

        let message = OutboundMessage::markdown_v2(self.profile.promotion_channel.clone(), text.clone())
            .reply_to(anchor);
        self.profile
            .promotion_gateway
            .send_message(&message)
            .await
            .map_err(|e| RelayError::delivery(format!("{} message", stage.message()), e))?;

        if stage == TakeProfitStage::Final && self.profile.anchor == AnchorSource::Registry {
            self.registry.delete(&symbol).await;
            set_open_signals(self.registry.len().await);
        }

        info!(anchor = ?anchor, profit = ?result.profit, "Take-profit result relayed");
        Ok(WebhookOutcome::new(format!("{} message sent", stage.message()), text))
    }

    async fn close(&self, symbol: String, side: Side) -> RelayResult<WebhookOutcome> {
        let anchor = self.resolve_close_anchor(&symbol).await?;
        let text = format_close_message(&symbol, side);

        let message =
            OutboundMessage::plain(self.profile.signal_channel.clone(), text.clone()).reply_to(anchor);
        self.profile
            .signal_gateway
            .send_message(&message)
            .await
            .map_err(|e| RelayError::delivery("close message", e))?;

        if anchor.is_some() && self.profile.anchor == AnchorSource::Registry {
            self.registry.delete(&symbol).await;
            set_open_signals(self.registry.len().await);
        }

        info!(anchor = ?anchor, "Close signal relayed");
        Ok(WebhookOutcome::new(STATUS_CLOSE_SENT, text))
    }

    async fn resolve_close_anchor(&self, symbol: &str) -> RelayResult<Option<MessageId>> {
        match self.profile.anchor {
            AnchorSource::Registry => Ok(self.registry.get(symbol).await.map(|s| s.message_id)),
            AnchorSource::ChannelHistory => self
                .profile
                .signal_gateway
                .find_latest_message_with_symbol(&self.profile.signal_channel, symbol)
                .await
                .map_err(|e| RelayError::delivery("close message", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_notification::{MockGateway, ParseMode};
    use serde_json::json;

    struct Fixture {
        router: SignalRouter,
        registry: Arc<SignalRegistry>,
        signal: Arc<MockGateway>,
        promotion: Arc<MockGateway>,
    }

    fn fixture(anchor: AnchorSource) -> Fixture {
        let registry = Arc::new(SignalRegistry::new());
        let signal = Arc::new(MockGateway::with_first_id("signal", 100));
        let promotion = Arc::new(MockGateway::with_first_id("promotion", 500));
        let profile = DeploymentProfile {
            name: "test".to_string(),
            signal_channel: ChannelId::new("@signals"),
            promotion_channel: ChannelId::new("@promo"),
            anchor,
            mention: Some("@AI_tradesbot".to_string()),
            signal_gateway: signal.clone(),
            promotion_gateway: promotion.clone(),
        };
        Fixture {
            router: SignalRouter::new(profile, registry.clone()),
            registry,
            signal,
            promotion,
        }
    }

    async fn send(fixture: &Fixture, body: serde_json::Value) -> RelayResult<WebhookOutcome> {
        let payload: WebhookPayload = serde_json::from_value(body).unwrap();
        fixture.router.handle_payload(payload).await
    }

    fn entry(symbol: &str) -> serde_json::Value {
        json!({
            "side": "long",
            "symbol": symbol,
            "entryPrice": 7.53114,
            "targets": [7.7, 7.9],
            "stopLoss": 7.1
        })
    }

    #[tokio::test]
    async fn test_new_entry_registers_signal() {
        let f = fixture(AnchorSource::Registry);
        let outcome = send(&f, entry("OMUSDT.P")).await.unwrap();

        assert_eq!(outcome.status, STATUS_MESSAGE_SENT);
        assert!(outcome.message.contains("#OM/USDT"));
        assert!(outcome.message.contains("Entry : 7.53114 - 7.60645"));

        let stored = f.registry.get("OM/USDT").await.unwrap();
        assert_eq!(stored.message_id, MessageId(100));
        assert_eq!(stored.side, Side::Long);

        let sent = f.signal.last_sent().unwrap();
        assert_eq!(sent.channel, ChannelId::new("@signals"));
        assert!(sent.reply_to.is_none());
        assert!(sent.parse_mode.is_none());
    }

    #[tokio::test]
    async fn test_close_replies_then_second_close_is_standalone() {
        let f = fixture(AnchorSource::Registry);
        send(&f, entry("OMUSDT")).await.unwrap();

        let close = json!({"message": "close", "symbol": "OMUSDT", "side": "long"});
        let outcome = send(&f, close.clone()).await.unwrap();
        assert_eq!(outcome.status, STATUS_CLOSE_SENT);
        assert_eq!(outcome.message, "#OM/USDT #long\nClose the Signal");
        assert_eq!(f.signal.last_sent().unwrap().reply_to, Some(MessageId(100)));
        assert!(f.registry.is_empty().await);

        send(&f, close).await.unwrap();
        assert_eq!(f.signal.last_sent().unwrap().reply_to, None);
    }

    #[tokio::test]
    async fn test_intermediate_tp_keeps_signal() {
        let f = fixture(AnchorSource::Registry);
        send(&f, entry("OMUSDT")).await.unwrap();

        let outcome = send(
            &f,
            json!({"message": "tp", "symbol": "OMUSDT", "side": "long", "entryPrice": 100, "tpPrice": 110}),
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, "tp message sent");
        assert!(outcome.message.contains("`200\\.00000000` USDT"));

        let sent = f.promotion.last_sent().unwrap();
        assert_eq!(sent.channel, ChannelId::new("@promo"));
        assert_eq!(sent.parse_mode, Some(ParseMode::MarkdownV2));
        assert_eq!(sent.reply_to, Some(MessageId(100)));
        assert!(f.registry.get("OM/USDT").await.is_some());
    }

    #[tokio::test]
    async fn test_tp_with_non_numeric_price_is_still_sent() {
        let f = fixture(AnchorSource::Registry);
        send(&f, entry("OMUSDT")).await.unwrap();

        let outcome = send(
            &f,
            json!({"message": "tp", "symbol": "OMUSDT", "side": "long", "entryPrice": "7.5", "tpPrice": "market"}),
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, "tp message sent");
        assert!(outcome.message.contains("💰 *Entry Price:* `7\\.50000000`"));
        assert!(outcome.message.contains("🎯 *TP Price* `market`"));
        assert!(outcome.message.contains("📈 *Profit:* `n/a` USDT"));
        assert_eq!(f.promotion.sent_count(), 1);
        assert_eq!(f.promotion.last_sent().unwrap().reply_to, Some(MessageId(100)));
    }

    #[tokio::test]
    async fn test_final_tp_deletes_signal() {
        let f = fixture(AnchorSource::Registry);
        send(&f, entry("OMUSDT")).await.unwrap();

        let outcome = send(
            &f,
            json!({"message": "lastTp", "symbol": "OMUSDT", "side": "long", "entryPrice": 100, "finalTpPrice": 120}),
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, "lastTp message sent");
        assert!(outcome.message.contains("Final TP Price"));
        assert!(f.registry.get("OM/USDT").await.is_none());
    }

    #[tokio::test]
    async fn test_final_tp_without_signal_is_standalone() {
        let f = fixture(AnchorSource::Registry);
        send(
            &f,
            json!({"message": "lastTp", "symbol": "BTCUSDT", "side": "short", "entryPrice": 100, "finalTpPrice": 90}),
        )
        .await
        .unwrap();

        assert_eq!(f.promotion.last_sent().unwrap().reply_to, None);
    }

    #[tokio::test]
    async fn test_entry_overwrites_unclosed_signal() {
        let f = fixture(AnchorSource::Registry);
        send(&f, entry("OMUSDT")).await.unwrap();
        send(&f, entry("OMUSDT")).await.unwrap();

        assert_eq!(f.registry.len().await, 1);
        assert_eq!(f.registry.get("OM/USDT").await.unwrap().message_id, MessageId(101));
    }

    #[tokio::test]
    async fn test_delivery_failure_leaves_registry_untouched() {
        let f = fixture(AnchorSource::Registry);
        send(&f, entry("OMUSDT")).await.unwrap();
        f.signal.set_failing(true);

        let err = send(&f, json!({"message": "close", "symbol": "OMUSDT", "side": "long"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to send close message");
        assert!(!err.is_client_error());
        assert!(f.registry.get("OM/USDT").await.is_some());
    }

    #[tokio::test]
    async fn test_failed_entry_is_not_registered() {
        let f = fixture(AnchorSource::Registry);
        f.signal.set_failing(true);

        let err = send(&f, entry("OMUSDT")).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to send message");
        assert!(f.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_rejected_before_sending() {
        let f = fixture(AnchorSource::Registry);

        let err = send(&f, json!({"message": "tp"})).await.unwrap_err();
        assert!(err.is_client_error());
        let err = send(&f, json!({"side": "long"})).await.unwrap_err();
        assert!(err.is_client_error());

        assert_eq!(f.signal.sent_count(), 0);
        assert_eq!(f.promotion.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_channel_history_profile() {
        let f = fixture(AnchorSource::ChannelHistory);

        send(&f, entry("OMUSDT")).await.unwrap();
        assert!(f.registry.is_empty().await);

        send(
            &f,
            json!({"message": "tp", "symbol": "OMUSDT", "side": "long", "entryPrice": 100, "tpPrice": 110}),
        )
        .await
        .unwrap();
        assert_eq!(f.promotion.last_sent().unwrap().reply_to, None);

        send(&f, json!({"message": "close", "symbol": "OMUSDT", "side": "long"}))
            .await
            .unwrap();
        let close = f.signal.last_sent().unwrap();
        assert_eq!(close.channel, ChannelId::new("@signals"));
        assert_eq!(close.reply_to, Some(MessageId(100)));
    }

    #[tokio::test]
    async fn test_channel_history_close_without_entry_is_standalone() {
        let f = fixture(AnchorSource::ChannelHistory);
        send(&f, json!({"message": "close", "symbol": "ETHUSDT", "side": "short"}))
            .await
            .unwrap();
        assert_eq!(f.signal.last_sent().unwrap().reply_to, None);
    }
}
